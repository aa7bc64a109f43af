use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::data_io::output_trait::{FieldWriter, OutputMetadata};
use crate::error::{FieldError, Result};
use crate::field::{ArrayOrder, CommonField, FieldLists};

/// ASCII writer for field values, one gridpoint per line
pub struct AsciiFieldWriter {
    file_path: String,
    metadata: Option<OutputMetadata>,
    attributes: Vec<(String, String)>,
    fields: Vec<(String, FieldLists)>,
}

impl AsciiFieldWriter {
    pub fn new(file_path: &Path) -> Self {
        Self {
            file_path: file_path.to_string_lossy().to_string(),
            metadata: None,
            attributes: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Write the queued fields to `out`
    pub fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "# Field values")?;
        if let Some(ref metadata) = self.metadata {
            writeln!(out, "# Creation time: {}", metadata.creation_time)?;
            writeln!(out, "# Data source: {}", metadata.source)?;
            let mut attributes: Vec<_> = metadata.global_attributes.iter().collect();
            attributes.sort();
            for (name, value) in attributes {
                writeln!(out, "# {}: {}", name, value)?;
            }
        }
        for (name, value) in &self.attributes {
            writeln!(out, "# {}: {}", name, value)?;
        }
        writeln!(out, "# Columns: fid date(yyyymmdd) time(hhmm) level longitude(deg) latitude(deg) value")?;

        for (fid, lists) in &self.fields {
            for n in 0..lists.values.len() {
                writeln!(
                    out,
                    "{} {:08} {:04} {} {:.6} {:.6} {:.6e}",
                    fid,
                    lists.dates[n],
                    lists.times[n],
                    lists.levels[n],
                    lists.longitudes[n],
                    lists.latitudes[n],
                    lists.values[n]
                )?;
            }
        }
        Ok(())
    }
}

impl FieldWriter for AsciiFieldWriter {
    fn set_metadata(&mut self, metadata: &OutputMetadata) -> Result<()> {
        self.metadata = Some(metadata.clone());
        Ok(())
    }

    fn add_global_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.attributes.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn write_field(&mut self, field: &dyn CommonField) -> Result<()> {
        let lists = field.as_lists(ArrayOrder::C, None)?;
        // fids hold spaces; keep one column per fid
        let fid = field.fid().to_string().replace(' ', "");
        self.fields.push((fid, lists));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(FieldError::domain("no field to write"));
        }
        let file = File::create(&self.file_path)?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)?;
        out.flush()?;
        info!("Wrote {} field(s) to ASCII file: {}", self.fields.len(), self.file_path);
        Ok(())
    }

    fn get_output_path(&self) -> &str {
        &self.file_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fid::Fid;
    use crate::field::FieldBuilder;
    use crate::geometry::{Geometry, Grid, RegLLGrid, Structure, VCoordinate};
    use ndarray::Array4;
    use tempfile::tempdir;

    #[test]
    fn test_ascii_writer_lines() {
        let grid = Grid::RegularLonLat(RegLLGrid::new(0.0, 45.0, 1.0, 1.0, 2, 2));
        let geometry = Geometry::new(Structure::H2D, grid, VCoordinate::single(100, 500.0)).unwrap();
        let field = FieldBuilder::new(Fid::with("memory", "T500"), geometry)
            .data(Array4::from_shape_vec((1, 1, 2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap())
            .build()
            .unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut writer = AsciiFieldWriter::new(&path);
        assert!(writer.close().is_err());
        writer.add_global_attribute("grid", "regular_lonlat").unwrap();
        writer.write_field(&field).unwrap();
        writer.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = content.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(rows.len(), 4);
        let last: Vec<&str> = rows[3].split_whitespace().collect();
        assert_eq!(last[3], "500");
        assert_eq!(last[4], "1.000000");
        assert_eq!(last[5], "46.000000");
        assert!(content.contains("# grid: regular_lonlat"));
    }
}
