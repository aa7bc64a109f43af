use std::io::Write;

use crate::error::Result;
use crate::field::CommonField;
use crate::geometry::Level;

const RULE: &str = "####################################################################";

/// What to include in a field summary.
#[derive(Debug, Clone, Copy)]
pub struct WhatOptions {
    pub vertical_geometry: bool,
    pub cumulativeduration: bool,
    pub stats: bool,
}

impl Default for WhatOptions {
    fn default() -> Self {
        Self {
            vertical_geometry: true,
            cumulativeduration: true,
            stats: true,
        }
    }
}

fn section(out: &mut dyn Write, title: &str) -> Result<()> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "#   {}", title)?;
    writeln!(out, "{}", RULE)?;
    Ok(())
}

/// Write a textual description of `field`: validity, geometry, spectral
/// geometry, identifier and statistics.
pub fn what<F: CommonField + ?Sized>(field: &F, out: &mut dyn Write, options: &WhatOptions) -> Result<()> {
    section(out, "VALIDITY")?;
    for validity in field.validity().iter() {
        match (validity.get(), validity.getbasis()) {
            (Some(date), Some(basis)) => {
                writeln!(out, "Validity: {}", date.format("%Y-%m-%d %H:%M:%S"))?;
                writeln!(out, "Basis:    {}", basis.format("%Y-%m-%d %H:%M:%S"))?;
                if let Some(term) = validity.term() {
                    writeln!(out, "Term:     {}h{:02}", term.num_hours(), term.num_minutes() % 60)?;
                }
                if options.cumulativeduration {
                    if let Some(cumul) = validity.cumulativeduration {
                        writeln!(out, "Cumulative duration: {}s", cumul.num_seconds())?;
                    }
                }
            }
            _ => writeln!(out, "Validity: none")?,
        }
    }

    let geometry = field.geometry();
    let dims = geometry.dimensions();
    section(out, "HORIZONTAL GEOMETRY")?;
    writeln!(out, "Structure: {}", field.structure())?;
    writeln!(out, "Grid:      {}", geometry.name())?;
    writeln!(out, "Dimensions: X={} Y={}", dims.x, dims.y)?;
    if let Some(lon_numbers) = &dims.lon_number_by_lat {
        writeln!(out, "Longitudes per latitude: {:?}", lon_numbers)?;
    }
    writeln!(out, "Resolution: {}", geometry.resolution())?;
    if let Some(zone) = geometry.hgrid().lam_zone() {
        writeln!(out, "LAM zone: {:?}", zone)?;
    }

    if options.vertical_geometry {
        let vcoordinate = &geometry.vcoordinate;
        section(out, "VERTICAL GEOMETRY")?;
        writeln!(out, "typeoffirstfixedsurface: {}", vcoordinate.typeoffirstfixedsurface)?;
        if let Some(position) = vcoordinate.position_on_grid {
            writeln!(out, "Position on grid: {:?}", position)?;
        }
        if let Some(grid) = &vcoordinate.grid {
            writeln!(out, "Grid levels: {}", grid.gridlevels.len())?;
        }
        let levels: Vec<String> = vcoordinate
            .levels
            .iter()
            .map(|level| match level {
                Level::Value(v) => v.to_string(),
                Level::Gridded(_) => "gridded".to_string(),
            })
            .collect();
        writeln!(out, "Levels: {}", levels.join(", "))?;
    }

    section(out, "SPECTRAL GEOMETRY")?;
    match field.spectral_geometry() {
        Some(sg) => {
            writeln!(out, "Space: {:?}", sg.space)?;
            writeln!(out, "Truncation: {:?}", sg.truncation)?;
        }
        None => writeln!(out, "Gridpoint field")?,
    }

    section(out, "FIELD")?;
    writeln!(out, "fid: {}", field.fid())?;
    if let Some(processtype) = field.processtype() {
        writeln!(out, "processtype: {}", processtype)?;
    }
    if let Some(comment) = field.comment() {
        writeln!(out, "comment: {}", comment)?;
    }

    if options.stats {
        section(out, "STATISTICS")?;
        if field.spectral() {
            writeln!(out, "(spectral coefficients)")?;
        }
        writeln!(out, "{}", field.stats(None)?)?;
    }
    Ok(())
}
