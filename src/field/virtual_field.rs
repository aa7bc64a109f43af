use log::debug;
use ndarray::{ArrayD, Ix4};
use std::fmt;
use std::sync::Arc;

use super::d3field::stack_levels;
use super::lookup::{self, IjQuery, Values};
use super::shape::squeeze;
use super::{CommonField, D3Field, FieldBuilder, LevelSelector};
use crate::error::{FieldError, Result};
use crate::fid::Fid;
use crate::geometry::{Geometry, Level, Structure, Subzone, VCoordinate};
use crate::resource::Resource;
use crate::spectral::SpectralGeometry;
use crate::validity::FieldValidityList;

/// Spectral transform requested on a resource-backed virtual field, to be
/// applied to each level when it is read.
#[derive(Debug, Clone)]
pub enum SpectralOp {
    Sp2gp,
    Gp2sp(SpectralGeometry),
}

impl SpectralOp {
    fn apply(&self, field: &mut D3Field) -> Result<()> {
        match self {
            SpectralOp::Sp2gp => field.sp2gp(),
            SpectralOp::Gp2sp(sg) => field.gp2sp(sg.clone()),
        }
    }
}

/// Where the levels of a virtual field come from.
#[derive(Clone)]
pub enum VirtualSource {
    /// Fields held in memory, sorted by level
    Fieldset(Vec<D3Field>),
    /// Fields read on demand, sorted by level
    Resource {
        resource: Arc<dyn Resource>,
        fids: Vec<Fid>,
    },
}

impl fmt::Debug for VirtualSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VirtualSource::Fieldset(fields) => write!(f, "Fieldset({} fields)", fields.len()),
            VirtualSource::Resource { resource, fids } => {
                write!(f, "Resource({}, {} fids)", resource.namespace(), fids.len())
            }
        }
    }
}

/// Multi-level field made of single-level physical fields, whose data is
/// never stored as a whole.
#[derive(Debug, Clone)]
pub struct VirtualField {
    fid: Fid,
    source: VirtualSource,
    geometry: Geometry,
    validity: FieldValidityList,
    spectral_geometry: Option<SpectralGeometry>,
    processtype: Option<String>,
    deferred: Vec<SpectralOp>,
}

/// Structures a virtual field can be made of.
const CONSTITUENT_STRUCTURES: [Structure; 6] = [
    Structure::Point,
    Structure::V1D,
    Structure::H1D,
    Structure::V2D,
    Structure::H2D,
    Structure::D3,
];

fn check_consistency(reference: &D3Field, field: &D3Field) -> Result<()> {
    let (a, b) = (reference.geometry(), field.geometry());
    if reference.structure() != field.structure() {
        return Err(FieldError::domain("all fields must share the structure"));
    }
    if !a.same_horizontal_geometry(b) {
        return Err(FieldError::domain("all fields must share the horizontal geometry"));
    }
    if a.vcoordinate.typeoffirstfixedsurface != b.vcoordinate.typeoffirstfixedsurface
        || a.vcoordinate.position_on_grid != b.vcoordinate.position_on_grid
    {
        return Err(FieldError::domain("all fields must share the vertical geometry"));
    }
    if a.vcoordinate.grid != b.vcoordinate.grid {
        return Err(FieldError::domain("all fields must share the vertical grid"));
    }
    if reference.validity() != field.validity() {
        return Err(FieldError::domain("all fields must share the validity"));
    }
    if reference.spectral_geometry() != field.spectral_geometry() {
        return Err(FieldError::domain("all fields must share the spectral geometry"));
    }
    if reference.processtype() != field.processtype() {
        return Err(FieldError::domain("all fields must share the processtype"));
    }
    Ok(())
}

impl VirtualField {
    /// Virtual field over fields held in memory.
    pub fn from_fieldset(fid: Fid, fieldset: Vec<D3Field>) -> Result<Self> {
        let fids: Vec<Fid> = fieldset.iter().map(|f| f.fid().clone()).collect();
        let metadata: Vec<D3Field> = fieldset.iter().map(D3Field::clone_metadata).collect();
        let (order, template) = VirtualField::compose(&fids, &metadata)?;
        let mut slots: Vec<Option<D3Field>> = fieldset.into_iter().map(Some).collect();
        let sorted = order.iter().filter_map(|&n| slots[n].take()).collect();
        Ok(VirtualField {
            fid,
            source: VirtualSource::Fieldset(sorted),
            ..template
        })
    }

    /// Virtual field over the resource fields matching `seeds`; only their
    /// metadata is read here.
    pub fn from_resource(fid: Fid, resource: Arc<dyn Resource>, seeds: &[Fid]) -> Result<Self> {
        if seeds.is_empty() {
            return Err(FieldError::domain(
                "resource fids are needed to build a virtual field from a resource",
            ));
        }
        let fids = resource.find_fields_in_resource(seeds, &CONSTITUENT_STRUCTURES)?;
        if fids.is_empty() {
            return Err(FieldError::domain(
                "there is no field in resource matching with resource fids",
            ));
        }
        let metadata = fids
            .iter()
            .map(|fid| resource.readfield(fid, false))
            .collect::<Result<Vec<_>>>()?;
        let (order, template) = VirtualField::compose(&fids, &metadata)?;
        let sorted = order.iter().map(|&n| fids[n].clone()).collect();
        Ok(VirtualField {
            fid,
            source: VirtualSource::Resource {
                resource,
                fids: sorted,
            },
            ..template
        })
    }

    /// Build from exactly one of a fieldset or a (resource, seeds) pair.
    pub fn new(
        fid: Fid,
        fieldset: Option<Vec<D3Field>>,
        resource: Option<(Arc<dyn Resource>, Vec<Fid>)>,
    ) -> Result<Self> {
        match (fieldset, resource) {
            (Some(_), Some(_)) => Err(FieldError::domain(
                "fieldset and resource cannot be set at the same time",
            )),
            (Some(fieldset), None) => VirtualField::from_fieldset(fid, fieldset),
            (None, Some((resource, seeds))) => VirtualField::from_resource(fid, resource, &seeds),
            (None, None) => Err(FieldError::domain(
                "a fieldset or a resource with fids is needed",
            )),
        }
    }

    /// Check the constituents and compute their level order and the
    /// composite metadata.
    fn compose(fids: &[Fid], fields: &[D3Field]) -> Result<(Vec<usize>, VirtualField)> {
        let first = fields
            .first()
            .ok_or_else(|| FieldError::domain("a virtual field needs at least one field"))?;
        let mut levels: Vec<Level> = Vec::with_capacity(fields.len());
        for (n, field) in fields.iter().enumerate() {
            check_consistency(first, field)?;
            let field_levels = &field.geometry().vcoordinate.levels;
            if field_levels.len() != 1 {
                return Err(FieldError::domain("fields must have only one level"));
            }
            let level = field_levels[0].clone();
            if matches!(level, Level::Value(_)) && levels.contains(&level) {
                return Err(FieldError::domain(format!(
                    "level {:?} found twice",
                    level.value().unwrap_or(f64::NAN)
                )));
            }
            if fids[..n].contains(&fids[n]) {
                return Err(FieldError::domain("fields must have different fids"));
            }
            levels.push(level);
        }
        let mut order: Vec<usize> = (0..fields.len()).collect();
        if let Some(values) = levels.iter().map(Level::value).collect::<Option<Vec<f64>>>() {
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        }
        let geometry = first.geometry();
        let vcoordinate = VCoordinate {
            levels: order.iter().map(|&n| levels[n].clone()).collect(),
            ..geometry.vcoordinate.clone()
        };
        let composite = Geometry::new(
            first.structure().stacked(),
            geometry.grid.clone(),
            vcoordinate,
        )?
        .with_position(geometry.position_on_horizontal_grid);
        let template = VirtualField {
            fid: Fid::new(),
            source: VirtualSource::Fieldset(Vec::new()),
            geometry: composite,
            validity: first.validity().clone(),
            spectral_geometry: first.spectral_geometry().cloned(),
            processtype: first.processtype().map(str::to_string),
            deferred: Vec::new(),
        };
        Ok((order, template))
    }

    pub fn source(&self) -> &VirtualSource {
        &self.source
    }

    /// Fids of the constituents, in level order.
    pub fn fids(&self) -> Vec<Fid> {
        match &self.source {
            VirtualSource::Fieldset(fields) => fields.iter().map(|f| f.fid().clone()).collect(),
            VirtualSource::Resource { fids, .. } => fids.clone(),
        }
    }

    pub fn set_fid(&mut self, fid: Fid) {
        self.fid = fid;
    }

    /// Spectral to gridpoint: applied to in-memory constituents, deferred
    /// for resource-backed ones.
    pub fn sp2gp(&mut self) -> Result<()> {
        if !self.spectral() {
            return Ok(());
        }
        match &mut self.source {
            VirtualSource::Fieldset(fields) => {
                let mut transformed = fields.clone();
                for field in transformed.iter_mut() {
                    field.sp2gp()?;
                }
                *fields = transformed;
            }
            VirtualSource::Resource { .. } => self.deferred.push(SpectralOp::Sp2gp),
        }
        self.spectral_geometry = None;
        Ok(())
    }

    /// Gridpoint to spectral: applied to in-memory constituents, deferred
    /// for resource-backed ones.
    pub fn gp2sp(&mut self, spectral_geometry: SpectralGeometry) -> Result<()> {
        if self.spectral() {
            return Err(FieldError::domain(
                "field must be gridpoint to be transformed in spectral space",
            ));
        }
        match &mut self.source {
            VirtualSource::Fieldset(fields) => {
                let mut transformed = fields.clone();
                for field in transformed.iter_mut() {
                    field.gp2sp(spectral_geometry.clone())?;
                }
                *fields = transformed;
            }
            VirtualSource::Resource { .. } => {
                self.deferred.push(SpectralOp::Gp2sp(spectral_geometry.clone()))
            }
        }
        self.spectral_geometry = Some(spectral_geometry);
        Ok(())
    }

    /// Deferred spectral operations, in application order.
    pub fn deferred_operations(&self) -> &[SpectralOp] {
        &self.deferred
    }

    pub fn setdata(&mut self, _data: ArrayD<f64>) -> Result<()> {
        Err(FieldError::domain("setdata cannot be implemented on virtual fields"))
    }

    pub fn deldata(&mut self) -> Result<()> {
        Err(FieldError::domain("deldata cannot be implemented on virtual fields"))
    }

    fn constituent(&self, k: usize) -> Result<D3Field> {
        match &self.source {
            VirtualSource::Fieldset(fields) => fields
                .get(k)
                .cloned()
                .ok_or_else(|| FieldError::domain(format!("level index {} out of range", k))),
            VirtualSource::Resource { resource, fids } => {
                let fid = fids
                    .get(k)
                    .ok_or_else(|| FieldError::domain(format!("level index {} out of range", k)))?;
                let mut field = resource.readfield(fid, true)?;
                for op in &self.deferred {
                    op.apply(&mut field)?;
                }
                if !self.deferred.is_empty() {
                    debug!("{} deferred operation(s) replayed on {}", self.deferred.len(), fid);
                }
                Ok(field)
            }
        }
    }
}

impl CommonField for VirtualField {
    fn fid(&self) -> &Fid {
        &self.fid
    }

    fn structure(&self) -> Structure {
        self.geometry.structure
    }

    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn validity(&self) -> &FieldValidityList {
        &self.validity
    }

    fn spectral_geometry(&self) -> Option<&SpectralGeometry> {
        self.spectral_geometry.as_ref()
    }

    fn processtype(&self) -> Option<&str> {
        self.processtype.as_deref()
    }

    fn getdata(&self, subzone: Option<Subzone>, d4: bool) -> Result<ArrayD<f64>> {
        let levels = (0..self.geometry.nlevels())
            .map(|k| self.constituent(k)?.getdata(subzone, true))
            .collect::<Result<Vec<_>>>()?;
        let data = stack_levels(&levels)?;
        if d4 {
            return Ok(data);
        }
        let dim_t = self.validity.len();
        let present = if self.spectral() {
            vec![dim_t > 1, self.geometry.nlevels() > 1, true]
        } else {
            let mut present = self.geometry.present_axes(dim_t).to_vec();
            present[2] = present[2] && data.shape()[2] > 1;
            present[3] = present[3] && data.shape()[3] > 1;
            present
        };
        squeeze(data, &present)
    }

    fn getvalue_ij(&self, query: &IjQuery, one: bool) -> Result<Values> {
        let data = self.data4d(None)?;
        lookup::values_at_indices(data.view(), &self.geometry, query, one)
    }

    fn getlevel(&self, selector: LevelSelector) -> Result<D3Field> {
        let k = selector.resolve(&self.geometry)?;
        self.constituent(k)
    }

    fn as_real_field(&self) -> Result<D3Field> {
        let mut builder = FieldBuilder::new(self.fid.clone(), self.geometry.clone())
            .validity(self.validity.clone())
            .data(self.getdata(None, true)?);
        if let Some(sg) = &self.spectral_geometry {
            builder = builder.spectral_geometry(sg.clone());
        }
        if let Some(processtype) = &self.processtype {
            builder = builder.processtype(processtype);
        }
        builder.build()
    }

    fn data4d(&self, subzone: Option<Subzone>) -> Result<ndarray::Array4<f64>> {
        if self.spectral() {
            return Err(FieldError::domain("field must be gridpoint to get 4D gridpoint data"));
        }
        Ok(self.getdata(subzone, true)?.into_dimensionality::<Ix4>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Grid, RegLLGrid};
    use crate::resource::InMemoryResource;
    use ndarray::Array4;

    fn level_field(name: &str, level: f64, value: f64) -> D3Field {
        let grid = Grid::RegularLonLat(RegLLGrid::new(0.0, 40.0, 1.0, 1.0, 3, 2));
        let geometry = Geometry::new(Structure::H2D, grid, VCoordinate::single(100, level)).unwrap();
        let fid = Fid::with("memory", name);
        FieldBuilder::new(fid, geometry)
            .data(Array4::from_elem((1, 1, 2, 3), value))
            .build()
            .unwrap()
    }

    #[test]
    fn test_fieldset_levels_are_sorted_with_fids() {
        let fields = vec![
            level_field("T500", 500.0, 5.0),
            level_field("T850", 850.0, 8.0),
            level_field("T250", 250.0, 2.0),
        ];
        let vf = VirtualField::from_fieldset(Fid::new(), fields).unwrap();
        assert_eq!(vf.structure(), Structure::D3);
        assert_eq!(vf.geometry().vcoordinate.scalar_levels(), Some(vec![250.0, 500.0, 850.0]));
        let names: Vec<String> = vf.fids().iter().map(|f| f.to_string()).collect();
        assert!(names[0].contains("T250") && names[2].contains("T850"));
        let data = vf.getdata(None, true).unwrap();
        assert_eq!(data.shape(), &[1, 3, 2, 3]);
        assert_eq!(data[[0, 0, 1, 2]], 2.0);
        assert_eq!(data[[0, 2, 0, 0]], 8.0);
        assert_eq!(vf.getdata(None, false).unwrap().shape(), &[3, 2, 3]);
        let level = vf.getlevel(LevelSelector::Level(500.0)).unwrap();
        assert_eq!(level.mean(None).unwrap(), 5.0);
    }

    #[test]
    fn test_construction_errors() {
        let dup_level = vec![level_field("A", 500.0, 1.0), level_field("B", 500.0, 2.0)];
        assert!(VirtualField::from_fieldset(Fid::new(), dup_level).is_err());
        let dup_fid = vec![level_field("A", 500.0, 1.0), level_field("A", 850.0, 2.0)];
        assert!(VirtualField::from_fieldset(Fid::new(), dup_fid).is_err());
        let resource: Arc<dyn Resource> = Arc::new(InMemoryResource::new("memory"));
        assert!(VirtualField::new(
            Fid::new(),
            Some(vec![level_field("A", 500.0, 1.0)]),
            Some((resource, vec![Fid::new()])),
        )
        .is_err());
        assert!(VirtualField::new(Fid::new(), None, None).is_err());
    }

    #[test]
    fn test_resource_backed_field() {
        let mut resource = InMemoryResource::new("memory");
        resource.writefield(&level_field("S002", 2.0, 20.0)).unwrap();
        resource.writefield(&level_field("S001", 1.0, 10.0)).unwrap();
        resource.writefield(&level_field("P850", 850.0, 0.0)).unwrap();
        let resource: Arc<dyn Resource> = Arc::new(resource);
        let seed = Fid::with("memory", "S00*");
        let mut vf = VirtualField::from_resource(Fid::new(), resource.clone(), &[seed]).unwrap();
        assert_eq!(vf.geometry().nlevels(), 2);
        assert_eq!(vf.getlevel(LevelSelector::Index(0)).unwrap().mean(None).unwrap(), 10.0);
        assert!(vf.setdata(ArrayD::zeros(ndarray::IxDyn(&[1]))).is_err());
        assert!(vf.deldata().is_err());
        let real = vf.as_real_field().unwrap();
        assert_eq!(real.structure(), Structure::D3);
        assert_eq!(real.max(None).unwrap(), 20.0);

        let nothing = Fid::with("memory", "Q*");
        assert!(VirtualField::from_resource(Fid::new(), resource, &[nothing]).is_err());
    }
}
