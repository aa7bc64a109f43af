use log::debug;
use ndarray::{concatenate, s, Array, Array3, Array4, ArrayD, Axis, Dimension, Ix3, Ix4, IxDyn, Slice};

use super::lookup::{self, IjQuery, Values};
use super::shape::{expand, squeeze};
use super::{CommonField, LevelSelector, ValiditySelector};
use crate::error::{FieldError, Result};
use crate::fid::{Fid, FidValue};
use crate::geometry::{Geometry, Level, Structure, Subzone};
use crate::spectral::SpectralGeometry;
use crate::validity::FieldValidityList;

/// Data buffer of a physical field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    /// (T, Z, Y, X)
    Gridpoint(Array4<f64>),
    /// (T, Z, ncoeffs)
    Spectral(Array3<f64>),
}

impl FieldData {
    pub fn to_dyn(&self) -> ArrayD<f64> {
        match self {
            FieldData::Gridpoint(a) => a.clone().into_dyn(),
            FieldData::Spectral(a) => a.clone().into_dyn(),
        }
    }
}

/// Window of [`D3Field::time_smooth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmoothWindow {
    #[default]
    Center,
    Left,
    Right,
}

/// Physical 3D field: owns its data buffer.
///
/// Structure and levels are those of the geometry; the time axis is the
/// validity list. Data, when present, always has the canonical shape
/// (T, Z, Y, X), or (T, Z, ncoeffs) while spectral.
#[derive(Debug, Clone)]
pub struct D3Field {
    fid: Fid,
    geometry: Geometry,
    validity: FieldValidityList,
    spectral_geometry: Option<SpectralGeometry>,
    processtype: Option<String>,
    comment: Option<String>,
    data: Option<FieldData>,
}

/// Builder of [`D3Field`]s.
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    fid: Fid,
    structure: Option<Structure>,
    geometry: Geometry,
    validity: FieldValidityList,
    spectral_geometry: Option<SpectralGeometry>,
    processtype: Option<String>,
    comment: Option<String>,
    data: Option<ArrayD<f64>>,
}

impl FieldBuilder {
    pub fn new(fid: Fid, geometry: Geometry) -> Self {
        FieldBuilder {
            fid,
            structure: None,
            geometry,
            validity: FieldValidityList::default(),
            spectral_geometry: None,
            processtype: None,
            comment: None,
            data: None,
        }
    }

    /// Expected structure; checked against the geometry's.
    pub fn structure(mut self, structure: Structure) -> Self {
        self.structure = Some(structure);
        self
    }

    pub fn validity(mut self, validity: FieldValidityList) -> Self {
        self.validity = validity;
        self
    }

    pub fn spectral_geometry(mut self, spectral_geometry: SpectralGeometry) -> Self {
        self.spectral_geometry = Some(spectral_geometry);
        self
    }

    pub fn processtype(mut self, processtype: &str) -> Self {
        self.processtype = Some(processtype.to_string());
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Data in canonical or squeezed form.
    pub fn data<D: Dimension>(mut self, data: Array<f64, D>) -> Self {
        self.data = Some(data.into_dyn());
        self
    }

    pub fn build(self) -> Result<D3Field> {
        if let Some(structure) = self.structure {
            if structure != self.geometry.structure {
                return Err(FieldError::domain(format!(
                    "field structure {} does not match geometry structure {}",
                    structure, self.geometry.structure
                )));
            }
        }
        if self.geometry.nlevels() == 0 {
            return Err(FieldError::domain("field geometry must have at least one level"));
        }
        let mut field = D3Field {
            fid: self.fid,
            geometry: self.geometry,
            validity: self.validity,
            spectral_geometry: self.spectral_geometry,
            processtype: self.processtype,
            comment: self.comment,
            data: None,
        };
        if let Some(data) = self.data {
            field.setdata(data)?;
        }
        Ok(field)
    }
}

impl D3Field {
    /// Assemble a field from already consistent parts.
    pub(crate) fn from_parts(
        fid: Fid,
        geometry: Geometry,
        validity: FieldValidityList,
        spectral_geometry: Option<SpectralGeometry>,
        processtype: Option<String>,
        data: Option<FieldData>,
    ) -> Self {
        D3Field {
            fid,
            geometry,
            validity,
            spectral_geometry,
            processtype,
            comment: None,
            data,
        }
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&FieldData> {
        self.data.as_ref()
    }

    pub fn set_fid(&mut self, fid: Fid) {
        self.fid = fid;
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    pub fn set_validity(&mut self, validity: FieldValidityList) -> Result<()> {
        if self.data.is_some() && validity.len() != self.validity.len() {
            return Err(FieldError::shape(format!(
                "cannot set {} validities on a field holding {} time steps",
                validity.len(),
                self.validity.len()
            )));
        }
        self.validity = validity;
        Ok(())
    }

    /// Gridpoint buffer, or a domain error if the field is spectral.
    pub(crate) fn gridpoint_view(&self) -> Result<ndarray::ArrayView4<'_, f64>> {
        match &self.data {
            Some(FieldData::Gridpoint(a)) => Ok(a.view()),
            Some(FieldData::Spectral(_)) => Err(FieldError::domain("field must be gridpoint")),
            None => Err(FieldError::NoData),
        }
    }

    /// Canonical shape expected for gridpoint data.
    pub fn expected_shape(&self) -> Vec<usize> {
        self.geometry.get_datashape(self.validity.len(), true)
    }

    /// Set the data buffer, given in canonical 4D form or with degenerate
    /// axes removed. Leaves the field untouched on error.
    pub fn setdata<D: Dimension>(&mut self, data: Array<f64, D>) -> Result<()> {
        let data = data.into_dyn();
        let dim_t = self.validity.len();
        let new = if let Some(sg) = &self.spectral_geometry {
            let nz = self.geometry.nlevels();
            let ncoeffs = data.shape().last().copied().unwrap_or(0);
            let expected = sg.spectral_size(&self.geometry.gpdims()?);
            if ncoeffs != expected {
                return Err(FieldError::shape(format!(
                    "spectral data holds {} coefficients per level, truncation needs {}",
                    ncoeffs, expected
                )));
            }
            let full = [dim_t, nz, ncoeffs];
            let present = [dim_t > 1, nz > 1, true];
            let data = expand(data, &full, &present)?;
            FieldData::Spectral(data.into_dimensionality::<Ix3>()?)
        } else {
            let full = self.geometry.get_datashape(dim_t, true);
            let present = self.geometry.present_axes(dim_t);
            let data = expand(data, &full, &present)?;
            FieldData::Gridpoint(data.into_dimensionality::<Ix4>()?)
        };
        self.data = Some(new);
        Ok(())
    }

    pub fn deldata(&mut self) {
        self.data = None;
    }

    /// Spectral to gridpoint, in place; no-op on a gridpoint field.
    pub fn sp2gp(&mut self) -> Result<()> {
        let sg = match &self.spectral_geometry {
            Some(sg) => sg.clone(),
            None => return Ok(()),
        };
        let gpdims = self.geometry.gpdims()?;
        let data = match &self.data {
            Some(FieldData::Spectral(a)) => Some(a),
            Some(FieldData::Gridpoint(_)) => {
                return Err(FieldError::domain("spectral field holds gridpoint data"))
            }
            None => None,
        };
        let new = match data {
            Some(coeffs) => {
                let (nt, nz, _) = coeffs.dim();
                let (ny, nx) = (self.geometry.hgrid().ny(), self.geometry.hgrid().nx());
                let mut gp = Array4::zeros((nt, nz, ny, nx));
                for t in 0..nt {
                    for k in 0..nz {
                        let slice = coeffs.slice(s![t, k, ..]).to_vec();
                        let values = sg.sp2gp(&slice, &gpdims)?;
                        let level = self.geometry.reshape_data(&values)?;
                        gp.slice_mut(s![t, k, .., ..]).assign(&level);
                    }
                }
                Some(FieldData::Gridpoint(gp))
            }
            None => None,
        };
        debug!("field {} transformed to gridpoint space", self.fid);
        self.data = new;
        self.spectral_geometry = None;
        Ok(())
    }

    /// Gridpoint to spectral, in place.
    pub fn gp2sp(&mut self, spectral_geometry: SpectralGeometry) -> Result<()> {
        if self.spectral() {
            return Err(FieldError::domain(
                "field must be gridpoint to be transformed in spectral space",
            ));
        }
        let gpdims = self.geometry.gpdims()?;
        let new = match &self.data {
            Some(FieldData::Gridpoint(gp)) => {
                let (nt, nz, _, _) = gp.dim();
                let mut rows = Vec::with_capacity(nt * nz);
                for t in 0..nt {
                    for k in 0..nz {
                        let values = self.geometry.stretch_data(gp.slice(s![t, k, .., ..]));
                        rows.push(spectral_geometry.gp2sp(&values, &gpdims)?);
                    }
                }
                let ncoeffs = rows.first().map_or(0, Vec::len);
                if rows.iter().any(|r| r.len() != ncoeffs) {
                    return Err(FieldError::shape("inconsistent number of spectral coefficients"));
                }
                let flat: Vec<f64> = rows.into_iter().flatten().collect();
                Some(FieldData::Spectral(Array3::from_shape_vec((nt, nz, ncoeffs), flat)?))
            }
            Some(FieldData::Spectral(_)) => {
                return Err(FieldError::domain("gridpoint field holds spectral data"))
            }
            None => None,
        };
        debug!("field {} transformed to spectral space", self.fid);
        self.data = new;
        self.spectral_geometry = Some(spectral_geometry);
        Ok(())
    }

    /// Gridpoint x and y derivatives of a spectral field.
    pub fn compute_xy_spderivatives(&self) -> Result<(D3Field, D3Field)> {
        let sg = self.spectral_geometry.as_ref().ok_or_else(|| {
            FieldError::domain("field must be spectral to compute its spectral derivatives")
        })?;
        let coeffs = match &self.data {
            Some(FieldData::Spectral(a)) => a,
            Some(FieldData::Gridpoint(_)) => {
                return Err(FieldError::domain("spectral field holds gridpoint data"))
            }
            None => return Err(FieldError::NoData),
        };
        let gpdims = self.geometry.gpdims()?;
        let (nt, nz, _) = coeffs.dim();
        let (ny, nx) = (self.geometry.hgrid().ny(), self.geometry.hgrid().nx());
        let mut dx = Array4::zeros((nt, nz, ny, nx));
        let mut dy = Array4::zeros((nt, nz, ny, nx));
        for t in 0..nt {
            for k in 0..nz {
                let slice = coeffs.slice(s![t, k, ..]).to_vec();
                let (x, y) = sg.compute_xy_spderivatives(&slice, &gpdims)?;
                dx.slice_mut(s![t, k, .., ..]).assign(&self.geometry.reshape_data(&x)?);
                dy.slice_mut(s![t, k, .., ..]).assign(&self.geometry.reshape_data(&y)?);
            }
        }
        let derivative = |axis: &str, data: Array4<f64>| {
            let mut fid = self.fid.clone();
            fid.set_generic("derivative", axis);
            D3Field::from_parts(
                fid,
                self.geometry.clone(),
                self.validity.clone(),
                None,
                self.processtype.clone(),
                Some(FieldData::Gridpoint(data)),
            )
        };
        Ok((derivative("x", dx), derivative("y", dy)))
    }

    /// Field restricted to one validity.
    pub fn getvalidity(&self, selector: ValiditySelector) -> Result<D3Field> {
        let index = match selector {
            ValiditySelector::Index(t) => t,
            ValiditySelector::Validity(v) => self.validity.index_of(&v).ok_or_else(|| {
                FieldError::domain(format!("validity {} not found in field", v))
            })?,
        };
        let validity = self.validity.select(index)?;
        let data = match &self.data {
            Some(FieldData::Gridpoint(a)) => {
                Some(FieldData::Gridpoint(a.slice(s![index..index + 1, .., .., ..]).to_owned()))
            }
            Some(FieldData::Spectral(a)) => {
                Some(FieldData::Spectral(a.slice(s![index..index + 1, .., ..]).to_owned()))
            }
            None => None,
        };
        Ok(D3Field {
            validity,
            data,
            ..self.clone_metadata()
        })
    }

    /// Append the time steps of `other` after this field's.
    ///
    /// Only dimensions are checked, not geometries nor validities.
    pub fn extend(&mut self, other: &dyn CommonField) -> Result<()> {
        let mine = self.getdata(None, true)?;
        let theirs = other.getdata(None, true)?;
        if mine.shape()[1..] != theirs.shape()[1..] {
            return Err(FieldError::shape(format!(
                "cannot extend a field of shape {:?} with one of shape {:?}",
                mine.shape(),
                theirs.shape()
            )));
        }
        let joined = concatenate(Axis(0), &[mine.view(), theirs.view()])?;
        let mut validity = self.validity.clone();
        validity.extend(other.validity());
        let mut extended = self.clone_metadata();
        extended.validity = validity;
        extended.setdata(joined)?;
        *self = extended;
        Ok(())
    }

    /// Decumulate along time: values become differences between successive
    /// time steps, the first one kept. With `center`, values at t become
    /// the mean of the differences around t, the first one the difference
    /// between steps 0 and 1, the last one unchanged. No-op with a single
    /// validity.
    pub fn decumulate(&mut self, center: bool) -> Result<()> {
        let nt = self.validity.len();
        if nt < 2 {
            return Ok(());
        }
        let original = self.getdata(None, true)?;
        let mut data = original.clone();
        let diff = &original.slice_axis(Axis(0), Slice::from(1usize..)) - &original.slice_axis(Axis(0), Slice::from(..nt - 1));
        data.slice_axis_mut(Axis(0), Slice::from(1usize..)).assign(&diff);
        if center {
            let first = data.index_axis(Axis(0), 1).to_owned();
            data.index_axis_mut(Axis(0), 0).assign(&first);
            if nt > 2 {
                let current = data.slice_axis(Axis(0), Slice::from(1..nt - 1)).to_owned();
                let next = data.slice_axis(Axis(0), Slice::from(2usize..)).to_owned();
                data.slice_axis_mut(Axis(0), Slice::from(1..nt - 1))
                    .assign(&((current + next) / 2.0));
            }
        }
        self.setdata(data)
    }

    /// Replace each time step by the mean over a window of `length` steps.
    ///
    /// Windows: [t - length/2, t + length/2) when centered, [t - length, t)
    /// on the left, [t, t + length) on the right, clipped to the time axis.
    /// A window emptied by clipping is replaced by step t alone.
    pub fn time_smooth(&mut self, length: usize, window: SmoothWindow) -> Result<()> {
        let nt = self.validity.len();
        if nt < 2 {
            return Err(FieldError::domain("time smoothing requires a time dimension"));
        }
        let (tinf, tsup) = match window {
            SmoothWindow::Center => (length / 2, length / 2),
            SmoothWindow::Left => (length, 0),
            SmoothWindow::Right => (0, length),
        };
        let original = self.getdata(None, true)?;
        let mut data = original.clone();
        for t in 0..nt {
            let t9 = t.saturating_sub(tinf);
            let mut t1 = (t + tsup).min(nt);
            if t1 <= t9 {
                t1 = t + 1;
            }
            let window = original.slice_axis(Axis(0), Slice::from(t9..t1));
            if let Some(mean) = window.mean_axis(Axis(0)) {
                data.index_axis_mut(Axis(0), t).assign(&mean);
            }
        }
        self.setdata(data)
    }

    /// Shift the center longitude of a global regular lon/lat field by
    /// `shift` degrees (a multiple of the x resolution); data columns are
    /// rolled accordingly.
    pub fn global_shift_center(&mut self, shift: f64) -> Result<()> {
        if self.spectral() {
            return Err(FieldError::domain("field must be gridpoint to shift its center"));
        }
        let mut geometry = self.geometry.clone();
        let n = geometry.global_shift_center(shift)?;
        let data = match &self.data {
            Some(FieldData::Gridpoint(old)) => {
                let nx = old.dim().3 as isize;
                let mut new = old.clone();
                for i in 0..nx {
                    let src = (i + n).rem_euclid(nx) as usize;
                    new.slice_mut(s![.., .., .., i as usize])
                        .assign(&old.slice(s![.., .., .., src]));
                }
                Some(FieldData::Gridpoint(new))
            }
            _ => None,
        };
        debug!("field {} center shifted by {} column(s)", self.fid, n);
        self.geometry = geometry;
        self.data = data;
        Ok(())
    }

    /// Copy of the field restricted to a limited-area subzone.
    pub fn select_subzone(&self, subzone: Subzone) -> Result<D3Field> {
        let geometry = self.geometry.select_subzone(subzone)?;
        let data = match &self.data {
            Some(FieldData::Gridpoint(a)) => {
                Some(FieldData::Gridpoint(self.geometry.extract_subzone(a.view(), subzone)?))
            }
            Some(FieldData::Spectral(_)) => {
                return Err(FieldError::domain("field must be gridpoint to select a subzone"))
            }
            None => None,
        };
        Ok(D3Field {
            geometry,
            data,
            ..self.clone_metadata()
        })
    }

    /// Clone of everything but the data.
    pub(crate) fn clone_metadata(&self) -> D3Field {
        D3Field {
            fid: self.fid.clone(),
            geometry: self.geometry.clone(),
            validity: self.validity.clone(),
            spectral_geometry: self.spectral_geometry.clone(),
            processtype: self.processtype.clone(),
            comment: self.comment.clone(),
            data: None,
        }
    }

    pub(crate) fn replace_data(&mut self, data: Option<FieldData>) {
        self.data = data;
    }
}

impl CommonField for D3Field {
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

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn getdata(&self, subzone: Option<Subzone>, d4: bool) -> Result<ArrayD<f64>> {
        let dim_t = self.validity.len();
        match &self.data {
            None => Err(FieldError::NoData),
            Some(FieldData::Spectral(a)) => {
                if subzone.is_some() {
                    return Err(FieldError::domain("subzones only apply to gridpoint fields"));
                }
                let data = a.clone().into_dyn();
                if d4 {
                    return Ok(data);
                }
                squeeze(data, &[dim_t > 1, self.geometry.nlevels() > 1, true])
            }
            Some(FieldData::Gridpoint(a)) => {
                let data = match subzone {
                    Some(zone) => self.geometry.extract_subzone(a.view(), zone)?,
                    None => a.clone(),
                };
                if d4 {
                    return Ok(data.into_dyn());
                }
                let mut present = self.geometry.present_axes(dim_t);
                present[2] = present[2] && data.dim().2 > 1;
                present[3] = present[3] && data.dim().3 > 1;
                squeeze(data.into_dyn(), &present)
            }
        }
    }

    fn getvalue_ij(&self, query: &IjQuery, one: bool) -> Result<Values> {
        lookup::values_at_indices(self.gridpoint_view()?, &self.geometry, query, one)
    }

    fn getlevel(&self, selector: LevelSelector) -> Result<D3Field> {
        let k = selector.resolve(&self.geometry)?;
        let geometry = self.geometry.level_geometry(k)?;
        let mut fid = self.fid.clone();
        if let Level::Value(v) = &self.geometry.vcoordinate.levels[k] {
            fid.set_generic("level", FidValue::Number(*v));
        }
        let data = match &self.data {
            Some(FieldData::Gridpoint(a)) => {
                Some(FieldData::Gridpoint(a.slice(s![.., k..k + 1, .., ..]).to_owned()))
            }
            Some(FieldData::Spectral(a)) => {
                Some(FieldData::Spectral(a.slice(s![.., k..k + 1, ..]).to_owned()))
            }
            None => None,
        };
        Ok(D3Field {
            fid,
            geometry,
            data,
            ..self.clone_metadata()
        })
    }

    fn as_real_field(&self) -> Result<D3Field> {
        Ok(self.clone())
    }
}

/// Data of single-level fields stacked along the level axis.
pub(crate) fn stack_levels(levels: &[ArrayD<f64>]) -> Result<ArrayD<f64>> {
    let views: Vec<_> = levels.iter().map(|a| a.view()).collect();
    if views.is_empty() {
        return Ok(ArrayD::zeros(IxDyn(&[0])));
    }
    Ok(concatenate(Axis(1), &views)?)
}
