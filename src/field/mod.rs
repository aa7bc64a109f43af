//! Fields: data buffers on a geometry, with their validity and identifier.
//!
//! [`CommonField`] is the capability shared by physical fields
//! ([`D3Field`]) and virtual fields ([`VirtualField`]); the algorithms that
//! only need data access and geometry (lookups, extractions, resampling,
//! statistics, exports) are provided on top of it. [`VectorField`] composes
//! two scalar components.

pub mod d3field;
pub mod export;
pub mod extract;
pub mod lookup;
pub mod ops;
pub mod resample;
mod shape;
pub mod spectrum;
pub mod stats;
pub mod vector;
pub mod virtual_field;

pub use d3field::{D3Field, FieldBuilder, FieldData, SmoothWindow};
pub use export::{ArrayOrder, FieldLists, PointRecord};
pub use extract::{LonLatBox, SubdomainOptions};
pub use lookup::{ExternalDistance, IjQuery, Interpolation, IntoIndices, LlQuery, LlValues, Values};
pub use ops::{Operand, Operator};
pub use resample::{NeighbourInfo, ResampleOptions, Resampled, Weighting};
pub use spectrum::Spectrum;
pub use stats::FieldStats;
pub use vector::{make_vector_field, VectorField, VectorOperand};
pub use virtual_field::{SpectralOp, VirtualField, VirtualSource};

use ndarray::{Array4, ArrayD, Ix4};
use std::io::Write;

use crate::data_io::WhatOptions;
use crate::error::{FieldError, Result};
use crate::fid::Fid;
use crate::geometry::{Geometry, Structure, Subzone};
use crate::spectral::SpectralGeometry;
use crate::validity::{FieldValidity, FieldValidityList};

/// Selection of one level, by value or by index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelSelector {
    Level(f64),
    Index(usize),
}

/// Selection of one validity, by value or by index.
#[derive(Debug, Clone, PartialEq)]
pub enum ValiditySelector {
    Validity(FieldValidity),
    Index(usize),
}

impl LevelSelector {
    /// Index of the selected level in `geometry`.
    pub fn resolve(&self, geometry: &Geometry) -> Result<usize> {
        match *self {
            LevelSelector::Index(k) if k < geometry.nlevels() => Ok(k),
            LevelSelector::Index(k) => Err(FieldError::domain(format!(
                "level index {} out of range ({} levels)",
                k,
                geometry.nlevels()
            ))),
            LevelSelector::Level(value) => geometry.vcoordinate.level_index(value).ok_or_else(|| {
                FieldError::domain(format!("level {} not found in field", value))
            }),
        }
    }
}

/// Capabilities shared by physical and virtual fields.
pub trait CommonField {
    fn fid(&self) -> &Fid;

    fn structure(&self) -> Structure;

    fn geometry(&self) -> &Geometry;

    fn validity(&self) -> &FieldValidityList;

    fn spectral_geometry(&self) -> Option<&SpectralGeometry>;

    fn processtype(&self) -> Option<&str>;

    fn comment(&self) -> Option<&str> {
        None
    }

    /// Field data, in canonical 4D form (T, Z, Y, X) if `d4`, else with the
    /// degenerate axes removed. Spectral data is (T, Z, ncoeffs).
    fn getdata(&self, subzone: Option<Subzone>, d4: bool) -> Result<ArrayD<f64>>;

    /// Values at gridpoint indices; see [`IjQuery`].
    fn getvalue_ij(&self, query: &IjQuery, one: bool) -> Result<Values>;

    /// One level as a physical field.
    fn getlevel(&self, selector: LevelSelector) -> Result<D3Field>;

    /// A physical field holding the same data.
    fn as_real_field(&self) -> Result<D3Field>;

    fn spectral(&self) -> bool {
        self.spectral_geometry().is_some()
    }

    /// Gridpoint data as a 4D array.
    fn data4d(&self, subzone: Option<Subzone>) -> Result<Array4<f64>> {
        if self.spectral() {
            return Err(FieldError::domain("field must be gridpoint to get 4D gridpoint data"));
        }
        Ok(self.getdata(subzone, true)?.into_dimensionality::<Ix4>()?)
    }

    /// Values at lon/lat coordinates; see [`LlQuery`].
    fn getvalue_ll(&self, query: &LlQuery) -> Result<LlValues> {
        lookup::getvalue_ll(self, query)
    }

    /// The field on another horizontal geometry, by lon/lat lookup.
    fn extract_subdomain(&self, geometry: &Geometry, options: &SubdomainOptions) -> Result<D3Field> {
        extract::extract_subdomain(self, geometry, options)
    }

    /// The gridpoints inside a lon/lat box, without interpolation.
    fn extract_zoom(&self, zoom: &LonLatBox, extra_10th: bool) -> Result<D3Field> {
        extract::extract_zoom(self, zoom, extra_10th)
    }

    /// The index ranges [first_i, last_i) x [first_j, last_j) of a
    /// rectangular field.
    fn extract_subarray(&self, first_i: usize, last_i: usize, first_j: usize, last_j: usize) -> Result<D3Field> {
        extract::extract_subarray(self, first_i, last_i, first_j, last_j)
    }

    /// Neighbour correspondence between this field's grid and `target`,
    /// reusable by [`CommonField::resample`].
    fn neighbour_info(&self, target: &Geometry, options: &ResampleOptions) -> Result<NeighbourInfo> {
        resample::neighbour_info(self, target, options)
    }

    /// The field on `target` by weighted neighbours.
    fn resample(&self, target: &Geometry, options: &ResampleOptions) -> Result<Resampled> {
        resample::resample(self, target, options)
    }

    /// The field on a regular lon/lat grid covering `borders`.
    fn resample_on_regularll(&self, borders: &LonLatBox, resolution: f64, options: &ResampleOptions) -> Result<Resampled> {
        resample::resample_on_regularll(self, borders, resolution, options)
    }

    fn stats(&self, subzone: Option<Subzone>) -> Result<FieldStats> {
        Ok(FieldStats::compute(&self.getdata(subzone, true)?))
    }

    fn min(&self, subzone: Option<Subzone>) -> Result<f64> {
        Ok(stats::min(&self.getdata(subzone, true)?))
    }

    fn max(&self, subzone: Option<Subzone>) -> Result<f64> {
        Ok(stats::max(&self.getdata(subzone, true)?))
    }

    fn mean(&self, subzone: Option<Subzone>) -> Result<f64> {
        Ok(stats::mean(&self.getdata(subzone, true)?))
    }

    fn std(&self, subzone: Option<Subzone>) -> Result<f64> {
        Ok(stats::std(&self.getdata(subzone, true)?))
    }

    fn quadmean(&self, subzone: Option<Subzone>) -> Result<f64> {
        Ok(stats::quadmean(&self.getdata(subzone, true)?))
    }

    fn nonzero(&self, subzone: Option<Subzone>) -> Result<usize> {
        Ok(stats::nonzero(&self.getdata(subzone, true)?))
    }

    fn as_lists(&self, order: ArrayOrder, subzone: Option<Subzone>) -> Result<FieldLists> {
        export::as_lists(self, order, subzone)
    }

    fn as_dicts(&self, subzone: Option<Subzone>) -> Result<Vec<PointRecord>> {
        export::as_dicts(self, subzone)
    }

    fn as_points(&self, subzone: Option<Subzone>) -> Result<Vec<D3Field>> {
        export::as_points(self, subzone)
    }

    fn as_profiles(&self, subzone: Option<Subzone>) -> Result<Vec<D3Field>> {
        export::as_profiles(self, subzone)
    }

    /// DCT variance spectrum of one horizontal slice. Limited-area fields
    /// default to the C zone.
    fn dctspectrum(&self, subzone: Option<Subzone>, level_index: Option<usize>, validity_index: Option<usize>) -> Result<Spectrum> {
        spectrum::dctspectrum(self, subzone, level_index, validity_index)
    }

    /// Human-readable description of the field.
    fn what(&self, out: &mut dyn Write, options: &WhatOptions) -> Result<()> {
        crate::data_io::what(self, out, options)
    }

    /// Compatibility of two fields as operands of an arithmetic operation.
    fn check_operands(&self, other: &dyn CommonField) -> Result<()> {
        ops::check_operands(self, other)
    }
}
