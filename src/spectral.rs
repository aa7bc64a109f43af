use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Gridpoint dimensions handed to spectral transforms.
#[derive(Debug, Clone, PartialEq)]
pub enum GpDims {
    /// Rectangular limited-area grid: full (CIE) size, CI-zone size and
    /// resolutions
    Lam {
        x: usize,
        y: usize,
        x_ci: usize,
        y_ci: usize,
        x_resolution: f64,
        y_resolution: f64,
    },
    /// Global Gaussian grid
    Global {
        lat_number: usize,
        lon_number_by_lat: Vec<usize>,
    },
}

impl GpDims {
    /// Number of gridpoint values produced by a transform.
    pub fn gridpoints_number(&self) -> usize {
        match self {
            GpDims::Lam { x, y, .. } => x * y,
            GpDims::Global {
                lon_number_by_lat, ..
            } => lon_number_by_lat.iter().sum(),
        }
    }
}

/// Spectral space of the coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralSpace {
    /// Spherical harmonics (global grids)
    Legendre,
    /// Bi-periodic Fourier (limited-area grids)
    BiFourier,
}

/// Truncation of the spectral representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    Triangular { max: usize },
    Elliptic { in_x: usize, in_y: usize },
}

/// Spectral transform engine.
///
/// Implementations work on flat buffers: coefficient vectors on one side,
/// the valid gridpoint values (row by row, masked points excluded) on the
/// other.
pub trait SpectralTransform: Send + Sync + fmt::Debug {
    /// Spectral coefficients to gridpoint values
    ///
    /// # Arguments
    /// * `coeffs` - Spectral coefficients of one level
    /// * `gpdims` - Target gridpoint dimensions
    ///
    /// # Returns
    /// * `Result<Vec<f64>>` - `gpdims.gridpoints_number()` values
    fn sp2gp(&self, coeffs: &[f64], gpdims: &GpDims) -> Result<Vec<f64>>;

    /// Gridpoint values to spectral coefficients
    ///
    /// # Arguments
    /// * `gpdata` - Valid gridpoint values of one level
    /// * `gpdims` - Source gridpoint dimensions
    ///
    /// # Returns
    /// * `Result<Vec<f64>>` - Spectral coefficients
    fn gp2sp(&self, gpdata: &[f64], gpdims: &GpDims) -> Result<Vec<f64>>;

    /// Gridpoint x and y derivatives of a spectral field
    ///
    /// # Arguments
    /// * `coeffs` - Spectral coefficients of one level
    /// * `gpdims` - Target gridpoint dimensions
    ///
    /// # Returns
    /// * `Result<(Vec<f64>, Vec<f64>)>` - (d/dx, d/dy) gridpoint values
    fn compute_xy_spderivatives(&self, coeffs: &[f64], gpdims: &GpDims) -> Result<(Vec<f64>, Vec<f64>)>;

    /// Number of spectral coefficients of one level for `truncation`.
    fn spectral_size(&self, truncation: &Truncation, gpdims: &GpDims) -> usize;
}

/// Spectral geometry of a field: space, truncation and the transform
/// engine. Equality ignores the engine.
#[derive(Debug, Clone)]
pub struct SpectralGeometry {
    pub space: SpectralSpace,
    pub truncation: Truncation,
    transform: Arc<dyn SpectralTransform>,
}

impl SpectralGeometry {
    pub fn new(space: SpectralSpace, truncation: Truncation, transform: Arc<dyn SpectralTransform>) -> Self {
        SpectralGeometry {
            space,
            truncation,
            transform,
        }
    }

    pub fn sp2gp(&self, coeffs: &[f64], gpdims: &GpDims) -> Result<Vec<f64>> {
        self.transform.sp2gp(coeffs, gpdims)
    }

    pub fn gp2sp(&self, gpdata: &[f64], gpdims: &GpDims) -> Result<Vec<f64>> {
        self.transform.gp2sp(gpdata, gpdims)
    }

    pub fn compute_xy_spderivatives(&self, coeffs: &[f64], gpdims: &GpDims) -> Result<(Vec<f64>, Vec<f64>)> {
        self.transform.compute_xy_spderivatives(coeffs, gpdims)
    }

    /// Coefficients expected per level on `gpdims`.
    pub fn spectral_size(&self, gpdims: &GpDims) -> usize {
        self.transform.spectral_size(&self.truncation, gpdims)
    }
}

impl PartialEq for SpectralGeometry {
    fn eq(&self, other: &Self) -> bool {
        self.space == other.space && self.truncation == other.truncation
    }
}

impl fmt::Display for SpectralGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.truncation {
            Truncation::Triangular { max } => write!(f, "{:?} space, triangular truncation {}", self.space, max),
            Truncation::Elliptic { in_x, in_y } => {
                write!(f, "{:?} space, elliptic truncation {}x{}", self.space, in_x, in_y)
            }
        }
    }
}
