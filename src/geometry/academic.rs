use super::regular::rectangular_nearest_points;
use super::{HorizontalGrid, LamZone, NeighborRequest};
use crate::error::{FieldError, Result};
use crate::spectral::GpDims;

/// Planar grid of an academic (idealized) configuration. Coordinates are
/// (x, y) in metres, in place of (lon, lat).
#[derive(Debug, Clone, PartialEq)]
pub struct AcademicGrid {
    pub x_resolution: f64,
    pub y_resolution: f64,
    pub x: usize,
    pub y: usize,
    /// Coordinates of gridpoint (0, 0)
    pub x0: f64,
    pub y0: f64,
    pub lam_zone: Option<LamZone>,
}

impl AcademicGrid {
    pub fn new(x_resolution: f64, y_resolution: f64, x: usize, y: usize) -> Self {
        AcademicGrid {
            x_resolution,
            y_resolution,
            x,
            y,
            x0: 0.0,
            y0: 0.0,
            lam_zone: None,
        }
    }

    pub fn with_lam_zone(mut self, zone: LamZone) -> Result<Self> {
        if !zone.check(self.x, self.y) {
            return Err(FieldError::domain(format!(
                "LAM zone {:?} inconsistent with a {}x{} grid",
                zone, self.x, self.y
            )));
        }
        self.lam_zone = Some(zone);
        Ok(self)
    }

    pub(crate) fn subarray(
        &self,
        first_i: usize,
        last_i: usize,
        first_j: usize,
        last_j: usize,
        lam_zone: Option<LamZone>,
    ) -> AcademicGrid {
        let (x0, y0) = self.ij2ll(first_i, first_j);
        AcademicGrid {
            x0,
            y0,
            x: last_i - first_i,
            y: last_j - first_j,
            lam_zone,
            ..self.clone()
        }
    }
}

impl HorizontalGrid for AcademicGrid {
    fn name(&self) -> &'static str {
        "academic"
    }

    fn nx(&self) -> usize {
        self.x
    }

    fn ny(&self) -> usize {
        self.y
    }

    fn is_rectangular(&self) -> bool {
        true
    }

    fn is_lonlat(&self) -> bool {
        false
    }

    fn ij2ll(&self, i: usize, j: usize) -> (f64, f64) {
        (
            self.x0 + i as f64 * self.x_resolution,
            self.y0 + j as f64 * self.y_resolution,
        )
    }

    fn ll2ij(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        Ok((
            (x - self.x0) / self.x_resolution,
            (y - self.y0) / self.y_resolution,
        ))
    }

    fn nearest_points(&self, x: f64, y: f64, request: NeighborRequest) -> Result<Vec<(usize, usize)>> {
        let fij = self.ll2ij(x, y)?;
        rectangular_nearest_points(self, (x, y), fij, false, request)
    }

    fn point_is_inside_domain_ll(&self, x: f64, y: f64, margin: f64) -> bool {
        let (fi, fj) = ((x - self.x0) / self.x_resolution, (y - self.y0) / self.y_resolution);
        fi >= -margin
            && fi <= self.x as f64 - 1.0 + margin
            && fj >= -margin
            && fj <= self.y as f64 - 1.0 + margin
    }

    fn distance(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
    }

    fn azimuth(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        let az = (b.0 - a.0).atan2(b.1 - a.1).to_degrees();
        if az <= -180.0 {
            az + 360.0
        } else {
            az
        }
    }

    fn resolution(&self) -> f64 {
        (self.x_resolution + self.y_resolution) / 2.0
    }

    fn lam_zone(&self) -> Option<&LamZone> {
        self.lam_zone.as_ref()
    }

    fn gpdims(&self) -> Result<GpDims> {
        let (x_ci, y_ci) = self
            .lam_zone
            .map(|z| (z.x_ci, z.y_ci))
            .unwrap_or((self.x, self.y));
        Ok(GpDims::Lam {
            x: self.x,
            y: self.y,
            x_ci,
            y_ci,
            x_resolution: self.x_resolution,
            y_resolution: self.y_resolution,
        })
    }
}
