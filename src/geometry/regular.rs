use super::{HorizontalGrid, LamZone, NeighborRequest};
use crate::config::Constants;
use crate::error::{FieldError, Result};
use crate::math::{bearing, degrees_nearest_mod, haversine_distance};
use crate::spectral::GpDims;

/// Regular longitude/latitude grid, described by its south-west corner
/// (point (0, 0)) and resolutions in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct RegLLGrid {
    pub input_lon: f64,
    pub input_lat: f64,
    pub x_resolution: f64,
    pub y_resolution: f64,
    pub x: usize,
    pub y: usize,
    pub lam_zone: Option<LamZone>,
}

impl RegLLGrid {
    pub fn new(
        input_lon: f64,
        input_lat: f64,
        x_resolution: f64,
        y_resolution: f64,
        x: usize,
        y: usize,
    ) -> Self {
        RegLLGrid {
            input_lon,
            input_lat,
            x_resolution,
            y_resolution,
            x,
            y,
            lam_zone: None,
        }
    }

    /// Grid covering [lonmin, lonmax] x [latmin, latmax] at `resolution`.
    pub fn from_borders(lonmin: f64, lonmax: f64, latmin: f64, latmax: f64, resolution: f64) -> Result<Self> {
        if resolution <= 0.0 || lonmax < lonmin || latmax < latmin {
            return Err(FieldError::domain(format!(
                "invalid borders ({}, {}, {}, {}) or resolution {}",
                lonmin, lonmax, latmin, latmax, resolution
            )));
        }
        let x = ((lonmax - lonmin) / resolution + 1e-9).floor() as usize + 1;
        let y = ((latmax - latmin) / resolution + 1e-9).floor() as usize + 1;
        Ok(RegLLGrid::new(lonmin, latmin, resolution, resolution, x, y))
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

    /// Whether the grid wraps around the globe in longitude.
    pub fn is_global(&self) -> bool {
        (self.x as f64 * self.x_resolution - 360.0).abs() < 1e-6
    }

    fn center_lon(&self) -> f64 {
        self.input_lon + (self.x.saturating_sub(1)) as f64 * self.x_resolution / 2.0
    }

    pub(crate) fn subarray(
        &self,
        first_i: usize,
        last_i: usize,
        first_j: usize,
        last_j: usize,
        lam_zone: Option<LamZone>,
    ) -> RegLLGrid {
        let (lon, lat) = self.ij2ll(first_i, first_j);
        RegLLGrid {
            input_lon: lon,
            input_lat: lat,
            x: last_i - first_i,
            y: last_j - first_j,
            lam_zone,
            ..self.clone()
        }
    }

    /// Move the first longitude by `shift` degrees, which must be a multiple
    /// of the x resolution. Returns the shift in columns.
    pub fn global_shift_center(&mut self, shift: f64) -> Result<isize> {
        if !self.is_global() {
            return Err(FieldError::domain(
                "global shift of center longitude requires a global grid",
            ));
        }
        let n = shift / self.x_resolution;
        if (n - n.round()).abs() > 1e-6 {
            return Err(FieldError::domain(format!(
                "shift {} is not a multiple of the grid resolution {}",
                shift, self.x_resolution
            )));
        }
        self.input_lon += shift;
        Ok(n.round() as isize)
    }
}

/// Indices of `width` consecutive points around fractional index `f` along
/// an axis of size `n`.
pub(crate) fn axis_stencil(f: f64, n: usize, width: usize, periodic: bool) -> Vec<usize> {
    let base = f.floor() as isize - (width as isize / 2 - 1);
    if periodic {
        return (0..width as isize)
            .map(|m| (base + m).rem_euclid(n as isize) as usize)
            .collect();
    }
    if n <= width {
        return (0..n).collect();
    }
    let base = base.clamp(0, (n - width) as isize) as usize;
    (base..base + width).collect()
}

fn axis_nearest(f: f64, n: usize, periodic: bool) -> usize {
    let r = f.round() as isize;
    if periodic {
        r.rem_euclid(n as isize) as usize
    } else {
        r.clamp(0, n as isize - 1) as usize
    }
}

/// Neighbour search shared by rectangular grids, from the fractional
/// indices of the query point.
pub(crate) fn rectangular_nearest_points(
    grid: &dyn HorizontalGrid,
    lonlat: (f64, f64),
    fij: (f64, f64),
    periodic_x: bool,
    request: NeighborRequest,
) -> Result<Vec<(usize, usize)>> {
    let (nx, ny) = (grid.nx(), grid.ny());
    match request {
        NeighborRequest::Nearest => Ok(vec![(
            axis_nearest(fij.0, nx, periodic_x),
            axis_nearest(fij.1, ny, false),
        )]),
        NeighborRequest::Square(width) => {
            if width == 0 {
                return Err(FieldError::domain("empty neighbourhood requested"));
            }
            let is = axis_stencil(fij.0, nx, width, periodic_x);
            let js = axis_stencil(fij.1, ny, width, false);
            Ok(js
                .iter()
                .flat_map(|&j| is.iter().map(move |&i| (i, j)))
                .collect())
        }
        NeighborRequest::NearestN(n) => {
            let width = if n <= 4 { 2 } else { 4 };
            let mut points = rectangular_nearest_points(
                grid,
                lonlat,
                fij,
                periodic_x,
                NeighborRequest::Square(width),
            )?;
            sort_by_distance(grid, lonlat, &mut points);
            points.truncate(n);
            Ok(points)
        }
    }
}

/// Sort gridpoints by increasing distance to `lonlat` (stable).
pub(crate) fn sort_by_distance(grid: &dyn HorizontalGrid, lonlat: (f64, f64), points: &mut Vec<(usize, usize)>) {
    let mut keyed: Vec<(f64, (usize, usize))> = points
        .iter()
        .map(|&(i, j)| (grid.distance(lonlat, grid.ij2ll(i, j)), (i, j)))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    *points = keyed.into_iter().map(|(_, p)| p).collect();
}

impl HorizontalGrid for RegLLGrid {
    fn name(&self) -> &'static str {
        "regular_lonlat"
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

    fn ij2ll(&self, i: usize, j: usize) -> (f64, f64) {
        (
            self.input_lon + i as f64 * self.x_resolution,
            self.input_lat + j as f64 * self.y_resolution,
        )
    }

    fn ll2ij(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        let lon = degrees_nearest_mod(lon, self.center_lon());
        Ok((
            (lon - self.input_lon) / self.x_resolution,
            (lat - self.input_lat) / self.y_resolution,
        ))
    }

    fn nearest_points(&self, lon: f64, lat: f64, request: NeighborRequest) -> Result<Vec<(usize, usize)>> {
        let fij = self.ll2ij(lon, lat)?;
        rectangular_nearest_points(self, (lon, lat), fij, self.is_global(), request)
    }

    fn point_is_inside_domain_ll(&self, lon: f64, lat: f64, margin: f64) -> bool {
        let (fi, fj) = match self.ll2ij(lon, lat) {
            Ok(fij) => fij,
            Err(_) => return false,
        };
        let inside_j = fj >= -margin && fj <= self.y as f64 - 1.0 + margin;
        let inside_i = self.is_global() || (fi >= -margin && fi <= self.x as f64 - 1.0 + margin);
        inside_i && inside_j && (-90.0..=90.0).contains(&lat)
    }

    fn distance(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        haversine_distance(a.1, a.0, b.1, b.0, Constants::default().earth_radius)
    }

    fn azimuth(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        bearing(a.1, a.0, b.1, b.0)
    }

    fn resolution(&self) -> f64 {
        let (ci, cj) = (self.x / 2, self.y / 2);
        let center = self.ij2ll(ci, cj);
        let east = (center.0 + self.x_resolution, center.1);
        let north = (center.0, center.1 + self.y_resolution);
        (self.distance(center, east) + self.distance(center, north)) / 2.0
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ll2ij_round_trip() {
        let g = RegLLGrid::new(-10.0, 35.0, 0.5, 0.25, 41, 21);
        let (lon, lat) = g.ij2ll(7, 3);
        let (fi, fj) = g.ll2ij(lon, lat).unwrap();
        assert!((fi - 7.0).abs() < 1e-12 && (fj - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_square_stencil_is_clamped_at_edges() {
        let g = RegLLGrid::new(0.0, 0.0, 1.0, 1.0, 10, 10);
        let pts = g.nearest_points(0.2, 8.7, NeighborRequest::Square(4)).unwrap();
        assert_eq!(pts.len(), 16);
        assert_eq!(pts[0], (0, 6));
        assert_eq!(pts[15], (3, 9));
    }

    #[test]
    fn test_global_grid_wraps() {
        let g = RegLLGrid::new(-180.0, -90.0, 1.0, 1.0, 360, 181);
        assert!(g.is_global());
        let pts = g.nearest_points(179.6, 0.0, NeighborRequest::Square(2)).unwrap();
        assert_eq!(pts[0], (359, 90));
        assert_eq!(pts[1], (0, 90));
        assert!(g.point_is_inside_domain_ll(540.0, 10.0, 0.5));
    }

    #[test]
    fn test_global_shift_center() {
        let mut g = RegLLGrid::new(-180.0, -90.0, 1.0, 1.0, 360, 181);
        assert_eq!(g.global_shift_center(-11.0).unwrap(), -11);
        assert_eq!(g.input_lon, -191.0);
        assert!(g.global_shift_center(0.5).is_err());
        let mut lam = RegLLGrid::new(0.0, 0.0, 1.0, 1.0, 10, 10);
        assert!(lam.global_shift_center(1.0).is_err());
    }

    #[test]
    fn test_from_borders() {
        let g = RegLLGrid::from_borders(-5.0, 5.0, 40.0, 45.0, 0.5).unwrap();
        assert_eq!((g.x, g.y), (21, 11));
    }
}
