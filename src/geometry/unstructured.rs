use super::regular::sort_by_distance;
use super::{HorizontalGrid, NeighborRequest};
use crate::config::Constants;
use crate::error::{FieldError, Result};
use crate::math::{bearing, degrees_nearest_mod, haversine_distance};
use crate::spectral::GpDims;

/// Arbitrary list of points, laid out (Y, X) row by row; by default a
/// single row (Y = 1).
#[derive(Debug, Clone, PartialEq)]
pub struct UnstructuredGrid {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
    pub x: usize,
    pub y: usize,
}

impl UnstructuredGrid {
    pub fn new(lons: Vec<f64>, lats: Vec<f64>) -> Result<Self> {
        let n = lons.len();
        UnstructuredGrid::with_shape(lons, lats, n, 1)
    }

    pub fn with_shape(lons: Vec<f64>, lats: Vec<f64>, x: usize, y: usize) -> Result<Self> {
        if lons.len() != lats.len() || lons.len() != x * y || lons.is_empty() {
            return Err(FieldError::shape(format!(
                "{} longitudes and {} latitudes for a {}x{} unstructured grid",
                lons.len(),
                lats.len(),
                y,
                x
            )));
        }
        Ok(UnstructuredGrid { lons, lats, x, y })
    }

    /// Single-point grid.
    pub fn point(lon: f64, lat: f64) -> Self {
        UnstructuredGrid {
            lons: vec![lon],
            lats: vec![lat],
            x: 1,
            y: 1,
        }
    }

    fn all_points(&self) -> Vec<(usize, usize)> {
        (0..self.y)
            .flat_map(|j| (0..self.x).map(move |i| (i, j)))
            .collect()
    }
}

impl HorizontalGrid for UnstructuredGrid {
    fn name(&self) -> &'static str {
        "unstructured"
    }

    fn nx(&self) -> usize {
        self.x
    }

    fn ny(&self) -> usize {
        self.y
    }

    fn is_rectangular(&self) -> bool {
        false
    }

    fn ij2ll(&self, i: usize, j: usize) -> (f64, f64) {
        let idx = j * self.x + i;
        (self.lons[idx], self.lats[idx])
    }

    fn ll2ij(&self, _lon: f64, _lat: f64) -> Result<(f64, f64)> {
        Err(FieldError::not_implemented(
            "fractional indices on an unstructured grid",
        ))
    }

    fn nearest_points(&self, lon: f64, lat: f64, request: NeighborRequest) -> Result<Vec<(usize, usize)>> {
        let n = match request {
            NeighborRequest::Nearest => 1,
            NeighborRequest::NearestN(n) => n,
            NeighborRequest::Square(_) => {
                return Err(FieldError::not_implemented(
                    "interpolation neighbourhood on an unstructured grid",
                ))
            }
        };
        let mut points = self.all_points();
        sort_by_distance(self, (lon, lat), &mut points);
        points.truncate(n);
        Ok(points)
    }

    /// Inside the lon/lat bounding box of the points.
    fn point_is_inside_domain_ll(&self, lon: f64, lat: f64, _margin: f64) -> bool {
        let reference = self.lons[0];
        let wrapped: Vec<f64> = self
            .lons
            .iter()
            .map(|&l| degrees_nearest_mod(l, reference))
            .collect();
        let lonmin = wrapped.iter().copied().fold(f64::INFINITY, f64::min);
        let lonmax = wrapped.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let latmin = self.lats.iter().copied().fold(f64::INFINITY, f64::min);
        let latmax = self.lats.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lon = degrees_nearest_mod(lon, reference);
        lon >= lonmin && lon <= lonmax && lat >= latmin && lat <= latmax
    }

    fn distance(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        haversine_distance(a.1, a.0, b.1, b.0, Constants::default().earth_radius)
    }

    fn azimuth(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        bearing(a.1, a.0, b.1, b.0)
    }

    /// Mean nearest-neighbour distance over (at most) the first 100 points.
    fn resolution(&self) -> f64 {
        let n = self.lons.len();
        if n < 2 {
            return 0.0;
        }
        let sample = n.min(100);
        let total: f64 = (0..sample)
            .map(|p| {
                let here = (self.lons[p], self.lats[p]);
                (0..n)
                    .filter(|&q| q != p)
                    .map(|q| self.distance(here, (self.lons[q], self.lats[q])))
                    .fold(f64::INFINITY, f64::min)
            })
            .sum();
        total / sample as f64
    }

    fn gpdims(&self) -> Result<GpDims> {
        Err(FieldError::not_implemented(
            "spectral transforms on an unstructured grid",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_n_sorted() {
        let g = UnstructuredGrid::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0; 4]).unwrap();
        let pts = g.nearest_points(2.2, 0.0, NeighborRequest::NearestN(2)).unwrap();
        assert_eq!(pts, vec![(2, 0), (3, 0)]);
        assert!(g.nearest_points(2.2, 0.0, NeighborRequest::Square(2)).is_err());
    }

    #[test]
    fn test_bounding_box_membership() {
        let g = UnstructuredGrid::new(vec![350.0, 5.0], vec![40.0, 45.0]).unwrap();
        assert!(g.point_is_inside_domain_ll(0.0, 42.0, 0.0));
        assert!(!g.point_is_inside_domain_ll(20.0, 42.0, 0.0));
    }
}
