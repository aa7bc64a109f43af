use super::regular::sort_by_distance;
use super::{HorizontalDimensions, HorizontalGrid, NeighborRequest};
use crate::config::Constants;
use crate::error::{FieldError, Result};
use crate::math::{
    bearing, find_grid_indices, gaussian_latitudes, haversine_distance, rotate_from_pole,
    rotate_to_pole,
};
use crate::spectral::GpDims;

/// Global Gaussian grid: latitudes are the roots of the Legendre polynomial
/// of degree `lat_number`, each latitude band holding `lon_number_by_lat[j]`
/// equally spaced longitudes starting at 0. With a `pole`, the whole grid
/// is defined in a frame whose north pole lies at that geographic point.
///
/// Data is laid out (lat_number, max lon number); points past the end of a
/// short band are masked.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussGrid {
    pub lat_number: usize,
    pub lon_number_by_lat: Vec<usize>,
    /// Geographic (lon, lat) of the grid's pole
    pub pole: Option<(f64, f64)>,
    latitudes: Vec<f64>,
}

impl GaussGrid {
    pub fn new(lon_number_by_lat: Vec<usize>, pole: Option<(f64, f64)>) -> Result<Self> {
        if lon_number_by_lat.is_empty() || lon_number_by_lat.iter().any(|&n| n == 0) {
            return Err(FieldError::domain(
                "a Gauss grid needs at least one latitude and one longitude per latitude",
            ));
        }
        let pole = pole.filter(|p| (p.1 - 90.0).abs() > 1e-12);
        let lat_number = lon_number_by_lat.len();
        Ok(GaussGrid {
            lat_number,
            lon_number_by_lat,
            pole,
            latitudes: gaussian_latitudes(lat_number),
        })
    }

    /// Regular (unreduced) Gauss grid.
    pub fn regular(lat_number: usize, lon_number: usize) -> Result<Self> {
        GaussGrid::new(vec![lon_number; lat_number], None)
    }

    /// Latitudes of the bands, north to south, in the grid frame.
    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    fn band_spacing(&self, j: usize) -> f64 {
        360.0 / self.lon_number_by_lat[j] as f64
    }

    /// `width` consecutive longitudes of band `j` around rotated longitude `rlon`.
    fn band_stencil(&self, j: usize, rlon: f64, width: usize) -> Vec<usize> {
        let n = self.lon_number_by_lat[j] as isize;
        let f = rlon.rem_euclid(360.0) / self.band_spacing(j);
        let base = f.floor() as isize - (width as isize / 2 - 1);
        (0..width as isize)
            .map(|m| (base + m).rem_euclid(n) as usize)
            .collect()
    }

    /// `width` consecutive bands around rotated latitude `rlat`.
    fn band_rows(&self, rlat: f64, width: usize) -> Vec<usize> {
        let (j0, _, _) = match find_grid_indices(&self.latitudes, rlat) {
            Ok(found) => found,
            Err(_) => (0, 0, 0.0),
        };
        if self.lat_number <= width {
            return (0..self.lat_number).collect();
        }
        let base = (j0 as isize - (width as isize / 2 - 1)).clamp(0, (self.lat_number - width) as isize)
            as usize;
        (base..base + width).collect()
    }

    fn square(&self, rlon: f64, rlat: f64, width: usize) -> Vec<(usize, usize)> {
        self.band_rows(rlat, width)
            .into_iter()
            .flat_map(|j| {
                self.band_stencil(j, rlon, width)
                    .into_iter()
                    .map(move |i| (i, j))
            })
            .collect()
    }
}

impl HorizontalGrid for GaussGrid {
    fn name(&self) -> &'static str {
        let reduced = self
            .lon_number_by_lat
            .iter()
            .any(|&n| n != self.lon_number_by_lat[0]);
        match (self.pole.is_some(), reduced) {
            (true, _) => "rotated_reduced_gauss",
            (false, true) => "reduced_gauss",
            (false, false) => "regular_gauss",
        }
    }

    fn nx(&self) -> usize {
        self.lon_number_by_lat.iter().copied().max().unwrap_or(0)
    }

    fn ny(&self) -> usize {
        self.lat_number
    }

    fn dimensions(&self) -> HorizontalDimensions {
        HorizontalDimensions {
            x: self.nx(),
            y: self.lat_number,
            lon_number_by_lat: Some(self.lon_number_by_lat.clone()),
        }
    }

    fn is_rectangular(&self) -> bool {
        false
    }

    fn is_valid_point(&self, i: usize, j: usize) -> bool {
        j < self.lat_number && i < self.lon_number_by_lat[j]
    }

    fn native_coordinates(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self.pole {
            Some(pole) => rotate_to_pole(lon, lat, pole),
            None => (lon, lat),
        }
    }

    fn native_ij2ll(&self, i: usize, j: usize) -> (f64, f64) {
        (i as f64 * self.band_spacing(j), self.latitudes[j])
    }

    fn ij2ll(&self, i: usize, j: usize) -> (f64, f64) {
        let (rlon, rlat) = self.native_ij2ll(i, j);
        match self.pole {
            Some(pole) => rotate_from_pole(rlon, rlat, pole),
            None => (rlon, rlat),
        }
    }

    fn ll2ij(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        let (rlon, rlat) = self.native_coordinates(lon, lat);
        let (j0, j1, w) = find_grid_indices(&self.latitudes, rlat).map_err(FieldError::Domain)?;
        let fj = j0 as f64 + if j1 == j0 { 0.0 } else { w };
        let band = (fj.round() as usize).min(self.lat_number - 1);
        let fi = rlon.rem_euclid(360.0) / self.band_spacing(band);
        Ok((fi, fj))
    }

    fn nearest_points(&self, lon: f64, lat: f64, request: NeighborRequest) -> Result<Vec<(usize, usize)>> {
        let (rlon, rlat) = self.native_coordinates(lon, lat);
        match request {
            NeighborRequest::Nearest => {
                let mut candidates = self.square(rlon, rlat, 2);
                sort_by_distance(self, (lon, lat), &mut candidates);
                Ok(candidates.into_iter().take(1).collect())
            }
            NeighborRequest::NearestN(n) => {
                let width = if n <= 4 { 2 } else { 4 };
                let mut candidates = self.square(rlon, rlat, width);
                candidates.dedup();
                sort_by_distance(self, (lon, lat), &mut candidates);
                candidates.truncate(n);
                Ok(candidates)
            }
            NeighborRequest::Square(width) => {
                if width == 0 {
                    return Err(FieldError::domain("empty neighbourhood requested"));
                }
                Ok(self.square(rlon, rlat, width))
            }
        }
    }

    fn point_is_inside_domain_ll(&self, _lon: f64, lat: f64, _margin: f64) -> bool {
        (-90.0..=90.0).contains(&lat)
    }

    fn distance(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        haversine_distance(a.1, a.0, b.1, b.0, Constants::default().earth_radius)
    }

    fn azimuth(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        bearing(a.1, a.0, b.1, b.0)
    }

    /// Meridional distance between the two southernmost bands.
    fn resolution(&self) -> f64 {
        let radius = Constants::default().earth_radius;
        if self.lat_number < 2 {
            return radius * std::f64::consts::PI;
        }
        let n = self.lat_number;
        haversine_distance(self.latitudes[n - 2], 0.0, self.latitudes[n - 1], 0.0, radius)
    }

    fn gpdims(&self) -> Result<GpDims> {
        Ok(GpDims::Global {
            lat_number: self.lat_number,
            lon_number_by_lat: self.lon_number_by_lat.clone(),
        })
    }

    fn grid_north_bearing(&self, i: usize, j: usize) -> f64 {
        let pole = match self.pole {
            Some(pole) => pole,
            None => return 0.0,
        };
        let (rlon, rlat) = self.native_ij2ll(i, j);
        let here = self.ij2ll(i, j);
        let step = 0.01;
        let (target_rlat, flip) = if rlat + step < 90.0 {
            (rlat + step, 0.0)
        } else {
            (rlat - step, 180.0)
        };
        let there = rotate_from_pole(rlon, target_rlat, pole);
        let b = bearing(here.1, here.0, there.1, there.0) + flip;
        crate::math::degrees_nearest_mod(b, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduced_grid_masking() {
        let g = GaussGrid::new(vec![4, 8, 8, 4], None).unwrap();
        assert_eq!(g.name(), "reduced_gauss");
        assert_eq!((g.nx(), g.ny()), (8, 4));
        assert!(g.is_valid_point(3, 0));
        assert!(!g.is_valid_point(4, 0));
        assert!(g.is_valid_point(7, 1));
    }

    #[test]
    fn test_nearest_point_on_node() {
        let g = GaussGrid::new(vec![8, 12, 12, 8], None).unwrap();
        let (lon, lat) = g.ij2ll(5, 1);
        let pts = g.nearest_points(lon, lat, NeighborRequest::Nearest).unwrap();
        assert_eq!(pts, vec![(5, 1)]);
    }

    #[test]
    fn test_square_wraps_longitudes() {
        let g = GaussGrid::regular(6, 12).unwrap();
        let lat = g.latitudes()[2];
        let pts = g.nearest_points(359.0, lat - 0.1, NeighborRequest::Square(2)).unwrap();
        assert_eq!(pts, vec![(11, 2), (0, 2), (11, 3), (0, 3)]);
    }

    #[test]
    fn test_rotated_grid_bearing() {
        let plain = GaussGrid::regular(8, 16).unwrap();
        assert_eq!(plain.grid_north_bearing(3, 3), 0.0);
        let rotated = GaussGrid::new(vec![16; 8], Some((0.0, 45.0))).unwrap();
        assert_eq!(rotated.name(), "rotated_reduced_gauss");
        // on the rotated meridian through the true pole, grid north is true north
        let b = rotated.grid_north_bearing(0, 4);
        assert!(b.abs() < 1e-6, "bearing {}", b);
    }
}
