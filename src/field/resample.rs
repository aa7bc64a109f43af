use log::{debug, warn};
use ndarray::{s, Array4, Ix4};
use rayon::prelude::*;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::d3field::FieldData;
use super::extract::LonLatBox;
use super::{CommonField, D3Field};
use crate::config::Constants;
use crate::error::{FieldError, Result};
use crate::geometry::{Geometry, Grid, RegLLGrid, Structure, Subzone, VCoordinate};
use crate::math::{chord_to_arc, lonlat_to_xyz};

/// Weighting of the neighbours gathered for each target point.
#[derive(Clone, Default)]
pub enum Weighting {
    /// Value of the nearest neighbour
    #[default]
    Nearest,
    /// Gaussian weights exp(-d²/σ²); σ defaults to twice the source
    /// resolution
    Gauss { sigma: Option<f64> },
    /// Caller-supplied distance (m) to weight function
    Custom(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl fmt::Debug for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weighting::Nearest => write!(f, "Nearest"),
            Weighting::Gauss { sigma } => write!(f, "Gauss {{ sigma: {:?} }}", sigma),
            Weighting::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Options of [`CommonField::resample`].
#[derive(Debug, Clone)]
pub struct ResampleOptions {
    pub weighting: Weighting,
    /// Search radius (m); defaults to 4 times the source resolution
    pub radius: Option<f64>,
    /// Maximum number of neighbours per target point
    pub neighbours: Option<usize>,
    /// Value of target points without any neighbour
    pub fill_value: f64,
    /// Resample only the given subzone of a limited-area source
    pub subzone: Option<Subzone>,
    /// Also compute standard deviation and count fields
    pub with_uncert: bool,
    /// Neighbour correspondence computed beforehand
    pub neighbour_info: Option<Arc<NeighbourInfo>>,
}

impl Default for ResampleOptions {
    fn default() -> Self {
        ResampleOptions {
            weighting: Weighting::Nearest,
            radius: None,
            neighbours: None,
            fill_value: f64::NAN,
            subzone: None,
            with_uncert: false,
            neighbour_info: None,
        }
    }
}

impl ResampleOptions {
    pub fn weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn neighbours(mut self, neighbours: usize) -> Self {
        self.neighbours = Some(neighbours);
        self
    }

    pub fn fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn subzone(mut self, subzone: Subzone) -> Self {
        self.subzone = Some(subzone);
        self
    }

    pub fn with_uncert(mut self, with_uncert: bool) -> Self {
        self.with_uncert = with_uncert;
        self
    }

    pub fn neighbour_info(mut self, info: Arc<NeighbourInfo>) -> Self {
        self.neighbour_info = Some(info);
        self
    }
}

/// Source gridpoint in the search tree: cartesian coordinates on the
/// sphere (or the plane, for planar grids) and its rank among valid points.
#[derive(Debug, Clone)]
struct SourcePoint {
    xyz: [f64; 3],
    index: usize,
}

impl RTreeObject for SourcePoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.xyz)
    }
}

impl PointDistance for SourcePoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.xyz[0] - point[0];
        let dy = self.xyz[1] - point[1];
        let dz = self.xyz[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Neighbour correspondence between a source and a target grid.
///
/// Expensive to compute, cheap to replay: reuse it through
/// [`ResampleOptions::neighbour_info`] for all fields sharing the grids.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighbourInfo {
    /// (Y, X) of the source grid (subzone applied)
    source_dims: (usize, usize),
    /// (i, j) of the valid source points
    source_points: Vec<(usize, usize)>,
    /// (Y, X) of the target grid
    target_dims: (usize, usize),
    /// (i, j) of the valid target points
    target_points: Vec<(usize, usize)>,
    /// For each target point, (source point rank, distance in m) of its
    /// neighbours by increasing distance
    neighbours: Vec<Vec<(usize, f64)>>,
    /// Search radius (m)
    pub radius: f64,
    /// Default gaussian sigma (m)
    pub sigma: f64,
    pub subzone: Option<Subzone>,
}

impl NeighbourInfo {
    pub fn target_points_number(&self) -> usize {
        self.target_points.len()
    }

    /// Number of target points that found no neighbour within the radius.
    pub fn orphans(&self) -> usize {
        self.neighbours.iter().filter(|n| n.is_empty()).count()
    }

    /// Neighbours of target point (i, j), as source (i, j) and distance.
    pub fn neighbours_of(&self, i: usize, j: usize) -> Option<Vec<((usize, usize), f64)>> {
        let rank = self.target_points.iter().position(|&p| p == (i, j))?;
        Some(
            self.neighbours[rank]
                .iter()
                .map(|&(s, d)| (self.source_points[s], d))
                .collect(),
        )
    }
}

/// Resampled field, with optional uncertainty side fields.
#[derive(Debug, Clone)]
pub struct Resampled {
    pub field: D3Field,
    /// Weighted standard deviation of the neighbour values
    pub stddev: Option<D3Field>,
    /// Number of valid neighbour values
    pub counts: Option<D3Field>,
}

fn source_geometry<F: CommonField + ?Sized>(field: &F, subzone: Option<Subzone>) -> Result<Geometry> {
    match subzone {
        Some(zone) => field.geometry().select_subzone(zone),
        None => Ok(field.geometry().clone()),
    }
}

fn valid_points(geometry: &Geometry) -> Vec<(usize, usize)> {
    let grid = geometry.hgrid();
    (0..grid.ny())
        .flat_map(|j| (0..grid.nx()).map(move |i| (i, j)))
        .filter(|&(i, j)| grid.is_valid_point(i, j))
        .collect()
}

pub(crate) fn neighbour_info<F: CommonField + ?Sized>(
    field: &F,
    target: &Geometry,
    options: &ResampleOptions,
) -> Result<NeighbourInfo> {
    let start = Instant::now();
    let constants = Constants::default();
    let source = source_geometry(field, options.subzone)?;
    let planar = !source.hgrid().is_lonlat();
    if planar != !target.hgrid().is_lonlat() {
        return Err(FieldError::domain(
            "cannot resample between planar and lon/lat geometries",
        ));
    }
    let radius_of_earth = constants.earth_radius;
    let to_xyz = |lonlat: (f64, f64)| -> [f64; 3] {
        if planar {
            [lonlat.0, lonlat.1, 0.0]
        } else {
            lonlat_to_xyz(lonlat.0, lonlat.1, radius_of_earth)
        }
    };
    let to_distance = |distance_2: f64| -> f64 {
        if planar {
            distance_2.sqrt()
        } else {
            chord_to_arc(distance_2.sqrt(), radius_of_earth)
        }
    };

    let resolution = source.resolution();
    let radius = options
        .radius
        .unwrap_or(constants.resample_radius_factor * resolution);
    let sigma = constants.resample_sigma_factor * resolution;
    let nmax = match options.weighting {
        Weighting::Nearest => 1,
        _ => options.neighbours.unwrap_or(constants.resample_neighbours),
    };
    if nmax == 0 {
        return Err(FieldError::domain("at least one neighbour is needed to resample"));
    }

    let source_points = valid_points(&source);
    let tree = RTree::bulk_load(
        source_points
            .iter()
            .enumerate()
            .map(|(index, &(i, j))| SourcePoint {
                xyz: to_xyz(source.ij2ll(i, j)),
                index,
            })
            .collect(),
    );
    let target_points = valid_points(target);
    let neighbours: Vec<Vec<(usize, f64)>> = target_points
        .par_iter()
        .map(|&(i, j)| {
            let xyz = to_xyz(target.ij2ll(i, j));
            tree.nearest_neighbor_iter_with_distance_2(&xyz)
                .take(nmax)
                .map(|(p, d2)| (p.index, to_distance(d2)))
                .take_while(|&(_, d)| d <= radius)
                .collect()
        })
        .collect();

    let info = NeighbourInfo {
        source_dims: (source.hgrid().ny(), source.hgrid().nx()),
        source_points,
        target_dims: (target.hgrid().ny(), target.hgrid().nx()),
        target_points,
        neighbours,
        radius,
        sigma,
        subzone: options.subzone,
    };
    debug!(
        "neighbour info: {} target points, radius {:.0} m, computed in {:?}",
        info.target_points.len(),
        radius,
        start.elapsed()
    );
    if info.orphans() > 0 {
        warn!("{} target point(s) without neighbour within {:.0} m", info.orphans(), radius);
    }
    Ok(info)
}

/// Weighted mean, weighted standard deviation and count of the valid
/// values among `neighbours`.
fn weighted_value(
    values: &[f64],
    neighbours: &[(usize, f64)],
    weight: &(dyn Fn(f64) -> f64 + Sync),
    nearest: bool,
) -> Option<(f64, f64, usize)> {
    let mut samples = neighbours
        .iter()
        .map(|&(s, d)| (values[s], d))
        .filter(|(v, _)| !v.is_nan());
    if nearest {
        return samples.next().map(|(v, _)| (v, 0.0, 1));
    }
    let samples: Vec<(f64, f64)> = samples.map(|(v, d)| (v, weight(d))).collect();
    let total: f64 = samples.iter().map(|(_, w)| w).sum();
    if samples.is_empty() || total <= 0.0 {
        return None;
    }
    let mean = samples.iter().map(|(v, w)| v * w).sum::<f64>() / total;
    let variance = samples.iter().map(|(v, w)| w * (v - mean).powi(2)).sum::<f64>() / total;
    Some((mean, variance.sqrt(), samples.len()))
}

pub(crate) fn resample<F: CommonField + ?Sized>(
    field: &F,
    target: &Geometry,
    options: &ResampleOptions,
) -> Result<Resampled> {
    if field.spectral() {
        return Err(FieldError::domain("field must be gridpoint to be resampled"));
    }
    let computed;
    let info = match &options.neighbour_info {
        Some(info) => {
            if info.target_dims != (target.hgrid().ny(), target.hgrid().nx())
                || info.subzone != options.subzone
            {
                return Err(FieldError::domain(
                    "neighbour info does not match the target geometry or subzone",
                ));
            }
            info.as_ref()
        }
        None => {
            computed = neighbour_info(field, target, options)?;
            &computed
        }
    };
    let data = field
        .getdata(options.subzone, true)?
        .into_dimensionality::<Ix4>()?;
    let (nt, nz, ny, nx) = data.dim();
    if (ny, nx) != info.source_dims {
        return Err(FieldError::domain(
            "neighbour info does not match the source geometry",
        ));
    }

    let sigma = match options.weighting {
        Weighting::Gauss { sigma: Some(s) } => s,
        _ => info.sigma,
    };
    let gauss = move |d: f64| (-(d * d) / (sigma * sigma)).exp();
    let weight: &(dyn Fn(f64) -> f64 + Sync) = match &options.weighting {
        Weighting::Custom(f) => f.as_ref(),
        _ => &gauss,
    };
    let nearest = matches!(options.weighting, Weighting::Nearest);

    let (tny, tnx) = info.target_dims;
    let mut values = Array4::from_elem((nt, nz, tny, tnx), f64::NAN);
    let mut stddev = Array4::from_elem((nt, nz, tny, tnx), f64::NAN);
    let mut counts = Array4::from_elem((nt, nz, tny, tnx), f64::NAN);
    for t in 0..nt {
        for k in 0..nz {
            let slice = data.slice(s![t, k, .., ..]);
            let flat: Vec<f64> = info.source_points.iter().map(|&(i, j)| slice[[j, i]]).collect();
            let results: Vec<Option<(f64, f64, usize)>> = info
                .neighbours
                .par_iter()
                .map(|n| weighted_value(&flat, n, weight, nearest))
                .collect();
            for (&(i, j), result) in info.target_points.iter().zip(results) {
                let (v, sd, count) = result.unwrap_or((options.fill_value, f64::NAN, 0));
                values[[t, k, j, i]] = v;
                stddev[[t, k, j, i]] = sd;
                counts[[t, k, j, i]] = count as f64;
            }
        }
    }

    let source = field.geometry();
    let structure = match (source.structure, tny * tnx) {
        (Structure::V1D, n) | (Structure::Point, n) if n > 1 => {
            if source.nlevels() > 1 {
                Structure::D3
            } else {
                Structure::H2D
            }
        }
        (s, _) => s,
    };
    let geometry = Geometry::new(structure, target.grid.clone(), source.vcoordinate.clone())?
        .with_position(target.position_on_horizontal_grid);
    let make = |fid_suffix: Option<&str>, data: Array4<f64>| {
        let mut fid = field.fid().clone();
        if let Some(suffix) = fid_suffix {
            fid.set_generic("resample", suffix);
        }
        D3Field::from_parts(
            fid,
            geometry.clone(),
            field.validity().clone(),
            None,
            field.processtype().map(str::to_string),
            Some(FieldData::Gridpoint(data)),
        )
    };
    Ok(Resampled {
        field: make(None, values),
        stddev: options.with_uncert.then(|| make(Some("stddev"), stddev)),
        counts: options.with_uncert.then(|| make(Some("counts"), counts)),
    })
}

pub(crate) fn resample_on_regularll<F: CommonField + ?Sized>(
    field: &F,
    borders: &LonLatBox,
    resolution: f64,
    options: &ResampleOptions,
) -> Result<Resampled> {
    let target = regularll_target(borders, resolution)?;
    resample(field, &target, options)
}

/// Regular lon/lat geometry covering `borders` at `resolution`.
pub(crate) fn regularll_target(borders: &LonLatBox, resolution: f64) -> Result<Geometry> {
    let grid = RegLLGrid::from_borders(
        borders.lonmin,
        borders.lonmax,
        borders.latmin,
        borders.latmax,
        resolution,
    )?;
    Geometry::new(Structure::H2D, Grid::RegularLonLat(grid), VCoordinate::unspecified())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_value_skips_masked() {
        let values = [1.0, f64::NAN, 3.0];
        let neighbours = [(1, 0.0), (0, 1.0), (2, 1.0)];
        let unit = |_: f64| 1.0;
        let (v, sd, n) = weighted_value(&values, &neighbours, &unit, false).unwrap();
        assert_eq!(n, 2);
        assert!((v - 2.0).abs() < 1e-12);
        assert!((sd - 1.0).abs() < 1e-12);
        let (v, _, n) = weighted_value(&values, &neighbours, &unit, true).unwrap();
        assert_eq!((v, n), (1.0, 1));
        assert!(weighted_value(&values, &[(1, 0.0)], &unit, false).is_none());
    }
}
