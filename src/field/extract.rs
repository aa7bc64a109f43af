use log::debug;
use ndarray::{s, Array4};

use super::d3field::FieldData;
use super::lookup::{interpolate_at, ExternalDistance, Interpolation};
use super::{CommonField, D3Field};
use crate::error::{FieldError, Result};
use crate::geometry::vcoord::{HYBRID_HEIGHT, HYBRID_PRESSURE, SIMPLE_LEVEL_TYPES, UNSPECIFIED};
use crate::geometry::{Geometry, Grid, HorizontalPosition, UnstructuredGrid, VCoordinate};
use crate::math::{compass_direction, degrees_nearest_mod};

/// Longitude/latitude bounding box, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLatBox {
    pub lonmin: f64,
    pub lonmax: f64,
    pub latmin: f64,
    pub latmax: f64,
}

impl LonLatBox {
    pub fn new(lonmin: f64, lonmax: f64, latmin: f64, latmax: f64) -> Self {
        LonLatBox {
            lonmin,
            lonmax,
            latmin,
            latmax,
        }
    }

    /// Box enlarged by a tenth of its extent on each side.
    pub fn with_extra_10th(&self) -> Self {
        let dx = (degrees_nearest_mod(self.lonmax, 0.0) - degrees_nearest_mod(self.lonmin, 0.0)) / 10.0;
        let dy = (self.latmax - self.latmin) / 10.0;
        LonLatBox {
            lonmin: self.lonmin - dx,
            lonmax: self.lonmax + dx,
            latmin: self.latmin - dy,
            latmax: self.latmax + dy,
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.lonmin <= lon && lon <= self.lonmax && self.latmin <= lat && lat <= self.latmax
    }
}

/// Options of [`CommonField::extract_subdomain`].
#[derive(Debug, Clone, Copy)]
pub struct SubdomainOptions<'a> {
    pub interpolation: Interpolation,
    pub external_distance: Option<ExternalDistance<'a>>,
    /// Drop hybrid-height levels outside the physical domain
    pub exclude_extralevels: bool,
    /// Compute the data, or return a metadata-only field
    pub getdata: bool,
}

impl Default for SubdomainOptions<'_> {
    fn default() -> Self {
        SubdomainOptions {
            interpolation: Interpolation::Nearest,
            external_distance: None,
            exclude_extralevels: true,
            getdata: true,
        }
    }
}

impl<'a> SubdomainOptions<'a> {
    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn external_distance(mut self, external: ExternalDistance<'a>) -> Self {
        self.external_distance = Some(external);
        self
    }

    pub fn exclude_extralevels(mut self, exclude: bool) -> Self {
        self.exclude_extralevels = exclude;
        self
    }

    pub fn getdata(mut self, getdata: bool) -> Self {
        self.getdata = getdata;
        self
    }
}

/// Vertical coordinate of an extraction and, for each of its levels, the
/// index of the source level it comes from.
fn subdomain_vcoordinate(
    source: &VCoordinate,
    target: &VCoordinate,
    exclude_extralevels: bool,
) -> Result<(VCoordinate, Vec<usize>)> {
    let kind = source.typeoffirstfixedsurface;
    let mut indices: Vec<usize> = (0..source.levels.len()).collect();
    let grid = match kind {
        HYBRID_PRESSURE => source.grid.clone(),
        HYBRID_HEIGHT => {
            if exclude_extralevels {
                let top = source
                    .grid
                    .as_ref()
                    .map_or(0.0, |g| g.gridlevels.len() as f64 - 1.0);
                indices.retain(|&k| match source.levels[k].value() {
                    Some(v) => v >= 1.0 && v <= top,
                    None => true,
                });
            }
            source.grid.clone()
        }
        k if SIMPLE_LEVEL_TYPES.contains(&k) => None,
        other => {
            return Err(FieldError::not_implemented(format!(
                "type of first surface level: {}",
                other
            )))
        }
    };
    if target.typeoffirstfixedsurface != UNSPECIFIED && target.typeoffirstfixedsurface != kind {
        return Err(FieldError::domain("extract_subdomain cannot change vertical coordinate"));
    }
    if target.position_on_grid.is_some() && target.position_on_grid != source.position_on_grid {
        return Err(FieldError::domain(
            "extract_subdomain cannot change position on vertical grid",
        ));
    }
    if target.grid.is_some() && target.grid != grid {
        return Err(FieldError::domain("extract_subdomain cannot change vertical grid"));
    }
    if !target.levels.is_empty() {
        indices = target
            .levels
            .iter()
            .map(|level| {
                indices
                    .iter()
                    .copied()
                    .find(|&k| &source.levels[k] == level)
                    .ok_or_else(|| {
                        FieldError::domain("extract_subdomain cannot do vertical interpolations")
                    })
            })
            .collect::<Result<Vec<_>>>()?;
    }
    let vcoordinate = VCoordinate {
        typeoffirstfixedsurface: kind,
        position_on_grid: source.position_on_grid,
        grid,
        levels: indices.iter().map(|&k| source.levels[k].clone()).collect(),
    };
    Ok((vcoordinate, indices))
}

fn subdomain_comment<F: CommonField + ?Sized>(
    field: &F,
    lonlat: (f64, f64),
    options: &SubdomainOptions,
) -> Result<Option<String>> {
    let (lon, lat) = lonlat;
    let geometry = field.geometry();
    match options.interpolation {
        Interpolation::Nearest => {
            let external = match &options.external_distance {
                Some(ext) => Some((ext.values(geometry)?, ext.target_value)),
                None => None,
            };
            let points = geometry.nearest_points(
                lon,
                lat,
                crate::geometry::NeighborRequest::Nearest,
                external.as_ref().map(|(a, t)| (a.view(), *t)),
            )?;
            let (i, j) = points
                .first()
                .copied()
                .ok_or(FieldError::OutOfDomain { lon, lat })?;
            let true_loc = geometry.ij2ll(i, j);
            let distance = geometry.distance(lonlat, true_loc);
            let direction = compass_direction(geometry.azimuth(lonlat, true_loc));
            Ok(Some(format!(
                "Profile @ {}m {} from ({:?}, {:?})\n( = nearest gridpoint: ({:.4}, {:.4}))",
                distance as i64, direction, lon, lat, true_loc.0, true_loc.1
            )))
        }
        Interpolation::Linear => Ok(Some(format!(
            "Profile linearly interpolated @ ({:?}, {:?})",
            lon, lat
        ))),
        Interpolation::Cubic => Ok(Some(format!(
            "Profile cubically interpolated @ ({:?}, {:?})",
            lon, lat
        ))),
    }
}

pub(crate) fn extract_subdomain<F: CommonField + ?Sized>(
    field: &F,
    target: &Geometry,
    options: &SubdomainOptions,
) -> Result<D3Field> {
    if field.spectral() {
        return Err(FieldError::domain("field must be gridpoint to extract a subdomain"));
    }
    if target.position_on_horizontal_grid != HorizontalPosition::Center {
        return Err(FieldError::domain(
            "extract_subdomain cannot deal with position on horizontal grid other than center",
        ));
    }
    let source = field.geometry();
    let (vcoordinate, level_indices) =
        subdomain_vcoordinate(&source.vcoordinate, &target.vcoordinate, options.exclude_extralevels)?;
    let structure = if vcoordinate.levels.len() > 1 {
        target.structure.stacked()
    } else {
        target.structure
    };
    let geometry = Geometry::new(structure, target.grid.clone(), vcoordinate)?;

    let grid = geometry.hgrid();
    let mut targets = Vec::new();
    for j in 0..grid.ny() {
        for i in 0..grid.nx() {
            if grid.is_valid_point(i, j) {
                let (lon, lat) = grid.ij2ll(i, j);
                if !source.point_is_inside_domain_ll(lon, lat) {
                    return Err(FieldError::OutOfDomain { lon, lat });
                }
                targets.push((i, j, lon, lat));
            }
        }
    }
    let comment = match targets.as_slice() {
        [(_, _, lon, lat)] => subdomain_comment(field, (*lon, *lat), options)?,
        _ => None,
    };

    let data = if options.getdata {
        let values = field.data4d(None)?;
        let external = match &options.external_distance {
            Some(ext) => Some((ext.values(source)?, ext.target_value)),
            None => None,
        };
        let nt = field.validity().len();
        let mut data = Array4::from_elem((nt, level_indices.len(), grid.ny(), grid.nx()), f64::NAN);
        for t in 0..nt {
            for (k, &source_k) in level_indices.iter().enumerate() {
                let slice = values.slice(s![t, source_k, .., ..]);
                for &(i, j, lon, lat) in &targets {
                    let ext = external.as_ref().map(|(a, target)| (a.view(), *target));
                    let (value, _) = interpolate_at(source, slice, lon, lat, options.interpolation, ext)?;
                    data[[t, k, j, i]] = value;
                }
            }
        }
        Some(FieldData::Gridpoint(data))
    } else {
        None
    };
    let mut extracted = D3Field::from_parts(
        field.fid().clone(),
        geometry,
        field.validity().clone(),
        None,
        field.processtype().map(str::to_string),
        data,
    );
    extracted.set_comment(comment);
    Ok(extracted)
}

pub(crate) fn extract_zoom<F: CommonField + ?Sized>(field: &F, zoom: &LonLatBox, extra_10th: bool) -> Result<D3Field> {
    if field.spectral() {
        return Err(FieldError::domain("spectral field: convert to gridpoint beforehand"));
    }
    let geometry = field.geometry();
    if geometry.is_rectangular() {
        let zoom = if extra_10th { zoom.with_extra_10th() } else { *zoom };
        return rectangular_zoom(field.as_real_field()?, &zoom, true);
    }

    let (lons, lats) = geometry.get_lonlat_grid(None)?;
    let mut selected = Vec::new();
    for ((j, i), &lon) in lons.indexed_iter() {
        let lat = lats[[j, i]];
        if !lon.is_nan() && zoom.contains(lon, lat) {
            selected.push((i, j, lon, lat));
        }
    }
    if selected.is_empty() {
        return Err(FieldError::domain("zoom not in domain"));
    }
    let grid = UnstructuredGrid::new(
        selected.iter().map(|p| p.2).collect(),
        selected.iter().map(|p| p.3).collect(),
    )?;
    let zoom_geometry = Geometry::new(
        geometry.structure,
        Grid::Unstructured(grid),
        geometry.vcoordinate.clone(),
    )?
    .with_position(geometry.position_on_horizontal_grid);
    let values = field.data4d(None)?;
    let (nt, nz, _, _) = values.dim();
    let mut data = Array4::zeros((nt, nz, 1, selected.len()));
    for (n, &(i, j, _, _)) in selected.iter().enumerate() {
        data.slice_mut(s![.., .., 0, n])
            .assign(&values.slice(s![.., .., j, i]));
    }
    Ok(D3Field::from_parts(
        field.fid().clone(),
        zoom_geometry,
        field.validity().clone(),
        None,
        field.processtype().map(str::to_string),
        Some(FieldData::Gridpoint(data)),
    ))
}

/// Zoom on a rectangular grid: the gridpoints enclosed by the box. A box
/// straddling the longitude seam of a global grid is handled by shifting
/// the grid center first (once).
fn rectangular_zoom(field: D3Field, zoom: &LonLatBox, allow_shift: bool) -> Result<D3Field> {
    let geometry = field.geometry();
    let (imin, jmin) = geometry.ll2ij(zoom.lonmin, zoom.latmin)?;
    let (imax, jmax) = geometry.ll2ij(zoom.lonmax, zoom.latmax)?;
    if imin >= imax {
        let (x_resolution, gridmin) = match &geometry.grid {
            Grid::RegularLonLat(g) if allow_shift && g.is_global() => (g.x_resolution, g.input_lon),
            _ => {
                return Err(FieldError::domain(format!(
                    "zoom longitudes ({}, {}) not increasing within the grid",
                    zoom.lonmin, zoom.lonmax
                )))
            }
        };
        let diff = gridmin - degrees_nearest_mod(zoom.lonmin, gridmin);
        let shift = ((diff / x_resolution).floor() + 1.0) * x_resolution;
        debug!("zoom straddles the grid seam, shifting center by {}", -shift);
        let mut shifted = field;
        shifted.global_shift_center(-shift)?;
        return rectangular_zoom(shifted, zoom, false);
    }
    let (nx, ny) = (geometry.hgrid().nx() as isize, geometry.hgrid().ny() as isize);
    let first_i = ((imin - 1e-6).ceil() as isize).max(0);
    let last_i = ((imax + 1e-6).floor() as isize).min(nx - 1);
    let first_j = ((jmin - 1e-6).ceil() as isize).max(0);
    let last_j = ((jmax + 1e-6).floor() as isize).min(ny - 1);
    if first_i > last_i || first_j > last_j {
        return Err(FieldError::domain("zoom not in domain"));
    }
    extract_subarray(
        &field,
        first_i as usize,
        last_i as usize + 1,
        first_j as usize,
        last_j as usize + 1,
    )
}

pub(crate) fn extract_subarray<F: CommonField + ?Sized>(
    field: &F,
    first_i: usize,
    last_i: usize,
    first_j: usize,
    last_j: usize,
) -> Result<D3Field> {
    if field.spectral() {
        return Err(FieldError::domain("field must be gridpoint to extract a subarray"));
    }
    let geometry = field
        .geometry()
        .make_subarray_geometry(first_i, last_i, first_j, last_j)?;
    let values = field.data4d(None)?;
    let data = values
        .slice(s![.., .., first_j..last_j, first_i..last_i])
        .to_owned();
    Ok(D3Field::from_parts(
        field.fid().clone(),
        geometry,
        field.validity().clone(),
        None,
        field.processtype().map(str::to_string),
        Some(FieldData::Gridpoint(data)),
    ))
}
