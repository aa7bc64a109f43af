use ndarray::{s, Array2, ArrayView2, ArrayView4, Ix4};
use std::str::FromStr;

use super::CommonField;
use crate::error::{FieldError, Result};
use crate::geometry::{Geometry, NeighborRequest};
use crate::math::{degrees_nearest_mod, spline_interpolate_1d, spline_interpolate_2d, SplineKind, StencilRow};
use crate::validity::FieldValidity;

/// Values returned by lookups: a scalar when a single point was asked for
/// with `one`, an array otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Scalar(f64),
    Array(Vec<f64>),
}

impl Values {
    fn from_vec(values: Vec<f64>, one: bool) -> Self {
        if one && values.len() == 1 {
            Values::Scalar(values[0])
        } else {
            Values::Array(values)
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Values::Scalar(v) => Some(*v),
            Values::Array(_) => None,
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Values::Scalar(v) => vec![*v],
            Values::Array(a) => a.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Values::Scalar(_) => 1,
            Values::Array(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scalar or list of indices.
pub trait IntoIndices {
    fn into_indices(self) -> Vec<usize>;
}

impl IntoIndices for usize {
    fn into_indices(self) -> Vec<usize> {
        vec![self]
    }
}

impl IntoIndices for Vec<usize> {
    fn into_indices(self) -> Vec<usize> {
        self
    }
}

impl IntoIndices for &[usize] {
    fn into_indices(self) -> Vec<usize> {
        self.to_vec()
    }
}

impl<const N: usize> IntoIndices for [usize; N] {
    fn into_indices(self) -> Vec<usize> {
        self.to_vec()
    }
}

/// Gridpoint indices to look up. Axes left unset default to 0, but are
/// mandatory when the field effectively has that dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IjQuery {
    pub i: Option<Vec<usize>>,
    pub j: Option<Vec<usize>>,
    pub k: Option<Vec<usize>>,
    pub t: Option<Vec<usize>>,
}

impl IjQuery {
    pub fn new() -> Self {
        IjQuery::default()
    }

    pub fn i(mut self, i: impl IntoIndices) -> Self {
        self.i = Some(i.into_indices());
        self
    }

    pub fn j(mut self, j: impl IntoIndices) -> Self {
        self.j = Some(j.into_indices());
        self
    }

    pub fn k(mut self, k: impl IntoIndices) -> Self {
        self.k = Some(k.into_indices());
        self
    }

    pub fn t(mut self, t: impl IntoIndices) -> Self {
        self.t = Some(t.into_indices());
        self
    }
}

/// Common length of lookup arguments: the longest one, others must be of
/// that length or of length 1.
fn broadcast_length(lengths: &[usize]) -> Result<usize> {
    let n = lengths.iter().copied().max().unwrap_or(1);
    if lengths.iter().any(|&l| l != 1 && l != n) {
        return Err(FieldError::shape(format!(
            "lookup arguments of incompatible lengths {:?}",
            lengths
        )));
    }
    Ok(n)
}

fn pick<T: Copy>(values: &[T], idx: usize) -> T {
    if values.len() == 1 {
        values[0]
    } else {
        values[idx]
    }
}

/// Lookup into a canonical (T, Z, Y, X) buffer.
pub(crate) fn values_at_indices(data: ArrayView4<f64>, geometry: &Geometry, query: &IjQuery, one: bool) -> Result<Values> {
    let (nt, nz, _, _) = data.dim();
    let shape = geometry.datashape();
    let axis = |values: &Option<Vec<usize>>, required: bool, name: &str| -> Result<Vec<usize>> {
        match values {
            Some(v) if v.is_empty() => Err(FieldError::domain(format!("empty index list for {}", name))),
            Some(v) => Ok(v.clone()),
            None if required => Err(FieldError::domain(format!(
                "{} index is mandatory, the field has a {} dimension",
                name, name
            ))),
            None => Ok(vec![0]),
        }
    };
    let i = axis(&query.i, shape.i, "i")?;
    let j = axis(&query.j, shape.j, "j")?;
    let k = axis(&query.k, shape.k, "k")?;
    let t = axis(&query.t, nt > 1, "t")?;
    let n = broadcast_length(&[i.len(), j.len(), k.len(), t.len()])?;

    let mut values = Vec::with_capacity(n);
    for idx in 0..n {
        let (pi, pj, pk, pt) = (pick(&i, idx), pick(&j, idx), pick(&k, idx), pick(&t, idx));
        if !geometry.point_is_inside_domain_ij(pi, pj) {
            return Err(FieldError::OutOfDomainIj { i: pi, j: pj });
        }
        if pk >= nz || pt >= nt {
            return Err(FieldError::domain(format!(
                "indices k={}, t={} out of range ({} levels, {} validities)",
                pk, pt, nz, nt
            )));
        }
        values.push(data[[pt, pk, pj, pi]]);
    }
    Ok(Values::from_vec(values, one))
}

/// Horizontal interpolation method of coordinate lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Nearest,
    Linear,
    Cubic,
}

impl FromStr for Interpolation {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nearest" => Ok(Interpolation::Nearest),
            "linear" => Ok(Interpolation::Linear),
            "cubic" => Ok(Interpolation::Cubic),
            other => Err(FieldError::not_implemented(format!("interpolation '{}'", other))),
        }
    }
}

impl Interpolation {
    fn spline(&self) -> Option<SplineKind> {
        match self {
            Interpolation::Nearest => None,
            Interpolation::Linear => Some(SplineKind::Linear),
            Interpolation::Cubic => Some(SplineKind::Cubic),
        }
    }
}

/// Nearest-point selection rule: among the 4 nearest gridpoints, pick the
/// one where `field` is closest to `target_value`.
#[derive(Clone, Copy)]
pub struct ExternalDistance<'a> {
    pub field: &'a dyn CommonField,
    pub target_value: f64,
}

impl std::fmt::Debug for ExternalDistance<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalDistance")
            .field("field", &self.field.fid().to_string())
            .field("target_value", &self.target_value)
            .finish()
    }
}

impl ExternalDistance<'_> {
    /// Horizontal values of the external field (first level and validity).
    pub(crate) fn values(&self, geometry: &Geometry) -> Result<Array2<f64>> {
        let data = self.field.data4d(None)?;
        let (_, _, ny, nx) = data.dim();
        if (ny, nx) != (geometry.hgrid().ny(), geometry.hgrid().nx()) {
            return Err(FieldError::shape(format!(
                "external field of dimensions {}x{} on a {}x{} grid",
                ny,
                nx,
                geometry.hgrid().ny(),
                geometry.hgrid().nx()
            )));
        }
        Ok(data.slice(s![0, 0, .., ..]).to_owned())
    }
}

/// Coordinates to look up, with their level, validity and interpolation.
#[derive(Debug, Clone)]
pub struct LlQuery<'a> {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub level: Option<f64>,
    pub validity: Option<FieldValidity>,
    pub interpolation: Interpolation,
    /// Also return the coordinates of the gridpoint used (nearest only)
    pub neighborinfo: bool,
    pub external_distance: Option<ExternalDistance<'a>>,
    /// Return a scalar for a single point
    pub one: bool,
}

impl<'a> LlQuery<'a> {
    pub fn point(lon: f64, lat: f64) -> Self {
        LlQuery::points(vec![lon], vec![lat])
    }

    pub fn points(lon: Vec<f64>, lat: Vec<f64>) -> Self {
        LlQuery {
            lon,
            lat,
            level: None,
            validity: None,
            interpolation: Interpolation::Nearest,
            neighborinfo: false,
            external_distance: None,
            one: true,
        }
    }

    pub fn level(mut self, level: f64) -> Self {
        self.level = Some(level);
        self
    }

    pub fn validity(mut self, validity: FieldValidity) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn neighborinfo(mut self, neighborinfo: bool) -> Self {
        self.neighborinfo = neighborinfo;
        self
    }

    pub fn external_distance(mut self, external: ExternalDistance<'a>) -> Self {
        self.external_distance = Some(external);
        self
    }

    pub fn one(mut self, one: bool) -> Self {
        self.one = one;
        self
    }
}

/// Result of a coordinate lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct LlValues {
    pub values: Values,
    /// Coordinates of the gridpoints used, when requested
    pub neighbours: Option<Vec<(f64, f64)>>,
}

/// Level index matching `level`; the level is mandatory on multi-level
/// fields.
pub(crate) fn resolve_level(geometry: &Geometry, level: Option<f64>) -> Result<usize> {
    match level {
        Some(value) => geometry.vcoordinate.level_index(value).ok_or_else(|| {
            FieldError::domain(format!("level {} not found in field", value))
        }),
        None if geometry.nlevels() > 1 => Err(FieldError::domain(
            "a level is mandatory to look up a field with several levels",
        )),
        None => Ok(0),
    }
}

pub(crate) fn resolve_validity<F: CommonField + ?Sized>(field: &F, validity: Option<&FieldValidity>) -> Result<usize> {
    match validity {
        Some(v) => field
            .validity()
            .index_of(v)
            .ok_or_else(|| FieldError::domain(format!("validity {} not found in field", v))),
        None if field.validity().len() > 1 => Err(FieldError::domain(
            "a validity is mandatory to look up a field with several validities",
        )),
        None => Ok(0),
    }
}

pub(crate) fn getvalue_ll<F: CommonField + ?Sized>(field: &F, query: &LlQuery) -> Result<LlValues> {
    if field.spectral() {
        return Err(FieldError::domain("field must be gridpoint to get values at coordinates"));
    }
    let geometry = field.geometry();
    let k = resolve_level(geometry, query.level)?;
    let t = resolve_validity(field, query.validity.as_ref())?;
    let n = broadcast_length(&[query.lon.len(), query.lat.len()])?;
    let data = field.getdata(None, true)?.into_dimensionality::<Ix4>()?;
    let values2d = data.slice(s![t, k, .., ..]);
    let external = match &query.external_distance {
        Some(ext) => Some((ext.values(geometry)?, ext.target_value)),
        None => None,
    };

    let mut values = Vec::with_capacity(n);
    let mut neighbours = Vec::with_capacity(n);
    for idx in 0..n {
        let (lon, lat) = (pick(&query.lon, idx), pick(&query.lat, idx));
        let ext = external.as_ref().map(|(a, target)| (a.view(), *target));
        let (value, neighbour) = interpolate_at(geometry, values2d, lon, lat, query.interpolation, ext)?;
        values.push(value);
        neighbours.push(neighbour);
    }
    let neighbours = if query.neighborinfo && query.interpolation == Interpolation::Nearest {
        Some(neighbours.into_iter().flatten().collect())
    } else {
        None
    };
    Ok(LlValues {
        values: Values::from_vec(values, query.one),
        neighbours,
    })
}

/// Value of a horizontal slice at (lon, lat), with the gridpoint used when
/// interpolation is `Nearest`.
pub(crate) fn interpolate_at(
    geometry: &Geometry,
    values: ArrayView2<f64>,
    lon: f64,
    lat: f64,
    interpolation: Interpolation,
    external: Option<(ArrayView2<f64>, f64)>,
) -> Result<(f64, Option<(f64, f64)>)> {
    let kind = match interpolation.spline() {
        None => {
            let points = geometry.nearest_points(lon, lat, NeighborRequest::Nearest, external)?;
            let (i, j) = points
                .first()
                .copied()
                .ok_or(FieldError::OutOfDomain { lon, lat })?;
            return Ok((values[[j, i]], Some(geometry.ij2ll(i, j))));
        }
        Some(kind) => kind,
    };
    let grid = geometry.hgrid();
    let points = geometry.nearest_points(lon, lat, NeighborRequest::Square(kind.stencil_width()), None)?;
    let (x, y) = grid.native_coordinates(lon, lat);
    let unwrap_x = |xi: f64| if grid.is_lonlat() { degrees_nearest_mod(xi, x) } else { xi };

    let mut rows: Vec<(usize, StencilRow)> = Vec::new();
    for (i, j) in points {
        let (xi, yj) = grid.native_ij2ll(i, j);
        match rows.last_mut() {
            Some((row_j, row)) if *row_j == j => {
                row.xs.push(unwrap_x(xi));
                row.ys.push(yj);
                row.values.push(values[[j, i]]);
            }
            _ => rows.push((
                j,
                StencilRow {
                    xs: vec![unwrap_x(xi)],
                    ys: vec![yj],
                    values: vec![values[[j, i]]],
                },
            )),
        }
    }
    let rows: Vec<StencilRow> = rows.into_iter().map(|(_, row)| row).collect();
    if rows.is_empty() {
        return Err(FieldError::OutOfDomain { lon, lat });
    }
    let value = if grid.ny() == 1 {
        let row = &rows[0];
        spline_interpolate_1d(&row.xs, &row.values, x)
    } else if grid.nx() == 1 {
        let ys: Vec<f64> = rows.iter().map(|r| r.ys[0]).collect();
        let vs: Vec<f64> = rows.iter().map(|r| r.values[0]).collect();
        spline_interpolate_1d(&ys, &vs, y)
    } else {
        spline_interpolate_2d(&rows, x, y)
    }
    .map_err(FieldError::Domain)?;
    Ok((value, None))
}
