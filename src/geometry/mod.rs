//! Field geometries: horizontal grid kinds, vertical coordinate and the
//! shape bookkeeping shared by every field.
//!
//! The horizontal grid is a tagged enum ([`Grid`]) over concrete kinds, each
//! implementing the [`HorizontalGrid`] contract. [`Geometry`] composes a grid
//! with a [`VCoordinate`] and a [`Structure`], and provides the composite
//! operations used by fields (datashape, reshape, subzones, subarrays...).

pub mod academic;
pub mod gauss;
pub mod lam;
pub mod regular;
pub mod unstructured;
pub mod vcoord;

pub use academic::AcademicGrid;
pub use gauss::GaussGrid;
pub use lam::{LamZone, Subzone};
pub use regular::RegLLGrid;
pub use unstructured::UnstructuredGrid;
pub use vcoord::{Level, VCoordinate, VGrid, VerticalPosition};

use ndarray::{s, Array2, Array4, ArrayView2, ArrayView4};
use std::fmt;

use crate::config::Constants;
use crate::error::{FieldError, Result};
use crate::spectral::GpDims;

/// Structure of a field: which of its dimensions are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Structure {
    Point,
    V1D,
    H1D,
    V2D,
    H2D,
    D3,
}

impl Structure {
    /// Structure of one level of a field of this structure.
    pub fn horizontal(&self) -> Structure {
        match self {
            Structure::D3 => Structure::H2D,
            Structure::V2D => Structure::H1D,
            Structure::V1D => Structure::Point,
            other => *other,
        }
    }

    /// Structure obtained by stacking several single-level fields.
    pub fn stacked(&self) -> Structure {
        match self {
            Structure::H2D | Structure::D3 => Structure::D3,
            Structure::Point | Structure::V1D => Structure::V1D,
            Structure::H1D | Structure::V2D => Structure::V2D,
        }
    }

    pub fn has_vertical(&self) -> bool {
        matches!(self, Structure::V1D | Structure::V2D | Structure::D3)
    }

    /// Structures bound to a single horizontal point.
    pub fn is_pointwise(&self) -> bool {
        matches!(self, Structure::Point | Structure::V1D)
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Structure::Point => "Point",
            Structure::V1D => "V1D",
            Structure::H1D => "H1D",
            Structure::V2D => "V2D",
            Structure::H2D => "H2D",
            Structure::D3 => "3D",
        };
        write!(f, "{}", name)
    }
}

/// Which of the (i, j, k) axes are effectively present (size > 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataShape {
    pub i: bool,
    pub j: bool,
    pub k: bool,
}

/// Position of the data points within a horizontal grid mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalPosition {
    #[default]
    Center,
    LowerLeft,
    LowerRight,
    UpperLeft,
    UpperRight,
    CenterLeft,
    CenterRight,
    LowerCenter,
    UpperCenter,
}

/// Neighbourhood requested from a nearest-point search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborRequest {
    /// The single nearest gridpoint
    Nearest,
    /// The `n` nearest gridpoints, by increasing distance
    NearestN(usize),
    /// A `n`x`n` square surrounding the point, row by row (j outer, i inner)
    Square(usize),
}

/// Horizontal dimensions, with the per-latitude longitude counts of reduced
/// grids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HorizontalDimensions {
    pub x: usize,
    pub y: usize,
    pub lon_number_by_lat: Option<Vec<usize>>,
}

/// Contract shared by every horizontal grid kind.
///
/// Coordinates are (lon, lat) in degrees, except for grids where
/// [`HorizontalGrid::is_lonlat`] is false (planar grids, in metres).
pub trait HorizontalGrid {
    /// Grid kind name (e.g. `regular_lonlat`, `reduced_gauss`)
    fn name(&self) -> &'static str;

    /// Size along x (maximum number of longitudes for reduced grids)
    fn nx(&self) -> usize;

    /// Size along y
    fn ny(&self) -> usize;

    fn dimensions(&self) -> HorizontalDimensions {
        HorizontalDimensions {
            x: self.nx(),
            y: self.ny(),
            lon_number_by_lat: None,
        }
    }

    /// Rectangular grids can be sliced by index ranges
    fn is_rectangular(&self) -> bool;

    /// Whether coordinates are angles on the sphere
    fn is_lonlat(&self) -> bool {
        true
    }

    /// Whether (i, j) holds data (reduced grids mask the tail of short rows)
    fn is_valid_point(&self, i: usize, j: usize) -> bool {
        i < self.nx() && j < self.ny()
    }

    /// Coordinates of gridpoint (i, j)
    fn ij2ll(&self, i: usize, j: usize) -> (f64, f64);

    /// Fractional grid indices of a point
    fn ll2ij(&self, lon: f64, lat: f64) -> Result<(f64, f64)>;

    /// Coordinates of a point in the grid's own frame (rotated grids)
    fn native_coordinates(&self, lon: f64, lat: f64) -> (f64, f64) {
        (lon, lat)
    }

    /// Coordinates of gridpoint (i, j) in the grid's own frame
    fn native_ij2ll(&self, i: usize, j: usize) -> (f64, f64) {
        self.ij2ll(i, j)
    }

    /// Gridpoints surrounding (lon, lat)
    ///
    /// # Arguments
    /// * `lon`, `lat` - Query point
    /// * `request` - Shape of the neighbourhood
    ///
    /// # Returns
    /// * `Result<Vec<(usize, usize)>>` - (i, j) indices of the neighbours
    fn nearest_points(&self, lon: f64, lat: f64, request: NeighborRequest)
        -> Result<Vec<(usize, usize)>>;

    /// Whether (lon, lat) lies inside the grid domain, `margin` in grid cells
    fn point_is_inside_domain_ll(&self, lon: f64, lat: f64, margin: f64) -> bool;

    /// Distance between two points (m)
    fn distance(&self, a: (f64, f64), b: (f64, f64)) -> f64;

    /// Direction from `a` to `b`, degrees clockwise from north in (-180, 180]
    fn azimuth(&self, a: (f64, f64), b: (f64, f64)) -> f64;

    /// Typical distance between neighbouring gridpoints (m)
    fn resolution(&self) -> f64;

    /// Limited-area zones, if any
    fn lam_zone(&self) -> Option<&LamZone> {
        None
    }

    /// Dimensions handed to spectral transforms
    fn gpdims(&self) -> Result<GpDims>;

    /// Bearing (degrees) of the local grid y axis with respect to true north
    fn grid_north_bearing(&self, _i: usize, _j: usize) -> f64 {
        0.0
    }
}

/// Concrete horizontal grid kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Grid {
    RegularLonLat(RegLLGrid),
    Academic(AcademicGrid),
    Gauss(GaussGrid),
    Unstructured(UnstructuredGrid),
}

impl Grid {
    pub fn as_horizontal(&self) -> &dyn HorizontalGrid {
        match self {
            Grid::RegularLonLat(g) => g,
            Grid::Academic(g) => g,
            Grid::Gauss(g) => g,
            Grid::Unstructured(g) => g,
        }
    }
}

/// Horizontal grid, vertical coordinate and structure of a field.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub structure: Structure,
    pub grid: Grid,
    pub vcoordinate: VCoordinate,
    pub position_on_horizontal_grid: HorizontalPosition,
}

impl Geometry {
    /// Build a geometry, checking consistency between structure, grid size
    /// and number of levels.
    pub fn new(structure: Structure, grid: Grid, vcoordinate: VCoordinate) -> Result<Self> {
        let geometry = Geometry {
            structure,
            grid,
            vcoordinate,
            position_on_horizontal_grid: HorizontalPosition::Center,
        };
        geometry.check_structure()?;
        Ok(geometry)
    }

    fn check_structure(&self) -> Result<()> {
        let (nx, ny) = (self.hgrid().nx(), self.hgrid().ny());
        if nx == 0 || ny == 0 {
            return Err(FieldError::domain("horizontal dimensions must be positive"));
        }
        if self.structure.is_pointwise() && (nx != 1 || ny != 1) {
            return Err(FieldError::domain(format!(
                "{} geometry must have a single horizontal point, got {}x{}",
                self.structure, nx, ny
            )));
        }
        if matches!(self.structure, Structure::H1D | Structure::V2D) && ny != 1 {
            return Err(FieldError::domain(format!(
                "{} geometry must have Y=1, got Y={}",
                self.structure, ny
            )));
        }
        if !self.structure.has_vertical() && self.vcoordinate.levels.len() > 1 {
            return Err(FieldError::domain(format!(
                "{} geometry cannot have {} levels",
                self.structure,
                self.vcoordinate.levels.len()
            )));
        }
        if !self.vcoordinate.has_unique_levels() {
            return Err(FieldError::domain("levels must be unique"));
        }
        Ok(())
    }

    pub fn with_position(mut self, position: HorizontalPosition) -> Self {
        self.position_on_horizontal_grid = position;
        self
    }

    pub fn hgrid(&self) -> &dyn HorizontalGrid {
        self.grid.as_horizontal()
    }

    pub fn name(&self) -> &'static str {
        self.hgrid().name()
    }

    pub fn dimensions(&self) -> HorizontalDimensions {
        self.hgrid().dimensions()
    }

    pub fn nlevels(&self) -> usize {
        self.vcoordinate.levels.len()
    }

    pub fn datashape(&self) -> DataShape {
        DataShape {
            i: self.hgrid().nx() > 1,
            j: self.hgrid().ny() > 1,
            k: self.nlevels() > 1,
        }
    }

    /// Expected data shape for `dim_t` validities: always (T, Z, Y, X) when
    /// `d4`, otherwise only the axes effectively present.
    pub fn get_datashape(&self, dim_t: usize, d4: bool) -> Vec<usize> {
        let full = [dim_t, self.nlevels(), self.hgrid().ny(), self.hgrid().nx()];
        if d4 {
            return full.to_vec();
        }
        let present = self.present_axes(dim_t);
        full.iter()
            .zip(present.iter())
            .filter(|(_, &p)| p)
            .map(|(&n, _)| n)
            .collect()
    }

    /// Presence of the (t, k, j, i) axes in squeezed data.
    pub fn present_axes(&self, dim_t: usize) -> [bool; 4] {
        let shape = self.datashape();
        [dim_t > 1, shape.k, shape.j, shape.i]
    }

    pub fn is_rectangular(&self) -> bool {
        self.hgrid().is_rectangular()
    }

    pub fn ij2ll(&self, i: usize, j: usize) -> (f64, f64) {
        self.hgrid().ij2ll(i, j)
    }

    pub fn ll2ij(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        self.hgrid().ll2ij(lon, lat)
    }

    /// Longitudes and latitudes of the gridpoints, shaped (Y, X); masked
    /// points of reduced grids are NaN.
    pub fn get_lonlat_grid(&self, subzone: Option<Subzone>) -> Result<(Array2<f64>, Array2<f64>)> {
        let grid = self.hgrid();
        let (nx, ny) = (grid.nx(), grid.ny());
        let mut lons = Array2::from_elem((ny, nx), f64::NAN);
        let mut lats = Array2::from_elem((ny, nx), f64::NAN);
        for j in 0..ny {
            for i in 0..nx {
                if grid.is_valid_point(i, j) {
                    let (lon, lat) = grid.ij2ll(i, j);
                    lons[[j, i]] = lon;
                    lats[[j, i]] = lat;
                }
            }
        }
        match subzone {
            Some(zone) => Ok((
                self.extract_subzone_2d(lons.view(), zone)?,
                self.extract_subzone_2d(lats.view(), zone)?,
            )),
            None => Ok((lons, lats)),
        }
    }

    /// Coordinates of the valid gridpoints, in the order of [`Self::stretch_data`].
    pub fn valid_lonlats(&self) -> Vec<(f64, f64)> {
        let grid = self.hgrid();
        let mut points = Vec::new();
        for j in 0..grid.ny() {
            for i in 0..grid.nx() {
                if grid.is_valid_point(i, j) {
                    points.push(grid.ij2ll(i, j));
                }
            }
        }
        points
    }

    /// Number of valid gridpoints.
    pub fn gridpoints_number(&self) -> usize {
        match &self.grid {
            Grid::Gauss(g) => g.lon_number_by_lat.iter().sum(),
            _ => self.hgrid().nx() * self.hgrid().ny(),
        }
    }

    /// Level values broadcast on the canonical (T, Z, Y, X) shape.
    pub fn get_levels(&self, nb_validities: usize) -> Result<Array4<f64>> {
        let (nx, ny) = (self.hgrid().nx(), self.hgrid().ny());
        let nz = self.nlevels();
        if nz == 0 {
            return Err(FieldError::domain("geometry has no levels"));
        }
        let mut levels = Array4::zeros((nb_validities, nz, ny, nx));
        for (k, level) in self.vcoordinate.levels.iter().enumerate() {
            match level {
                Level::Value(v) => levels.slice_mut(s![.., k, .., ..]).fill(*v),
                Level::Gridded(a) => {
                    if a.dim() != (ny, nx) {
                        return Err(FieldError::shape(format!(
                            "gridded level of shape {:?} on a {}x{} grid",
                            a.dim(),
                            ny,
                            nx
                        )));
                    }
                    for t in 0..nb_validities {
                        levels.slice_mut(s![t, k, .., ..]).assign(a);
                    }
                }
            }
        }
        Ok(levels)
    }

    /// Gridpoints neighbouring (lon, lat).
    ///
    /// With `external` = (values, target), the single nearest point is chosen
    /// among the 4 nearest candidates as the one whose external value is
    /// closest to `target`; ties go to the geometrically nearest.
    pub fn nearest_points(
        &self,
        lon: f64,
        lat: f64,
        request: NeighborRequest,
        external: Option<(ArrayView2<f64>, f64)>,
    ) -> Result<Vec<(usize, usize)>> {
        match external {
            None => self.hgrid().nearest_points(lon, lat, request),
            Some((values, target)) => {
                if request != NeighborRequest::Nearest {
                    return Err(FieldError::domain(
                        "external distance selection only applies to the nearest point",
                    ));
                }
                let candidates = self
                    .hgrid()
                    .nearest_points(lon, lat, NeighborRequest::NearestN(4))?;
                let mut best: Option<((usize, usize), f64)> = None;
                for (i, j) in candidates {
                    let value = values.get((j, i)).copied().ok_or_else(|| {
                        FieldError::shape("external field does not match the geometry")
                    })?;
                    let gap = (target - value).abs();
                    if gap.is_nan() {
                        continue;
                    }
                    if best.map_or(true, |(_, g)| gap < g) {
                        best = Some(((i, j), gap));
                    }
                }
                best.map(|(p, _)| vec![p]).ok_or_else(|| {
                    FieldError::domain("no valid external value among nearest points")
                })
            }
        }
    }

    pub fn point_is_inside_domain_ll(&self, lon: f64, lat: f64) -> bool {
        let margin = Constants::default().domain_margin;
        self.hgrid().point_is_inside_domain_ll(lon, lat, margin)
    }

    pub fn point_is_inside_domain_ij(&self, i: usize, j: usize) -> bool {
        self.hgrid().is_valid_point(i, j)
    }

    pub fn distance(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        self.hgrid().distance(a, b)
    }

    pub fn azimuth(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        self.hgrid().azimuth(a, b)
    }

    pub fn resolution(&self) -> f64 {
        self.hgrid().resolution()
    }

    pub fn gpdims(&self) -> Result<GpDims> {
        self.hgrid().gpdims()
    }

    /// 1D list of valid gridpoint values into the (Y, X) layout, masked
    /// points set to NaN.
    pub fn reshape_data(&self, flat: &[f64]) -> Result<Array2<f64>> {
        let grid = self.hgrid();
        let (nx, ny) = (grid.nx(), grid.ny());
        if flat.len() != self.gridpoints_number() {
            return Err(FieldError::shape(format!(
                "cannot reshape {} values on a geometry of {} gridpoints",
                flat.len(),
                self.gridpoints_number()
            )));
        }
        let mut data = Array2::from_elem((ny, nx), f64::NAN);
        let mut values = flat.iter();
        for j in 0..ny {
            for i in 0..nx {
                if grid.is_valid_point(i, j) {
                    if let Some(v) = values.next() {
                        data[[j, i]] = *v;
                    }
                }
            }
        }
        Ok(data)
    }

    /// Inverse of [`Self::reshape_data`]: the valid gridpoint values, row by row.
    pub fn stretch_data(&self, data: ArrayView2<f64>) -> Vec<f64> {
        let grid = self.hgrid();
        data.indexed_iter()
            .filter(|((j, i), _)| grid.is_valid_point(*i, *j))
            .map(|(_, v)| *v)
            .collect()
    }

    fn require_lam_zone(&self) -> Result<&LamZone> {
        self.hgrid().lam_zone().ok_or_else(|| {
            FieldError::domain(format!(
                "subzone requested on a '{}' grid without limited-area zones",
                self.name()
            ))
        })
    }

    pub fn extract_subzone_2d(&self, data: ArrayView2<f64>, subzone: Subzone) -> Result<Array2<f64>> {
        let zone = self.require_lam_zone()?;
        let (j0, j1, i0, i1) = zone.bounds(subzone);
        Ok(data.slice(s![j0..j1, i0..i1]).to_owned())
    }

    /// Restrict 4D data to a limited-area subzone.
    pub fn extract_subzone(&self, data: ArrayView4<f64>, subzone: Subzone) -> Result<Array4<f64>> {
        let zone = self.require_lam_zone()?;
        let (j0, j1, i0, i1) = zone.bounds(subzone);
        Ok(data.slice(s![.., .., j0..j1, i0..i1]).to_owned())
    }

    /// Geometry of a subzone.
    pub fn select_subzone(&self, subzone: Subzone) -> Result<Geometry> {
        let zone = *self.require_lam_zone()?;
        let (j0, j1, i0, i1) = zone.bounds(subzone);
        let new_zone = zone.after_selection(subzone);
        let grid = match &self.grid {
            Grid::RegularLonLat(g) => Grid::RegularLonLat(g.subarray(i0, i1, j0, j1, new_zone)),
            Grid::Academic(g) => Grid::Academic(g.subarray(i0, i1, j0, j1, new_zone)),
            _ => {
                return Err(FieldError::not_implemented(format!(
                    "subzone selection on '{}' grids",
                    self.name()
                )))
            }
        };
        Ok(Geometry {
            grid,
            ..self.clone()
        })
    }

    /// Geometry of the index ranges [first_i, last_i) x [first_j, last_j).
    pub fn make_subarray_geometry(
        &self,
        first_i: usize,
        last_i: usize,
        first_j: usize,
        last_j: usize,
    ) -> Result<Geometry> {
        let (nx, ny) = (self.hgrid().nx(), self.hgrid().ny());
        if first_i >= last_i || first_j >= last_j || last_i > nx || last_j > ny {
            return Err(FieldError::domain(format!(
                "invalid subarray [{}:{}, {}:{}] of a {}x{} grid",
                first_j, last_j, first_i, last_i, ny, nx
            )));
        }
        let grid = match &self.grid {
            Grid::RegularLonLat(g) => {
                Grid::RegularLonLat(g.subarray(first_i, last_i, first_j, last_j, None))
            }
            Grid::Academic(g) => Grid::Academic(g.subarray(first_i, last_i, first_j, last_j, None)),
            _ => {
                return Err(FieldError::not_implemented(format!(
                    "subarray of a '{}' grid",
                    self.name()
                )))
            }
        };
        let geometry = Geometry {
            grid,
            ..self.clone()
        };
        geometry.check_structure()?;
        Ok(geometry)
    }

    /// Shift the center longitude of a global regular lon/lat grid by
    /// `shift` degrees; returns the shift in number of columns.
    pub fn global_shift_center(&mut self, shift: f64) -> Result<isize> {
        match &mut self.grid {
            Grid::RegularLonLat(g) => g.global_shift_center(shift),
            _ => Err(FieldError::domain(
                "global shift of center longitude only available on regular lon/lat grids",
            )),
        }
    }

    /// Rotate grid-relative (u, v) to zonal/meridional components, or back
    /// with `reverse`. With `map_factor_correction`, components are also
    /// divided (multiplied when reversed) by the map factor.
    pub fn reproject_wind_on_lonlat(
        &self,
        u: ArrayView2<f64>,
        v: ArrayView2<f64>,
        map_factor_correction: bool,
        reverse: bool,
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        if u.dim() != v.dim() || u.dim() != (self.hgrid().ny(), self.hgrid().nx()) {
            return Err(FieldError::shape(format!(
                "wind components of shapes {:?} and {:?} on a {}x{} grid",
                u.dim(),
                v.dim(),
                self.hgrid().ny(),
                self.hgrid().nx()
            )));
        }
        let m = self.map_factor_field();
        let mut u_out = u.to_owned();
        let mut v_out = v.to_owned();
        let grid = self.hgrid();
        for ((j, i), uo) in u_out.indexed_iter_mut() {
            let vo = &mut v_out[[j, i]];
            let beta = grid.grid_north_bearing(i, j).to_radians();
            // grid north at bearing beta: rotating clockwise by beta brings
            // grid components to earth components
            let angle = if reverse { beta } else { -beta };
            let (mut ue, mut ve) = crate::math::grid_to_earth_wind(*uo, *vo, angle);
            if map_factor_correction {
                let factor = m[[j, i]];
                if reverse {
                    ue *= factor;
                    ve *= factor;
                } else {
                    ue /= factor;
                    ve /= factor;
                }
            }
            *uo = ue;
            *vo = ve;
        }
        Ok((u_out, v_out))
    }

    /// Map factor at each gridpoint, shaped (Y, X). None of the provided
    /// grid kinds are projections, so the factor is 1 wherever data exists.
    pub fn map_factor_field(&self) -> Array2<f64> {
        let grid = self.hgrid();
        Array2::from_shape_fn((grid.ny(), grid.nx()), |(j, i)| {
            if grid.is_valid_point(i, j) {
                1.0
            } else {
                f64::NAN
            }
        })
    }

    /// Geometry of level `k` alone, with the matching horizontal structure.
    pub fn level_geometry(&self, k: usize) -> Result<Geometry> {
        let level = self.vcoordinate.levels.get(k).cloned().ok_or_else(|| {
            FieldError::domain(format!(
                "level index {} out of range ({} levels)",
                k,
                self.nlevels()
            ))
        })?;
        let mut geometry = self.clone();
        geometry.structure = self.structure.horizontal();
        geometry.vcoordinate.levels = vec![level];
        Ok(geometry)
    }

    /// Horizontal part equality: grid kind, dimensions, projection and
    /// position on grid.
    pub fn same_horizontal_geometry(&self, other: &Geometry) -> bool {
        self.grid == other.grid
            && self.position_on_horizontal_grid == other.position_on_horizontal_grid
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = self.dimensions();
        write!(
            f,
            "{} geometry on '{}' grid, X={} Y={}, {} level(s) of type {}",
            self.structure,
            self.name(),
            dims.x,
            dims.y,
            self.nlevels(),
            self.vcoordinate.typeoffirstfixedsurface
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regll(nx: usize, ny: usize) -> Geometry {
        Geometry::new(
            Structure::H2D,
            Grid::RegularLonLat(RegLLGrid::new(0.0, 40.0, 1.0, 1.0, nx, ny)),
            VCoordinate::single(1, 0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_datashape_elides_degenerate_axes() {
        let g = regll(10, 1);
        assert_eq!(g.datashape(), DataShape { i: true, j: false, k: false });
        assert_eq!(g.get_datashape(3, false), vec![3, 10]);
        assert_eq!(g.get_datashape(3, true), vec![3, 1, 1, 10]);
        assert_eq!(g.get_datashape(1, false), vec![10]);
    }

    #[test]
    fn test_structure_consistency() {
        let grid = Grid::RegularLonLat(RegLLGrid::new(0.0, 40.0, 1.0, 1.0, 4, 4));
        assert!(Geometry::new(Structure::Point, grid.clone(), VCoordinate::single(1, 0.0)).is_err());
        let levels = VCoordinate::new(100, vec![850.0, 500.0]);
        assert!(Geometry::new(Structure::H2D, grid.clone(), levels.clone()).is_err());
        assert!(Geometry::new(Structure::D3, grid, levels).is_ok());
    }

    #[test]
    fn test_subzone_requires_lam() {
        let g = regll(10, 10);
        let data = Array4::<f64>::zeros((1, 1, 10, 10));
        assert!(g.extract_subzone(data.view(), Subzone::C).is_err());
    }

    #[test]
    fn test_reshape_and_stretch() {
        let g = regll(3, 2);
        let flat: Vec<f64> = (0..6).map(f64::from).collect();
        let a = g.reshape_data(&flat).unwrap();
        assert_eq!(a[[1, 0]], 3.0);
        assert_eq!(g.stretch_data(a.view()), flat);
        assert!(g.reshape_data(&flat[..5]).is_err());
    }

    #[test]
    fn test_level_geometry() {
        let g = Geometry::new(
            Structure::D3,
            Grid::RegularLonLat(RegLLGrid::new(0.0, 40.0, 1.0, 1.0, 4, 4)),
            VCoordinate::new(100, vec![850.0, 500.0]),
        )
        .unwrap();
        let lg = g.level_geometry(1).unwrap();
        assert_eq!(lg.structure, Structure::H2D);
        assert_eq!(lg.vcoordinate.levels, vec![Level::Value(500.0)]);
        assert!(g.level_geometry(2).is_err());
    }
}
