use num_traits::Float;

/// Generic linear interpolation between two values
pub fn lin_interp<T: Float>(v0: T, v1: T, fac: T) -> T {
    v0 + (v1 - v0) * fac
}

/// Linear interpolation between two points (traditional interface)
pub fn linear_interpolate(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    if (x1 - x0).abs() < f64::EPSILON {
        return y0; // Avoid division by zero
    }
    let fac = (x - x0) / (x1 - x0);
    lin_interp(y0, y1, fac)
}

/// Order of the piecewise polynomial fitted on a neighbourhood
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplineKind {
    /// 2 points per direction
    Linear,
    /// 4 points per direction
    Cubic,
}

impl SplineKind {
    /// Number of neighbours needed per direction
    pub fn stencil_width(&self) -> usize {
        match self {
            SplineKind::Linear => 2,
            SplineKind::Cubic => 4,
        }
    }
}

/// Polynomial through `(xs, ys)` evaluated at `x` (Lagrange form).
///
/// Abscissae must be distinct.
pub fn lagrange_interpolate<T: Float>(xs: &[T], ys: &[T], x: T) -> Result<T, String> {
    if xs.len() != ys.len() || xs.is_empty() {
        return Err(format!(
            "Inconsistent interpolation support: {} abscissae for {} values",
            xs.len(),
            ys.len()
        ));
    }
    let mut result = T::zero();
    for (m, (&xm, &ym)) in xs.iter().zip(ys.iter()).enumerate() {
        let mut weight = T::one();
        for (n, &xn) in xs.iter().enumerate() {
            if n == m {
                continue;
            }
            let denom = xm - xn;
            if denom.abs() <= T::epsilon() {
                return Err("Duplicate abscissae in interpolation support".to_string());
            }
            weight = weight * (x - xn) / denom;
        }
        result = result + weight * ym;
    }
    Ok(result)
}

/// 1D interpolation on a 2- or 4-point support.
///
/// A 2-point support is interpolated linearly, larger supports with the
/// polynomial through all points (cubic for 4 points).
pub fn spline_interpolate_1d(xs: &[f64], ys: &[f64], x: f64) -> Result<f64, String> {
    match xs.len() {
        0 => Err("Empty interpolation support".to_string()),
        1 => Ok(ys[0]),
        2 => {
            if (xs[1] - xs[0]).abs() < f64::EPSILON {
                return Err("Duplicate abscissae in interpolation support".to_string());
            }
            Ok(linear_interpolate(xs[0], ys[0], xs[1], ys[1], x))
        }
        _ => lagrange_interpolate(xs, ys, x),
    }
}

/// One row (constant j) of an interpolation neighbourhood: coordinates and
/// values of its points, ordered along the row.
#[derive(Debug, Clone, Default)]
pub struct StencilRow {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub values: Vec<f64>,
}

/// 2D separable interpolation on a neighbourhood made of rows.
///
/// Each row is first interpolated along x at `x`, which gives one value and
/// one y coordinate per row; those are then interpolated along y at `y`.
/// Rows need not be aligned (reduced and projected grids).
pub fn spline_interpolate_2d(rows: &[StencilRow], x: f64, y: f64) -> Result<f64, String> {
    if rows.is_empty() {
        return Err("Empty interpolation neighbourhood".to_string());
    }
    let mut row_ys = Vec::with_capacity(rows.len());
    let mut row_values = Vec::with_capacity(rows.len());
    for row in rows {
        row_values.push(spline_interpolate_1d(&row.xs, &row.values, x)?);
        row_ys.push(spline_interpolate_1d(&row.xs, &row.ys, x)?);
    }
    spline_interpolate_1d(&row_ys, &row_values, y)
}

/// Find bracketing indices and weight of `target` in monotonic `coords`.
///
/// Works on increasing as well as decreasing coordinates; targets outside
/// the range are clamped to the nearest end.
pub fn find_grid_indices(coords: &[f64], target: f64) -> Result<(usize, usize, f64), String> {
    if coords.is_empty() {
        return Err("Empty coordinate array".to_string());
    }
    let last = coords.len() - 1;
    let increasing = coords[last] >= coords[0];
    let before = |a: f64, b: f64| if increasing { a <= b } else { a >= b };

    // Handle extrapolation cases
    if before(target, coords[0]) {
        return Ok((0, 0, 0.0));
    }
    if before(coords[last], target) {
        return Ok((last, last, 0.0));
    }

    // Binary search for insertion point
    let mut left = 0;
    let mut right = last;

    while right - left > 1 {
        let mid = (left + right) / 2;
        if before(coords[mid], target) {
            left = mid;
        } else {
            right = mid;
        }
    }

    let weight = (target - coords[left]) / (coords[right] - coords[left]);

    Ok((left, right, weight))
}
