use ndarray::{s, Array2, ArrayView2};
use rustdct::{Dct2, DctPlanner};

use super::CommonField;
use crate::error::{FieldError, Result};
use crate::geometry::Subzone;

/// Variance spectrum of a horizontal field.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub name: String,
    /// Grid resolution (km)
    pub resolution: f64,
    /// Squared mean of the field
    pub mean2: f64,
    /// Variance of wavenumber bands 1..K
    pub variances: Vec<f64>,
}

fn pick_index(index: Option<usize>, len: usize, name: &str) -> Result<usize> {
    match index {
        None if len > 1 => Err(FieldError::domain(format!(
            "{} is required for a field with {} entries on that axis",
            name, len
        ))),
        None => Ok(0),
        Some(i) if i >= len => Err(FieldError::domain(format!(
            "{} {} is out of range, axis has {} entries",
            name, i, len
        ))),
        Some(i) => Ok(i),
    }
}

fn ortho_scale(k: usize, len: usize) -> f64 {
    if k == 0 {
        (1.0 / len as f64).sqrt()
    } else {
        (2.0 / len as f64).sqrt()
    }
}

/// Orthonormal 2D DCT-II, rows then columns.
fn dct2d(data: ArrayView2<f64>) -> Array2<f64> {
    let (ny, nx) = data.dim();
    let mut planner = DctPlanner::<f64>::new();
    let mut out = data.to_owned();

    let dct = planner.plan_dct2(nx);
    let mut buffer = vec![0.0; nx];
    for mut row in out.rows_mut() {
        buffer.iter_mut().zip(row.iter()).for_each(|(b, &v)| *b = v);
        dct.process_dct2(buffer.as_mut_slice());
        for (p, (r, b)) in row.iter_mut().zip(&buffer).enumerate() {
            *r = b * ortho_scale(p, nx);
        }
    }

    let dct = planner.plan_dct2(ny);
    let mut buffer = vec![0.0; ny];
    for mut column in out.columns_mut() {
        buffer.iter_mut().zip(column.iter()).for_each(|(b, &v)| *b = v);
        dct.process_dct2(buffer.as_mut_slice());
        for (q, (c, b)) in column.iter_mut().zip(&buffer).enumerate() {
            *c = b * ortho_scale(q, ny);
        }
    }
    out
}

/// Variances of the min(nx, ny) wavenumber bands of a 2D field
/// (Denis et al., 2002). Each coefficient's variance is shared linearly
/// between the two bands around its normalized wavenumber; on square
/// grids band 0 holds the squared mean only.
pub fn dct_variances(data: ArrayView2<f64>) -> Result<Vec<f64>> {
    let (ny, nx) = data.dim();
    if nx == 0 || ny == 0 {
        return Err(FieldError::shape("cannot compute the spectrum of an empty field"));
    }
    if data.iter().any(|v| v.is_nan()) {
        return Err(FieldError::domain("cannot compute the spectrum of a masked field"));
    }
    let coeffs = dct2d(data);
    let bands = nx.min(ny);
    let norm = (nx * ny) as f64;
    let mut variances = vec![0.0; bands];
    for ((j, i), &c) in coeffs.indexed_iter() {
        let var = c * c / norm;
        let k = ((i as f64 / nx as f64).powi(2) + (j as f64 / ny as f64).powi(2)).sqrt() * bands as f64;
        let k_inf = k.floor() as usize;
        let weight_sup = k - k_inf as f64;
        if k_inf < bands {
            variances[k_inf] += (1.0 - weight_sup) * var;
        }
        if k_inf + 1 < bands {
            variances[k_inf + 1] += weight_sup * var;
        }
    }
    Ok(variances)
}

pub(crate) fn dctspectrum<F: CommonField + ?Sized>(
    field: &F,
    subzone: Option<Subzone>,
    level_index: Option<usize>,
    validity_index: Option<usize>,
) -> Result<Spectrum> {
    if field.spectral() {
        return Err(FieldError::domain("dctspectrum needs a gridpoint field, not a spectral one"));
    }
    let geometry = field.geometry();
    if !geometry.is_rectangular() {
        return Err(FieldError::domain("dctspectrum needs a rectangular grid"));
    }
    let k = pick_index(level_index, geometry.nlevels(), "level_index")?;
    let t = pick_index(validity_index, field.validity().len(), "validity_index")?;
    let subzone = subzone.or_else(|| geometry.hgrid().lam_zone().map(|_| Subzone::C));
    let data = field.data4d(subzone)?;
    let variances = dct_variances(data.slice(s![t, k, .., ..]))?;
    Ok(Spectrum {
        name: field.fid().to_string(),
        resolution: geometry.resolution() / 1000.0,
        mean2: variances[0],
        variances: variances[1..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_constant_field_has_only_mean() {
        let data = Array2::from_elem((8, 8), 3.0);
        let variances = dct_variances(data.view()).unwrap();
        assert_eq!(variances.len(), 8);
        assert!((variances[0] - 9.0).abs() < 1e-12);
        assert!(variances[1..].iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_single_mode_lands_in_its_band() {
        let data = Array2::from_shape_fn((8, 8), |(_, i)| (PI * 2.0 * (i as f64 + 0.5) / 8.0).cos());
        let variances = dct_variances(data.view()).unwrap();
        assert!((variances[2] - 0.5).abs() < 1e-12, "{:?}", variances);
        let others: f64 = variances.iter().enumerate().filter(|(k, _)| *k != 2).map(|(_, v)| v.abs()).sum();
        assert!(others < 1e-12);
    }

    #[test]
    fn test_masked_field_is_rejected() {
        let mut data = Array2::zeros((4, 4));
        data[[1, 1]] = f64::NAN;
        assert!(dct_variances(data.view()).is_err());
    }

    #[test]
    fn test_index_selection() {
        assert_eq!(pick_index(None, 1, "level_index").unwrap(), 0);
        assert!(pick_index(None, 3, "level_index").is_err());
        assert!(pick_index(Some(1), 1, "level_index").is_err());
        assert_eq!(pick_index(Some(2), 3, "level_index").unwrap(), 2);
    }
}
