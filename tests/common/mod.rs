#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use meteofield::field::FieldBuilder;
use meteofield::geometry::{AcademicGrid, Grid, RegLLGrid, Structure, VCoordinate};
use meteofield::spectral::{GpDims, SpectralGeometry, SpectralSpace, SpectralTransform, Truncation};
use meteofield::{D3Field, FieldError, FieldValidityList, Fid, Geometry};
use ndarray::Array4;
use std::f64::consts::PI;
use std::sync::Arc;

pub const EPS: f64 = 1e-10;

pub fn basis() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_704_067_200, 0).unwrap()
}

pub fn hourly_validities(n: usize) -> FieldValidityList {
    let terms: Vec<Duration> = (0..n).map(|h| Duration::hours(h as i64)).collect();
    FieldValidityList::from_terms(basis(), &terms).unwrap()
}

/// Regular lon/lat geometry with its south-west corner at (lon0, lat0).
pub fn regll_geometry(lon0: f64, lat0: f64, resolution: f64, nx: usize, ny: usize, levels: &[f64]) -> Geometry {
    let grid = Grid::RegularLonLat(RegLLGrid::new(lon0, lat0, resolution, resolution, nx, ny));
    let structure = if levels.len() > 1 { Structure::D3 } else { Structure::H2D };
    Geometry::new(structure, grid, VCoordinate::new(100, levels.to_vec())).unwrap()
}

/// Field on `geometry` with hourly validities and values f(t, k, j, i).
pub fn field_from_fn<F>(name: &str, geometry: Geometry, nt: usize, f: F) -> D3Field
where
    F: Fn(usize, usize, usize, usize) -> f64,
{
    let shape = (nt, geometry.nlevels(), geometry.hgrid().ny(), geometry.hgrid().nx());
    let data = Array4::from_shape_fn(shape, |(t, k, j, i)| f(t, k, j, i));
    FieldBuilder::new(Fid::with("memory", name), geometry)
        .validity(hourly_validities(nt))
        .data(data)
        .build()
        .unwrap()
}

/// 10x10 one-level field on a 1° grid starting at (0°E, 40°N), valued
/// 100 j + i.
pub fn ten_by_ten() -> D3Field {
    let geometry = regll_geometry(0.0, 40.0, 1.0, 10, 10, &[850.0]);
    field_from_fn("T850", geometry, 1, |_, _, j, i| (100 * j + i) as f64)
}

/// Bi-periodic 2D discrete Fourier transform, coefficients stored as
/// (re, im) pairs in row-major (q, p) order.
#[derive(Debug)]
pub struct FourierTransform;

fn dims(gpdims: &GpDims) -> Result<(usize, usize, f64, f64), FieldError> {
    match gpdims {
        GpDims::Lam {
            x,
            y,
            x_resolution,
            y_resolution,
            ..
        } => Ok((*x, *y, *x_resolution, *y_resolution)),
        GpDims::Global { .. } => Err(FieldError::not_implemented("global test transform")),
    }
}

fn wavenumber(m: usize, n: usize) -> f64 {
    if m <= n / 2 {
        m as f64
    } else {
        m as f64 - n as f64
    }
}

impl FourierTransform {
    fn inverse(coeffs: &[f64], nx: usize, ny: usize) -> Vec<f64> {
        let mut values = vec![0.0; nx * ny];
        for j in 0..ny {
            for i in 0..nx {
                let mut sum = 0.0;
                for q in 0..ny {
                    for p in 0..nx {
                        let (re, im) = (coeffs[2 * (q * nx + p)], coeffs[2 * (q * nx + p) + 1]);
                        let angle = 2.0 * PI * (p as f64 * i as f64 / nx as f64 + q as f64 * j as f64 / ny as f64);
                        sum += re * angle.cos() - im * angle.sin();
                    }
                }
                values[j * nx + i] = sum;
            }
        }
        values
    }

    fn derivative(coeffs: &[f64], nx: usize, ny: usize, scale: impl Fn(usize, usize) -> f64) -> Vec<f64> {
        let mut derived = vec![0.0; coeffs.len()];
        for q in 0..ny {
            for p in 0..nx {
                let w = scale(p, q);
                let n = q * nx + p;
                // multiplication by i w
                derived[2 * n] = -coeffs[2 * n + 1] * w;
                derived[2 * n + 1] = coeffs[2 * n] * w;
            }
        }
        Self::inverse(&derived, nx, ny)
    }
}

impl SpectralTransform for FourierTransform {
    fn sp2gp(&self, coeffs: &[f64], gpdims: &GpDims) -> Result<Vec<f64>, FieldError> {
        let (nx, ny, _, _) = dims(gpdims)?;
        if coeffs.len() != 2 * nx * ny {
            return Err(FieldError::shape("coefficients do not match the grid"));
        }
        Ok(Self::inverse(coeffs, nx, ny))
    }

    fn gp2sp(&self, gpdata: &[f64], gpdims: &GpDims) -> Result<Vec<f64>, FieldError> {
        let (nx, ny, _, _) = dims(gpdims)?;
        if gpdata.len() != nx * ny {
            return Err(FieldError::shape("gridpoint values do not match the grid"));
        }
        let norm = (nx * ny) as f64;
        let mut coeffs = vec![0.0; 2 * nx * ny];
        for q in 0..ny {
            for p in 0..nx {
                let (mut re, mut im) = (0.0, 0.0);
                for j in 0..ny {
                    for i in 0..nx {
                        let angle = 2.0 * PI * (p as f64 * i as f64 / nx as f64 + q as f64 * j as f64 / ny as f64);
                        re += gpdata[j * nx + i] * angle.cos();
                        im -= gpdata[j * nx + i] * angle.sin();
                    }
                }
                coeffs[2 * (q * nx + p)] = re / norm;
                coeffs[2 * (q * nx + p) + 1] = im / norm;
            }
        }
        Ok(coeffs)
    }

    fn compute_xy_spderivatives(&self, coeffs: &[f64], gpdims: &GpDims) -> Result<(Vec<f64>, Vec<f64>), FieldError> {
        let (nx, ny, dx, dy) = dims(gpdims)?;
        let dfdx = Self::derivative(coeffs, nx, ny, |p, _| 2.0 * PI * wavenumber(p, nx) / (nx as f64 * dx));
        let dfdy = Self::derivative(coeffs, nx, ny, |_, q| 2.0 * PI * wavenumber(q, ny) / (ny as f64 * dy));
        Ok((dfdx, dfdy))
    }

    fn spectral_size(&self, _truncation: &Truncation, gpdims: &GpDims) -> usize {
        2 * gpdims.gridpoints_number()
    }
}

pub fn fourier_geometry(nx: usize, ny: usize) -> SpectralGeometry {
    SpectralGeometry::new(
        SpectralSpace::BiFourier,
        Truncation::Elliptic {
            in_x: nx / 2,
            in_y: ny / 2,
        },
        Arc::new(FourierTransform),
    )
}

/// Planar 8x8 geometry with 1 km resolution.
pub fn academic_geometry(levels: &[f64]) -> Geometry {
    let grid = Grid::Academic(AcademicGrid::new(1000.0, 1000.0, 8, 8));
    let structure = if levels.len() > 1 { Structure::D3 } else { Structure::H2D };
    Geometry::new(structure, grid, VCoordinate::new(100, levels.to_vec())).unwrap()
}

/// Gridpoint field on the academic grid with values f(j, i).
pub fn academic_field<F>(name: &str, f: F) -> D3Field
where
    F: Fn(usize, usize) -> f64,
{
    field_from_fn(name, academic_geometry(&[500.0]), 1, |_, _, j, i| f(j, i))
}
