use chrono::{Datelike, Timelike};
use ndarray::{s, Array4, Ix4};

use super::d3field::FieldData;
use super::{CommonField, D3Field};
use crate::error::{FieldError, Result};
use crate::geometry::{Geometry, Grid, Structure, Subzone, UnstructuredGrid, VCoordinate};
use crate::validity::FieldValidityList;

/// Flattening order of exported arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayOrder {
    /// Row-major: x varies fastest
    #[default]
    C,
    /// Column-major: time varies fastest
    F,
}

/// Values of a field and their coordinates, as parallel flat lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldLists {
    pub values: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub latitudes: Vec<f64>,
    pub levels: Vec<f64>,
    /// yyyymmdd
    pub dates: Vec<u32>,
    /// hhmm
    pub times: Vec<u32>,
}

fn flatten(a: &Array4<f64>, order: ArrayOrder) -> Vec<f64> {
    match order {
        ArrayOrder::C => a.iter().copied().collect(),
        ArrayOrder::F => a.t().iter().copied().collect(),
    }
}

fn gridpoint_data<F: CommonField + ?Sized>(field: &F, subzone: Option<Subzone>, what: &str) -> Result<Array4<f64>> {
    if field.spectral() {
        return Err(FieldError::domain(format!(
            "{} needs a gridpoint field, not a spectral one",
            what
        )));
    }
    Ok(field.getdata(subzone, true)?.into_dimensionality::<Ix4>()?)
}

fn levels4d(geometry: &Geometry, nb_validities: usize, subzone: Option<Subzone>) -> Result<Array4<f64>> {
    let levels = geometry.get_levels(nb_validities)?;
    match subzone {
        Some(zone) => geometry.extract_subzone(levels.view(), zone),
        None => Ok(levels),
    }
}

fn date_time(field_validity: &crate::validity::FieldValidity) -> (u32, u32) {
    match field_validity.get() {
        Some(d) => (
            d.year() as u32 * 10000 + d.month() * 100 + d.day(),
            d.hour() * 100 + d.minute(),
        ),
        None => (0, 0),
    }
}

pub(crate) fn as_lists<F: CommonField + ?Sized>(field: &F, order: ArrayOrder, subzone: Option<Subzone>) -> Result<FieldLists> {
    let data = gridpoint_data(field, subzone, "as_lists")?;
    let (nt, nz, ny, nx) = data.dim();
    let geometry = field.geometry();
    let (lons, lats) = geometry.get_lonlat_grid(subzone)?;
    let levels = levels4d(geometry, nt, subzone)?;
    let lons4d = Array4::from_shape_fn((nt, nz, ny, nx), |(_, _, j, i)| lons[[j, i]]);
    let lats4d = Array4::from_shape_fn((nt, nz, ny, nx), |(_, _, j, i)| lats[[j, i]]);
    let stamps: Vec<(u32, u32)> = field.validity().iter().map(date_time).collect();
    let dates4d = Array4::from_shape_fn((nt, nz, ny, nx), |(t, _, _, _)| stamps[t].0 as f64);
    let times4d = Array4::from_shape_fn((nt, nz, ny, nx), |(t, _, _, _)| stamps[t].1 as f64);
    Ok(FieldLists {
        values: flatten(&data, order),
        longitudes: flatten(&lons4d, order),
        latitudes: flatten(&lats4d, order),
        levels: flatten(&levels, order),
        dates: flatten(&dates4d, order).into_iter().map(|d| d as u32).collect(),
        times: flatten(&times4d, order).into_iter().map(|t| t as u32).collect(),
    })
}

/// One gridpoint value with its coordinates and validity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord {
    pub value: f64,
    /// yyyymmdd
    pub date: u32,
    /// hhmm
    pub time: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub level: f64,
}

/// One record per (validity, level, gridpoint), x varying fastest.
pub(crate) fn as_dicts<F: CommonField + ?Sized>(field: &F, subzone: Option<Subzone>) -> Result<Vec<PointRecord>> {
    let data = gridpoint_data(field, subzone, "as_dicts")?;
    let (nt, nz, ny, nx) = data.dim();
    let geometry = field.geometry();
    let (lons, lats) = geometry.get_lonlat_grid(subzone)?;
    let levels = levels4d(geometry, nt, subzone)?;
    let stamps: Vec<(u32, u32)> = field.validity().iter().map(date_time).collect();
    let mut records = Vec::with_capacity(data.len());
    for (t, &(date, time)) in stamps.iter().enumerate().take(nt) {
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    records.push(PointRecord {
                        value: data[[t, k, j, i]],
                        date,
                        time,
                        latitude: lats[[j, i]],
                        longitude: lons[[j, i]],
                        level: levels[[t, k, j, i]],
                    });
                }
            }
        }
    }
    Ok(records)
}

fn point_geometry(lon: f64, lat: f64, structure: Structure, vcoordinate: VCoordinate) -> Result<Geometry> {
    Geometry::new(structure, Grid::Unstructured(UnstructuredGrid::point(lon, lat)), vcoordinate)
}

/// One Point field per (validity, level, gridpoint); masked points are
/// skipped.
pub(crate) fn as_points<F: CommonField + ?Sized>(field: &F, subzone: Option<Subzone>) -> Result<Vec<D3Field>> {
    let data = gridpoint_data(field, subzone, "as_points")?;
    let (nt, nz, ny, nx) = data.dim();
    let geometry = field.geometry();
    let (lons, lats) = geometry.get_lonlat_grid(subzone)?;
    let levels = levels4d(geometry, nt, subzone)?;
    let mut points = Vec::with_capacity(nt * nz * ny * nx);
    for t in 0..nt {
        let validity = field.validity().select(t)?;
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    if lons[[j, i]].is_nan() {
                        continue;
                    }
                    let vcoordinate = VCoordinate {
                        levels: vec![levels[[t, k, j, i]].into()],
                        ..geometry.vcoordinate.clone()
                    };
                    let point = point_geometry(lons[[j, i]], lats[[j, i]], Structure::Point, vcoordinate)?;
                    let value = Array4::from_elem((1, 1, 1, 1), data[[t, k, j, i]]);
                    points.push(D3Field::from_parts(
                        field.fid().clone(),
                        point,
                        validity.clone(),
                        None,
                        field.processtype().map(str::to_string),
                        Some(FieldData::Gridpoint(value)),
                    ));
                }
            }
        }
    }
    Ok(points)
}

/// One V1D field per gridpoint; masked points are skipped.
pub(crate) fn as_profiles<F: CommonField + ?Sized>(field: &F, subzone: Option<Subzone>) -> Result<Vec<D3Field>> {
    let data = gridpoint_data(field, subzone, "as_profiles")?;
    let (nt, nz, ny, nx) = data.dim();
    let geometry = field.geometry();
    let (lons, lats) = geometry.get_lonlat_grid(subzone)?;
    let levels = levels4d(geometry, nt, subzone)?;
    let validity: FieldValidityList = field.validity().clone();
    let mut profiles = Vec::with_capacity(ny * nx);
    for j in 0..ny {
        for i in 0..nx {
            if lons[[j, i]].is_nan() {
                continue;
            }
            let column: Vec<f64> = (0..nz).map(|k| levels[[0, k, j, i]]).collect();
            let vcoordinate = VCoordinate {
                levels: column.into_iter().map(Into::into).collect(),
                ..geometry.vcoordinate.clone()
            };
            let profile = point_geometry(lons[[j, i]], lats[[j, i]], Structure::V1D, vcoordinate)?;
            let values = data.slice(s![.., .., j..j + 1, i..i + 1]).to_owned();
            profiles.push(D3Field::from_parts(
                field.fid().clone(),
                profile,
                validity.clone(),
                None,
                field.processtype().map(str::to_string),
                Some(FieldData::Gridpoint(values)),
            ));
        }
    }
    Ok(profiles)
}
