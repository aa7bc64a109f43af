//! Vector fields: scalar components (e.g. wind u, v) on the axes of a
//! shared geometry.

use log::debug;
use ndarray::{s, Array4, ArrayD, Zip};
use std::io::Write;
use std::ops::{Add, Div, Mul, Sub};
use std::sync::Arc;

use super::d3field::FieldData;
use super::ops::{Operand, Operator};
use super::{
    CommonField, D3Field, FieldStats, IjQuery, LevelSelector, LlQuery, LlValues, LonLatBox,
    ResampleOptions, SubdomainOptions, ValiditySelector, Values,
};
use crate::config::Constants;
use crate::data_io::WhatOptions;
use crate::error::{FieldError, Result};
use crate::fid::Fid;
use crate::geometry::{Geometry, Grid, Structure, Subzone};
use crate::spectral::SpectralGeometry;
use crate::validity::FieldValidityList;

/// Vector field made of components sharing geometry, spectral geometry,
/// structure and validity.
#[derive(Debug, Clone)]
pub struct VectorField {
    fid: Fid,
    processtype: Option<String>,
    components: Vec<D3Field>,
}

fn check_components(components: &[D3Field]) -> Result<()> {
    let first = components
        .first()
        .ok_or_else(|| FieldError::domain("a vector field needs components"))?;
    for other in &components[1..] {
        first.check_operands(other)?;
        if first.structure() != other.structure() {
            return Err(FieldError::domain("vector components must share their structure"));
        }
        if first.validity() != other.validity() {
            return Err(FieldError::domain("vector components must share their validity"));
        }
    }
    Ok(())
}

/// Vector field from its x and y components on the grid axes.
pub fn make_vector_field(x: D3Field, y: D3Field) -> Result<VectorField> {
    VectorField::new(Fid::operation("make_vector"), vec![x, y])
}

fn scalar_result(like: &D3Field, op: &str, data: Array4<f64>) -> D3Field {
    D3Field::from_parts(
        Fid::operation(op),
        like.geometry().clone(),
        like.validity().clone(),
        None,
        like.processtype().map(str::to_string),
        Some(FieldData::Gridpoint(data)),
    )
}

impl VectorField {
    pub fn new(fid: Fid, components: Vec<D3Field>) -> Result<Self> {
        check_components(&components)?;
        let processtype = components[0].processtype().map(str::to_string);
        Ok(VectorField {
            fid,
            processtype,
            components,
        })
    }

    /// Wind on the grid axes from stream function `psi` and velocity
    /// potential `khi`, both spectral.
    pub fn psikhi2uv(psi: &D3Field, khi: &D3Field) -> Result<VectorField> {
        let (dpsidx, dpsidy) = psi.compute_xy_spderivatives()?;
        let (dkhidx, dkhidy) = khi.compute_xy_spderivatives()?;
        let mut u = (&dkhidx - &dpsidy)?;
        let mut v = (&dkhidy + &dpsidx)?;
        u.set_fid(Fid::with("derivative", "u-wind"));
        v.set_fid(Fid::with("derivative", "v-wind"));
        u.set_validity(psi.validity().clone())?;
        v.set_validity(psi.validity().clone())?;
        make_vector_field(u, v)
    }

    pub fn fid(&self) -> &Fid {
        &self.fid
    }

    pub fn components(&self) -> &[D3Field] {
        &self.components
    }

    pub fn into_components(self) -> Vec<D3Field> {
        self.components
    }

    pub fn geometry(&self) -> &Geometry {
        self.components[0].geometry()
    }

    pub fn structure(&self) -> Structure {
        self.components[0].structure()
    }

    pub fn validity(&self) -> &FieldValidityList {
        self.components[0].validity()
    }

    pub fn spectral_geometry(&self) -> Option<&SpectralGeometry> {
        self.components[0].spectral_geometry()
    }

    pub fn spectral(&self) -> bool {
        self.spectral_geometry().is_some()
    }

    pub fn processtype(&self) -> Option<&str> {
        self.processtype.as_deref()
    }

    fn rebuild(&self, components: Vec<D3Field>) -> Result<VectorField> {
        let mut vector = VectorField::new(self.fid.clone(), components)?;
        vector.processtype = self.processtype.clone();
        Ok(vector)
    }

    fn map<F>(&self, f: F) -> Result<VectorField>
    where
        F: Fn(&D3Field) -> Result<D3Field>,
    {
        let components = self.components.iter().map(f).collect::<Result<Vec<_>>>()?;
        self.rebuild(components)
    }

    /// Apply `f` to a copy of every component, and keep the copies only if
    /// all succeed.
    fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&mut D3Field) -> Result<()>,
    {
        let mut components = self.components.clone();
        for component in components.iter_mut() {
            f(component)?;
        }
        self.components = components;
        Ok(())
    }

    pub fn sp2gp(&mut self) -> Result<()> {
        self.update(D3Field::sp2gp)
    }

    pub fn gp2sp(&mut self, spectral_geometry: SpectralGeometry) -> Result<()> {
        self.update(|c| c.gp2sp(spectral_geometry.clone()))
    }

    pub fn getdata(&self, subzone: Option<Subzone>, d4: bool) -> Result<Vec<ArrayD<f64>>> {
        self.components.iter().map(|c| c.getdata(subzone, d4)).collect()
    }

    /// Set the data of all components, one array per component; nothing is
    /// changed on error.
    pub fn setdata(&mut self, data: Vec<ArrayD<f64>>) -> Result<()> {
        if data.len() != self.components.len() {
            return Err(FieldError::shape(format!(
                "{} data arrays given for {} components",
                data.len(),
                self.components.len()
            )));
        }
        let mut components = self.components.clone();
        for (component, values) in components.iter_mut().zip(data) {
            component.setdata(values)?;
        }
        self.components = components;
        Ok(())
    }

    pub fn deldata(&mut self) {
        self.components.iter_mut().for_each(D3Field::deldata);
    }

    fn gridpoint_components(&self) -> Result<Vec<Array4<f64>>> {
        let mut copy = self.clone();
        copy.sp2gp()?;
        copy.components.iter().map(|c| c.data4d(None)).collect()
    }

    fn respectralize(&self, mut field: D3Field) -> Result<D3Field> {
        if let Some(sg) = self.spectral_geometry() {
            field.gp2sp(sg.clone())?;
        }
        Ok(field)
    }

    /// Module of the vector, sqrt(x² + y²), as a scalar field.
    pub fn to_module(&self) -> Result<D3Field> {
        let data = self.gridpoint_components()?;
        let mut module = Array4::zeros(data[0].dim());
        for component in &data {
            Zip::from(&mut module).and(component).for_each(|m, &c| *m += c * c);
        }
        module.mapv_inplace(f64::sqrt);
        self.respectralize(scalar_result(&self.components[0], "module", module))
    }

    /// Meteorological direction in degrees (where the vector comes from,
    /// clockwise from the north of the grid).
    pub fn compute_direction(&self) -> Result<D3Field> {
        if self.components.len() != 2 {
            return Err(FieldError::domain("direction needs a 2-components vector field"));
        }
        let floor = Constants::default().direction_floor;
        let data = self.gridpoint_components()?;
        let mut direction = Array4::zeros(data[0].dim());
        Zip::from(&mut direction)
            .and(&data[0])
            .and(&data[1])
            .for_each(|d, &u, &v| {
                let module = (u * u + v * v).sqrt().max(floor);
                let u_norm = -u / module;
                let v_norm = (-v / module).clamp(-1.0, 1.0);
                let dd = v_norm.acos();
                *d = if u_norm >= 0.0 { dd } else { 2.0 * std::f64::consts::PI - dd }.to_degrees();
                if u.is_nan() || v.is_nan() {
                    *d = f64::NAN;
                }
            });
        self.respectralize(scalar_result(&self.components[0], "direction", direction))
    }

    /// Reproject the components from the grid axes onto the true zonal and
    /// meridional axes (or back if `reverse`), per time step and level.
    pub fn reproject_wind_on_lonlat(&mut self, map_factor_correction: bool, reverse: bool) -> Result<()> {
        if self.spectral() {
            return Err(FieldError::domain("field must be gridpoint to reproject wind"));
        }
        if self.components.len() != 2 {
            return Err(FieldError::domain("wind reprojection needs 2 components"));
        }
        let geometry = self.geometry().clone();
        let mut u = self.components[0].data4d(None)?;
        let mut v = self.components[1].data4d(None)?;
        let (nt, nz, _, _) = u.dim();
        for t in 0..nt {
            for k in 0..nz {
                let (ur, vr) = geometry.reproject_wind_on_lonlat(
                    u.slice(s![t, k, .., ..]),
                    v.slice(s![t, k, .., ..]),
                    map_factor_correction,
                    reverse,
                )?;
                u.slice_mut(s![t, k, .., ..]).assign(&ur);
                v.slice_mut(s![t, k, .., ..]).assign(&vr);
            }
        }
        self.setdata(vec![u.into_dyn(), v.into_dyn()])
    }

    /// Multiply the components by the map factor (divide if `reverse`).
    pub fn map_factorize(&mut self, reverse: bool) -> Result<()> {
        let spectral_geometry = self.spectral_geometry().cloned();
        let mut work = self.clone();
        work.sp2gp()?;
        let m = work.geometry().map_factor_field();
        let mut scaled = Vec::with_capacity(work.components.len());
        for component in &work.components {
            let mut data = component.data4d(None)?;
            for mut slab in data.outer_iter_mut() {
                for mut plane in slab.outer_iter_mut() {
                    if reverse {
                        plane /= &m;
                    } else {
                        plane *= &m;
                    }
                }
            }
            scaled.push(data.into_dyn());
        }
        work.setdata(scaled)?;
        if let Some(sg) = spectral_geometry {
            work.gp2sp(sg)?;
        }
        *self = work;
        Ok(())
    }

    /// Vorticity dv/dx − du/dy and divergence du/dx + dv/dy, from the
    /// spectral derivatives of the components; with `divide_by_m` the
    /// components are divided by the map factor first.
    pub fn compute_vordiv(&self, divide_by_m: bool) -> Result<(D3Field, D3Field)> {
        if self.components.len() != 2 {
            return Err(FieldError::domain("vorticity and divergence need 2 components"));
        }
        let field = if divide_by_m {
            let mut field = self.clone();
            field.map_factorize(true)?;
            field
        } else {
            self.clone()
        };
        let (dudx, dudy) = field.components[0].compute_xy_spderivatives()?;
        let (dvdx, dvdy) = field.components[1].compute_xy_spderivatives()?;
        let mut vor = (&dvdx - &dudy)?;
        let mut div = (&dudx + &dvdy)?;
        vor.set_fid(Fid::with("derivative", "vorticity"));
        div.set_fid(Fid::with("derivative", "divergence"));
        vor.set_validity(dudx.validity().clone())?;
        div.set_validity(dudx.validity().clone())?;
        Ok((vor, div))
    }

    pub fn getvalue_ij(&self, query: &IjQuery, one: bool) -> Result<Vec<Values>> {
        self.components.iter().map(|c| c.getvalue_ij(query, one)).collect()
    }

    pub fn getvalue_ll(&self, query: &LlQuery) -> Result<Vec<LlValues>> {
        self.components.iter().map(|c| c.getvalue_ll(query)).collect()
    }

    pub fn getlevel(&self, selector: LevelSelector) -> Result<VectorField> {
        self.map(|c| c.getlevel(selector))
    }

    pub fn getvalidity(&self, selector: ValiditySelector) -> Result<VectorField> {
        self.map(|c| c.getvalidity(selector.clone()))
    }

    pub fn extract_subdomain(&self, geometry: &Geometry, options: &SubdomainOptions) -> Result<VectorField> {
        self.map(|c| c.extract_subdomain(geometry, options))
    }

    pub fn extract_zoom(&self, zoom: &LonLatBox, extra_10th: bool) -> Result<VectorField> {
        self.map(|c| c.extract_zoom(zoom, extra_10th))
    }

    pub fn extract_subarray(&self, first_i: usize, last_i: usize, first_j: usize, last_j: usize) -> Result<VectorField> {
        self.map(|c| c.extract_subarray(first_i, last_i, first_j, last_j))
    }

    /// Resample every component; the neighbour correspondence is computed
    /// once and shared between components.
    pub fn resample(&self, target: &Geometry, options: &ResampleOptions) -> Result<VectorField> {
        let options = self.with_neighbour_info(target, options)?;
        self.map(|c| Ok(c.resample(target, &options)?.field))
    }

    pub fn resample_on_regularll(&self, borders: &LonLatBox, resolution: f64, options: &ResampleOptions) -> Result<VectorField> {
        let target = super::resample::regularll_target(borders, resolution)?;
        self.resample(&target, options)
    }

    fn with_neighbour_info(&self, target: &Geometry, options: &ResampleOptions) -> Result<ResampleOptions> {
        if options.neighbour_info.is_some() || self.components.len() < 2 {
            return Ok(options.clone());
        }
        let info = self.components[0].neighbour_info(target, options)?;
        debug!(
            "neighbour info shared by {} vector components",
            self.components.len()
        );
        Ok(options.clone().neighbour_info(Arc::new(info)))
    }

    /// Shift the center longitude of a global regular lon/lat field.
    pub fn global_shift_center(&mut self, shift: f64) -> Result<()> {
        if !matches!(self.geometry().grid, Grid::RegularLonLat(_)) {
            return Err(FieldError::domain("only for regular lonlat geometries"));
        }
        self.update(|c| c.global_shift_center(shift))
    }

    pub fn stats(&self, subzone: Option<Subzone>) -> Result<Vec<FieldStats>> {
        self.components.iter().map(|c| c.stats(subzone)).collect()
    }

    pub fn min(&self, subzone: Option<Subzone>) -> Result<Vec<f64>> {
        self.components.iter().map(|c| c.min(subzone)).collect()
    }

    pub fn max(&self, subzone: Option<Subzone>) -> Result<Vec<f64>> {
        self.components.iter().map(|c| c.max(subzone)).collect()
    }

    pub fn mean(&self, subzone: Option<Subzone>) -> Result<Vec<f64>> {
        self.components.iter().map(|c| c.mean(subzone)).collect()
    }

    pub fn std(&self, subzone: Option<Subzone>) -> Result<Vec<f64>> {
        self.components.iter().map(|c| c.std(subzone)).collect()
    }

    pub fn quadmean(&self, subzone: Option<Subzone>) -> Result<Vec<f64>> {
        self.components.iter().map(|c| c.quadmean(subzone)).collect()
    }

    pub fn nonzero(&self, subzone: Option<Subzone>) -> Result<Vec<usize>> {
        self.components.iter().map(|c| c.nonzero(subzone)).collect()
    }

    pub fn what(&self, out: &mut dyn Write, options: &WhatOptions) -> Result<()> {
        for component in &self.components {
            component.what(out, options)?;
        }
        Ok(())
    }

    /// Compatibility with another vector field in an operation.
    pub fn check_operands(&self, other: &VectorField) -> Result<()> {
        if self.components.len() != other.components.len() {
            return Err(FieldError::domain(
                "vector fields must have the same number of components",
            ));
        }
        self.components[0].check_operands(&other.components[0])
    }

    /// New vector `self op other` component-wise, or `other op self` if
    /// `reversed`.
    pub fn operated(&self, op: Operator, other: VectorOperand, reversed: bool) -> Result<VectorField> {
        let components = match other {
            VectorOperand::Vector(other) => {
                self.check_operands(other)?;
                self.components
                    .iter()
                    .zip(&other.components)
                    .map(|(mine, theirs)| mine.operated(op, Operand::Field(theirs), reversed))
                    .collect::<Result<Vec<_>>>()?
            }
            VectorOperand::Scalar(x) => self
                .components
                .iter()
                .map(|c| c.operated(op, Operand::Scalar(x), reversed))
                .collect::<Result<Vec<_>>>()?,
        };
        let mut vector = VectorField::new(Fid::operation(op.symbol()), components)?;
        vector.processtype = self.processtype.clone();
        Ok(vector)
    }
}

/// Right-hand side of a vector operation.
#[derive(Debug, Clone, Copy)]
pub enum VectorOperand<'a> {
    Vector(&'a VectorField),
    Scalar(f64),
}

macro_rules! vector_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<&VectorField> for &VectorField {
            type Output = Result<VectorField>;

            fn $method(self, other: &VectorField) -> Result<VectorField> {
                self.operated($op, VectorOperand::Vector(other), false)
            }
        }

        impl $trait<f64> for &VectorField {
            type Output = Result<VectorField>;

            fn $method(self, other: f64) -> Result<VectorField> {
                self.operated($op, VectorOperand::Scalar(other), false)
            }
        }

        impl $trait<&VectorField> for f64 {
            type Output = Result<VectorField>;

            fn $method(self, other: &VectorField) -> Result<VectorField> {
                other.operated($op, VectorOperand::Scalar(self), true)
            }
        }
    };
}

vector_operator!(Add, add, Operator::Add);
vector_operator!(Sub, sub, Operator::Sub);
vector_operator!(Mul, mul, Operator::Mul);
vector_operator!(Div, div, Operator::Div);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{RegLLGrid, VCoordinate};
    use ndarray::Array4;

    fn component(values: [f64; 4]) -> D3Field {
        let grid = Grid::RegularLonLat(RegLLGrid::new(0.0, 0.0, 1.0, 1.0, 2, 2));
        let geometry = Geometry::new(Structure::H2D, grid, VCoordinate::single(100, 850.0)).unwrap();
        let data = Array4::from_shape_vec((1, 1, 2, 2), values.to_vec()).unwrap();
        crate::field::FieldBuilder::new(Fid::with("memory", "wind"), geometry)
            .data(data)
            .build()
            .unwrap()
    }

    #[test]
    fn test_module_and_direction() {
        let wind = make_vector_field(
            component([3.0, 0.0, 0.0, -1.0]),
            component([4.0, 1.0, 0.0, 0.0]),
        )
        .unwrap();
        let module = wind.to_module().unwrap();
        assert_eq!(module.fid(), &Fid::operation("module"));
        let module = module.data4d(None).unwrap();
        assert!((module[[0, 0, 0, 0]] - 5.0).abs() < 1e-12);
        assert_eq!(module[[0, 0, 1, 0]], 0.0);
        let direction = wind.compute_direction().unwrap();
        assert_eq!(direction.fid(), &Fid::operation("direction"));
        let direction = direction.data4d(None).unwrap();
        // northward wind blows from the south, westward wind from the east
        assert!((direction[[0, 0, 0, 1]] - 180.0).abs() < 1e-9);
        assert!((direction[[0, 0, 1, 1]] - 90.0).abs() < 1e-9);
        assert!(direction[[0, 0, 1, 0]].is_finite());
    }

    #[test]
    fn test_setdata_is_all_or_nothing() {
        let mut wind = make_vector_field(component([1.0; 4]), component([2.0; 4])).unwrap();
        let good = ArrayD::from_elem(ndarray::IxDyn(&[2, 2]), 7.0);
        let bad = ArrayD::from_elem(ndarray::IxDyn(&[3, 2]), 7.0);
        assert!(wind.setdata(vec![good, bad]).is_err());
        assert_eq!(wind.mean(None).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_vector_arithmetic() {
        let a = make_vector_field(component([1.0; 4]), component([2.0; 4])).unwrap();
        let b = make_vector_field(component([3.0; 4]), component([4.0; 4])).unwrap();
        let sum = (&a + &b).unwrap();
        assert_eq!(sum.mean(None).unwrap(), vec![4.0, 6.0]);
        assert_eq!(sum.fid(), &Fid::operation("+"));
        let reversed = (10.0 - &a).unwrap();
        assert_eq!(reversed.mean(None).unwrap(), vec![9.0, 8.0]);
    }
}
