//! Arithmetic between fields, and between fields and scalars.
//!
//! Results are new gridpoint or spectral fields on the left operand's
//! geometry, with a null validity of the same length and a fid naming the
//! operation.

use ndarray::{ArrayD, Zip};
use std::ops::{Add, Div, Mul, Sub};

use super::d3field::FieldData;
use super::{CommonField, D3Field};
use crate::error::{FieldError, Result};
use crate::fid::Fid;
use crate::validity::FieldValidityList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
        }
    }

    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
            Operator::Div => a / b,
        }
    }
}

/// Right-hand side of an operation.
#[derive(Clone, Copy)]
pub enum Operand<'a> {
    Field(&'a dyn CommonField),
    Scalar(f64),
}

pub(crate) fn check_operands<F: CommonField + ?Sized>(field: &F, other: &dyn CommonField) -> Result<()> {
    if field.spectral() != other.spectral() {
        return Err(FieldError::domain("operands must be both spectral or both gridpoint"));
    }
    if field.geometry().dimensions() != other.geometry().dimensions() {
        return Err(FieldError::domain(
            "operands must have the same gridpoint dimensions",
        ));
    }
    if field.spectral_geometry() != other.spectral_geometry() {
        return Err(FieldError::domain("operands must have the same spectral geometry"));
    }
    if field.validity().len() != other.validity().len() {
        return Err(FieldError::domain("operands must have the same validity length"));
    }
    Ok(())
}

/// `lhs op rhs`, or `rhs op lhs` if `reversed`.
fn combine(lhs: &ArrayD<f64>, op: Operator, rhs: &Operand, reversed: bool) -> Result<ArrayD<f64>> {
    let apply = |a: f64, b: f64| if reversed { op.apply(b, a) } else { op.apply(a, b) };
    match rhs {
        Operand::Scalar(x) => Ok(lhs.mapv(|a| apply(a, *x))),
        Operand::Field(other) => {
            let rhs = other.getdata(None, true)?;
            if lhs.shape() != rhs.shape() {
                return Err(FieldError::shape(format!(
                    "operands data shapes differ: {:?} and {:?}",
                    lhs.shape(),
                    rhs.shape()
                )));
            }
            let mut out = lhs.clone();
            Zip::from(&mut out).and(&rhs).for_each(|a, &b| *a = apply(*a, b));
            Ok(out)
        }
    }
}

impl D3Field {
    /// In-place operation: `self = self op operand`.
    pub fn operation(&mut self, op: Operator, operand: Operand) -> Result<()> {
        if let Operand::Field(other) = operand {
            check_operands(self, other)?;
        }
        let data = combine(&self.getdata(None, true)?, op, &operand, false)?;
        self.setdata(data)
    }

    /// New field `self op operand` (or `operand op self` if `reversed`).
    pub fn operated(&self, op: Operator, operand: Operand, reversed: bool) -> Result<D3Field> {
        if let Operand::Field(other) = operand {
            check_operands(self, other)?;
        }
        let data = combine(&self.getdata(None, true)?, op, &operand, reversed)?;
        let data = match self.data() {
            Some(FieldData::Spectral(_)) => FieldData::Spectral(data.into_dimensionality()?),
            _ => FieldData::Gridpoint(data.into_dimensionality()?),
        };
        Ok(D3Field::from_parts(
            Fid::operation(op.symbol()),
            self.geometry().clone(),
            FieldValidityList::with_length(self.validity().len()),
            self.spectral_geometry().cloned(),
            self.processtype().map(str::to_string),
            Some(data),
        ))
    }
}

macro_rules! field_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<&D3Field> for &D3Field {
            type Output = Result<D3Field>;

            fn $method(self, other: &D3Field) -> Result<D3Field> {
                self.operated($op, Operand::Field(other), false)
            }
        }

        impl $trait<f64> for &D3Field {
            type Output = Result<D3Field>;

            fn $method(self, other: f64) -> Result<D3Field> {
                self.operated($op, Operand::Scalar(other), false)
            }
        }

        impl $trait<&D3Field> for f64 {
            type Output = Result<D3Field>;

            fn $method(self, other: &D3Field) -> Result<D3Field> {
                other.operated($op, Operand::Scalar(self), true)
            }
        }
    };
}

field_operator!(Add, add, Operator::Add);
field_operator!(Sub, sub, Operator::Sub);
field_operator!(Mul, mul, Operator::Mul);
field_operator!(Div, div, Operator::Div);
