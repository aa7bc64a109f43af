pub mod config;
pub mod data_io;
pub mod error;
pub mod fid;
pub mod field;
pub mod geometry;
pub mod math;
pub mod resource;
pub mod spectral;
pub mod validity;

pub use error::{FieldError, Result};
pub use fid::{Fid, FidValue};
pub use field::{CommonField, D3Field, FieldBuilder, VectorField, VirtualField};
pub use geometry::{Geometry, Grid, Structure};
pub use validity::{FieldValidity, FieldValidityList};
