use log::debug;
use ndarray::{ArrayD, IxDyn};

use crate::error::{FieldError, Result};

/// Drop the axes flagged absent in `present`.
pub(crate) fn squeeze(data: ArrayD<f64>, present: &[bool]) -> Result<ArrayD<f64>> {
    let shape: Vec<usize> = data
        .shape()
        .iter()
        .zip(present.iter())
        .filter(|(_, &p)| p)
        .map(|(&n, _)| n)
        .collect();
    let data = data.as_standard_layout().into_owned();
    Ok(data.into_shape(IxDyn(&shape))?)
}

/// Bring data given either in full form or with only the `present` axes
/// back to the `full` shape.
pub(crate) fn expand(data: ArrayD<f64>, full: &[usize], present: &[bool]) -> Result<ArrayD<f64>> {
    if data.ndim() == full.len() {
        if data.shape() != full {
            return Err(FieldError::shape(format!(
                "data shape {:?} does not match expected {:?}",
                data.shape(),
                full
            )));
        }
        return Ok(data);
    }
    let squeezed: Vec<usize> = full
        .iter()
        .zip(present.iter())
        .filter(|(_, &p)| p)
        .map(|(&n, _)| n)
        .collect();
    let scalar_like = squeezed.is_empty() && data.len() == 1 && data.ndim() <= 1;
    if data.shape() != squeezed.as_slice() && !scalar_like {
        return Err(FieldError::shape(format!(
            "data of shape {:?} given, expected {:?} (or {:?} in full form)",
            data.shape(),
            squeezed,
            full
        )));
    }
    debug!("reshaping data {:?} to {:?}", data.shape(), full);
    let data = data.as_standard_layout().into_owned();
    Ok(data.into_shape(IxDyn(full))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn test_expand_then_squeeze() {
        let data = Array::from_shape_vec(IxDyn(&[3, 4]), (0..12).map(f64::from).collect()).unwrap();
        let full = expand(data.clone(), &[1, 1, 3, 4], &[false, false, true, true]).unwrap();
        assert_eq!(full.shape(), &[1, 1, 3, 4]);
        let back = squeeze(full, &[false, false, true, true]).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_expand_rejects_wrong_size() {
        let data = ArrayD::<f64>::zeros(IxDyn(&[3, 5]));
        assert!(expand(data, &[1, 1, 3, 4], &[false, false, true, true]).is_err());
        let data = ArrayD::<f64>::zeros(IxDyn(&[1, 2, 3, 4]));
        assert!(expand(data, &[1, 1, 3, 4], &[false, false, true, true]).is_err());
    }

    #[test]
    fn test_scalar_like_point_data() {
        let data = ArrayD::<f64>::from_elem(IxDyn(&[1]), 7.0);
        let full = expand(data, &[1, 1, 1, 1], &[false; 4]).unwrap();
        assert_eq!(full[[0, 0, 0, 0]], 7.0);
    }
}
