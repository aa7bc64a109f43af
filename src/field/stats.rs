//! Statistics over field data. Masked values (NaN) are ignored.

use ndarray::ArrayD;
use std::fmt;

use crate::config::Constants;

fn valid(data: &ArrayD<f64>) -> impl Iterator<Item = f64> + '_ {
    data.iter().copied().filter(|v| !v.is_nan())
}

pub fn min(data: &ArrayD<f64>) -> f64 {
    valid(data).fold(f64::NAN, f64::min)
}

pub fn max(data: &ArrayD<f64>) -> f64 {
    valid(data).fold(f64::NAN, f64::max)
}

pub fn mean(data: &ArrayD<f64>) -> f64 {
    let (sum, n) = valid(data).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Population standard deviation.
pub fn std(data: &ArrayD<f64>) -> f64 {
    let m = mean(data);
    let (sum, n) = valid(data).fold((0.0, 0usize), |(s, n), v| (s + (v - m).powi(2), n + 1));
    if n == 0 {
        f64::NAN
    } else {
        (sum / n as f64).sqrt()
    }
}

/// Square root of the mean of squares.
pub fn quadmean(data: &ArrayD<f64>) -> f64 {
    let (sum, n) = valid(data).fold((0.0, 0usize), |(s, n), v| (s + v * v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        (sum / n as f64).sqrt()
    }
}

/// Number of values whose magnitude exceeds the zero threshold.
pub fn nonzero(data: &ArrayD<f64>) -> usize {
    let epsilon = Constants::default().epsilon;
    valid(data).filter(|v| v.abs() > epsilon).count()
}

/// The basic statistics of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub quadmean: f64,
    pub nonzero: usize,
}

impl FieldStats {
    pub fn compute(data: &ArrayD<f64>) -> Self {
        FieldStats {
            min: min(data),
            max: max(data),
            mean: mean(data),
            std: std(data),
            quadmean: quadmean(data),
            nonzero: nonzero(data),
        }
    }
}

impl fmt::Display for FieldStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min: {:.6e}  max: {:.6e}  mean: {:.6e}  std: {:.6e}  quadmean: {:.6e}  nonzero: {}",
            self.min, self.max, self.mean, self.std, self.quadmean, self.nonzero
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn test_stats_ignore_masked_values() {
        let data = ArrayD::from_shape_vec(IxDyn(&[5]), vec![1.0, f64::NAN, -1.0, 3.0, 0.0]).unwrap();
        let stats = FieldStats::compute(&data);
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.mean - 0.75).abs() < 1e-12);
        assert!((stats.quadmean - (11.0f64 / 4.0).sqrt()).abs() < 1e-12);
        let var = ((0.25f64).powi(2) + 1.75f64.powi(2) + 2.25f64.powi(2) + 0.75f64.powi(2)) / 4.0;
        assert!((stats.std - var.sqrt()).abs() < 1e-12);
        assert_eq!(stats.nonzero, 3);
    }

    #[test]
    fn test_all_masked() {
        let data = ArrayD::from_elem(IxDyn(&[3]), f64::NAN);
        assert!(min(&data).is_nan());
        assert!(mean(&data).is_nan());
        assert_eq!(nonzero(&data), 0);
    }
}
