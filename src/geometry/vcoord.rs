use ndarray::Array2;

/// One level of a vertical coordinate: a scalar value, or a value varying
/// with the horizontal position.
#[derive(Debug, Clone, PartialEq)]
pub enum Level {
    Value(f64),
    Gridded(Array2<f64>),
}

impl Level {
    pub fn value(&self) -> Option<f64> {
        match self {
            Level::Value(v) => Some(*v),
            Level::Gridded(_) => None,
        }
    }
}

impl From<f64> for Level {
    fn from(v: f64) -> Self {
        Level::Value(v)
    }
}

/// Position of the levels on a staggered vertical grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalPosition {
    Mass,
    Flux,
}

/// Hybrid vertical grid: (A, B) coefficients of each level interface.
#[derive(Debug, Clone, PartialEq)]
pub struct VGrid {
    pub gridlevels: Vec<(f64, f64)>,
}

/// Type codes of the first fixed surface that are handled directly.
pub const HYBRID_PRESSURE: u16 = 119;
pub const HYBRID_HEIGHT: u16 = 118;
pub const UNSPECIFIED: u16 = 255;
pub const SIMPLE_LEVEL_TYPES: [u16; 8] = [100, 103, 109, 1, 106, 255, 160, 200];

/// Vertical coordinate: level type code, optional hybrid grid and levels.
#[derive(Debug, Clone, PartialEq)]
pub struct VCoordinate {
    pub typeoffirstfixedsurface: u16,
    /// None when unknown or unspecified
    pub position_on_grid: Option<VerticalPosition>,
    pub grid: Option<VGrid>,
    pub levels: Vec<Level>,
}

impl Default for VCoordinate {
    fn default() -> Self {
        VCoordinate::unspecified()
    }
}

impl VCoordinate {
    pub fn new(typeoffirstfixedsurface: u16, levels: Vec<f64>) -> Self {
        VCoordinate {
            typeoffirstfixedsurface,
            position_on_grid: None,
            grid: None,
            levels: levels.into_iter().map(Level::Value).collect(),
        }
    }

    pub fn single(typeoffirstfixedsurface: u16, level: f64) -> Self {
        VCoordinate::new(typeoffirstfixedsurface, vec![level])
    }

    /// Type 255 without grid nor levels, for target geometries.
    pub fn unspecified() -> Self {
        VCoordinate::new(UNSPECIFIED, Vec::new())
    }

    pub fn hybrid(typeoffirstfixedsurface: u16, gridlevels: Vec<(f64, f64)>, levels: Vec<f64>) -> Self {
        VCoordinate {
            grid: Some(VGrid { gridlevels }),
            ..VCoordinate::new(typeoffirstfixedsurface, levels)
        }
    }

    /// Scalar levels, or None if any level is gridded.
    pub fn scalar_levels(&self) -> Option<Vec<f64>> {
        self.levels.iter().map(Level::value).collect()
    }

    /// Index of the scalar level equal to `value`.
    pub fn level_index(&self, value: f64) -> Option<usize> {
        self.levels
            .iter()
            .position(|l| matches!(l, Level::Value(v) if *v == value))
    }

    /// Uniqueness of levels; gridded levels are not required to be unique.
    pub fn has_unique_levels(&self) -> bool {
        match self.scalar_levels() {
            Some(mut values) => {
                let n = values.len();
                values.sort_by(|a, b| a.total_cmp(b));
                values.dedup();
                values.len() == n
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_index_and_uniqueness() {
        let v = VCoordinate::new(100, vec![850.0, 500.0, 250.0]);
        assert_eq!(v.level_index(500.0), Some(1));
        assert_eq!(v.level_index(700.0), None);
        assert!(v.has_unique_levels());
        let dup = VCoordinate::new(100, vec![850.0, 850.0]);
        assert!(!dup.has_unique_levels());
    }
}
