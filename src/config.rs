use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use clap::{Arg, ArgMatches};
use ndarray::Array4;
use std::path::PathBuf;

use crate::error;
use crate::fid::Fid;
use crate::field::{D3Field, FieldBuilder};
use crate::geometry::{Geometry, Grid, RegLLGrid, Structure, VCoordinate};
use crate::validity::FieldValidityList;

/// Numerical constants shared by field operations
#[derive(Clone, Debug)]
pub struct Constants {
    /// Threshold under which a value is considered zero (`nonzero` statistic)
    pub epsilon: f64,
    /// Earth's radius (m), used by distance computations on the sphere
    pub earth_radius: f64,
    /// Floor applied to the wind module before normalizing components
    pub direction_floor: f64,
    /// Default resampling search radius, in units of source resolution
    pub resample_radius_factor: f64,
    /// Default gaussian weighting sigma, in units of source resolution
    pub resample_sigma_factor: f64,
    /// Default number of neighbours gathered by weighted resampling
    pub resample_neighbours: usize,
    /// Tolerance (in grid cells) for a lon/lat point to be inside a
    /// rectangular domain
    pub domain_margin: f64,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            epsilon: 10.0 * f64::EPSILON,
            earth_radius: 6371229.0,
            direction_floor: 1e-15,
            resample_radius_factor: 4.0,
            resample_sigma_factor: 2.0,
            resample_neighbours: 8,
            domain_margin: 0.5,
        }
    }
}

/// Synthetic regular lon/lat grid used by the command-line tool
#[derive(Clone, Debug)]
pub struct SyntheticGrid {
    /// Longitude of the south-west corner (degrees)
    pub lon0: f64,
    /// Latitude of the south-west corner (degrees)
    pub lat0: f64,
    /// Grid resolution (degrees), same in both directions
    pub resolution: f64,
    pub nx: usize,
    pub ny: usize,
    /// Pressure levels (hPa)
    pub levels: Vec<f64>,
    /// Basis date of the synthetic forecast
    pub basis: DateTime<Utc>,
    /// Number of hourly validities
    pub validities: usize,
}

impl Default for SyntheticGrid {
    fn default() -> Self {
        Self {
            lon0: -10.0,
            lat0: 35.0,
            resolution: 0.5,
            nx: 61,
            ny: 41,
            levels: vec![850.0],
            basis: DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_default(),
            validities: 1,
        }
    }
}

impl SyntheticGrid {
    pub fn terms(&self) -> Vec<Duration> {
        (0..self.validities).map(|h| Duration::hours(h as i64)).collect()
    }

    /// Analytic temperature-like value (K) at a point, level (hPa) and term
    pub fn analytic_value(lon: f64, lat: f64, level: f64, hours: f64) -> f64 {
        230.0 + 40.0 * lat.to_radians().cos() + 5.0 * (2.0 * lon).to_radians().sin() + level / 20.0 + 0.5 * hours
    }

    pub fn geometry(&self) -> error::Result<Geometry> {
        let grid = RegLLGrid::new(self.lon0, self.lat0, self.resolution, self.resolution, self.nx, self.ny);
        let structure = if self.levels.len() > 1 { Structure::D3 } else { Structure::H2D };
        Geometry::new(structure, Grid::RegularLonLat(grid), VCoordinate::new(100, self.levels.clone()))
    }

    /// Synthetic field sampling [`SyntheticGrid::analytic_value`]
    pub fn field(&self) -> error::Result<D3Field> {
        let geometry = self.geometry()?;
        let validity = FieldValidityList::from_terms(self.basis, &self.terms())?;
        let (lons, lats) = geometry.get_lonlat_grid(None)?;
        let shape = (self.validities, self.levels.len(), self.ny, self.nx);
        let data = Array4::from_shape_fn(shape, |(t, k, j, i)| {
            Self::analytic_value(lons[[j, i]], lats[[j, i]], self.levels[k], t as f64)
        });
        FieldBuilder::new(Fid::with("synthetic", "TEMPERATURE"), geometry)
            .validity(validity)
            .processtype("analytic")
            .data(data)
            .build()
    }
}

/// Command-line configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub constants: Constants,
    pub grid: SyntheticGrid,
    /// ASCII output file; stdout when absent
    pub output: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            constants: Constants::default(),
            grid: SyntheticGrid::default(),
            output: None,
            log_level: String::from("info"),
        }
    }
}

impl Config {
    /// Arguments describing the synthetic grid, shared by all subcommands
    pub fn grid_args() -> Vec<Arg> {
        vec![
            Arg::new("lon0")
                .long("lon0")
                .value_name("DEGREES")
                .help("Longitude of the south-west grid corner")
                .allow_negative_numbers(true)
                .default_value("-10.0"),
            Arg::new("lat0")
                .long("lat0")
                .value_name("DEGREES")
                .help("Latitude of the south-west grid corner")
                .allow_negative_numbers(true)
                .default_value("35.0"),
            Arg::new("resolution")
                .long("resolution")
                .value_name("DEGREES")
                .help("Grid resolution")
                .default_value("0.5"),
            Arg::new("nx")
                .long("nx")
                .value_name("COUNT")
                .help("Number of points along x")
                .default_value("61"),
            Arg::new("ny")
                .long("ny")
                .value_name("COUNT")
                .help("Number of points along y")
                .default_value("41"),
            Arg::new("levels")
                .long("levels")
                .value_name("HPA,...")
                .help("Comma-separated pressure levels")
                .default_value("850"),
            Arg::new("basis")
                .long("basis")
                .value_name("DATETIME")
                .help("Basis date (YYYY-MM-DD HH:MM:SS)")
                .default_value("2024-01-01 00:00:00"),
            Arg::new("validities")
                .long("validities")
                .value_name("COUNT")
                .help("Number of hourly validities")
                .default_value("1"),
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write results to an ASCII file instead of stdout"),
        ]
    }

    /// Build configuration from parsed subcommand arguments
    pub fn from_matches(matches: &ArgMatches, log_level: &str) -> Result<Self, String> {
        let grid = SyntheticGrid {
            lon0: parse_arg(matches, "lon0")?,
            lat0: parse_arg(matches, "lat0")?,
            resolution: parse_arg(matches, "resolution")?,
            nx: parse_arg(matches, "nx")?,
            ny: parse_arg(matches, "ny")?,
            levels: Self::parse_levels(
                matches.get_one::<String>("levels").map(String::as_str).unwrap_or("850"),
            )?,
            basis: Self::parse_datetime(
                matches
                    .get_one::<String>("basis")
                    .map(String::as_str)
                    .unwrap_or("2024-01-01 00:00:00"),
            )?,
            validities: parse_arg(matches, "validities")?,
        };
        let config = Self {
            constants: Constants::default(),
            grid,
            output: matches.get_one::<String>("output").map(PathBuf::from),
            log_level: log_level.to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    fn parse_levels(levels: &str) -> Result<Vec<f64>, String> {
        levels
            .split(',')
            .map(|l| {
                l.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid level: {}", l))
            })
            .collect()
    }

    /// Parse datetime string in format "YYYY-MM-DD HH:MM:SS"
    fn parse_datetime(datetime_str: &str) -> Result<DateTime<Utc>, String> {
        NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| {
                format!(
                    "Invalid datetime format: {}. Expected: YYYY-MM-DD HH:MM:SS",
                    datetime_str
                )
            })
            .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        let grid = &self.grid;
        if grid.resolution <= 0.0 {
            return Err("Resolution must be positive".to_string());
        }
        if grid.nx == 0 || grid.ny == 0 {
            return Err("Grid dimensions must be positive".to_string());
        }
        if grid.lat0 < -90.0 || grid.lat0 + (grid.ny - 1) as f64 * grid.resolution > 90.0 {
            return Err("Grid latitudes must be between -90 and 90 degrees".to_string());
        }
        if grid.levels.is_empty() {
            return Err("At least one level is required".to_string());
        }
        let mut sorted = grid.levels.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted.dedup();
        if sorted.len() != grid.levels.len() {
            return Err("Levels must be unique".to_string());
        }
        if grid.validities == 0 {
            return Err("At least one validity is required".to_string());
        }
        Ok(())
    }
}

fn parse_arg<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<T, String> {
    let raw = matches
        .get_one::<String>(name)
        .ok_or_else(|| format!("Missing argument: {}", name))?;
    raw.parse::<T>()
        .map_err(|_| format!("Invalid value for {}: {}", name, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::CommonField;

    #[test]
    fn test_default_constants() {
        let constants = Constants::default();
        assert!(constants.epsilon > 0.0 && constants.epsilon < 1e-14);
        assert_eq!(constants.earth_radius, 6371229.0);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_duplicate_levels() {
        let mut config = Config::default();
        config.grid.levels = vec![850.0, 500.0, 850.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_grid_beyond_pole() {
        let mut config = Config::default();
        config.grid.lat0 = 80.0;
        config.grid.ny = 41;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_synthetic_field_shape() {
        let mut grid = SyntheticGrid::default();
        grid.levels = vec![850.0, 500.0];
        grid.validities = 3;
        let field = grid.field().unwrap();
        assert_eq!(field.structure(), Structure::D3);
        assert_eq!(field.getdata(None, true).unwrap().shape(), &[3, 2, 41, 61]);
        let expected = SyntheticGrid::analytic_value(-10.0, 35.0, 500.0, 2.0);
        let value = field.getdata(None, true).unwrap()[[2, 1, 0, 0]];
        assert!((value - expected).abs() < 1e-9);
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!(Config::parse_levels("850, 500,250").unwrap(), vec![850.0, 500.0, 250.0]);
        assert!(Config::parse_levels("850,abc").is_err());
    }
}
