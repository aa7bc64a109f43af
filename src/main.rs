use clap::{value_parser, Arg, ArgMatches, Command};
use env_logger::{Builder, Target};
use log::{info, LevelFilter};
use meteofield::{
    config::Config,
    data_io::{AsciiFieldWriter, FieldWriter, OutputMetadata, WhatOptions},
    field::{
        CommonField, D3Field, Interpolation, LlQuery, LonLatBox, ResampleOptions, Weighting,
    },
};
use std::io::{self, Write};
use std::time::Instant;

fn main() {
    let matches = build_cli().get_matches();
    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    init_logging(log_level);

    match matches.subcommand() {
        Some(("stats", sub_matches)) => {
            if let Err(e) = run_stats(sub_matches, log_level) {
                eprintln!("Statistics error: {}", e);
                std::process::exit(1);
            }
        }
        Some(("point", sub_matches)) => {
            if let Err(e) = run_point(sub_matches, log_level) {
                eprintln!("Point lookup error: {}", e);
                std::process::exit(1);
            }
        }
        Some(("zoom", sub_matches)) => {
            if let Err(e) = run_zoom(sub_matches, log_level) {
                eprintln!("Zoom error: {}", e);
                std::process::exit(1);
            }
        }
        Some(("resample", sub_matches)) => {
            if let Err(e) = run_resample(sub_matches, log_level) {
                eprintln!("Resampling error: {}", e);
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Please specify a subcommand. Use --help for more information.");
            std::process::exit(1);
        }
    }
}

fn init_logging(level: &str) {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);
    Builder::new()
        .filter_level(filter)
        .target(Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:5} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn synthetic_field(matches: &ArgMatches, log_level: &str) -> Result<(Config, D3Field), String> {
    let config = Config::from_matches(matches, log_level)?;
    let start = Instant::now();
    let field = config.grid.field().map_err(|e| e.to_string())?;
    info!(
        "Synthetic field built on a {}x{} grid with {} level(s) in {:.3}s",
        config.grid.nx,
        config.grid.ny,
        config.grid.levels.len(),
        start.elapsed().as_secs_f64()
    );
    Ok((config, field))
}

/// Write `field` as ASCII rows, to the configured file or to stdout.
fn output_field(config: &Config, field: &dyn CommonField, command: &str) -> Result<(), String> {
    let mut metadata = OutputMetadata {
        source: "synthetic analytic field".to_string(),
        ..OutputMetadata::default()
    };
    metadata
        .global_attributes
        .insert("command".to_string(), command.to_string());
    match &config.output {
        Some(path) => {
            let mut writer = AsciiFieldWriter::new(path);
            writer.set_metadata(&metadata).map_err(|e| e.to_string())?;
            writer.write_field(field).map_err(|e| e.to_string())?;
            writer.close().map_err(|e| e.to_string())
        }
        None => {
            let mut writer = AsciiFieldWriter::new(std::path::Path::new("-"));
            writer.set_metadata(&metadata).map_err(|e| e.to_string())?;
            writer.write_field(field).map_err(|e| e.to_string())?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            writer.write_to(&mut out).map_err(|e| e.to_string())
        }
    }
}

fn parse_box(matches: &ArgMatches) -> LonLatBox {
    let get = |name: &str| matches.get_one::<f64>(name).copied().unwrap_or(0.0);
    LonLatBox::new(get("lonmin"), get("lonmax"), get("latmin"), get("latmax"))
}

fn run_stats(matches: &ArgMatches, log_level: &str) -> Result<(), String> {
    let (_, field) = synthetic_field(matches, log_level)?;
    let options = WhatOptions {
        stats: true,
        ..WhatOptions::default()
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    field.what(&mut out, &options).map_err(|e| e.to_string())?;
    if field.geometry().nlevels() > 1 {
        writeln!(out, "Per level:").map_err(|e| e.to_string())?;
        for level in field.geometry().vcoordinate.scalar_levels().unwrap_or_default() {
            let slice = field
                .getlevel(meteofield::field::LevelSelector::Level(level))
                .map_err(|e| e.to_string())?;
            let stats = slice.stats(None).map_err(|e| e.to_string())?;
            writeln!(out, "  {:>8} {}", level, stats).map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

fn run_point(matches: &ArgMatches, log_level: &str) -> Result<(), String> {
    let (_, field) = synthetic_field(matches, log_level)?;
    let lon = *matches.get_one::<f64>("lon").ok_or("Missing argument: lon")?;
    let lat = *matches.get_one::<f64>("lat").ok_or("Missing argument: lat")?;
    let interpolation: Interpolation = matches
        .get_one::<String>("interpolation")
        .map(String::as_str)
        .unwrap_or("nearest")
        .parse()
        .map_err(|e: meteofield::FieldError| e.to_string())?;

    let levels = field.geometry().vcoordinate.scalar_levels().unwrap_or_default();
    println!("# validity level value");
    for validity in field.validity().iter() {
        for &level in &levels {
            let query = LlQuery::point(lon, lat)
                .level(level)
                .validity(validity.clone())
                .interpolation(interpolation)
                .neighborinfo(true);
            let result = field.getvalue_ll(&query).map_err(|e| e.to_string())?;
            let value = result.values.as_scalar().unwrap_or(f64::NAN);
            println!("{} {} {:.6}", validity, level, value);
            if let Some(neighbours) = result.neighbours {
                info!("nearest gridpoint(s): {:?}", neighbours);
            }
        }
    }
    Ok(())
}

fn run_zoom(matches: &ArgMatches, log_level: &str) -> Result<(), String> {
    let (config, field) = synthetic_field(matches, log_level)?;
    let zoom = parse_box(matches);
    let extra_10th = matches.get_flag("extra-10th");
    let zoomed = field.extract_zoom(&zoom, extra_10th).map_err(|e| e.to_string())?;
    info!(
        "Zoom {:?}: {}x{} gridpoints",
        zoom,
        zoomed.geometry().dimensions().x,
        zoomed.geometry().dimensions().y
    );
    output_field(&config, &zoomed, "zoom")
}

fn run_resample(matches: &ArgMatches, log_level: &str) -> Result<(), String> {
    let (config, field) = synthetic_field(matches, log_level)?;
    let borders = parse_box(matches);
    let target_resolution = *matches
        .get_one::<f64>("target-resolution")
        .ok_or("Missing argument: target-resolution")?;
    let weighting = match matches
        .get_one::<String>("weighting")
        .map(String::as_str)
        .unwrap_or("nearest")
    {
        "nearest" => Weighting::Nearest,
        "gauss" => Weighting::Gauss { sigma: None },
        other => return Err(format!("Unknown weighting: {}", other)),
    };
    let options = ResampleOptions::default().weighting(weighting);
    let resampled = field
        .resample_on_regularll(&borders, target_resolution, &options)
        .map_err(|e| e.to_string())?;
    output_field(&config, &resampled.field, "resample")
}

fn box_args() -> Vec<Arg> {
    ["lonmin", "lonmax", "latmin", "latmax"]
        .into_iter()
        .map(|name| {
            Arg::new(name)
                .long(name)
                .value_name("DEGREES")
                .allow_negative_numbers(true)
                .required(true)
                .value_parser(value_parser!(f64))
        })
        .collect()
}

fn build_cli() -> Command {
    Command::new("meteofield")
        .version("0.1.0")
        .about("Meteorological fields: lookups, zooms and resampling on a synthetic analytic field")
        .subcommand_required(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level: error, warn, info, debug or trace")
                .global(true)
                .default_value("info"),
        )
        .subcommand(
            Command::new("stats")
                .about("Describe the field and print its statistics")
                .args(Config::grid_args()),
        )
        .subcommand(
            Command::new("point")
                .about("Field values at a lon/lat point")
                .args(Config::grid_args())
                .arg(
                    Arg::new("lon")
                        .long("lon")
                        .value_name("DEGREES")
                        .allow_negative_numbers(true)
                        .required(true)
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("lat")
                        .long("lat")
                        .value_name("DEGREES")
                        .allow_negative_numbers(true)
                        .required(true)
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("interpolation")
                        .long("interpolation")
                        .value_name("KIND")
                        .help("nearest, linear or cubic")
                        .default_value("nearest"),
                ),
        )
        .subcommand(
            Command::new("zoom")
                .about("Gridpoints inside a lon/lat box")
                .args(Config::grid_args())
                .args(box_args())
                .arg(
                    Arg::new("extra-10th")
                        .long("extra-10th")
                        .help("Enlarge the box by a tenth of its size")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("resample")
                .about("Resample the field on a regular lon/lat grid")
                .args(Config::grid_args())
                .args(box_args())
                .arg(
                    Arg::new("target-resolution")
                        .long("target-resolution")
                        .value_name("DEGREES")
                        .required(true)
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("weighting")
                        .long("weighting")
                        .value_name("KIND")
                        .help("nearest or gauss")
                        .default_value("nearest"),
                ),
        )
}
