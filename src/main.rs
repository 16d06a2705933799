// src/main.rs - Command-line entry point for batch processing a dataset

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use shoe_contour_rust_lib::calibration::PixelProjection;
use shoe_contour_rust_lib::image_io::load_masks;
use shoe_contour_rust_lib::output::{load_raw_locations, read_reference_table, write_json, write_reference_table};
use shoe_contour_rust_lib::{process_dataset, ActiveContourSolver, Config, DatasetChoice};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Shoe contact boundary refinement and reference point classification")]
struct Args {
    /// Contacts text file or directory of PNG masks
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file (defaults are used when it does not exist)
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Raw reference point locations (overwrites config)
    #[clap(short, long)]
    locations: Option<String>,

    /// Resume from a previously written reference table instead of raw locations
    #[clap(long)]
    table: Option<String>,

    /// Dataset preset (overwrites grid, ellipse and calibration settings)
    #[clap(long)]
    dataset: Option<DatasetArg>,

    /// Process shoes one after another
    #[clap(long)]
    sequential: bool,

    /// Save intermediate masks for every shoe
    #[clap(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DatasetArg {
    Old,
    New,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = if PathBuf::from(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("No configuration at {}, using defaults", args.config);
        Config::default()
    };

    if let Some(dataset) = args.dataset {
        config.apply_dataset_preset(match dataset {
            DatasetArg::Old => DatasetChoice::Old,
            DatasetArg::New => DatasetChoice::New,
        });
    }
    if let Some(input) = args.input {
        config.input_path = input;
    }
    if let Some(output) = args.output {
        config.output_base_dir = output;
    }
    if let Some(locations) = args.locations {
        config.locations_path = Some(locations);
    }
    if args.sequential {
        config.use_parallel = false;
    }

    config.validate()?;

    let output_base = PathBuf::from(&config.output_base_dir);
    fs::create_dir_all(&output_base)
        .with_context(|| format!("creating output directory {}", output_base.display()))?;
    config
        .save_to_file(output_base.join("config_used.toml"))
        .context("writing effective configuration")?;
    let debug_dir = output_base.join("debug");
    if args.debug {
        fs::create_dir_all(&debug_dir)?;
    }

    let (height, width) = config.grid_dimensions();
    let masks = load_masks(&config.input_path, height, width, &config.mirrored_shoes)
        .with_context(|| format!("loading masks from {}", config.input_path))?;
    info!("Loaded {} shoe masks ({}x{})", masks.len(), height, width);

    let mut table = if let Some(table_path) = &args.table {
        read_reference_table(table_path)
            .with_context(|| format!("reading reference table {}", table_path))?
    } else if let Some(locations_path) = &config.locations_path {
        let raw = load_raw_locations(locations_path, config.locations_format)
            .with_context(|| format!("reading locations {}", locations_path))?;
        PixelProjection::new(height, width, config.calibration.clone()).calibrate(&raw)
    } else {
        bail!("no reference points: set locations_path in the config or pass --locations/--table");
    };
    info!("{} reference points", table.len());

    let solver = ActiveContourSolver::from_config(&config);
    let summary = process_dataset(
        &masks,
        &mut table,
        &config,
        &solver,
        args.debug.then_some(debug_dir.as_path()),
    )?;

    let table_path = output_base.join("locations_new.csv");
    write_reference_table(&table, &table_path)?;
    write_json(&summary, output_base.join("summary.json"))?;

    info!(
        "Wrote {} ({} shoes processed, {} failed)",
        table_path.display(),
        summary.processed,
        summary.failed
    );

    Ok(())
}
