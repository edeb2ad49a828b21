use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};

use hydrobench::config::Config;
use hydrobench::discover;
use hydrobench::display;
use hydrobench::driver::{self, DEFAULT_CALIBRATION_FILES, Driver};
use hydrobench::types::OutputFormat;

#[derive(Parser)]
#[command(name = "hydrobench", version, about = "Benchmark hydrological model executables")]
struct Cli {
    /// Config file (defaults to <config dir>/hydrobench/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Time the simulation executable once per event of every model
    Tetis,
    /// Time the topology and hydraulic-parameter executables once per model
    Topology,
    /// Copy calibration files into every model directory
    CopyCalib {
        /// Directory holding the calibration files
        #[arg(long)]
        from: PathBuf,

        /// Files to copy (default: Calib.txt FactorETmes.txt)
        files: Vec<String>,
    },
    /// Show the models and events a run would visit
    List {
        #[arg(long, default_value = "default")]
        format: OutputFormat,

        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}",
                Local::now().format("%d-%m-%Y %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;

    match cli.command {
        Commands::Tetis => {
            let mut driver = Driver::from_config(config)?;
            let summary = driver.run_tetis()?;
            println!("{}", display::format_summary(&summary));
            print!("{}", display::format_banner(summary.elapsed));
        }
        Commands::Topology => {
            let mut driver = Driver::from_config(config)?;
            let summary = driver.run_topology()?;
            println!("{}", display::format_summary(&summary));
            print!("{}", display::format_banner(summary.elapsed));
        }
        Commands::CopyCalib { from, files } => {
            let files = if files.is_empty() {
                DEFAULT_CALIBRATION_FILES.iter().map(|f| f.to_string()).collect()
            } else {
                files
            };
            let models = discover::discover_models(
                &config.models_dir,
                std::slice::from_ref(&config.output_dir),
            )?;
            let copied = driver::copy_calibration(&from, &models, &files)?;
            println!("Copied {} files into {} models", copied, models.len());
        }
        Commands::List { format, json } => {
            let models = driver::list_models(&config)?;
            let output = if json {
                display::format_json(&models)
            } else {
                match format {
                    OutputFormat::Short => display::format_short(&models),
                    OutputFormat::Default => display::format_default(&models, &config.models_dir),
                }
            };
            print!("{}", output);
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}
