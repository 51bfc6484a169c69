//! startup-valuation CLI - run the valuation pipeline over CSV inputs
//!
//! ## Example Usage
//!
//! ```bash
//! # Complete analysis, exporting the report and sensitivity table
//! startup-valuation full --output report.json --sensitivity-csv sensitivity.csv
//!
//! # Only the DCF, with inputs from another directory
//! startup-valuation --data-dir ./inputs dcf
//!
//! # Projections over a shorter horizon
//! startup-valuation project --horizon 3
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use startup_valuation::config::ModelConfig;
use startup_valuation::model::{ValuationInputs, ValuationModel};
use startup_valuation::report::{millions, ProjectionTable};
use std::path::PathBuf;
use std::process;

/// startup-valuation: DCF and comparable-multiples startup valuation
#[derive(Parser)]
#[command(name = "startup-valuation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Startup valuation using DCF and market multiples", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the input CSV tables (overrides the config)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Historical growth and margin analysis
    Historical,

    /// Financial projections
    Project {
        /// Forecast years (default: from config)
        #[arg(short = 'n', long)]
        horizon: Option<usize>,
    },

    /// DCF valuation with sensitivity analysis
    Dcf {
        /// Write the sensitivity table to this CSV file
        #[arg(long)]
        sensitivity_csv: Option<PathBuf>,
    },

    /// Comparable-company multiples valuation
    Multiples,

    /// Complete analysis
    Full {
        /// Write the full report as JSON
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Write the sensitivity table to this CSV file
        #[arg(long)]
        sensitivity_csv: Option<PathBuf>,
    },

    /// Headline numbers only
    Summary,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ModelConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data.dir = dir;
    }

    if cli.verbose {
        println!(
            "{} v{}",
            "startup-valuation".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
        println!(
            "Data dir: {}",
            config.data.dir.display().to_string().dimmed()
        );
        println!();
    }

    let inputs = ValuationInputs::load(&config.data)?;
    let model = ValuationModel::new(inputs, config)?;
    println!("{}", "Data loaded successfully".green());
    println!();

    match cli.command {
        Commands::Historical => {
            println!("{}", model.analyze_historical()?);
        }

        Commands::Project { horizon } => {
            let horizon = horizon.unwrap_or(model.config().horizon);
            let projections = model.project(horizon)?;
            println!("{}", ProjectionTable(&projections));
        }

        Commands::Dcf { sensitivity_csv } => {
            let projections = model.project(model.config().horizon)?;
            let dcf = model.run_dcf(&projections)?;
            let grid = model.sensitivity(&projections)?;
            println!("{}", dcf);
            println!("{}", grid);

            if let Some(path) = sensitivity_csv {
                grid.write_csv(&path)?;
                println!("Sensitivity table saved: {}", path.display());
            }
        }

        Commands::Multiples => {
            let projections = model.project(model.config().horizon)?;
            println!("{}", model.run_multiples(&projections)?);
        }

        Commands::Full {
            output,
            sensitivity_csv,
        } => {
            let report = model.run()?;
            println!("{}", report);

            println!();
            println!("{}", "ANALYSIS COMPLETE".green().bold());
            if let Some(path) = output {
                report.write_json(&path)?;
                println!("Report saved: {}", path.display());
            }
            if let Some(path) = sensitivity_csv {
                report.sensitivity.write_csv(&path)?;
                println!("Sensitivity table saved: {}", path.display());
            }

            println!();
            println!("{}", "INVESTMENT RECOMMENDATION".cyan().bold());
            println!(
                "Target Valuation: {}",
                millions(report.summary.weighted_valuation).bold()
            );
            println!(
                "Valuation Range: {} - {}",
                millions(report.summary.valuation_range.0),
                millions(report.summary.valuation_range.1)
            );
        }

        Commands::Summary => {
            model.analyze_historical()?;
            let projections = model.project(model.config().horizon)?;
            let dcf = model.run_dcf(&projections)?;
            let multiples = model.run_multiples(&projections)?;
            let summary = model.summarize(&dcf, &multiples)?;

            println!("{}", "QUICK SUMMARY RESULTS".cyan().bold());
            println!("Final Valuation: {}", millions(summary.weighted_valuation).bold());
            println!("DCF Value:       {}", millions(summary.dcf_valuation));
            println!("Multiples Value: {}", millions(summary.multiples_median));
        }
    }

    Ok(())
}
