/*!
safedrive Command Line Interface

Lists the chartable columns, shows the query a column pair would run, and
renders a pair to Vega-Lite JSON.
*/

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use safedrive::reader::{dataset, DuckDBReader};
use safedrive::writer::{VegaLiteWriter, Writer};
use safedrive::{dispatch, ChartResult, ColumnRegistry, Visualizer, VERSION};

#[derive(Parser)]
#[command(name = "safedrive")]
#[command(about = "Automatic two-variable charts for traffic-accident data")]
#[command(version = VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data source connection string
    #[arg(long, global = true, default_value = "duckdb://memory")]
    reader: String,

    /// Column registry JSON (default: built-in accident columns)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Load the sample accident data set before running
    #[arg(long, global = true, default_value = "false")]
    load_sample_data: bool,

    /// Load <TABLE>.csv file(s) before running
    /// Example: --load-data REGION.csv --load-data ACCIDENT.csv
    #[arg(long = "load-data", global = true)]
    load_data_files: Vec<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List chartable columns with their kinds
    Columns {
        /// Also check every column exists in the data source
        #[arg(long)]
        check: bool,
    },

    /// Show the chart type and SQL for a column pair without running it
    Plan {
        /// First column, e.g. REGION.RegionName
        ref1: String,
        /// Second column, e.g. ACCIDENT.DeathCount
        ref2: String,
    },

    /// Render a column pair to Vega-Lite JSON
    Visualize {
        ref1: String,
        ref2: String,

        /// Output file path (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safedrive=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let registry = match &cli.registry {
        Some(path) => ColumnRegistry::from_path(path)
            .with_context(|| format!("Failed to load registry {}", path.display()))?,
        None => ColumnRegistry::builtin()?,
    };

    match cli.command {
        Commands::Columns { check } => {
            if check {
                let reader = open_reader(&cli.reader, cli.load_sample_data, &cli.load_data_files)?;
                dataset::verify_registry(&reader, &registry)?;
                eprintln!("All {} columns found in {}", registry.all_columns().len(), cli.reader);
            }
            cmd_columns(&registry);
        }

        Commands::Plan { ref1, ref2 } => {
            let (kind, plan) = dispatch::plan(&registry, &ref1, &ref2)?;

            println!("Chart: {}", kind);
            let joins: Vec<&str> = plan.joins.iter().map(|t| t.as_str()).collect();
            if !joins.is_empty() {
                println!("Joins: {}", joins.join(", "));
            }
            println!("SQL:   {}", plan.to_sql()?);
        }

        Commands::Visualize { ref1, ref2, output } => {
            let reader = open_reader(&cli.reader, cli.load_sample_data, &cli.load_data_files)?;
            let visualizer = Visualizer::new(&registry, &reader);

            match visualizer.dispatch(&ref1, &ref2) {
                ChartResult::Rendered { chart, title } => {
                    eprintln!("{} ({}, {} rows)", title, chart.kind, chart.data.height());
                    let json = VegaLiteWriter::new().write(&chart)?;
                    match output {
                        Some(path) => {
                            std::fs::write(&path, json)
                                .with_context(|| format!("Failed to write {}", path.display()))?;
                            eprintln!("Wrote {}", path.display());
                        }
                        None => println!("{}", json),
                    }
                }
                ChartResult::Failed { message } => bail!(message),
            }
        }
    }

    Ok(())
}

fn open_reader(uri: &str, load_sample: bool, files: &[PathBuf]) -> anyhow::Result<DuckDBReader> {
    dataset::open_store(uri, load_sample, files)
        .with_context(|| format!("Failed to open data source {}", uri))
}

fn cmd_columns(registry: &ColumnRegistry) {
    for column in registry.all_columns() {
        let kind = registry.kind_of(&column);
        if registry.is_virtual(&column) {
            println!("{:<32} {} (count)", column.to_string(), kind);
        } else {
            println!("{:<32} {}", column.to_string(), kind);
        }
    }
}
