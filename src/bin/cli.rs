//! Insight CLI
//!
//! Command-line interface for Insight operations:
//! - Run a query file against local dataset files
//! - List loadable datasets
//! - Generate a config file

use clap::{Parser, Subcommand};
use insight::config::{generate_default_config, Config};
use insight::dataset::DatasetStore;
use insight::query::{QueryExecutor, ResultRow};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "insight-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run Insight queries against local dataset files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory of dataset files (default: [datasets] dir from config)
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    /// Output format (table, json, csv)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a query document
    Query {
        /// Path to the JSON query file
        file: PathBuf,
    },

    /// List datasets in the data directory
    Datasets,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load_default();

    insight::logging::init(&config.logging)?;

    match cli.command {
        Commands::Query { file } => {
            let store = load_store(cli.data.as_ref(), &config)?;
            let query = std::fs::read_to_string(&file)?;

            let executor = QueryExecutor::new(config.query.max_result_rows);
            let output = match executor.execute_str(&query, &store) {
                Ok(output) => output,
                Err(e) => {
                    eprintln!("Query failed: {}", e);
                    std::process::exit(1);
                }
            };

            match cli.format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&output.rows)?);
                }
                "csv" => {
                    print_csv(&output.rows)?;
                }
                _ => {
                    print_table(&output.rows);
                    println!();
                    println!(
                        "{} rows ({} of {} records matched) in {} ms",
                        output.len(),
                        output.records_matched,
                        output.records_scanned,
                        output.execution_time_ms
                    );
                }
            }
        }

        Commands::Datasets => {
            let store = load_store(cli.data.as_ref(), &config)?;
            let datasets = store.list();

            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&datasets)?),
                _ if datasets.is_empty() => println!("No datasets found."),
                _ => {
                    println!("{:<20} {:<10} {}", "ID", "Kind", "Rows");
                    println!("{}", "-".repeat(40));
                    for info in datasets {
                        println!("{:<20} {:<10} {}", info.id, info.kind, info.num_rows);
                    }
                }
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn load_store(
    data: Option<&PathBuf>,
    config: &Config,
) -> Result<DatasetStore, Box<dyn std::error::Error>> {
    let dir = match (data, &config.datasets.dir) {
        (Some(dir), _) => dir.clone(),
        (None, Some(dir)) => PathBuf::from(dir),
        (None, None) => {
            eprintln!("No data directory. Pass --data <dir> or set [datasets] dir.");
            std::process::exit(1);
        }
    };

    let mut store = DatasetStore::new();
    store.load_dir(&dir)?;
    Ok(store)
}

fn print_table(rows: &[ResultRow]) {
    let first = match rows.first() {
        Some(row) => row,
        None => {
            println!("No rows");
            return;
        }
    };

    let columns: Vec<&str> = first.columns().collect();
    let widths: Vec<usize> = columns
        .iter()
        .map(|column| {
            rows.iter()
                .filter_map(|row| row.get(column))
                .map(|cell| cell.to_string().len())
                .chain(std::iter::once(column.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    // Header
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{:<width$}", column, width = width))
        .collect();
    println!("{}", header.join(" | "));

    // Separator
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1)));

    // Data rows
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| {
                let value = row.get(column).map(|c| c.to_string()).unwrap_or_default();
                format!("{:<width$}", value, width = width)
            })
            .collect();
        println!("{}", cells.join(" | "));
    }
}

fn print_csv(rows: &[ResultRow]) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());

    if let Some(first) = rows.first() {
        writer.write_record(first.columns())?;
    }

    for row in rows {
        writer.write_record(row.iter().map(|(_, cell)| cell.to_string()))?;
    }

    writer.flush()?;
    Ok(())
}
