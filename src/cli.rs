//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::OutputFormat;
use crate::models::{Aggregation, ChartKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tabsight - profile, chart, explain and forecast tabular data
///
/// Upload CSV/TSV files into a local data directory, inspect their
/// columns, aggregate them for charts, generate statistical insight
/// reports and extrapolate linear trends.
///
/// Examples:
///   tabsight upload ./sales.csv
///   tabsight datasets
///   tabsight chart 20240101120000_sales.csv --x region --y revenue --agg sum
///   tabsight insights 20240101120000_sales.csv --x region --y revenue
///   tabsight forecast 20240101120000_sales.csv --x year --y revenue --horizon 5
///   tabsight init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .tabsight.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding uploaded datasets
    ///
    /// Overrides the config file setting.
    #[arg(long, value_name = "DIR", env = "TABSIGHT_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT", global = true)]
    pub format: Option<OutputFormat>,

    /// Write the result to this file instead of stdout
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Store a CSV/TSV file and record its column profile
    Upload {
        /// File to upload
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// List stored datasets, newest first
    Datasets,

    /// Show the stored column profile of a dataset
    Columns {
        /// Dataset id
        id: String,
    },

    /// Show the first rows of a dataset
    Preview {
        /// Dataset id
        id: String,

        /// Number of rows (default: from config or 200)
        #[arg(long, value_name = "COUNT")]
        rows: Option<usize>,
    },

    /// Delete a stored dataset
    Delete {
        /// Dataset id
        id: String,
    },

    /// Profile a CSV/TSV file without storing it
    Profile {
        /// File to profile
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Aggregate a dataset for a chart
    Chart {
        /// Dataset id
        id: String,

        /// Grouping (or histogram) column
        #[arg(long)]
        x: String,

        /// Value column
        #[arg(long)]
        y: Option<String>,

        /// Chart type
        #[arg(long, value_enum, default_value_t = ChartKind::Bar)]
        kind: ChartKind,

        /// Reduction applied per group (default: from config or mean)
        #[arg(long, value_enum)]
        agg: Option<Aggregation>,

        /// Histogram bin count (default: from config or 10)
        #[arg(long, value_name = "COUNT")]
        bins: Option<usize>,
    },

    /// Generate every applicable insight report for a column selection
    Insights {
        /// Dataset id
        id: String,

        /// Category, time or distribution column
        #[arg(long)]
        x: String,

        /// Value column
        #[arg(long)]
        y: Option<String>,
    },

    /// Extrapolate a linear trend of y over x
    Forecast {
        /// Dataset id
        id: String,

        /// Numeric x column
        #[arg(long)]
        x: String,

        /// Numeric y column
        #[arg(long)]
        y: String,

        /// Number of future points, 3 to 5 (default: from config or 3)
        #[arg(long, value_name = "STEPS")]
        horizon: Option<usize>,
    },

    /// Generate a default .tabsight.toml configuration file
    InitConfig,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match self.command {
            Commands::Preview { rows: Some(0), .. } => {
                Err("Preview rows must be at least 1".to_string())
            }
            Commands::Chart { bins: Some(0), .. } => {
                Err("Bin count must be at least 1".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Commands) -> Args {
        Args {
            config: None,
            verbose: false,
            quiet: false,
            data_dir: None,
            format: None,
            output: None,
            command,
        }
    }

    #[test]
    fn test_parse_chart_command() {
        let args = Args::try_parse_from([
            "tabsight", "chart", "abc.csv", "--x", "region", "--y", "revenue", "--kind", "pie",
            "--agg", "sum", "--format", "json",
        ])
        .unwrap();

        assert_eq!(args.format, Some(OutputFormat::Json));
        match args.command {
            Commands::Chart {
                id,
                x,
                y,
                kind,
                agg,
                bins,
            } => {
                assert_eq!(id, "abc.csv");
                assert_eq!(x, "region");
                assert_eq!(y.as_deref(), Some("revenue"));
                assert_eq!(kind, ChartKind::Pie);
                assert_eq!(agg, Some(Aggregation::Sum));
                assert_eq!(bins, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_chart_kind_defaults_to_bar() {
        let args = Args::try_parse_from(["tabsight", "chart", "abc.csv", "--x", "a"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Chart {
                kind: ChartKind::Bar,
                ..
            }
        ));
    }

    #[test]
    fn test_forecast_requires_y() {
        assert!(Args::try_parse_from(["tabsight", "forecast", "abc.csv", "--x", "year"]).is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Commands::Datasets);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_counts() {
        let args = make_args(Commands::Preview {
            id: "a.csv".to_string(),
            rows: Some(0),
        });
        assert!(args.validate().is_err());

        let args = make_args(Commands::Chart {
            id: "a.csv".to_string(),
            x: "v".to_string(),
            y: None,
            kind: ChartKind::Histogram,
            agg: None,
            bins: Some(0),
        });
        assert!(args.validate().is_err());

        let args = make_args(Commands::Preview {
            id: "a.csv".to_string(),
            rows: Some(5),
        });
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Commands::Datasets);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
