//! Tabsight - tabular analysis and forecasting engine
//!
//! A CLI tool that stores CSV/TSV datasets, profiles their columns,
//! aggregates them for charts, explains them with statistical insight
//! reports and extrapolates linear trends.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (invalid arguments, unknown dataset or column, unusable data)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod profiler;
mod report;
mod store;
mod table;

use anyhow::{bail, Context, Result};
use cli::{Args, Commands};
use config::{Config, OutputFormat, CONFIG_FILE};
use models::ChartRequest;
use report::Output;
use store::DatasetStore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Commands::InitConfig) {
        if let Err(e) = handle_init_config() {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    init_logging(&args);

    debug!("Tabsight v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args) {
        error!("Command failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Handle init-config: generate a default .tabsight.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        bail!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so stdout carries only the rendered result.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Execute one command and emit its rendered result.
fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let output = execute(&args.command, &config)?;

    let rendered = match config.general.output_format {
        OutputFormat::Json => report::generate_json_report(&output)?,
        OutputFormat::Markdown => report::generate_markdown_report(&output),
    };

    match args.output {
        Some(ref path) => {
            report::write_report(&rendered, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

/// Dispatch a command against the dataset store and the analysis engine.
fn execute(command: &Commands, config: &Config) -> Result<Output> {
    let open_store = || -> Result<DatasetStore> {
        let store = DatasetStore::open(&config.general.data_dir)?;
        debug!("Data directory: {}", store.root().display());
        Ok(store)
    };

    let output = match command {
        Commands::Upload { file } => Output::Uploaded(open_store()?.upload(file)?),
        Commands::Datasets => Output::Datasets(open_store()?.list()?),
        Commands::Columns { id } => Output::Columns {
            dataset: id.clone(),
            columns: open_store()?.columns(id)?,
        },
        Commands::Preview { id, rows } => Output::Preview {
            dataset: id.clone(),
            preview: open_store()?.preview(id, rows.unwrap_or(config.chart.preview_rows))?,
        },
        Commands::Delete { id } => {
            open_store()?.delete(id)?;
            Output::Deleted { id: id.clone() }
        }
        Commands::Profile { file } => {
            let table = table::load_path(file)?;
            Output::Profile {
                name: table.name().to_string(),
                profile: profiler::profile(&table),
            }
        }
        Commands::Chart {
            id,
            x,
            y,
            kind,
            agg,
            bins,
        } => {
            let table = open_store()?.load_table(id)?;
            let request = ChartRequest {
                x: x.clone(),
                y: y.clone(),
                kind: *kind,
                aggregation: agg.unwrap_or(config.chart.default_aggregation),
                bins: *bins,
            };
            let result = analysis::chart(&table, &request, &config.chart)?;
            Output::Chart {
                dataset: id.clone(),
                request,
                result,
            }
        }
        Commands::Insights { id, x, y } => {
            let table = open_store()?.load_table(id)?;
            Output::Analysis(analysis::analyze(
                &table,
                x,
                y.as_deref(),
                &config.insights,
            )?)
        }
        Commands::Forecast { id, x, y, horizon } => {
            let table = open_store()?.load_table(id)?;
            let horizon = horizon.unwrap_or(config.forecast.default_horizon);
            Output::Forecast {
                dataset: id.clone(),
                result: analysis::forecast(&table, x, y, horizon, &config.forecast)?,
            }
        }
        Commands::InitConfig => bail!("init-config does not produce a report"),
    };

    Ok(output)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        debug!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            debug!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
