use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{ArgGroup, Parser};

use delivery_dash::{AppError, DashboardSession, EngineConfig};

/// Filterable KPI dashboard over food-delivery orders. Prints the payload as JSON.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["csv", "sqlite"])))]
struct Cli {
    /// Orders CSV file.
    #[arg(long)]
    csv: Option<String>,

    /// Orders SQLite database, opened read-only.
    #[arg(long)]
    sqlite: Option<String>,

    /// Table to read from the SQLite database.
    #[arg(long, default_value = "orders")]
    table: String,

    /// JSON engine config. For SQLite sources it overrides the `dashboard_config` table.
    #[arg(long)]
    config: Option<String>,

    /// Keep only rows whose column takes one of the values (e.g. "City=Delhi,Mumbai").
    /// Repeatable.
    #[arg(long = "filter", value_name = "COLUMN=V1,V2")]
    filters: Vec<String>,

    /// First order date to include (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last order date to include (format: YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Indent the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config = cli
        .config
        .as_deref()
        .map(EngineConfig::from_json_file)
        .transpose()?;

    let session = match (&cli.csv, &cli.sqlite) {
        (Some(path), _) => DashboardSession::from_csv(path, config.unwrap_or_default())?,
        (None, Some(path)) => DashboardSession::from_sqlite(path, &cli.table, config)?,
        (None, None) => {
            return Err(AppError::Configuration(
                "one of --csv or --sqlite is required".to_string(),
            ))
        }
    };

    for warning in session.warnings() {
        log::warn!("line {}: {}", warning.line, warning.message);
    }

    let filter = session.parse_filter(&cli.filters[..], cli.from, cli.to)?;
    let payload = session.dashboard(&filter);

    let json = if cli.pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        serde_json::to_string(&payload)?
    };
    println!("{}", json);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
