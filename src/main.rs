//! frames - executes a SQL query and prints typed, column-oriented JSON.

mod cli;

use anyhow::Context;
use cli::Cli;
use db_frames::config::{Config, ConnectionConfig};
use db_frames::error::FramesError;
use db_frames::query::{QueryDescriptor, QueryExecutor};
use db_frames::{db, logging};
use std::io::Read;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();

    let config = match Config::load_from_file(&cli.config_path()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    };

    match cli.log_file(&config.logging) {
        Some(path) => logging::init_file_logging(&path, &config.logging.level),
        None => logging::init_stderr_logging(&config.logging.level),
    }

    match run(&cli, &config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

/// Runs one query and prints the result. Returns false if the result carries an error.
async fn run(cli: &Cli, config: &Config) -> anyhow::Result<bool> {
    let connection_config = resolve_connection(cli, config)?.ok_or_else(|| {
        FramesError::config("No database connection configured. Use --help for usage information.")
    })?;
    info!("Connection: {}", connection_config.display_string());

    let query = load_descriptor(cli)?;
    let time_range = cli.time_range(query.time_range);

    let connection = db::connect(&connection_config).await?;
    let result = QueryExecutor::new(connection.as_ref())
        .execute(&query, &time_range)
        .await;
    connection.close().await?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .context("Failed to serialize query result")?;
    println!("{json}");

    if let Some(e) = &result.error {
        warn!("Query {} failed: {}: {}", query.ref_id, e.category(), e);
    }

    Ok(result.is_ok())
}

/// Reads the query descriptor from --sql, the --query file, or stdin.
fn load_descriptor(cli: &Cli) -> anyhow::Result<QueryDescriptor> {
    if let Some(sql) = &cli.sql {
        return Ok(QueryDescriptor::from_sql(sql.as_str()));
    }

    let path = cli.query.as_deref().unwrap_or("-");
    let payload = if path == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read query descriptor from stdin")?;
        buf
    } else {
        std::fs::read(path).with_context(|| format!("Failed to read query descriptor {path}"))?
    };

    Ok(QueryDescriptor::parse(&payload)?)
}

/// Resolves the final connection configuration from CLI args, config file, and environment.
fn resolve_connection(cli: &Cli, config: &Config) -> db_frames::error::Result<Option<ConnectionConfig>> {
    config.resolve_connection(cli.connection_name(), cli.to_connection_config()?)
}
