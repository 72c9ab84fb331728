//! scopeq - run one SQL statement under a tenant/user scope.

use scopeq::cli::{Cli, OutputFormat};
use scopeq::config::{Config, ConnectionConfig};
use scopeq::db::{self, MockScopedClient, ScopedClient};
use scopeq::error::{Result, ScopeqError};
use scopeq::{logging, output};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    let format = cli.parse_output_format().map_err(ScopeqError::config)?;
    let sql = cli
        .sql
        .clone()
        .ok_or_else(|| ScopeqError::config("No SQL statement given. Pass it as the first argument."))?;
    let scope = cli.scope();

    // Load configuration file
    let config_path = cli.config_path();
    let config = Config::load_from_file(&config_path)?;

    let client: Box<dyn ScopedClient> = if cli.mock_db {
        Box::new(MockScopedClient::new())
    } else {
        let connection = resolve_connection(&cli, &config)?.ok_or_else(|| {
            ScopeqError::config(
                "No database connection configured. Pass --url, connection flags, \
                 or add a [connections.default] entry to the config file.",
            )
        })?;
        info!("Connection: {}", connection.display_string());
        db::connect(&connection, config.scope.clone(), &config.pool).await?
    };

    let result = client.execute(&scope, &sql).await;
    if let Err(e) = client.close().await {
        warn!("Failed to close cleanly: {e}");
    }
    let result = result?;

    match format {
        OutputFormat::Text => print!("{}", output::render_text(&result)),
        OutputFormat::Json => println!("{}", output::render_json(&result)?),
    }

    Ok(())
}

/// Resolves the final connection configuration with precedence:
/// 1. CLI arguments (highest)
/// 2. Named connection from config
/// 3. Default connection from config
/// 4. Environment variables (PGHOST, PGPORT, ...)
fn resolve_connection(cli: &Cli, config: &Config) -> Result<Option<ConnectionConfig>> {
    // Start with CLI connection config if provided
    let mut connection = cli.to_connection_config()?;

    // If no CLI connection, try named connection from config
    if connection.is_none() {
        if let Some(name) = cli.connection_name() {
            connection = config.get_connection(Some(name)).cloned();
            if connection.is_none() {
                return Err(ScopeqError::config(format!(
                    "Connection '{name}' not found in config file"
                )));
            }
        }
    }

    // If still no connection, try default from config
    if connection.is_none() {
        connection = config.get_connection(None).cloned();
    }

    // Apply environment variable defaults
    if let Some(ref mut conn) = connection {
        conn.apply_env_defaults();
    }

    Ok(connection)
}
