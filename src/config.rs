use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::query::model::TimeFormat;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub pool_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

/// Defaults applied to query targets that leave these fields unset.
#[derive(Debug, Deserialize, Clone)]
pub struct DatasourceConfig {
    pub schema: Option<String>,
    pub time_column: String,
    pub group_interval: Option<String>,
    /// `epoch_ms` or `timestamp`; inferred per target when unset.
    pub time_format: Option<TimeFormat>,
    /// Row cap for value suggestions.
    pub values_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub datasource: DatasourceConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// DuckDB database file, or `:memory:`
    #[arg(long)]
    pub database: Option<String>,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        // Start with default configuration
        let mut config_builder = Config::builder()
            .set_default("database.connection_string", defaults.database.connection_string)?
            .set_default("database.pool_size", defaults.database.pool_size as i64)?
            .set_default("web.host", defaults.web.host)?
            .set_default("web.port", i64::from(defaults.web.port))?
            .set_default("datasource.time_column", defaults.datasource.time_column)?
            .set_default("datasource.values_limit", defaults.datasource.values_limit as i64)?;

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/crate-datasource/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // CRATE_DS__WEB__PORT=8080 and friends
        config_builder = config_builder.add_source(
            Environment::with_prefix("CRATE_DS")
                .prefix_separator("__")
                .separator("__"),
        );

        // Build the config
        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(database) = &args.database {
            config.database.connection_string = database.clone();
        }

        Ok(config)
    }
}

// Default implementation
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                connection_string: "crate-datasource.duckdb".to_string(),
                pool_size: 5,
            },
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            datasource: DatasourceConfig::default(),
        }
    }
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            schema: None,
            time_column: "time".to_string(),
            group_interval: None,
            time_format: None,
            values_limit: 10,
        }
    }
}
