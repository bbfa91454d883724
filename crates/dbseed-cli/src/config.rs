use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;

use dbseed_generate::SeedOptions;
use dbseed_generate::model::{
    DEFAULT_ROWS, DEFAULT_SKIP_COLUMNS, DEFAULT_SKIP_TABLES, DEFAULT_TEXT_CEILING,
};
use dbseed_generate::reference::DEFAULT_SAMPLE_CAP;

use crate::CliError;

/// Loaded when `--config` is not given and the file exists in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "dbseed.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rows: usize,
    pub seed: Option<u64>,
    pub schema: String,
    pub overrides: Option<PathBuf>,
    pub reference_sample: usize,
    pub text_ceiling: usize,
    pub skip_tables: Vec<String>,
    pub skip_columns: Vec<String>,
    pub connection: Option<ConnectionSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            seed: None,
            schema: "public".to_string(),
            overrides: None,
            reference_sample: DEFAULT_SAMPLE_CAP,
            text_ceiling: DEFAULT_TEXT_CEILING,
            skip_tables: DEFAULT_SKIP_TABLES.iter().map(|s| s.to_string()).collect(),
            skip_columns: DEFAULT_SKIP_COLUMNS.iter().map(|s| s.to_string()).collect(),
            connection: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// No password; the server authenticates the OS user or trusts the host.
    #[default]
    Trusted,
    Credentials,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub url: Option<String>,
    pub driver: Option<String>,
    pub server: Option<String>,
    pub database: Option<String>,
    pub auth: AuthMode,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Connect options plus a string form that is only ever logged redacted.
#[derive(Debug, Clone)]
pub struct ResolvedConnection {
    pub options: PgConnectOptions,
    pub display: String,
}

impl Settings {
    /// Read `path`, or `dbseed.toml` if present, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    pub fn seed_options(&self) -> SeedOptions {
        SeedOptions {
            rows: self.rows,
            seed: self.seed,
            skip_tables: self.skip_tables.clone(),
            skip_columns: self.skip_columns.clone(),
            reference_sample: self.reference_sample,
            text_ceiling: self.text_ceiling,
            now: None,
        }
    }

    /// `--conn` wins, then the `[connection]` table, then `DATABASE_URL`.
    pub fn resolve_connection(&self, flag: Option<&str>) -> Result<ResolvedConnection, CliError> {
        if let Some(url) = flag {
            return from_url(url);
        }
        if let Some(connection) = &self.connection {
            return connection.resolve();
        }
        match std::env::var("DATABASE_URL") {
            Ok(url) => from_url(&url),
            Err(_) => Err(CliError::InvalidConfig(
                "no connection: pass --conn, add [connection] to the config, or set DATABASE_URL"
                    .to_string(),
            )),
        }
    }
}

impl ConnectionSettings {
    pub fn resolve(&self) -> Result<ResolvedConnection, CliError> {
        if let Some(url) = &self.url {
            return from_url(url);
        }

        let driver = self.driver.as_deref().unwrap_or("postgres");
        if !matches!(driver, "postgres" | "postgresql") {
            return Err(CliError::UnsupportedEngine(driver.to_string()));
        }
        let server = self
            .server
            .as_deref()
            .ok_or_else(|| missing("connection.server"))?;
        let database = self
            .database
            .as_deref()
            .ok_or_else(|| missing("connection.database"))?;

        let (host, port) = split_server(server)?;
        let mut options = PgConnectOptions::new().host(host).database(database);
        let mut display = format!("host={host} dbname={database}");
        if let Some(port) = port {
            options = options.port(port);
            display.push_str(&format!(" port={port}"));
        }
        if let Some(user) = &self.user {
            options = options.username(user);
            display.push_str(&format!(" user={user}"));
        }

        if self.auth == AuthMode::Credentials {
            let user = self.user.as_deref().ok_or_else(|| missing("connection.user"))?;
            let password = self
                .password
                .as_deref()
                .ok_or_else(|| missing("connection.password"))?;
            options = options.username(user).password(password);
            display.push_str(" password=***");
        }

        Ok(ResolvedConnection { options, display })
    }
}

fn from_url(url: &str) -> Result<ResolvedConnection, CliError> {
    if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
        let scheme = url.split("://").next().unwrap_or(url);
        return Err(CliError::UnsupportedEngine(scheme.to_string()));
    }
    let options = PgConnectOptions::from_str(url)?;
    Ok(ResolvedConnection {
        options,
        display: url.to_string(),
    })
}

fn split_server(server: &str) -> Result<(&str, Option<u16>), CliError> {
    match server.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().map_err(|_| {
                CliError::InvalidConfig(format!("invalid port in connection.server '{server}'"))
            })?;
            Ok((host, Some(port)))
        }
        None => Ok((server, None)),
    }
}

fn missing(field: &str) -> CliError {
    CliError::InvalidConfig(format!("{field} is required"))
}
