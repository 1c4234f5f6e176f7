use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::naming;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub target: TargetConfig,
    pub mappings: Vec<MappingConfig>,
}

/// Relational source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// SQLite database holding the intermediate tables
    ///
    /// Legacy configs name it `dbname`; their `user` key is ignored.
    #[serde(alias = "dbname")]
    pub db_path: PathBuf,
}

/// Graph target configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Base URL of the Neo4j HTTP API, e.g. `http://localhost:7474`
    pub url: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_user")]
    pub user: String,
    /// Environment variable holding the password; unset means no auth
    #[serde(default = "default_password_env")]
    pub password_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// One relational-to-graph transform
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MappingConfig {
    #[serde(alias = "fromitem")]
    pub from_entity: String,
    #[serde(alias = "toitem")]
    pub to_entity: String,
    #[serde(alias = "intermediateitem")]
    pub intermediate_entity: String,
    #[serde(alias = "relationname")]
    pub relation_name: String,
}

fn default_database() -> String {
    "neo4j".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password_env() -> String {
    "NEO4J_PASSWORD".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// `config.toml` in `dir`, or `config.yml` when only that one exists
fn default_config_path(dir: &Path) -> PathBuf {
    let toml_path = dir.join("config.toml");
    let yaml_path = dir.join("config.yml");
    if !toml_path.exists() && yaml_path.exists() {
        yaml_path
    } else {
        toml_path
    }
}

impl TargetConfig {
    /// Password from the configured environment variable, if set
    pub fn password(&self) -> Option<String> {
        std::env::var(&self.password_env).ok()
    }
}

impl MappingConfig {
    /// Reject names that cannot become tables, columns, labels or relation types
    pub fn validate(&self) -> crate::Result<()> {
        for entity in [&self.from_entity, &self.to_entity, &self.intermediate_entity] {
            naming::validate_identifier(entity)?;
            naming::titleize(entity)?;
        }
        naming::validate_identifier(&self.relation_name)
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in REL2GRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    /// 3. ./config.yml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = match std::env::var("REL2GRAPH_CONFIG") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_config_path(Path::new(".")),
        };

        Self::from_path(&config_path)
    }

    /// Load configuration from an explicit path
    ///
    /// `.yml`/`.yaml` files are parsed as YAML, everything else as TOML.
    pub fn from_path(config_path: &Path) -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let is_yaml = matches!(
            config_path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        );

        let config: Config = if is_yaml {
            serde_yaml_ng::from_str(&config_str)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            toml::from_str(&config_str)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.mappings.is_empty() {
            anyhow::bail!("at least one [[mappings]] entry is required");
        }

        for (idx, mapping) in self.mappings.iter().enumerate() {
            mapping
                .validate()
                .with_context(|| format!("mappings[{}] is invalid", idx))?;
        }

        if self.target.timeout_secs == 0 {
            anyhow::bail!("target.timeout_secs must be greater than 0");
        }

        if self.target.database.is_empty() {
            anyhow::bail!("target.database must not be empty");
        }

        Ok(())
    }

    /// Get source database path
    pub fn db_path(&self) -> &Path {
        &self.source.db_path
    }

    /// Distinct intermediate tables the mappings read from
    pub fn intermediate_tables(&self) -> BTreeSet<String> {
        self.mappings
            .iter()
            .map(|m| naming::pluralize(&m.intermediate_entity))
            .collect()
    }
}
