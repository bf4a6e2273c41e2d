use std::{path::PathBuf, time::Duration};

use clap::Parser;
use serde::{Deserialize, Serialize};
use validator_errors::ConfigError;
use validator_primitives::ChainConfig;
use validator_query::DbParams;

/// `validate` subcommand options. Every field is optional here: the CLI
/// layer only captures what the operator actually passed (directly or via
/// the matching environment variable); [`Config::resolve`] fills the rest
/// from a config file and finally from hardcoded defaults.
#[derive(Debug, Parser, Default)]
#[command(name = "statediff-validator", about = "Audits an indexed Ethereum chain for state-root and referential integrity")]
pub struct Cli {
    /// Path to a layered config file consulted for any option not given on
    /// the command line or through its environment variable.
    #[arg(long, env = "STATEDIFF_VALIDATOR_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    #[arg(long, env = "FROM_BLOCK")]
    pub from_block: Option<u64>,
    #[arg(long, env = "TRAIL")]
    pub trail: Option<u64>,
    #[arg(long, env = "RETRY_INTERVAL", value_parser = humantime::parse_duration)]
    pub retry_interval: Option<Duration>,
    #[arg(long, env = "STATEDIFF_MISSING_BLOCK")]
    pub statediff_missing_block: Option<bool>,
    #[arg(long, env = "STATEDIFF_TIMEOUT", value_parser = humantime::parse_duration)]
    pub statediff_timeout: Option<Duration>,
    #[arg(long, env = "ETH_CHAIN_CONFIG")]
    pub eth_chain_config: Option<PathBuf>,
    #[arg(long, env = "ETH_CHAIN_ID")]
    pub eth_chain_id: Option<u64>,
    #[arg(long, env = "ETH_HTTP_PATH")]
    pub eth_http_path: Option<String>,

    #[arg(long, env = "DATABASE_NAME")]
    pub database_name: Option<String>,
    #[arg(long, env = "DATABASE_HOSTNAME")]
    pub database_hostname: Option<String>,
    #[arg(long, env = "DATABASE_PORT")]
    pub database_port: Option<u16>,
    #[arg(long, env = "DATABASE_USER")]
    pub database_user: Option<String>,
    #[arg(long, env = "DATABASE_PASSWORD")]
    pub database_password: Option<String>,
    #[arg(long, env = "DATABASE_MAX_IDLE")]
    pub database_max_idle: Option<u32>,
    #[arg(long, env = "DATABASE_MAX_OPEN")]
    pub database_max_open: Option<u32>,
    #[arg(long, env = "DATABASE_MAX_LIFETIME", value_parser = humantime::parse_duration)]
    pub database_max_lifetime: Option<Duration>,

    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[arg(long, env = "PROM_METRICS")]
    pub prom_metrics: Option<bool>,
    #[arg(long, env = "PROM_HTTP_ADDR")]
    pub prom_http_addr: Option<String>,
    #[arg(long, env = "PROM_HTTP_PORT")]
    pub prom_http_port: Option<u16>,
    #[arg(long, env = "PROM_DB_STATS")]
    pub prom_db_stats: Option<bool>,
}

/// The same fields as [`Cli`], loaded from a config file via `confy`. Any
/// field left `None` here falls through to the hardcoded default.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub from_block: Option<u64>,
    pub trail: Option<u64>,
    #[serde(with = "humantime_serde::option", default)]
    pub retry_interval: Option<Duration>,
    pub statediff_missing_block: Option<bool>,
    #[serde(with = "humantime_serde::option", default)]
    pub statediff_timeout: Option<Duration>,
    pub eth_chain_config: Option<PathBuf>,
    pub eth_chain_id: Option<u64>,
    pub eth_http_path: Option<String>,
    pub database_name: Option<String>,
    pub database_hostname: Option<String>,
    pub database_port: Option<u16>,
    pub database_user: Option<String>,
    pub database_password: Option<String>,
    pub database_max_idle: Option<u32>,
    pub database_max_open: Option<u32>,
    #[serde(with = "humantime_serde::option", default)]
    pub database_max_lifetime: Option<Duration>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub prom_metrics: Option<bool>,
    pub prom_http_addr: Option<String>,
    pub prom_http_port: Option<u16>,
    pub prom_db_stats: Option<bool>,
}

/// The fully resolved configuration the service runs with, after CLI > env >
/// file > default layering.
#[derive(Debug, Clone)]
pub struct Config {
    pub from_block: u64,
    pub trail: u64,
    pub retry_interval: Duration,
    pub statediff_missing_block: bool,
    pub statediff_timeout: Duration,
    pub eth_chain_config: Option<PathBuf>,
    pub eth_chain_id: u64,
    pub eth_http_path: Option<String>,
    pub db: DbParams,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub prom_metrics: bool,
    pub prom_http_addr: String,
    pub prom_http_port: u16,
    pub prom_db_stats: bool,
}

macro_rules! layer {
    ($cli:expr, $file:expr, $field:ident, $default:expr) => {
        $cli.$field.clone().or_else(|| $file.$field.clone()).unwrap_or($default)
    };
}

impl Config {
    /// Layers `cli` (which already folds in environment variables via
    /// clap's `env` attribute) over an optional config file, then over
    /// hardcoded defaults.
    pub fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config_file {
            Some(path) => {
                confy::load_path(path).map_err(|source| ConfigError::FileLoad { path: path.display().to_string(), source })?
            }
            None => FileConfig::default(),
        };

        let from_block = layer!(cli, file, from_block, 1);
        if from_block < 1 {
            return Err(ConfigError::FromBlockZero(from_block));
        }

        Ok(Config {
            from_block,
            trail: layer!(cli, file, trail, 16),
            retry_interval: layer!(cli, file, retry_interval, Duration::from_secs(10)),
            statediff_missing_block: layer!(cli, file, statediff_missing_block, false),
            statediff_timeout: layer!(cli, file, statediff_timeout, Duration::from_secs(240)),
            eth_chain_config: cli.eth_chain_config.or(file.eth_chain_config),
            eth_chain_id: layer!(cli, file, eth_chain_id, 1),
            eth_http_path: cli.eth_http_path.or(file.eth_http_path),
            db: DbParams {
                database: layer!(cli, file, database_name, "vulcanize_public".to_string()),
                host: layer!(cli, file, database_hostname, "localhost".to_string()),
                port: layer!(cli, file, database_port, 5432),
                user: layer!(cli, file, database_user, "postgres".to_string()),
                password: layer!(cli, file, database_password, String::new()),
                max_idle: layer!(cli, file, database_max_idle, 4),
                max_open: layer!(cli, file, database_max_open, 8),
                max_lifetime: layer!(cli, file, database_max_lifetime, Duration::from_secs(0)),
            },
            log_level: layer!(cli, file, log_level, "info".to_string()),
            log_file: cli.log_file.or(file.log_file),
            prom_metrics: layer!(cli, file, prom_metrics, false),
            prom_http_addr: layer!(cli, file, prom_http_addr, "127.0.0.1".to_string()),
            prom_http_port: layer!(cli, file, prom_http_port, 9101),
            prom_db_stats: layer!(cli, file, prom_db_stats, false),
        })
    }

    /// Loads the chain config named by `eth_chain_config` (if any) or falls
    /// back to the built-in table keyed by `eth_chain_id`.
    pub fn chain_config(&self) -> Result<ChainConfig, ConfigError> {
        let Some(path) = &self.eth_chain_config else {
            return Ok(builtin_chain_config(self.eth_chain_id));
        };

        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::ChainConfigRead { path: path.display().to_string(), source })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::ChainConfigParse { path: path.display().to_string(), source })
    }
}

fn builtin_chain_config(chain_id: u64) -> ChainConfig {
    match chain_id {
        1 => ChainConfig::mainnet(),
        5 => ChainConfig::goerli(),
        11155111 => ChainConfig::sepolia(),
        _ => ChainConfig::permissive_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_from_block_zero() {
        let cli = Cli { from_block: Some(0), ..Cli::parse_from(["statediff-validator"]) };
        let err = Config::resolve(cli).unwrap_err();
        assert!(matches!(err, ConfigError::FromBlockZero(0)));
    }

    #[test]
    fn defaults_match_the_documented_cli_defaults() {
        let cli = Cli::parse_from(["statediff-validator"]);
        let cfg = Config::resolve(cli).unwrap();
        assert_eq!(cfg.from_block, 1);
        assert_eq!(cfg.trail, 16);
        assert_eq!(cfg.retry_interval, Duration::from_secs(10));
        assert!(!cfg.statediff_missing_block);
        assert_eq!(cfg.statediff_timeout, Duration::from_secs(240));
    }

    #[test]
    fn cli_value_overrides_file_default() {
        let cli = Cli { trail: Some(0), ..Cli::parse_from(["statediff-validator"]) };
        let cfg = Config::resolve(cli).unwrap();
        assert_eq!(cfg.trail, 0);
    }
}
