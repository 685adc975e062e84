use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_BATCH_PARALLELISM: usize = 4;
const DEFAULT_MAX_BATCH_SIZE: usize = 1_000;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the valuation service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub valuation: ValuationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let ansi = env::var("APP_LOG_ANSI")
            .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            valuation: ValuationConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Knobs for upstream lookups and batch fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationConfig {
    pub upstream_timeout: Duration,
    pub batch_parallelism: usize,
    pub max_batch_size: usize,
    pub rate_table_csv: Option<PathBuf>,
    pub unknown_region_multiplier: Option<f64>,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_millis(DEFAULT_UPSTREAM_TIMEOUT_MS),
            batch_parallelism: DEFAULT_BATCH_PARALLELISM,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            rate_table_csv: None,
            unknown_region_multiplier: None,
        }
    }
}

impl ValuationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let upstream_timeout = match env::var("COST_MATRIX_UPSTREAM_TIMEOUT_MS") {
            Ok(raw) => {
                let millis = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidUpstreamTimeout)?;
                if millis == 0 {
                    return Err(ConfigError::InvalidUpstreamTimeout);
                }
                Duration::from_millis(millis)
            }
            Err(_) => defaults.upstream_timeout,
        };

        let batch_parallelism = match env::var("COST_MATRIX_BATCH_PARALLELISM") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value >= 1 => value,
                _ => return Err(ConfigError::InvalidBatchParallelism),
            },
            Err(_) => defaults.batch_parallelism,
        };

        let max_batch_size = match env::var("COST_MATRIX_MAX_BATCH_SIZE") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value >= 1 => value,
                _ => return Err(ConfigError::InvalidMaxBatchSize),
            },
            Err(_) => defaults.max_batch_size,
        };

        let rate_table_csv = env::var("COST_MATRIX_RATE_TABLE_CSV")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        let unknown_region_multiplier = match env::var("COST_MATRIX_UNKNOWN_REGION_MULTIPLIER") {
            Ok(raw) if raw.trim().is_empty() => None,
            Ok(raw) => match raw.trim().parse::<f64>() {
                Ok(value) if (0.5..=2.0).contains(&value) => Some(value),
                _ => return Err(ConfigError::InvalidRegionMultiplier { value: raw }),
            },
            Err(_) => None,
        };

        Ok(Self {
            upstream_timeout,
            batch_parallelism,
            max_batch_size,
            rate_table_csv,
            unknown_region_multiplier,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidUpstreamTimeout,
    InvalidBatchParallelism,
    InvalidMaxBatchSize,
    InvalidRegionMultiplier { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidUpstreamTimeout => write!(
                f,
                "COST_MATRIX_UPSTREAM_TIMEOUT_MS must be a positive number of milliseconds"
            ),
            ConfigError::InvalidBatchParallelism => {
                write!(f, "COST_MATRIX_BATCH_PARALLELISM must be an integer >= 1")
            }
            ConfigError::InvalidMaxBatchSize => {
                write!(f, "COST_MATRIX_MAX_BATCH_SIZE must be an integer >= 1")
            }
            ConfigError::InvalidRegionMultiplier { value } => write!(
                f,
                "COST_MATRIX_UNKNOWN_REGION_MULTIPLIER '{}' must be a number between 0.5 and 2.0",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
