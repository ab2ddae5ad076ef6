//! Configuration for the SIPIS exporter.
//!
//! Settings come from an optional JSON5 file, then command-line flags and
//! environment variables. Resolution happens once at startup; the result is
//! never re-read.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Prometheus exposition settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Polled SIPIS instances.
    #[serde(default)]
    pub sipis: SipisConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: ":8080"). A leading `:` binds all
    /// interfaces.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen() -> String {
    ":8080".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

/// Polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipisConfig {
    /// Instance base URLs, e.g. `http://sipis01:8081`.
    #[serde(default)]
    pub instances: Vec<String>,

    /// Collection interval as a duration string (default: "15m").
    #[serde(default = "default_every")]
    pub every: String,

    /// Per-request timeout in seconds (default: 10).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_every() -> String {
    "15m".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for SipisConfig {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            every: default_every(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Values supplied on the command line or through the environment.
///
/// `None` and empty fields leave the file (or default) value in place,
/// except for instances, which are merged.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    /// Repeated `--instance` values.
    pub instances: Vec<String>,
    /// Comma-separated instance list from the environment.
    pub instance_list: Option<String>,
    pub every: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the effective configuration from an optional file and the
    /// command-line/environment overrides.
    pub fn resolve(
        file: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let config = match file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };

        let config = config.with_overrides(overrides);
        config.validate()?;

        if config.sipis.instances.is_empty() {
            return Err(ConfigError::Validation(
                "at least one instance must be configured (--instance or SIPIS_INSTANCES)"
                    .to_string(),
            ));
        }

        Ok(config)
    }

    /// Apply overrides. Instances from the file, the flags and the
    /// environment list are merged in that order without duplicates.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(listen) = overrides.listen {
            self.prometheus.listen = listen;
        }
        if let Some(every) = overrides.every {
            self.sipis.every = every;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }

        let env_instances = overrides
            .instance_list
            .as_deref()
            .map(split_instance_list)
            .unwrap_or_default();

        self.sipis.instances = merge_instances([
            self.sipis.instances,
            overrides.instances,
            env_instances,
        ]);

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        self.interval()?;

        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if self.sipis.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// `host:port` address to bind the HTTP server to.
    ///
    /// The host may be an IP address or a name; names are resolved when the
    /// server binds. A bare `:port` binds all interfaces.
    pub fn listen_addr(&self) -> Result<String, ConfigError> {
        let listen = self.prometheus.listen.trim();
        let invalid = || ConfigError::Validation(format!("Invalid listen address: {}", listen));

        let (host, port) = listen.rsplit_once(':').ok_or_else(invalid)?;
        port.parse::<u16>().map_err(|_| invalid())?;

        if host.is_empty() {
            Ok(format!("0.0.0.0:{}", port))
        } else {
            Ok(listen.to_string())
        }
    }

    /// Collection interval.
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        let interval = humantime::parse_duration(self.sipis.every.trim()).map_err(|e| {
            ConfigError::Validation(format!("Invalid interval '{}': {}", self.sipis.every, e))
        })?;

        if interval.is_zero() {
            return Err(ConfigError::Validation(
                "Interval must be greater than zero".to_string(),
            ));
        }

        Ok(interval)
    }

    /// Per-request timeout for instance fetches.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sipis.request_timeout_secs)
    }
}

/// Split a comma-separated instance list, trimming whitespace and dropping
/// empty entries.
pub fn split_instance_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Concatenate instance lists, keeping the first occurrence of each address.
fn merge_instances<const N: usize>(sources: [Vec<String>; N]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();

    for instance in sources.into_iter().flatten() {
        let instance = instance.trim().to_string();
        if !instance.is_empty() && !merged.contains(&instance) {
            merged.push(instance);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.prometheus.listen, ":8080");
        assert_eq!(config.prometheus.path, "/metrics");
        assert_eq!(config.sipis.every, "15m");
        assert_eq!(config.sipis.request_timeout_secs, 10);
        assert!(config.sipis.instances.is_empty());
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            prometheus: {
                listen: "127.0.0.1:9091",
                path: "/prometheus/metrics",
            },
            sipis: {
                instances: ["http://sipis01:8081", "http://sipis02:8081"],
                every: "30s",
                request_timeout_secs: 5,
            },
            logging: {
                level: "debug",
                format: "json"
            }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.prometheus.listen, "127.0.0.1:9091");
        assert_eq!(config.prometheus.path, "/prometheus/metrics");
        assert_eq!(
            config.sipis.instances,
            vec!["http://sipis01:8081", "http://sipis02:8081"]
        );
        assert_eq!(config.interval().unwrap(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_listen_addr_go_style_port() {
        let config = ExporterConfig::default();
        assert_eq!(config.listen_addr().unwrap(), "0.0.0.0:8080");
    }

    #[test]
    fn test_listen_addr_accepts_host_names() {
        let overrides = ConfigOverrides {
            listen: Some("localhost:9100".to_string()),
            instances: vec!["http://a.test".to_string()],
            ..Default::default()
        };

        let config = ExporterConfig::resolve(None, overrides).unwrap();
        assert_eq!(config.listen_addr().unwrap(), "localhost:9100");
    }

    #[test]
    fn test_listen_addr_ip_forms() {
        let mut config = ExporterConfig::default();

        config.prometheus.listen = "127.0.0.1:9100".to_string();
        assert_eq!(config.listen_addr().unwrap(), "127.0.0.1:9100");

        config.prometheus.listen = "[::1]:9100".to_string();
        assert_eq!(config.listen_addr().unwrap(), "[::1]:9100");

        config.prometheus.listen = "localhost".to_string();
        assert!(config.listen_addr().is_err());

        config.prometheus.listen = "localhost:http".to_string();
        assert!(config.listen_addr().is_err());

        config.prometheus.listen = ":99999".to_string();
        assert!(config.listen_addr().is_err());
    }

    #[test]
    fn test_validate_invalid_listen() {
        let json = r#"{
            prometheus: { listen: "not-an-address" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_invalid_path() {
        let json = r#"{
            prometheus: { path: "no-leading-slash" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("must start with /")
        );
    }

    #[test]
    fn test_interval_parsing() {
        let mut config = ExporterConfig::default();
        assert_eq!(config.interval().unwrap(), Duration::from_secs(15 * 60));

        config.sipis.every = "1h 30m".to_string();
        assert_eq!(config.interval().unwrap(), Duration::from_secs(90 * 60));

        config.sipis.every = "soon".to_string();
        assert!(config.interval().is_err());

        config.sipis.every = "0s".to_string();
        assert!(config.interval().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let json = r#"{
            sipis: { request_timeout_secs: 0 }
        }"#;

        assert!(ExporterConfig::parse(json).is_err());
    }

    #[test]
    fn test_split_instance_list() {
        assert_eq!(
            split_instance_list("http://b.test, http://c.test"),
            vec!["http://b.test", "http://c.test"]
        );
        assert_eq!(split_instance_list(" , http://b.test,,"), vec!["http://b.test"]);
        assert!(split_instance_list("").is_empty());
    }

    #[test]
    fn test_flag_and_env_instances_merge() {
        let overrides = ConfigOverrides {
            instances: vec!["http://a.test".to_string()],
            instance_list: Some("http://b.test,http://c.test".to_string()),
            ..Default::default()
        };

        let config = ExporterConfig::resolve(None, overrides).unwrap();
        assert_eq!(
            config.sipis.instances,
            vec!["http://a.test", "http://b.test", "http://c.test"]
        );
    }

    #[test]
    fn test_merge_removes_duplicates() {
        let config = ExporterConfig {
            sipis: SipisConfig {
                instances: vec!["http://a.test".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            instances: vec!["http://b.test".to_string(), "http://a.test".to_string()],
            instance_list: Some("http://b.test, http://c.test".to_string()),
            ..Default::default()
        };

        let config = config.with_overrides(overrides);
        assert_eq!(
            config.sipis.instances,
            vec!["http://a.test", "http://b.test", "http://c.test"]
        );
    }

    #[test]
    fn test_resolve_requires_instances() {
        let err = ExporterConfig::resolve(None, ConfigOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("at least one instance"));

        let overrides = ConfigOverrides {
            instance_list: Some(" , ".to_string()),
            ..Default::default()
        };
        assert!(ExporterConfig::resolve(None, overrides).is_err());
    }

    #[test]
    fn test_overrides_take_precedence_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                prometheus: {{ listen: "127.0.0.1:9000" }},
                sipis: {{ instances: ["http://file.test"], every: "1m" }},
                logging: {{ level: "warn" }}
            }}"#
        )
        .unwrap();

        let overrides = ConfigOverrides {
            listen: Some(":9100".to_string()),
            instances: vec!["http://flag.test".to_string()],
            every: Some("5m".to_string()),
            log_format: Some(LogFormat::Json),
            ..Default::default()
        };

        let config = ExporterConfig::resolve(Some(file.path()), overrides).unwrap();

        assert_eq!(config.listen_addr().unwrap(), "0.0.0.0:9100");
        assert_eq!(config.interval().unwrap(), Duration::from_secs(300));
        assert_eq!(
            config.sipis.instances,
            vec!["http://file.test", "http://flag.test"]
        );
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_resolve_missing_file() {
        let result = ExporterConfig::resolve(
            Some(Path::new("/nonexistent/sipis-exporter.json5")),
            ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_resolve_rejects_invalid_override() {
        let overrides = ConfigOverrides {
            instances: vec!["http://a.test".to_string()],
            every: Some("never".to_string()),
            ..Default::default()
        };

        let err = ExporterConfig::resolve(None, overrides).unwrap_err();
        assert!(err.to_string().contains("Invalid interval"));
    }
}
