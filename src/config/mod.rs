use crate::broadcast::{DeliveryMode, RenderFormat};
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "TELEMETRY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "telemetry.toml";

/// Complete relay configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Directory served under /static/
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    #[default]
    Interval,
    Change,
}

/// Subscriber delivery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default)]
    pub mode: BroadcastMode,
    /// Period for interval mode (milliseconds)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub format: RenderFormat,
}

fn default_interval_ms() -> u64 {
    100
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            mode: BroadcastMode::default(),
            interval_ms: default_interval_ms(),
            format: RenderFormat::default(),
        }
    }
}

impl BroadcastConfig {
    pub fn delivery_mode(&self) -> DeliveryMode {
        match self.mode {
            // A zero period would spin; clamp to 1ms
            BroadcastMode::Interval => {
                DeliveryMode::Interval(Duration::from_millis(self.interval_ms.max(1)))
            }
            BroadcastMode::Change => DeliveryMode::OnChange,
        }
    }
}

/// Status rendering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    /// Vehicles without an update for this long are shown as stale
    #[serde(default = "default_stale_after")]
    pub stale_after_seconds: i64,
}

fn default_stale_after() -> i64 {
    10
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            stale_after_seconds: default_stale_after(),
        }
    }
}

impl StatusConfig {
    /// Staleness window; negative or out-of-range settings are rejected.
    pub fn stale_after(&self) -> Result<chrono::Duration> {
        if self.stale_after_seconds < 0 {
            bail!(
                "status.stale_after_seconds must not be negative, got {}",
                self.stale_after_seconds
            );
        }
        chrono::Duration::try_seconds(self.stale_after_seconds).ok_or_else(|| {
            anyhow!(
                "status.stale_after_seconds out of range: {}",
                self.stale_after_seconds
            )
        })
    }
}

impl RelayConfig {
    /// Override file settings from env vars, warning on and ignoring unparsable values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("TELEMETRY_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = var("TELEMETRY_BROADCAST_MODE") {
            match v.to_ascii_lowercase().as_str() {
                "interval" => self.broadcast.mode = BroadcastMode::Interval,
                "change" => self.broadcast.mode = BroadcastMode::Change,
                other => warn!(value = %other, "ignoring unknown TELEMETRY_BROADCAST_MODE"),
            }
        }
        if let Some(v) = var("TELEMETRY_BROADCAST_INTERVAL_MS") {
            match v.parse::<u64>() {
                Ok(n) => self.broadcast.interval_ms = n,
                Err(_) => warn!(value = %v, "ignoring invalid TELEMETRY_BROADCAST_INTERVAL_MS"),
            }
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<RelayConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: RelayConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Load the file named by `TELEMETRY_CONFIG` (defaults when it does not exist), then apply env overrides.
pub fn load_from_env() -> Result<RelayConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&path).exists() {
        info!(path = %path, "Loading configuration");
        load_config(&path)?
    } else {
        info!(path = %path, "No config file, using defaults");
        RelayConfig::default()
    };

    config.apply_env();
    config.status.stale_after()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.server.static_dir, PathBuf::from("static"));
        assert_eq!(config.broadcast.mode, BroadcastMode::Interval);
        assert_eq!(config.broadcast.interval_ms, 100);
        assert_eq!(config.broadcast.format, RenderFormat::Html);
        assert_eq!(config.status.stale_after_seconds, 10);
        assert_eq!(
            config.broadcast.delivery_mode(),
            DeliveryMode::Interval(Duration::from_millis(100))
        );
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [server]
            bind_addr = "127.0.0.1:9090"
            static_dir = "/srv/telemetry/static"

            [broadcast]
            mode = "change"
            interval_ms = 250
            format = "json"

            [status]
            stale_after_seconds = 30
        "#;

        let config: RelayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:9090");
        assert_eq!(config.broadcast.mode, BroadcastMode::Change);
        assert_eq!(config.broadcast.format, RenderFormat::Json);
        assert_eq!(config.broadcast.delivery_mode(), DeliveryMode::OnChange);
        assert_eq!(
            config.status.stale_after().unwrap(),
            chrono::Duration::seconds(30)
        );
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [broadcast]
            interval_ms = 0
        "#;

        let config: RelayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080"); // Default
        assert_eq!(
            config.broadcast.delivery_mode(),
            DeliveryMode::Interval(Duration::from_millis(1))
        );
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let toml = r#"
            [broadcast]
            mode = "sometimes"
        "#;
        assert!(toml::from_str::<RelayConfig>(toml).is_err());
    }

    #[test]
    fn test_stale_after_rejects_negative_and_out_of_range() {
        let negative = StatusConfig {
            stale_after_seconds: -5,
        };
        let err = negative.stale_after().unwrap_err();
        assert!(err.to_string().contains("must not be negative"));

        let huge = StatusConfig {
            stale_after_seconds: i64::MAX,
        };
        assert!(huge.stale_after().is_err());

        let zero = StatusConfig {
            stale_after_seconds: 0,
        };
        assert_eq!(zero.stale_after().unwrap(), chrono::Duration::zero());
    }

    fn overrides(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RelayConfig::default();
        config.apply_overrides(overrides(&[
            ("TELEMETRY_BIND_ADDR", "127.0.0.1:7000"),
            ("TELEMETRY_BROADCAST_MODE", "CHANGE"),
            ("TELEMETRY_BROADCAST_INTERVAL_MS", "250"),
        ]));

        assert_eq!(config.server.bind_addr, "127.0.0.1:7000");
        assert_eq!(config.broadcast.mode, BroadcastMode::Change);
        assert_eq!(config.broadcast.interval_ms, 250);
    }

    #[test]
    fn test_invalid_env_overrides_keep_file_values() {
        let mut config = RelayConfig::default();
        config.broadcast.interval_ms = 40;
        config.apply_overrides(overrides(&[
            ("TELEMETRY_BROADCAST_MODE", "sometimes"),
            ("TELEMETRY_BROADCAST_INTERVAL_MS", "fast"),
        ]));

        assert_eq!(config.broadcast.mode, BroadcastMode::Interval);
        assert_eq!(config.broadcast.interval_ms, 40);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[broadcast]\nmode = \"change\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.broadcast.mode, BroadcastMode::Change);
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(dir.path().join("absent.toml")).is_err());
    }
}
