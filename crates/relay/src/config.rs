use std::path::PathBuf;
use std::time::Duration;

/// Relay configuration loaded from environment variables.
///
/// All fields have defaults suitable for running next to the extension on a
/// developer machine.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1`).
    pub host: String,
    /// Bind port (default: `9100`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// JSON file holding `backendUrl` / `backendWs`.
    pub settings_path: PathBuf,
    /// Interval between job-status polls.
    pub poll_interval: Duration,
    /// Fixed delay before the push channel reconnects.
    pub push_reconnect_delay: Duration,
}

/// A configuration variable held a value that could not be used.
#[derive(Debug, thiserror::Error)]
#[error("{var} has invalid value '{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `RELAY_HOST`              | `127.0.0.1`             |
    /// | `RELAY_PORT`              | `9100`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `RELAY_SETTINGS_PATH`     | `relay-settings.json`   |
    /// | `POLL_INTERVAL_MS`        | `2000`                  |
    /// | `PUSH_RECONNECT_DELAY_MS` | `3000`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("RELAY_HOST").unwrap_or_else(|| "127.0.0.1".into());
        let port = parse_var(&lookup, "RELAY_PORT", 9100u16)?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let settings_path = lookup("RELAY_SETTINGS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("relay-settings.json"));

        let poll_interval_ms = parse_var(&lookup, "POLL_INTERVAL_MS", 2000u64)?;
        let reconnect_delay_ms = parse_var(&lookup, "PUSH_RECONNECT_DELAY_MS", 3000u64)?;

        if poll_interval_ms == 0 {
            return Err(ConfigError {
                var: "POLL_INTERVAL_MS",
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }

        Ok(Self {
            host,
            port,
            cors_origins,
            settings_path,
            poll_interval: Duration::from_millis(poll_interval_ms),
            push_reconnect_delay: Duration::from_millis(reconnect_delay_ms),
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError {
                var,
                reason: e.to_string(),
                value,
            })
        }
    }
}
