use std::time::Duration;

/// Mock backend configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Bind address (default: `127.0.0.1`).
    pub host: String,
    /// Bind port (default: `9000`).
    pub port: u16,
    /// Time a job spends in `running` before it completes.
    pub step_delay: Duration,
}

#[derive(Debug, thiserror::Error)]
#[error("{var} has invalid value '{value}'")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

impl MockConfig {
    /// Load configuration from `MOCK_HOST`, `MOCK_PORT` and
    /// `MOCK_STEP_DELAY_MS` (default 2000).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("MOCK_HOST").unwrap_or_else(|| "127.0.0.1".into());
        let port = match lookup("MOCK_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError {
                var: "MOCK_PORT",
                value,
            })?,
            None => 9000,
        };
        let step_delay_ms: u64 = match lookup("MOCK_STEP_DELAY_MS") {
            Some(value) => value.parse().map_err(|_| ConfigError {
                var: "MOCK_STEP_DELAY_MS",
                value,
            })?,
            None => 2000,
        };

        Ok(Self {
            host,
            port,
            step_delay: Duration::from_millis(step_delay_ms),
        })
    }

    /// Ephemeral-port config for tests.
    pub fn local(step_delay: Duration) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            step_delay,
        }
    }
}
