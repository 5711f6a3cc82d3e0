//! Backend connection settings parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 25;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "E_CONFIG_MISSING",
            Self::Invalid { .. } => "E_CONFIG_INVALID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project base URL, without trailing slash.
    pub url: String,
    /// Public API key sent as `apikey` on every request.
    pub anon_key: String,
    /// Realtime websocket endpoint.
    pub realtime_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub heartbeat_secs: u64,
}

impl BackendConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `ENCORE_BACKEND_URL`
    /// - `ENCORE_ANON_KEY`
    ///
    /// Optional:
    /// - `ENCORE_REALTIME_URL`: derived from the base URL when absent
    /// - `ENCORE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `ENCORE_CONNECT_TIMEOUT_SECS`: default 10
    /// - `ENCORE_HEARTBEAT_SECS`: default 25
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BackendConfig::from_env`] over an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// See [`BackendConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = required(&lookup, "ENCORE_BACKEND_URL")?.trim_end_matches('/').to_owned();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid { var: "ENCORE_BACKEND_URL", value: url });
        }
        let anon_key = required(&lookup, "ENCORE_ANON_KEY")?;
        let realtime_url = match lookup("ENCORE_REALTIME_URL").filter(|v| !v.trim().is_empty()) {
            Some(v) => v.trim_end_matches('/').to_owned(),
            None => derive_realtime_url(&url),
        };

        Ok(Self {
            url,
            anon_key,
            realtime_url,
            request_timeout_secs: parse_u64(&lookup, "ENCORE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_timeout_secs: parse_u64(&lookup, "ENCORE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
            heartbeat_secs: parse_u64(&lookup, "ENCORE_HEARTBEAT_SECS", DEFAULT_HEARTBEAT_SECS)?,
        })
    }

    /// Config for a backend at `url` with default timeouts.
    #[must_use]
    pub fn new(url: &str, anon_key: &str) -> Self {
        let url = url.trim_end_matches('/').to_owned();
        Self {
            realtime_url: derive_realtime_url(&url),
            url,
            anon_key: anon_key.to_owned(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            heartbeat_secs: DEFAULT_HEARTBEAT_SECS,
        }
    }

    #[must_use]
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url)
    }

    #[must_use]
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.url)
    }
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var).filter(|v| !v.trim().is_empty()).ok_or(ConfigError::Missing { var })
}

fn parse_u64<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

/// `https://x.example` becomes `wss://x.example/realtime/v1/websocket`.
fn derive_realtime_url(base: &str) -> String {
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_owned()
    };
    format!("{ws_base}/realtime/v1/websocket")
}
