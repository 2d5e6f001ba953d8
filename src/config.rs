use std::path::PathBuf;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the dashboard backend.
    pub api_url: Url,
    pub app_name: String,
    /// Fallback session window when the backend does not supply one.
    /// Set via INNOLINK_SESSION_TIMEOUT_MS. Default: 3600000 (1 hour).
    pub session_timeout_ms: i64,
    /// Directory holding the token slot, audit log, and polling slots.
    pub data_dir: PathBuf,
    /// Interval for the polling delivery strategy.
    /// Set via INNOLINK_POLL_INTERVAL_SECS. Default: 3.
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

impl Config {
    /// User-agent sent on every backend request and stamped into audit
    /// entries.
    pub fn user_agent(&self) -> String {
        format!("{}/{}", self.app_name, env!("CARGO_PKG_VERSION"))
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let api_url = std::env::var("INNOLINK_API_URL")
        .unwrap_or_else(|_| "http://localhost:8080".into());
    let api_url = Url::parse(&api_url)
        .map_err(|e| anyhow::anyhow!("INNOLINK_API_URL is not a valid URL: {e}"))?;

    let data_dir = match std::env::var("INNOLINK_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("innolink"),
    };

    Ok(Config {
        api_url,
        app_name: std::env::var("INNOLINK_APP_NAME").unwrap_or_else(|_| "InnoSistemas".into()),
        session_timeout_ms: std::env::var("INNOLINK_SESSION_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3_600_000),
        data_dir,
        poll_interval: Duration::from_secs(
            std::env::var("INNOLINK_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        ),
        http_timeout: Duration::from_secs(
            std::env::var("INNOLINK_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        ),
    })
}
