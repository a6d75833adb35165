//! Configuration system (layered: code > env > config file).

use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use reqwest::Url;
use serde::Deserialize;

use crate::error::FlowError;

pub const DEFAULT_DISCOVERY_PATH: &str = "login/v2";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(800);
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(20 * 60);

/// Settings for one browser login attempt.
///
/// Timeouts must be strictly ordered: `request_timeout < poll_interval <
/// deadline`, see [`FlowConfig::validate`].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use loginflow::config::FlowConfig;
///
/// let config = FlowConfig::builder()
///     .server_url("https://cloud.example.com".parse().unwrap())
///     .poll_interval(Duration::from_secs(2))
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct FlowConfig {
    pub server_url: Url,
    #[builder(default = DEFAULT_DISCOVERY_PATH.to_string(), into)]
    pub discovery_path: String,
    #[builder(default = DEFAULT_POLL_INTERVAL)]
    pub poll_interval: Duration,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,
    #[builder(default = DEFAULT_DISCOVERY_TIMEOUT)]
    pub discovery_timeout: Duration,
    #[builder(default = DEFAULT_DEADLINE)]
    pub deadline: Duration,
    #[builder(into)]
    pub user_agent: Option<String>,
    /// Extra PEM root certificate trusted for TLS.
    pub ca_certificate: Option<PathBuf>,
    #[builder(default)]
    pub accept_invalid_certs: bool,
}

impl FlowConfig {
    /// Config with defaults for everything except the server.
    pub fn new(server_url: Url) -> Self {
        Self::builder().server_url(server_url).build()
    }

    /// Check URL scheme and timeout ordering.
    pub fn validate(&self) -> Result<(), FlowError> {
        match self.server_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(FlowError::Configuration(format!(
                    "server URL must use http or https, got {other}"
                )))
            }
        }
        if self.request_timeout.is_zero() {
            return Err(FlowError::Configuration(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        if self.discovery_timeout.is_zero() {
            return Err(FlowError::Configuration(
                "discovery timeout must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout >= self.poll_interval {
            return Err(FlowError::Configuration(format!(
                "request timeout ({}ms) must be shorter than the poll interval ({}ms)",
                self.request_timeout.as_millis(),
                self.poll_interval.as_millis()
            )));
        }
        if self.poll_interval >= self.deadline {
            return Err(FlowError::Configuration(format!(
                "poll interval ({}ms) must be shorter than the deadline ({}s)",
                self.poll_interval.as_millis(),
                self.deadline.as_secs()
            )));
        }
        Ok(())
    }

    /// Whether responses must stay on HTTPS.
    pub fn requires_https(&self) -> bool {
        self.server_url.scheme() == "https"
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("loginflow/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Resolve a config from the default config file, the environment and an
    /// optional explicit server URL (highest precedence).
    pub fn load(server_url: Option<&str>) -> Result<Self, FlowError> {
        let file = match default_config_path() {
            Some(path) if path.exists() => FileConfig::from_path(&path)?,
            _ => FileConfig::default(),
        };
        Self::resolve(file, server_url)
    }

    /// Like [`FlowConfig::load`] but reads the given config file.
    pub fn load_from(path: &Path, server_url: Option<&str>) -> Result<Self, FlowError> {
        Self::resolve(FileConfig::from_path(path)?, server_url)
    }

    fn resolve(mut file: FileConfig, server_url: Option<&str>) -> Result<Self, FlowError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        file.apply_env(|key| std::env::var(key).ok());
        if let Some(url) = server_url {
            file.server_url = Some(url.to_string());
        }
        let config = file.into_config()?;
        config.validate()?;
        Ok(config)
    }
}

/// Location of the optional TOML config file.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "loginflow")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// On-disk / environment representation; every field is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server_url: Option<String>,
    pub discovery_path: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub discovery_timeout_secs: Option<u64>,
    pub deadline_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub ca_certificate: Option<PathBuf>,
    pub accept_invalid_certs: Option<bool>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self, FlowError> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            FlowError::Configuration(format!("failed to read {}: {err}", path.display()))
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Override fields from `LOGINFLOW_*` variables looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(value) = var("LOGINFLOW_SERVER_URL") {
            self.server_url = Some(value);
        }
        if let Some(value) = var("LOGINFLOW_DISCOVERY_PATH") {
            self.discovery_path = Some(value);
        }
        if let Some(value) = var("LOGINFLOW_USER_AGENT") {
            self.user_agent = Some(value);
        }
        if let Some(value) = var("LOGINFLOW_CA_CERTIFICATE") {
            self.ca_certificate = Some(PathBuf::from(value));
        }

        let numeric = [
            ("LOGINFLOW_POLL_INTERVAL_MS", &mut self.poll_interval_ms),
            ("LOGINFLOW_REQUEST_TIMEOUT_MS", &mut self.request_timeout_ms),
            ("LOGINFLOW_DISCOVERY_TIMEOUT_SECS", &mut self.discovery_timeout_secs),
            ("LOGINFLOW_DEADLINE_SECS", &mut self.deadline_secs),
        ];
        for (key, slot) in numeric {
            if let Some(value) = var(key) {
                match value.trim().parse::<u64>() {
                    Ok(parsed) => *slot = Some(parsed),
                    Err(_) => tracing::warn!(key, "ignoring non-numeric environment value"),
                }
            }
        }

        if let Some(value) = var("LOGINFLOW_ACCEPT_INVALID_CERTS") {
            self.accept_invalid_certs = Some(matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            ));
        }
    }

    pub fn into_config(self) -> Result<FlowConfig, FlowError> {
        let raw_url = self.server_url.ok_or_else(|| {
            FlowError::Configuration(
                "no server URL given (set LOGINFLOW_SERVER_URL or server_url)".to_string(),
            )
        })?;
        let server_url = Url::parse(raw_url.trim()).map_err(|err| {
            FlowError::Configuration(format!("invalid server URL {raw_url}: {err}"))
        })?;

        Ok(FlowConfig {
            server_url,
            discovery_path: self
                .discovery_path
                .unwrap_or_else(|| DEFAULT_DISCOVERY_PATH.to_string()),
            poll_interval: self
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            request_timeout: self
                .request_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            discovery_timeout: self
                .discovery_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_DISCOVERY_TIMEOUT),
            deadline: self
                .deadline_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_DEADLINE),
            user_agent: self.user_agent,
            ca_certificate: self.ca_certificate,
            accept_invalid_certs: self.accept_invalid_certs.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn url(value: &str) -> Url {
        value.parse().unwrap()
    }

    #[test]
    fn defaults_are_strictly_ordered() {
        let config = FlowConfig::new(url("https://cloud.example.com"));
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.deadline, Duration::from_secs(1200));
        assert!(config.request_timeout < config.poll_interval);
        assert_eq!(config.discovery_path, "login/v2");
        assert!(config.requires_https());
    }

    #[test]
    fn request_timeout_must_be_shorter_than_interval() {
        let config = FlowConfig::builder()
            .server_url(url("https://s"))
            .poll_interval(Duration::from_millis(500))
            .request_timeout(Duration::from_millis(500))
            .build();
        assert!(
            matches!(config.validate(), Err(FlowError::Configuration(message)) if message.contains("request timeout"))
        );
    }

    #[test]
    fn interval_must_be_shorter_than_deadline() {
        let config = FlowConfig::builder()
            .server_url(url("https://s"))
            .poll_interval(Duration::from_secs(10))
            .deadline(Duration::from_secs(10))
            .build();
        assert!(
            matches!(config.validate(), Err(FlowError::Configuration(message)) if message.contains("deadline"))
        );
    }

    #[test]
    fn zero_discovery_timeout_is_rejected() {
        let mut file = FileConfig {
            server_url: Some("https://s".to_string()),
            ..Default::default()
        };
        file.apply_env(|key| (key == "LOGINFLOW_DISCOVERY_TIMEOUT_SECS").then(|| "0".to_string()));
        let result = file.into_config().and_then(|config| config.validate());
        assert!(
            matches!(result, Err(FlowError::Configuration(message)) if message.contains("discovery timeout"))
        );
    }

    #[test]
    fn non_http_server_is_rejected() {
        let config = FlowConfig::new(url("ftp://s"));
        assert!(matches!(config.validate(), Err(FlowError::Configuration(_))));
    }

    #[test]
    fn user_agent_defaults_to_crate_version() {
        let config = FlowConfig::new(url("https://s"));
        assert!(config.user_agent().starts_with("loginflow/"));
        let custom = FlowConfig::builder()
            .server_url(url("https://s"))
            .user_agent("desktop-client/3.0")
            .build();
        assert_eq!(custom.user_agent(), "desktop-client/3.0");
    }

    #[test]
    fn file_values_are_overridden_by_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "server_url = \"https://file.example.com\"\npoll_interval_ms = 2000\ndeadline_secs = 60\n",
        )
        .unwrap();

        let mut file = FileConfig::from_path(&path).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("LOGINFLOW_POLL_INTERVAL_MS", "1500"),
            ("LOGINFLOW_ACCEPT_INVALID_CERTS", "true"),
        ]);
        file.apply_env(|key| env.get(key).map(|v| v.to_string()));
        let config = file.into_config().unwrap();

        assert_eq!(config.server_url.as_str(), "https://file.example.com/");
        assert_eq!(config.poll_interval, Duration::from_millis(1500));
        assert_eq!(config.deadline, Duration::from_secs(60));
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn non_numeric_env_value_is_ignored() {
        let mut file = FileConfig {
            server_url: Some("https://s".to_string()),
            poll_interval_ms: Some(3000),
            ..Default::default()
        };
        file.apply_env(|key| (key == "LOGINFLOW_POLL_INTERVAL_MS").then(|| "soon".to_string()));
        assert_eq!(file.poll_interval_ms, Some(3000));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server = \"https://s\"\n").unwrap();
        assert!(matches!(
            FileConfig::from_path(&path),
            Err(FlowError::Configuration(_))
        ));
    }

    #[test]
    fn missing_server_url_is_configuration_error() {
        let result = FileConfig::default().into_config();
        assert!(
            matches!(result, Err(FlowError::Configuration(message)) if message.contains("server URL"))
        );
    }

    #[test]
    fn explicit_server_url_wins_over_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server_url = \"https://file.example.com\"\n").unwrap();

        let config = FlowConfig::load_from(&path, Some("https://explicit.example.com")).unwrap();
        assert_eq!(config.server_url.as_str(), "https://explicit.example.com/");
    }
}
