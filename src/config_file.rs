use std::path::Path;

use url::Url;

use crate::config::MonitorConfig;

fn default_endpoint() -> String {
    "http://icinga2:5665".to_string()
}

fn default_api_user() -> String {
    "container-monitor".to_string()
}

fn default_service() -> String {
    "check_dockmon".to_string()
}

fn default_verify_tls() -> bool {
    true
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid ICINGA2_ENDPOINT: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// The `settings.toml` file. Everything lives under a `[settings]` table.
#[derive(Debug, serde::Deserialize)]
pub struct MonitorConfigFile {
    settings: Settings,
}

#[derive(Debug, serde::Deserialize)]
struct Settings {
    #[serde(rename = "ICINGA2_ENDPOINT", default = "default_endpoint")]
    endpoint: String,
    #[serde(rename = "ICINGA2_API_USER", default = "default_api_user")]
    api_user: String,
    #[serde(rename = "ICINGA2_API_PASSWORD", default)]
    api_password: String,
    /// Falls back to the local hostname.
    #[serde(rename = "ICINGA2_REPORTING_HOST", default)]
    reporting_host: Option<String>,
    #[serde(rename = "ICINGA2_SERVICE", default = "default_service")]
    service: String,
    /// Set to false to accept a self-signed Icinga2 certificate.
    #[serde(rename = "ICINGA2_VERIFY_TLS", default = "default_verify_tls")]
    verify_tls: bool,
}

impl MonitorConfigFile {
    fn try_init_from_string(config: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(config)?)
    }

    pub fn try_init(path: &Path) -> Result<Self, ConfigFileError> {
        let config = std::fs::read_to_string(path)?;
        Self::try_init_from_string(&config)
    }

    /// Resolves defaults. `hostname` is only called when the file does not
    /// name a reporting host.
    pub fn into_config(
        self,
        hostname: impl FnOnce() -> String,
    ) -> Result<MonitorConfig, ConfigFileError> {
        let settings = self.settings;
        let endpoint = Url::parse(&settings.endpoint)?;
        Ok(MonitorConfig {
            endpoint,
            api_user: settings.api_user,
            api_password: settings.api_password,
            reporting_host: settings.reporting_host.unwrap_or_else(hostname),
            service: settings.service,
            verify_tls: settings.verify_tls,
        })
    }
}

/// Reads the config file at `path` into the immutable run configuration.
pub fn load(path: &Path) -> Result<MonitorConfig, ConfigFileError> {
    MonitorConfigFile::try_init(path)?.into_config(crate::config::local_hostname)
}
