use std::fmt;
use std::process::Command;

use url::Url;

/// Settings for one run. Built once at start-up and never modified.
#[derive(Clone)]
pub struct MonitorConfig {
    pub endpoint: Url,
    pub api_user: String,
    pub api_password: String,
    /// Icinga2 host object the check result is filed under.
    pub reporting_host: String,
    pub service: String,
    pub verify_tls: bool,
}

impl fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_user", &self.api_user)
            .field("api_password", &"<redacted>")
            .field("reporting_host", &self.reporting_host)
            .field("service", &self.service)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

const HOSTNAME_COMMAND: &str = "hostname";

/// Fully qualified name of this machine, used when no reporting host is
/// configured. Falls back to the plain hostname when it cannot be resolved.
pub fn local_hostname() -> String {
    resolve_hostname(HOSTNAME_COMMAND)
}

fn resolve_hostname(command: &str) -> String {
    fqdn_hostname(command).unwrap_or_else(os_hostname)
}

/// Asks `<command> -f` for the canonical name.
fn fqdn_hostname(command: &str) -> Option<String> {
    let output = match Command::new(command).arg("-f").output() {
        Ok(output) => output,
        Err(e) => {
            log::debug!("Unable to run {command} -f: {e}");
            return None;
        }
    };
    if !output.status.success() {
        log::debug!("{command} -f exited with {}", output.status);
        return None;
    }
    parse_hostname(&output.stdout)
}

fn parse_hostname(stdout: &[u8]) -> Option<String> {
    let name = String::from_utf8_lossy(stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}

fn os_hostname() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            log::warn!("Unable to read the local hostname, using localhost: {e}");
            "localhost".to_string()
        }
    }
}
