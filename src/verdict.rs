//! Turns the collected container states into a single Icinga2 check result.

use std::fmt;

use crate::inventory::{CollectionResult, ContainerStatus};

/// Icinga2 service check severity. Serializes as its numeric exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum Severity {
    Ok = 0,
    /// Kept for compatibility with the Icinga2 exit codes. Nothing in
    /// [`aggregate`] produces it.
    #[allow(dead_code)]
    Warning = 1,
    Critical = 2,
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value as u8
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// The payload of a `process-check-result` action.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CheckVerdict {
    pub exit_status: Severity,
    pub plugin_output: String,
    pub performance_data: String,
}

impl CheckVerdict {
    fn from_collection_error(message: &str) -> Self {
        Self {
            exit_status: Severity::Critical,
            plugin_output: format!("{} - {message}", Severity::Critical),
            performance_data: String::new(),
        }
    }

    fn from_containers(containers: &[ContainerStatus]) -> Self {
        let mut running = 0usize;
        let mut unhealthy = Vec::new();

        for container in containers {
            // A container without a reported status counts as running.
            match container.status.as_deref() {
                None | Some(RUNNING) => running += 1,
                Some(status) => unhealthy.push(format!("{} {status}", container.name)),
            }
        }

        let exit_status = if unhealthy.is_empty() {
            Severity::Ok
        } else {
            Severity::Critical
        };

        let details: String = unhealthy
            .iter()
            .map(|descriptor| format!(" {descriptor}  | "))
            .collect();

        Self {
            exit_status,
            plugin_output: format!("{exit_status} {details}"),
            performance_data: format!("running={running}; total={}; ", containers.len()),
        }
    }
}

const RUNNING: &str = "running";

/// Computes the check verdict for one run.
///
/// Any container that is not `running` makes the whole check CRITICAL, and a
/// collection error is reported as CRITICAL with the error as plugin output.
pub fn aggregate(result: &CollectionResult) -> CheckVerdict {
    match result {
        CollectionResult::Error(message) => CheckVerdict::from_collection_error(message),
        CollectionResult::Containers(containers) => CheckVerdict::from_containers(containers),
    }
}
