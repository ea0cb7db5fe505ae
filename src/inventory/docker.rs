//! Docker access for the inventory, using bollard.
//!
//! The collector only needs to list containers and inspect them one by one,
//! so that is all [`ContainerRuntime`] exposes. Any daemon that speaks the
//! Docker Engine API can sit behind it.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::Docker;
use bollard::errors::Error;
use bollard::models::{ContainerInspectResponse, ContainerSummary};
use bollard::query_parameters::{
    InspectContainerOptions, InspectContainerOptionsBuilder, ListContainersOptions,
    ListContainersOptionsBuilder,
};

/// The parts of `GET /containers/{id}/json` the monitor reads. The state is
/// kept as the daemon's own string.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInspection {
    pub name: Option<String>,
    pub state: Option<InspectedState>,
    pub config: Option<InspectedConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectedState {
    pub status: Option<String>,
    pub exit_code: Option<i64>,
    pub error: Option<String>,
    pub running: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectedConfig {
    pub labels: Option<HashMap<String, String>>,
}

impl From<ContainerInspectResponse> for ContainerInspection {
    fn from(value: ContainerInspectResponse) -> Self {
        Self {
            name: value.name,
            state: value.state.map(|state| InspectedState {
                status: state.status.map(|status| status.to_string()),
                exit_code: state.exit_code,
                error: state.error,
                running: state.running,
            }),
            config: value.config.map(|config| InspectedConfig {
                labels: config.labels,
            }),
        }
    }
}

/// bollard only knows the container states of its API version and rejects the
/// whole inspection otherwise. The rejected payload is read again here with
/// the state as a plain string.
fn into_inspection(
    id: &str,
    result: Result<ContainerInspectResponse, Error>,
) -> Result<ContainerInspection, Error> {
    match result {
        Ok(info) => Ok(info.into()),
        Err(Error::JsonDataError {
            message, contents, ..
        }) => {
            log::debug!("Reading inspection of {id} as raw JSON: {message}");
            Ok(serde_json::from_str(&contents)?)
        }
        Err(e) => Err(e),
    }
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Every container known to the runtime, stopped ones included, in the
    /// order the runtime lists them.
    async fn list_all(&self) -> Result<Vec<ContainerSummary>, Error>;

    async fn inspect(&self, id: &str) -> Result<ContainerInspection, Error>;
}

#[async_trait]
impl ContainerRuntime for Docker {
    async fn list_all(&self) -> Result<Vec<ContainerSummary>, Error> {
        let options: ListContainersOptions = ListContainersOptionsBuilder::new().all(true).build();
        self.list_containers(Some(options)).await
    }

    async fn inspect(&self, id: &str) -> Result<ContainerInspection, Error> {
        let options: InspectContainerOptions = InspectContainerOptionsBuilder::new().build();
        into_inspection(id, self.inspect_container(id, Some(options)).await)
    }
}

/// Connects to Docker using the default connection method
/// (`DOCKER_HOST`, otherwise the Unix socket on Linux/macOS or the named pipe
/// on Windows).
pub fn connect() -> Result<Docker, Error> {
    Docker::connect_with_local_defaults()
}
