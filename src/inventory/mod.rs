//! Collects the run state of every container on the host.

pub mod docker;

use futures_util::future;

use docker::{ContainerInspection, ContainerRuntime};

/// Containers carrying this label set to [`MONITOR_OPT_OUT`] are not monitored.
pub const MONITOR_LABEL: &str = "com.opusvl.monitor";
pub const MONITOR_OPT_OUT: &str = "off";

const SHORT_ID_LEN: usize = 12;

/// One observed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    pub id: String,
    pub short_id: String,
    pub name: String,
    /// Runtime state as reported by Docker (`running`, `exited`, ...).
    pub status: Option<String>,
    /// Only meaningful when the container is not running.
    pub exit_code: i64,
    pub error: String,
    pub running: bool,
}

impl ContainerStatus {
    fn from_inspection(id: String, info: ContainerInspection) -> Self {
        let state = info.state.unwrap_or_default();
        Self {
            short_id: id.chars().take(SHORT_ID_LEN).collect(),
            id,
            name: info.name.unwrap_or_default(),
            status: state.status,
            exit_code: state.exit_code.unwrap_or_default(),
            error: state.error.unwrap_or_default(),
            running: state.running.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionResult {
    /// Monitored containers in the runtime's listing order.
    Containers(Vec<ContainerStatus>),
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("Error connecting to docker api")]
    Connect(#[source] bollard::errors::Error),
    #[error("Error inspecting container {id}: {source}")]
    Inspect {
        id: String,
        #[source]
        source: bollard::errors::Error,
    },
}

impl From<CollectError> for CollectionResult {
    fn from(value: CollectError) -> Self {
        CollectionResult::Error(value.to_string())
    }
}

fn is_opted_out(info: &ContainerInspection) -> bool {
    info.config
        .as_ref()
        .and_then(|config| config.labels.as_ref())
        .and_then(|labels| labels.get(MONITOR_LABEL))
        .is_some_and(|value| value == MONITOR_OPT_OUT)
}

async fn try_collect<R>(runtime: &R) -> Result<Vec<ContainerStatus>, CollectError>
where
    R: ContainerRuntime + ?Sized,
{
    let ids: Vec<String> = runtime
        .list_all()
        .await
        .map_err(CollectError::Connect)?
        .into_iter()
        .filter_map(|summary| summary.id)
        .collect();
    log::debug!("Docker listed {} containers", ids.len());

    // join_all yields results in input order, so the listing order survives.
    let inspections = future::join_all(ids.iter().map(|id| runtime.inspect(id))).await;

    let mut containers = Vec::with_capacity(ids.len());
    for (id, inspection) in ids.into_iter().zip(inspections) {
        let info = match inspection {
            Ok(info) => info,
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                log::warn!("Container {id} disappeared before it could be inspected, skipping");
                continue;
            }
            Err(source) => return Err(CollectError::Inspect { id, source }),
        };

        if is_opted_out(&info) {
            log::debug!("Container {id} has {MONITOR_LABEL}={MONITOR_OPT_OUT}, skipping");
            continue;
        }

        let container = ContainerStatus::from_inspection(id, info);
        log::debug!(
            "Container {} ({}) is {}, running: {}, exit code: {}, error: {:?}",
            container.name,
            container.short_id,
            container.status.as_deref().unwrap_or("<unknown>"),
            container.running,
            container.exit_code,
            container.error
        );
        log::trace!("Container {} has id {}", container.short_id, container.id);
        containers.push(container);
    }

    Ok(containers)
}

/// Lists and inspects every container known to `runtime`.
///
/// Failures never escape: they come back as [`CollectionResult::Error`] so the
/// monitoring backend still hears about them.
pub async fn collect<R>(runtime: &R) -> CollectionResult
where
    R: ContainerRuntime + ?Sized,
{
    match try_collect(runtime).await {
        Ok(containers) => {
            log::info!("Collected the status of {} containers", containers.len());
            CollectionResult::Containers(containers)
        }
        Err(e) => {
            log::error!("Container collection failed: {e:?}");
            e.into()
        }
    }
}

/// Collects from the Docker daemon the environment points at.
pub async fn collect_local() -> CollectionResult {
    match docker::connect() {
        Ok(docker) => collect(&docker).await,
        Err(e) => {
            let e = CollectError::Connect(e);
            log::error!("Container collection failed: {e:?}");
            e.into()
        }
    }
}
