use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::tasks::RunRequest;

/// Identifies a started run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub run_id: String,
    pub experiment_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("run request for {host} contains no tasks")]
    NoTasks { host: String },

    #[error("failed to serialize the run request: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Hands run requests over to a Kubeflow Pipelines deployment.
pub trait PipelineSubmitter {
    fn submit(
        &self,
        request: RunRequest,
    ) -> impl Future<Output = Result<RunHandle, SubmitError>> + Send;
}

fn ensure_tasks(request: &RunRequest) -> Result<(), SubmitError> {
    if request.tasks.is_empty() {
        return Err(SubmitError::NoTasks {
            host: request.host.clone(),
        });
    }

    Ok(())
}

/// Logs every resolved task instead of contacting the API.
#[derive(Debug, Default)]
pub struct DryRunSubmitter {
    submitted: AtomicU64,
}

impl DryRunSubmitter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PipelineSubmitter for DryRunSubmitter {
    async fn submit(&self, request: RunRequest) -> Result<RunHandle, SubmitError> {
        ensure_tasks(&request)?;

        info!(
            host = request.host,
            experiment_name = request.experiment_name,
            run_name = request.run_name,
            authenticated = request.token.is_some(),
            "dry run of {} tasks:",
            request.tasks.len()
        );
        for task in &request.tasks {
            info!("  {}", serde_json::to_string(task)?);
        }

        let sequence = self.submitted.fetch_add(1, Ordering::Relaxed);

        Ok(RunHandle {
            run_id: format!("dry-run-{sequence}"),
            experiment_name: request.experiment_name,
        })
    }
}

#[derive(Debug)]
struct Inner {
    requests: Vec<RunRequest>,
}

/// Records every request it receives.
#[derive(Debug, Clone)]
pub struct MemorySubmitter {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySubmitter {
    pub fn new() -> Self {
        let inner = Inner {
            requests: Vec::new(),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Number of requests received so far.
    pub async fn submitted(&self) -> usize {
        self.inner.lock().await.requests.len()
    }

    /// Runs `f` over the requests received so far.
    pub async fn with_requests<R>(&self, f: impl FnOnce(&[RunRequest]) -> R) -> R {
        let inner = self.inner.lock().await;
        f(&inner.requests)
    }
}

impl Default for MemorySubmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineSubmitter for MemorySubmitter {
    async fn submit(&self, request: RunRequest) -> Result<RunHandle, SubmitError> {
        ensure_tasks(&request)?;

        let mut inner = self.inner.lock().await;
        info!("recording run request with {} tasks", request.tasks.len());

        let handle = RunHandle {
            run_id: format!("memory-{}", inner.requests.len()),
            experiment_name: request.experiment_name.clone(),
        };
        inner.requests.push(request);

        Ok(handle)
    }
}
