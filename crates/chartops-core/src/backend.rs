//! Transient tiller backend, one per action.
//!
//! [`BackendSupervisor::start`] launches the backend in a background task
//! bound to a fresh [`CancellationToken`] and, unless disabled, waits until
//! its health port accepts connections. The returned [`BackendHandle`] owns
//! the backend's lifetime: [`BackendHandle::stop`] cancels the token and
//! waits for the process to be reaped; dropping the handle without calling
//! `stop` still cancels it.

use crate::config::{BackendConfig, ToolsConfig};
use crate::error::{ActionError, Result};
use crate::helm;
use crate::ports::BackendPorts;
use crate::process::ProcessRunner;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What the backend needs to serve one action.
#[derive(Debug, Clone)]
pub struct BackendSpec {
    pub ports: BackendPorts,
    pub namespace: String,
    pub kubeconfig: PathBuf,
}

#[derive(Clone)]
pub struct BackendSupervisor {
    runner: Arc<dyn ProcessRunner>,
    tools: ToolsConfig,
    config: BackendConfig,
}

impl BackendSupervisor {
    pub fn new(runner: Arc<dyn ProcessRunner>, tools: ToolsConfig, config: BackendConfig) -> Self {
        Self {
            runner,
            tools,
            config,
        }
    }

    pub async fn start(&self, spec: BackendSpec) -> Result<BackendHandle> {
        let invocation = helm::tiller(
            &self.tools,
            &self.config,
            spec.ports,
            &spec.namespace,
            &spec.kubeconfig,
        );
        let cancel = CancellationToken::new();

        let runner = Arc::clone(&self.runner);
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = runner.supervise(invocation, token).await {
                tracing::warn!("backend stopped with error: {e}");
            }
        });

        tracing::info!(
            main = spec.ports.main,
            health = spec.ports.health,
            namespace = %spec.namespace,
            "backend started"
        );

        let mut handle = BackendHandle {
            ports: spec.ports,
            cancel: Some(cancel),
            task: Some(task),
        };

        if self.config.wait_for_ready {
            // On failure the handle drops here, which cancels the backend.
            handle.wait_ready(&self.config).await?;
        }
        Ok(handle)
    }
}

// ---------------------------------------------------------------------------
// BackendHandle
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct BackendHandle {
    ports: BackendPorts,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl BackendHandle {
    pub fn ports(&self) -> BackendPorts {
        self.ports
    }

    /// Poll the health port until it accepts a connection.
    async fn wait_ready(&mut self, config: &BackendConfig) -> Result<()> {
        let addr = self.ports.health_addr();
        let deadline = Instant::now() + config.ready_timeout();

        loop {
            if TcpStream::connect(addr).await.is_ok() {
                tracing::debug!(%addr, "backend ready");
                return Ok(());
            }
            if self.task.as_ref().is_some_and(|t| t.is_finished()) {
                return Err(ActionError::Provisioning(
                    "backend exited before becoming ready".into(),
                ));
            }
            if Instant::now() >= deadline {
                return Err(ActionError::Provisioning(format!(
                    "backend health port {addr} not ready after {}s",
                    config.ready_timeout_secs
                )));
            }
            tokio::time::sleep(config.poll_interval()).await;
        }
    }

    /// Cancel the backend and wait until its process is gone.
    pub async fn stop(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("backend task failed: {e}");
            }
        }
        tracing::debug!(main = self.ports.main, "backend stopped");
    }
}

impl Drop for BackendHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}
