use thiserror::Error;

/// The catalog entity a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    App,
    Cluster,
    TemplateVersion,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::App => write!(f, "app"),
            ResourceKind::Cluster => write!(f, "cluster"),
            ResourceKind::TemplateVersion => write!(f, "template version"),
        }
    }
}

/// Why an external command did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessFailure {
    /// The executable could not be started.
    Spawn(String),
    /// The process ran and exited unsuccessfully. `None` means it was
    /// terminated by a signal.
    Exit(Option<i32>),
}

impl std::fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessFailure::Spawn(msg) => write!(f, "could not be spawned: {msg}"),
            ProcessFailure::Exit(Some(code)) => write!(f, "exited with code {code}"),
            ProcessFailure::Exit(None) => write!(f, "was terminated by a signal"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("provisioning error: {0}")]
    Provisioning(String),

    #[error("`{command}` {failure}")]
    Process {
        command: String,
        failure: ProcessFailure,
    },

    #[error("failed to update app '{app_id}': {message}")]
    StateUpdate { app_id: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl ActionError {
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        ActionError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ActionError>;
