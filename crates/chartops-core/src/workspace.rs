use crate::config::WorkspaceConfig;
use crate::error::{ActionError, Result};
use std::path::Path;
use tempfile::TempDir;

/// Private temp directory that holds every file an action writes.
///
/// Removed by [`Workspace::close`], or on drop if the action never reaches
/// it (panic, cancelled future). Removal happens exactly once either way.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create(config: &WorkspaceConfig) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&config.prefix);
        let dir = match &config.parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| ActionError::Provisioning(format!("failed to create workspace: {e}")))?;

        tracing::debug!(path = %dir.path().display(), "workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the workspace and everything under it.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            ActionError::Provisioning(format!(
                "failed to remove workspace {}: {e}",
                path.display()
            ))
        })?;
        tracing::debug!(path = %path.display(), "workspace removed");
        Ok(())
    }
}
