use crate::output::{print_app, print_json};
use anyhow::{anyhow, Context, Result};
use chartops_core::catalog::FileCatalog;
use chartops_core::config::Config;
use chartops_core::types::{ActionRequest, AuthToken};
use chartops_core::Orchestrator;
use std::path::Path;

pub fn upgrade(
    root: &Path,
    app: &str,
    external_id: &str,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    execute(root, ActionRequest::upgrade(app, external_id), token, json)
}

pub fn rollback(
    root: &Path,
    app: &str,
    revision: &str,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    execute(root, ActionRequest::rollback(app, revision), token, json)
}

fn execute(root: &Path, request: ActionRequest, token: Option<&str>, json: bool) -> Result<()> {
    let token = token
        .filter(|t| !t.trim().is_empty())
        .map(AuthToken::new)
        .ok_or_else(|| anyhow!("no token: pass --token or set CHARTOPS_TOKEN"))?;

    let config = Config::load(root).context("failed to load config")?;
    let orchestrator = Orchestrator::with_file_catalog(&config, FileCatalog::new(root));

    let rt = tokio::runtime::Runtime::new()?;
    let app = rt
        .block_on(orchestrator.execute(&request, &token))
        .with_context(|| format!("{} of '{}' failed", request.action, request.app_id))?;

    if json {
        print_json(&app)?;
    } else {
        println!("{} of '{}' succeeded", request.action, app.id);
        print_app(&app);
    }
    Ok(())
}
