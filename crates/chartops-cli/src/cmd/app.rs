use crate::output::{print_app, print_json, print_table};
use anyhow::Result;
use chartops_core::catalog::{Catalog, FileCatalog};
use chartops_core::error::{ActionError, ResourceKind};
use std::path::Path;

pub fn show(root: &Path, id: &str, json: bool) -> Result<()> {
    let app = FileCatalog::new(root)
        .app(id)?
        .ok_or_else(|| ActionError::not_found(ResourceKind::App, id))?;
    if json {
        print_json(&app)
    } else {
        print_app(&app);
        Ok(())
    }
}

pub fn list(root: &Path, json: bool) -> Result<()> {
    let apps = FileCatalog::new(root).list_apps()?;

    if json {
        return print_json(&apps);
    }
    if apps.is_empty() {
        println!("No apps.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = apps
        .iter()
        .map(|a| {
            vec![
                a.id.clone(),
                a.name.clone(),
                a.install_namespace.clone(),
                a.external_id.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "RELEASE", "NAMESPACE", "EXTERNAL ID"], &rows);
    Ok(())
}
