use std::path::{Path, PathBuf};

/// Resolve the catalog root directory.
///
/// Priority:
/// 1. `--root` flag / `CHARTOPS_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `chartops.yaml` or `catalog/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root_from(&cwd).unwrap_or(cwd)
}

fn find_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| {
            dir.join(chartops_core::paths::CONFIG_FILE).is_file()
                || dir.join(chartops_core::paths::CATALOG_DIR).is_dir()
        })
        .map(Path::to_path_buf)
}
