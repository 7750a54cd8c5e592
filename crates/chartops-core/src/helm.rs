//! Command lines for helm and its transient tiller backend.

use crate::config::{BackendConfig, ToolsConfig};
use crate::ports::BackendPorts;
use crate::process::Invocation;
use std::path::Path;

pub const HELM_HOST: &str = "HELM_HOST";
pub const KUBECONFIG: &str = "KUBECONFIG";
pub const TILLER_NAMESPACE: &str = "TILLER_NAMESPACE";
pub const TILLER_HISTORY_MAX: &str = "TILLER_HISTORY_MAX";

/// Environment shared by every helm call: the backend address and the
/// action's kubeconfig.
fn helm(tools: &ToolsConfig, ports: BackendPorts, kubeconfig: &Path) -> Invocation {
    Invocation::new(&tools.helm)
        .env(HELM_HOST, ports.main_addr().to_string())
        .env(KUBECONFIG, kubeconfig.display().to_string())
}

/// `helm upgrade --namespace <release> <release> <chart-dir>`
pub fn upgrade(
    tools: &ToolsConfig,
    ports: BackendPorts,
    kubeconfig: &Path,
    release: &str,
    chart_dir: &Path,
) -> Invocation {
    helm(tools, ports, kubeconfig)
        .arg("upgrade")
        .arg("--namespace")
        .arg(release)
        .arg(release)
        .arg(chart_dir.display().to_string())
}

/// `helm rollback <release> <revision>`
pub fn rollback(
    tools: &ToolsConfig,
    ports: BackendPorts,
    kubeconfig: &Path,
    release: &str,
    revision: &str,
) -> Invocation {
    helm(tools, ports, kubeconfig)
        .arg("rollback")
        .arg(release)
        .arg(revision)
}

/// `tiller --listen 127.0.0.1:<main> --probe-listen 127.0.0.1:<health>`
pub fn tiller(
    tools: &ToolsConfig,
    backend: &BackendConfig,
    ports: BackendPorts,
    namespace: &str,
    kubeconfig: &Path,
) -> Invocation {
    Invocation::new(&tools.tiller)
        .arg("--listen")
        .arg(ports.main_addr().to_string())
        .arg("--probe-listen")
        .arg(ports.health_addr().to_string())
        .env(KUBECONFIG, kubeconfig.display().to_string())
        .env(TILLER_NAMESPACE, namespace)
        .env(TILLER_HISTORY_MAX, backend.history_max.to_string())
}
