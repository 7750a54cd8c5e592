use async_trait::async_trait;
use axum::http::StatusCode;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chartops_core::catalog::FileCatalog;
use chartops_core::config::Config;
use chartops_core::credentials::DirectKubeConfig;
use chartops_core::error::{ActionError, ProcessFailure};
use chartops_core::process::{Invocation, ProcessRunner};
use chartops_core::types::{AppResource, Cluster, TemplateVersion};
use chartops_core::Orchestrator;
use chartops_server::{build_router, serve_on, AppState};
use http_body_util::BodyExt;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const APP_ID: &str = "p-xyz:my-app";
const EXTERNAL_ID: &str = "catalog://?catalog=library&template=mysql&version=0.3.4";
const TOKEN: &str = "Bearer token-abc:secret";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Records helm calls; listens on tiller's health port until cancelled.
#[derive(Default)]
struct RecordingRunner {
    helm_exit: Option<i32>,
    calls: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> chartops_core::Result<()> {
        self.calls.lock().unwrap().push(invocation.clone());
        match self.helm_exit {
            None => Ok(()),
            Some(code) => Err(ActionError::Process {
                command: invocation.to_string(),
                failure: ProcessFailure::Exit(Some(code)),
            }),
        }
    }

    async fn supervise(
        &self,
        invocation: Invocation,
        cancel: CancellationToken,
    ) -> chartops_core::Result<()> {
        let _listener = tokio::net::TcpListener::bind(&invocation.args[3]).await?;
        cancel.cancelled().await;
        Ok(())
    }
}

struct Fixture {
    root: TempDir,
    _workspaces: TempDir,
    catalog: FileCatalog,
    runner: Arc<RecordingRunner>,
    state: AppState,
    router: axum::Router,
}

/// A file catalog with one app, its cluster, and one chart version.
fn fixture(runner: RecordingRunner) -> Fixture {
    let root = TempDir::new().unwrap();
    let workspaces = TempDir::new().unwrap();
    let catalog = FileCatalog::new(root.path());

    catalog
        .put_app(&AppResource {
            id: APP_ID.into(),
            project_id: "c-abc:p-xyz".into(),
            install_namespace: "databases".into(),
            name: "my-app".into(),
            external_id: "catalog://?catalog=library&template=mysql&version=0.3.3".into(),
            updated_at: chrono::Utc::now(),
        })
        .unwrap();
    catalog
        .put_cluster(&Cluster {
            id: "c-abc".into(),
            name: "prod".into(),
            api_endpoint: "https://10.0.0.1:6443".into(),
            ca_cert: None,
        })
        .unwrap();
    catalog
        .put_template_version(&TemplateVersion {
            id: "library-mysql-0.3.4".into(),
            files: BTreeMap::from([(
                "mysql/Chart.yaml".to_string(),
                BASE64.encode("name: mysql\nversion: 0.3.4\n"),
            )]),
        })
        .unwrap();

    let mut config = Config::default();
    config.workspace.parent = Some(workspaces.path().to_path_buf());
    config.backend.poll_interval_ms = 10;

    let runner = Arc::new(runner);
    let catalog_arc = Arc::new(catalog.clone());
    let orchestrator = Orchestrator::new(
        &config,
        catalog_arc.clone(),
        catalog_arc,
        Arc::new(DirectKubeConfig),
        runner.clone(),
    );
    let state = AppState::new(root.path().to_path_buf(), orchestrator);
    let router = build_router(state.clone());

    Fixture {
        root,
        _workspaces: workspaces,
        catalog,
        runner,
        state,
        router,
    }
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    send(app, req).await
}

/// Send a POST with a JSON body and optional Authorization header.
async fn post_json(
    app: axum::Router,
    uri: &str,
    auth: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let mut req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        req = req.header("authorization", auth);
    }
    let req = req
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, req).await
}

async fn send(
    app: axum::Router,
    req: axum::http::Request<axum::body::Body>,
) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_apps_includes_action_links() {
    let f = fixture(RecordingRunner::default());
    let (status, body) = get(f.router, "/api/apps").await;
    assert_eq!(status, StatusCode::OK);
    let apps = body.as_array().unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0]["id"], APP_ID);
    assert_eq!(apps[0]["actions"]["upgrade"], "/api/apps/p-xyz:my-app/upgrade");
    assert_eq!(apps[0]["actions"]["rollback"], "/api/apps/p-xyz:my-app/rollback");
}

#[tokio::test]
async fn get_app_returns_resource() {
    let f = fixture(RecordingRunner::default());
    let (status, body) = get(f.router, "/api/apps/p-xyz:my-app").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "my-app");
    assert_eq!(body["installNamespace"], "databases");
    assert!(body["actions"].is_object());
}

#[tokio::test]
async fn serve_on_answers_over_tcp() {
    let f = fixture(RecordingRunner::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_on(f.state.clone(), listener));

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /api/apps HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    server.abort();

    assert!(response.starts_with("HTTP/1.1 200"), "response: {response}");
    assert!(response.contains(APP_ID));
}

#[tokio::test]
async fn get_unknown_app_is_404() {
    let f = fixture(RecordingRunner::default());
    let (status, body) = get(f.router, "/api/apps/p-xyz:ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("ghost"));
}

// ---------------------------------------------------------------------------
// Upgrade
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upgrade_without_token_is_401() {
    let f = fixture(RecordingRunner::default());
    let (status, _) = post_json(
        f.router,
        "/api/apps/p-xyz:my-app/upgrade",
        None,
        serde_json::json!({ "externalId": EXTERNAL_ID }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(f.runner.calls().is_empty());
}

#[tokio::test]
async fn upgrade_runs_helm_and_persists_external_id() {
    let f = fixture(RecordingRunner::default());
    let (status, body) = post_json(
        f.router,
        "/api/apps/p-xyz:my-app/upgrade",
        Some(TOKEN),
        serde_json::json!({ "externalId": EXTERNAL_ID }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["externalId"], EXTERNAL_ID);
    assert_eq!(body["actions"]["upgrade"], "/api/apps/p-xyz:my-app/upgrade");

    let calls = f.runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(&calls[0].args[..4], ["upgrade", "--namespace", "my-app", "my-app"]);

    use chartops_core::catalog::Catalog;
    let stored = f.catalog.app(APP_ID).unwrap().unwrap();
    assert_eq!(stored.external_id, EXTERNAL_ID);
    assert!(f.root.path().join("catalog/apps").exists());
}

#[tokio::test]
async fn upgrade_to_unknown_version_is_404() {
    let f = fixture(RecordingRunner::default());
    let (status, _) = post_json(
        f.router,
        "/api/apps/p-xyz:my-app/upgrade",
        Some(TOKEN),
        serde_json::json!({
            "externalId": "catalog://?catalog=library&template=mysql&version=9.9.9"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(f.runner.calls().is_empty());
}

#[tokio::test]
async fn upgrade_with_malformed_external_id_is_400() {
    let f = fixture(RecordingRunner::default());
    let (status, _) = post_json(
        f.router,
        "/api/apps/p-xyz:my-app/upgrade",
        Some(TOKEN),
        serde_json::json!({ "externalId": "mysql-0.3.4" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upgrade_without_external_id_is_400() {
    let f = fixture(RecordingRunner::default());
    let (status, body) = post_json(
        f.router,
        "/api/apps/p-xyz:my-app/upgrade",
        Some(TOKEN),
        serde_json::json!({ "version": "0.3.4" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("externalId"));
    assert!(f.runner.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Rollback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rollback_accepts_numeric_revision() {
    let f = fixture(RecordingRunner::default());
    let (status, body) = post_json(
        f.router,
        "/api/apps/p-xyz:my-app/rollback",
        Some(TOKEN),
        serde_json::json!({ "revision": 3 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["id"], APP_ID);
    assert_eq!(body["actions"]["rollback"], "/api/apps/p-xyz:my-app/rollback");
    assert_eq!(f.runner.calls()[0].args, ["rollback", "my-app", "3"]);
}

#[tokio::test]
async fn rollback_without_revision_is_400() {
    let f = fixture(RecordingRunner::default());
    let (status, body) = post_json(
        f.router,
        "/api/apps/p-xyz:my-app/rollback",
        Some(TOKEN),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("revision"));
    assert!(f.runner.calls().is_empty());
}

#[tokio::test]
async fn rollback_tool_failure_is_422() {
    let f = fixture(RecordingRunner {
        helm_exit: Some(1),
        ..Default::default()
    });
    let (status, body) = post_json(
        f.router,
        "/api/apps/p-xyz:my-app/rollback",
        Some(TOKEN),
        serde_json::json!({ "revision": "3" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("exited with code 1"));
}

#[tokio::test]
async fn rollback_of_unknown_app_is_404() {
    let f = fixture(RecordingRunner::default());
    let (status, _) = post_json(
        f.router,
        "/api/apps/p-xyz:ghost/rollback",
        Some(TOKEN),
        serde_json::json!({ "revision": "1" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(f.runner.calls().is_empty());
}
