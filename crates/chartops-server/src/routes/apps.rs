use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use chartops_core::catalog::Catalog;
use chartops_core::error::{ActionError, ResourceKind};
use chartops_core::types::{ActionRequest, AppResource, AuthToken, RollbackInput, UpgradeInput};

use crate::error::AppError;
use crate::state::AppState;

/// The caller's token from `Authorization: Bearer <token>`.
fn bearer(headers: &HeaderMap) -> Result<AuthToken, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(AuthToken::new(token.trim()))
        }
        _ => Err(AppError::unauthorized("expected a Bearer token")),
    }
}

fn with_actions(app: &AppResource) -> serde_json::Value {
    serde_json::json!({
        "id": app.id,
        "projectId": app.project_id,
        "installNamespace": app.install_namespace,
        "name": app.name,
        "externalId": app.external_id,
        "updatedAt": app.updated_at,
        "actions": {
            "upgrade": format!("/api/apps/{}/upgrade", app.id),
            "rollback": format!("/api/apps/{}/rollback", app.id),
        },
    })
}

/// GET /api/apps: list all apps.
pub async fn list_apps(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let catalog = app.orchestrator.catalog().clone();
    let result = tokio::task::spawn_blocking(move || {
        let apps = catalog.list_apps()?;
        let list: Vec<serde_json::Value> = apps.iter().map(with_actions).collect();
        Ok::<_, ActionError>(serde_json::json!(list))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// GET /api/apps/:id: one app and the actions it supports.
pub async fn get_app(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let catalog = app.orchestrator.catalog().clone();
    let result = tokio::task::spawn_blocking(move || {
        let resource = catalog
            .app(&id)?
            .ok_or_else(|| ActionError::not_found(ResourceKind::App, &id))?;
        Ok::<_, ActionError>(with_actions(&resource))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// The request body, with malformed or incomplete JSON reported as 400.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// POST /api/apps/:id/upgrade: upgrade the release to `externalId`.
pub async fn upgrade_app(
    State(app): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<UpgradeInput>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = bearer(&headers)?;
    let input = body(payload)?;
    if input.external_id.trim().is_empty() {
        return Err(AppError::bad_request("externalId must not be empty"));
    }
    let request = ActionRequest::upgrade(id, input.external_id);
    let updated = app.orchestrator.execute(&request, &token).await?;
    Ok(Json(with_actions(&updated)))
}

/// POST /api/apps/:id/rollback: roll the release back to `revision`.
pub async fn rollback_app(
    State(app): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<RollbackInput>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = bearer(&headers)?;
    let input = body(payload)?;
    if input.revision.trim().is_empty() {
        return Err(AppError::bad_request("revision must not be empty"));
    }
    let request = ActionRequest::rollback(id, input.revision);
    let updated = app.orchestrator.execute(&request, &token).await?;
    Ok(Json(with_actions(&updated)))
}
