use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{Map, Value};
use switchboard_core::orchestrator::{MergedAction, TriggerOutcome};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub action_name: String,
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
}

/// GET /actions: every cataloged action merged with its record.
pub async fn list_actions(
    State(app): State<AppState>,
) -> Result<Json<Vec<MergedAction>>, AppError> {
    Ok(Json(app.orchestrator.list_actions().await?))
}

/// POST /actions/trigger: validate, run and record one action.
pub async fn trigger_action(
    State(app): State<AppState>,
    payload: Result<Json<TriggerRequest>, JsonRejection>,
) -> Result<Json<TriggerOutcome>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let outcome = app
        .orchestrator
        .trigger_action(&req.action_name, req.parameters.unwrap_or_default())
        .await?;
    Ok(Json(outcome))
}

/// GET /actions/{name}/status: the merged descriptor for one action.
pub async fn get_status(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MergedAction>, AppError> {
    Ok(Json(app.orchestrator.get_status(&name).await?))
}

/// POST /actions/{name}/toggle: set the enabled flag from `{ "enable": bool }`.
pub async fn toggle_action(
    State(app): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MergedAction>, AppError> {
    let Json(body) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let enable = body
        .get("enable")
        .and_then(Value::as_bool)
        .ok_or_else(|| AppError::bad_request("'enable' must be a boolean"))?;
    Ok(Json(app.orchestrator.toggle_action(&name, enable).await?))
}
