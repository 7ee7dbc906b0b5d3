//! API Handlers
use crate::middleware::{request_id, request_id_value, REQUEST_ID_HEADER};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use north_audit::collect;
use north_core::{EvaluationContext, NORTH_VERSION};
use north_in::ChangeRequest;
use north_policy::{AuditRecord, DecisionId, PolicyEvaluation};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

/// Failure surfaced to HTTP callers as `{ok: false, error}`
#[derive(Debug)]
pub struct ApiError(String);

impl<E: std::error::Error> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "ok": false, "error": self.0 })),
        )
            .into_response()
    }
}

/// Body of a successful evaluation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub ok: bool,
    pub request_id: String,
    pub timestamp: String,
    pub decision_id: DecisionId,
    pub input: ChangeRequest,
    pub policy: PolicyEvaluation,
    pub next_steps: Vec<&'static str>,
    pub summary: String,
}

impl EvaluateResponse {
    pub fn new(context: &EvaluationContext, record: &AuditRecord) -> Self {
        Self {
            ok: true,
            request_id: context.request_id.clone(),
            timestamp: context.timestamp(),
            decision_id: record.decision_id.clone(),
            input: record.input.clone(),
            policy: record.policy.clone(),
            next_steps: record.policy.next_steps(),
            summary: record.policy.summary(),
        }
    }
}

/// Evaluate a change request. Any body is accepted; unparseable JSON is
/// evaluated as an empty request.
pub async fn evaluate(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let raw: Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));
    let context = EvaluationContext::with_request_id("api", request_id(&headers));

    let (request, evaluation) = state.engine.evaluate_raw(&raw);
    let record = state.engine.record(&context, &request, &evaluation);

    info!(
        request_id = %context.request_id,
        decision_id = %record.decision_id,
        environment = %request.environment,
        risk_score = evaluation.risk_score,
        risk_level = %evaluation.risk_level,
        decision = %evaluation.decision,
        "change evaluated"
    );

    state.counters.observe(&evaluation);
    let response = EvaluateResponse::new(&context, &record);
    state.dispatcher.dispatch(record);

    let mut response = (StatusCode::OK, Json(response)).into_response();
    if let Some(value) = request_id_value(&context.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

pub async fn decision_metrics(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let metrics = collect(state.store.as_ref()).await?;
    Ok(Json(json!({ "ok": true, "metrics": metrics })))
}

pub async fn policy(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "ok": true, "policy": state.engine.config() }))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": NORTH_VERSION,
            "policyVersion": state.engine.policy_version()
        })),
    )
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = crate::metrics::encode(state.counters.registry())?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
