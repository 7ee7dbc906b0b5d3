use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use north_api::{create_app, AppState};
use north_audit::MemoryAuditStore;
use north_policy::PolicyEngine;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app_with_store() -> (Router, Arc<MemoryAuditStore>) {
    let store = Arc::new(MemoryAuditStore::new());
    let state = AppState::new(PolicyEngine::builtin(), store.clone(), 16).unwrap();
    (create_app(state), store)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn post_evaluate(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/evaluate")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn wait_for_records(store: &MemoryAuditStore, count: usize) {
    for _ in 0..200 {
        if store.len().await >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("audit records never arrived");
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app_with_store();
    let response = app
        .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["policyVersion"], "2026.02");
}

#[tokio::test]
async fn test_evaluate_blocks_destructive_global_change() {
    let (app, store) = app_with_store();
    let request = post_evaluate(
        &json!({
            "env": "prod",
            "actionCategory": "delete",
            "reversible": false,
            "blastRadius": 10,
            "governanceMissing": ["approval"]
        })
        .to_string(),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["policy"]["decision"], "BLOCK");
    assert_eq!(body["policy"]["riskLevel"], "CRITICAL");
    assert_eq!(body["nextSteps"], json!(["block_execution", "escalate_to_oncall"]));
    assert_eq!(body["decisionId"].as_str().unwrap().len(), 32);
    assert_eq!(body["input"]["environment"], "prod");
    assert!(body["summary"].as_str().unwrap().contains("BLOCK"));

    wait_for_records(&store, 1).await;
}

#[tokio::test]
async fn test_request_id_header_is_used() {
    let (app, store) = app_with_store();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/evaluate")
        .header("x-request-id", "chg-42")
        .body(Body::from(r#"{"env":"dev","action":"restart","blastRadius":1,"reversible":true}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "chg-42");

    let body = body_json(response).await;
    assert_eq!(body["requestId"], "chg-42");
    assert_eq!(body["policy"]["decision"], "AUTO");

    wait_for_records(&store, 1).await;
    let records = store_records(&store).await;
    assert_eq!(records[0]["requestId"], "chg-42");
    assert_eq!(records[0]["decisionId"], body["decisionId"]);
}

async fn store_records(store: &MemoryAuditStore) -> Vec<Value> {
    use north_audit::AuditStore;
    store.load_all().await.unwrap()
}

#[tokio::test]
async fn test_same_input_same_decision_id() {
    let (app, _) = app_with_store();
    let payload = r#"{"env":"staging","action":"deploy","blastRadius":"medium"}"#;

    let first = body_json(app.clone().oneshot(post_evaluate(payload)).await.unwrap()).await;
    let second = body_json(app.oneshot(post_evaluate(payload)).await.unwrap()).await;

    assert_ne!(first["requestId"], second["requestId"]);
    assert_eq!(first["decisionId"], second["decisionId"]);
    assert_eq!(first["policy"]["riskScore"], second["policy"]["riskScore"]);
}

#[tokio::test]
async fn test_unparseable_body_is_evaluated_as_empty() {
    let (app, _) = app_with_store();
    let response = app.oneshot(post_evaluate("not json at all")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["input"]["environment"], "unknown");
    assert_eq!(body["policy"]["confidence"], 0.55);
}

#[tokio::test]
async fn test_decision_metrics_after_evaluations() {
    let (app, store) = app_with_store();

    for payload in [
        r#"{"env":"dev","action":"restart","blastRadius":1,"reversible":true}"#,
        r#"{"env":"prod","action":"grant-role","blastRadius":3,"reversible":true}"#,
    ] {
        app.clone().oneshot(post_evaluate(payload)).await.unwrap();
    }
    wait_for_records(&store, 2).await;

    let response = app
        .oneshot(Request::builder().uri("/v1/metrics/decisions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;

    assert_eq!(body["ok"], true);
    assert_eq!(body["metrics"]["totalDecisions"], 2);
    assert_eq!(body["metrics"]["byDecision"]["AUTO"], 1);
    assert_eq!(body["metrics"]["byDecision"]["APPROVAL"], 1);
}

#[tokio::test]
async fn test_policy_endpoint() {
    let (app, _) = app_with_store();
    let response = app
        .oneshot(Request::builder().uri("/v1/policy").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;

    assert_eq!(body["policy"]["policyVersion"], "2026.02");
    assert_eq!(body["policy"]["thresholds"]["CRITICAL"], 85);
    assert_eq!(body["policy"]["strictProduction"], true);
}

#[tokio::test]
async fn test_prometheus_counters() {
    let (app, _) = app_with_store();
    app.clone()
        .oneshot(post_evaluate(r#"{"env":"prod","action":"grant-role","blastRadius":3,"reversible":true}"#))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("north_decisions_total"));
    assert!(text.contains(r#"guardrail="GR_PROD_ACCESS_CONTROL""#));
}
