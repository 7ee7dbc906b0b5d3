//! North API /v1: change evaluation over HTTP
pub mod cli;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod telemetry;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use north_audit::{AuditDispatcher, AuditStore, FsAuditStore};
use north_policy::PolicyEngine;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use config::ServiceConfig;
pub use metrics::DecisionCounters;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PolicyEngine>,
    pub store: Arc<dyn AuditStore>,
    pub dispatcher: Arc<AuditDispatcher>,
    pub counters: Arc<DecisionCounters>,
}

impl AppState {
    /// Wire an engine to a store. Spawns the audit worker, so it must run
    /// inside a tokio runtime.
    pub fn new(
        engine: PolicyEngine,
        store: Arc<dyn AuditStore>,
        audit_queue: usize,
    ) -> anyhow::Result<Self> {
        let counters = DecisionCounters::new().context("failed to register prometheus counters")?;
        Ok(Self {
            engine: Arc::new(engine),
            dispatcher: Arc::new(AuditDispatcher::spawn(store.clone(), audit_queue)),
            store,
            counters: Arc::new(counters),
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/evaluate", post(handlers::evaluate))
        .route("/v1/metrics/decisions", get(handlers::decision_metrics))
        .route("/v1/policy", get(handlers::policy))
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::prometheus_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors())
        .with_state(state)
}

/// Serve until ctrl-c, then drain the audit queue
pub async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    let policy = config.load_policy().context("failed to load policy")?;
    let engine = PolicyEngine::new(policy).context("invalid policy")?;
    let store: Arc<dyn AuditStore> = Arc::new(FsAuditStore::new(&config.audit_dir));
    let state = AppState::new(engine, store, config.audit_queue)?;
    let dispatcher = state.dispatcher.clone();

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(
        addr = %config.addr,
        audit_dir = %config.audit_dir.display(),
        policy_version = %state.engine.policy_version(),
        "North API listening"
    );

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    match Arc::try_unwrap(dispatcher) {
        Ok(dispatcher) => dispatcher.shutdown().await,
        Err(_) => warn!("audit dispatcher still in use, queued records may be lost"),
    }
    info!("North API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
