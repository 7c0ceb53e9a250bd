//! Credit Scoring API server
//!
//! Serves real-time default-risk scores from a pre-trained gradient-boosted
//! tree model.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                  CREDIT SCORING SERVICE                    │
//! ├────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌────────────┐   ┌──────────────────────┐  │
//! │  │  API     │   │  Feature   │   │  Inference /         │  │
//! │  │  Façade  │──▶│  Assembly  │──▶│  Explainability      │  │
//! │  │  (Axum)  │   │            │   │  (GBT ensemble)      │  │
//! │  └──────────┘   └─────┬──────┘   └──────────┬───────────┘  │
//! │                       ▼                     ▼              │
//! │               ┌──────────────┐      ┌──────────────┐       │
//! │               │ SQLite       │      │ Audit log    │       │
//! │               │ feature store│      │ (CSV, opt.)  │       │
//! │               └──────────────┘      └──────────────┘       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store, model, and attribution baseline are initialized once at
//! startup and shared read-only across requests. A component that fails to
//! initialize is marked unavailable - the process still starts, and every
//! request touching it gets the dedicated 503, never a fabricated score.

mod audit;
mod config;
mod error;
mod handlers;
mod models;
mod scoring;
mod store;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{ApiResult, ScoringError};

use scoring::explain::Explainer;
use scoring::gbdt::GbdtModel;
use scoring::inference::InferenceEngine;
use store::FeatureStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credit_scoring_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("Credit Scoring API starting...");
    tracing::info!("Feature store: {}", config.store_url);
    tracing::info!("Model artifact: {}", config.model_path);

    let state = build_state(config.clone()).await;
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared application state: every process-wide handle, initialized once.
///
/// `None` marks a component that failed to initialize; request paths
/// translate that into the matching unavailable error.
#[derive(Clone)]
pub struct AppState {
    pub store: Option<Arc<FeatureStore>>,
    pub engine: Option<Arc<InferenceEngine>>,
    pub explainer: Option<Arc<Explainer>>,
    pub audit: Option<Arc<audit::AuditLog>>,
    pub config: config::Config,
}

impl AppState {
    pub fn store(&self) -> Result<&FeatureStore, ScoringError> {
        self.store
            .as_deref()
            .ok_or_else(|| ScoringError::StoreUnavailable("not initialized".into()))
    }

    pub fn engine(&self) -> Result<&InferenceEngine, ScoringError> {
        self.engine.as_deref().ok_or(ScoringError::ModelUnavailable)
    }

    pub fn explainer(&self) -> Result<&Explainer, ScoringError> {
        self.explainer
            .as_deref()
            .ok_or(ScoringError::ExplainerUnavailable)
    }
}

/// Initialize every shared component, degrading instead of crashing
async fn build_state(config: config::Config) -> AppState {
    let store = match FeatureStore::connect(&config.store_url).await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::error!("Feature store failed to initialize: {}", e);
            None
        }
    };

    let (engine, explainer) = match GbdtModel::load(&config.model_path) {
        Ok(model) => {
            let model = Arc::new(model);
            let engine = InferenceEngine::new(
                Arc::clone(&model),
                config.decision_threshold,
                config.missing_fill_value,
            );
            let explainer = Explainer::new(model, config.missing_fill_value);
            (Some(Arc::new(engine)), Some(Arc::new(explainer)))
        }
        Err(e) => {
            tracing::error!("Model failed to initialize: {}", e);
            (None, None)
        }
    };

    // Audit columns follow the model's expected schema; without a model
    // there is nothing to score, hence nothing to audit.
    let audit = match (&engine, config.audit_log_path.as_str()) {
        (_, "") | (None, _) => None,
        (Some(engine), path) => {
            match audit::AuditLog::create(Path::new(path), engine.expected_columns()) {
                Ok(log) => Some(Arc::new(log)),
                Err(e) => {
                    tracing::warn!("Audit log disabled, failed to open {}: {}", path, e);
                    None
                }
            }
        }
    };

    AppState {
        store,
        engine,
        explainer,
        audit,
        config,
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/score", post(handlers::score::score))
        .route("/api/v1/explain/:client_id", get(handlers::explain::explain))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use scoring::gbdt::{Tree, TreeNode};
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    fn fixture_model() -> GbdtModel {
        let model = GbdtModel {
            feature_names: vec!["income_credit_pct".into(), "payment_rate".into()],
            num_class: 1,
            base_score: -1.2,
            learning_rate: 1.0,
            trees: vec![Tree {
                class_index: 0,
                nodes: vec![
                    TreeNode {
                        feature: 0,
                        threshold: 0.4,
                        left: Some(1),
                        right: Some(2),
                        value: None,
                        cover: 100.0,
                    },
                    TreeNode {
                        feature: 0,
                        threshold: 0.0,
                        left: None,
                        right: None,
                        value: Some(2.0),
                        cover: 55.0,
                    },
                    TreeNode {
                        feature: 0,
                        threshold: 0.0,
                        left: None,
                        right: None,
                        value: Some(-0.7),
                        cover: 45.0,
                    },
                ],
            }],
        };
        model.validate().expect("fixture model is valid");
        model
    }

    async fn seeded_store(dir: &std::path::Path) -> FeatureStore {
        let path = dir.join("feature_store.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
        sqlx::query(
            "CREATE TABLE features (
                client_id INTEGER PRIMARY KEY,
                credit_amount REAL,
                income_total REAL,
                annuity REAL,
                days_birth REAL,
                days_employed REAL,
                income_credit_pct REAL,
                payment_rate REAL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO features VALUES
                (100002, 406597.5, 202500.0, 24700.5, -9461.0, -637.0, 0.0, 0.0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;

        FeatureStore::connect(&format!("sqlite://{}?mode=ro", path.display()))
            .await
            .unwrap()
    }

    async fn test_state(dir: &std::path::Path, with_model: bool) -> AppState {
        let store = Some(Arc::new(seeded_store(dir).await));
        let (engine, explainer) = if with_model {
            let model = Arc::new(fixture_model());
            (
                Some(Arc::new(InferenceEngine::new(Arc::clone(&model), 0.5, 0.0))),
                Some(Arc::new(Explainer::new(model, 0.0))),
            )
        } else {
            (None, None)
        };

        AppState {
            store,
            engine,
            explainer,
            audit: None,
            config: config::Config::from_env(),
        }
    }

    fn score_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/score")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn full_payload(client_id: i64) -> serde_json::Value {
        serde_json::json!({
            "client_id": client_id,
            "credit_amount": 406597.5,
            "income_total": 202500.0,
            "annuity": 24700.5,
            "days_birth": -9461,
            "days_employed": -637
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_component_availability() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), false).await);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["store_available"], true);
        assert_eq!(body["model_available"], false);
    }

    #[tokio::test]
    async fn test_score_known_client() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), true).await);

        let response = app.oneshot(score_request(full_payload(100002))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let score = body["score"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&score));
        // income_credit_pct ≈ 0.498 > 0.4 -> right leaf -0.7, margin -1.9
        assert_eq!(body["prediction"], 0);
    }

    #[tokio::test]
    async fn test_unknown_client_is_404_not_a_crash() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), true).await);

        let response = app
            .oneshot(score_request(full_payload(999_999_999)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_missing_mandatory_field_is_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), true).await);

        let mut payload = full_payload(100002);
        payload.as_object_mut().unwrap().remove("client_id");

        let response = app.oneshot(score_request(payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_invalid_override_is_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), true).await);

        let mut payload = full_payload(100002);
        payload["credit_amount"] = serde_json::json!(-5.0);

        let response = app.oneshot(score_request(payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_model_unavailable_is_503_on_every_call() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), false).await;

        for _ in 0..3 {
            let app = create_router(state.clone());
            let response = app.oneshot(score_request(full_payload(100002))).await.unwrap();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }
    }

    #[tokio::test]
    async fn test_explain_known_client() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), true).await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/explain/100002")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let attributions = body["attributions"].as_array().unwrap();
        let names = body["feature_names"].as_array().unwrap();
        let values = body["feature_values"].as_array().unwrap();
        assert_eq!(attributions.len(), names.len());
        assert_eq!(values.len(), names.len());
        assert!(body["base_value"].is_number());
    }

    #[tokio::test]
    async fn test_explain_unavailable_explainer_is_503() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path(), false).await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/explain/100002")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
