//! Configuration module

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Feature store connection URL (read-only SQLite artifact)
    pub store_url: String,

    /// Path to the trained model artifact
    pub model_path: String,

    /// Path to the prediction audit log; empty disables auditing
    pub audit_log_path: String,

    /// Server port
    pub port: u16,

    /// Decision threshold: score strictly greater -> prediction 1
    pub decision_threshold: f64,

    /// Fill value for features still missing after assembly
    pub missing_fill_value: f64,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            store_url: env::var("FEATURE_STORE_URL")
                .unwrap_or_else(|_| "sqlite://data/feature_store.db?mode=ro".to_string()),

            model_path: env::var("MODEL_PATH")
                .unwrap_or_else(|_| "model/model.json".to_string()),

            audit_log_path: env::var("AUDIT_LOG_PATH")
                .unwrap_or_else(|_| "data/predictions_log.csv".to_string()),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            decision_threshold: env::var("DECISION_THRESHOLD")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0.5),

            missing_fill_value: env::var("MISSING_FILL_VALUE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
