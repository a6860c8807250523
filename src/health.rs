use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::error;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub timestamp: String,
    pub database: &'static str,
    pub service: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthBody>) {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthBody {
                status: "healthy",
                timestamp,
                database: "connected",
                service: "motortech-backend",
            }),
        ),
        Err(e) => {
            error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthBody {
                    status: "unhealthy",
                    timestamp,
                    database: "disconnected",
                    service: "motortech-backend",
                }),
            )
        }
    }
}
