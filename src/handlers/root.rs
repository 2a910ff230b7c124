use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::Extension;
use serde_json::{json, Value};

use crate::database::SharedStore;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "roster-api",
        "version": version,
        "description": "School roster administration API",
        "endpoints": {
            "teachers": "/teachers[/:id] (GET, POST, PUT, PATCH, DELETE)",
            "teacher_students": "/teachers/:id/students, /teachers/:id/studentcount (GET)",
            "students": "/students[/:id] (GET, POST, PUT, PATCH, DELETE)",
            "execs": "/execs[/:id] (GET, POST, PUT, PATCH, DELETE)",
            "health": "/health",
        }
    }))
}

/// GET /health - storage reachability
pub async fn health(Extension(store): Extension<SharedStore>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "storage": store.backend(),
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "storage": store.backend(),
                    "error": "storage unavailable",
                })),
            )
        }
    }
}
