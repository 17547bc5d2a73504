// src/status.rs

use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use log::warn;
use serde_json::json;

use crate::app_state::AppState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GET /
pub async fn root() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "TeamUp API is running",
        "health": "/health",
        "version": VERSION,
    }))
}

/// GET /health
/// Always 200 while the process is up; `database` reports storage reachability.
pub async fn health(data: web::Data<AppState>) -> impl Responder {
    let database = match data.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!("Health check could not reach the database: {}", e);
            "unavailable"
        }
    };

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "environment": data.config.environment,
        "version": VERSION,
        "database": database,
    }))
}

/// Fallback for every unmatched route.
pub async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(json!({ "error": "Not found" }))
}
