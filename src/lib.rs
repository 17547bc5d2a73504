//! TeamUp backend: team formation requests stored in MongoDB, served over HTTP.

pub mod app_state;
pub mod config;
pub mod db;
pub mod errors;
pub mod migrate;
pub mod models;
pub mod requests;
pub mod status;

use actix_cors::Cors;
use actix_web::{http, web};

use crate::config::Config;
use crate::errors::ApiError;

/// Registers every route plus the JSON extractor settings and the 404 fallback.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(status::root))
        .route("/health", web::get().to(status::health))
        .service(
            web::scope("/api/requests")
                .route("", web::get().to(requests::list_requests))
                .route("/", web::get().to(requests::list_requests))
                .route("", web::post().to(requests::create_request))
                .route("/", web::post().to(requests::create_request))
                .route("/{id}", web::put().to(requests::update_request))
                .route("/{id}", web::delete().to(requests::delete_request)),
        )
        .default_service(web::to(status::not_found));
}

/// Malformed or wrongly shaped bodies become 422 `{"detail": ...}`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::InvalidPayload(err.to_string()).into())
}

pub fn cors(config: &Config) -> Cors {
    let cors = if config.cors_origin.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        Cors::default().allowed_origin(config.cors_origin.trim())
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .max_age(3600)
}
