// src/requests.rs

use actix_web::{web, HttpResponse};
use log::{debug, info, warn};
use serde_json::json;

use crate::app_state::AppState;
use crate::errors::ApiError;
use crate::models::{now_millis, DeleteRequestPayload, TeamRequestPayload};

/// GET /api/requests
/// Every request, oldest first.
pub async fn list_requests(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let requests = data.store.list().await?;
    debug!("Listing {} team requests", requests.len());
    Ok(HttpResponse::Ok().json(requests))
}

/// POST /api/requests
pub async fn create_request(
    data: web::Data<AppState>,
    payload: web::Json<TeamRequestPayload>,
) -> Result<HttpResponse, ApiError> {
    let created = data.store.insert(payload.into_inner(), now_millis()).await?;
    info!("Team request created: {}", created.id);
    Ok(HttpResponse::Created().json(created))
}

/// PUT /api/requests/{id}
/// Full replacement, allowed only when the payload carries the owner's fingerprint.
pub async fn update_request(
    data: web::Data<AppState>,
    id: web::Path<String>,
    payload: web::Json<TeamRequestPayload>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let payload = payload.into_inner();

    let mut request = data
        .store
        .get(&id)
        .await?
        .ok_or_else(ApiError::request_not_found)?;

    if !request.is_owned_by(&payload.owner_fingerprint) {
        warn!("Rejected update of team request {}: fingerprint mismatch", id);
        return Err(ApiError::Forbidden(
            "Not authorized to update this request".to_string(),
        ));
    }

    request.overwrite(payload, data.config.update_owner_check);

    // Deleted between the lookup and the write.
    if !data.store.replace(&request).await? {
        return Err(ApiError::request_not_found());
    }

    info!("Team request updated: {}", id);
    Ok(HttpResponse::Ok().json(request))
}

/// DELETE /api/requests/{id}
pub async fn delete_request(
    data: web::Data<AppState>,
    id: web::Path<String>,
    payload: web::Json<DeleteRequestPayload>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();

    let request = data
        .store
        .get(&id)
        .await?
        .ok_or_else(ApiError::request_not_found)?;

    if !request.is_owned_by(&payload.owner_fingerprint) {
        warn!("Rejected delete of team request {}: fingerprint mismatch", id);
        return Err(ApiError::Forbidden(
            "Not authorized to delete this request".to_string(),
        ));
    }

    if !data.store.delete(&id).await? {
        debug!("Team request {} was already gone", id);
    }

    info!("Team request deleted: {}", id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Request deleted successfully" })))
}
