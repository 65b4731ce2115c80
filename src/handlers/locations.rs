use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Car, Location};
use crate::state::AppState;

use super::require_principal;

#[derive(Serialize)]
pub struct LocationResponse {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
}

fn location_response(l: Location) -> LocationResponse {
    LocationResponse {
        id: l.id,
        name: l.name,
        address: l.address,
        city: l.city,
    }
}

// GET /api/locations
pub async fn list_locations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LocationResponse>>, AppError> {
    let locations = {
        let db = state.db.lock().unwrap();
        queries::list_locations(&db)?
    };

    Ok(Json(locations.into_iter().map(location_response).collect()))
}

// GET /api/locations/:id
pub async fn get_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LocationResponse>, AppError> {
    let location = {
        let db = state.db.lock().unwrap();
        queries::get_location(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("location {id}")))?
    };

    Ok(Json(location_response(location)))
}

// GET /api/locations/:id/cars: available cars stationed at the location
pub async fn list_location_cars(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Car>>, AppError> {
    let cars = {
        let db = state.db.lock().unwrap();
        queries::get_location(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("location {id}")))?;
        queries::get_cars_for_location(&db, &id)?
    };

    Ok(Json(cars))
}

// POST /api/locations and PUT /api/locations/:id
#[derive(Deserialize)]
pub struct LocationPayload {
    pub name: String,
    pub address: String,
    pub city: String,
}

fn validate_location_payload(payload: &LocationPayload) -> Result<(), AppError> {
    if payload.name.trim().is_empty()
        || payload.address.trim().is_empty()
        || payload.city.trim().is_empty()
    {
        return Err(AppError::Validation(
            "name, address and city are required".to_string(),
        ));
    }
    Ok(())
}

pub async fn create_location(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LocationPayload>,
) -> Result<(StatusCode, Json<LocationResponse>), AppError> {
    require_principal(&state, &headers).await?;
    validate_location_payload(&payload)?;

    let location = Location {
        id: uuid::Uuid::new_v4().to_string(),
        name: payload.name,
        address: payload.address,
        city: payload.city,
        created_at: Utc::now().naive_utc(),
    };

    {
        let db = state.db.lock().unwrap();
        queries::create_location(&db, &location)?;
    }

    Ok((StatusCode::CREATED, Json(location_response(location))))
}

pub async fn update_location(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<LocationPayload>,
) -> Result<Json<LocationResponse>, AppError> {
    require_principal(&state, &headers).await?;
    validate_location_payload(&payload)?;

    let location = {
        let db = state.db.lock().unwrap();
        let mut location = queries::get_location(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("location {id}")))?;
        location.name = payload.name;
        location.address = payload.address;
        location.city = payload.city;
        queries::update_location(&db, &location)?;
        location
    };

    Ok(Json(location_response(location)))
}

// DELETE /api/locations/:id
pub async fn delete_location(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_principal(&state, &headers).await?;

    let deleted = {
        let db = state.db.lock().unwrap();
        queries::delete_location(&db, &id)?
    };

    if deleted {
        Ok(Json(serde_json::json!({ "ok": true })))
    } else {
        Err(AppError::NotFound(format!("location {id}")))
    }
}
