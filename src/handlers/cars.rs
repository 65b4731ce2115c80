use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Car, CarBlock, CarFilters, DateRange};
use crate::services::scheduling::{self, ConflictWindow};
use crate::state::AppState;

use super::require_principal;

// GET /api/cars
#[derive(Deserialize)]
pub struct CarListQuery {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub category: Option<String>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub seats: Option<i32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub location_id: Option<String>,
    pub include_unavailable: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct CarSummary {
    pub id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub category: String,
    pub transmission: String,
    pub fuel_type: String,
    pub seats: i32,
    pub daily_rate: f64,
    pub main_image_url: Option<String>,
    pub is_available: bool,
    pub location_name: Option<String>,
    pub location_city: Option<String>,
}

#[derive(Serialize)]
pub struct CarListResponse {
    pub cars: Vec<CarSummary>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

pub async fn list_cars(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CarListQuery>,
) -> Result<Json<CarListResponse>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let filters = CarFilters {
        make: query.make,
        model: query.model,
        year: query.year,
        category: query.category,
        transmission: query.transmission,
        fuel_type: query.fuel_type,
        seats: query.seats,
        min_price: query.min_price,
        max_price: query.max_price,
        location_id: query.location_id,
        include_unavailable: query.include_unavailable.unwrap_or(false),
    };

    let (listings, total) = {
        let db = state.db.lock().unwrap();
        queries::list_cars(&db, &filters, page, limit)?
    };

    let cars = listings
        .into_iter()
        .map(|l| CarSummary {
            id: l.car.id,
            make: l.car.make,
            model: l.car.model,
            year: l.car.year,
            category: l.car.category,
            transmission: l.car.transmission,
            fuel_type: l.car.fuel_type,
            seats: l.car.seats,
            daily_rate: l.car.daily_rate,
            main_image_url: l.car.main_image_url,
            is_available: l.car.is_available,
            location_name: l.location_name,
            location_city: l.location_city,
        })
        .collect();

    Ok(Json(CarListResponse {
        cars,
        total,
        page,
        total_pages: (total + limit - 1) / limit,
    }))
}

// GET /api/cars/:id
#[derive(Serialize)]
pub struct CarImageResponse {
    pub image_url: String,
    pub is_primary: bool,
}

#[derive(Serialize)]
pub struct CarReviewResponse {
    pub rating: i32,
    pub comment: Option<String>,
    pub author_name: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct CarDetailResponse {
    pub id: String,
    pub owner_id: String,
    pub owner_name: Option<String>,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub category: String,
    pub transmission: String,
    pub fuel_type: String,
    pub seats: i32,
    pub daily_rate: f64,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub main_image_url: Option<String>,
    pub is_available: bool,
    pub location: Option<LocationSummary>,
    pub images: Vec<CarImageResponse>,
    pub reviews: Vec<CarReviewResponse>,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct LocationSummary {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
}

pub async fn get_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CarDetailResponse>, AppError> {
    let db = state.db.lock().unwrap();

    let car = queries::get_car(&db, &id)?.ok_or_else(|| AppError::NotFound(format!("car {id}")))?;
    let owner_name = queries::get_user(&db, &car.owner_id)?.map(|u| u.display_name());
    let location = match &car.location_id {
        Some(location_id) => queries::get_location(&db, location_id)?.map(|l| LocationSummary {
            id: l.id,
            name: l.name,
            address: l.address,
            city: l.city,
        }),
        None => None,
    };
    let images = queries::get_car_images(&db, &id)?
        .into_iter()
        .map(|img| CarImageResponse {
            image_url: img.image_url,
            is_primary: img.is_primary,
        })
        .collect();
    let reviews = queries::get_reviews_for_car(&db, &id)?
        .into_iter()
        .map(|r| CarReviewResponse {
            rating: r.review.rating,
            comment: r.review.comment,
            author_name: r.author_name,
            created_at: r.review.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();

    Ok(Json(CarDetailResponse {
        id: car.id,
        owner_id: car.owner_id,
        owner_name,
        make: car.make,
        model: car.model,
        year: car.year,
        category: car.category,
        transmission: car.transmission,
        fuel_type: car.fuel_type,
        seats: car.seats,
        daily_rate: car.daily_rate,
        description: car.description,
        features: car.features,
        main_image_url: car.main_image_url,
        is_available: car.is_available,
        location,
        images,
        reviews,
        created_at: car.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    }))
}

// POST /api/cars and PUT /api/cars/:id
#[derive(Deserialize)]
pub struct CarPayload {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub category: String,
    pub transmission: String,
    pub fuel_type: String,
    pub seats: i32,
    pub daily_rate: f64,
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub location_id: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub is_available: Option<bool>,
}

fn validate_car_payload(payload: &CarPayload) -> Result<(), AppError> {
    if payload.make.trim().is_empty() || payload.model.trim().is_empty() {
        return Err(AppError::Validation("make and model are required".to_string()));
    }
    if !(1950..=2100).contains(&payload.year) {
        return Err(AppError::Validation(format!("implausible year {}", payload.year)));
    }
    if payload.seats < 1 {
        return Err(AppError::Validation("seats must be at least 1".to_string()));
    }
    if payload.daily_rate <= 0.0 {
        return Err(AppError::Validation("daily rate must be positive".to_string()));
    }
    Ok(())
}

pub async fn create_car(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CarPayload>,
) -> Result<(StatusCode, Json<Car>), AppError> {
    let principal = require_principal(&state, &headers).await?;
    validate_car_payload(&payload)?;

    let car = {
        let db = state.db.lock().unwrap();

        if queries::get_user(&db, &principal)?.is_none() {
            return Err(AppError::Validation(
                "no profile for this account yet".to_string(),
            ));
        }
        if let Some(location_id) = &payload.location_id {
            if queries::get_location(&db, location_id)?.is_none() {
                return Err(AppError::Validation(format!("unknown location {location_id}")));
            }
        }

        let image_urls = payload.image_urls.unwrap_or_default();
        let now = Utc::now().naive_utc();
        let car = Car {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: principal,
            location_id: payload.location_id,
            make: payload.make,
            model: payload.model,
            year: payload.year,
            category: payload.category,
            transmission: payload.transmission,
            fuel_type: payload.fuel_type,
            seats: payload.seats,
            daily_rate: payload.daily_rate,
            description: payload.description,
            features: payload.features,
            main_image_url: image_urls.first().cloned(),
            is_available: payload.is_available.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        queries::create_car(&db, &car)?;
        if !image_urls.is_empty() {
            queries::replace_car_images(&db, &car.id, &image_urls)?;
        }
        car
    };

    Ok((StatusCode::CREATED, Json(car)))
}

pub async fn update_car(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<CarPayload>,
) -> Result<Json<Car>, AppError> {
    let principal = require_principal(&state, &headers).await?;
    validate_car_payload(&payload)?;

    let car = {
        let db = state.db.lock().unwrap();

        let mut car = queries::get_car(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("car {id}")))?;
        if car.owner_id != principal {
            return Err(AppError::Forbidden(
                "you do not own this car listing".to_string(),
            ));
        }
        if let Some(location_id) = &payload.location_id {
            if queries::get_location(&db, location_id)?.is_none() {
                return Err(AppError::Validation(format!("unknown location {location_id}")));
            }
        }

        car.location_id = payload.location_id;
        car.make = payload.make;
        car.model = payload.model;
        car.year = payload.year;
        car.category = payload.category;
        car.transmission = payload.transmission;
        car.fuel_type = payload.fuel_type;
        car.seats = payload.seats;
        car.daily_rate = payload.daily_rate;
        car.description = payload.description;
        car.features = payload.features;
        if let Some(is_available) = payload.is_available {
            car.is_available = is_available;
        }
        if let Some(image_urls) = &payload.image_urls {
            queries::replace_car_images(&db, &id, image_urls)?;
            car.main_image_url = image_urls.first().cloned();
        }
        car.updated_at = Utc::now().naive_utc();
        queries::update_car(&db, &car)?;
        car
    };

    Ok(Json(car))
}

// DELETE /api/cars/:id
pub async fn delete_car(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let principal = require_principal(&state, &headers).await?;

    {
        let db = state.db.lock().unwrap();

        let car = queries::get_car(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("car {id}")))?;
        if car.owner_id != principal {
            return Err(AppError::Forbidden(
                "you do not own this car listing".to_string(),
            ));
        }
        queries::delete_car(&db, &id)?;
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}

// GET /api/cars/:id/availability
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
    pub conflict: Option<ConflictWindow>,
}

pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let range = DateRange::new(query.start_date, query.end_date)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let conflict = {
        let db = state.db.lock().unwrap();
        scheduling::check_availability(&db, &id, &range)?
    };

    Ok(Json(AvailabilityResponse {
        available: conflict.is_none(),
        conflict,
    }))
}

// ── Availability blocks ──

#[derive(Serialize)]
pub struct BlockResponse {
    pub id: String,
    pub car_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

fn block_response(block: CarBlock) -> BlockResponse {
    BlockResponse {
        id: block.id,
        car_id: block.car_id,
        start_date: block.start_date,
        end_date: block.end_date,
        reason: block.reason,
    }
}

fn require_car_owner(
    db: &rusqlite::Connection,
    car_id: &str,
    principal: &str,
) -> Result<(), AppError> {
    let car = queries::get_car(db, car_id)?
        .ok_or_else(|| AppError::NotFound(format!("car {car_id}")))?;
    if car.owner_id != principal {
        return Err(AppError::Forbidden(
            "you do not own this car listing".to_string(),
        ));
    }
    Ok(())
}

// GET /api/cars/:id/blocks
pub async fn list_blocks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<BlockResponse>>, AppError> {
    let principal = require_principal(&state, &headers).await?;

    let blocks = {
        let db = state.db.lock().unwrap();
        require_car_owner(&db, &id, &principal)?;
        queries::get_blocks_for_car(&db, &id)?
    };

    Ok(Json(blocks.into_iter().map(block_response).collect()))
}

// POST /api/cars/:id/blocks
#[derive(Deserialize)]
pub struct BlockPayload {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

pub async fn create_block(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<BlockPayload>,
) -> Result<(StatusCode, Json<BlockResponse>), AppError> {
    let principal = require_principal(&state, &headers).await?;
    let range = DateRange::new(payload.start_date, payload.end_date)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let block = {
        let db = state.db.lock().unwrap();
        require_car_owner(&db, &id, &principal)?;

        let block = CarBlock {
            id: uuid::Uuid::new_v4().to_string(),
            car_id: id,
            start_date: range.start_date,
            end_date: range.end_date,
            reason: payload.reason,
            created_at: Utc::now().naive_utc(),
        };
        queries::insert_block(&db, &block)?;
        block
    };

    Ok((StatusCode::CREATED, Json(block_response(block))))
}

// DELETE /api/blocks/:id
pub async fn delete_block(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let principal = require_principal(&state, &headers).await?;

    {
        let db = state.db.lock().unwrap();
        let block = queries::get_block(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("block {id}")))?;
        require_car_owner(&db, &block.car_id, &principal)?;
        queries::delete_block(&db, &id)?;
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}
