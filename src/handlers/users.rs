use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::UserProfile;
use crate::state::AppState;

use super::bookings::{booking_response, BookingListItem};
use super::require_principal;

#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

fn profile_response(user: UserProfile) -> ProfileResponse {
    ProfileResponse {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        phone: user.phone,
    }
}

// GET /api/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, AppError> {
    let principal = require_principal(&state, &headers).await?;

    let user = {
        let db = state.db.lock().unwrap();
        queries::get_user(&db, &principal)?
            .ok_or_else(|| AppError::NotFound("no profile for this account yet".to_string()))?
    };

    Ok(Json(profile_response(user)))
}

// PUT /api/me: create or update the profile for the current principal
#[derive(Deserialize)]
pub struct ProfilePayload {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ProfilePayload>,
) -> Result<Json<ProfileResponse>, AppError> {
    let principal = require_principal(&state, &headers).await?;

    if !payload.email.contains('@') {
        return Err(AppError::Validation("invalid email address".to_string()));
    }
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(AppError::Validation(
            "first and last name are required".to_string(),
        ));
    }

    let user = {
        let db = state.db.lock().unwrap();
        let now = Utc::now().naive_utc();
        let created_at = queries::get_user(&db, &principal)?
            .map(|existing| existing.created_at)
            .unwrap_or(now);
        let user = UserProfile {
            id: principal,
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone: payload.phone,
            created_at,
            updated_at: now,
        };
        queries::save_user(&db, &user)?;
        user
    };

    Ok(Json(profile_response(user)))
}

// GET /api/dashboard: the principal's fleet as an owner plus their rentals
#[derive(Serialize)]
pub struct FleetCarResponse {
    pub id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub daily_rate: f64,
    pub is_available: bool,
    pub main_image_url: Option<String>,
    pub pending_requests: i64,
    pub active_bookings: i64,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub fleet: Vec<FleetCarResponse>,
    pub bookings: Vec<BookingListItem>,
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, AppError> {
    let principal = require_principal(&state, &headers).await?;

    let (fleet, rentals) = {
        let db = state.db.lock().unwrap();
        (
            queries::get_fleet_overview(&db, &principal)?,
            queries::get_bookings_for_renter(&db, &principal)?,
        )
    };

    let fleet = fleet
        .into_iter()
        .map(|f| FleetCarResponse {
            id: f.car.id,
            make: f.car.make,
            model: f.car.model,
            year: f.car.year,
            daily_rate: f.car.daily_rate,
            is_available: f.car.is_available,
            main_image_url: f.car.main_image_url,
            pending_requests: f.pending_requests,
            active_bookings: f.active_bookings,
        })
        .collect();

    let bookings = rentals
        .into_iter()
        .map(|b| BookingListItem {
            booking: booking_response(b.booking),
            car_make: b.car_make,
            car_model: b.car_model,
            car_year: b.car_year,
            car_image_url: b.car_image_url,
        })
        .collect();

    Ok(Json(DashboardResponse { fleet, bookings }))
}
