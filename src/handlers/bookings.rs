use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, DateRange};
use crate::services::booking::{self, NewBooking, NewReview};
use crate::state::AppState;

use super::require_principal;

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub car_id: String,
    pub renter_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pickup_location_id: Option<String>,
    pub return_location_id: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub total_price: f64,
    pub created_at: String,
    pub updated_at: String,
}

pub(crate) fn booking_response(b: Booking) -> BookingResponse {
    BookingResponse {
        id: b.id,
        car_id: b.car_id,
        renter_id: b.renter_id,
        start_date: b.start_date,
        end_date: b.end_date,
        pickup_location_id: b.pickup_location_id,
        return_location_id: b.return_location_id,
        status: b.status.as_str().to_string(),
        payment_status: b.payment_status.as_str().to_string(),
        total_price: b.total_price,
        created_at: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        updated_at: b.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub car_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pickup_location_id: Option<String>,
    pub return_location_id: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let principal = require_principal(&state, &headers).await?;
    let range = DateRange::new(body.start_date, body.end_date)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let req = NewBooking {
        car_id: body.car_id,
        range,
        pickup_location_id: body.pickup_location_id,
        return_location_id: body.return_location_id,
    };
    let today = Utc::now().date_naive();

    let created = {
        let mut db = state.db.lock().unwrap();
        booking::create_booking(&mut db, &principal, &req, today)?
    };

    tracing::info!(booking_id = %created.id, car_id = %created.car_id, "booking created");

    Ok((StatusCode::CREATED, Json(booking_response(created))))
}

// GET /api/bookings
#[derive(Serialize)]
pub struct BookingListItem {
    #[serde(flatten)]
    pub booking: BookingResponse,
    pub car_make: String,
    pub car_model: String,
    pub car_year: i32,
    pub car_image_url: Option<String>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookingListItem>>, AppError> {
    let principal = require_principal(&state, &headers).await?;

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_bookings_for_renter(&db, &principal)?
    };

    let response = bookings
        .into_iter()
        .map(|b| BookingListItem {
            booking: booking_response(b.booking),
            car_make: b.car_make,
            car_model: b.car_model,
            car_year: b.car_year,
            car_image_url: b.car_image_url,
        })
        .collect();

    Ok(Json(response))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let principal = require_principal(&state, &headers).await?;

    let booking = {
        let db = state.db.lock().unwrap();
        let booking = queries::get_booking(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
        let car = queries::get_car(&db, &booking.car_id)?
            .ok_or_else(|| AppError::NotFound(format!("car {}", booking.car_id)))?;

        // Only the renter and the car's owner may see a booking.
        if booking.renter_id != principal && car.owner_id != principal {
            return Err(AppError::Forbidden(
                "not a party to this booking".to_string(),
            ));
        }
        booking
    };

    Ok(Json(booking_response(booking)))
}

// PATCH /api/bookings/:id
#[derive(Deserialize)]
pub struct TransitionRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<TransitionRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let principal = require_principal(&state, &headers).await?;

    let next = match body.status.as_str() {
        "pending" => BookingStatus::Pending,
        "confirmed" => BookingStatus::Confirmed,
        "cancelled" => BookingStatus::Cancelled,
        "completed" => BookingStatus::Completed,
        other => {
            return Err(AppError::Validation(format!("unknown status {other:?}")));
        }
    };

    let updated = {
        let db = state.db.lock().unwrap();
        booking::transition_booking(&db, &principal, &id, next)?
    };

    tracing::info!(booking_id = %id, status = %next, "booking status changed");

    Ok(Json(booking_response(updated)))
}

// POST /api/bookings/:id/review
#[derive(Deserialize)]
pub struct ReviewPayload {
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct ReviewResponse {
    pub id: String,
    pub booking_id: String,
    pub car_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: String,
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<ReviewPayload>,
) -> Result<(StatusCode, Json<ReviewResponse>), AppError> {
    let principal = require_principal(&state, &headers).await?;

    let review = {
        let db = state.db.lock().unwrap();
        booking::attach_review(
            &db,
            &principal,
            &id,
            &NewReview {
                rating: payload.rating,
                comment: payload.comment,
            },
        )?
    };

    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            id: review.id,
            booking_id: review.booking_id,
            car_id: review.car_id,
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }),
    ))
}
