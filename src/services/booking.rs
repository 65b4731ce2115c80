use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, DateRange, PaymentStatus, Review};
use crate::services::scheduling;

pub struct NewBooking {
    pub car_id: String,
    pub range: DateRange,
    pub pickup_location_id: Option<String>,
    pub return_location_id: Option<String>,
}

pub struct NewReview {
    pub rating: i32,
    pub comment: Option<String>,
}

/// Create a booking for the renter. The conflict check and the insert run in
/// one IMMEDIATE transaction, and the bookings_no_overlap trigger backs the
/// check at the storage level, so two racing requests for overlapping ranges
/// cannot both land.
pub fn create_booking(
    conn: &mut Connection,
    renter_id: &str,
    req: &NewBooking,
    today: NaiveDate,
) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let car = queries::get_car(&tx, &req.car_id)?
        .ok_or_else(|| AppError::NotFound(format!("car {}", req.car_id)))?;

    if !car.is_available {
        return Err(AppError::Validation("car is not open for booking".to_string()));
    }
    if req.range.start_date < today {
        return Err(AppError::Validation("start date is in the past".to_string()));
    }
    if queries::get_user(&tx, renter_id)?.is_none() {
        return Err(AppError::Validation(
            "no profile for this account yet".to_string(),
        ));
    }

    if let Some(window) = scheduling::find_conflict(&tx, &req.car_id, &req.range)? {
        return Err(AppError::Conflict(window));
    }

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        car_id: req.car_id.clone(),
        renter_id: renter_id.to_string(),
        start_date: req.range.start_date,
        end_date: req.range.end_date,
        pickup_location_id: req.pickup_location_id.clone(),
        return_location_id: req.return_location_id.clone(),
        status: BookingStatus::Pending,
        payment_status: PaymentStatus::Unpaid,
        total_price: car.daily_rate * req.range.rental_days() as f64,
        created_at: now,
        updated_at: now,
    };

    queries::insert_booking(&tx, &booking).map_err(|err| {
        if is_overlap_abort(&err) {
            match scheduling::find_conflict(&tx, &req.car_id, &req.range) {
                Ok(Some(window)) => AppError::Conflict(window),
                _ => AppError::Conflict(scheduling::ConflictWindow {
                    kind: scheduling::ConflictKind::Booking,
                    range: req.range,
                }),
            }
        } else {
            err.into()
        }
    })?;

    tx.commit()?;
    Ok(booking)
}

fn is_overlap_abort(err: &anyhow::Error) -> bool {
    err.downcast_ref::<rusqlite::Error>()
        .map(|e| e.to_string().contains("booking range overlap"))
        .unwrap_or(false)
}

/// Advance a booking along the state machine. The legality of the edge is
/// checked before the caller's authority, so probing a terminal booking
/// reports the invalid transition no matter who asks.
pub fn transition_booking(
    conn: &Connection,
    principal_id: &str,
    booking_id: &str,
    next: BookingStatus,
) -> Result<Booking, AppError> {
    let booking = queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
    let car = queries::get_car(conn, &booking.car_id)?
        .ok_or_else(|| AppError::NotFound(format!("car {}", booking.car_id)))?;

    if !booking.status.can_transition_to(next) {
        return Err(AppError::InvalidTransition {
            from: booking.status,
            to: next,
        });
    }

    match next {
        BookingStatus::Cancelled => {
            if booking.renter_id != principal_id {
                return Err(AppError::Forbidden(
                    "only the renter may cancel this booking".to_string(),
                ));
            }
        }
        BookingStatus::Confirmed | BookingStatus::Completed => {
            if car.owner_id != principal_id {
                return Err(AppError::Forbidden(
                    "only the car owner may update this booking's status".to_string(),
                ));
            }
        }
        // can_transition_to admits no edge into pending
        BookingStatus::Pending => unreachable!(),
    }

    let now = Utc::now().naive_utc();
    queries::update_booking_status(conn, booking_id, next, &now)?;

    Ok(Booking {
        status: next,
        updated_at: now,
        ..booking
    })
}

/// Attach the renter's review to a completed booking. One review per booking;
/// the UNIQUE constraint on reviews.booking_id is the storage backstop.
pub fn attach_review(
    conn: &Connection,
    principal_id: &str,
    booking_id: &str,
    req: &NewReview,
) -> Result<Review, AppError> {
    let booking = queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    if booking.renter_id != principal_id {
        return Err(AppError::Forbidden(
            "only the renter may review this booking".to_string(),
        ));
    }
    if booking.status != BookingStatus::Completed {
        return Err(AppError::Validation(
            "only completed bookings can be reviewed".to_string(),
        ));
    }
    if !(1..=5).contains(&req.rating) {
        return Err(AppError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    if queries::get_review_for_booking(conn, booking_id)?.is_some() {
        return Err(AppError::Validation(
            "this booking has already been reviewed".to_string(),
        ));
    }

    let review = Review {
        id: uuid::Uuid::new_v4().to_string(),
        booking_id: booking_id.to_string(),
        car_id: booking.car_id.clone(),
        author_id: principal_id.to_string(),
        rating: req.rating,
        comment: req.comment.clone(),
        created_at: Utc::now().naive_utc(),
    };
    queries::insert_review(conn, &review)?;

    Ok(review)
}
