use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, BookingError};
use crate::models::PersistedBooking;
use crate::services::booking_form::{FormField, SubmitOutcome};
use crate::services::schedule::DEFAULT_LISTING_AMOUNT;
use crate::state::AppState;

// POST /api/bookings
#[derive(Deserialize)]
pub struct BookingPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub message: String,
    pub date: Option<NaiveDate>,
    pub time_slot: Option<String>,
}

#[derive(Serialize)]
pub struct BookingResponse {
    #[serde(flatten)]
    booking: PersistedBooking,
    capacity: u32,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BookingPayload>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let form = state.booking_form();
    form.update_field(FormField::Name, payload.name);
    form.update_field(FormField::Phone, payload.phone);
    form.update_field(FormField::Message, payload.message);

    if let Some(slot) = payload.time_slot.as_deref() {
        if !form.set_time_slot(slot).await {
            return Err(BookingError::UnknownTimeSlot(slot.to_string()).into());
        }
    }
    if !form.set_date(payload.date).await {
        return Err(BookingError::DateOutsideWindow {
            window_days: state.booking.window_days,
        }
        .into());
    }

    match form.submit().await {
        SubmitOutcome::Booked(booking) => Ok((
            StatusCode::CREATED,
            Json(BookingResponse {
                booking,
                capacity: state.booking.capacity,
            }),
        )),
        SubmitOutcome::Rejected(e) => Err(e.into()),
        SubmitOutcome::Ignored => Err(AppError::InvalidRequest(
            "a submission is already in progress".to_string(),
        )),
    }
}

// GET /api/bookings?date=YYYY-MM-DD&amount=N
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub date: Option<NaiveDate>,
    pub amount: Option<usize>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<PersistedBooking>>, AppError> {
    let day = query.date.unwrap_or_else(|| state.clock.today());
    let amount = query.amount.unwrap_or(DEFAULT_LISTING_AMOUNT);

    let bookings = state.schedule().day_queue(day, amount).await?;
    Ok(Json(bookings))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PersistedBooking>, AppError> {
    state
        .schedule()
        .find_booking(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}
