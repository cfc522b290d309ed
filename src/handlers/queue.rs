use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, BookingError};
use crate::models::BucketKey;
use crate::state::AppState;

// GET /api/slots
#[derive(Serialize)]
pub struct SlotsResponse {
    time_slots: Vec<String>,
    capacity: u32,
    window_days: u32,
    first_day: NaiveDate,
    last_day: NaiveDate,
}

pub async fn get_slots(State(state): State<Arc<AppState>>) -> Json<SlotsResponse> {
    let (first_day, last_day) = state.booking.window(state.clock.today());
    Json(SlotsResponse {
        time_slots: state.booking.time_slots.clone(),
        capacity: state.booking.capacity,
        window_days: state.booking.window_days,
        first_day,
        last_day,
    })
}

// GET /api/queue?date=YYYY-MM-DD&time_slot=...
#[derive(Deserialize)]
pub struct QueueQuery {
    pub date: NaiveDate,
    pub time_slot: String,
}

#[derive(Serialize)]
pub struct QueueResponse {
    date: NaiveDate,
    time_slot: String,
    occupancy: usize,
    capacity: u32,
    queue_number: u32,
    full: bool,
}

pub async fn check_queue(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<QueueResponse>, AppError> {
    if !state.booking.is_known_slot(&query.time_slot) {
        return Err(BookingError::UnknownTimeSlot(query.time_slot).into());
    }
    if !state.booking.accepts_date(state.clock.today(), query.date) {
        return Err(BookingError::DateOutsideWindow {
            window_days: state.booking.window_days,
        }
        .into());
    }

    let bucket = BucketKey::new(query.date, query.time_slot);
    let check = state.allocator().check(&bucket).await?;

    Ok(Json(QueueResponse {
        date: bucket.date,
        time_slot: bucket.time_slot,
        occupancy: check.occupancy,
        capacity: check.capacity,
        queue_number: check.queue_number,
        full: check.is_full(),
    }))
}
