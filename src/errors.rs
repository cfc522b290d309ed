use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::store::StoreError;

/// Failures surfaced to the person filling in the booking form.
///
/// The `Display` text is the user-facing notification; `Persistence` keeps the
/// underlying cause for logs only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("Please select a date and time slot.")]
    MissingSelection,

    #[error("Please fill in the {0} field.")]
    MissingField(&'static str),

    #[error("Please select a date within the next {window_days} days.")]
    DateOutsideWindow { window_days: u32 },

    #[error("Unknown time slot: {0}")]
    UnknownTimeSlot(String),

    #[error("This time slot is full. Please select a different time slot.")]
    SlotFull { capacity: u32 },

    #[error("Error submitting the form. Please try again later.")]
    Persistence(String),
}

impl BookingError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BookingError::MissingSelection
                | BookingError::MissingField(_)
                | BookingError::DateOutsideWindow { .. }
                | BookingError::UnknownTimeSlot(_)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Booking(#[from] BookingError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Booking(e) if e.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Booking(BookingError::SlotFull { .. }) => StatusCode::CONFLICT,
            AppError::Booking(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
