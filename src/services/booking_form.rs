use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::BookingConfig;
use crate::errors::BookingError;
use crate::models::{BookingRequest, BucketKey, PersistedBooking};
use crate::services::allocator::QueueAllocator;
use crate::services::clock::Clock;
use crate::services::notify::Notifier;
use crate::services::store::{DocumentStore, Reservation};

pub const SUCCESS_MESSAGE: &str = "Appointment has been scheduled!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Phone,
    Message,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A submission was already in flight.
    Ignored,
    Booked(PersistedBooking),
    Rejected(BookingError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormSnapshot {
    pub request: BookingRequest,
    pub date_error: Option<String>,
    pub submitting: bool,
}

#[derive(Default)]
struct FormState {
    request: BookingRequest,
    date_error: Option<String>,
}

/// Clears the in-flight flag even if the submit future is dropped.
struct SubmittingGuard<'a>(&'a AtomicBool);

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// State and workflow behind one booking form.
///
/// Date and slot changes trigger a speculative queue lookup for display. Only
/// `submit` talks to the store with authority: it re-validates, then asks the
/// store to reserve the next number in the bucket and write the booking.
/// Every failure is turned into an error notification; nothing is returned as
/// `Err`.
pub struct BookingForm {
    config: Arc<BookingConfig>,
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    allocator: QueueAllocator,
    state: Mutex<FormState>,
    submitting: AtomicBool,
}

impl BookingForm {
    pub fn new(
        config: Arc<BookingConfig>,
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let allocator = QueueAllocator::new(store.clone(), config.clone());
        Self {
            config,
            store,
            notifier,
            clock,
            allocator,
            state: Mutex::new(FormState::default()),
            submitting: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let state = self.state();
        FormSnapshot {
            request: state.request.clone(),
            date_error: state.date_error.clone(),
            submitting: self.submitting.load(Ordering::SeqCst),
        }
    }

    pub fn update_field(&self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        let mut state = self.state();
        match field {
            FormField::Name => state.request.name = value,
            FormField::Phone => state.request.phone = value,
            FormField::Message => state.request.message = value,
        }
    }

    /// Returns false when the date falls outside the booking window.
    pub async fn set_date(&self, candidate: Option<NaiveDate>) -> bool {
        let Some(date) = candidate else {
            let mut state = self.state();
            state.request.requested_date = None;
            state.request.assigned_queue_number = 0;
            state.date_error = None;
            return true;
        };

        if !self.config.accepts_date(self.clock.today(), date) {
            let error = BookingError::DateOutsideWindow {
                window_days: self.config.window_days,
            };
            let mut state = self.state();
            state.date_error = Some(error.to_string());
            state.request.requested_date = None;
            state.request.assigned_queue_number = 0;
            return false;
        }

        {
            let mut state = self.state();
            state.date_error = None;
            state.request.requested_date = Some(date);
        }
        self.refresh_queue_number().await;
        true
    }

    /// Unknown slots are ignored and reported as `false`.
    pub async fn set_time_slot(&self, slot: &str) -> bool {
        if !self.config.is_known_slot(slot) {
            tracing::debug!(slot, "ignoring unknown time slot");
            return false;
        }

        {
            let mut state = self.state();
            state.request.time_slot = Some(slot.to_string());
        }
        self.refresh_queue_number().await;
        true
    }

    async fn refresh_queue_number(&self) {
        let bucket = self.state().request.bucket();
        let Some(bucket) = bucket else {
            return;
        };

        let queue_number = match self.allocator.check(&bucket).await {
            Ok(check) => check.queue_number,
            Err(e) => {
                tracing::warn!(error = %e, bucket = %bucket, "speculative queue check failed");
                0
            }
        };

        let mut state = self.state();
        // The selection may have changed while the lookup was in flight
        if state.request.bucket().as_ref() == Some(&bucket) {
            state.request.assigned_queue_number = queue_number;
        }
    }

    pub async fn submit(&self) -> SubmitOutcome {
        if self.submitting.load(Ordering::SeqCst) {
            return SubmitOutcome::Ignored;
        }

        let request = self.state().request.clone();
        let bucket = match self.validate(&request) {
            Ok(bucket) => bucket,
            Err(e) => return self.reject(e),
        };

        if self
            .submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return SubmitOutcome::Ignored;
        }
        let _guard = SubmittingGuard(&self.submitting);

        self.reserve(&request, &bucket).await
    }

    fn validate(&self, request: &BookingRequest) -> Result<BucketKey, BookingError> {
        let bucket = request.bucket().ok_or(BookingError::MissingSelection)?;

        if !self.config.accepts_date(self.clock.today(), bucket.date) {
            return Err(BookingError::DateOutsideWindow {
                window_days: self.config.window_days,
            });
        }
        if !self.config.is_known_slot(&bucket.time_slot) {
            return Err(BookingError::UnknownTimeSlot(bucket.time_slot));
        }

        let required = [
            ("name", &request.name),
            ("phone", &request.phone),
            ("message", &request.message),
        ];
        for (label, value) in required {
            if value.trim().is_empty() {
                return Err(BookingError::MissingField(label));
            }
        }

        Ok(bucket)
    }

    async fn reserve(&self, request: &BookingRequest, bucket: &BucketKey) -> SubmitOutcome {
        let result = self
            .store
            .try_reserve_slot(
                &self.config.collection,
                bucket,
                self.config.capacity,
                request.to_fields(bucket),
            )
            .await;

        match result {
            Ok(Reservation::Reserved {
                queue_number,
                document,
            }) => {
                let booking = PersistedBooking {
                    id: document.id,
                    name: request.name.clone(),
                    phone: request.phone.clone(),
                    message: request.message.clone(),
                    date: bucket.date,
                    time_slot: bucket.time_slot.clone(),
                    queue_number,
                    created_at: document.created_at,
                };
                tracing::info!(
                    booking_id = %booking.id,
                    bucket = %bucket,
                    queue_number,
                    capacity = self.config.capacity,
                    "booking stored"
                );

                *self.state() = FormState::default();
                self.notifier.notify_success(SUCCESS_MESSAGE);
                SubmitOutcome::Booked(booking)
            }
            Ok(Reservation::Full { occupancy }) => {
                tracing::info!(bucket = %bucket, occupancy, "bucket full at submission");
                self.reject(BookingError::SlotFull {
                    capacity: self.config.capacity,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, bucket = %bucket, "failed to store booking");
                self.reject(BookingError::Persistence(e.to_string()))
            }
        }
    }

    fn reject(&self, error: BookingError) -> SubmitOutcome {
        self.notifier.notify_error(&error.to_string());
        SubmitOutcome::Rejected(error)
    }
}
