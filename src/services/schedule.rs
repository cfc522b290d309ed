use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::BookingConfig;
use crate::models::booking::FIELD_DATE;
use crate::models::{Filter, PersistedBooking};
use crate::services::store::{DocumentStore, StoreError};

pub const DEFAULT_LISTING_AMOUNT: usize = 10;

/// Read side of the booking collection: the desk's view of a day's queue.
pub struct Schedule {
    store: Arc<dyn DocumentStore>,
    config: Arc<BookingConfig>,
}

impl Schedule {
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<BookingConfig>) -> Self {
        Self { store, config }
    }

    /// Bookings for `day` ordered by slot (configured order, unknown labels
    /// last), then queue number. Documents that are not bookings are skipped.
    pub async fn day_queue(
        &self,
        day: NaiveDate,
        amount: usize,
    ) -> Result<Vec<PersistedBooking>, StoreError> {
        let documents = self
            .store
            .query(&self.config.collection, &[Filter::equals(FIELD_DATE, day)])
            .await?;

        let mut bookings: Vec<PersistedBooking> = documents
            .iter()
            .filter_map(PersistedBooking::from_document)
            .collect();
        bookings.sort_by(|a, b| self.compare(a, b));
        bookings.truncate(amount);
        Ok(bookings)
    }

    pub async fn find_booking(&self, id: &str) -> Result<Option<PersistedBooking>, StoreError> {
        let doc = self.store.get(&self.config.collection, id).await?;
        Ok(doc.as_ref().and_then(PersistedBooking::from_document))
    }

    fn compare(&self, a: &PersistedBooking, b: &PersistedBooking) -> Ordering {
        let rank = |slot: &str| self.config.slot_index(slot).unwrap_or(usize::MAX);
        rank(&a.time_slot)
            .cmp(&rank(&b.time_slot))
            .then_with(|| a.time_slot.cmp(&b.time_slot))
            .then_with(|| a.queue_number.cmp(&b.queue_number))
    }
}
