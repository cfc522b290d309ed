use std::sync::Arc;

use serde::Serialize;

use crate::config::BookingConfig;
use crate::models::BucketKey;
use crate::services::store::{DocumentStore, StoreError};

/// Next queue number for a bucket holding `occupancy` bookings, or 0 when the
/// bucket is full.
pub fn allocate(occupancy: usize, capacity: u32) -> u32 {
    match u32::try_from(occupancy) {
        Ok(n) if n < capacity => n + 1,
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueCheck {
    pub occupancy: usize,
    pub capacity: u32,
    pub queue_number: u32,
}

impl QueueCheck {
    pub fn is_full(&self) -> bool {
        self.queue_number == 0
    }
}

/// Speculative lookups for display. Never gates a write.
pub struct QueueAllocator {
    store: Arc<dyn DocumentStore>,
    config: Arc<BookingConfig>,
}

impl QueueAllocator {
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<BookingConfig>) -> Self {
        Self { store, config }
    }

    pub async fn occupancy(&self, bucket: &BucketKey) -> Result<usize, StoreError> {
        let existing = self
            .store
            .query(&self.config.collection, &bucket.filters())
            .await?;
        Ok(existing.len())
    }

    pub async fn check(&self, bucket: &BucketKey) -> Result<QueueCheck, StoreError> {
        let occupancy = self.occupancy(bucket).await?;
        let check = QueueCheck {
            occupancy,
            capacity: self.config.capacity,
            queue_number: allocate(occupancy, self.config.capacity),
        };
        tracing::debug!(bucket = %bucket, occupancy, queue_number = check.queue_number, "queue check");
        Ok(check)
    }
}
