pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{Timelike, Utc};

use crate::models::booking::{queue_number_value, FIELD_QUEUE_NUMBER};
use crate::models::{BucketKey, Document, Fields, Filter};
use crate::services::allocator::allocate;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("invalid field name: {0}")]
    InvalidField(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of asking the store for the next queue number in a bucket.
#[derive(Debug, Clone, PartialEq)]
pub enum Reservation {
    Reserved { queue_number: u32, document: Document },
    Full { occupancy: usize },
}

/// A document collection supporting equality queries and inserts.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError>;

    /// Stores `fields` as a new document; the store assigns id and timestamp.
    async fn insert(&self, collection: &str, fields: Fields) -> Result<Document, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Counts the bucket and, if below `capacity`, inserts `fields` with the
    /// next queue number.
    ///
    /// This default is a plain read followed by a separate write. Two callers
    /// racing on the same bucket can both read the same occupancy and store the
    /// same number. Backends with a serializing primitive override it.
    async fn try_reserve_slot(
        &self,
        collection: &str,
        bucket: &BucketKey,
        capacity: u32,
        mut fields: Fields,
    ) -> Result<Reservation, StoreError> {
        let occupancy = self.query(collection, &bucket.filters()).await?.len();
        let queue_number = allocate(occupancy, capacity);
        if queue_number == 0 {
            return Ok(Reservation::Full { occupancy });
        }

        fields.insert(FIELD_QUEUE_NUMBER.to_string(), queue_number_value(queue_number));
        let document = self.insert(collection, fields).await?;
        Ok(Reservation::Reserved {
            queue_number,
            document,
        })
    }
}

pub(crate) fn validate_filters(filters: &[Filter]) -> Result<(), StoreError> {
    match filters
        .iter()
        .find(|f| !crate::db::queries::is_valid_field_name(&f.field))
    {
        Some(bad) => Err(StoreError::InvalidField(bad.field.clone())),
        None => Ok(()),
    }
}

pub(crate) fn new_document(fields: Fields) -> Document {
    let now = Utc::now().naive_utc();
    Document {
        id: uuid::Uuid::new_v4().to_string(),
        fields,
        // Second precision, matching what the SQLite backend stores.
        created_at: now.with_nanosecond(0).unwrap_or(now),
    }
}
