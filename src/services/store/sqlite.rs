use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::{Connection, TransactionBehavior};

use super::{new_document, validate_filters, DocumentStore, Reservation, StoreError};
use crate::db::queries;
use crate::models::booking::{queue_number_value, FIELD_QUEUE_NUMBER};
use crate::models::{BucketKey, Document, Fields, Filter};
use crate::services::allocator::allocate;

pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database lock poisoned".to_string()))
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        validate_filters(filters)?;
        let db = self.lock()?;
        Ok(queries::find_documents(&db, collection, filters)?)
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        let doc = new_document(fields);
        let db = self.lock()?;
        queries::insert_document(&db, collection, &doc)?;
        Ok(doc)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let db = self.lock()?;
        Ok(queries::get_document(&db, collection, id)?)
    }

    /// Count and insert inside one `IMMEDIATE` transaction, so concurrent
    /// writers (in this process or another) see each other's reservations.
    async fn try_reserve_slot(
        &self,
        collection: &str,
        bucket: &BucketKey,
        capacity: u32,
        mut fields: Fields,
    ) -> Result<Reservation, StoreError> {
        let filters = bucket.filters();
        validate_filters(&filters)?;

        let mut db = self.lock()?;
        let tx = db
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to start reservation transaction")?;

        let occupancy = queries::count_documents(&tx, collection, &filters)?;
        let queue_number = allocate(occupancy, capacity);
        if queue_number == 0 {
            tx.rollback().context("failed to roll back reservation")?;
            tracing::debug!(bucket = %bucket, occupancy, "bucket full");
            return Ok(Reservation::Full { occupancy });
        }

        fields.insert(FIELD_QUEUE_NUMBER.to_string(), queue_number_value(queue_number));
        let document = new_document(fields);
        queries::insert_document(&tx, collection, &document)?;
        tx.commit().context("failed to commit reservation")?;

        Ok(Reservation::Reserved {
            queue_number,
            document,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::booking::FIELD_NAME;
    use chrono::NaiveDate;

    fn store() -> SqliteDocumentStore {
        SqliteDocumentStore::new(db::init_db(":memory:").unwrap())
    }

    fn bucket() -> BucketKey {
        BucketKey::new(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), "10-11 AM")
    }

    fn booking_fields(name: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert(FIELD_NAME.to_string(), name.into());
        fields.insert("date".to_string(), bucket().date.into());
        fields.insert("time_slot".to_string(), bucket().time_slot.into());
        fields
    }

    #[tokio::test]
    async fn test_reservations_number_sequentially_until_full() {
        let store = store();

        for expected in 1..=3u32 {
            let reservation = store
                .try_reserve_slot("appointments", &bucket(), 3, booking_fields("Ada"))
                .await
                .unwrap();
            match reservation {
                Reservation::Reserved { queue_number, .. } => assert_eq!(queue_number, expected),
                Reservation::Full { .. } => panic!("bucket filled early"),
            }
        }

        let reservation = store
            .try_reserve_slot("appointments", &bucket(), 3, booking_fields("Ada"))
            .await
            .unwrap();
        assert_eq!(reservation, Reservation::Full { occupancy: 3 });

        let stored = store.query("appointments", &bucket().filters()).await.unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let store = store();
        let doc = store
            .insert("appointments", booking_fields("Grace"))
            .await
            .unwrap();

        let loaded = store.get("appointments", &doc.id).await.unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn test_query_rejects_bad_field_names() {
        let store = store();
        let err = store
            .query("appointments", &[Filter::equals("date = date --", "x")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidField(_)));
    }
}
