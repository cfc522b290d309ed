use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{new_document, validate_filters, DocumentStore, Reservation, StoreError};
use crate::models::booking::{queue_number_value, FIELD_QUEUE_NUMBER};
use crate::models::{BucketKey, Document, Fields, Filter};
use crate::services::allocator::allocate;

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<Vec<(String, Document)>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<(String, Document)>>, StoreError> {
        self.documents
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn matching<'a>(
    docs: &'a [(String, Document)],
    collection: &'a str,
    filters: &'a [Filter],
) -> impl Iterator<Item = &'a Document> + 'a {
    docs.iter()
        .filter(move |(c, doc)| c == collection && filters.iter().all(|f| f.matches(&doc.fields)))
        .map(|(_, doc)| doc)
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        validate_filters(filters)?;
        let docs = self.lock()?;
        Ok(matching(&docs, collection, filters).cloned().collect())
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        let doc = new_document(fields);
        self.lock()?.push((collection.to_string(), doc.clone()));
        Ok(doc)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let docs = self.lock()?;
        Ok(docs
            .iter()
            .find(|(c, doc)| c == collection && doc.id == id)
            .map(|(_, doc)| doc.clone()))
    }

    /// Holds the lock across count and insert.
    async fn try_reserve_slot(
        &self,
        collection: &str,
        bucket: &BucketKey,
        capacity: u32,
        mut fields: Fields,
    ) -> Result<Reservation, StoreError> {
        let filters = bucket.filters();
        let mut docs = self.lock()?;

        let occupancy = matching(&docs, collection, &filters).count();
        let queue_number = allocate(occupancy, capacity);
        if queue_number == 0 {
            return Ok(Reservation::Full { occupancy });
        }

        fields.insert(FIELD_QUEUE_NUMBER.to_string(), queue_number_value(queue_number));
        let document = new_document(fields);
        docs.push((collection.to_string(), document.clone()));

        Ok(Reservation::Reserved {
            queue_number,
            document,
        })
    }
}
