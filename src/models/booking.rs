use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::document::{Document, Fields, FieldValue, Filter, DATE_FORMAT};

pub const FIELD_NAME: &str = "name";
pub const FIELD_PHONE: &str = "phone";
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_DATE: &str = "date";
pub const FIELD_TIME_SLOT: &str = "time_slot";
pub const FIELD_QUEUE_NUMBER: &str = "queue_number";

/// Transient form contents. `assigned_queue_number == 0` means unassigned or full.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingRequest {
    pub name: String,
    pub phone: String,
    pub message: String,
    pub requested_date: Option<NaiveDate>,
    pub time_slot: Option<String>,
    pub assigned_queue_number: u32,
}

impl BookingRequest {
    pub fn bucket(&self) -> Option<BucketKey> {
        match (self.requested_date, self.time_slot.as_ref()) {
            (Some(date), Some(slot)) => Some(BucketKey::new(date, slot.clone())),
            _ => None,
        }
    }

    /// Fields written on submission. The queue number is added by the store
    /// when it reserves the slot.
    pub fn to_fields(&self, bucket: &BucketKey) -> Fields {
        let mut fields = Fields::new();
        fields.insert(FIELD_NAME.to_string(), self.name.clone().into());
        fields.insert(FIELD_PHONE.to_string(), self.phone.clone().into());
        fields.insert(FIELD_MESSAGE.to_string(), self.message.clone().into());
        fields.insert(FIELD_DATE.to_string(), bucket.date.into());
        fields.insert(FIELD_TIME_SLOT.to_string(), bucket.time_slot.clone().into());
        fields
    }
}

/// One (date, time slot) pair. Compared by value, never by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub date: NaiveDate,
    pub time_slot: String,
}

impl BucketKey {
    pub fn new(date: NaiveDate, time_slot: impl Into<String>) -> Self {
        Self {
            date,
            time_slot: time_slot.into(),
        }
    }

    pub fn filters(&self) -> Vec<Filter> {
        vec![
            Filter::equals(FIELD_DATE, self.date),
            Filter::equals(FIELD_TIME_SLOT, self.time_slot.as_str()),
        ]
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date.format(DATE_FORMAT), self.time_slot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedBooking {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub message: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub queue_number: u32,
    pub created_at: NaiveDateTime,
}

impl PersistedBooking {
    /// Returns `None` for documents missing the bucket fields or a valid
    /// queue number.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let queue_number = doc
            .integer(FIELD_QUEUE_NUMBER)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)?;

        Some(Self {
            id: doc.id.clone(),
            name: doc.text(FIELD_NAME).unwrap_or_default(),
            phone: doc.text(FIELD_PHONE).unwrap_or_default(),
            message: doc.text(FIELD_MESSAGE).unwrap_or_default(),
            date: doc.date(FIELD_DATE)?,
            time_slot: doc.text(FIELD_TIME_SLOT)?,
            queue_number,
            created_at: doc.created_at,
        })
    }
}

pub fn queue_number_value(n: u32) -> FieldValue {
    FieldValue::Integer(i64::from(n))
}
