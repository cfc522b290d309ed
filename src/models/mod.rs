pub mod booking;
pub mod document;
pub mod notification;

pub use booking::{BookingRequest, BucketKey, PersistedBooking};
pub use document::{Document, FieldValue, Fields, Filter};
pub use notification::{Notification, NotificationKind};
