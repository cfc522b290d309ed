use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::{AppConfig, BookingConfig};
use crate::models::Notification;
use crate::services::allocator::QueueAllocator;
use crate::services::booking_form::BookingForm;
use crate::services::clock::Clock;
use crate::services::notify::broadcast::BroadcastNotifier;
use crate::services::schedule::Schedule;
use crate::services::store::DocumentStore;

pub struct AppState {
    pub config: AppConfig,
    pub booking: Arc<BookingConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
    pub events_tx: broadcast::Sender<Notification>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            booking: Arc::new(config.booking.clone()),
            config,
            store,
            clock,
            events_tx,
        }
    }

    /// A fresh, empty form wired to the shared store and event feed.
    pub fn booking_form(&self) -> BookingForm {
        BookingForm::new(
            self.booking.clone(),
            self.store.clone(),
            Arc::new(BroadcastNotifier::new(self.events_tx.clone())),
            self.clock.clone(),
        )
    }

    pub fn allocator(&self) -> QueueAllocator {
        QueueAllocator::new(self.store.clone(), self.booking.clone())
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::new(self.store.clone(), self.booking.clone())
    }
}
