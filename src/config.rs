use std::collections::HashSet;
use std::env;

use chrono::{Days, NaiveDate};

use crate::errors::AppError;

const DEFAULT_TIME_SLOTS: [&str; 5] = ["10-11 AM", "11-12 PM", "2-3 PM", "3-4 PM", "4-5 PM"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub store_backend: String,
    pub booking: BookingConfig,
}

/// Queue rules shared by the form controller and the allocator.
#[derive(Clone, Debug, PartialEq)]
pub struct BookingConfig {
    pub collection: String,
    pub time_slots: Vec<String>,
    pub capacity: u32,
    pub window_days: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            collection: "appointments".to_string(),
            time_slots: DEFAULT_TIME_SLOTS.iter().map(|s| s.to_string()).collect(),
            capacity: 60,
            window_days: 14,
        }
    }
}

impl BookingConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.collection.trim().is_empty() {
            return Err(AppError::Config("booking collection must not be empty".to_string()));
        }
        if self.time_slots.is_empty() {
            return Err(AppError::Config("at least one time slot is required".to_string()));
        }
        let mut seen = HashSet::new();
        for slot in &self.time_slots {
            if slot.trim().is_empty() {
                return Err(AppError::Config("time slot labels must not be empty".to_string()));
            }
            if !seen.insert(slot.as_str()) {
                return Err(AppError::Config(format!("duplicate time slot: {slot}")));
            }
        }
        if self.capacity == 0 {
            return Err(AppError::Config("queue capacity must be at least 1".to_string()));
        }
        if self.window_days == 0 {
            return Err(AppError::Config("booking window must be at least 1 day".to_string()));
        }
        Ok(())
    }

    pub fn is_known_slot(&self, slot: &str) -> bool {
        self.time_slots.iter().any(|s| s == slot)
    }

    /// Position of a slot in the configured order, used for listing.
    pub fn slot_index(&self, slot: &str) -> Option<usize> {
        self.time_slots.iter().position(|s| s == slot)
    }

    /// First and last selectable day, both inclusive.
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let span = u64::from(self.window_days.saturating_sub(1));
        let last = today.checked_add_days(Days::new(span)).unwrap_or(NaiveDate::MAX);
        (today, last)
    }

    pub fn accepts_date(&self, today: NaiveDate, date: NaiveDate) -> bool {
        let (first, last) = self.window(today);
        date >= first && date <= last
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = BookingConfig::default();
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "queuedesk.db".to_string()),
            store_backend: env::var("STORE_BACKEND").unwrap_or_else(|_| "sqlite".to_string()),
            booking: BookingConfig {
                collection: env::var("BOOKING_COLLECTION").unwrap_or(defaults.collection),
                time_slots: env::var("QUEUE_TIME_SLOTS")
                    .ok()
                    .map(|v| parse_slot_list(&v))
                    .unwrap_or(defaults.time_slots),
                capacity: env::var("QUEUE_CAPACITY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.capacity),
                window_days: env::var("QUEUE_WINDOW_DAYS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.window_days),
            },
        }
    }
}

fn parse_slot_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
