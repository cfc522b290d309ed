pub mod allocator;
pub mod booking_form;
pub mod clock;
pub mod notify;
pub mod schedule;
pub mod store;
