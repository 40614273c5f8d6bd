pub mod analytics;
pub mod availability;
pub mod bookings;
pub mod customers;
pub mod fleet;
pub mod metrics;
pub mod notifications;
pub mod periods;
pub mod report_cache;
