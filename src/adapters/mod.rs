pub mod memory;
pub mod postgres;
pub mod tracing_notifier;
