pub mod catalog_store;
pub mod loan_store;
pub mod notification_sender;
mod tables;

pub use catalog_store::CatalogStore as InMemoryCatalogStore;
pub use loan_store::LoanStore as InMemoryLoanStore;
pub use notification_sender::{NotificationSender as RecordingNotificationSender, SentNotification};
