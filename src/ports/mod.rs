pub mod catalog_store;
pub mod loan_store;
pub mod notification_sender;
pub mod pagination;

pub use catalog_store::{BookFilter, CatalogStore, CatalogStoreError};
pub use loan_store::{LoanFilter, LoanStore, LoanStoreError};
pub use notification_sender::{NotificationError, NotificationSender};
pub use pagination::{Page, PageRequest};
