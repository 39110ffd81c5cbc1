mod errors;
mod loan_service;
mod overdue_notification;

pub use errors::{LoanApplicationError, Result};
pub use loan_service::{create_loan, find_loans, find_loans_by_book, get_loan, return_loan};
pub use overdue_notification::{
    DEFAULT_OVERDUE_MESSAGE, DispatchOutcome, OverdueNotificationError, OverdueNotifier,
    OverdueSettings, ScanPhase, ScanReport, dispatch_overdue_notifications, overdue_recipients,
    scan_overdue_loans,
};
