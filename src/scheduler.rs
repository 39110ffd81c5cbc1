use crate::application::loan::{OverdueNotificationError, OverdueNotifier};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Run the overdue scan cycle on a fixed interval
///
/// The first cycle runs immediately. Each tick passes the current local date
/// as `as_of`. Ticks missed while a cycle is still running are skipped.
/// Failures are logged and the next tick tries again.
pub fn spawn_overdue_scan(notifier: Arc<OverdueNotifier>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = every.as_secs(),
            threshold_days = notifier.settings().threshold_days,
            "overdue scan scheduled"
        );

        loop {
            ticker.tick().await;

            let as_of = Local::now().date_naive();
            match notifier.run_cycle(as_of).await {
                Ok(report) => {
                    tracing::debug!(%as_of, overdue = report.overdue_count, "scheduled scan done");
                }
                Err(OverdueNotificationError::CycleInProgress) => {
                    tracing::warn!(%as_of, "previous overdue scan still running, tick skipped");
                }
                Err(e) => {
                    tracing::warn!(%as_of, error = %e, "scheduled overdue scan failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCatalogStore, InMemoryLoanStore, RecordingNotificationSender,
    };
    use crate::application::ServiceDependencies;
    use crate::application::loan::OverdueSettings;
    use crate::domain::{BookId, book::Book, loan};
    use crate::ports::{CatalogStore, LoanStore};

    #[tokio::test]
    async fn test_first_tick_runs_a_cycle_immediately() {
        let catalog = Arc::new(InMemoryCatalogStore::new());
        let loan_store = Arc::new(InMemoryLoanStore::new(&catalog));
        let sender = Arc::new(RecordingNotificationSender::new());
        let book = catalog
            .insert(Book {
                book_id: BookId::new(),
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                isbn: "111".to_string(),
            })
            .await
            .unwrap();
        let deps = ServiceDependencies {
            catalog,
            loan_store: loan_store.clone(),
            notification_sender: sender.clone(),
        };

        let long_ago = Local::now().date_naive() - chrono::Days::new(30);
        loan_store
            .insert(loan::lend_book(book.book_id, "Fulano", "f@x.com", long_ago))
            .await
            .unwrap();

        let notifier = Arc::new(OverdueNotifier::new(deps, OverdueSettings::default()));
        let handle = spawn_overdue_scan(notifier, Duration::from_secs(3600));

        for _ in 0..50 {
            if !sender.sent().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipients, vec!["f@x.com".to_string()]);
    }
}
