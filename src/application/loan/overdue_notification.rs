use crate::application::ServiceDependencies;
use crate::domain::loan::{self, Loan};
use crate::ports::{LoanStoreError, NotificationError};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// 延滞通知の既定メッセージ
pub const DEFAULT_OVERDUE_MESSAGE: &str =
    "Attention! You have an overdue loan. Please return the book as soon as possible.";

/// 延滞通知のエラー
#[derive(Debug, Error)]
pub enum OverdueNotificationError {
    /// 別のスキャンサイクルが実行中
    #[error("An overdue scan cycle is already running")]
    CycleInProgress,

    /// LoanStoreのエラー
    #[error("Loan store error")]
    LoanStoreError(#[source] LoanStoreError),

    /// 通知送信の失敗（このサイクルは失敗扱い、次回のスキャンで再評価される）
    #[error("Overdue notification could not be delivered")]
    NotificationFailed(#[source] NotificationError),
}

pub type Result<T> = std::result::Result<T, OverdueNotificationError>;

/// 通知の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 延滞がなく送信しなかった
    NothingToSend,
    /// 1通の集約メッセージを送信した
    Sent { recipients: usize },
}

/// 1回のスキャンサイクルの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub as_of: NaiveDate,
    pub overdue_count: usize,
    pub outcome: DispatchOutcome,
}

/// スキャンサイクルの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Scanning,
    Dispatching,
}

/// 延滞通知の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueSettings {
    pub threshold_days: u32,
    pub message: String,
}

impl Default for OverdueSettings {
    fn default() -> Self {
        Self {
            threshold_days: loan::DEFAULT_OVERDUE_THRESHOLD_DAYS,
            message: DEFAULT_OVERDUE_MESSAGE.to_string(),
        }
    }
}

/// 延滞貸出を検索する（副作用なし）
///
/// 未返却かつ貸出日が `as_of - threshold_days` 以前の貸出を返す。
/// 同じストア状態と`as_of`に対しては常に同じ結果を返す。
pub async fn scan_overdue_loans(
    deps: &ServiceDependencies,
    threshold_days: u32,
    as_of: NaiveDate,
) -> Result<Vec<Loan>> {
    let mut loans = deps
        .loan_store
        .find_overdue(as_of, threshold_days)
        .await
        .map_err(OverdueNotificationError::LoanStoreError)?;

    loans.retain(|l| loan::is_overdue(l, as_of, threshold_days));
    loans.sort_by(|a, b| {
        a.loan_date
            .cmp(&b.loan_date)
            .then_with(|| a.loan_id.cmp(&b.loan_id))
    });

    Ok(loans)
}

/// 通知先のメールアドレスを集める
///
/// 貸出ごとに1件。同じアドレスは最初の1件だけを残す。
pub fn overdue_recipients(loans: &[Loan]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(loans.len());
    loans
        .iter()
        .filter(|loan| seen.insert(loan.customer_email.as_str()))
        .map(|loan| loan.customer_email.clone())
        .collect()
}

/// 延滞貸出の利用者に1通の集約メッセージを送る
///
/// 貸出は変更しない。送信に失敗した場合もリトライせず、次回のスキャンに任せる。
pub async fn dispatch_overdue_notifications(
    deps: &ServiceDependencies,
    message: &str,
    overdue_loans: &[Loan],
) -> Result<DispatchOutcome> {
    let recipients = overdue_recipients(overdue_loans);
    if recipients.is_empty() {
        return Ok(DispatchOutcome::NothingToSend);
    }

    deps.notification_sender
        .send(message, &recipients)
        .await
        .map_err(OverdueNotificationError::NotificationFailed)?;

    Ok(DispatchOutcome::Sent {
        recipients: recipients.len(),
    })
}

/// 延滞スキャンと通知のサイクルを実行する
///
/// `Idle → Scanning → Dispatching → Idle` の順に遷移する。
/// 実行中に次のサイクルが要求された場合は`CycleInProgress`で拒否する。
pub struct OverdueNotifier {
    deps: ServiceDependencies,
    settings: OverdueSettings,
    phase: Mutex<ScanPhase>,
}

impl OverdueNotifier {
    pub fn new(deps: ServiceDependencies, settings: OverdueSettings) -> Self {
        Self {
            deps,
            settings,
            phase: Mutex::new(ScanPhase::Idle),
        }
    }

    pub fn settings(&self) -> &OverdueSettings {
        &self.settings
    }

    /// 現在の状態
    pub fn phase(&self) -> ScanPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 1サイクルを実行する
    ///
    /// `as_of`は呼び出し側（スケジューラ）が渡す。内部で現在時刻は読まない。
    pub async fn run_cycle(&self, as_of: NaiveDate) -> Result<ScanReport> {
        let cycle = CycleGuard::begin(&self.phase)?;

        let overdue = scan_overdue_loans(&self.deps, self.settings.threshold_days, as_of).await?;
        tracing::debug!(%as_of, overdue = overdue.len(), "overdue scan finished");

        cycle.advance(ScanPhase::Dispatching);
        let dispatched =
            dispatch_overdue_notifications(&self.deps, &self.settings.message, &overdue).await;
        let outcome = match dispatched {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    %as_of,
                    overdue = overdue.len(),
                    error = %e,
                    "overdue dispatch failed"
                );
                return Err(e);
            }
        };

        tracing::info!(
            %as_of,
            overdue = overdue.len(),
            ?outcome,
            "overdue scan cycle completed"
        );

        Ok(ScanReport {
            as_of,
            overdue_count: overdue.len(),
            outcome,
        })
    }
}

/// サイクル中の状態を保持し、終了時（エラー含む）に`Idle`へ戻す
struct CycleGuard<'a> {
    phase: &'a Mutex<ScanPhase>,
}

impl<'a> CycleGuard<'a> {
    fn begin(phase: &'a Mutex<ScanPhase>) -> Result<Self> {
        let mut current = phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != ScanPhase::Idle {
            return Err(OverdueNotificationError::CycleInProgress);
        }
        *current = ScanPhase::Scanning;
        Ok(Self { phase })
    }

    fn advance(&self, next: ScanPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = ScanPhase::Idle;
    }
}
