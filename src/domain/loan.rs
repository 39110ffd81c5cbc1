use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, ReturnLoanError};

/// 延滞とみなすまでの日数（既定値）
pub const DEFAULT_OVERDUE_THRESHOLD_DAYS: u32 = 3;

/// 貸出状態
///
/// 永続化層では null 許容の真偽値として保存されるが、
/// ドメインでは「未返却」と「返却済み」の2状態のみを扱う。
/// null と false はどちらも`Open`になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    /// 貸出中（未返却）
    Open,
    /// 返却済み
    Returned,
}

impl LoanStatus {
    /// 永続化された返却フラグから状態を復元する
    pub fn from_returned_flag(returned: Option<bool>) -> Self {
        match returned {
            Some(true) => LoanStatus::Returned,
            Some(false) | None => LoanStatus::Open,
        }
    }

    /// 返却フラグとしての表現
    pub fn as_returned_flag(&self) -> bool {
        matches!(self, LoanStatus::Returned)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Open)
    }

    pub fn is_returned(&self) -> bool {
        matches!(self, LoanStatus::Returned)
    }
}

/// Loan集約 - 1冊の書籍の1回の貸出
///
/// 作成後に変更できるのは`status`のみ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    // 識別子
    pub loan_id: LoanId,

    // 書籍への参照（IDのみ）
    pub book_id: BookId,

    // 利用者
    pub customer: String,
    pub customer_email: String,

    // 貸出管理の責務
    pub loan_date: NaiveDate,
    pub status: LoanStatus,
}

/// 純粋関数：書籍を貸し出す
///
/// 入力は検証済みであることが前提。状態は`Open`で作成される。
pub fn lend_book(
    book_id: BookId,
    customer: &str,
    customer_email: &str,
    loan_date: NaiveDate,
) -> Loan {
    Loan {
        loan_id: LoanId::new(),
        book_id,
        customer: customer.trim().to_string(),
        customer_email: customer_email.trim().to_string(),
        loan_date,
        status: LoanStatus::Open,
    }
}

/// 純粋関数：返却状態を更新する
///
/// ビジネスルール：
/// - 返却フラグは true / false の明示が必須
/// - false は貸出を再び未返却に戻す
///
/// 副作用なし。新しいLoanを返す。
pub fn mark_returned(loan: &Loan, returned: Option<bool>) -> Result<Loan, ReturnLoanError> {
    let returned = returned.ok_or(ReturnLoanError::InvalidReturnValue)?;

    Ok(Loan {
        status: LoanStatus::from_returned_flag(Some(returned)),
        ..loan.clone()
    })
}

/// 延滞判定の基準日
///
/// `as_of - threshold_days`。この日付以前の貸出日は延滞とみなす。
pub fn overdue_cutoff(as_of: NaiveDate, threshold_days: u32) -> NaiveDate {
    as_of
        .checked_sub_days(Days::new(u64::from(threshold_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// 純粋関数：延滞判定
pub fn is_overdue(loan: &Loan, as_of: NaiveDate, threshold_days: u32) -> bool {
    loan.status.is_open() && loan.loan_date <= overdue_cutoff(as_of, threshold_days)
}
