use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, ValidationError, value_objects::require_non_blank};

/// コマンド：書籍を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLoan {
    pub isbn: String,
    pub customer: String,
    pub customer_email: String,
    /// 貸出日（呼び出し側が現在日付を渡す）
    pub loan_date: NaiveDate,
}

impl CreateLoan {
    /// 必須項目をすべて検証し、失敗した項目をまとめて返す
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        require_non_blank("isbn", &self.isbn, &mut errors);
        require_non_blank("customer", &self.customer, &mut errors);
        require_non_blank("customerEmail", &self.customer_email, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// コマンド：貸出の返却状態を更新する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLoan {
    pub loan_id: LoanId,
    /// `None`は不正値として扱われる
    pub returned: Option<bool>,
}

/// コマンド：書籍をカタログに登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
}

/// コマンド：書籍の書誌情報を更新する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBook {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
}
