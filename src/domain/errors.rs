use std::fmt;

/// 入力値検証のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 必須項目が未入力
    Blank { field: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Blank { field } => write!(f, "{} must not be blank", field),
        }
    }
}

/// 返却状態更新のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnLoanError {
    /// 返却フラグが true / false のどちらでもない
    InvalidReturnValue,
}
