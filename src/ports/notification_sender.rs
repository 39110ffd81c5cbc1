use async_trait::async_trait;
use thiserror::Error;

/// 通知送信のエラー
#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// 通知送信ポート
///
/// 配信手段（メール等）を抽象化する。1通のメッセージを複数の宛先に送る。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, message: &str, recipients: &[String]) -> Result<(), NotificationError>;
}
