use crate::ports::{CatalogStore, LoanStore, NotificationSender};
use std::sync::Arc;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、各ユースケース関数に明示的に渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub catalog: Arc<dyn CatalogStore>,
    pub loan_store: Arc<dyn LoanStore>,
    pub notification_sender: Arc<dyn NotificationSender>,
}
