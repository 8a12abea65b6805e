use thiserror::Error;

/// 永続化アダプター共通のエラー
#[derive(Debug, Error)]
pub enum StoreError {
    /// 同じIDの集約が既に保存されている
    #[error("{entity} {id} already exists")]
    DuplicateKey { entity: &'static str, id: String },

    /// 更新対象の集約が保存されていない
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("A transaction is already in progress")]
    TransactionInProgress,

    #[error("No transaction in progress")]
    NoTransaction,
}
