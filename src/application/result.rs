use serde::Serialize;
use std::future::Future;

use super::errors::{ApplicationError, FailureKind, Result};

/// 全サービス操作の共通の結果
///
/// 想定内の失敗（入力誤り・ルール違反・状態遷移の失敗）も
/// 想定外の永続化エラーもすべてこの形で呼び出し元に返す。
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult<T> {
    pub is_success: bool,
    pub data: Option<T>,
    pub error_message: Option<String>,
    pub errors: Vec<String>,
    #[serde(skip)]
    pub failure: Option<FailureKind>,
}

impl<T> OperationResult<T> {
    pub fn success(data: T) -> Self {
        Self {
            is_success: true,
            data: Some(data),
            error_message: None,
            errors: Vec::new(),
            failure: None,
        }
    }

    pub fn failure(kind: FailureKind, errors: Vec<String>) -> Self {
        Self {
            is_success: false,
            data: None,
            error_message: Some(errors.join("; ")),
            errors,
            failure: Some(kind),
        }
    }

    /// 成功時の値を変換する
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        OperationResult {
            is_success: self.is_success,
            data: self.data.map(f),
            error_message: self.error_message,
            errors: self.errors,
            failure: self.failure,
        }
    }
}

impl<T> From<ApplicationError> for OperationResult<T> {
    fn from(err: ApplicationError) -> Self {
        OperationResult::failure(err.kind(), err.messages())
    }
}

/// サービス境界
///
/// 内部ではResultと?で処理し、ここで一度だけOperationResultに変換する。
/// 永続化エラーはここでログに残す。
pub(crate) async fn boundary<T>(
    operation: &'static str,
    work: impl Future<Output = Result<T>>,
) -> OperationResult<T> {
    match work.await {
        Ok(data) => OperationResult::success(data),
        Err(err @ ApplicationError::Persistence { .. }) => {
            tracing::error!(
                operation,
                error.cause_chain = ?err,
                error.message = %err,
                "Unexpected error happened"
            );
            err.into()
        }
        Err(err) => {
            tracing::warn!(operation, error.message = %err, "Request rejected");
            err.into()
        }
    }
}
