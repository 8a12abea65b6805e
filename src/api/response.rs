use crate::application::{FailureKind, OperationResult};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// サービスの結果をHTTPレスポンスに変換する
///
/// 本文は常にOperationResultのJSON。失敗時のステータスは失敗の種類で決まる。
#[derive(Debug)]
pub struct ApiResponse<T> {
    success_status: StatusCode,
    result: OperationResult<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(result: OperationResult<T>) -> Self {
        Self {
            success_status: StatusCode::OK,
            result,
        }
    }

    pub fn created(result: OperationResult<T>) -> Self {
        Self {
            success_status: StatusCode::CREATED,
            result,
        }
    }
}

impl<T> From<OperationResult<T>> for ApiResponse<T> {
    fn from(result: OperationResult<T>) -> Self {
        ApiResponse::ok(result)
    }
}

/// 失敗の種類に対応するステータスコード
pub fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        // 400 Bad Request - 入力の形式誤り
        FailureKind::Validation => StatusCode::BAD_REQUEST,
        // 404 Not Found - 対象が存在しない
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        // 422 Unprocessable Entity - 業務規則・状態遷移の違反
        FailureKind::BusinessRule | FailureKind::Domain => StatusCode::UNPROCESSABLE_ENTITY,
        // 500 Internal Server Error - 永続化の障害
        FailureKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self.result.failure {
            None => (self.success_status, Json(self.result)).into_response(),
            // 詳細はサービス境界でログに記録済み。クライアントには一般的なメッセージのみを返す
            Some(FailureKind::Persistence) => {
                let body: OperationResult<T> = OperationResult::failure(
                    FailureKind::Persistence,
                    vec![INTERNAL_ERROR_MESSAGE.to_string()],
                );
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            Some(kind) => (status_for(kind), Json(self.result)).into_response(),
        }
    }
}
