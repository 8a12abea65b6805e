use crate::domain::DomainError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 失敗の分類
///
/// API層はこの分類でHTTPステータスを決める。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 入力形式の誤り（永続化層に問い合わせる前に検出）
    Validation,
    /// 重複・参照先なしなど、永続化層への問い合わせで検出したルール違反
    BusinessRule,
    NotFound,
    /// エンティティのガード条件違反
    Domain,
    /// 想定外の永続化エラー
    Persistence,
}

/// アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{}", .0.join("; "))]
    BusinessRule(Vec<String>),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    /// 永続化層のエラー（詳細はsourceに保持）
    #[error("{context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl ApplicationError {
    pub fn business(message: impl Into<String>) -> Self {
        ApplicationError::BusinessRule(vec![message.into()])
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApplicationError::NotFound(message.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ApplicationError::Validation(_) => FailureKind::Validation,
            ApplicationError::BusinessRule(_) => FailureKind::BusinessRule,
            ApplicationError::NotFound(_) => FailureKind::NotFound,
            ApplicationError::Domain(_) => FailureKind::Domain,
            ApplicationError::Persistence { .. } => FailureKind::Persistence,
        }
    }

    /// 利用者に返すメッセージの一覧
    pub fn messages(&self) -> Vec<String> {
        match self {
            ApplicationError::Validation(errors) | ApplicationError::BusinessRule(errors) => {
                errors.clone()
            }
            ApplicationError::Domain(err) => err.errors().to_vec(),
            other => vec![other.to_string()],
        }
    }
}

impl From<garde::Report> for ApplicationError {
    fn from(report: garde::Report) -> Self {
        ApplicationError::Validation(
            report
                .iter()
                .map(|(path, error)| format!("{path}: {error}"))
                .collect(),
        )
    }
}

/// 永続化ポートのエラーに文脈を付けてApplicationErrorへ変換する
pub trait PersistenceContext<T> {
    fn persistence(self, context: &str) -> Result<T>;
}

impl<T> PersistenceContext<T> for std::result::Result<T, BoxError> {
    fn persistence(self, context: &str) -> Result<T> {
        self.map_err(|source| ApplicationError::Persistence {
            context: context.to_string(),
            source,
        })
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, ApplicationError>;
