use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ドメイン層のエラー
///
/// 人間が読めるメッセージの順序付きリスト。
/// ファクトリは違反したルールをすべて集めてから失敗し、
/// 状態遷移メソッドは最初のガードで失敗する。
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}", self.message())]
pub struct DomainError {
    errors: Vec<String>,
}

impl DomainError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }

    /// すべてのメッセージを "; " で連結
    pub fn message(&self) -> String {
        self.errors.join("; ")
    }
}

/// ドメイン操作の結果
pub type DomainResult<T = ()> = Result<T, DomainError>;

/// ガード条件：満たさなければ即座に失敗
pub(crate) fn ensure(condition: bool, message: &str) -> DomainResult {
    if condition {
        Ok(())
    } else {
        Err(DomainError::new(message))
    }
}

/// ファクトリ用の違反収集器
#[derive(Debug, Default)]
pub(crate) struct Violations {
    errors: Vec<String>,
}

impl Violations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 条件を満たさない場合にメッセージを記録
    pub(crate) fn require(&mut self, condition: bool, message: impl Into<String>) {
        if !condition {
            self.errors.push(message.into());
        }
    }

    pub(crate) fn absorb(&mut self, result: DomainResult) {
        if let Err(err) = result {
            self.errors.extend(err.into_errors());
        }
    }

    /// 違反がなければ値を構築する
    pub(crate) fn finish<T>(self, build: impl FnOnce() -> T) -> DomainResult<T> {
        if self.errors.is_empty() {
            Ok(build())
        } else {
            Err(DomainError::from_errors(self.errors))
        }
    }
}

/// 空白のみの文字列を未入力として扱う
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
