use crate::domain::users::contact;
use crate::ports::UnitOfWork;
use garde::Validate;
use std::future::Future;

use super::errors::{ApplicationError, PersistenceContext, Result};

/// 入力形式の検証
///
/// フィールド単位の規則はgardeのderiveで宣言し、
/// 複数フィールドにまたがる規則はextra_rulesで追加する。
/// どちらも永続化層には問い合わせない。
pub trait FormatRules: Validate<Context = ()> {
    /// フィールドをまたぐ規則（日付の前後関係など）
    fn extra_rules(&self, _errors: &mut Vec<String>) {}

    fn check_format(&self) -> Result<()> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(report) => ApplicationError::from(report).messages(),
        };
        self.extra_rules(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApplicationError::Validation(errors))
        }
    }
}

/// 業務規則の検証結果
///
/// 重複・参照先の存在など、永続化層への問い合わせで判定する規則の違反を集める。
#[derive(Debug, Default)]
pub struct RuleViolations {
    errors: Vec<String>,
}

impl RuleViolations {
    pub fn new() -> Self {
        Self::default()
    }

    /// 条件が偽なら違反として記録する
    pub fn check(&mut self, condition: bool, message: impl Into<String>) {
        if !condition {
            self.errors.push(message.into());
        }
    }

    pub fn add(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ApplicationError::BusinessRule(self.errors))
        }
    }
}

// gardeのcustomルール

pub(crate) fn not_blank(value: &str, _: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("must not be blank"));
    }
    Ok(())
}

pub(crate) fn valid_person_name(value: &str, _: &()) -> garde::Result {
    if !contact::is_valid_person_name(value) {
        return Err(garde::Error::new(
            "must contain only letters, spaces, apostrophes or hyphens (max 50)",
        ));
    }
    Ok(())
}

pub(crate) fn valid_email(value: &str, _: &()) -> garde::Result {
    if !contact::is_valid_email(value.trim()) {
        return Err(garde::Error::new("is not a valid email address"));
    }
    Ok(())
}

/// Option<String>の電話番号はgardeのcustomに渡せないため、extra_rulesから呼ぶ
pub(crate) fn check_phone_number(phone: Option<&str>, errors: &mut Vec<String>) {
    if let Some(phone) = phone {
        if !contact::is_valid_phone_number(phone) {
            errors.push("phone_number: is not a valid phone number".to_string());
        }
    }
}

/// 明示的なトランザクション内で処理を実行する
///
/// 成功すればコミットし、失敗すればロールバックして元のエラーを返す。
/// ロールバック自体の失敗はログに残すだけにする。
pub(crate) async fn transactional<T>(
    uow: &dyn UnitOfWork,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    uow.begin_transaction()
        .await
        .persistence("Error starting transaction")?;

    match work.await {
        Ok(value) => {
            uow.commit().await.persistence("Error committing transaction")?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::error!(
                    error.cause_chain = ?rollback_err,
                    error.message = %rollback_err,
                    "Rollback failed"
                );
            }
            Err(err)
        }
    }
}
