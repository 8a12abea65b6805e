use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::audit::{AuditInfo, impl_entity};
use crate::domain::errors::{DomainResult, Violations, ensure, is_blank};
use crate::domain::value_objects::{BookCopyId, EntityId, FineId, LoanId, MemberId, Money};

/// 貸出期間（日数）
pub const DEFAULT_LOAN_DAYS: i64 = 14;

/// 延長回数の上限
pub const MAX_RENEWALS: u32 = 2;

/// 貸出の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    Active,
    Overdue,
    ReturnedLate,
    ReturnedOnTime,
}

impl LoanStatus {
    pub fn is_returned(&self) -> bool {
        matches!(self, LoanStatus::ReturnedLate | LoanStatus::ReturnedOnTime)
    }
}

/// Loan集約 - 1冊の蔵書の1回の貸出
///
/// 1冊に同時に1件の未返却貸出しか存在しないことは
/// エンティティではなくアプリケーション層の検証で保証する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    id: LoanId,
    member_id: MemberId,
    book_copy_id: BookCopyId,
    loan_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    return_date: Option<DateTime<Utc>>,
    status: LoanStatus,
    renewal_count: u32,
    max_renewals: u32,
    notes: Option<String>,
    fine_id: Option<FineId>,
    audit: AuditInfo,
}

impl_entity!(Loan, LoanId);

impl Loan {
    /// 純粋関数：書籍を貸し出す
    ///
    /// ビジネスルール：
    /// - 貸出日は now、返却期限は now + loan_duration_days
    /// - 状態はActive、延長回数は0
    pub fn create(
        member_id: MemberId,
        book_copy_id: BookCopyId,
        loan_duration_days: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut v = Violations::new();
        v.require(!member_id.is_nil(), "Member ID cannot be empty.");
        v.require(!book_copy_id.is_nil(), "Book copy ID cannot be empty.");
        v.require(
            loan_duration_days > 0,
            "Loan duration must be greater than zero days.",
        );

        v.finish(|| Loan {
            id: LoanId::new(),
            member_id,
            book_copy_id,
            loan_date: now,
            due_date: now + Duration::days(loan_duration_days),
            return_date: None,
            status: LoanStatus::Active,
            renewal_count: 0,
            max_renewals: MAX_RENEWALS,
            notes: None,
            fine_id: None,
            audit: AuditInfo::new(now),
        })
    }

    pub fn id(&self) -> LoanId {
        self.id
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn book_copy_id(&self) -> BookCopyId {
        self.book_copy_id
    }

    pub fn loan_date(&self) -> DateTime<Utc> {
        self.loan_date
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn return_date(&self) -> Option<DateTime<Utc>> {
        self.return_date
    }

    pub fn status(&self) -> LoanStatus {
        self.status
    }

    pub fn renewal_count(&self) -> u32 {
        self.renewal_count
    }

    pub fn max_renewals(&self) -> u32 {
        self.max_renewals
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn fine_id(&self) -> Option<FineId> {
        self.fine_id
    }

    /// 返却期限を過ぎていて未返却
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date < now && self.return_date.is_none()
    }

    /// 未返却（ActiveまたはOverdue）
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active && self.return_date.is_none()
    }

    /// 延長可能か
    ///
    /// ビジネスルール：
    /// - 延長回数が上限未満
    /// - Active状態
    /// - 延滞していない
    /// - 罰金が紐づいていない
    pub fn can_be_renewed(&self, now: DateTime<Utc>) -> bool {
        self.renewal_count < self.max_renewals
            && self.status == LoanStatus::Active
            && !self.is_overdue(now)
            && self.fine_id.is_none()
    }

    /// 延滞日数。返却済みなら返却日で計算する
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        let reference = self.return_date.unwrap_or(now);
        (reference - self.due_date).num_days().max(0)
    }

    /// 延滞料金 = 延滞日数 × 日額（副作用なし）
    pub fn calculate_overdue_fine(&self, daily_rate: Money, now: DateTime<Utc>) -> Money {
        if !daily_rate.is_positive() {
            return Money::ZERO;
        }
        daily_rate * self.days_overdue(now)
    }

    pub fn renew(&mut self, additional_days: i64, now: DateTime<Utc>) -> DomainResult {
        ensure(self.can_be_renewed(now), "Loan cannot be renewed.")?;
        ensure(
            additional_days > 0,
            "Additional days must be greater than zero.",
        )?;
        self.due_date += Duration::days(additional_days);
        self.renewal_count += 1;
        Ok(())
    }

    /// 返却。期限後ならReturnedLate、期限内ならReturnedOnTime
    pub fn return_loan(&mut self, now: DateTime<Utc>) -> DomainResult {
        ensure(
            self.return_date.is_none(),
            "Loan has already been returned.",
        )?;
        self.return_date = Some(now);
        self.status = if now > self.due_date {
            LoanStatus::ReturnedLate
        } else {
            LoanStatus::ReturnedOnTime
        };
        Ok(())
    }

    pub fn mark_overdue(&mut self, now: DateTime<Utc>) -> DomainResult {
        ensure(self.is_overdue(now), "Loan is not overdue.")?;
        ensure(
            self.status != LoanStatus::Overdue,
            "Loan is already marked as overdue.",
        )?;
        self.status = LoanStatus::Overdue;
        Ok(())
    }

    pub fn add_fine(&mut self, fine_id: FineId) -> DomainResult {
        ensure(!fine_id.is_nil(), "Fine ID cannot be empty.")?;
        ensure(
            self.fine_id.is_none(),
            "Fine already associated with this loan.",
        )?;
        self.fine_id = Some(fine_id);
        Ok(())
    }

    pub fn add_notes(&mut self, notes: &str) -> DomainResult {
        ensure(!is_blank(notes), "Notes cannot be empty.")?;
        self.notes = Some(match self.notes.take() {
            Some(existing) => format!("{existing}\n{notes}"),
            None => notes.to_string(),
        });
        Ok(())
    }
}
