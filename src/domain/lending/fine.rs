use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::audit::{AuditInfo, impl_entity};
use crate::domain::errors::{DomainResult, Violations, ensure, is_blank};
use crate::domain::value_objects::{EntityId, FineId, LoanId, MemberId, Money};

/// 未払いのまま経過すると延滞扱いになる日数
pub const FINE_OVERDUE_AFTER_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FineType {
    Overdue,
    Damage,
    Loss,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Online,
}

/// 罰金
///
/// ビジネスルール：
/// - 残額 = 金額 − 支払済額（負にならない）
/// - 分割払いの途中で一括支払いはできない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fine {
    id: FineId,
    member_id: MemberId,
    loan_id: Option<LoanId>,
    amount: Money,
    paid_amount: Money,
    reason: String,
    fine_type: FineType,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    payment_method: Option<PaymentMethod>,
    payment_reference: Option<String>,
    audit: AuditInfo,
}

impl_entity!(Fine, FineId);

impl Fine {
    pub fn create(
        member_id: MemberId,
        amount: Money,
        reason: &str,
        fine_type: FineType,
        loan_id: Option<LoanId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut v = Violations::new();
        v.require(!member_id.is_nil(), "Please provide a valid member ID.");
        v.require(amount.is_positive(), "Please provide a valid amount.");
        v.require(!is_blank(reason), "Please provide a valid reason.");

        v.finish(|| Fine {
            id: FineId::new(),
            member_id,
            loan_id,
            amount,
            paid_amount: Money::ZERO,
            reason: reason.to_string(),
            fine_type,
            is_paid: false,
            paid_at: None,
            payment_method: None,
            payment_reference: None,
            audit: AuditInfo::new(now),
        })
    }

    pub fn id(&self) -> FineId {
        self.id
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn loan_id(&self) -> Option<LoanId> {
        self.loan_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn paid_amount(&self) -> Money {
        self.paid_amount
    }

    pub fn remaining_amount(&self) -> Money {
        self.amount - self.paid_amount
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn fine_type(&self) -> FineType {
        self.fine_type
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_reference.as_deref()
    }

    /// 作成から30日を超えて未払い
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_paid
            && self.audit.created_at() + Duration::days(FINE_OVERDUE_AFTER_DAYS) < now
    }

    /// 一括支払い
    pub fn mark_as_paid(
        &mut self,
        method: PaymentMethod,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult {
        ensure(!self.is_paid, "Fine is already paid.")?;
        ensure(
            self.paid_amount.is_zero(),
            "Fine has partial payments. Use PartialPayment method to complete payment.",
        )?;
        self.is_paid = true;
        self.paid_at = Some(now);
        self.paid_amount = self.amount;
        self.payment_method = Some(method);
        self.payment_reference = reference;
        Ok(())
    }

    /// 分割払い。残額に達したら支払済みになる
    pub fn partial_payment(
        &mut self,
        amount: Money,
        method: PaymentMethod,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult {
        ensure(!self.is_paid, "Fine is already paid.")?;
        ensure(
            amount.is_positive(),
            "Payment amount must be greater than zero.",
        )?;
        ensure(
            amount <= self.remaining_amount(),
            "Payment amount exceeds remaining balance.",
        )?;
        self.paid_amount = self.paid_amount + amount;
        self.payment_method = Some(method);
        self.payment_reference = reference;
        if self.paid_amount >= self.amount {
            self.is_paid = true;
            self.paid_at = Some(now);
        }
        Ok(())
    }

    /// 免除。支払いなしで完了扱いにし、理由を追記する
    pub fn waive(&mut self, reason: &str, now: DateTime<Utc>) -> DomainResult {
        ensure(!self.is_paid, "Fine is already paid.")?;
        ensure(!is_blank(reason), "Waiver reason cannot be empty.")?;
        self.is_paid = true;
        self.paid_at = Some(now);
        self.reason = format!("{} [WAIVED: {}]", self.reason, reason);
        Ok(())
    }

    pub fn update_amount(&mut self, new_amount: Money) -> DomainResult {
        ensure(!self.is_paid, "Cannot update amount of a paid fine.")?;
        ensure(
            new_amount.is_positive(),
            "Fine amount must be greater than zero.",
        )?;
        ensure(
            new_amount >= self.paid_amount,
            "New amount cannot be less than already paid amount.",
        )?;
        self.amount = new_amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fine(cents: i64) -> Fine {
        Fine::create(
            MemberId::new(),
            Money::from_cents(cents),
            "Late return",
            FineType::Overdue,
            Some(LoanId::new()),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_create_validates() {
        let err = Fine::create(
            MemberId::new(),
            Money::ZERO,
            " ",
            FineType::Other,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn test_partial_payments_reach_paid() {
        let mut f = fine(1000);
        f.partial_payment(Money::from_cents(400), PaymentMethod::Cash, None, Utc::now())
            .unwrap();
        assert!(!f.is_paid());
        assert_eq!(f.remaining_amount(), Money::from_cents(600));

        f.partial_payment(Money::from_cents(600), PaymentMethod::Card, None, Utc::now())
            .unwrap();
        assert!(f.is_paid());
        assert_eq!(f.remaining_amount(), Money::ZERO);
        assert!(f.paid_at().is_some());
    }

    #[test]
    fn test_overpayment_rejected_without_mutation() {
        let mut f = fine(1000);
        f.partial_payment(Money::from_cents(300), PaymentMethod::Cash, None, Utc::now())
            .unwrap();
        let err = f
            .partial_payment(Money::from_cents(701), PaymentMethod::Cash, None, Utc::now())
            .unwrap_err();
        assert_eq!(err.errors(), ["Payment amount exceeds remaining balance."]);
        assert_eq!(f.paid_amount(), Money::from_cents(300));
        assert_eq!(f.payment_method(), Some(PaymentMethod::Cash));
    }

    #[test]
    fn test_mark_as_paid_blocked_by_partial_payment() {
        let mut f = fine(1000);
        f.partial_payment(Money::from_cents(100), PaymentMethod::Cash, None, Utc::now())
            .unwrap();
        assert!(f.mark_as_paid(PaymentMethod::Cash, None, Utc::now()).is_err());
    }

    #[test]
    fn test_mark_as_paid() {
        let mut f = fine(500);
        f.mark_as_paid(PaymentMethod::Online, Some("TX-1".into()), Utc::now())
            .unwrap();
        assert!(f.is_paid());
        assert_eq!(f.paid_amount(), Money::from_cents(500));
        assert_eq!(f.payment_reference(), Some("TX-1"));
        assert!(f.mark_as_paid(PaymentMethod::Online, None, Utc::now()).is_err());
    }

    #[test]
    fn test_waive_appends_note() {
        let mut f = fine(500);
        assert!(f.waive("", Utc::now()).is_err());
        f.waive("first offence", Utc::now()).unwrap();
        assert!(f.is_paid());
        assert_eq!(f.reason(), "Late return [WAIVED: first offence]");
        assert!(f.waive("again", Utc::now()).is_err());
    }

    #[test]
    fn test_update_amount_rules() {
        let mut f = fine(1000);
        f.partial_payment(Money::from_cents(400), PaymentMethod::Cash, None, Utc::now())
            .unwrap();
        assert!(f.update_amount(Money::from_cents(300)).is_err());
        assert!(f.update_amount(Money::ZERO).is_err());
        f.update_amount(Money::from_cents(1200)).unwrap();
        assert_eq!(f.remaining_amount(), Money::from_cents(800));
    }

    #[test]
    fn test_is_overdue_after_thirty_days() {
        let f = fine(100);
        assert!(!f.is_overdue(Utc::now()));
        assert!(f.is_overdue(Utc::now() + Duration::days(31)));
    }
}
