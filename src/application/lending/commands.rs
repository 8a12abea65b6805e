use crate::application::validation::{FormatRules, not_blank};
use crate::domain::lending::PaymentMethod;
use crate::domain::{BookCopyId, BookId, EntityId, LoanId, MemberId};
use garde::Validate;
use serde::Deserialize;

fn require_id(id: &impl EntityId, field: &str, errors: &mut Vec<String>) {
    if id.is_nil() {
        errors.push(format!("{field}: is required"));
    }
}

/// 貸出
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Checkout {
    #[garde(skip)]
    pub member_id: MemberId,
    #[garde(skip)]
    pub book_copy_id: BookCopyId,
}

impl FormatRules for Checkout {
    fn extra_rules(&self, errors: &mut Vec<String>) {
        require_id(&self.member_id, "member_id", errors);
        require_id(&self.book_copy_id, "book_copy_id", errors);
    }
}

/// 予約
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReservation {
    #[garde(skip)]
    pub book_id: BookId,
    #[garde(skip)]
    pub member_id: MemberId,
}

impl FormatRules for CreateReservation {
    fn extra_rules(&self, errors: &mut Vec<String>) {
        require_id(&self.book_id, "book_id", errors);
        require_id(&self.member_id, "member_id", errors);
    }
}

/// 予約に蔵書を割り当てて受取可能にする
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MarkReservationReady {
    #[garde(skip)]
    pub book_copy_id: BookCopyId,
}

impl FormatRules for MarkReservationReady {
    fn extra_rules(&self, errors: &mut Vec<String>) {
        require_id(&self.book_copy_id, "book_copy_id", errors);
    }
}

/// 予約を貸出で完了させる
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FulfillReservation {
    #[garde(skip)]
    pub loan_id: LoanId,
}

impl FormatRules for FulfillReservation {
    fn extra_rules(&self, errors: &mut Vec<String>) {
        require_id(&self.loan_id, "loan_id", errors);
    }
}

/// 予約期限の延長
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExtendReservation {
    #[garde(range(min = 1, max = 30))]
    pub days: i64,
}

impl FormatRules for ExtendReservation {}

/// 罰金の支払い
///
/// amount_centsを省略すると残額を一括で支払う。
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PayFine {
    #[garde(range(min = 1))]
    pub amount_cents: Option<i64>,
    #[garde(skip)]
    pub method: PaymentMethod,
    #[garde(length(chars, max = 100))]
    pub reference: Option<String>,
}

impl FormatRules for PayFine {}

/// 罰金の免除
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WaiveFine {
    #[garde(custom(not_blank), length(chars, max = 500))]
    pub reason: String,
}

impl FormatRules for WaiveFine {}
