use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::{LibraryUser, Role, UserProfile};
use crate::domain::audit::{AuditInfo, impl_entity};
use crate::domain::errors::{DomainResult, Violations, ensure};
use crate::domain::value_objects::{FineId, LoanId, MemberId, Money, ReservationId, UserId};

/// 会員種別（順序はアップグレードの上下関係）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MembershipType {
    None,
    Basic,
    Premium,
    Vip,
}

impl MembershipType {
    /// 同時貸出の上限
    pub fn max_loans(&self) -> usize {
        match self {
            MembershipType::Basic => 3,
            MembershipType::Premium => 5,
            MembershipType::Vip => 10,
            MembershipType::None => 1,
        }
    }

    /// 同時予約の上限
    pub fn max_reservations(&self) -> usize {
        match self {
            MembershipType::Basic => 2,
            MembershipType::Premium => 4,
            MembershipType::Vip => 8,
            MembershipType::None => 1,
        }
    }
}

/// 会員資格の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipState {
    Active,
    Suspended,
    Expired,
}

/// Member集約
///
/// ビジネスルール：
/// - 貸出・予約の追加は会員資格が有効で上限未満のときのみ
/// - 同じIDの重複登録は不可
/// - 未払い罰金の残高を保持する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    id: MemberId,
    profile: UserProfile,
    membership_type: MembershipType,
    membership_start_date: DateTime<Utc>,
    membership_expiry: DateTime<Utc>,
    state: MembershipState,
    outstanding_fines: Money,
    active_loan_ids: Vec<LoanId>,
    active_reservation_ids: Vec<ReservationId>,
    fine_ids: Vec<FineId>,
    audit: AuditInfo,
}

impl_entity!(Member, MemberId);

impl Member {
    pub fn create(
        profile: UserProfile,
        membership_type: MembershipType,
        membership_start_date: DateTime<Utc>,
        membership_expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut v = Violations::new();
        v.require(
            membership_start_date < membership_expiry,
            "Membership start date must be before the expiry date.",
        );
        v.require(
            membership_type != MembershipType::None,
            "Membership type is required.",
        );

        v.finish(|| Member {
            id: MemberId::new(),
            profile,
            membership_type,
            membership_start_date,
            membership_expiry,
            state: MembershipState::Active,
            outstanding_fines: Money::ZERO,
            active_loan_ids: Vec::new(),
            active_reservation_ids: Vec::new(),
            fine_ids: Vec::new(),
            audit: AuditInfo::new(now),
        })
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn email(&self) -> &str {
        self.profile.email()
    }

    pub fn membership_type(&self) -> MembershipType {
        self.membership_type
    }

    pub fn membership_start_date(&self) -> DateTime<Utc> {
        self.membership_start_date
    }

    pub fn membership_expiry(&self) -> DateTime<Utc> {
        self.membership_expiry
    }

    pub fn state(&self) -> MembershipState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == MembershipState::Active
    }

    pub fn outstanding_fines(&self) -> Money {
        self.outstanding_fines
    }

    pub fn active_loan_ids(&self) -> &[LoanId] {
        &self.active_loan_ids
    }

    pub fn active_reservation_ids(&self) -> &[ReservationId] {
        &self.active_reservation_ids
    }

    pub fn fine_ids(&self) -> &[FineId] {
        &self.fine_ids
    }

    pub fn max_loans_allowed(&self) -> usize {
        self.membership_type.max_loans()
    }

    pub fn max_reservations_allowed(&self) -> usize {
        self.membership_type.max_reservations()
    }

    /// 停止・失効されておらず、有効期限内
    pub fn is_membership_active(&self, now: DateTime<Utc>) -> bool {
        self.state == MembershipState::Active && self.membership_expiry >= now
    }

    pub fn can_borrow_books(&self, now: DateTime<Utc>) -> bool {
        self.is_membership_active(now) && self.active_loan_ids.len() < self.max_loans_allowed()
    }

    pub fn can_make_reservations(&self, now: DateTime<Utc>) -> bool {
        self.is_membership_active(now)
            && self.active_reservation_ids.len() < self.max_reservations_allowed()
    }

    pub fn has_outstanding_fines(&self) -> bool {
        self.outstanding_fines.is_positive()
    }

    /// 有効期限の延長。失効中なら再び有効になる
    pub fn extend_membership(
        &mut self,
        new_expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DomainResult {
        ensure(
            new_expiry > self.membership_expiry,
            "New expiry date must be after current expiry date.",
        )?;
        self.membership_expiry = new_expiry;
        if self.state == MembershipState::Expired && new_expiry >= now {
            self.state = MembershipState::Active;
        }
        Ok(())
    }

    /// 上位の種別へのみ変更可能
    pub fn upgrade_membership(&mut self, new_type: MembershipType) -> DomainResult {
        ensure(
            new_type > self.membership_type,
            "Invalid membership type for upgrade.",
        )?;
        self.membership_type = new_type;
        Ok(())
    }

    pub fn add_loan(&mut self, loan_id: LoanId, now: DateTime<Utc>) -> DomainResult {
        ensure(self.is_membership_active(now), "Membership is not active.")?;
        ensure(
            self.active_loan_ids.len() < self.max_loans_allowed(),
            "Maximum active loans limit reached.",
        )?;
        ensure(
            !self.active_loan_ids.contains(&loan_id),
            "Loan already exists.",
        )?;
        self.active_loan_ids.push(loan_id);
        Ok(())
    }

    pub fn complete_loan(&mut self, loan_id: LoanId) -> DomainResult {
        ensure(
            self.active_loan_ids.contains(&loan_id),
            "Loan not found in active loans.",
        )?;
        self.active_loan_ids.retain(|l| *l != loan_id);
        Ok(())
    }

    pub fn add_reservation(
        &mut self,
        reservation_id: ReservationId,
        now: DateTime<Utc>,
    ) -> DomainResult {
        ensure(self.is_membership_active(now), "Membership is not active.")?;
        ensure(
            self.active_reservation_ids.len() < self.max_reservations_allowed(),
            "Maximum active reservations limit reached.",
        )?;
        ensure(
            !self.active_reservation_ids.contains(&reservation_id),
            "Reservation already exists.",
        )?;
        self.active_reservation_ids.push(reservation_id);
        Ok(())
    }

    pub fn complete_reservation(&mut self, reservation_id: ReservationId) -> DomainResult {
        ensure(
            self.active_reservation_ids.contains(&reservation_id),
            "Reservation not found in active reservations.",
        )?;
        self.active_reservation_ids.retain(|r| *r != reservation_id);
        Ok(())
    }

    pub fn add_fine(&mut self, fine_id: FineId, amount: Money) -> DomainResult {
        ensure(
            amount.is_positive(),
            "Fine amount must be greater than zero.",
        )?;
        ensure(!self.fine_ids.contains(&fine_id), "Fine already exists.")?;
        self.fine_ids.push(fine_id);
        self.outstanding_fines = self.outstanding_fines + amount;
        Ok(())
    }

    /// 罰金残高を減らす。罰金IDは完済時にclose_fineで外す
    pub fn pay_fine(&mut self, fine_id: FineId, amount: Money) -> DomainResult {
        ensure(self.fine_ids.contains(&fine_id), "Fine not found.")?;
        ensure(
            amount.is_positive(),
            "Payment amount must be greater than zero.",
        )?;
        ensure(
            amount <= self.outstanding_fines,
            "Payment amount exceeds outstanding fines.",
        )?;
        self.outstanding_fines = self.outstanding_fines - amount;
        Ok(())
    }

    /// 完済または免除された罰金のIDを外す（残高は変えない）
    pub fn close_fine(&mut self, fine_id: FineId) -> DomainResult {
        ensure(self.fine_ids.contains(&fine_id), "Fine not found.")?;
        self.fine_ids.retain(|f| *f != fine_id);
        Ok(())
    }

    pub fn suspend(&mut self) -> DomainResult {
        ensure(
            self.state != MembershipState::Suspended,
            "Member is already suspended.",
        )?;
        self.state = MembershipState::Suspended;
        Ok(())
    }

    pub fn reactivate(&mut self) -> DomainResult {
        ensure(
            self.state != MembershipState::Active,
            "Member is already active.",
        )?;
        ensure(
            self.state != MembershipState::Expired,
            "Expired membership must be extended before reactivation.",
        )?;
        self.state = MembershipState::Active;
        Ok(())
    }

    /// 有効期限切れを確定させる
    pub fn mark_expired(&mut self, now: DateTime<Utc>) -> DomainResult {
        ensure(
            self.state != MembershipState::Expired,
            "Membership is already expired.",
        )?;
        ensure(
            self.membership_expiry < now,
            "Membership has not expired yet.",
        )?;
        self.state = MembershipState::Expired;
        Ok(())
    }
}

impl LibraryUser for Member {
    fn user_id(&self) -> UserId {
        self.id
    }

    fn profile(&self) -> &UserProfile {
        &self.profile
    }

    fn role(&self) -> Role {
        Role::Member
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn member(kind: MembershipType) -> Member {
        let now = Utc::now();
        let profile = UserProfile::create("Ada", "Lovelace", "ada@example.com", None).unwrap();
        Member::create(profile, kind, now, now + Duration::days(365), now).unwrap()
    }

    #[test]
    fn test_create_rejects_none_type_and_bad_dates() {
        let now = Utc::now();
        let profile = UserProfile::create("Ada", "Lovelace", "ada@example.com", None).unwrap();
        let err = Member::create(profile, MembershipType::None, now, now, now).unwrap_err();
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn test_caps_follow_membership_type() {
        assert_eq!(member(MembershipType::Basic).max_loans_allowed(), 3);
        assert_eq!(member(MembershipType::Premium).max_loans_allowed(), 5);
        assert_eq!(member(MembershipType::Vip).max_reservations_allowed(), 8);
        assert_eq!(MembershipType::None.max_loans(), 1);
    }

    #[test]
    fn test_add_loan_enforces_cap_and_duplicates() {
        let now = Utc::now();
        let mut m = member(MembershipType::Basic);
        let first = LoanId::new();
        m.add_loan(first, now).unwrap();
        assert!(m.add_loan(first, now).is_err());
        m.add_loan(LoanId::new(), now).unwrap();
        m.add_loan(LoanId::new(), now).unwrap();
        assert!(!m.can_borrow_books(now));

        let err = m.add_loan(LoanId::new(), now).unwrap_err();
        assert_eq!(err.errors(), ["Maximum active loans limit reached."]);
    }

    #[test]
    fn test_suspended_member_cannot_borrow() {
        let now = Utc::now();
        let mut m = member(MembershipType::Basic);
        m.suspend().unwrap();
        assert!(m.suspend().is_err());
        let err = m.add_loan(LoanId::new(), now).unwrap_err();
        assert_eq!(err.errors(), ["Membership is not active."]);

        m.reactivate().unwrap();
        assert!(m.reactivate().is_err());
        assert!(m.can_borrow_books(now));
    }

    #[test]
    fn test_expired_membership_blocks_reservations() {
        let mut m = member(MembershipType::Basic);
        let later = Utc::now() + Duration::days(400);
        assert!(!m.can_make_reservations(later));
        assert!(m.add_reservation(ReservationId::new(), later).is_err());

        m.mark_expired(later).unwrap();
        assert_eq!(m.state(), MembershipState::Expired);
        assert!(m.reactivate().is_err());

        m.extend_membership(later + Duration::days(30), later).unwrap();
        assert!(m.is_membership_active(later));
    }

    #[test]
    fn test_mark_expired_requires_passed_expiry() {
        let mut m = member(MembershipType::Basic);
        assert!(m.mark_expired(Utc::now()).is_err());
    }

    #[test]
    fn test_complete_loan_requires_known_id() {
        let now = Utc::now();
        let mut m = member(MembershipType::Basic);
        assert!(m.complete_loan(LoanId::new()).is_err());
        let id = LoanId::new();
        m.add_loan(id, now).unwrap();
        m.complete_loan(id).unwrap();
        assert!(m.active_loan_ids().is_empty());
    }

    #[test]
    fn test_reservations_cap() {
        let now = Utc::now();
        let mut m = member(MembershipType::Basic);
        m.add_reservation(ReservationId::new(), now).unwrap();
        m.add_reservation(ReservationId::new(), now).unwrap();
        assert!(m.add_reservation(ReservationId::new(), now).is_err());
    }

    #[test]
    fn test_fines_update_balance() {
        let mut m = member(MembershipType::Basic);
        let fine = FineId::new();
        m.add_fine(fine, Money::from_cents(300)).unwrap();
        assert!(m.add_fine(fine, Money::from_cents(300)).is_err());
        assert!(m.has_outstanding_fines());

        assert!(m.pay_fine(fine, Money::from_cents(301)).is_err());
        m.pay_fine(fine, Money::from_cents(100)).unwrap();
        assert_eq!(m.outstanding_fines(), Money::from_cents(200));
        assert_eq!(m.fine_ids(), [fine]);

        m.pay_fine(fine, Money::from_cents(200)).unwrap();
        m.close_fine(fine).unwrap();
        assert!(m.fine_ids().is_empty());
        assert!(m.pay_fine(fine, Money::from_cents(1)).is_err());
        assert!(m.close_fine(fine).is_err());
    }

    #[test]
    fn test_settled_fine_is_closed_while_others_remain() {
        let mut m = member(MembershipType::Basic);
        let first = FineId::new();
        let second = FineId::new();
        m.add_fine(first, Money::from_cents(300)).unwrap();
        m.add_fine(second, Money::from_cents(500)).unwrap();

        m.pay_fine(first, Money::from_cents(300)).unwrap();
        m.close_fine(first).unwrap();

        assert_eq!(m.fine_ids(), [second]);
        assert_eq!(m.outstanding_fines(), Money::from_cents(500));
        assert!(m.pay_fine(first, Money::from_cents(100)).is_err());
    }

    #[test]
    fn test_upgrade_only_to_higher_tier() {
        let mut m = member(MembershipType::Premium);
        assert!(m.upgrade_membership(MembershipType::Basic).is_err());
        assert!(m.upgrade_membership(MembershipType::Premium).is_err());
        m.upgrade_membership(MembershipType::Vip).unwrap();
        assert_eq!(m.max_loans_allowed(), 10);
    }

    #[test]
    fn test_extend_membership_must_move_forward() {
        let now = Utc::now();
        let mut m = member(MembershipType::Basic);
        assert!(m.extend_membership(now, now).is_err());
        m.extend_membership(now + Duration::days(800), now).unwrap();
    }

    #[test]
    fn test_member_role() {
        let m = member(MembershipType::Basic);
        assert_eq!(m.role(), Role::Member);
        assert!(m.can_access_resource("Catalog"));
        assert_eq!(m.profile().email(), "ada@example.com");
    }
}
