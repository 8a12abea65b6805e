use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::audit::{AuditInfo, impl_entity};
use crate::domain::errors::{DomainResult, Violations, ensure};
use crate::domain::value_objects::{BookCopyId, BookId, EntityId, LoanId, MemberId, ReservationId};

/// 予約の有効日数
pub const DEFAULT_RESERVATION_DAYS: i64 = 7;

/// 予約の状態
///
/// Pending → Active → Ready → Fulfilled（終端）
/// 終端以外からCanceled・Expiredへ遷移できる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Active,
    Ready,
    Fulfilled,
    Expired,
    Canceled,
}

impl ReservationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Fulfilled | ReservationStatus::Expired | ReservationStatus::Canceled
        )
    }

    /// 待ち行列に並んでいる状態
    pub fn is_queued(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Active)
    }
}

/// 予約
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    book_id: BookId,
    member_id: MemberId,
    reservation_date: DateTime<Utc>,
    expiration_date: DateTime<Utc>,
    status: ReservationStatus,
    queue_position: u32,
    ready_date: Option<DateTime<Utc>>,
    ready_copy_id: Option<BookCopyId>,
    notes: Option<String>,
    audit: AuditInfo,
}

impl_entity!(Reservation, ReservationId);

impl Reservation {
    pub fn create(
        book_id: BookId,
        member_id: MemberId,
        reservation_days: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut v = Violations::new();
        v.require(!book_id.is_nil(), "Book ID cannot be empty.");
        v.require(!member_id.is_nil(), "Member ID cannot be empty.");
        v.require(
            reservation_days > 0,
            "Reservation days must be greater than zero.",
        );

        v.finish(|| Reservation {
            id: ReservationId::new(),
            book_id,
            member_id,
            reservation_date: now,
            expiration_date: now + Duration::days(reservation_days),
            status: ReservationStatus::Pending,
            queue_position: 1,
            ready_date: None,
            ready_copy_id: None,
            notes: None,
            audit: AuditInfo::new(now),
        })
    }

    pub fn id(&self) -> ReservationId {
        self.id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn reservation_date(&self) -> DateTime<Utc> {
        self.reservation_date
    }

    pub fn expiration_date(&self) -> DateTime<Utc> {
        self.expiration_date
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn queue_position(&self) -> u32 {
        self.queue_position
    }

    pub fn ready_date(&self) -> Option<DateTime<Utc>> {
        self.ready_date
    }

    /// 取置中の蔵書
    pub fn ready_copy_id(&self) -> Option<BookCopyId> {
        self.ready_copy_id
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// 期限切れで、まだ終端状態でない
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date < now && !self.status.is_terminal()
    }

    pub fn is_ready(&self) -> bool {
        self.status == ReservationStatus::Ready && self.ready_date.is_some()
    }

    fn append_note(&mut self, note: String) {
        self.notes = Some(match self.notes.take() {
            Some(existing) => format!("{existing}\n{note}"),
            None => note,
        });
    }

    pub fn activate(&mut self) -> DomainResult {
        ensure(
            self.status == ReservationStatus::Pending,
            "Reservation can only be activated when in pending status.",
        )?;
        self.status = ReservationStatus::Active;
        Ok(())
    }

    pub fn mark_as_ready(&mut self, copy_id: BookCopyId, now: DateTime<Utc>) -> DomainResult {
        ensure(
            self.status.is_queued(),
            "Only active or pending reservations can be marked as ready.",
        )?;
        ensure(!copy_id.is_nil(), "Available copy ID cannot be empty.")?;
        self.status = ReservationStatus::Ready;
        self.ready_date = Some(now);
        self.ready_copy_id = Some(copy_id);
        self.append_note(format!("Copy {copy_id} available for pickup"));
        Ok(())
    }

    pub fn fulfill(&mut self, loan_id: LoanId) -> DomainResult {
        ensure(
            self.status == ReservationStatus::Ready,
            "Only ready reservations can be fulfilled.",
        )?;
        ensure(!loan_id.is_nil(), "Loan ID cannot be empty.")?;
        self.status = ReservationStatus::Fulfilled;
        self.append_note(format!("Fulfilled with loan {loan_id}"));
        Ok(())
    }

    pub fn cancel(&mut self) -> DomainResult {
        ensure(
            self.status != ReservationStatus::Fulfilled,
            "Cannot cancel a fulfilled reservation.",
        )?;
        ensure(
            self.status != ReservationStatus::Canceled,
            "Reservation is already canceled.",
        )?;
        self.status = ReservationStatus::Canceled;
        Ok(())
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> DomainResult {
        ensure(
            !matches!(
                self.status,
                ReservationStatus::Fulfilled | ReservationStatus::Canceled
            ),
            "Cannot expire a fulfilled or canceled reservation.",
        )?;
        ensure(
            self.status != ReservationStatus::Expired,
            "Reservation is already expired.",
        )?;
        ensure(self.is_expired(now), "Reservation has not yet expired.")?;
        self.status = ReservationStatus::Expired;
        Ok(())
    }

    pub fn update_queue_position(&mut self, position: u32) -> DomainResult {
        ensure(position > 0, "Queue position must be greater than zero.")?;
        ensure(
            self.status.is_queued(),
            "Queue position can only be updated for active or pending reservations.",
        )?;
        self.queue_position = position;
        Ok(())
    }

    pub fn extend_expiration(&mut self, additional_days: i64) -> DomainResult {
        ensure(
            additional_days > 0,
            "Additional days must be greater than zero.",
        )?;
        ensure(
            !self.status.is_terminal(),
            "Cannot extend expired, canceled, or fulfilled reservations.",
        )?;
        self.expiration_date += Duration::days(additional_days);
        Ok(())
    }
}
