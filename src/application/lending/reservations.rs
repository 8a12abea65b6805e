use std::collections::HashMap;

use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{PersistenceContext, Result};
use crate::application::lookup::require;
use crate::application::result::{OperationResult, boundary};
use crate::application::validation::{FormatRules, RuleViolations};
use crate::domain::catalog::{Book, BookCopy, BookCopyStatus};
use crate::domain::lending::{Loan, Reservation, ReservationStatus};
use crate::domain::notification::{Notification, NotificationType};
use crate::domain::users::Member;
use crate::domain::{BookCopyId, BookId, DomainResult, Entity, MemberId, ReservationId};
use crate::ports::UnitOfWork;
use chrono::{DateTime, Utc};

use super::commands::{
    CreateReservation, ExtendReservation, FulfillReservation, MarkReservationReady,
};
use super::loans::{COPY_NOT_FOUND, LOAN_NOT_FOUND, MEMBER_NOT_FOUND};

const NOT_FOUND: &str = "Reservation not found.";

pub async fn get_reservation(
    deps: &ServiceDependencies,
    id: ReservationId,
) -> OperationResult<Reservation> {
    boundary("get_reservation", async {
        let uow = deps.unit_of_work();
        require(uow.reservations(), id, NOT_FOUND).await
    })
    .await
}

pub async fn get_reservations_by_member(
    deps: &ServiceDependencies,
    member_id: MemberId,
) -> OperationResult<Vec<Reservation>> {
    boundary("get_reservations_by_member", async {
        let work = deps.unit_of_work();
        let uow = work.as_ref();
        require::<Member, _>(uow.members(), member_id, MEMBER_NOT_FOUND).await?;
        uow.reservations()
            .get_by_member(member_id)
            .await
            .persistence("Error loading reservations")
    })
    .await
}

/// 予約の作成
///
/// ビジネスルール：
/// - 会員と書籍が存在すること
/// - 会員が予約可能（会員資格が有効で予約上限未満）であること
/// - 同じ書籍に対して未完了の予約を重ねて作れない
///
/// 待ち順は、その書籍の未完了の予約の最後尾。
pub async fn create_reservation(
    deps: &ServiceDependencies,
    cmd: CreateReservation,
    now: DateTime<Utc>,
) -> OperationResult<Reservation> {
    boundary("create_reservation", create(deps, cmd, now)).await
}

/// 予約の取消
///
/// 取置中の蔵書があれば書架に戻し、後ろに並んでいる予約の待ち順を詰める。
pub async fn cancel_reservation(
    deps: &ServiceDependencies,
    id: ReservationId,
    now: DateTime<Utc>,
) -> OperationResult<Reservation> {
    boundary("cancel_reservation", cancel(deps, id, now)).await
}

/// 予約に蔵書を割り当て、受取可能として会員に通知する
pub async fn mark_reservation_ready(
    deps: &ServiceDependencies,
    id: ReservationId,
    cmd: MarkReservationReady,
    now: DateTime<Utc>,
) -> OperationResult<Reservation> {
    boundary("mark_reservation_ready", async {
        cmd.check_format()?;
        mark_ready(deps, id, cmd.book_copy_id, now).await
    })
    .await
}

/// 受取可能な予約を貸出で完了させる
pub async fn fulfill_reservation(
    deps: &ServiceDependencies,
    id: ReservationId,
    cmd: FulfillReservation,
    now: DateTime<Utc>,
) -> OperationResult<Reservation> {
    boundary("fulfill_reservation", async {
        cmd.check_format()?;
        fulfill(deps, id, cmd, now).await
    })
    .await
}

pub async fn extend_reservation(
    deps: &ServiceDependencies,
    id: ReservationId,
    cmd: ExtendReservation,
    now: DateTime<Utc>,
) -> OperationResult<Reservation> {
    boundary("extend_reservation", async {
        cmd.check_format()?;
        extend(deps, id, cmd.days, now).await
    })
    .await
}

/// 期限切れ予約の一括処理
///
/// 期限を過ぎた未完了の予約をExpiredにし、取置中の蔵書を書架に戻す。
///
/// # 戻り値
/// 期限切れにした予約の件数
pub async fn expire_due_reservations(
    deps: &ServiceDependencies,
    now: DateTime<Utc>,
) -> OperationResult<usize> {
    boundary("expire_due_reservations", expire_due(deps, now)).await
}

/// 取り除いた予約より後ろに並ぶ予約の待ち順を詰める
///
/// 変更した予約だけを返す。
fn close_queue_gaps(
    open: Vec<Reservation>,
    removed: &[(ReservationId, u32)],
) -> DomainResult<Vec<Reservation>> {
    let mut changed = Vec::new();
    for mut reservation in open {
        let is_removed = removed.iter().any(|(id, _)| *id == reservation.id());
        if is_removed || !reservation.status().is_queued() {
            continue;
        }
        let position = reservation.queue_position();
        let shift = removed.iter().filter(|(_, p)| *p < position).count() as u32;
        if shift > 0 {
            reservation.update_queue_position(position.saturating_sub(shift).max(1))?;
            changed.push(reservation);
        }
    }
    Ok(changed)
}

pub(super) async fn requeue(
    uow: &dyn UnitOfWork,
    book_id: BookId,
    removed: &[(ReservationId, u32)],
    now: DateTime<Utc>,
) -> Result<()> {
    let open = uow
        .reservations()
        .get_open_for_book(book_id)
        .await
        .persistence("Error loading reservations")?;
    for mut reservation in close_queue_gaps(open, removed)? {
        reservation.audit_mut().touch(now);
        uow.reservations()
            .update(reservation)
            .await
            .persistence("Error saving reservations")?;
    }
    Ok(())
}

async fn create(
    deps: &ServiceDependencies,
    cmd: CreateReservation,
    now: DateTime<Utc>,
) -> Result<Reservation> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    cmd.check_format()?;

    let mut member: Member = require(uow.members(), cmd.member_id, MEMBER_NOT_FOUND).await?;
    require::<Book, _>(uow.books(), cmd.book_id, "Book not found.").await?;

    let open = uow
        .reservations()
        .get_open_for_book(cmd.book_id)
        .await
        .persistence("Error loading reservations")?;

    let mut rules = RuleViolations::new();
    rules.check(
        member.can_make_reservations(now),
        "Member cannot make reservations at this time.",
    );
    rules.check(
        !open.iter().any(|r| r.member_id() == member.id()),
        "Member already has an active reservation for this book.",
    );
    rules.into_result()?;

    let mut reservation = Reservation::create(
        cmd.book_id,
        member.id(),
        deps.policy.reservation_days,
        now,
    )?;
    let position = open
        .iter()
        .map(Reservation::queue_position)
        .max()
        .unwrap_or(0)
        + 1;
    if position > 1 {
        reservation.update_queue_position(position)?;
    }
    member.add_reservation(reservation.id(), now)?;
    member.audit_mut().touch(now);

    uow.reservations()
        .add(reservation.clone())
        .await
        .persistence("Error saving reservation")?;
    uow.members()
        .update(member)
        .await
        .persistence("Error saving reservation")?;
    uow.save_changes()
        .await
        .persistence("Error saving reservation")?;

    tracing::info!(
        reservation_id = %reservation.id(),
        book_id = %reservation.book_id(),
        member_id = %reservation.member_id(),
        queue_position = reservation.queue_position(),
        "Reservation created"
    );
    Ok(reservation)
}

async fn cancel(
    deps: &ServiceDependencies,
    id: ReservationId,
    now: DateTime<Utc>,
) -> Result<Reservation> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut reservation: Reservation = require(uow.reservations(), id, NOT_FOUND).await?;
    let position = reservation.queue_position();
    let previous = reservation.status();

    reservation.cancel()?;
    reservation.audit_mut().touch(now);

    // 取置中の蔵書を書架に戻す
    if let Some(copy_id) = reservation.ready_copy_id() {
        if previous == ReservationStatus::Ready {
            release_copy(uow, copy_id, now).await?;
        }
    }

    if let Some(mut member) = uow
        .members()
        .get_by_id(reservation.member_id())
        .await
        .persistence("Error loading member")?
    {
        if member.active_reservation_ids().contains(&id) {
            member.complete_reservation(id)?;
            member.audit_mut().touch(now);
            uow.members()
                .update(member)
                .await
                .persistence("Error canceling reservation")?;
        }
    }

    if !previous.is_terminal() {
        requeue(uow, reservation.book_id(), &[(id, position)], now).await?;
    }
    uow.reservations()
        .update(reservation.clone())
        .await
        .persistence("Error canceling reservation")?;
    uow.save_changes()
        .await
        .persistence("Error canceling reservation")?;

    tracing::info!(reservation_id = %id, "Reservation canceled");
    Ok(reservation)
}

/// Reservedの蔵書をAvailableに戻す（既に他の状態なら何もしない）
async fn release_copy(uow: &dyn UnitOfWork, copy_id: BookCopyId, now: DateTime<Utc>) -> Result<()> {
    let copy = uow
        .book_copies()
        .get_by_id(copy_id)
        .await
        .persistence("Error loading copy")?;
    if let Some(mut copy) = copy {
        if copy.status() == BookCopyStatus::Reserved {
            copy.release_reservation()?;
            copy.audit_mut().touch(now);
            uow.book_copies()
                .update(copy)
                .await
                .persistence("Error saving copy")?;
        }
    }
    Ok(())
}

async fn mark_ready(
    deps: &ServiceDependencies,
    id: ReservationId,
    copy_id: BookCopyId,
    now: DateTime<Utc>,
) -> Result<Reservation> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut reservation: Reservation = require(uow.reservations(), id, NOT_FOUND).await?;
    let mut copy: BookCopy = require(uow.book_copies(), copy_id, COPY_NOT_FOUND).await?;

    let mut rules = RuleViolations::new();
    rules.check(
        copy.book_id() == reservation.book_id(),
        "The copy does not belong to the reserved book.",
    );
    rules.into_result()?;

    // 1. 蔵書を取り置き、予約を受取可能にする
    copy.reserve()?;
    reservation.mark_as_ready(copy.id(), now)?;
    copy.audit_mut().touch(now);
    reservation.audit_mut().touch(now);

    // 2. 会員への通知
    let notification = Notification::create(
        reservation.member_id(),
        "Reservation ready",
        &format!(
            "Your reserved book is ready for pickup until {}.",
            reservation.expiration_date().format("%Y-%m-%d")
        ),
        NotificationType::ReservationReady,
        now,
    )?;

    // 3. 保存
    uow.book_copies()
        .update(copy)
        .await
        .persistence("Error updating reservation")?;
    uow.reservations()
        .update(reservation.clone())
        .await
        .persistence("Error updating reservation")?;
    uow.notifications()
        .add(notification)
        .await
        .persistence("Error updating reservation")?;
    uow.save_changes()
        .await
        .persistence("Error updating reservation")?;

    tracing::info!(reservation_id = %id, book_copy_id = %copy_id, "Reservation ready for pickup");
    Ok(reservation)
}

async fn fulfill(
    deps: &ServiceDependencies,
    id: ReservationId,
    cmd: FulfillReservation,
    now: DateTime<Utc>,
) -> Result<Reservation> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut reservation: Reservation = require(uow.reservations(), id, NOT_FOUND).await?;
    let loan: Loan = require(uow.loans(), cmd.loan_id, LOAN_NOT_FOUND).await?;

    let mut rules = RuleViolations::new();
    rules.check(
        loan.member_id() == reservation.member_id(),
        "The loan belongs to a different member.",
    );
    rules.into_result()?;

    // 別の蔵書で貸し出した場合は取置を解除する
    if let Some(copy_id) = reservation.ready_copy_id() {
        if copy_id != loan.book_copy_id() {
            release_copy(uow, copy_id, now).await?;
        }
    }

    let position = reservation.queue_position();
    reservation.fulfill(loan.id())?;
    reservation.audit_mut().touch(now);
    requeue(uow, reservation.book_id(), &[(id, position)], now).await?;

    if let Some(mut member) = uow
        .members()
        .get_by_id(reservation.member_id())
        .await
        .persistence("Error loading member")?
    {
        if member.active_reservation_ids().contains(&id) {
            member.complete_reservation(id)?;
            member.audit_mut().touch(now);
            uow.members()
                .update(member)
                .await
                .persistence("Error fulfilling reservation")?;
        }
    }

    uow.reservations()
        .update(reservation.clone())
        .await
        .persistence("Error fulfilling reservation")?;
    uow.save_changes()
        .await
        .persistence("Error fulfilling reservation")?;

    tracing::info!(reservation_id = %id, loan_id = %loan.id(), "Reservation fulfilled");
    Ok(reservation)
}

async fn extend(
    deps: &ServiceDependencies,
    id: ReservationId,
    days: i64,
    now: DateTime<Utc>,
) -> Result<Reservation> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut reservation: Reservation = require(uow.reservations(), id, NOT_FOUND).await?;

    reservation.extend_expiration(days)?;
    reservation.audit_mut().touch(now);

    uow.reservations()
        .update(reservation.clone())
        .await
        .persistence("Error extending reservation")?;
    uow.save_changes()
        .await
        .persistence("Error extending reservation")?;

    tracing::info!(
        reservation_id = %id,
        expiration_date = %reservation.expiration_date(),
        "Reservation extended"
    );
    Ok(reservation)
}

async fn expire_due(deps: &ServiceDependencies, now: DateTime<Utc>) -> Result<usize> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();

    let expired = uow
        .reservations()
        .get_expired(now)
        .await
        .persistence("Error loading reservations")?;
    if expired.is_empty() {
        return Ok(0);
    }

    // 同じ会員・蔵書を複数の予約が参照しうるので、変更は読み込んだものに積み重ねる
    let mut members: HashMap<MemberId, Member> = HashMap::new();
    let mut copies: HashMap<BookCopyId, BookCopy> = HashMap::new();
    let mut removed: HashMap<BookId, Vec<(ReservationId, u32)>> = HashMap::new();

    let count = expired.len();
    for mut reservation in expired {
        if reservation.status() == ReservationStatus::Ready {
            if let Some(copy_id) = reservation.ready_copy_id() {
                if !copies.contains_key(&copy_id) {
                    if let Some(copy) = uow
                        .book_copies()
                        .get_by_id(copy_id)
                        .await
                        .persistence("Error loading copy")?
                    {
                        copies.insert(copy_id, copy);
                    }
                }
                if let Some(copy) = copies.get_mut(&copy_id) {
                    if copy.status() == BookCopyStatus::Reserved {
                        copy.release_reservation()?;
                        copy.audit_mut().touch(now);
                    }
                }
            }
        }

        let member_id = reservation.member_id();
        if !members.contains_key(&member_id) {
            if let Some(member) = uow
                .members()
                .get_by_id(member_id)
                .await
                .persistence("Error loading member")?
            {
                members.insert(member_id, member);
            }
        }
        if let Some(member) = members.get_mut(&member_id) {
            if member.active_reservation_ids().contains(&reservation.id()) {
                member.complete_reservation(reservation.id())?;
                member.audit_mut().touch(now);
            }
        }

        removed
            .entry(reservation.book_id())
            .or_default()
            .push((reservation.id(), reservation.queue_position()));

        reservation.expire(now)?;
        reservation.audit_mut().touch(now);
        uow.reservations()
            .update(reservation)
            .await
            .persistence("Error expiring reservations")?;
    }

    for (book_id, removed) in &removed {
        requeue(uow, *book_id, removed, now).await?;
    }
    for copy in copies.into_values() {
        uow.book_copies()
            .update(copy)
            .await
            .persistence("Error expiring reservations")?;
    }
    for member in members.into_values() {
        uow.members()
            .update(member)
            .await
            .persistence("Error expiring reservations")?;
    }
    uow.save_changes()
        .await
        .persistence("Error expiring reservations")?;

    tracing::info!(expired_count = count, "Expired reservations processed");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued(book_id: BookId, position: u32, now: DateTime<Utc>) -> Reservation {
        let mut r = Reservation::create(book_id, MemberId::new(), 7, now).unwrap();
        r.update_queue_position(position).unwrap();
        r
    }

    #[test]
    fn test_close_queue_gaps_shifts_later_reservations() {
        let now = Utc::now();
        let book_id = BookId::new();
        let first = queued(book_id, 1, now);
        let second = queued(book_id, 2, now);
        let third = queued(book_id, 3, now);
        let removed = [(first.id(), 1)];

        let changed = close_queue_gaps(vec![first, second.clone(), third.clone()], &removed).unwrap();

        assert_eq!(changed.len(), 2);
        assert_eq!(changed[0].id(), second.id());
        assert_eq!(changed[0].queue_position(), 1);
        assert_eq!(changed[1].id(), third.id());
        assert_eq!(changed[1].queue_position(), 2);
    }

    #[test]
    fn test_close_queue_gaps_ignores_earlier_reservations() {
        let now = Utc::now();
        let book_id = BookId::new();
        let first = queued(book_id, 1, now);
        let second = queued(book_id, 2, now);
        let removed = [(second.id(), 2)];

        let changed = close_queue_gaps(vec![first, second], &removed).unwrap();

        assert!(changed.is_empty());
    }
}
