use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{ApplicationError, PersistenceContext, Result};
use crate::application::lookup::require;
use crate::application::result::{OperationResult, boundary};
use crate::application::validation::{FormatRules, RuleViolations, transactional};
use crate::domain::catalog::{BookCopy, BookCopyStatus};
use crate::domain::lending::{Fine, FineType, Loan, Reservation, ReservationStatus};
use crate::domain::notification::{Notification, NotificationType};
use crate::domain::users::Member;
use crate::domain::{Entity, LoanId, MemberId};
use crate::ports::UnitOfWork;
use chrono::{DateTime, Utc};

use super::commands::Checkout;
use super::reservations::requeue;

pub(super) const LOAN_NOT_FOUND: &str = "Loan not found.";
pub(super) const MEMBER_NOT_FOUND: &str = "Member not found.";
pub(super) const COPY_NOT_FOUND: &str = "Book copy not found.";

pub async fn get_loan(deps: &ServiceDependencies, id: LoanId) -> OperationResult<Loan> {
    boundary("get_loan", async {
        let uow = deps.unit_of_work();
        require(uow.loans(), id, LOAN_NOT_FOUND).await
    })
    .await
}

/// 貸出処理
///
/// ビジネスルール：
/// - 会員が存在し、貸出可能（会員資格が有効で上限未満）であること
/// - 蔵書が存在し、Available または Reserved であること
/// - 蔵書に未返却の貸出がないこと（1冊に同時に1件まで）
/// - Reserved の蔵書は、その蔵書で受取可能になった予約の会員にのみ貸し出せる。
///   この場合、予約は貸出によって完了する
///
/// 処理全体を明示的なトランザクションで実行し、失敗時はロールバックする。
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `cmd` - 会員IDと蔵書ID
/// * `now` - 貸出日時
///
/// # 戻り値
/// 作成された貸出
pub async fn checkout(
    deps: &ServiceDependencies,
    cmd: Checkout,
    now: DateTime<Utc>,
) -> OperationResult<Loan> {
    boundary("checkout", async {
        cmd.check_format()?;
        let work = deps.unit_of_work();
        let uow = work.as_ref();
        transactional(uow, checkout_steps(deps, uow, cmd, now)).await
    })
    .await
}

/// 返却処理
///
/// 返却期限を過ぎていれば、延滞日数 × 1日あたりの罰金で延滞罰金を作成し、
/// 貸出と会員の両方に紐づける。
pub async fn return_loan(
    deps: &ServiceDependencies,
    id: LoanId,
    now: DateTime<Utc>,
) -> OperationResult<Loan> {
    boundary("return_loan", async {
        let work = deps.unit_of_work();
        let uow = work.as_ref();
        transactional(uow, return_steps(deps, uow, id, now)).await
    })
    .await
}

/// 返却期限を貸出期間分延長する
pub async fn renew_loan(
    deps: &ServiceDependencies,
    id: LoanId,
    now: DateTime<Utc>,
) -> OperationResult<Loan> {
    boundary("renew_loan", renew(deps, id, now)).await
}

/// 会員の未返却の貸出
pub async fn get_active_loans(
    deps: &ServiceDependencies,
    member_id: MemberId,
) -> OperationResult<Vec<Loan>> {
    boundary("get_active_loans", async {
        let work = deps.unit_of_work();
        let uow = work.as_ref();
        require::<Member, _>(uow.members(), member_id, MEMBER_NOT_FOUND).await?;
        uow.loans()
            .get_open_by_member(member_id)
            .await
            .persistence("Error loading loans")
    })
    .await
}

/// 会員の貸出履歴（新しい順）
pub async fn get_loan_history(
    deps: &ServiceDependencies,
    member_id: MemberId,
) -> OperationResult<Vec<Loan>> {
    boundary("get_loan_history", async {
        let work = deps.unit_of_work();
        let uow = work.as_ref();
        require::<Member, _>(uow.members(), member_id, MEMBER_NOT_FOUND).await?;
        uow.loans()
            .get_history_by_member(member_id)
            .await
            .persistence("Error loading loans")
    })
    .await
}

pub async fn get_overdue_loans(
    deps: &ServiceDependencies,
    now: DateTime<Utc>,
) -> OperationResult<Vec<Loan>> {
    boundary("get_overdue_loans", async {
        deps.unit_of_work()
            .loans()
            .get_overdue(now)
            .await
            .persistence("Error loading loans")
    })
    .await
}

/// Reserved の蔵書を受け取れる予約を探す
async fn ready_reservation_for(
    uow: &dyn UnitOfWork,
    copy: &BookCopy,
) -> Result<Option<Reservation>> {
    let open = uow
        .reservations()
        .get_open_for_book(copy.book_id())
        .await
        .persistence("Error loading reservations")?;

    Ok(open.into_iter().find(|r| {
        r.status() == ReservationStatus::Ready && r.ready_copy_id() == Some(copy.id())
    }))
}

async fn checkout_steps(
    deps: &ServiceDependencies,
    uow: &dyn UnitOfWork,
    cmd: Checkout,
    now: DateTime<Utc>,
) -> Result<Loan> {
    // 1. 会員と蔵書の取得
    let mut member: Member = require(uow.members(), cmd.member_id, MEMBER_NOT_FOUND).await?;
    let mut copy: BookCopy = require(uow.book_copies(), cmd.book_copy_id, COPY_NOT_FOUND).await?;

    // 2. 業務規則の検証
    let mut rules = RuleViolations::new();
    rules.check(
        member.can_borrow_books(now),
        "Member cannot borrow books at this time.",
    );
    rules.check(copy.can_be_lent(), "This copy is not available for loan.");
    let open_loan = uow
        .loans()
        .get_open_for_copy(copy.id())
        .await
        .persistence("Error loading loans")?;
    rules.check(open_loan.is_none(), "This copy already has an open loan.");
    rules.into_result()?;

    // 3. 取置中の蔵書は予約者本人の受取として扱う
    let mut reservation = None;
    if copy.status() == BookCopyStatus::Reserved {
        match ready_reservation_for(uow, &copy).await? {
            Some(ready) if ready.member_id() == member.id() => {
                copy.release_reservation()?;
                reservation = Some(ready);
            }
            _ => {
                return Err(ApplicationError::business(
                    "This copy is reserved for another member.",
                ));
            }
        }
    }

    // 4. 貸出の作成と状態遷移
    let loan = Loan::create(member.id(), copy.id(), deps.policy.loan_duration_days, now)?;
    copy.loan_out()?;
    member.add_loan(loan.id(), now)?;

    if let Some(reservation) = reservation.as_mut() {
        let position = reservation.queue_position();
        reservation.fulfill(loan.id())?;
        if member.active_reservation_ids().contains(&reservation.id()) {
            member.complete_reservation(reservation.id())?;
        }
        reservation.audit_mut().touch(now);
        requeue(uow, copy.book_id(), &[(reservation.id(), position)], now).await?;
    }
    copy.audit_mut().touch(now);
    member.audit_mut().touch(now);

    // 5. 保存
    uow.loans()
        .add(loan.clone())
        .await
        .persistence("Error saving loan")?;
    uow.book_copies()
        .update(copy)
        .await
        .persistence("Error saving loan")?;
    uow.members()
        .update(member)
        .await
        .persistence("Error saving loan")?;
    if let Some(reservation) = reservation {
        uow.reservations()
            .update(reservation)
            .await
            .persistence("Error saving loan")?;
    }
    uow.save_changes().await.persistence("Error saving loan")?;

    tracing::info!(
        loan_id = %loan.id(),
        member_id = %loan.member_id(),
        book_copy_id = %loan.book_copy_id(),
        due_date = %loan.due_date(),
        "Book checked out"
    );
    Ok(loan)
}

async fn return_steps(
    deps: &ServiceDependencies,
    uow: &dyn UnitOfWork,
    id: LoanId,
    now: DateTime<Utc>,
) -> Result<Loan> {
    let mut loan: Loan = require(uow.loans(), id, LOAN_NOT_FOUND).await?;
    let mut member: Member = require(uow.members(), loan.member_id(), MEMBER_NOT_FOUND).await?;
    let mut copy: BookCopy = require(uow.book_copies(), loan.book_copy_id(), COPY_NOT_FOUND).await?;

    // 罰金額は返却前の状態で計算する
    let days_overdue = loan.days_overdue(now);
    let fine_amount = loan.calculate_overdue_fine(deps.policy.daily_fine_rate, now);

    loan.return_loan(now)?;
    // 貸出中に紛失・破損と記録された蔵書は状態を変えない
    if copy.status() == BookCopyStatus::OnLoan {
        copy.return_copy()?;
        copy.audit_mut().touch(now);
        uow.book_copies()
            .update(copy)
            .await
            .persistence("Error returning loan")?;
    }
    if member.active_loan_ids().contains(&id) {
        member.complete_loan(id)?;
    }

    if fine_amount.is_positive() {
        let fine = Fine::create(
            member.id(),
            fine_amount,
            &format!("Late return: {days_overdue} day(s) overdue"),
            FineType::Overdue,
            Some(id),
            now,
        )?;
        loan.add_fine(fine.id())?;
        member.add_fine(fine.id(), fine_amount)?;

        let notification = Notification::create(
            member.id(),
            "Overdue fine",
            &format!("A fine of {fine_amount} was issued for a late return."),
            NotificationType::FineNotification,
            now,
        )?;

        uow.fines()
            .add(fine)
            .await
            .persistence("Error returning loan")?;
        uow.notifications()
            .add(notification)
            .await
            .persistence("Error returning loan")?;
        tracing::info!(loan_id = %id, days_overdue, amount = %fine_amount, "Overdue fine issued");
    }

    loan.audit_mut().touch(now);
    member.audit_mut().touch(now);
    uow.loans()
        .update(loan.clone())
        .await
        .persistence("Error returning loan")?;
    uow.members()
        .update(member)
        .await
        .persistence("Error returning loan")?;
    uow.save_changes()
        .await
        .persistence("Error returning loan")?;

    tracing::info!(loan_id = %id, status = ?loan.status(), "Book returned");
    Ok(loan)
}

async fn renew(deps: &ServiceDependencies, id: LoanId, now: DateTime<Utc>) -> Result<Loan> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut loan: Loan = require(uow.loans(), id, LOAN_NOT_FOUND).await?;

    loan.renew(deps.policy.loan_duration_days, now)?;
    loan.audit_mut().touch(now);

    uow.loans()
        .update(loan.clone())
        .await
        .persistence("Error renewing loan")?;
    uow.save_changes().await.persistence("Error renewing loan")?;

    tracing::info!(
        loan_id = %id,
        renewal_count = loan.renewal_count(),
        due_date = %loan.due_date(),
        "Loan renewed"
    );
    Ok(loan)
}
