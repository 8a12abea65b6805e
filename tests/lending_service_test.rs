mod common;

use chrono::{DateTime, Duration, Utc};
use common::*;
use rusty_library_catalog::application::catalog::{self, BookView};
use rusty_library_catalog::application::lending::{
    self, Checkout, CreateReservation, FulfillReservation, MarkReservationReady, PayFine,
    WaiveFine,
};
use rusty_library_catalog::application::membership;
use rusty_library_catalog::application::notifications;
use rusty_library_catalog::application::{FailureKind, ServiceDependencies};
use rusty_library_catalog::domain::Money;
use rusty_library_catalog::domain::catalog::{BookCopy, BookCopyStatus};
use rusty_library_catalog::domain::lending::{
    FineType, Loan, LoanStatus, PaymentMethod, Reservation, ReservationStatus,
};
use rusty_library_catalog::domain::notification::NotificationType;
use rusty_library_catalog::domain::users::Member;

// ============================================================================
// テスト用のヘルパー関数
// ============================================================================

async fn checkout(
    deps: &ServiceDependencies,
    member: &Member,
    copy: &BookCopy,
    now: DateTime<Utc>,
) -> Loan {
    expect_success(
        lending::checkout(
            deps,
            Checkout {
                member_id: member.id(),
                book_copy_id: copy.id(),
            },
            now,
        )
        .await,
    )
}

async fn reserve(
    deps: &ServiceDependencies,
    member: &Member,
    book: &BookView,
    now: DateTime<Utc>,
) -> Reservation {
    expect_success(
        lending::create_reservation(
            deps,
            CreateReservation {
                book_id: book.id,
                member_id: member.id(),
            },
            now,
        )
        .await,
    )
}

/// 書籍1冊・蔵書1冊・会員1人
async fn setup(now: DateTime<Utc>) -> (ServiceDependencies, BookView, BookCopy, Member) {
    let deps = memory_deps();
    let book = seed_book(&deps, "9780451524935").await;
    let copy = seed_copy(&deps, &book, "BC-001").await;
    let member = seed_member(&deps, "reader@example.com", now).await;
    (deps, book, copy, member)
}

// ============================================================================
// 貸出と返却
// ============================================================================

#[tokio::test]
async fn test_late_return_creates_overdue_fine() {
    let now = Utc::now();
    let loaned_at = now - Duration::days(30);
    let (deps, _, copy, member) = setup(loaned_at).await;

    // 1. 30日前に貸出（返却期限は16日前）
    let loan = checkout(&deps, &member, &copy, loaned_at).await;
    assert_eq!(loan.due_date(), loaned_at + Duration::days(14));

    // 2. 今日返却
    let returned = expect_success(lending::return_loan(&deps, loan.id(), now).await);
    assert_eq!(returned.status(), LoanStatus::ReturnedLate);
    assert!(returned.fine_id().is_some());

    // 3. 16日 × 50セント = 8.00 の罰金
    let fines = expect_success(lending::get_fines_by_member(&deps, member.id()).await);
    assert_eq!(fines.len(), 1);
    assert_eq!(fines[0].amount(), Money::from_cents(800));
    assert_eq!(fines[0].fine_type(), FineType::Overdue);
    assert_eq!(fines[0].loan_id(), Some(loan.id()));

    let member = expect_success(membership::get_member(&deps, member.id()).await);
    assert_eq!(member.outstanding_fines(), Money::from_cents(800));
    assert!(member.active_loan_ids().is_empty());

    let copy = expect_success(catalog::get_copy(&deps, copy.id()).await);
    assert_eq!(copy.status(), BookCopyStatus::Available);

    let unread =
        expect_success(notifications::get_unread_notifications(&deps, member.id()).await);
    assert_eq!(unread.len(), 1);
    assert_eq!(
        unread[0].notification_type(),
        NotificationType::FineNotification
    );
}

#[tokio::test]
async fn test_on_time_return_has_no_fine() {
    let now = Utc::now();
    let (deps, _, copy, member) = setup(now).await;
    let loan = checkout(&deps, &member, &copy, now).await;

    let returned = expect_success(
        lending::return_loan(&deps, loan.id(), now + Duration::days(3)).await,
    );

    assert_eq!(returned.status(), LoanStatus::ReturnedOnTime);
    assert!(expect_success(lending::get_fines_by_member(&deps, member.id()).await).is_empty());
}

#[tokio::test]
async fn test_copy_cannot_be_checked_out_twice() {
    let now = Utc::now();
    let (deps, _, copy, member) = setup(now).await;
    let other = seed_member(&deps, "other@example.com", now).await;
    checkout(&deps, &member, &copy, now).await;

    let result = lending::checkout(
        &deps,
        Checkout {
            member_id: other.id(),
            book_copy_id: copy.id(),
        },
        now,
    )
    .await;

    assert_eq!(result.failure, Some(FailureKind::BusinessRule));
    assert!(
        result
            .errors
            .contains(&"This copy already has an open loan.".to_string())
    );
    let other = expect_success(membership::get_member(&deps, other.id()).await);
    assert!(other.active_loan_ids().is_empty());
}

#[tokio::test]
async fn test_checkout_runs_while_another_transaction_is_open() {
    let now = Utc::now();
    let (deps, _, copy, member) = setup(now).await;
    let other = deps.unit_of_work();
    other.begin_transaction().await.unwrap();

    let loan = checkout(&deps, &member, &copy, now).await;
    other.rollback().await.unwrap();

    let found = expect_success(lending::get_loan(&deps, loan.id()).await);
    assert_eq!(found.status(), LoanStatus::Active);
    let copy = expect_success(catalog::get_copy(&deps, copy.id()).await);
    assert_eq!(copy.status(), BookCopyStatus::OnLoan);
}

#[tokio::test]
async fn test_returning_twice_fails() {
    let now = Utc::now();
    let (deps, _, copy, member) = setup(now).await;
    let loan = checkout(&deps, &member, &copy, now).await;
    expect_success(lending::return_loan(&deps, loan.id(), now).await);

    let result = lending::return_loan(&deps, loan.id(), now).await;

    assert_eq!(result.failure, Some(FailureKind::Domain));
    assert_eq!(result.errors, ["Loan has already been returned."]);
}

#[tokio::test]
async fn test_renewal_limit() {
    let now = Utc::now();
    let (deps, _, copy, member) = setup(now).await;
    let loan = checkout(&deps, &member, &copy, now).await;

    let first = expect_success(lending::renew_loan(&deps, loan.id(), now).await);
    let second = expect_success(lending::renew_loan(&deps, loan.id(), now).await);
    assert_eq!(first.renewal_count(), 1);
    assert_eq!(second.renewal_count(), 2);
    assert_eq!(second.due_date(), loan.due_date() + Duration::days(28));

    let third = lending::renew_loan(&deps, loan.id(), now).await;
    assert_eq!(third.failure, Some(FailureKind::Domain));
    assert_eq!(third.errors, ["Loan cannot be renewed."]);
}

#[tokio::test]
async fn test_suspended_member_cannot_borrow() {
    let now = Utc::now();
    let (deps, _, copy, member) = setup(now).await;
    expect_success(membership::suspend_member(&deps, member.id(), now).await);

    let result = lending::checkout(
        &deps,
        Checkout {
            member_id: member.id(),
            book_copy_id: copy.id(),
        },
        now,
    )
    .await;

    assert_eq!(
        result.errors,
        ["Member cannot borrow books at this time."]
    );
}

// ============================================================================
// 延滞検出
// ============================================================================

#[tokio::test]
async fn test_overdue_detection_marks_once() {
    let now = Utc::now();
    let loaned_at = now - Duration::days(20);
    let (deps, _, copy, member) = setup(loaned_at).await;
    let loan = checkout(&deps, &member, &copy, loaned_at).await;

    assert_eq!(
        expect_success(lending::detect_overdue_loans(&deps, now).await),
        1
    );
    assert_eq!(
        expect_success(lending::detect_overdue_loans(&deps, now).await),
        0
    );

    let loan = expect_success(lending::get_loan(&deps, loan.id()).await);
    assert_eq!(loan.status(), LoanStatus::Overdue);

    let overdue = expect_success(lending::get_overdue_loans(&deps, now).await);
    assert_eq!(overdue.len(), 1);

    let unread =
        expect_success(notifications::get_unread_notifications(&deps, member.id()).await);
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].notification_type(), NotificationType::LoanOverdue);
}

// ============================================================================
// 予約
// ============================================================================

#[tokio::test]
async fn test_reservation_queue_and_pickup() {
    let now = Utc::now();
    let (deps, book, copy, borrower) = setup(now).await;
    let first = seed_member(&deps, "first@example.com", now).await;
    let second = seed_member(&deps, "second@example.com", now).await;

    // 1. 貸出中の書籍に2人が予約
    let loan = checkout(&deps, &borrower, &copy, now).await;
    let first_reservation = reserve(&deps, &first, &book, now).await;
    let second_reservation = reserve(&deps, &second, &book, now).await;
    assert_eq!(first_reservation.queue_position(), 1);
    assert_eq!(second_reservation.queue_position(), 2);

    // 2. 返却された蔵書を先頭の予約に取り置く
    expect_success(lending::return_loan(&deps, loan.id(), now).await);
    let ready = expect_success(
        lending::mark_reservation_ready(
            &deps,
            first_reservation.id(),
            MarkReservationReady {
                book_copy_id: copy.id(),
            },
            now,
        )
        .await,
    );
    assert_eq!(ready.status(), ReservationStatus::Ready);
    assert_eq!(ready.ready_copy_id(), Some(copy.id()));

    // 3. 取置中の蔵書は他の会員には貸し出せない
    let refused = lending::checkout(
        &deps,
        Checkout {
            member_id: second.id(),
            book_copy_id: copy.id(),
        },
        now,
    )
    .await;
    assert_eq!(
        refused.errors,
        ["This copy is reserved for another member."]
    );

    // 4. 予約者本人の貸出で予約が完了する
    checkout(&deps, &first, &copy, now).await;
    let fulfilled = expect_success(lending::get_reservation(&deps, first_reservation.id()).await);
    assert_eq!(fulfilled.status(), ReservationStatus::Fulfilled);

    let first = expect_success(membership::get_member(&deps, first.id()).await);
    assert!(first.active_reservation_ids().is_empty());
    assert_eq!(first.active_loan_ids().len(), 1);

    let copy = expect_success(catalog::get_copy(&deps, copy.id()).await);
    assert_eq!(copy.status(), BookCopyStatus::OnLoan);
}

#[tokio::test]
async fn test_duplicate_reservation_is_rejected() {
    let now = Utc::now();
    let (deps, book, _, member) = setup(now).await;
    reserve(&deps, &member, &book, now).await;

    let result = lending::create_reservation(
        &deps,
        CreateReservation {
            book_id: book.id,
            member_id: member.id(),
        },
        now,
    )
    .await;

    assert_eq!(
        result.errors,
        ["Member already has an active reservation for this book."]
    );
}

#[tokio::test]
async fn test_cancel_moves_queue_forward() {
    let now = Utc::now();
    let (deps, book, _, first) = setup(now).await;
    let second = seed_member(&deps, "second@example.com", now).await;
    let first_reservation = reserve(&deps, &first, &book, now).await;
    let second_reservation = reserve(&deps, &second, &book, now).await;

    let canceled =
        expect_success(lending::cancel_reservation(&deps, first_reservation.id(), now).await);
    assert_eq!(canceled.status(), ReservationStatus::Canceled);

    let moved = expect_success(lending::get_reservation(&deps, second_reservation.id()).await);
    assert_eq!(moved.queue_position(), 1);

    let first = expect_success(membership::get_member(&deps, first.id()).await);
    assert!(first.active_reservation_ids().is_empty());
}

async fn mark_ready(
    deps: &ServiceDependencies,
    reservation: &Reservation,
    copy: &BookCopy,
    now: DateTime<Utc>,
) -> Reservation {
    expect_success(
        lending::mark_reservation_ready(
            deps,
            reservation.id(),
            MarkReservationReady {
                book_copy_id: copy.id(),
            },
            now,
        )
        .await,
    )
}

#[tokio::test]
async fn test_pickup_moves_queue_forward_before_next_reservation() {
    let now = Utc::now();
    let (deps, book, copy, first) = setup(now).await;
    let second = seed_member(&deps, "second@example.com", now).await;
    let third = seed_member(&deps, "third@example.com", now).await;

    // 1. 2人が予約し、先頭の予約者が取置の蔵書を借りる
    let first_reservation = reserve(&deps, &first, &book, now).await;
    let second_reservation = reserve(&deps, &second, &book, now).await;
    mark_ready(&deps, &first_reservation, &copy, now).await;
    checkout(&deps, &first, &copy, now).await;

    // 2. 後続の予約は前に詰まり、新しい予約は最後尾に並ぶ
    let moved = expect_success(lending::get_reservation(&deps, second_reservation.id()).await);
    assert_eq!(moved.queue_position(), 1);
    let third_reservation = reserve(&deps, &third, &book, now).await;
    assert_eq!(third_reservation.queue_position(), 2);
}

#[tokio::test]
async fn test_fulfilling_with_another_copy_moves_queue_forward() {
    let now = Utc::now();
    let (deps, book, copy, first) = setup(now).await;
    let spare = seed_copy(&deps, &book, "BC-002").await;
    let second = seed_member(&deps, "second@example.com", now).await;

    let first_reservation = reserve(&deps, &first, &book, now).await;
    let second_reservation = reserve(&deps, &second, &book, now).await;
    mark_ready(&deps, &first_reservation, &copy, now).await;

    // 取置とは別の蔵書で貸し出し、予約を手動で完了する
    let loan = checkout(&deps, &first, &spare, now).await;
    let fulfilled = expect_success(
        lending::fulfill_reservation(
            &deps,
            first_reservation.id(),
            FulfillReservation { loan_id: loan.id() },
            now,
        )
        .await,
    );
    assert_eq!(fulfilled.status(), ReservationStatus::Fulfilled);

    let moved = expect_success(lending::get_reservation(&deps, second_reservation.id()).await);
    assert_eq!(moved.queue_position(), 1);
    let copy = expect_success(catalog::get_copy(&deps, copy.id()).await);
    assert_eq!(copy.status(), BookCopyStatus::Available);
}

#[tokio::test]
async fn test_expired_reservation_releases_copy() {
    let now = Utc::now();
    let reserved_at = now - Duration::days(10);
    let (deps, book, copy, member) = setup(reserved_at).await;
    let reservation = reserve(&deps, &member, &book, reserved_at).await;
    expect_success(
        lending::mark_reservation_ready(
            &deps,
            reservation.id(),
            MarkReservationReady {
                book_copy_id: copy.id(),
            },
            reserved_at,
        )
        .await,
    );

    let expired = expect_success(lending::expire_due_reservations(&deps, now).await);

    assert_eq!(expired, 1);
    let reservation = expect_success(lending::get_reservation(&deps, reservation.id()).await);
    assert_eq!(reservation.status(), ReservationStatus::Expired);
    let copy = expect_success(catalog::get_copy(&deps, copy.id()).await);
    assert_eq!(copy.status(), BookCopyStatus::Available);
    let member = expect_success(membership::get_member(&deps, member.id()).await);
    assert!(member.active_reservation_ids().is_empty());
}

// ============================================================================
// 罰金
// ============================================================================

/// 16日延滞で8.00の罰金を作る
async fn overdue_fine_setup() -> (ServiceDependencies, Member, rusty_library_catalog::domain::FineId) {
    let now = Utc::now();
    let loaned_at = now - Duration::days(30);
    let (deps, _, copy, member) = setup(loaned_at).await;
    let loan = checkout(&deps, &member, &copy, loaned_at).await;
    let returned = expect_success(lending::return_loan(&deps, loan.id(), now).await);
    let fine_id = returned.fine_id().expect("late return creates a fine");
    (deps, member, fine_id)
}

#[tokio::test]
async fn test_partial_then_full_payment() {
    let now = Utc::now();
    let (deps, member, fine_id) = overdue_fine_setup().await;

    let partial = expect_success(
        lending::pay_fine(
            &deps,
            fine_id,
            PayFine {
                amount_cents: Some(300),
                method: PaymentMethod::Cash,
                reference: None,
            },
            now,
        )
        .await,
    );
    assert!(!partial.is_paid());
    assert_eq!(partial.remaining_amount(), Money::from_cents(500));

    let paid = expect_success(
        lending::pay_fine(
            &deps,
            fine_id,
            PayFine {
                amount_cents: None,
                method: PaymentMethod::Card,
                reference: Some("TX-1".to_string()),
            },
            now,
        )
        .await,
    );
    assert!(paid.is_paid());
    assert_eq!(paid.remaining_amount(), Money::ZERO);

    let member = expect_success(membership::get_member(&deps, member.id()).await);
    assert_eq!(member.outstanding_fines(), Money::ZERO);
}

#[tokio::test]
async fn test_overpayment_is_rejected_without_change() {
    let now = Utc::now();
    let (deps, member, fine_id) = overdue_fine_setup().await;

    let result = lending::pay_fine(
        &deps,
        fine_id,
        PayFine {
            amount_cents: Some(801),
            method: PaymentMethod::Cash,
            reference: None,
        },
        now,
    )
    .await;

    assert_eq!(result.failure, Some(FailureKind::Domain));
    let fine = expect_success(lending::get_fine(&deps, fine_id).await);
    assert_eq!(fine.paid_amount(), Money::ZERO);
    let member = expect_success(membership::get_member(&deps, member.id()).await);
    assert_eq!(member.outstanding_fines(), Money::from_cents(800));
}

#[tokio::test]
async fn test_waive_clears_balance() {
    let now = Utc::now();
    let (deps, member, fine_id) = overdue_fine_setup().await;

    let waived = expect_success(
        lending::waive_fine(
            &deps,
            fine_id,
            WaiveFine {
                reason: "First offence".to_string(),
            },
            now,
        )
        .await,
    );

    assert!(waived.is_paid());
    assert!(waived.reason().ends_with("[WAIVED: First offence]"));
    let member = expect_success(membership::get_member(&deps, member.id()).await);
    assert_eq!(member.outstanding_fines(), Money::ZERO);
}

#[tokio::test]
async fn test_paid_fine_is_detached_while_another_remains() {
    let now = Utc::now();
    let loaned_at = now - Duration::days(30);
    let (deps, book, copy, member) = setup(loaned_at).await;
    let spare = seed_copy(&deps, &book, "BC-002").await;

    // 1. 2冊を延滞して返却し、罰金を2件作る
    let first_loan = checkout(&deps, &member, &copy, loaned_at).await;
    let second_loan = checkout(&deps, &member, &spare, loaned_at).await;
    let first = expect_success(lending::return_loan(&deps, first_loan.id(), now).await);
    let second = expect_success(lending::return_loan(&deps, second_loan.id(), now).await);
    let first_fine = first.fine_id().expect("late return creates a fine");
    let second_fine = second.fine_id().expect("late return creates a fine");

    // 2. 1件目だけ完済する
    let paid = expect_success(
        lending::pay_fine(
            &deps,
            first_fine,
            PayFine {
                amount_cents: None,
                method: PaymentMethod::Cash,
                reference: None,
            },
            now,
        )
        .await,
    );
    assert!(paid.is_paid());

    let member = expect_success(membership::get_member(&deps, member.id()).await);
    assert_eq!(member.fine_ids(), [second_fine]);
    assert_eq!(member.outstanding_fines(), Money::from_cents(800));
}
