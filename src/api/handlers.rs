use crate::application::ServiceDependencies;
use crate::application::catalog::{
    self, AddBookCopy, BookView, CreateAuthor, CreateBook, CreateGenre, MarkCopyDamaged,
    SendCopyToMaintenance, UpdateAuthor, UpdateBook, UpdateGenre, WithdrawCopy,
};
use crate::application::lending::{
    self, Checkout, CreateReservation, ExtendReservation, FulfillReservation, MarkReservationReady,
    PayFine, WaiveFine,
};
use crate::application::membership::{
    self, ExtendMembership, RegisterLibrarian, RegisterMember, UpgradeMembership,
};
use crate::application::notifications;
use crate::domain::catalog::{Author, BookCopy, Genre};
use crate::domain::lending::{Fine, Loan, Reservation};
use crate::domain::notification::Notification;
use crate::domain::users::{Librarian, Member};
use crate::domain::{
    AuthorId, BookCopyId, BookId, FineId, GenreId, LoanId, MemberId, NotificationId,
    ReservationId, UserId,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use std::sync::Arc;

use super::response::ApiResponse;
use super::types::{EmailQuery, RestoreCopyRequest, SearchQuery};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
pub struct AppState {
    pub deps: ServiceDependencies,
}

type AppStateRef = State<Arc<AppState>>;

// ============================================================================
// Genres
// ============================================================================

pub async fn list_genres(State(state): AppStateRef) -> ApiResponse<Vec<Genre>> {
    catalog::get_all_genres(&state.deps).await.into()
}

pub async fn get_genre(State(state): AppStateRef, Path(id): Path<GenreId>) -> ApiResponse<Genre> {
    catalog::get_genre(&state.deps, id).await.into()
}

pub async fn create_genre(
    State(state): AppStateRef,
    Json(cmd): Json<CreateGenre>,
) -> ApiResponse<Genre> {
    ApiResponse::created(catalog::create_genre(&state.deps, cmd).await)
}

pub async fn update_genre(
    State(state): AppStateRef,
    Path(id): Path<GenreId>,
    Json(cmd): Json<UpdateGenre>,
) -> ApiResponse<Genre> {
    catalog::update_genre(&state.deps, id, cmd).await.into()
}

pub async fn delete_genre(State(state): AppStateRef, Path(id): Path<GenreId>) -> ApiResponse<()> {
    catalog::delete_genre(&state.deps, id).await.into()
}

pub async fn books_by_genre(
    State(state): AppStateRef,
    Path(id): Path<GenreId>,
) -> ApiResponse<Vec<BookView>> {
    catalog::get_books_by_genre(&state.deps, id).await.into()
}

// ============================================================================
// Authors
// ============================================================================

pub async fn list_authors(State(state): AppStateRef) -> ApiResponse<Vec<Author>> {
    catalog::get_all_authors(&state.deps).await.into()
}

pub async fn get_author(
    State(state): AppStateRef,
    Path(id): Path<AuthorId>,
) -> ApiResponse<Author> {
    catalog::get_author(&state.deps, id).await.into()
}

pub async fn create_author(
    State(state): AppStateRef,
    Json(cmd): Json<CreateAuthor>,
) -> ApiResponse<Author> {
    ApiResponse::created(catalog::create_author(&state.deps, cmd).await)
}

pub async fn update_author(
    State(state): AppStateRef,
    Path(id): Path<AuthorId>,
    Json(cmd): Json<UpdateAuthor>,
) -> ApiResponse<Author> {
    catalog::update_author(&state.deps, id, cmd).await.into()
}

pub async fn delete_author(State(state): AppStateRef, Path(id): Path<AuthorId>) -> ApiResponse<()> {
    catalog::delete_author(&state.deps, id).await.into()
}

pub async fn books_by_author(
    State(state): AppStateRef,
    Path(id): Path<AuthorId>,
) -> ApiResponse<Vec<BookView>> {
    catalog::get_books_by_author(&state.deps, id).await.into()
}

// ============================================================================
// Books and copies
// ============================================================================

pub async fn list_books(State(state): AppStateRef) -> ApiResponse<Vec<BookView>> {
    catalog::get_all_books(&state.deps).await.into()
}

/// GET /books/search?q= - タイトル・ISBN・著者名・説明の部分一致
pub async fn search_books(
    State(state): AppStateRef,
    Query(query): Query<SearchQuery>,
) -> ApiResponse<Vec<BookView>> {
    catalog::search_books(&state.deps, &query.q).await.into()
}

pub async fn get_book(State(state): AppStateRef, Path(id): Path<BookId>) -> ApiResponse<BookView> {
    catalog::get_book(&state.deps, id).await.into()
}

pub async fn create_book(
    State(state): AppStateRef,
    Json(cmd): Json<CreateBook>,
) -> ApiResponse<BookView> {
    ApiResponse::created(catalog::create_book(&state.deps, cmd).await)
}

pub async fn update_book(
    State(state): AppStateRef,
    Path(id): Path<BookId>,
    Json(cmd): Json<UpdateBook>,
) -> ApiResponse<BookView> {
    catalog::update_book(&state.deps, id, cmd).await.into()
}

pub async fn delete_book(State(state): AppStateRef, Path(id): Path<BookId>) -> ApiResponse<()> {
    catalog::delete_book(&state.deps, id).await.into()
}

pub async fn copies_of_book(
    State(state): AppStateRef,
    Path(id): Path<BookId>,
) -> ApiResponse<Vec<BookCopy>> {
    catalog::get_copies_of_book(&state.deps, id).await.into()
}

pub async fn add_copy(
    State(state): AppStateRef,
    Path(id): Path<BookId>,
    Json(cmd): Json<AddBookCopy>,
) -> ApiResponse<BookCopy> {
    ApiResponse::created(catalog::add_copy(&state.deps, id, cmd).await)
}

pub async fn get_copy(
    State(state): AppStateRef,
    Path(id): Path<BookCopyId>,
) -> ApiResponse<BookCopy> {
    catalog::get_copy(&state.deps, id).await.into()
}

pub async fn mark_copy_lost(
    State(state): AppStateRef,
    Path(id): Path<BookCopyId>,
) -> ApiResponse<BookCopy> {
    catalog::mark_copy_lost(&state.deps, id).await.into()
}

pub async fn mark_copy_damaged(
    State(state): AppStateRef,
    Path(id): Path<BookCopyId>,
    Json(cmd): Json<MarkCopyDamaged>,
) -> ApiResponse<BookCopy> {
    catalog::mark_copy_damaged(&state.deps, id, cmd).await.into()
}

pub async fn send_copy_to_maintenance(
    State(state): AppStateRef,
    Path(id): Path<BookCopyId>,
    Json(cmd): Json<SendCopyToMaintenance>,
) -> ApiResponse<BookCopy> {
    catalog::send_copy_to_maintenance(&state.deps, id, cmd)
        .await
        .into()
}

pub async fn restore_copy(
    State(state): AppStateRef,
    Path(id): Path<BookCopyId>,
    Json(req): Json<RestoreCopyRequest>,
) -> ApiResponse<BookCopy> {
    catalog::restore_copy(&state.deps, id, req.condition)
        .await
        .into()
}

pub async fn withdraw_copy(
    State(state): AppStateRef,
    Path(id): Path<BookCopyId>,
    Json(cmd): Json<WithdrawCopy>,
) -> ApiResponse<BookCopy> {
    catalog::withdraw_copy(&state.deps, id, cmd).await.into()
}

// ============================================================================
// Members and staff
// ============================================================================

pub async fn list_members(State(state): AppStateRef) -> ApiResponse<Vec<Member>> {
    membership::get_all_members(&state.deps).await.into()
}

pub async fn find_member_by_email(
    State(state): AppStateRef,
    Query(query): Query<EmailQuery>,
) -> ApiResponse<Member> {
    membership::get_member_by_email(&state.deps, &query.email)
        .await
        .into()
}

pub async fn get_member(State(state): AppStateRef, Path(id): Path<MemberId>) -> ApiResponse<Member> {
    membership::get_member(&state.deps, id).await.into()
}

pub async fn register_member(
    State(state): AppStateRef,
    Json(cmd): Json<RegisterMember>,
) -> ApiResponse<Member> {
    ApiResponse::created(membership::register_member(&state.deps, cmd, Utc::now()).await)
}

pub async fn suspend_member(
    State(state): AppStateRef,
    Path(id): Path<MemberId>,
) -> ApiResponse<Member> {
    membership::suspend_member(&state.deps, id, Utc::now())
        .await
        .into()
}

pub async fn reactivate_member(
    State(state): AppStateRef,
    Path(id): Path<MemberId>,
) -> ApiResponse<Member> {
    membership::reactivate_member(&state.deps, id, Utc::now())
        .await
        .into()
}

pub async fn extend_membership(
    State(state): AppStateRef,
    Path(id): Path<MemberId>,
    Json(cmd): Json<ExtendMembership>,
) -> ApiResponse<Member> {
    membership::extend_membership(&state.deps, id, cmd, Utc::now())
        .await
        .into()
}

pub async fn upgrade_membership(
    State(state): AppStateRef,
    Path(id): Path<MemberId>,
    Json(cmd): Json<UpgradeMembership>,
) -> ApiResponse<Member> {
    membership::upgrade_membership(&state.deps, id, cmd, Utc::now())
        .await
        .into()
}

pub async fn active_loans_of_member(
    State(state): AppStateRef,
    Path(id): Path<MemberId>,
) -> ApiResponse<Vec<Loan>> {
    lending::get_active_loans(&state.deps, id).await.into()
}

pub async fn loan_history_of_member(
    State(state): AppStateRef,
    Path(id): Path<MemberId>,
) -> ApiResponse<Vec<Loan>> {
    lending::get_loan_history(&state.deps, id).await.into()
}

pub async fn reservations_of_member(
    State(state): AppStateRef,
    Path(id): Path<MemberId>,
) -> ApiResponse<Vec<Reservation>> {
    lending::get_reservations_by_member(&state.deps, id)
        .await
        .into()
}

pub async fn fines_of_member(
    State(state): AppStateRef,
    Path(id): Path<MemberId>,
) -> ApiResponse<Vec<Fine>> {
    lending::get_fines_by_member(&state.deps, id).await.into()
}

pub async fn notifications_of_user(
    State(state): AppStateRef,
    Path(id): Path<UserId>,
) -> ApiResponse<Vec<Notification>> {
    notifications::get_notifications(&state.deps, id)
        .await
        .into()
}

pub async fn mark_notification_read(
    State(state): AppStateRef,
    Path(id): Path<NotificationId>,
) -> ApiResponse<Notification> {
    notifications::mark_notification_read(&state.deps, id, Utc::now())
        .await
        .into()
}

pub async fn register_librarian(
    State(state): AppStateRef,
    Json(cmd): Json<RegisterLibrarian>,
) -> ApiResponse<Librarian> {
    ApiResponse::created(membership::register_librarian(&state.deps, cmd, Utc::now()).await)
}

pub async fn get_librarian(
    State(state): AppStateRef,
    Path(id): Path<UserId>,
) -> ApiResponse<Librarian> {
    membership::get_librarian(&state.deps, id).await.into()
}

// ============================================================================
// Loans
// ============================================================================

/// POST /loans - 貸出
pub async fn checkout(
    State(state): AppStateRef,
    Json(cmd): Json<Checkout>,
) -> ApiResponse<Loan> {
    ApiResponse::created(lending::checkout(&state.deps, cmd, Utc::now()).await)
}

pub async fn get_loan(State(state): AppStateRef, Path(id): Path<LoanId>) -> ApiResponse<Loan> {
    lending::get_loan(&state.deps, id).await.into()
}

/// POST /loans/:id/return - 返却。延滞していれば罰金が作成される
pub async fn return_loan(State(state): AppStateRef, Path(id): Path<LoanId>) -> ApiResponse<Loan> {
    lending::return_loan(&state.deps, id, Utc::now())
        .await
        .into()
}

pub async fn renew_loan(State(state): AppStateRef, Path(id): Path<LoanId>) -> ApiResponse<Loan> {
    lending::renew_loan(&state.deps, id, Utc::now()).await.into()
}

pub async fn overdue_loans(State(state): AppStateRef) -> ApiResponse<Vec<Loan>> {
    lending::get_overdue_loans(&state.deps, Utc::now())
        .await
        .into()
}

// ============================================================================
// Reservations
// ============================================================================

pub async fn create_reservation(
    State(state): AppStateRef,
    Json(cmd): Json<CreateReservation>,
) -> ApiResponse<Reservation> {
    ApiResponse::created(lending::create_reservation(&state.deps, cmd, Utc::now()).await)
}

pub async fn get_reservation(
    State(state): AppStateRef,
    Path(id): Path<ReservationId>,
) -> ApiResponse<Reservation> {
    lending::get_reservation(&state.deps, id).await.into()
}

pub async fn cancel_reservation(
    State(state): AppStateRef,
    Path(id): Path<ReservationId>,
) -> ApiResponse<Reservation> {
    lending::cancel_reservation(&state.deps, id, Utc::now())
        .await
        .into()
}

pub async fn mark_reservation_ready(
    State(state): AppStateRef,
    Path(id): Path<ReservationId>,
    Json(cmd): Json<MarkReservationReady>,
) -> ApiResponse<Reservation> {
    lending::mark_reservation_ready(&state.deps, id, cmd, Utc::now())
        .await
        .into()
}

pub async fn fulfill_reservation(
    State(state): AppStateRef,
    Path(id): Path<ReservationId>,
    Json(cmd): Json<FulfillReservation>,
) -> ApiResponse<Reservation> {
    lending::fulfill_reservation(&state.deps, id, cmd, Utc::now())
        .await
        .into()
}

pub async fn extend_reservation(
    State(state): AppStateRef,
    Path(id): Path<ReservationId>,
    Json(cmd): Json<ExtendReservation>,
) -> ApiResponse<Reservation> {
    lending::extend_reservation(&state.deps, id, cmd, Utc::now())
        .await
        .into()
}

// ============================================================================
// Fines
// ============================================================================

pub async fn get_fine(State(state): AppStateRef, Path(id): Path<FineId>) -> ApiResponse<Fine> {
    lending::get_fine(&state.deps, id).await.into()
}

/// POST /fines/:id/pay - 全額または一部の支払い
pub async fn pay_fine(
    State(state): AppStateRef,
    Path(id): Path<FineId>,
    Json(cmd): Json<PayFine>,
) -> ApiResponse<Fine> {
    lending::pay_fine(&state.deps, id, cmd, Utc::now())
        .await
        .into()
}

pub async fn waive_fine(
    State(state): AppStateRef,
    Path(id): Path<FineId>,
    Json(cmd): Json<WaiveFine>,
) -> ApiResponse<Fine> {
    lending::waive_fine(&state.deps, id, cmd, Utc::now())
        .await
        .into()
}

// ============================================================================
// Batch jobs
// ============================================================================

/// POST /jobs/detect-overdue - 延滞検出。検出件数を返す
pub async fn detect_overdue(State(state): AppStateRef) -> ApiResponse<usize> {
    lending::detect_overdue_loans(&state.deps, Utc::now())
        .await
        .into()
}

pub async fn expire_reservations(State(state): AppStateRef) -> ApiResponse<usize> {
    lending::expire_due_reservations(&state.deps, Utc::now())
        .await
        .into()
}

pub async fn expire_memberships(State(state): AppStateRef) -> ApiResponse<usize> {
    membership::expire_memberships(&state.deps, Utc::now())
        .await
        .into()
}
