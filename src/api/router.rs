use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{self as h, AppState};

/// APIルーターを作成する
///
/// 各エンドポイントはサービス関数を1つ呼び、その結果（OperationResult）をJSONで返す。
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Catalog
        .route("/genres", get(h::list_genres).post(h::create_genre))
        .route(
            "/genres/:id",
            get(h::get_genre).put(h::update_genre).delete(h::delete_genre),
        )
        .route("/genres/:id/books", get(h::books_by_genre))
        .route("/authors", get(h::list_authors).post(h::create_author))
        .route(
            "/authors/:id",
            get(h::get_author)
                .put(h::update_author)
                .delete(h::delete_author),
        )
        .route("/authors/:id/books", get(h::books_by_author))
        .route("/books", get(h::list_books).post(h::create_book))
        .route("/books/search", get(h::search_books))
        .route(
            "/books/:id",
            get(h::get_book).put(h::update_book).delete(h::delete_book),
        )
        .route(
            "/books/:id/copies",
            get(h::copies_of_book).post(h::add_copy),
        )
        .route("/copies/:id", get(h::get_copy))
        .route("/copies/:id/lost", post(h::mark_copy_lost))
        .route("/copies/:id/damaged", post(h::mark_copy_damaged))
        .route("/copies/:id/maintenance", post(h::send_copy_to_maintenance))
        .route("/copies/:id/restore", post(h::restore_copy))
        .route("/copies/:id/withdraw", post(h::withdraw_copy))
        // Members and staff
        .route("/members", get(h::list_members).post(h::register_member))
        .route("/members/lookup", get(h::find_member_by_email))
        .route("/members/:id", get(h::get_member))
        .route("/members/:id/suspend", post(h::suspend_member))
        .route("/members/:id/reactivate", post(h::reactivate_member))
        .route("/members/:id/extend", post(h::extend_membership))
        .route("/members/:id/upgrade", post(h::upgrade_membership))
        .route("/members/:id/loans", get(h::active_loans_of_member))
        .route("/members/:id/loans/history", get(h::loan_history_of_member))
        .route("/members/:id/reservations", get(h::reservations_of_member))
        .route("/members/:id/fines", get(h::fines_of_member))
        .route("/users/:id/notifications", get(h::notifications_of_user))
        .route("/notifications/:id/read", post(h::mark_notification_read))
        .route("/librarians", post(h::register_librarian))
        .route("/librarians/:id", get(h::get_librarian))
        // Lending
        .route("/loans", post(h::checkout))
        .route("/loans/overdue", get(h::overdue_loans))
        .route("/loans/:id", get(h::get_loan))
        .route("/loans/:id/return", post(h::return_loan))
        .route("/loans/:id/renew", post(h::renew_loan))
        .route("/reservations", post(h::create_reservation))
        .route("/reservations/:id", get(h::get_reservation))
        .route("/reservations/:id/cancel", post(h::cancel_reservation))
        .route("/reservations/:id/ready", post(h::mark_reservation_ready))
        .route("/reservations/:id/fulfill", post(h::fulfill_reservation))
        .route("/reservations/:id/extend", post(h::extend_reservation))
        .route("/fines/:id", get(h::get_fine))
        .route("/fines/:id/pay", post(h::pay_fine))
        .route("/fines/:id/waive", post(h::waive_fine))
        // Batch jobs
        .route("/jobs/detect-overdue", post(h::detect_overdue))
        .route("/jobs/expire-reservations", post(h::expire_reservations))
        .route("/jobs/expire-memberships", post(h::expire_memberships))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
