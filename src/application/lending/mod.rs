mod commands;
mod fines;
mod loans;
mod overdue;
mod reservations;

pub use commands::*;
pub use fines::{get_fine, get_fines_by_member, pay_fine, waive_fine};
pub use loans::{
    checkout, get_active_loans, get_loan, get_loan_history, get_overdue_loans, renew_loan,
    return_loan,
};
pub use overdue::detect_overdue_loans;
pub use reservations::{
    cancel_reservation, create_reservation, expire_due_reservations, extend_reservation,
    fulfill_reservation, get_reservation, get_reservations_by_member, mark_reservation_ready,
};
