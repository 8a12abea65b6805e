mod fine;
mod loan;
mod reservation;

pub use fine::{FINE_OVERDUE_AFTER_DAYS, Fine, FineType, PaymentMethod};
pub use loan::{DEFAULT_LOAN_DAYS, Loan, LoanStatus, MAX_RENEWALS};
pub use reservation::{DEFAULT_RESERVATION_DAYS, Reservation, ReservationStatus};
