mod repository;
mod unit_of_work;

// パブリックに型を再エクスポート
pub use repository::{Document, PostgresRepository};
pub use unit_of_work::{PostgresStore, PostgresUnitOfWork};
