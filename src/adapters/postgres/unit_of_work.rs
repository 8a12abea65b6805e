use super::repository::{PendingWrites, PostgresRepository, SharedTransaction};
use crate::adapters::StoreError;
use crate::domain::catalog::{Author, Book, BookCopy, Genre};
use crate::domain::lending::{Fine, Loan, Reservation};
use crate::domain::notification::Notification;
use crate::domain::users::{Librarian, Member};
use crate::ports::repository::*;
use crate::ports::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;

/// PostgreSQLの保存先
///
/// コネクションプールだけを共有し、操作ごとにPostgresUnitOfWorkを作る。
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UnitOfWorkFactory for PostgresStore {
    fn create(&self) -> Box<dyn UnitOfWork> {
        Box::new(PostgresUnitOfWork::new(self.pool.clone()))
    }
}

/// UnitOfWorkのPostgreSQL実装
///
/// save_changesは保留中の変更を1つのトランザクションで反映する。
/// begin_transaction中であればそのトランザクションに含め、commitまで確定しない。
/// commitもrollbackもされずに破棄されたトランザクションはロールバックされる。
pub struct PostgresUnitOfWork {
    pool: PgPool,
    tx: SharedTransaction,
    books: PostgresRepository<Book>,
    book_copies: PostgresRepository<BookCopy>,
    authors: PostgresRepository<Author>,
    genres: PostgresRepository<Genre>,
    loans: PostgresRepository<Loan>,
    reservations: PostgresRepository<Reservation>,
    fines: PostgresRepository<Fine>,
    members: PostgresRepository<Member>,
    librarians: PostgresRepository<Librarian>,
    notifications: PostgresRepository<Notification>,
}

impl PostgresUnitOfWork {
    /// PostgreSQLコネクションプールから新しいUnitOfWorkを作成
    pub fn new(pool: PgPool) -> Self {
        let tx: SharedTransaction = Arc::new(tokio::sync::Mutex::new(None));

        Self {
            books: PostgresRepository::new(pool.clone(), tx.clone()),
            book_copies: PostgresRepository::new(pool.clone(), tx.clone()),
            authors: PostgresRepository::new(pool.clone(), tx.clone()),
            genres: PostgresRepository::new(pool.clone(), tx.clone()),
            loans: PostgresRepository::new(pool.clone(), tx.clone()),
            reservations: PostgresRepository::new(pool.clone(), tx.clone()),
            fines: PostgresRepository::new(pool.clone(), tx.clone()),
            members: PostgresRepository::new(pool.clone(), tx.clone()),
            librarians: PostgresRepository::new(pool.clone(), tx.clone()),
            notifications: PostgresRepository::new(pool.clone(), tx.clone()),
            pool,
            tx,
        }
    }

    fn tables(&self) -> [&dyn PendingWrites; 10] {
        [
            &self.books,
            &self.book_copies,
            &self.authors,
            &self.genres,
            &self.loans,
            &self.reservations,
            &self.fines,
            &self.members,
            &self.librarians,
            &self.notifications,
        ]
    }

    fn discard_all(&self) {
        self.tables().iter().for_each(|t| t.discard());
    }

    async fn flush_all(&self, conn: &mut PgConnection) -> Result<usize> {
        let mut count = 0;
        for table in self.tables() {
            count += table.flush(&mut *conn).await?;
        }
        Ok(count)
    }

    /// 明示的なトランザクションがなければこの呼び出しだけのトランザクションを使う
    ///
    /// 途中で失敗した場合はtxのdropでロールバックされる。
    async fn flush_in_own_transaction(&self) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let count = self.flush_all(&mut *tx).await?;
        tx.commit().await?;
        Ok(count)
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    fn books(&self) -> &dyn BookRepository {
        &self.books
    }

    fn book_copies(&self) -> &dyn BookCopyRepository {
        &self.book_copies
    }

    fn authors(&self) -> &dyn AuthorRepository {
        &self.authors
    }

    fn genres(&self) -> &dyn GenreRepository {
        &self.genres
    }

    fn loans(&self) -> &dyn LoanRepository {
        &self.loans
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn fines(&self) -> &dyn FineRepository {
        &self.fines
    }

    fn members(&self) -> &dyn MemberRepository {
        &self.members
    }

    fn librarians(&self) -> &dyn LibrarianRepository {
        &self.librarians
    }

    fn notifications(&self) -> &dyn NotificationRepository {
        &self.notifications
    }

    async fn save_changes(&self) -> Result<usize> {
        let mut guard = self.tx.lock().await;

        let result = match guard.as_mut() {
            Some(tx) => self.flush_all(&mut **tx).await,
            None => self.flush_in_own_transaction().await,
        };

        if result.is_err() {
            self.discard_all();
        }
        result
    }

    async fn begin_transaction(&self) -> Result<()> {
        let mut guard = self.tx.lock().await;
        if guard.is_some() {
            return Err(Box::new(StoreError::TransactionInProgress));
        }
        *guard = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let tx = self.tx.lock().await.take();
        match tx {
            Some(tx) => Ok(tx.commit().await?),
            None => Err(Box::new(StoreError::NoTransaction)),
        }
    }

    async fn rollback(&self) -> Result<()> {
        self.discard_all();
        let tx = self.tx.lock().await.take();
        match tx {
            Some(tx) => Ok(tx.rollback().await?),
            None => Err(Box::new(StoreError::NoTransaction)),
        }
    }
}
