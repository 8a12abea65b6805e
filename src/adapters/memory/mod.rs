mod repository;

pub use repository::MemoryRepository;

use crate::adapters::StoreError;
use crate::domain::catalog::{Author, Book, BookCopy, Genre};
use crate::domain::lending::{Fine, Loan, Reservation};
use crate::domain::notification::Notification;
use crate::domain::users::{Librarian, Member};
use crate::ports::repository::*;
use crate::ports::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use async_trait::async_trait;
use repository::{SharedTable, Table, lock};
use std::sync::{Arc, Mutex};

impl BookRepository for MemoryRepository<Book> {}
impl BookCopyRepository for MemoryRepository<BookCopy> {}
impl AuthorRepository for MemoryRepository<Author> {}
impl GenreRepository for MemoryRepository<Genre> {}
impl LoanRepository for MemoryRepository<Loan> {}
impl ReservationRepository for MemoryRepository<Reservation> {}
impl FineRepository for MemoryRepository<Fine> {}
impl MemberRepository for MemoryRepository<Member> {}
impl LibrarianRepository for MemoryRepository<Librarian> {}
impl NotificationRepository for MemoryRepository<Notification> {}

/// インメモリの保存先
///
/// DATABASE_URLが未設定のときとテストで使用する。
/// 保存済みの集約だけを持ち、操作ごとにMemoryUnitOfWorkを作る。
#[derive(Clone, Default)]
pub struct MemoryStore {
    books: SharedTable<Book>,
    book_copies: SharedTable<BookCopy>,
    authors: SharedTable<Author>,
    genres: SharedTable<Genre>,
    loans: SharedTable<Loan>,
    reservations: SharedTable<Reservation>,
    fines: SharedTable<Fine>,
    members: SharedTable<Member>,
    librarians: SharedTable<Librarian>,
    notifications: SharedTable<Notification>,
    write: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UnitOfWorkFactory for MemoryStore {
    fn create(&self) -> Box<dyn UnitOfWork> {
        Box::new(MemoryUnitOfWork::new(self))
    }
}

/// インメモリのUnit of Work
///
/// save_changesは全テーブルを検査してから反映するため、
/// 1件でも失敗すればどのテーブルにも反映されない。
/// トランザクション中の変更はcommitまで他のUnit of Workから見えない。
pub struct MemoryUnitOfWork {
    books: MemoryRepository<Book>,
    book_copies: MemoryRepository<BookCopy>,
    authors: MemoryRepository<Author>,
    genres: MemoryRepository<Genre>,
    loans: MemoryRepository<Loan>,
    reservations: MemoryRepository<Reservation>,
    fines: MemoryRepository<Fine>,
    members: MemoryRepository<Member>,
    librarians: MemoryRepository<Librarian>,
    notifications: MemoryRepository<Notification>,
    write: Arc<Mutex<()>>,
    in_transaction: Mutex<bool>,
}

impl MemoryUnitOfWork {
    pub fn new(store: &MemoryStore) -> Self {
        Self {
            books: MemoryRepository::new(store.books.clone()),
            book_copies: MemoryRepository::new(store.book_copies.clone()),
            authors: MemoryRepository::new(store.authors.clone()),
            genres: MemoryRepository::new(store.genres.clone()),
            loans: MemoryRepository::new(store.loans.clone()),
            reservations: MemoryRepository::new(store.reservations.clone()),
            fines: MemoryRepository::new(store.fines.clone()),
            members: MemoryRepository::new(store.members.clone()),
            librarians: MemoryRepository::new(store.librarians.clone()),
            notifications: MemoryRepository::new(store.notifications.clone()),
            write: store.write.clone(),
            in_transaction: Mutex::new(false),
        }
    }

    fn tables(&self) -> [&dyn Table; 10] {
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

    fn set_transaction(&self, expected: bool, next: bool) -> Result<()> {
        let mut state = lock(&self.in_transaction);
        if *state != expected {
            return Err(Box::new(if expected {
                StoreError::NoTransaction
            } else {
                StoreError::TransactionInProgress
            }));
        }
        *state = next;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
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
        let _write = lock(&self.write);
        let tables = self.tables();
        if let Err(e) = tables.iter().try_for_each(|t| t.check()) {
            self.discard_all();
            return Err(e);
        }
        Ok(tables.iter().map(|t| t.apply()).sum())
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.set_transaction(false, true)?;
        self.tables().iter().for_each(|t| t.begin());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.set_transaction(true, false)?;
        let _write = lock(&self.write);
        self.tables().iter().for_each(|t| t.commit());
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.set_transaction(true, false)?;
        self.tables().iter().for_each(|t| t.rollback());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn genre(name: &str) -> Genre {
        Genre::create(name, "desc", Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_added_entity_visible_after_save() {
        let uow = MemoryStore::new().create();
        let fiction = genre("Fiction");

        uow.genres().add(fiction.clone()).await.unwrap();
        assert!(uow.genres().get_by_id(fiction.id()).await.unwrap().is_none());

        assert_eq!(uow.save_changes().await.unwrap(), 1);
        assert_eq!(uow.genres().get_by_id(fiction.id()).await.unwrap(), Some(fiction));
    }

    #[tokio::test]
    async fn test_duplicate_add_discards_every_pending_change() {
        let uow = MemoryStore::new().create();
        let fiction = genre("Fiction");
        uow.genres().add(fiction.clone()).await.unwrap();
        uow.save_changes().await.unwrap();

        let poetry = genre("Poetry");
        uow.genres().add(poetry.clone()).await.unwrap();
        uow.genres().add(fiction).await.unwrap();

        assert!(uow.save_changes().await.is_err());
        assert!(uow.genres().get_by_id(poetry.id()).await.unwrap().is_none());
        assert_eq!(uow.save_changes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_of_unknown_entity_fails() {
        let uow = MemoryStore::new().create();
        uow.genres().update(genre("Fiction")).await.unwrap();
        assert!(uow.save_changes().await.is_err());
    }

    #[tokio::test]
    async fn test_deleted_entities_are_hidden() {
        let uow = MemoryStore::new().create();
        let mut fiction = genre("Fiction");
        uow.genres().add(fiction.clone()).await.unwrap();
        uow.save_changes().await.unwrap();

        fiction.deactivate(Utc::now()).unwrap();
        uow.genres().update(fiction.clone()).await.unwrap();
        uow.save_changes().await.unwrap();

        assert!(uow.genres().get_by_id(fiction.id()).await.unwrap().is_none());
        assert!(uow.genres().get_all().await.unwrap().is_empty());
        assert!(uow.genres().get_by_name("Fiction").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rollback_discards_transaction_changes() {
        let uow = MemoryStore::new().create();
        let fiction = genre("Fiction");
        uow.genres().add(fiction.clone()).await.unwrap();
        uow.save_changes().await.unwrap();

        uow.begin_transaction().await.unwrap();
        let poetry = genre("Poetry");
        uow.genres().add(poetry.clone()).await.unwrap();
        uow.save_changes().await.unwrap();
        // トランザクション内では反映済みの変更が見える
        assert!(uow.genres().get_by_id(poetry.id()).await.unwrap().is_some());
        uow.genres().add(genre("Drama")).await.unwrap();
        uow.rollback().await.unwrap();

        assert!(uow.genres().get_by_id(poetry.id()).await.unwrap().is_none());
        assert_eq!(uow.genres().get_all().await.unwrap(), vec![fiction]);
        assert_eq!(uow.save_changes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commit_keeps_changes() {
        let uow = MemoryStore::new().create();
        uow.begin_transaction().await.unwrap();
        assert!(uow.begin_transaction().await.is_err());

        let fiction = genre("Fiction");
        uow.genres().add(fiction.clone()).await.unwrap();
        uow.save_changes().await.unwrap();
        uow.commit().await.unwrap();

        assert!(uow.commit().await.is_err());
        assert!(uow.rollback().await.is_err());
        assert!(uow.genres().get_by_id(fiction.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_units_of_work_over_one_store_are_isolated() {
        let store = MemoryStore::new();
        let first = store.create();
        let second = store.create();

        // 1. firstのトランザクション中にsecondが保存する
        first.begin_transaction().await.unwrap();
        let poetry = genre("Poetry");
        first.genres().add(poetry.clone()).await.unwrap();
        first.save_changes().await.unwrap();

        let fiction = genre("Fiction");
        second.genres().add(fiction.clone()).await.unwrap();
        assert_eq!(second.save_changes().await.unwrap(), 1);

        // 2. secondはfirstの未コミットの変更を見ず、トランザクションも開始できる
        assert!(second.genres().get_by_id(poetry.id()).await.unwrap().is_none());
        second.begin_transaction().await.unwrap();
        second.rollback().await.unwrap();

        // 3. firstのロールバックはsecondの保存を取り消さない
        first.rollback().await.unwrap();
        let reader = store.create();
        assert_eq!(reader.genres().get_all().await.unwrap(), vec![fiction]);
    }

    #[tokio::test]
    async fn test_pending_changes_are_not_flushed_by_another_unit() {
        let store = MemoryStore::new();
        let first = store.create();
        let second = store.create();

        let poetry = genre("Poetry");
        first.genres().add(poetry.clone()).await.unwrap();
        assert_eq!(second.save_changes().await.unwrap(), 0);
        assert!(store.create().genres().get_by_id(poetry.id()).await.unwrap().is_none());

        first.save_changes().await.unwrap();
        assert!(second.genres().get_by_id(poetry.id()).await.unwrap().is_some());
    }
}
