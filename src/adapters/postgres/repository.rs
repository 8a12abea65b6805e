use crate::adapters::StoreError;
use crate::adapters::staging::{Staged, entity_name};
use crate::domain::catalog::{Author, Book, BookCopy, Genre};
use crate::domain::lending::{Fine, Loan, Reservation};
use crate::domain::notification::Notification;
use crate::domain::users::{Librarian, Member};
use crate::domain::{Entity, EntityId};
use crate::ports::repository::*;
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use std::sync::{Arc, Mutex, PoisonError};

/// UnitOfWork内の全リポジトリが共有する明示的トランザクション
pub(super) type SharedTransaction = Arc<tokio::sync::Mutex<Option<Transaction<'static, Postgres>>>>;

/// JSONBドキュメントとして保存される集約
pub trait Document: Entity {
    const TABLE: &'static str;
}

impl Document for Book {
    const TABLE: &'static str = "books";
}

impl Document for BookCopy {
    const TABLE: &'static str = "book_copies";
}

impl Document for Author {
    const TABLE: &'static str = "authors";
}

impl Document for Genre {
    const TABLE: &'static str = "genres";
}

impl Document for Loan {
    const TABLE: &'static str = "loans";
}

impl Document for Reservation {
    const TABLE: &'static str = "reservations";
}

impl Document for Fine {
    const TABLE: &'static str = "fines";
}

impl Document for Member {
    const TABLE: &'static str = "members";
}

impl Document for Librarian {
    const TABLE: &'static str = "librarians";
}

impl Document for Notification {
    const TABLE: &'static str = "notifications";
}

/// data列をJSONから集約に復元する
fn map_row_to_document<T: Document>(row: &PgRow) -> Result<T> {
    let data: serde_json::Value = row.try_get("data")?;
    Ok(serde_json::from_value(data)?)
}

/// RepositoryのPostgreSQL実装
///
/// 読み取りは論理削除されていない行のみを対象にする。
/// トランザクション中はそのトランザクション上で読み取るため、
/// 自分が反映した変更が見える。
pub struct PostgresRepository<T: Document> {
    pool: PgPool,
    tx: SharedTransaction,
    pending: Mutex<Vec<Staged<T>>>,
}

impl<T: Document> PostgresRepository<T> {
    pub(super) fn new(pool: PgPool, tx: SharedTransaction) -> Self {
        Self {
            pool,
            tx,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// トランザクション中ならその接続で、そうでなければプールで問い合わせる
    async fn fetch_documents(&self, query: Query<'_, Postgres, PgArguments>) -> Result<Vec<T>> {
        let mut guard = self.tx.lock().await;
        let rows = match guard.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await?,
            None => query.fetch_all(&self.pool).await?,
        };

        rows.iter().map(map_row_to_document).collect()
    }

    async fn fetch_where(&self, condition: &str, value: &str) -> Result<Vec<T>> {
        let sql = format!(
            "SELECT data FROM {} WHERE {} = $1 AND NOT is_deleted ORDER BY created_at",
            T::TABLE,
            condition
        );
        self.fetch_documents(sqlx::query(&sql).bind(value)).await
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<Staged<T>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<T: Document> Repository<T> for PostgresRepository<T> {
    async fn get_by_id(&self, id: T::Id) -> Result<Option<T>> {
        let sql = format!(
            "SELECT data FROM {} WHERE id = $1 AND NOT is_deleted",
            T::TABLE
        );
        let found = self
            .fetch_documents(sqlx::query(&sql).bind(id.value()))
            .await?;
        Ok(found.into_iter().next())
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        let sql = format!(
            "SELECT data FROM {} WHERE NOT is_deleted ORDER BY created_at",
            T::TABLE
        );
        self.fetch_documents(sqlx::query(&sql)).await
    }

    /// 任意の条件はSQLに変換できないため、有効な行を読み込んでから絞り込む
    async fn find(&self, predicate: Predicate<'_, T>) -> Result<Vec<T>> {
        let mut all = self.get_all().await?;
        all.retain(|e| predicate(e));
        Ok(all)
    }

    async fn add(&self, entity: T) -> Result<()> {
        self.lock_pending().push(Staged::Add(entity));
        Ok(())
    }

    async fn update(&self, entity: T) -> Result<()> {
        self.lock_pending().push(Staged::Update(entity));
        Ok(())
    }
}

/// PostgresUnitOfWorkから操作される保留中の変更
#[async_trait]
pub(super) trait PendingWrites: Send + Sync {
    /// 保留中の変更を接続上で実行する。保留中の変更は成否に関わらず空になる
    async fn flush(&self, conn: &mut PgConnection) -> Result<usize>;
    fn discard(&self);
}

#[async_trait]
impl<T: Document> PendingWrites for PostgresRepository<T> {
    async fn flush(&self, conn: &mut PgConnection) -> Result<usize> {
        let staged: Vec<Staged<T>> = self.lock_pending().drain(..).collect();

        for change in &staged {
            let entity = change.entity();
            let audit = entity.audit();
            let data = serde_json::to_value(entity)?;
            let updated_at = audit.updated_at().unwrap_or(audit.created_at());

            match change {
                Staged::Add(_) => {
                    let sql = format!(
                        r#"
                        INSERT INTO {} (id, data, is_deleted, created_at, updated_at)
                        VALUES ($1, $2, $3, $4, $5)
                        "#,
                        T::TABLE
                    );
                    sqlx::query(&sql)
                        .bind(entity.id().value())
                        .bind(data)
                        .bind(audit.is_deleted())
                        .bind(audit.created_at())
                        .bind(updated_at)
                        .execute(&mut *conn)
                        .await?;
                }
                Staged::Update(_) => {
                    let sql = format!(
                        "UPDATE {} SET data = $2, is_deleted = $3, updated_at = $4 WHERE id = $1",
                        T::TABLE
                    );
                    let result = sqlx::query(&sql)
                        .bind(entity.id().value())
                        .bind(data)
                        .bind(audit.is_deleted())
                        .bind(updated_at)
                        .execute(&mut *conn)
                        .await?;

                    if result.rows_affected() == 0 {
                        return Err(Box::new(StoreError::NotFound {
                            entity: entity_name::<T>(),
                            id: change.id_text(),
                        }));
                    }
                }
            }
        }

        Ok(staged.len())
    }

    fn discard(&self) {
        self.lock_pending().clear();
    }
}

#[async_trait]
impl BookRepository for PostgresRepository<Book> {
    async fn get_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        Ok(self.fetch_where("data->>'isbn'", isbn).await?.into_iter().next())
    }
}

#[async_trait]
impl BookCopyRepository for PostgresRepository<BookCopy> {
    async fn get_by_barcode(&self, barcode: &str) -> Result<Option<BookCopy>> {
        Ok(self
            .fetch_where("data->>'barcode'", barcode)
            .await?
            .into_iter()
            .next())
    }
}

#[async_trait]
impl MemberRepository for PostgresRepository<Member> {
    async fn get_by_email(&self, email: &str) -> Result<Option<Member>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .fetch_where("data->'profile'->>'email'", &email)
            .await?
            .into_iter()
            .next())
    }
}

impl AuthorRepository for PostgresRepository<Author> {}
impl GenreRepository for PostgresRepository<Genre> {}
impl LoanRepository for PostgresRepository<Loan> {}
impl ReservationRepository for PostgresRepository<Reservation> {}
impl FineRepository for PostgresRepository<Fine> {}
impl LibrarianRepository for PostgresRepository<Librarian> {}
impl NotificationRepository for PostgresRepository<Notification> {}
