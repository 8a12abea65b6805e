use crate::domain::Entity;
use crate::domain::catalog::{Author, Book, BookCopy, Genre};
use crate::domain::lending::{Fine, Loan, Reservation};
use crate::domain::notification::Notification;
use crate::domain::users::{Librarian, LibraryUser, Member};
use crate::domain::value_objects::{AuthorId, BookCopyId, BookId, GenreId, MemberId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 検索条件
pub type Predicate<'a, T> = &'a (dyn Fn(&T) -> bool + Send + Sync);

/// 集約の永続化ポート
///
/// 読み取りは保存済み（save_changes済み）の、論理削除されていない集約のみを返す。
/// add/updateは変更を登録するだけで、UnitOfWork::save_changesで反映される。
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn get_by_id(&self, id: T::Id) -> Result<Option<T>>;

    async fn get_all(&self) -> Result<Vec<T>>;

    async fn find(&self, predicate: Predicate<'_, T>) -> Result<Vec<T>>;

    async fn find_single(&self, predicate: Predicate<'_, T>) -> Result<Option<T>> {
        Ok(self.find(predicate).await?.into_iter().next())
    }

    async fn exists(&self, predicate: Predicate<'_, T>) -> Result<bool> {
        Ok(self.find_single(predicate).await?.is_some())
    }

    async fn count(&self, predicate: Predicate<'_, T>) -> Result<usize> {
        Ok(self.find(predicate).await?.len())
    }

    /// 新規登録（同じIDが既に保存されていればsave_changesで失敗する）
    async fn add(&self, entity: T) -> Result<()>;

    /// 更新（保存済みでなければsave_changesで失敗する）
    async fn update(&self, entity: T) -> Result<()>;
}

#[async_trait]
pub trait BookRepository: Repository<Book> {
    async fn get_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        self.find_single(&|b: &Book| b.isbn() == isbn).await
    }

    async fn get_by_author(&self, author_id: AuthorId) -> Result<Vec<Book>> {
        self.find(&|b: &Book| b.author_id() == author_id).await
    }

    async fn get_by_genre(&self, genre_id: GenreId) -> Result<Vec<Book>> {
        self.find(&|b: &Book| b.genre_ids().contains(&genre_id)).await
    }

    /// タイトル・ISBN・説明の部分一致（大文字小文字を区別しない）
    async fn search(&self, term: &str) -> Result<Vec<Book>> {
        let term = term.to_lowercase();
        self.find(&|b: &Book| {
            b.title().to_lowercase().contains(&term)
                || b.isbn().contains(&term)
                || b.description()
                    .is_some_and(|d| d.to_lowercase().contains(&term))
        })
        .await
    }
}

#[async_trait]
pub trait BookCopyRepository: Repository<BookCopy> {
    async fn get_by_book(&self, book_id: BookId) -> Result<Vec<BookCopy>> {
        self.find(&|c: &BookCopy| c.book_id() == book_id).await
    }

    async fn get_by_barcode(&self, barcode: &str) -> Result<Option<BookCopy>> {
        self.find_single(&|c: &BookCopy| c.barcode() == barcode)
            .await
    }
}

#[async_trait]
pub trait AuthorRepository: Repository<Author> {
    async fn get_by_name(&self, first_name: &str, last_name: &str) -> Result<Option<Author>> {
        self.find_single(&|a: &Author| {
            a.first_name().eq_ignore_ascii_case(first_name.trim())
                && a.last_name().eq_ignore_ascii_case(last_name.trim())
        })
        .await
    }
}

#[async_trait]
pub trait GenreRepository: Repository<Genre> {
    async fn get_by_name(&self, name: &str) -> Result<Option<Genre>> {
        self.find_single(&|g: &Genre| g.name().eq_ignore_ascii_case(name.trim()))
            .await
    }
}

#[async_trait]
pub trait LoanRepository: Repository<Loan> {
    /// 会員の未返却の貸出
    async fn get_open_by_member(&self, member_id: MemberId) -> Result<Vec<Loan>> {
        self.find(&|l: &Loan| l.member_id() == member_id && l.is_open())
            .await
    }

    /// 会員の全貸出（返却済みを含む）
    async fn get_history_by_member(&self, member_id: MemberId) -> Result<Vec<Loan>> {
        let mut loans = self.find(&|l: &Loan| l.member_id() == member_id).await?;
        loans.sort_by_key(|l| std::cmp::Reverse(l.loan_date()));
        Ok(loans)
    }

    /// 返却期限を過ぎた未返却の貸出
    async fn get_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Loan>> {
        self.find(&|l: &Loan| l.is_overdue(now)).await
    }

    /// 蔵書の未返却の貸出（常に高々1件）
    async fn get_open_for_copy(&self, copy_id: BookCopyId) -> Result<Option<Loan>> {
        self.find_single(&|l: &Loan| l.book_copy_id() == copy_id && l.is_open())
            .await
    }
}

#[async_trait]
pub trait ReservationRepository: Repository<Reservation> {
    /// 書籍の終端状態でない予約（待ち順）
    async fn get_open_for_book(&self, book_id: BookId) -> Result<Vec<Reservation>> {
        let mut reservations = self
            .find(&|r: &Reservation| r.book_id() == book_id && !r.status().is_terminal())
            .await?;
        reservations.sort_by_key(|r| r.queue_position());
        Ok(reservations)
    }

    async fn get_by_member(&self, member_id: MemberId) -> Result<Vec<Reservation>> {
        self.find(&|r: &Reservation| r.member_id() == member_id)
            .await
    }

    async fn get_expired(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>> {
        self.find(&|r: &Reservation| r.is_expired(now)).await
    }
}

#[async_trait]
pub trait FineRepository: Repository<Fine> {
    async fn get_by_member(&self, member_id: MemberId) -> Result<Vec<Fine>> {
        self.find(&|f: &Fine| f.member_id() == member_id).await
    }

    async fn get_unpaid_by_member(&self, member_id: MemberId) -> Result<Vec<Fine>> {
        self.find(&|f: &Fine| f.member_id() == member_id && !f.is_paid())
            .await
    }
}

#[async_trait]
pub trait MemberRepository: Repository<Member> {
    async fn get_by_email(&self, email: &str) -> Result<Option<Member>> {
        let email = email.trim().to_lowercase();
        self.find_single(&|m: &Member| m.email() == email).await
    }
}

#[async_trait]
pub trait LibrarianRepository: Repository<Librarian> {
    async fn get_by_email(&self, email: &str) -> Result<Option<Librarian>> {
        let email = email.trim().to_lowercase();
        self.find_single(&|l: &Librarian| l.profile().email() == email)
            .await
    }
}

#[async_trait]
pub trait NotificationRepository: Repository<Notification> {
    async fn get_by_user(&self, user_id: UserId) -> Result<Vec<Notification>> {
        self.find(&|n: &Notification| n.user_id() == user_id).await
    }

    async fn get_unread(&self, user_id: UserId) -> Result<Vec<Notification>> {
        self.find(&|n: &Notification| n.user_id() == user_id && !n.is_read())
            .await
    }
}
