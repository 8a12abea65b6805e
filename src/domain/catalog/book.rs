use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::audit::{AuditInfo, impl_entity};
use crate::domain::errors::{DomainError, DomainResult, Violations, ensure, is_blank};
use crate::domain::value_objects::{AuthorId, BookCopyId, BookId, EntityId, GenreId};

/// 活版印刷以前の出版年は受け付けない
pub const EARLIEST_PUBLICATION_YEAR: i32 = 1450;
pub const MAX_TITLE_LENGTH: usize = 200;

/// ISBN-10 または ISBN-13（数字のみ）
pub fn is_valid_isbn(isbn: &str) -> bool {
    (isbn.len() == 10 || isbn.len() == 13) && isbn.bytes().all(|b| b.is_ascii_digit())
}

/// 書籍作成の入力
#[derive(Debug, Clone)]
pub struct BookDraft {
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub author_id: AuthorId,
    pub genre_ids: Vec<GenreId>,
    pub publisher: Option<String>,
    pub description: Option<String>,
}

/// Book集約 - カタログ上の1タイトル
///
/// ビジネスルール：
/// - ISBNは10桁または13桁
/// - 出版年は1450年から現在まで
/// - ジャンルは最低1つ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    id: BookId,
    title: String,
    isbn: String,
    publication_year: i32,
    author_id: AuthorId,
    genre_ids: Vec<GenreId>,
    copy_ids: Vec<BookCopyId>,
    publisher: Option<String>,
    description: Option<String>,
    audit: AuditInfo,
}

impl_entity!(Book, BookId);

fn publication_year_is_valid(year: i32, now: DateTime<Utc>) -> bool {
    (EARLIEST_PUBLICATION_YEAR..=now.year()).contains(&year)
}

impl Book {
    pub fn create(draft: BookDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut v = Violations::new();
        v.require(!is_blank(&draft.title), "Title is required.");
        v.require(
            draft.title.chars().count() <= MAX_TITLE_LENGTH,
            "Title cannot exceed 200 characters.",
        );
        v.require(
            is_valid_isbn(&draft.isbn),
            "ISBN must contain 10 or 13 digits.",
        );
        v.require(
            publication_year_is_valid(draft.publication_year, now),
            format!(
                "Publication year must be between {} and {}.",
                EARLIEST_PUBLICATION_YEAR,
                now.year()
            ),
        );
        v.require(!draft.author_id.is_nil(), "Author is required.");
        v.require(!draft.genre_ids.is_empty(), "At least one genre is required.");
        v.require(
            !draft.genre_ids.iter().any(|g| g.is_nil()),
            "Genre ID cannot be empty.",
        );
        v.require(
            !has_duplicates(&draft.genre_ids),
            "Duplicate genres are not allowed.",
        );

        v.finish(|| Book {
            id: BookId::new(),
            title: draft.title.trim().to_string(),
            isbn: draft.isbn,
            publication_year: draft.publication_year,
            author_id: draft.author_id,
            genre_ids: draft.genre_ids,
            copy_ids: Vec::new(),
            publisher: draft.publisher,
            description: draft.description,
            audit: AuditInfo::new(now),
        })
    }

    pub fn id(&self) -> BookId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn publication_year(&self) -> i32 {
        self.publication_year
    }

    pub fn author_id(&self) -> AuthorId {
        self.author_id
    }

    pub fn genre_ids(&self) -> &[GenreId] {
        &self.genre_ids
    }

    pub fn copy_ids(&self) -> &[BookCopyId] {
        &self.copy_ids
    }

    pub fn publisher(&self) -> Option<&str> {
        self.publisher.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn audit(&self) -> &AuditInfo {
        &self.audit
    }

    pub fn is_active(&self) -> bool {
        !self.audit.is_deleted()
    }

    pub fn update_title(&mut self, title: &str) -> DomainResult {
        ensure(!is_blank(title), "Title cannot be empty.")?;
        ensure(
            title.chars().count() <= MAX_TITLE_LENGTH,
            "Title cannot exceed 200 characters.",
        )?;
        self.title = title.trim().to_string();
        Ok(())
    }

    pub fn update_description(&mut self, description: Option<String>) -> DomainResult {
        if let Some(text) = &description {
            ensure(!is_blank(text), "Description cannot be blank.")?;
        }
        self.description = description;
        Ok(())
    }

    /// ISBN・出版年・出版社をまとめて更新
    ///
    /// いずれかが不正なら何も変更しない。
    pub fn update_details(
        &mut self,
        isbn: &str,
        publication_year: i32,
        publisher: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult {
        let mut v = Violations::new();
        v.require(is_valid_isbn(isbn), "ISBN must contain 10 or 13 digits.");
        v.require(
            publication_year_is_valid(publication_year, now),
            format!(
                "Publication year must be between {} and {}.",
                EARLIEST_PUBLICATION_YEAR,
                now.year()
            ),
        );
        v.finish(|| ())?;

        self.isbn = isbn.to_string();
        self.publication_year = publication_year;
        self.publisher = publisher;
        Ok(())
    }

    pub fn change_author(&mut self, author_id: AuthorId) -> DomainResult {
        ensure(!author_id.is_nil(), "Author ID cannot be empty.")?;
        self.author_id = author_id;
        Ok(())
    }

    pub fn add_genre(&mut self, genre_id: GenreId) -> DomainResult {
        ensure(!genre_id.is_nil(), "Genre ID cannot be empty.")?;
        ensure(
            !self.genre_ids.contains(&genre_id),
            "Genre is already associated with this book.",
        )?;
        self.genre_ids.push(genre_id);
        Ok(())
    }

    /// ジャンルを外す。最後の1つは外せない
    pub fn remove_genre(&mut self, genre_id: GenreId) -> DomainResult {
        ensure(
            self.genre_ids.contains(&genre_id),
            "Genre is not associated with this book.",
        )?;
        ensure(
            self.genre_ids.len() > 1,
            "A book must have at least one genre.",
        )?;
        self.genre_ids.retain(|g| *g != genre_id);
        Ok(())
    }

    pub fn replace_genres(&mut self, genre_ids: Vec<GenreId>) -> DomainResult {
        ensure(!genre_ids.is_empty(), "A book must have at least one genre.")?;
        ensure(
            !genre_ids.iter().any(|g| g.is_nil()),
            "Genre ID cannot be empty.",
        )?;
        ensure(
            !has_duplicates(&genre_ids),
            "Duplicate genres are not allowed.",
        )?;
        self.genre_ids = genre_ids;
        Ok(())
    }

    pub fn add_copy(&mut self, copy_id: BookCopyId) -> DomainResult {
        ensure(!copy_id.is_nil(), "Copy ID cannot be empty.")?;
        ensure(
            !self.copy_ids.contains(&copy_id),
            "Copy is already registered for this book.",
        )?;
        self.copy_ids.push(copy_id);
        Ok(())
    }

    pub fn remove_copy(&mut self, copy_id: BookCopyId) -> DomainResult {
        ensure(
            self.copy_ids.contains(&copy_id),
            "Copy is not registered for this book.",
        )?;
        self.copy_ids.retain(|c| *c != copy_id);
        Ok(())
    }

    /// 論理削除
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> DomainResult {
        if self.audit.mark_deleted(now) {
            Ok(())
        } else {
            Err(DomainError::new("Book is already inactive."))
        }
    }

    pub fn activate(&mut self, now: DateTime<Utc>) -> DomainResult {
        if self.audit.restore(now) {
            Ok(())
        } else {
            Err(DomainError::new("Book is already active."))
        }
    }
}

fn has_duplicates<T: PartialEq>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, item)| items[i + 1..].contains(item))
}
