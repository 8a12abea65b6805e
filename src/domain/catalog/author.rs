use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::audit::{AuditInfo, impl_entity};
use crate::domain::errors::{DomainError, DomainResult, Violations, ensure, is_blank};
use crate::domain::value_objects::{AuthorId, BookId, EntityId};

/// 著者作成の入力
#[derive(Debug, Clone)]
pub struct AuthorDraft {
    pub first_name: String,
    pub last_name: String,
    pub biography: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub nationality: Option<String>,
}

/// 著者
///
/// ビジネスルール：
/// - 生年月日は未来日不可
/// - 没年月日は生年月日以降
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    id: AuthorId,
    first_name: String,
    last_name: String,
    biography: Option<String>,
    birth_date: Option<NaiveDate>,
    death_date: Option<NaiveDate>,
    nationality: Option<String>,
    book_ids: Vec<BookId>,
    audit: AuditInfo,
}

impl_entity!(Author, AuthorId);

fn check_dates(
    v: &mut Violations,
    birth: Option<NaiveDate>,
    death: Option<NaiveDate>,
    today: NaiveDate,
) {
    if let Some(birth) = birth {
        v.require(birth <= today, "Birth date cannot be in the future.");
    }
    if let (Some(birth), Some(death)) = (birth, death) {
        v.require(death >= birth, "Death date cannot be before birth date.");
    }
}

impl Author {
    pub fn create(draft: AuthorDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut v = Violations::new();
        v.require(!is_blank(&draft.first_name), "First name is required.");
        v.require(!is_blank(&draft.last_name), "Last name is required.");
        check_dates(&mut v, draft.birth_date, draft.death_date, now.date_naive());

        v.finish(|| Author {
            id: AuthorId::new(),
            first_name: draft.first_name.trim().to_string(),
            last_name: draft.last_name.trim().to_string(),
            biography: draft.biography,
            birth_date: draft.birth_date,
            death_date: draft.death_date,
            nationality: draft.nationality,
            book_ids: Vec::new(),
            audit: AuditInfo::new(now),
        })
    }

    pub fn id(&self) -> AuthorId {
        self.id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn biography(&self) -> Option<&str> {
        self.biography.as_deref()
    }

    pub fn birth_date(&self) -> Option<NaiveDate> {
        self.birth_date
    }

    pub fn death_date(&self) -> Option<NaiveDate> {
        self.death_date
    }

    pub fn nationality(&self) -> Option<&str> {
        self.nationality.as_deref()
    }

    pub fn book_ids(&self) -> &[BookId] {
        &self.book_ids
    }

    pub fn rename(&mut self, first_name: &str, last_name: &str) -> DomainResult {
        let mut v = Violations::new();
        v.require(!is_blank(first_name), "First name is required.");
        v.require(!is_blank(last_name), "Last name is required.");
        v.finish(|| ())?;
        self.first_name = first_name.trim().to_string();
        self.last_name = last_name.trim().to_string();
        Ok(())
    }

    pub fn update_biography(&mut self, biography: &str) -> DomainResult {
        ensure(!is_blank(biography), "Biography cannot be empty.")?;
        self.biography = Some(biography.to_string());
        Ok(())
    }

    pub fn update_nationality(&mut self, nationality: Option<String>) -> DomainResult {
        if let Some(text) = &nationality {
            ensure(!is_blank(text), "Nationality cannot be blank.")?;
        }
        self.nationality = nationality;
        Ok(())
    }

    pub fn set_birth_date(&mut self, birth_date: NaiveDate, today: NaiveDate) -> DomainResult {
        let mut v = Violations::new();
        check_dates(&mut v, Some(birth_date), self.death_date, today);
        v.finish(|| ())?;
        self.birth_date = Some(birth_date);
        Ok(())
    }

    pub fn set_death_date(&mut self, death_date: Option<NaiveDate>) -> DomainResult {
        if let (Some(birth), Some(death)) = (self.birth_date, death_date) {
            ensure(death >= birth, "Death date cannot be before birth date.")?;
        }
        self.death_date = death_date;
        Ok(())
    }

    pub fn add_book(&mut self, book_id: BookId) -> DomainResult {
        ensure(!book_id.is_nil(), "Book ID cannot be empty.")?;
        ensure(
            !self.book_ids.contains(&book_id),
            "Book is already associated with this author.",
        )?;
        self.book_ids.push(book_id);
        Ok(())
    }

    pub fn remove_book(&mut self, book_id: BookId) -> DomainResult {
        ensure(!book_id.is_nil(), "Book ID cannot be empty.")?;
        ensure(
            self.book_ids.contains(&book_id),
            "Book is not associated with this author.",
        )?;
        self.book_ids.retain(|b| *b != book_id);
        Ok(())
    }

    /// 論理削除
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> DomainResult {
        if self.audit.mark_deleted(now) {
            Ok(())
        } else {
            Err(DomainError::new("Author is already inactive."))
        }
    }
}
