use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::audit::{AuditInfo, impl_entity};
use crate::domain::errors::{DomainResult, Violations, ensure, is_blank};
use crate::domain::value_objects::{BookId, EntityId, GenreId};

/// ジャンル
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    id: GenreId,
    name: String,
    description: String,
    book_ids: Vec<BookId>,
    audit: AuditInfo,
}

impl_entity!(Genre, GenreId);

impl Genre {
    pub fn create(name: &str, description: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut v = Violations::new();
        v.require(!is_blank(name), "Name is required");
        v.require(!is_blank(description), "Description is required");

        v.finish(|| Genre {
            id: GenreId::new(),
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            book_ids: Vec::new(),
            audit: AuditInfo::new(now),
        })
    }

    pub fn id(&self) -> GenreId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn book_ids(&self) -> &[BookId] {
        &self.book_ids
    }

    pub fn is_active(&self) -> bool {
        !self.audit.is_deleted()
    }

    pub fn update_name(&mut self, name: &str) -> DomainResult {
        ensure(!is_blank(name), "Name cannot be empty.")?;
        self.name = name.trim().to_string();
        Ok(())
    }

    pub fn update_description(&mut self, description: &str) -> DomainResult {
        ensure(!is_blank(description), "Description cannot be empty.")?;
        self.description = description.trim().to_string();
        Ok(())
    }

    // 冪等：既に有効なら何もしない
    pub fn activate(&mut self, now: DateTime<Utc>) -> DomainResult {
        self.audit.restore(now);
        Ok(())
    }

    // 冪等：既に無効なら何もしない
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> DomainResult {
        self.audit.mark_deleted(now);
        Ok(())
    }

    pub fn add_book(&mut self, book_id: BookId) -> DomainResult {
        ensure(!book_id.is_nil(), "Book ID cannot be empty.")?;
        ensure(
            !self.book_ids.contains(&book_id),
            "Book is already associated with this genre.",
        )?;
        self.book_ids.push(book_id);
        Ok(())
    }

    pub fn remove_book(&mut self, book_id: BookId) -> DomainResult {
        ensure(
            self.book_ids.contains(&book_id),
            "Book is not associated with this genre.",
        )?;
        self.book_ids.retain(|b| *b != book_id);
        Ok(())
    }
}
