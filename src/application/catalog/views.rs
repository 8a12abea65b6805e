use crate::domain::catalog::{Author, Book, BookCopy, BookCopyStatus, Genre};
use crate::domain::{AuthorId, BookId, GenreId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSummary {
    pub id: AuthorId,
    pub full_name: String,
}

impl From<&Author> for AuthorSummary {
    fn from(author: &Author) -> Self {
        Self {
            id: author.id(),
            full_name: author.full_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreSummary {
    pub id: GenreId,
    pub name: String,
}

impl From<&Genre> for GenreSummary {
    fn from(genre: &Genre) -> Self {
        Self {
            id: genre.id(),
            name: genre.name().to_string(),
        }
    }
}

/// 書籍の表示用ビュー
///
/// 著者名・ジャンル名・蔵書数を含む。
/// 参照先が削除済みの場合、authorはNone、genresからは除かれる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookView {
    pub id: BookId,
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub author: Option<AuthorSummary>,
    pub genres: Vec<GenreSummary>,
    pub total_copies: usize,
    pub available_copies: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BookView {
    pub fn build(
        book: &Book,
        author: Option<&Author>,
        genres: &[Genre],
        copies: &[BookCopy],
    ) -> Self {
        Self {
            id: book.id(),
            title: book.title().to_string(),
            isbn: book.isbn().to_string(),
            publication_year: book.publication_year(),
            publisher: book.publisher().map(str::to_string),
            description: book.description().map(str::to_string),
            author: author.map(AuthorSummary::from),
            genres: book
                .genre_ids()
                .iter()
                .filter_map(|id| genres.iter().find(|g| g.id() == *id))
                .map(GenreSummary::from)
                .collect(),
            total_copies: copies
                .iter()
                .filter(|c| c.status() != BookCopyStatus::Withdrawn)
                .count(),
            available_copies: copies.iter().filter(|c| c.is_available()).count(),
            created_at: book.audit().created_at(),
            updated_at: book.audit().updated_at(),
        }
    }
}
