use crate::application::validation::{FormatRules, not_blank, valid_person_name};
use crate::domain::catalog::{BookCondition, EARLIEST_PUBLICATION_YEAR};
use crate::domain::{AuthorId, EntityId, GenreId};
use chrono::{Datelike, NaiveDate, Utc};
use garde::Validate;
use serde::Deserialize;

/// ジャンル作成
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGenre {
    #[garde(custom(not_blank), length(chars, max = 50), pattern(r"^[a-zA-ZÀ-ÿ\s'-]+$"))]
    pub name: String,
    #[garde(custom(not_blank), length(chars, max = 500))]
    pub description: String,
}

impl FormatRules for CreateGenre {}

/// ジャンル更新
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateGenre {
    #[garde(custom(not_blank), length(chars, max = 50), pattern(r"^[a-zA-ZÀ-ÿ\s'-]+$"))]
    pub name: String,
    #[garde(custom(not_blank), length(chars, max = 500))]
    pub description: String,
}

impl FormatRules for UpdateGenre {}

/// 著者の生没年月日の前後関係
fn check_life_dates(
    birth_date: Option<NaiveDate>,
    death_date: Option<NaiveDate>,
    errors: &mut Vec<String>,
) {
    let today = Utc::now().date_naive();
    if birth_date.is_some_and(|birth| birth > today) {
        errors.push("birth_date: Birth date cannot be in the future.".to_string());
    }
    if let (Some(birth), Some(death)) = (birth_date, death_date) {
        if death < birth {
            errors.push("death_date: Death date cannot be earlier than birth date.".to_string());
        }
    }
}

/// 著者作成
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAuthor {
    #[garde(custom(not_blank), custom(valid_person_name))]
    pub first_name: String,
    #[garde(custom(not_blank), custom(valid_person_name))]
    pub last_name: String,
    #[garde(length(chars, max = 2000))]
    pub biography: Option<String>,
    #[garde(skip)]
    pub birth_date: Option<NaiveDate>,
    #[garde(skip)]
    pub death_date: Option<NaiveDate>,
    #[garde(length(chars, max = 50), pattern(r"^[a-zA-ZÀ-ÿ\s'-]+$"))]
    pub nationality: Option<String>,
}

impl FormatRules for CreateAuthor {
    fn extra_rules(&self, errors: &mut Vec<String>) {
        check_life_dates(self.birth_date, self.death_date, errors);
    }
}

/// 著者更新
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateAuthor {
    #[garde(custom(not_blank), custom(valid_person_name))]
    pub first_name: String,
    #[garde(custom(not_blank), custom(valid_person_name))]
    pub last_name: String,
    #[garde(length(chars, max = 2000))]
    pub biography: Option<String>,
    #[garde(skip)]
    pub birth_date: Option<NaiveDate>,
    #[garde(skip)]
    pub death_date: Option<NaiveDate>,
    #[garde(length(chars, max = 50), pattern(r"^[a-zA-ZÀ-ÿ\s'-]+$"))]
    pub nationality: Option<String>,
}

impl FormatRules for UpdateAuthor {
    fn extra_rules(&self, errors: &mut Vec<String>) {
        check_life_dates(self.birth_date, self.death_date, errors);
    }
}

/// 出版年の上限（現在の年）と著者IDの必須チェック
fn check_book_references(publication_year: i32, author_id: AuthorId, errors: &mut Vec<String>) {
    let current_year = Utc::now().year();
    if publication_year > current_year {
        errors.push(format!(
            "publication_year: Publication year must be between {EARLIEST_PUBLICATION_YEAR} and {current_year}."
        ));
    }
    if author_id.is_nil() {
        errors.push("author_id: Author ID is required.".to_string());
    }
}

/// 書籍作成
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBook {
    #[garde(custom(not_blank), length(chars, max = 200))]
    pub title: String,
    #[garde(pattern(r"^\d{10}(\d{3})?$"))]
    pub isbn: String,
    #[garde(range(min = EARLIEST_PUBLICATION_YEAR))]
    pub publication_year: i32,
    #[garde(skip)]
    pub author_id: AuthorId,
    #[garde(length(min = 1))]
    pub genre_ids: Vec<GenreId>,
    #[garde(length(chars, max = 100))]
    pub publisher: Option<String>,
    #[garde(length(chars, max = 500))]
    pub description: Option<String>,
}

impl FormatRules for CreateBook {
    fn extra_rules(&self, errors: &mut Vec<String>) {
        check_book_references(self.publication_year, self.author_id, errors);
    }
}

/// 書籍更新
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateBook {
    #[garde(custom(not_blank), length(chars, max = 200))]
    pub title: String,
    #[garde(pattern(r"^\d{10}(\d{3})?$"))]
    pub isbn: String,
    #[garde(range(min = EARLIEST_PUBLICATION_YEAR))]
    pub publication_year: i32,
    #[garde(skip)]
    pub author_id: AuthorId,
    #[garde(length(min = 1))]
    pub genre_ids: Vec<GenreId>,
    #[garde(length(chars, max = 100))]
    pub publisher: Option<String>,
    #[garde(length(chars, max = 500))]
    pub description: Option<String>,
}

impl FormatRules for UpdateBook {
    fn extra_rules(&self, errors: &mut Vec<String>) {
        check_book_references(self.publication_year, self.author_id, errors);
    }
}

/// 蔵書の追加
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddBookCopy {
    #[garde(custom(not_blank), length(chars, max = 50))]
    pub barcode: String,
    #[garde(custom(not_blank), length(chars, max = 100))]
    pub location: String,
    /// 省略時はGood
    #[garde(skip)]
    pub condition: Option<BookCondition>,
    #[garde(length(chars, max = 500))]
    pub notes: Option<String>,
}

impl FormatRules for AddBookCopy {}

/// 破損の記録
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MarkCopyDamaged {
    #[garde(skip)]
    pub condition: BookCondition,
    #[garde(custom(not_blank), length(chars, max = 500))]
    pub notes: String,
}

impl FormatRules for MarkCopyDamaged {}

/// 修理への送付
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendCopyToMaintenance {
    #[garde(custom(not_blank), length(chars, max = 500))]
    pub notes: String,
}

impl FormatRules for SendCopyToMaintenance {}

/// 除籍
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WithdrawCopy {
    #[garde(custom(not_blank), length(chars, max = 500))]
    pub reason: String,
}

impl FormatRules for WithdrawCopy {}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> CreateBook {
        CreateBook {
            title: "Dune".into(),
            isbn: "9780441172719".into(),
            publication_year: 1965,
            author_id: AuthorId::new(),
            genre_ids: vec![GenreId::new()],
            publisher: None,
            description: None,
        }
    }

    #[test]
    fn test_valid_book_passes() {
        assert!(book().check_format().is_ok());
    }

    #[test]
    fn test_book_format_errors_are_collected() {
        let cmd = CreateBook {
            title: " ".into(),
            isbn: "12345".into(),
            publication_year: 1200,
            genre_ids: vec![],
            ..book()
        };

        let messages = cmd.check_format().unwrap_err().messages();
        assert_eq!(messages.len(), 4);
        for field in ["title", "isbn", "publication_year", "genre_ids"] {
            assert!(messages.iter().any(|m| m.starts_with(field)), "{field}");
        }
    }

    #[test]
    fn test_future_publication_year_and_nil_author() {
        let cmd = CreateBook {
            publication_year: Utc::now().year() + 1,
            author_id: AuthorId::from(uuid::Uuid::nil()),
            ..book()
        };

        let messages = cmd.check_format().unwrap_err().messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].contains("Author ID is required."));
    }

    #[test]
    fn test_isbn_accepts_ten_digits() {
        let cmd = CreateBook {
            isbn: "0441172717".into(),
            ..book()
        };
        assert!(cmd.check_format().is_ok());
    }

    #[test]
    fn test_author_dates() {
        let cmd = CreateAuthor {
            first_name: "Frank".into(),
            last_name: "Herbert".into(),
            biography: None,
            birth_date: NaiveDate::from_ymd_opt(1986, 2, 11),
            death_date: NaiveDate::from_ymd_opt(1920, 10, 8),
            nationality: Some("American".into()),
        };

        let messages = cmd.check_format().unwrap_err().messages();
        assert_eq!(
            messages,
            ["death_date: Death date cannot be earlier than birth date."]
        );
    }

    #[test]
    fn test_author_name_pattern() {
        let cmd = CreateAuthor {
            first_name: "Fr4nk".into(),
            last_name: "".into(),
            biography: None,
            birth_date: None,
            death_date: None,
            nationality: None,
        };

        let messages = cmd.check_format().unwrap_err().messages();
        assert!(messages.iter().any(|m| m.starts_with("first_name")));
        assert!(messages.iter().any(|m| m.starts_with("last_name")));
    }

    #[test]
    fn test_genre_name_rejects_digits() {
        let cmd = CreateGenre {
            name: "Sci-Fi 2".into(),
            description: "desc".into(),
        };
        assert!(cmd.check_format().is_err());
    }
}
