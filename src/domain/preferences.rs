use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::audit::{AuditInfo, impl_entity};
use super::errors::{DomainResult, Violations, ensure};
use super::value_objects::{AuthorId, EntityId, GenreId, MemberId, PreferencesId};

/// お気に入りの上限
pub const MAX_FAVORITES: usize = 20;
/// 年間読書目標の上限
pub const MAX_BOOKS_PER_YEAR: u32 = 500;

/// 年間読書目標
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingGoal {
    books_per_year: u32,
    year: i32,
    current_progress: u32,
    start_date: NaiveDate,
}

impl ReadingGoal {
    fn new(books_per_year: u32, year: i32) -> Self {
        Self {
            books_per_year,
            year,
            current_progress: 0,
            start_date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default(),
        }
    }

    pub fn books_per_year(&self) -> u32 {
        self.books_per_year
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn current_progress(&self) -> u32 {
        self.current_progress
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn progress_percentage(&self) -> f64 {
        f64::from(self.current_progress) / f64::from(self.books_per_year) * 100.0
    }

    pub fn is_completed(&self) -> bool {
        self.current_progress >= self.books_per_year
    }

    pub fn remaining_books(&self) -> u32 {
        self.books_per_year.saturating_sub(self.current_progress)
    }

    pub fn record_book_read(&mut self) {
        self.current_progress += 1;
    }
}

/// 会員ごとの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    id: PreferencesId,
    member_id: MemberId,
    favorite_genre_ids: Vec<GenreId>,
    favorite_author_ids: Vec<AuthorId>,
    email_notifications: bool,
    sms_notifications: bool,
    push_notifications: bool,
    loan_reminders: bool,
    recommendation_alerts: bool,
    reservation_notifications: bool,
    preferred_language: String,
    reading_goal: Option<ReadingGoal>,
    audit: AuditInfo,
}

impl_entity!(UserPreferences, PreferencesId);

impl UserPreferences {
    pub fn create(member_id: MemberId, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut v = Violations::new();
        v.require(!member_id.is_nil(), "Member ID cannot be empty.");

        v.finish(|| UserPreferences {
            id: PreferencesId::new(),
            member_id,
            favorite_genre_ids: Vec::new(),
            favorite_author_ids: Vec::new(),
            email_notifications: true,
            sms_notifications: false,
            push_notifications: true,
            loan_reminders: true,
            recommendation_alerts: true,
            reservation_notifications: true,
            preferred_language: "English".to_string(),
            reading_goal: None,
            audit: AuditInfo::new(now),
        })
    }

    pub fn id(&self) -> PreferencesId {
        self.id
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn favorite_genre_ids(&self) -> &[GenreId] {
        &self.favorite_genre_ids
    }

    pub fn favorite_author_ids(&self) -> &[AuthorId] {
        &self.favorite_author_ids
    }

    pub fn email_notifications(&self) -> bool {
        self.email_notifications
    }

    pub fn sms_notifications(&self) -> bool {
        self.sms_notifications
    }

    pub fn push_notifications(&self) -> bool {
        self.push_notifications
    }

    pub fn loan_reminders(&self) -> bool {
        self.loan_reminders
    }

    pub fn recommendation_alerts(&self) -> bool {
        self.recommendation_alerts
    }

    pub fn reservation_notifications(&self) -> bool {
        self.reservation_notifications
    }

    pub fn preferred_language(&self) -> &str {
        &self.preferred_language
    }

    pub fn reading_goal(&self) -> Option<&ReadingGoal> {
        self.reading_goal.as_ref()
    }

    pub fn add_favorite_genre(&mut self, genre_id: GenreId) -> DomainResult {
        ensure(!genre_id.is_nil(), "Genre ID cannot be empty.")?;
        ensure(
            !self.favorite_genre_ids.contains(&genre_id),
            "Genre is already in favorites.",
        )?;
        ensure(
            self.favorite_genre_ids.len() < MAX_FAVORITES,
            "Maximum number of favorite genres reached.",
        )?;
        self.favorite_genre_ids.push(genre_id);
        Ok(())
    }

    pub fn remove_favorite_genre(&mut self, genre_id: GenreId) -> DomainResult {
        ensure(
            self.favorite_genre_ids.contains(&genre_id),
            "Genre not found in favorites.",
        )?;
        self.favorite_genre_ids.retain(|g| *g != genre_id);
        Ok(())
    }

    pub fn add_favorite_author(&mut self, author_id: AuthorId) -> DomainResult {
        ensure(!author_id.is_nil(), "Author ID cannot be empty.")?;
        ensure(
            !self.favorite_author_ids.contains(&author_id),
            "Author is already in favorites.",
        )?;
        ensure(
            self.favorite_author_ids.len() < MAX_FAVORITES,
            "Maximum number of favorite authors reached.",
        )?;
        self.favorite_author_ids.push(author_id);
        Ok(())
    }

    pub fn remove_favorite_author(&mut self, author_id: AuthorId) -> DomainResult {
        ensure(
            self.favorite_author_ids.contains(&author_id),
            "Author not found in favorites.",
        )?;
        self.favorite_author_ids.retain(|a| *a != author_id);
        Ok(())
    }

    pub fn update_notification_settings(&mut self, email: bool, sms: bool, push: bool) -> DomainResult {
        self.email_notifications = email;
        self.sms_notifications = sms;
        self.push_notifications = push;
        Ok(())
    }

    pub fn set_reading_goal(&mut self, books_per_year: u32, now: DateTime<Utc>) -> DomainResult {
        ensure(
            books_per_year > 0,
            "Reading goal must be greater than zero books per year.",
        )?;
        ensure(
            books_per_year <= MAX_BOOKS_PER_YEAR,
            "Reading goal too high. Please set a realistic goal.",
        )?;
        self.reading_goal = Some(ReadingGoal::new(books_per_year, now.year()));
        Ok(())
    }
}
