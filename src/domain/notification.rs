use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::{AuditInfo, impl_entity};
use super::errors::{DomainResult, Violations, ensure, is_blank};
use super::value_objects::{EntityId, NotificationId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    LoanReminder,
    LoanOverdue,
    ReservationReady,
    ReservationExpiring,
    RecommendationAlert,
    SystemNotification,
    FineNotification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    Urgent,
}

/// 利用者への通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    id: NotificationId,
    user_id: UserId,
    title: String,
    message: String,
    notification_type: NotificationType,
    priority: NotificationPriority,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    scheduled_for: Option<DateTime<Utc>>,
    is_sent: bool,
    sent_at: Option<DateTime<Utc>>,
    channel: String,
    audit: AuditInfo,
}

impl_entity!(Notification, NotificationId);

impl Notification {
    pub fn create(
        user_id: UserId,
        title: &str,
        message: &str,
        notification_type: NotificationType,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut v = Violations::new();
        v.require(!user_id.is_nil(), "User ID cannot be empty.");
        v.require(!is_blank(title), "Title cannot be empty.");
        v.require(!is_blank(message), "Message cannot be empty.");

        v.finish(|| Notification {
            id: NotificationId::new(),
            user_id,
            title: title.to_string(),
            message: message.to_string(),
            notification_type,
            priority: NotificationPriority::Normal,
            is_read: false,
            read_at: None,
            scheduled_for: None,
            is_sent: false,
            sent_at: None,
            channel: "Default".to_string(),
            audit: AuditInfo::new(now),
        })
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    pub fn priority(&self) -> NotificationPriority {
        self.priority
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }

    pub fn is_sent(&self) -> bool {
        self.is_sent
    }

    pub fn scheduled_for(&self) -> Option<DateTime<Utc>> {
        self.scheduled_for
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn mark_as_read(&mut self, now: DateTime<Utc>) -> DomainResult {
        self.is_read = true;
        self.read_at = Some(now);
        Ok(())
    }

    pub fn mark_as_sent(&mut self, now: DateTime<Utc>) -> DomainResult {
        ensure(!self.is_sent, "Notification has already been sent.")?;
        self.is_sent = true;
        self.sent_at = Some(now);
        Ok(())
    }

    pub fn schedule(&mut self, scheduled_for: DateTime<Utc>, now: DateTime<Utc>) -> DomainResult {
        ensure(
            scheduled_for > now,
            "Scheduled time must be in the future.",
        )?;
        self.scheduled_for = Some(scheduled_for);
        Ok(())
    }

    pub fn update_message(&mut self, title: &str, message: &str) -> DomainResult {
        ensure(
            !is_blank(title) && !is_blank(message),
            "Title and message cannot be empty.",
        )?;
        self.title = title.to_string();
        self.message = message.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn notification() -> Notification {
        Notification::create(
            UserId::new(),
            "Overdue",
            "Please return your book",
            NotificationType::LoanOverdue,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let n = notification();
        assert_eq!(n.priority(), NotificationPriority::Normal);
        assert_eq!(n.channel(), "Default");
        assert!(!n.is_read());
        assert!(!n.is_sent());
    }

    #[test]
    fn test_sent_only_once() {
        let mut n = notification();
        n.mark_as_sent(Utc::now()).unwrap();
        assert!(n.mark_as_sent(Utc::now()).is_err());
    }

    #[test]
    fn test_schedule_must_be_future() {
        let now = Utc::now();
        let mut n = notification();
        assert!(n.schedule(now, now).is_err());
        n.schedule(now + Duration::hours(1), now).unwrap();
        assert!(n.scheduled_for().is_some());
    }

    #[test]
    fn test_update_message() {
        let mut n = notification().with_priority(NotificationPriority::High);
        assert!(n.update_message("", "x").is_err());
        n.update_message("Reminder", "Due tomorrow").unwrap();
        assert_eq!(n.title(), "Reminder");
        assert_eq!(n.priority(), NotificationPriority::High);
    }

    #[test]
    fn test_mark_as_read() {
        let mut n = notification();
        n.mark_as_read(Utc::now()).unwrap();
        assert!(n.is_read());
    }
}
