use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{PersistenceContext, Result};
use crate::application::lookup::require;
use crate::application::result::{OperationResult, boundary};
use crate::domain::notification::Notification;
use crate::domain::{Entity, NotificationId, UserId};
use chrono::{DateTime, Utc};

/// 利用者宛ての通知（新しい順）
pub async fn get_notifications(
    deps: &ServiceDependencies,
    user_id: UserId,
) -> OperationResult<Vec<Notification>> {
    boundary("get_notifications", async {
        let mut notifications = deps
            .unit_of_work()
            .notifications()
            .get_by_user(user_id)
            .await
            .persistence("Error loading notifications")?;
        notifications.sort_by_key(|n| std::cmp::Reverse(n.audit().created_at()));
        Ok(notifications)
    })
    .await
}

pub async fn get_unread_notifications(
    deps: &ServiceDependencies,
    user_id: UserId,
) -> OperationResult<Vec<Notification>> {
    boundary("get_unread_notifications", async {
        deps.unit_of_work()
            .notifications()
            .get_unread(user_id)
            .await
            .persistence("Error loading notifications")
    })
    .await
}

pub async fn mark_notification_read(
    deps: &ServiceDependencies,
    id: NotificationId,
    now: DateTime<Utc>,
) -> OperationResult<Notification> {
    boundary("mark_notification_read", mark_read(deps, id, now)).await
}

async fn mark_read(
    deps: &ServiceDependencies,
    id: NotificationId,
    now: DateTime<Utc>,
) -> Result<Notification> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut notification: Notification =
        require(uow.notifications(), id, "Notification not found.").await?;

    notification.mark_as_read(now)?;
    notification.audit_mut().touch(now);

    uow.notifications()
        .update(notification.clone())
        .await
        .persistence("Error updating notification")?;
    uow.save_changes()
        .await
        .persistence("Error updating notification")?;
    Ok(notification)
}
