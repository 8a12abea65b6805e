use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{PersistenceContext, Result};
use crate::application::result::{OperationResult, boundary};
use crate::domain::Entity;
use crate::domain::lending::LoanStatus;
use crate::domain::notification::{Notification, NotificationPriority, NotificationType};
use chrono::{DateTime, Utc};

/// 延滞検出バッチ
///
/// 定期的に実行され、返却期限を過ぎた貸出をOverdueにして会員に通知する。
///
/// ビジネスルール：
/// - 返却期限を過ぎたActive状態の貸出を延滞とする
/// - 既にOverdue状態の貸出は処理しない（重複通知の防止）
/// - 返却済みの貸出は処理しない
///
/// # 戻り値
/// 延滞として検出した貸出の件数
pub async fn detect_overdue_loans(
    deps: &ServiceDependencies,
    now: DateTime<Utc>,
) -> OperationResult<usize> {
    boundary("detect_overdue_loans", detect(deps, now)).await
}

async fn detect(deps: &ServiceDependencies, now: DateTime<Utc>) -> Result<usize> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();

    // 1. 延滞候補を取得
    let candidates = uow
        .loans()
        .get_overdue(now)
        .await
        .persistence("Error loading loans")?;

    // 2. Active状態のものだけを延滞にする
    let mut detected_count = 0;
    for mut loan in candidates
        .into_iter()
        .filter(|l| l.status() == LoanStatus::Active)
    {
        loan.mark_overdue(now)?;
        loan.audit_mut().touch(now);

        let notification = Notification::create(
            loan.member_id(),
            "Loan overdue",
            &format!(
                "Your loan was due on {}. Please return the book as soon as possible.",
                loan.due_date().format("%Y-%m-%d")
            ),
            NotificationType::LoanOverdue,
            now,
        )?
        .with_priority(NotificationPriority::High);

        uow.notifications()
            .add(notification)
            .await
            .persistence("Error saving overdue loans")?;
        uow.loans()
            .update(loan)
            .await
            .persistence("Error saving overdue loans")?;
        detected_count += 1;
    }

    // 3. まとめて保存
    if detected_count > 0 {
        uow.save_changes()
            .await
            .persistence("Error saving overdue loans")?;
    }

    tracing::info!(detected_count, "Overdue detection finished");
    Ok(detected_count)
}
