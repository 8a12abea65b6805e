use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{ApplicationError, PersistenceContext, Result};
use crate::application::lookup::require;
use crate::application::result::{OperationResult, boundary};
use crate::application::validation::{FormatRules, RuleViolations};
use crate::domain::users::{Member, MembershipState, UserProfile};
use crate::domain::{DomainResult, Entity, MemberId};
use chrono::{DateTime, Months, Utc};

use super::commands::{ExtendMembership, RegisterMember, UpgradeMembership};

const NOT_FOUND: &str = "Member not found.";

/// 会員登録
///
/// ビジネスルール：
/// - メールアドレスは会員の中で一意（大文字小文字を区別しない）
/// - 有効期限は登録日時から指定の月数後
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `cmd` - 氏名・連絡先・会員種別・有効期間
/// * `now` - 登録日時
pub async fn register_member(
    deps: &ServiceDependencies,
    cmd: RegisterMember,
    now: DateTime<Utc>,
) -> OperationResult<Member> {
    boundary("register_member", register(deps, cmd, now)).await
}

pub async fn get_member(deps: &ServiceDependencies, id: MemberId) -> OperationResult<Member> {
    boundary("get_member", async {
        let uow = deps.unit_of_work();
        require(uow.members(), id, NOT_FOUND).await
    })
    .await
}

pub async fn get_member_by_email(
    deps: &ServiceDependencies,
    email: &str,
) -> OperationResult<Member> {
    boundary("get_member_by_email", async {
        deps.unit_of_work()
            .members()
            .get_by_email(email)
            .await
            .persistence("Error loading member")?
            .ok_or_else(|| ApplicationError::not_found(NOT_FOUND))
    })
    .await
}

pub async fn get_all_members(deps: &ServiceDependencies) -> OperationResult<Vec<Member>> {
    boundary("get_all_members", async {
        deps.unit_of_work()
            .members()
            .get_all()
            .await
            .persistence("Error loading members")
    })
    .await
}

pub async fn suspend_member(
    deps: &ServiceDependencies,
    id: MemberId,
    now: DateTime<Utc>,
) -> OperationResult<Member> {
    boundary(
        "suspend_member",
        change(deps, id, now, "suspended", Member::suspend),
    )
    .await
}

/// 停止中の会員を有効に戻す。失効した会員は先に延長が必要
pub async fn reactivate_member(
    deps: &ServiceDependencies,
    id: MemberId,
    now: DateTime<Utc>,
) -> OperationResult<Member> {
    boundary(
        "reactivate_member",
        change(deps, id, now, "reactivated", Member::reactivate),
    )
    .await
}

/// 会員資格の延長
///
/// 現在の有効期限（既に切れていれば現在日時）から指定の月数だけ延ばす。
/// 失効中の会員は有効に戻る。
pub async fn extend_membership(
    deps: &ServiceDependencies,
    id: MemberId,
    cmd: ExtendMembership,
    now: DateTime<Utc>,
) -> OperationResult<Member> {
    boundary("extend_membership", async {
        cmd.check_format()?;
        let member: Member = require(deps.unit_of_work().members(), id, NOT_FOUND).await?;
        let base = member.membership_expiry().max(now);
        let new_expiry = add_months(base, cmd.months)?;
        change(deps, id, now, "extended", |m| m.extend_membership(new_expiry, now)).await
    })
    .await
}

pub async fn upgrade_membership(
    deps: &ServiceDependencies,
    id: MemberId,
    cmd: UpgradeMembership,
    now: DateTime<Utc>,
) -> OperationResult<Member> {
    boundary("upgrade_membership", async {
        cmd.check_format()?;
        change(deps, id, now, "upgraded", |m| {
            m.upgrade_membership(cmd.membership_type)
        })
        .await
    })
    .await
}

/// 有効期限切れ会員の一括失効
///
/// # 戻り値
/// 失効させた会員の件数
pub async fn expire_memberships(
    deps: &ServiceDependencies,
    now: DateTime<Utc>,
) -> OperationResult<usize> {
    boundary("expire_memberships", expire(deps, now)).await
}

fn add_months(from: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>> {
    from.checked_add_months(Months::new(months))
        .ok_or_else(|| ApplicationError::business("Membership expiry date is out of range."))
}

async fn register(
    deps: &ServiceDependencies,
    cmd: RegisterMember,
    now: DateTime<Utc>,
) -> Result<Member> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    cmd.check_format()?;

    let mut rules = RuleViolations::new();
    let existing = uow
        .members()
        .get_by_email(&cmd.email)
        .await
        .persistence("Error loading member")?;
    rules.check(
        existing.is_none(),
        "A member with this email already exists.",
    );
    rules.into_result()?;

    let profile = UserProfile::create(
        &cmd.first_name,
        &cmd.last_name,
        &cmd.email,
        cmd.phone_number.as_deref(),
    )?;
    let expiry = add_months(now, cmd.membership_months)?;
    let member = Member::create(profile, cmd.membership_type, now, expiry, now)?;

    uow.members()
        .add(member.clone())
        .await
        .persistence("Error saving member")?;
    uow.save_changes().await.persistence("Error saving member")?;

    tracing::info!(
        member_id = %member.id(),
        membership_type = ?member.membership_type(),
        "Member registered"
    );
    Ok(member)
}

/// 会員を読み込み、状態遷移を適用して保存する
async fn change(
    deps: &ServiceDependencies,
    id: MemberId,
    now: DateTime<Utc>,
    action: &str,
    transition: impl FnOnce(&mut Member) -> DomainResult,
) -> Result<Member> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut member: Member = require(uow.members(), id, NOT_FOUND).await?;

    transition(&mut member)?;
    member.audit_mut().touch(now);

    uow.members()
        .update(member.clone())
        .await
        .persistence("Error updating member")?;
    uow.save_changes()
        .await
        .persistence("Error updating member")?;

    tracing::info!(member_id = %id, state = ?member.state(), "Member {action}");
    Ok(member)
}

async fn expire(deps: &ServiceDependencies, now: DateTime<Utc>) -> Result<usize> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let due = uow
        .members()
        .find(&|m: &Member| {
            m.state() != MembershipState::Expired && m.membership_expiry() < now
        })
        .await
        .persistence("Error loading members")?;

    let count = due.len();
    for mut member in due {
        member.mark_expired(now)?;
        member.audit_mut().touch(now);
        uow.members()
            .update(member)
            .await
            .persistence("Error expiring memberships")?;
    }
    if count > 0 {
        uow.save_changes()
            .await
            .persistence("Error expiring memberships")?;
    }

    tracing::info!(expired_count = count, "Membership expiration finished");
    Ok(count)
}
