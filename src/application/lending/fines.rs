use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{PersistenceContext, Result};
use crate::application::lookup::require;
use crate::application::result::{OperationResult, boundary};
use crate::application::validation::FormatRules;
use crate::domain::lending::Fine;
use crate::domain::users::Member;
use crate::domain::{Entity, FineId, MemberId, Money};
use crate::ports::UnitOfWork;
use chrono::{DateTime, Utc};

use super::commands::{PayFine, WaiveFine};
use super::loans::MEMBER_NOT_FOUND;

const NOT_FOUND: &str = "Fine not found.";

pub async fn get_fine(deps: &ServiceDependencies, id: FineId) -> OperationResult<Fine> {
    boundary("get_fine", async {
        let uow = deps.unit_of_work();
        require(uow.fines(), id, NOT_FOUND).await
    })
    .await
}

pub async fn get_fines_by_member(
    deps: &ServiceDependencies,
    member_id: MemberId,
) -> OperationResult<Vec<Fine>> {
    boundary("get_fines_by_member", async {
        let work = deps.unit_of_work();
        let uow = work.as_ref();
        require::<Member, _>(uow.members(), member_id, MEMBER_NOT_FOUND).await?;
        uow.fines()
            .get_by_member(member_id)
            .await
            .persistence("Error loading fines")
    })
    .await
}

/// 罰金の支払い
///
/// 金額を省略すると残額を一括で支払う。支払った分だけ会員の罰金残高を減らす。
///
/// # エラー
/// 支払済みの罰金、または残額を超える金額の場合はドメインエラー
pub async fn pay_fine(
    deps: &ServiceDependencies,
    id: FineId,
    cmd: PayFine,
    now: DateTime<Utc>,
) -> OperationResult<Fine> {
    boundary("pay_fine", async {
        cmd.check_format()?;
        pay(deps, id, cmd, now).await
    })
    .await
}

/// 罰金の免除。残額分だけ会員の罰金残高を減らす
pub async fn waive_fine(
    deps: &ServiceDependencies,
    id: FineId,
    cmd: WaiveFine,
    now: DateTime<Utc>,
) -> OperationResult<Fine> {
    boundary("waive_fine", async {
        cmd.check_format()?;
        waive(deps, id, cmd, now).await
    })
    .await
}

async fn pay(
    deps: &ServiceDependencies,
    id: FineId,
    cmd: PayFine,
    now: DateTime<Utc>,
) -> Result<Fine> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut fine: Fine = require(uow.fines(), id, NOT_FOUND).await?;
    let mut member: Member = require(uow.members(), fine.member_id(), MEMBER_NOT_FOUND).await?;

    let paid = match cmd.amount_cents {
        Some(cents) => {
            let amount = Money::from_cents(cents);
            fine.partial_payment(amount, cmd.method, cmd.reference, now)?;
            amount
        }
        // 分割払い済みなら残額を分割払いとして完済する
        None if fine.paid_amount().is_positive() => {
            let remaining = fine.remaining_amount();
            fine.partial_payment(remaining, cmd.method, cmd.reference, now)?;
            remaining
        }
        None => {
            let remaining = fine.remaining_amount();
            fine.mark_as_paid(cmd.method, cmd.reference, now)?;
            remaining
        }
    };
    settle(uow, fine, &mut member, paid, now).await
}

async fn waive(
    deps: &ServiceDependencies,
    id: FineId,
    cmd: WaiveFine,
    now: DateTime<Utc>,
) -> Result<Fine> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut fine: Fine = require(uow.fines(), id, NOT_FOUND).await?;
    let mut member: Member = require(uow.members(), fine.member_id(), MEMBER_NOT_FOUND).await?;

    let remaining = fine.remaining_amount();
    fine.waive(&cmd.reason, now)?;
    settle(uow, fine, &mut member, remaining, now).await
}

/// 会員の罰金残高に反映して保存する
///
/// 罰金が完済・免除されたら、残高の有無にかかわらず会員から罰金IDを外す。
async fn settle(
    uow: &dyn UnitOfWork,
    mut fine: Fine,
    member: &mut Member,
    amount: Money,
    now: DateTime<Utc>,
) -> Result<Fine> {
    // 会員に紐づいていない罰金（残高に計上されていないもの）は会員側を変更しない
    if member.fine_ids().contains(&fine.id()) {
        let applied = amount.min(member.outstanding_fines());
        if applied.is_positive() {
            member.pay_fine(fine.id(), applied)?;
        }
        if fine.is_paid() {
            member.close_fine(fine.id())?;
        }
        member.audit_mut().touch(now);
        uow.members()
            .update(member.clone())
            .await
            .persistence("Error saving fine")?;
    }

    fine.audit_mut().touch(now);
    uow.fines()
        .update(fine.clone())
        .await
        .persistence("Error saving fine")?;
    uow.save_changes().await.persistence("Error saving fine")?;

    tracing::info!(
        fine_id = %fine.id(),
        member_id = %fine.member_id(),
        amount = %amount,
        remaining = %fine.remaining_amount(),
        is_paid = fine.is_paid(),
        "Fine settled"
    );
    Ok(fine)
}
