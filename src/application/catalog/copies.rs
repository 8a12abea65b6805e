use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{PersistenceContext, Result};
use crate::application::lookup::require;
use crate::application::result::{OperationResult, boundary};
use crate::application::validation::{FormatRules, RuleViolations};
use crate::domain::catalog::{Book, BookCondition, BookCopy, BookCopyStatus};
use crate::domain::{BookCopyId, BookId, DomainResult, Entity};
use chrono::Utc;

use super::commands::{AddBookCopy, MarkCopyDamaged, SendCopyToMaintenance, WithdrawCopy};

const NOT_FOUND: &str = "Book copy not found.";

/// 書籍に蔵書を追加する
///
/// バーコードは全蔵書の中で一意。追加した蔵書はAvailableで登録される。
pub async fn add_copy(
    deps: &ServiceDependencies,
    book_id: BookId,
    cmd: AddBookCopy,
) -> OperationResult<BookCopy> {
    boundary("add_copy", add(deps, book_id, cmd)).await
}

pub async fn get_copy(deps: &ServiceDependencies, id: BookCopyId) -> OperationResult<BookCopy> {
    boundary("get_copy", async {
        let uow = deps.unit_of_work();
        require(uow.book_copies(), id, NOT_FOUND).await
    })
    .await
}

pub async fn get_copies_of_book(
    deps: &ServiceDependencies,
    book_id: BookId,
) -> OperationResult<Vec<BookCopy>> {
    boundary("get_copies_of_book", async {
        let work = deps.unit_of_work();
        let uow = work.as_ref();
        require::<Book, _>(uow.books(), book_id, "Book not found.").await?;
        uow.book_copies()
            .get_by_book(book_id)
            .await
            .persistence("Error loading copies")
    })
    .await
}

pub async fn mark_copy_lost(deps: &ServiceDependencies, id: BookCopyId) -> OperationResult<BookCopy> {
    boundary(
        "mark_copy_lost",
        change(deps, id, "marked lost", |copy| copy.mark_as_lost()),
    )
    .await
}

pub async fn mark_copy_damaged(
    deps: &ServiceDependencies,
    id: BookCopyId,
    cmd: MarkCopyDamaged,
) -> OperationResult<BookCopy> {
    boundary("mark_copy_damaged", async {
        cmd.check_format()?;
        change(deps, id, "marked damaged", |copy| {
            copy.mark_as_damaged(cmd.condition, &cmd.notes)
        })
        .await
    })
    .await
}

pub async fn send_copy_to_maintenance(
    deps: &ServiceDependencies,
    id: BookCopyId,
    cmd: SendCopyToMaintenance,
) -> OperationResult<BookCopy> {
    boundary("send_copy_to_maintenance", async {
        cmd.check_format()?;
        change(deps, id, "sent to maintenance", |copy| {
            copy.send_to_maintenance(&cmd.notes)
        })
        .await
    })
    .await
}

/// 修理・破損・紛失の蔵書を書架に戻す
pub async fn restore_copy(
    deps: &ServiceDependencies,
    id: BookCopyId,
    condition: BookCondition,
) -> OperationResult<BookCopy> {
    boundary(
        "restore_copy",
        change(deps, id, "restored to shelf", |copy| {
            copy.restore_to_shelf(condition)
        }),
    )
    .await
}

/// 蔵書を除籍する。貸出中は不可で、除籍後は状態を変更できない
pub async fn withdraw_copy(
    deps: &ServiceDependencies,
    id: BookCopyId,
    cmd: WithdrawCopy,
) -> OperationResult<BookCopy> {
    boundary("withdraw_copy", async {
        cmd.check_format()?;
        change(deps, id, "withdrawn", |copy| copy.withdraw(&cmd.reason)).await
    })
    .await
}

async fn add(deps: &ServiceDependencies, book_id: BookId, cmd: AddBookCopy) -> Result<BookCopy> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    cmd.check_format()?;

    let mut book: Book = require(uow.books(), book_id, "Book not found.").await?;

    let mut rules = RuleViolations::new();
    let same_barcode = uow
        .book_copies()
        .get_by_barcode(cmd.barcode.trim())
        .await
        .persistence("Error loading copies")?;
    rules.check(
        same_barcode.is_none(),
        "A copy with this barcode already exists.",
    );
    rules.into_result()?;

    let now = Utc::now();
    let copy = BookCopy::create(
        book_id,
        &cmd.barcode,
        &cmd.location,
        BookCopyStatus::Available,
        cmd.condition.unwrap_or(BookCondition::Good),
        cmd.notes,
        now,
    )?;
    book.add_copy(copy.id())?;
    book.audit_mut().touch(now);

    uow.book_copies()
        .add(copy.clone())
        .await
        .persistence("Error saving copy")?;
    uow.books()
        .update(book)
        .await
        .persistence("Error saving copy")?;
    uow.save_changes().await.persistence("Error saving copy")?;

    tracing::info!(copy_id = %copy.id(), %book_id, barcode = copy.barcode(), "Copy added");
    Ok(copy)
}

/// 蔵書を読み込み、状態遷移を適用して保存する
async fn change(
    deps: &ServiceDependencies,
    id: BookCopyId,
    action: &str,
    transition: impl FnOnce(&mut BookCopy) -> DomainResult,
) -> Result<BookCopy> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut copy: BookCopy = require(uow.book_copies(), id, NOT_FOUND).await?;

    transition(&mut copy)?;
    copy.audit_mut().touch(Utc::now());

    uow.book_copies()
        .update(copy.clone())
        .await
        .persistence("Error updating copy")?;
    uow.save_changes().await.persistence("Error updating copy")?;

    tracing::info!(copy_id = %id, status = ?copy.status(), "Copy {action}");
    Ok(copy)
}
