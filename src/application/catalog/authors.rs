use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{PersistenceContext, Result};
use crate::application::lookup::require;
use crate::application::result::{OperationResult, boundary};
use crate::application::validation::{FormatRules, RuleViolations};
use crate::domain::catalog::{Author, AuthorDraft};
use crate::domain::{AuthorId, Entity};
use chrono::Utc;

use super::books::build_views;
use super::commands::{CreateAuthor, UpdateAuthor};
use super::views::BookView;

const NOT_FOUND: &str = "Author not found.";

pub async fn get_author(deps: &ServiceDependencies, id: AuthorId) -> OperationResult<Author> {
    boundary("get_author", async {
        let uow = deps.unit_of_work();
        require(uow.authors(), id, NOT_FOUND).await
    })
    .await
}

pub async fn get_all_authors(deps: &ServiceDependencies) -> OperationResult<Vec<Author>> {
    boundary("get_all_authors", async {
        deps.unit_of_work()
            .authors()
            .get_all()
            .await
            .persistence("Error loading authors")
    })
    .await
}

/// 著者を登録する
///
/// 姓名の組み合わせが同じ著者は登録できない。
pub async fn create_author(
    deps: &ServiceDependencies,
    cmd: CreateAuthor,
) -> OperationResult<Author> {
    boundary("create_author", create(deps, cmd)).await
}

pub async fn update_author(
    deps: &ServiceDependencies,
    id: AuthorId,
    cmd: UpdateAuthor,
) -> OperationResult<Author> {
    boundary("update_author", update(deps, id, cmd)).await
}

/// 著者を論理削除する。書籍がある間は削除できない
pub async fn delete_author(deps: &ServiceDependencies, id: AuthorId) -> OperationResult<()> {
    boundary("delete_author", delete(deps, id)).await
}

pub async fn get_books_by_author(
    deps: &ServiceDependencies,
    id: AuthorId,
) -> OperationResult<Vec<BookView>> {
    boundary("get_books_by_author", books_of(deps, id)).await
}

async fn create(deps: &ServiceDependencies, cmd: CreateAuthor) -> Result<Author> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    cmd.check_format()?;

    let mut rules = RuleViolations::new();
    let same_name = uow
        .authors()
        .get_by_name(&cmd.first_name, &cmd.last_name)
        .await
        .persistence("Error loading authors")?;
    rules.check(same_name.is_none(), "An author with this name already exists.");
    rules.into_result()?;

    let author = Author::create(
        AuthorDraft {
            first_name: cmd.first_name,
            last_name: cmd.last_name,
            biography: cmd.biography,
            birth_date: cmd.birth_date,
            death_date: cmd.death_date,
            nationality: cmd.nationality,
        },
        Utc::now(),
    )?;

    uow.authors()
        .add(author.clone())
        .await
        .persistence("Error saving author")?;
    uow.save_changes().await.persistence("Error saving author")?;

    tracing::info!(author_id = %author.id(), name = %author.full_name(), "Author created");
    Ok(author)
}

async fn update(deps: &ServiceDependencies, id: AuthorId, cmd: UpdateAuthor) -> Result<Author> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    cmd.check_format()?;

    let mut author: Author = require(uow.authors(), id, NOT_FOUND).await?;

    let mut rules = RuleViolations::new();
    let same_name = uow
        .authors()
        .get_by_name(&cmd.first_name, &cmd.last_name)
        .await
        .persistence("Error loading authors")?;
    rules.check(
        same_name.is_none_or(|other| other.id() == id),
        "Another author with this name already exists.",
    );
    rules.into_result()?;

    let now = Utc::now();
    author.rename(&cmd.first_name, &cmd.last_name)?;
    if let Some(biography) = &cmd.biography {
        author.update_biography(biography)?;
    }
    author.update_nationality(cmd.nationality)?;
    // 没年月日を外してから生年月日を設定し、前後関係を新しい値で検査する
    author.set_death_date(None)?;
    if let Some(birth_date) = cmd.birth_date {
        author.set_birth_date(birth_date, now.date_naive())?;
    }
    author.set_death_date(cmd.death_date)?;
    author.audit_mut().touch(now);

    uow.authors()
        .update(author.clone())
        .await
        .persistence("Error updating author")?;
    uow.save_changes().await.persistence("Error updating author")?;

    tracing::info!(author_id = %id, "Author updated");
    Ok(author)
}

async fn delete(deps: &ServiceDependencies, id: AuthorId) -> Result<()> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut author: Author = require(uow.authors(), id, NOT_FOUND).await?;

    let mut rules = RuleViolations::new();
    let books = uow
        .books()
        .get_by_author(id)
        .await
        .persistence("Error loading books")?;
    rules.check(
        books.is_empty(),
        "This author cannot be deleted because they have books in the library.",
    );
    rules.into_result()?;

    author.deactivate(Utc::now())?;
    uow.authors()
        .update(author)
        .await
        .persistence("Error deleting author")?;
    uow.save_changes().await.persistence("Error deleting author")?;

    tracing::info!(author_id = %id, "Author deleted");
    Ok(())
}

async fn books_of(deps: &ServiceDependencies, id: AuthorId) -> Result<Vec<BookView>> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    require::<Author, _>(uow.authors(), id, NOT_FOUND).await?;

    let books = uow
        .books()
        .get_by_author(id)
        .await
        .persistence("Error loading books")?;
    build_views(uow, books).await
}
