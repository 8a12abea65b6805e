use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{PersistenceContext, Result};
use crate::application::lookup::require;
use crate::application::result::{OperationResult, boundary};
use crate::application::validation::{FormatRules, RuleViolations};
use crate::domain::catalog::Genre;
use crate::domain::{Entity, GenreId};
use chrono::Utc;

use super::books::build_views;
use super::commands::{CreateGenre, UpdateGenre};
use super::views::BookView;

const NOT_FOUND: &str = "Genre not found.";

pub async fn get_genre(deps: &ServiceDependencies, id: GenreId) -> OperationResult<Genre> {
    boundary("get_genre", async {
        let uow = deps.unit_of_work();
        require(uow.genres(), id, NOT_FOUND).await
    })
    .await
}

pub async fn get_all_genres(deps: &ServiceDependencies) -> OperationResult<Vec<Genre>> {
    boundary("get_all_genres", async {
        deps.unit_of_work()
            .genres()
            .get_all()
            .await
            .persistence("Error loading genres")
    })
    .await
}

/// ジャンルを作成する
///
/// 同名（大文字小文字を区別しない）のジャンルが既にあれば失敗する。
pub async fn create_genre(deps: &ServiceDependencies, cmd: CreateGenre) -> OperationResult<Genre> {
    boundary("create_genre", create(deps, cmd)).await
}

pub async fn update_genre(
    deps: &ServiceDependencies,
    id: GenreId,
    cmd: UpdateGenre,
) -> OperationResult<Genre> {
    boundary("update_genre", update(deps, id, cmd)).await
}

/// ジャンルを論理削除する。書籍が紐づいている間は削除できない
pub async fn delete_genre(deps: &ServiceDependencies, id: GenreId) -> OperationResult<()> {
    boundary("delete_genre", delete(deps, id)).await
}

pub async fn get_books_by_genre(
    deps: &ServiceDependencies,
    id: GenreId,
) -> OperationResult<Vec<BookView>> {
    boundary("get_books_by_genre", books_of(deps, id)).await
}

async fn create(deps: &ServiceDependencies, cmd: CreateGenre) -> Result<Genre> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();

    // 1. 形式の検証
    cmd.check_format()?;

    // 2. 業務規則の検証
    let mut rules = RuleViolations::new();
    let same_name = uow
        .genres()
        .get_by_name(&cmd.name)
        .await
        .persistence("Error loading genres")?;
    rules.check(same_name.is_none(), "A genre with this name already exists.");
    rules.into_result()?;

    // 3. 生成と保存
    let genre = Genre::create(&cmd.name, &cmd.description, Utc::now())?;
    uow.genres()
        .add(genre.clone())
        .await
        .persistence("Error saving genre")?;
    uow.save_changes().await.persistence("Error saving genre")?;

    tracing::info!(genre_id = %genre.id(), name = genre.name(), "Genre created");
    Ok(genre)
}

async fn update(deps: &ServiceDependencies, id: GenreId, cmd: UpdateGenre) -> Result<Genre> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    cmd.check_format()?;

    let mut genre: Genre = require(uow.genres(), id, NOT_FOUND).await?;

    let mut rules = RuleViolations::new();
    if !genre.name().eq_ignore_ascii_case(cmd.name.trim()) {
        let same_name = uow
            .genres()
            .get_by_name(&cmd.name)
            .await
            .persistence("Error loading genres")?;
        rules.check(
            same_name.is_none_or(|other| other.id() == id),
            "Another genre with this name already exists.",
        );
    }
    rules.into_result()?;

    genre.update_name(&cmd.name)?;
    genre.update_description(&cmd.description)?;
    genre.audit_mut().touch(Utc::now());

    uow.genres()
        .update(genre.clone())
        .await
        .persistence("Error updating genre")?;
    uow.save_changes().await.persistence("Error updating genre")?;

    tracing::info!(genre_id = %id, "Genre updated");
    Ok(genre)
}

async fn delete(deps: &ServiceDependencies, id: GenreId) -> Result<()> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut genre: Genre = require(uow.genres(), id, NOT_FOUND).await?;

    let mut rules = RuleViolations::new();
    let books = uow
        .books()
        .get_by_genre(id)
        .await
        .persistence("Error loading books")?;
    rules.check(
        books.is_empty(),
        "Cannot delete genre because it is associated with one or more books.",
    );
    rules.into_result()?;

    genre.deactivate(Utc::now())?;
    uow.genres()
        .update(genre)
        .await
        .persistence("Error deleting genre")?;
    uow.save_changes().await.persistence("Error deleting genre")?;

    tracing::info!(genre_id = %id, "Genre deleted");
    Ok(())
}

async fn books_of(deps: &ServiceDependencies, id: GenreId) -> Result<Vec<BookView>> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    require::<Genre, _>(uow.genres(), id, NOT_FOUND).await?;

    let books = uow
        .books()
        .get_by_genre(id)
        .await
        .persistence("Error loading books")?;
    build_views(uow, books).await
}
