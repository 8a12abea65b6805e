use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{ApplicationError, PersistenceContext, Result};
use crate::application::lookup::require;
use crate::application::result::{OperationResult, boundary};
use crate::application::validation::{FormatRules, RuleViolations};
use crate::domain::catalog::{Author, Book, BookCopyStatus, BookDraft, Genre};
use crate::domain::{AuthorId, BookId, Entity, GenreId};
use crate::ports::UnitOfWork;
use chrono::Utc;

use super::commands::{CreateBook, UpdateBook};
use super::views::BookView;

const NOT_FOUND: &str = "Book not found.";

/// 書籍の一覧をビューに変換する
///
/// 著者・ジャンル・蔵書はそれぞれ1回ずつ読み込む。
pub(crate) async fn build_views(uow: &dyn UnitOfWork, books: Vec<Book>) -> Result<Vec<BookView>> {
    if books.is_empty() {
        return Ok(Vec::new());
    }

    let (authors, genres, copies) = futures::try_join!(
        async { uow.authors().get_all().await.persistence("Error loading authors") },
        async { uow.genres().get_all().await.persistence("Error loading genres") },
        async { uow.book_copies().get_all().await.persistence("Error loading copies") },
    )?;

    Ok(books
        .iter()
        .map(|book| {
            let author = authors.iter().find(|a| a.id() == book.author_id());
            let own_copies: Vec<_> = copies
                .iter()
                .filter(|c| c.book_id() == book.id())
                .cloned()
                .collect();
            BookView::build(book, author, &genres, &own_copies)
        })
        .collect())
}

async fn build_view(uow: &dyn UnitOfWork, book: Book) -> Result<BookView> {
    build_views(uow, vec![book])
        .await?
        .pop()
        .ok_or_else(|| ApplicationError::not_found(NOT_FOUND))
}

/// 著者とジャンルの存在を検査する
async fn check_references(
    uow: &dyn UnitOfWork,
    rules: &mut RuleViolations,
    author_id: AuthorId,
    genre_ids: &[GenreId],
) -> Result<()> {
    let author = uow
        .authors()
        .get_by_id(author_id)
        .await
        .persistence("Error loading author")?;
    rules.check(author.is_some(), "Author not found.");

    for genre_id in genre_ids {
        let genre = uow
            .genres()
            .get_by_id(*genre_id)
            .await
            .persistence("Error loading genre")?;
        rules.check(
            genre.is_some(),
            format!("Genre with ID {genre_id} does not exist."),
        );
    }
    Ok(())
}

pub async fn get_book(deps: &ServiceDependencies, id: BookId) -> OperationResult<BookView> {
    boundary("get_book", async {
        let work = deps.unit_of_work();
        let uow = work.as_ref();
        let book = require(uow.books(), id, NOT_FOUND).await?;
        build_view(uow, book).await
    })
    .await
}

pub async fn get_all_books(deps: &ServiceDependencies) -> OperationResult<Vec<BookView>> {
    boundary("get_all_books", async {
        let work = deps.unit_of_work();
        let uow = work.as_ref();
        let books = uow
            .books()
            .get_all()
            .await
            .persistence("Error loading books")?;
        build_views(uow, books).await
    })
    .await
}

/// 書籍を登録する
///
/// ビジネスルール：
/// - ISBNは有効な書籍の中で一意
/// - 著者と全ジャンルが存在すること
///
/// 登録した書籍は著者・ジャンル側の書籍一覧にも追加する。
pub async fn create_book(deps: &ServiceDependencies, cmd: CreateBook) -> OperationResult<BookView> {
    boundary("create_book", create(deps, cmd)).await
}

pub async fn update_book(
    deps: &ServiceDependencies,
    id: BookId,
    cmd: UpdateBook,
) -> OperationResult<BookView> {
    boundary("update_book", update(deps, id, cmd)).await
}

/// 書籍を論理削除する。貸出中の蔵書がある間は削除できない
pub async fn delete_book(deps: &ServiceDependencies, id: BookId) -> OperationResult<()> {
    boundary("delete_book", delete(deps, id)).await
}

/// タイトル・ISBN・説明・著者名で書籍を検索する
pub async fn search_books(deps: &ServiceDependencies, term: &str) -> OperationResult<Vec<BookView>> {
    boundary("search_books", search(deps, term)).await
}

async fn create(deps: &ServiceDependencies, cmd: CreateBook) -> Result<BookView> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();

    // 1. 形式の検証
    cmd.check_format()?;

    // 2. 業務規則の検証
    let mut rules = RuleViolations::new();
    let same_isbn = uow
        .books()
        .get_by_isbn(&cmd.isbn)
        .await
        .persistence("Error loading books")?;
    rules.check(same_isbn.is_none(), "A book with this ISBN already exists.");
    check_references(uow, &mut rules, cmd.author_id, &cmd.genre_ids).await?;
    rules.into_result()?;

    // 3. 書籍の生成
    let now = Utc::now();
    let book = Book::create(
        BookDraft {
            title: cmd.title,
            isbn: cmd.isbn,
            publication_year: cmd.publication_year,
            author_id: cmd.author_id,
            genre_ids: cmd.genre_ids,
            publisher: cmd.publisher,
            description: cmd.description,
        },
        now,
    )?;

    // 4. 著者・ジャンル側の関連を更新
    let mut author: Author = require(uow.authors(), book.author_id(), "Author not found.").await?;
    author.add_book(book.id())?;
    author.audit_mut().touch(now);

    let mut genres = Vec::with_capacity(book.genre_ids().len());
    for genre_id in book.genre_ids() {
        let mut genre: Genre = require(uow.genres(), *genre_id, "Genre not found.").await?;
        genre.add_book(book.id())?;
        genre.audit_mut().touch(now);
        genres.push(genre);
    }

    // 5. 保存
    uow.books()
        .add(book.clone())
        .await
        .persistence("Error saving book")?;
    uow.authors()
        .update(author)
        .await
        .persistence("Error saving book")?;
    for genre in genres {
        uow.genres()
            .update(genre)
            .await
            .persistence("Error saving book")?;
    }
    uow.save_changes().await.persistence("Error saving book")?;

    tracing::info!(book_id = %book.id(), isbn = book.isbn(), "Book created");
    build_view(uow, book).await
}

async fn update(deps: &ServiceDependencies, id: BookId, cmd: UpdateBook) -> Result<BookView> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    cmd.check_format()?;

    let mut book: Book = require(uow.books(), id, NOT_FOUND).await?;

    let mut rules = RuleViolations::new();
    if cmd.isbn != book.isbn() {
        let same_isbn = uow
            .books()
            .get_by_isbn(&cmd.isbn)
            .await
            .persistence("Error loading books")?;
        rules.check(same_isbn.is_none(), "A book with this ISBN already exists.");
    }
    check_references(uow, &mut rules, cmd.author_id, &cmd.genre_ids).await?;
    rules.into_result()?;

    let now = Utc::now();
    book.update_title(&cmd.title)?;
    book.update_description(cmd.description.clone())?;
    book.update_details(&cmd.isbn, cmd.publication_year, cmd.publisher.clone(), now)?;

    let mut authors = Vec::new();
    let previous_author = book.author_id();
    if previous_author != cmd.author_id {
        // 旧著者が削除済みの場合は関連の解除を省略する
        if let Some(mut old) = uow
            .authors()
            .get_by_id(previous_author)
            .await
            .persistence("Error loading author")?
        {
            if old.book_ids().contains(&id) {
                old.remove_book(id)?;
                old.audit_mut().touch(now);
                authors.push(old);
            }
        }
        let mut new: Author = require(uow.authors(), cmd.author_id, "Author not found.").await?;
        new.add_book(id)?;
        new.audit_mut().touch(now);
        authors.push(new);
        book.change_author(cmd.author_id)?;
    }

    let mut genres = Vec::new();
    for removed in book.genre_ids().iter().filter(|g| !cmd.genre_ids.contains(g)) {
        if let Some(mut genre) = uow
            .genres()
            .get_by_id(*removed)
            .await
            .persistence("Error loading genre")?
        {
            if genre.book_ids().contains(&id) {
                genre.remove_book(id)?;
                genre.audit_mut().touch(now);
                genres.push(genre);
            }
        }
    }
    for added in cmd.genre_ids.iter().filter(|g| !book.genre_ids().contains(g)) {
        let mut genre: Genre = require(uow.genres(), *added, "Genre not found.").await?;
        genre.add_book(id)?;
        genre.audit_mut().touch(now);
        genres.push(genre);
    }
    book.replace_genres(cmd.genre_ids)?;
    book.audit_mut().touch(now);

    uow.books()
        .update(book.clone())
        .await
        .persistence("Error updating book")?;
    for author in authors {
        uow.authors()
            .update(author)
            .await
            .persistence("Error updating book")?;
    }
    for genre in genres {
        uow.genres()
            .update(genre)
            .await
            .persistence("Error updating book")?;
    }
    uow.save_changes().await.persistence("Error updating book")?;

    tracing::info!(book_id = %id, "Book updated");
    build_view(uow, book).await
}

async fn delete(deps: &ServiceDependencies, id: BookId) -> Result<()> {
    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut book: Book = require(uow.books(), id, NOT_FOUND).await?;

    let mut rules = RuleViolations::new();
    let copies = uow
        .book_copies()
        .get_by_book(id)
        .await
        .persistence("Error loading copies")?;
    rules.check(
        !copies.iter().any(|c| c.status() == BookCopyStatus::OnLoan),
        "This book cannot be deleted because it has copies on loan.",
    );
    rules.into_result()?;

    let now = Utc::now();
    book.deactivate(now)?;

    if let Some(mut author) = uow
        .authors()
        .get_by_id(book.author_id())
        .await
        .persistence("Error loading author")?
    {
        if author.book_ids().contains(&id) {
            author.remove_book(id)?;
            author.audit_mut().touch(now);
            uow.authors()
                .update(author)
                .await
                .persistence("Error deleting book")?;
        }
    }
    for genre_id in book.genre_ids() {
        if let Some(mut genre) = uow
            .genres()
            .get_by_id(*genre_id)
            .await
            .persistence("Error loading genre")?
        {
            if genre.book_ids().contains(&id) {
                genre.remove_book(id)?;
                genre.audit_mut().touch(now);
                uow.genres()
                    .update(genre)
                    .await
                    .persistence("Error deleting book")?;
            }
        }
    }
    uow.books()
        .update(book)
        .await
        .persistence("Error deleting book")?;
    uow.save_changes().await.persistence("Error deleting book")?;

    tracing::info!(book_id = %id, "Book deleted");
    Ok(())
}

async fn search(deps: &ServiceDependencies, term: &str) -> Result<Vec<BookView>> {
    let term = term.trim();
    if term.is_empty() {
        return Err(ApplicationError::Validation(vec![
            "Search term cannot be empty".to_string(),
        ]));
    }

    let work = deps.unit_of_work();
    let uow = work.as_ref();
    let mut books = uow
        .books()
        .search(term)
        .await
        .persistence("Error searching books")?;

    // 著者名での一致
    let needle = term.to_lowercase();
    let authors = uow
        .authors()
        .find(&|a: &Author| a.full_name().to_lowercase().contains(&needle))
        .await
        .persistence("Error searching books")?;
    for author in authors {
        let by_author = uow
            .books()
            .get_by_author(author.id())
            .await
            .persistence("Error searching books")?;
        for book in by_author {
            if !books.iter().any(|b| b.id() == book.id()) {
                books.push(book);
            }
        }
    }

    build_views(uow, books).await
}
