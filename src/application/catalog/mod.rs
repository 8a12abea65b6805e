mod authors;
mod books;
mod commands;
mod copies;
mod genres;
mod views;

pub use authors::{
    create_author, delete_author, get_all_authors, get_author, get_books_by_author, update_author,
};
pub use books::{create_book, delete_book, get_all_books, get_book, search_books, update_book};
pub use commands::*;
pub use copies::{
    add_copy, get_copies_of_book, get_copy, mark_copy_damaged, mark_copy_lost, restore_copy,
    send_copy_to_maintenance, withdraw_copy,
};
pub use genres::{
    create_genre, delete_genre, get_all_genres, get_books_by_genre, get_genre, update_genre,
};
pub use views::{AuthorSummary, BookView, GenreSummary};
