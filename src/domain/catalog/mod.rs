mod author;
mod book;
mod book_copy;
mod genre;

pub use author::{Author, AuthorDraft};
pub use book::{Book, BookDraft, EARLIEST_PUBLICATION_YEAR, MAX_TITLE_LENGTH, is_valid_isbn};
pub use book_copy::{BookCondition, BookCopy, BookCopyStatus};
pub use genre::Genre;
