use shared::domain::{Author, Book};

use crate::aggregate::AuthorWithBooks;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteDecision {
    /// The author does not exist.
    NothingToDelete,
    /// Books still reference the author; they are returned so the refusal
    /// can be explained.
    Blocked { author: Author, books: Vec<Book> },
    Authorized(Author),
}

pub fn check_delete(found: AuthorWithBooks) -> DeleteDecision {
    match found {
        AuthorWithBooks { author: None, .. } => DeleteDecision::NothingToDelete,
        AuthorWithBooks {
            author: Some(author),
            books,
        } if !books.is_empty() => DeleteDecision::Blocked { author, books },
        AuthorWithBooks {
            author: Some(author),
            ..
        } => DeleteDecision::Authorized(author),
    }
}
