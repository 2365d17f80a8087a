use std::sync::Arc;

use anyhow::anyhow;
use shared::domain::{Author, AuthorId, Book};
use storage::{CatalogStore, StorageError, StorageResult};
use tokio::task::JoinHandle;

/// An author lookup joined with the books that reference it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorWithBooks {
    pub author: Option<Author>,
    pub books: Vec<Book>,
}

/// Looks up the author and its books concurrently.
///
/// Both lookups run as their own task. The first failure is returned as soon
/// as it arrives and the other lookup is aborted. A missing author is not a
/// failure here.
pub async fn author_with_books(
    store: &Arc<dyn CatalogStore>,
    id: AuthorId,
) -> StorageResult<AuthorWithBooks> {
    let mut author_task = tokio::spawn({
        let store = Arc::clone(store);
        async move { store.find_author(id).await }
    });
    let mut books_task = tokio::spawn({
        let store = Arc::clone(store);
        async move { store.find_books_by_author(id).await }
    });

    let joined = tokio::try_join!(
        settle(&mut author_task, "author"),
        settle(&mut books_task, "books")
    );
    match joined {
        Ok((author, books)) => Ok(AuthorWithBooks { author, books }),
        Err(err) => {
            author_task.abort();
            books_task.abort();
            Err(err)
        }
    }
}

async fn settle<T>(
    task: &mut JoinHandle<StorageResult<T>>,
    lookup: &'static str,
) -> StorageResult<T> {
    match task.await {
        Ok(result) => result,
        Err(join_error) => Err(StorageError::from(anyhow!(
            "{lookup} lookup task failed: {join_error}"
        ))),
    }
}
