use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;

use shared::domain::{Author, AuthorFields, AuthorId, Book, BookId};

/// Opaque failure of the storage backend. Callers propagate it unchanged.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct StorageError(#[from] anyhow::Error);

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Outcome of a guarded author removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    Missing,
    /// At least one book still pointed at the author when the delete ran.
    Referenced,
}

/// Storage collaborator consumed by the author lifecycle.
///
/// Books reference authors by id only; the relation is recovered with
/// [`CatalogStore::find_books_by_author`] at query time.
#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    async fn health_check(&self) -> StorageResult<()>;

    /// All authors ordered by family name, ascending.
    async fn find_all_authors(&self) -> StorageResult<Vec<Author>>;

    async fn find_author(&self, id: AuthorId) -> StorageResult<Option<Author>>;

    async fn find_books_by_author(&self, id: AuthorId) -> StorageResult<Vec<Book>>;

    async fn insert_author(&self, fields: &AuthorFields) -> StorageResult<AuthorId>;

    /// Overwrites every field of the author with `id`, returning the stored
    /// record, or `None` when no such author exists.
    async fn replace_author(
        &self,
        id: AuthorId,
        fields: &AuthorFields,
    ) -> StorageResult<Option<Author>>;

    /// Deletes the author only if no book references it at the time of the
    /// delete.
    async fn remove_author(&self, id: AuthorId) -> StorageResult<Removal>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to connect to '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run catalog migrations")?;
        Ok(Self { pool })
    }

    pub async fn ping(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_author(&self, fields: &AuthorFields) -> Result<AuthorId> {
        let rec = sqlx::query(
            "INSERT INTO authors (first_name, family_name, date_of_birth, date_of_death)
             VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&fields.first_name)
        .bind(&fields.family_name)
        .bind(fields.date_of_birth)
        .bind(fields.date_of_death)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert author")?;
        Ok(AuthorId(rec.try_get::<i64, _>(0)?))
    }

    pub async fn load_author(&self, id: AuthorId) -> Result<Option<Author>> {
        let row = sqlx::query(
            "SELECT id, first_name, family_name, date_of_birth, date_of_death
             FROM authors
             WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load author {id}"))?;
        row.as_ref().map(author_from_row).transpose()
    }

    pub async fn list_authors(&self) -> Result<Vec<Author>> {
        let rows = sqlx::query(
            "SELECT id, first_name, family_name, date_of_birth, date_of_death
             FROM authors
             ORDER BY family_name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list authors")?;
        rows.iter().map(author_from_row).collect()
    }

    pub async fn update_author(
        &self,
        id: AuthorId,
        fields: &AuthorFields,
    ) -> Result<Option<Author>> {
        let row = sqlx::query(
            "UPDATE authors
             SET first_name = ?, family_name = ?, date_of_birth = ?, date_of_death = ?
             WHERE id = ?
             RETURNING id, first_name, family_name, date_of_birth, date_of_death",
        )
        .bind(&fields.first_name)
        .bind(&fields.family_name)
        .bind(fields.date_of_birth)
        .bind(fields.date_of_death)
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update author {id}"))?;
        row.as_ref().map(author_from_row).transpose()
    }

    pub async fn delete_author_if_unreferenced(&self, id: AuthorId) -> Result<Removal> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query(
            "DELETE FROM authors
             WHERE id = ?1
               AND NOT EXISTS (SELECT 1 FROM books WHERE author_id = ?1)",
        )
        .bind(id.0)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to delete author {id}"))?
        .rows_affected();

        let removal = if deleted > 0 {
            Removal::Removed
        } else {
            let still_there: Option<i64> =
                sqlx::query_scalar("SELECT id FROM authors WHERE id = ?")
                    .bind(id.0)
                    .fetch_optional(&mut *tx)
                    .await?;
            if still_there.is_some() {
                Removal::Referenced
            } else {
                Removal::Missing
            }
        };
        tx.commit().await?;
        Ok(removal)
    }

    pub async fn create_book(
        &self,
        title: &str,
        summary: &str,
        author_id: AuthorId,
    ) -> Result<BookId> {
        let rec = sqlx::query(
            "INSERT INTO books (title, summary, author_id) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(title)
        .bind(summary)
        .bind(author_id.0)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert book")?;
        Ok(BookId(rec.try_get::<i64, _>(0)?))
    }

    pub async fn list_books_for_author(&self, author_id: AuthorId) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            "SELECT id, title, summary, author_id
             FROM books
             WHERE author_id = ?
             ORDER BY title ASC, id ASC",
        )
        .bind(author_id.0)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to list books for author {author_id}"))?;

        rows.iter()
            .map(|r| -> Result<Book> {
                Ok(Book {
                    id: BookId(r.try_get::<i64, _>(0)?),
                    title: r.try_get::<String, _>(1)?,
                    summary: r.try_get::<String, _>(2)?,
                    author_id: AuthorId(r.try_get::<i64, _>(3)?),
                })
            })
            .collect()
    }

    #[cfg(test)]
    pub async fn delete_book(&self, book_id: BookId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(book_id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete book {book_id}"))?
            .rows_affected();
        Ok(deleted > 0)
    }
}

fn author_from_row(r: &SqliteRow) -> Result<Author> {
    Ok(Author {
        id: AuthorId(r.try_get::<i64, _>("id")?),
        first_name: r.try_get::<String, _>("first_name")?,
        family_name: r.try_get::<String, _>("family_name")?,
        date_of_birth: r.try_get("date_of_birth")?,
        date_of_death: r.try_get("date_of_death")?,
    })
}

#[async_trait]
impl CatalogStore for Storage {
    async fn health_check(&self) -> StorageResult<()> {
        Ok(self.ping().await?)
    }

    async fn find_all_authors(&self) -> StorageResult<Vec<Author>> {
        Ok(self.list_authors().await?)
    }

    async fn find_author(&self, id: AuthorId) -> StorageResult<Option<Author>> {
        Ok(self.load_author(id).await?)
    }

    async fn find_books_by_author(&self, id: AuthorId) -> StorageResult<Vec<Book>> {
        Ok(self.list_books_for_author(id).await?)
    }

    async fn insert_author(&self, fields: &AuthorFields) -> StorageResult<AuthorId> {
        Ok(self.create_author(fields).await?)
    }

    async fn replace_author(
        &self,
        id: AuthorId,
        fields: &AuthorFields,
    ) -> StorageResult<Option<Author>> {
        Ok(self.update_author(id, fields).await?)
    }

    async fn remove_author(&self, id: AuthorId) -> StorageResult<Removal> {
        Ok(self.delete_author_if_unreferenced(id).await?)
    }
}

/// Creates the directory that will hold a file-backed SQLite database.
/// In-memory and non-SQLite URLs are left alone.
pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() || path == ":memory:" {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
