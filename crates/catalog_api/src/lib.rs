//! Author lifecycle: list, detail, create, update and guarded delete.
//!
//! Every operation is request scoped. The store behind [`ApiContext`] is the
//! only durable state; user-correctable outcomes (bad input, referenced
//! authors) come back as [`Response`] values, and only missing authors and
//! storage failures become [`LifecycleError`]s.

pub mod aggregate;
pub mod guard;
pub mod validation;

use std::sync::Arc;

use shared::{
    domain::{author_list_url, author_url, Author, AuthorId, Book},
    error::{ApiError, ErrorCode},
    protocol::{AuthorCard, AuthorForm, FieldError, Response, View},
};
use storage::{CatalogStore, Removal, StorageError};
use thiserror::Error;
use tracing::{debug, info};

use aggregate::author_with_books;
use guard::{check_delete, DeleteDecision};
use validation::{validate_author, AuthorValidation, FieldSource};

const LIST_TITLE: &str = "Author List";
const DETAIL_TITLE: &str = "Author Detail";
const CREATE_TITLE: &str = "Create Author";
const UPDATE_TITLE: &str = "Update Author";
const DELETE_TITLE: &str = "Delete Author";

#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn CatalogStore>,
}

impl ApiContext {
    pub fn new(store: impl CatalogStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Author not found.")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LifecycleError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LifecycleError::NotFound => ErrorCode::NotFound,
            LifecycleError::Storage(_) => ErrorCode::Internal,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        ApiError::new(self.code(), self.to_string())
    }
}

pub type LifecycleResult = Result<Response, LifecycleError>;

pub async fn author_list(ctx: &ApiContext) -> LifecycleResult {
    let authors = ctx.store.find_all_authors().await?;
    Ok(Response::Render(View::AuthorList {
        title: LIST_TITLE.into(),
        author_list: authors.into_iter().map(AuthorCard::from).collect(),
    }))
}

pub async fn author_detail(ctx: &ApiContext, id: AuthorId) -> LifecycleResult {
    let found = author_with_books(&ctx.store, id).await?;
    let author = found.author.ok_or(LifecycleError::NotFound)?;
    Ok(Response::Render(View::AuthorDetail {
        title: DETAIL_TITLE.into(),
        author: author.into(),
        author_books: found.books,
    }))
}

pub fn author_create_form() -> Response {
    form_view(CREATE_TITLE, None, Vec::new())
}

pub async fn author_create(ctx: &ApiContext, raw: &(dyn FieldSource + Sync)) -> LifecycleResult {
    match validate_author(raw) {
        AuthorValidation::Invalid { form, errors } => {
            debug!(errors = errors.len(), "author create rejected");
            Ok(form_view(CREATE_TITLE, Some(form), errors))
        }
        AuthorValidation::Valid(fields) => {
            let id = ctx.store.insert_author(&fields).await?;
            info!(author_id = %id, "author created");
            Ok(Response::Redirect(author_url(id)))
        }
    }
}

pub async fn author_update_form(ctx: &ApiContext, id: AuthorId) -> LifecycleResult {
    let author = ctx
        .store
        .find_author(id)
        .await?
        .ok_or(LifecycleError::NotFound)?;
    Ok(form_view(
        UPDATE_TITLE,
        Some(AuthorForm::from(&author)),
        Vec::new(),
    ))
}

pub async fn author_update(
    ctx: &ApiContext,
    id: AuthorId,
    raw: &(dyn FieldSource + Sync),
) -> LifecycleResult {
    match validate_author(raw) {
        AuthorValidation::Invalid { mut form, errors } => {
            debug!(author_id = %id, errors = errors.len(), "author update rejected");
            form.id = Some(id);
            Ok(form_view(UPDATE_TITLE, Some(form), errors))
        }
        AuthorValidation::Valid(fields) => {
            let author = ctx
                .store
                .replace_author(id, &fields)
                .await?
                .ok_or(LifecycleError::NotFound)?;
            info!(author_id = %id, "author updated");
            Ok(Response::Redirect(author.url()))
        }
    }
}

pub async fn author_delete_form(ctx: &ApiContext, id: AuthorId) -> LifecycleResult {
    let decision = check_delete(author_with_books(&ctx.store, id).await?);
    Ok(match decision {
        DeleteDecision::NothingToDelete => Response::Redirect(author_list_url().into()),
        DeleteDecision::Blocked { author, books } => delete_view(author, books),
        DeleteDecision::Authorized(author) => delete_view(author, Vec::new()),
    })
}

pub async fn author_delete(ctx: &ApiContext, id: AuthorId) -> LifecycleResult {
    let decision = check_delete(author_with_books(&ctx.store, id).await?);
    match decision {
        DeleteDecision::NothingToDelete => Ok(Response::Redirect(author_list_url().into())),
        DeleteDecision::Blocked { author, books } => {
            debug!(author_id = %id, books = books.len(), "author delete refused");
            Ok(delete_view(author, books))
        }
        DeleteDecision::Authorized(_) => match ctx.store.remove_author(id).await? {
            Removal::Removed => {
                info!(author_id = %id, "author deleted");
                Ok(Response::Redirect(author_list_url().into()))
            }
            Removal::Missing => Ok(Response::Redirect(author_list_url().into())),
            // A book appeared between the check and the delete.
            Removal::Referenced => {
                debug!(author_id = %id, "author gained books before delete");
                author_delete_form(ctx, id).await
            }
        },
    }
}

fn form_view(title: &str, author: Option<AuthorForm>, errors: Vec<FieldError>) -> Response {
    Response::Render(View::AuthorForm {
        title: title.into(),
        author,
        errors,
    })
}

fn delete_view(author: Author, books: Vec<Book>) -> Response {
    Response::Render(View::AuthorDelete {
        title: DELETE_TITLE.into(),
        author: author.into(),
        author_books: books,
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
