use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    routing::get,
    Form, Router,
};
use catalog_api::{
    author_create, author_create_form, author_delete, author_delete_form, author_detail,
    author_list, author_update, author_update_form, validation::RawAuthorForm, ApiContext,
    LifecycleError,
};
use shared::domain::AuthorId;
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, prepare_database_url};
use render::{failure, into_http, respond, HttpError, HttpResult};

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings()?;
    let filter = EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext::new(storage),
    };
    let app = build_router(Arc::new(state), settings.max_form_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "catalog listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_form_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/catalog/authors", get(http_author_list))
        .route(
            "/catalog/author/create",
            get(http_author_create_form).post(http_author_create),
        )
        .route("/catalog/author/:id", get(http_author_detail))
        .route(
            "/catalog/author/:id/update",
            get(http_author_update_form).post(http_author_update),
        )
        .route(
            "/catalog/author/:id/delete",
            get(http_author_delete_form).post(http_author_delete),
        )
        .layer(RequestBodyLimitLayer::new(max_form_bytes))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state
        .api
        .store
        .health_check()
        .await
        .map_err(|e| failure(LifecycleError::from(e)))?;
    Ok("ok")
}

/// Ids that do not parse can never match an author.
fn parse_author_id(raw: &str) -> Result<AuthorId, HttpError> {
    raw.parse().map_err(|_| failure(LifecycleError::NotFound))
}

async fn http_author_list(State(state): State<Arc<AppState>>) -> HttpResult {
    respond(author_list(&state.api).await)
}

async fn http_author_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HttpResult {
    let id = parse_author_id(&id)?;
    respond(author_detail(&state.api, id).await)
}

async fn http_author_create_form() -> axum::response::Response {
    into_http(author_create_form())
}

async fn http_author_create(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RawAuthorForm>,
) -> HttpResult {
    respond(author_create(&state.api, &form).await)
}

async fn http_author_update_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HttpResult {
    let id = parse_author_id(&id)?;
    respond(author_update_form(&state.api, id).await)
}

async fn http_author_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<RawAuthorForm>,
) -> HttpResult {
    let id = parse_author_id(&id)?;
    respond(author_update(&state.api, id, &form).await)
}

async fn http_author_delete_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HttpResult {
    let id = parse_author_id(&id)?;
    respond(author_delete_form(&state.api, id).await)
}

async fn http_author_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HttpResult {
    let id = parse_author_id(&id)?;
    respond(author_delete(&state.api, id).await)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
