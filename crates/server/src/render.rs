//! JSON rendering of lifecycle responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Json,
};
use catalog_api::{LifecycleError, LifecycleResult};
use shared::{error::ApiError, protocol::Response};
use tracing::{debug, error};

pub(crate) type HttpError = (StatusCode, Json<ApiError>);
pub(crate) type HttpResult = Result<axum::response::Response, HttpError>;

/// Views become `{"view": ..., "data": ...}` bodies; redirects are `303 See Other`.
pub(crate) fn into_http(response: Response) -> axum::response::Response {
    match response {
        Response::Render(view) => {
            debug!(view = view.name(), "render");
            (StatusCode::OK, Json(view)).into_response()
        }
        Response::Redirect(url) => {
            debug!(%url, "redirect");
            Redirect::to(&url).into_response()
        }
    }
}

pub(crate) fn respond(result: LifecycleResult) -> HttpResult {
    result.map(into_http).map_err(failure)
}

pub(crate) fn failure(err: LifecycleError) -> HttpError {
    let status = match &err {
        LifecycleError::NotFound => StatusCode::NOT_FOUND,
        LifecycleError::Storage(source) => {
            error!(error = %source, "storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(err.to_api_error()))
}
