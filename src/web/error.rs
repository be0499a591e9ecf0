//! HTTP mapping of [`Error`].

use crate::Error;
use crate::services::auth::LOGIN_PATH;
use axum::http::header::{HeaderValue, LOCATION};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// `302 Found` to `location`.
#[must_use]
pub fn found(location: &str) -> Response {
    let location = HeaderValue::try_from(location).unwrap_or_else(|_| HeaderValue::from_static("/"));
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidInput(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::NotFound(what) => {
                tracing::debug!(what = %what, "Not found");
                (StatusCode::NOT_FOUND, "Not found").into_response()
            },
            Self::Unauthorized(_) => found(LOGIN_PATH),
            Self::OperationFailed { operation, cause } => {
                tracing::error!(operation = %operation, cause = %cause, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            },
        }
    }
}
