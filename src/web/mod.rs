//! HTTP interface.
//!
//! ```text
//! GET       /                            home page with visit counter
//! GET       /drivers/  /cars/  /manufacturers/   searchable lists
//! GET       /drivers/{id}/  /cars/{id}/  detail pages
//! POST      /cars/{id}/toggle-assign/    assign or unassign the current driver
//! GET,POST  /accounts/login/
//! POST      /accounts/logout/
//! ```

pub mod error;
pub mod handlers;
pub mod session;
mod state;

pub use state::AppState;

use crate::observability::{REQUEST_ID_HEADER, RequestContext, scope_request_context};
use crate::storage::Database;
use crate::{Error, Result, TaxiConfig};
use axum::Router;
use axum::extract::Request;
use axum::http::header::{self, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/drivers/", get(handlers::driver_list))
        .route("/drivers/{id}/", get(handlers::driver_detail))
        .route("/cars/", get(handlers::car_list))
        .route("/cars/{id}/", get(handlers::car_detail))
        .route("/cars/{id}/toggle-assign/", post(handlers::toggle_assign))
        .route("/manufacturers/", get(handlers::manufacturer_list))
        .route(
            "/accounts/login/",
            get(handlers::login_form).post(handlers::login_submit),
        )
        .route("/accounts/logout/", post(handlers::logout))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(propagate_request_id))
        .with_state(state)
}

/// Runs each request inside a [`RequestContext`] and echoes its ID.
async fn propagate_request_id(request: Request, next: Next) -> Response {
    let context = RequestContext::from_header(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok()),
    );
    let request_id = context.request_id().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = scope_request_context(context, next.run(request))
        .instrument(span)
        .await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Opens the database and serves HTTP until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the listener cannot
/// bind.
pub async fn serve(config: &TaxiConfig) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let state = AppState::from_config(db, config);
    state.sessions.purge_expired()?;

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| Error::operation("bind", format!("{address}: {e}")))?;
    tracing::info!(%address, database = %config.database_path.display(), "Taxi service listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::operation("serve", e))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl-C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
