//! Page handlers.

use crate::{Error, Result};
use crate::models::{Car, Driver, Entity, Manufacturer};
use crate::rendering::{RenderContext, templates, to_fields};
use crate::services::auth::{self, LOGIN_PATH, safe_next};
use crate::services::search::{RequestParams, build_search_context, filter_entities};
use crate::services::visits::{NUM_VISITS, plural_suffix, record_visit};
use crate::storage::SessionKey;
use crate::storage::sqlite::SqlEntity;
use crate::web::AppState;
use crate::web::error::found;
use crate::web::session::{
    AuthenticatedUser, CurrentSession, MaybeUser, expired_cookie, session_cookie,
    session_key_from_headers,
};
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Form, Path, Query, State};
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::response::{Html, IntoResponse, Response};
use serde::{Deserialize, Serialize};

const LOGIN_FAILED: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Renders `template` inside the layout with the navigation state filled in.
fn page(
    state: &AppState,
    template: &str,
    title: &str,
    mut ctx: RenderContext,
    user: Option<&Driver>,
) -> Result<Html<String>> {
    ctx.add_string("title", title);
    match user {
        Some(driver) => ctx.add_object("user", to_fields(driver)),
        None => ctx.add_string("anonymous", "true"),
    }
    Ok(Html(state.renderer.render_page(template, &ctx)?))
}

/// Malformed query strings are treated as empty.
fn params_or_default(params: std::result::Result<Query<RequestParams>, QueryRejection>) -> RequestParams {
    params.map_or_else(
        |rejection| {
            tracing::debug!(error = %rejection, "Ignoring malformed query string");
            RequestParams::default()
        },
        |Query(params)| params,
    )
}

/// Builds the home page context and counts the visit.
///
/// # Errors
///
/// Returns an error if the session or the entity counts cannot be read.
pub fn index_context(state: &AppState, session: &SessionKey) -> Result<RenderContext> {
    let num_visits = record_visit(&state.sessions, session)?;

    let mut ctx = RenderContext::new();
    ctx.add_string("num_drivers", state.entities.count::<Driver>()?.to_string());
    ctx.add_string("num_cars", state.entities.count::<Car>()?.to_string());
    ctx.add_string(
        "num_manufacturers",
        state.entities.count::<Manufacturer>()?.to_string(),
    );
    ctx.add_string(NUM_VISITS, num_visits.to_string());
    ctx.add_string("num_visits_suffix", plural_suffix(num_visits));
    Ok(ctx)
}

/// `GET /`
pub async fn index(
    State(state): State<AppState>,
    session: CurrentSession,
    MaybeUser(user): MaybeUser,
) -> Result<Response> {
    let ctx = index_context(&state, &session.key)?;
    let html = page(&state, templates::INDEX, "Home", ctx, user.as_ref())?;
    Ok(session.attach(&state, html.into_response()))
}

/// Shared body of the three list pages.
fn list_page<E: SqlEntity + Serialize>(
    state: &AppState,
    user: &Driver,
    params: &RequestParams,
    template: &str,
    collection_name: &str,
    title: &str,
) -> Result<Html<String>> {
    let search = build_search_context(E::SEARCH_FIELD, params);
    let collection = filter_entities(state.entities.query::<E>(), E::SEARCH_FIELD, params);
    let rows = state.entities.fetch(&collection)?;

    let mut ctx = RenderContext::new();
    ctx.add_string("search_query", search.search_form.query);
    ctx.add_string("search_placeholder", search.search_form.placeholder);
    ctx.add_list(collection_name, rows.iter().map(to_fields).collect());
    page(state, template, title, ctx, Some(user))
}

/// `GET /drivers/`
pub async fn driver_list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    params: std::result::Result<Query<RequestParams>, QueryRejection>,
) -> Result<Html<String>> {
    let params = params_or_default(params);
    list_page::<Driver>(&state, &user.driver, &params, templates::DRIVER_LIST, "drivers", "Drivers")
}

/// `GET /cars/`
pub async fn car_list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    params: std::result::Result<Query<RequestParams>, QueryRejection>,
) -> Result<Html<String>> {
    let params = params_or_default(params);
    list_page::<Car>(&state, &user.driver, &params, templates::CAR_LIST, "cars", "Cars")
}

/// `GET /manufacturers/`
pub async fn manufacturer_list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    params: std::result::Result<Query<RequestParams>, QueryRejection>,
) -> Result<Html<String>> {
    let params = params_or_default(params);
    list_page::<Manufacturer>(
        &state,
        &user.driver,
        &params,
        templates::MANUFACTURER_LIST,
        "manufacturers",
        "Manufacturers",
    )
}

/// `GET /drivers/{id}/`
pub async fn driver_detail(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    let driver = state.entities.require::<Driver>(id)?;
    let cars = state.entities.cars_for_driver(driver.id)?;

    let mut ctx = RenderContext::new();
    ctx.add_string("full_name", driver.full_name());
    ctx.add_object(Driver::KIND, to_fields(&driver));
    ctx.add_list("cars", cars.iter().map(to_fields).collect());
    page(&state, templates::DRIVER_DETAIL, &driver.username, ctx, Some(&user.driver))
}

/// `GET /cars/{id}/`
pub async fn car_detail(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    let car = state.entities.require::<Car>(id)?;
    let drivers = state.entities.drivers_for_car(car.id)?;
    let assigned = drivers.iter().any(|driver| driver.id == user.driver.id);

    let mut ctx = RenderContext::new();
    ctx.add_object(Car::KIND, to_fields(&car));
    ctx.add_list("drivers", drivers.iter().map(to_fields).collect());
    ctx.add_string(
        "toggle_label",
        if assigned {
            "Delete me from this car"
        } else {
            "Assign me to this car"
        },
    );
    page(&state, templates::CAR_DETAIL, &car.model, ctx, Some(&user.driver))
}

/// `POST /cars/{id}/toggle-assign/`
pub async fn toggle_assign(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response> {
    state.entities.toggle_assignment(id, user.driver.id)?;
    Ok(found(&format!("/cars/{id}/")))
}

/// Login form fields. Missing fields are empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
    /// Where to go after logging in.
    pub next: Option<String>,
}

fn login_page(
    state: &AppState,
    next: &str,
    username: &str,
    error: Option<&str>,
    user: Option<&Driver>,
) -> Result<Html<String>> {
    let mut ctx = RenderContext::new();
    ctx.add_string("next", next);
    ctx.add_string("username", username);
    if let Some(error) = error {
        ctx.add_string("error", error);
    }
    page(state, templates::LOGIN, "Log in", ctx, user)
}

/// `GET /accounts/login/`
pub async fn login_form(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    params: std::result::Result<Query<RequestParams>, QueryRejection>,
) -> Result<Html<String>> {
    let params = params_or_default(params);
    let next = safe_next(params.get_last("next"));
    login_page(&state, next, "", None, user.as_ref())
}

/// `POST /accounts/login/`
pub async fn login_submit(
    State(state): State<AppState>,
    session: CurrentSession,
    form: std::result::Result<Form<LoginForm>, FormRejection>,
) -> Result<Response> {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let next = safe_next(form.next.as_deref());

    // bcrypt blocks for tens of milliseconds per check
    let users = state.users.clone();
    let (username, password) = (form.username.clone(), form.password.clone());
    let authenticated =
        tokio::task::spawn_blocking(move || users.authenticate(&username, &password))
            .await
            .map_err(|e| Error::operation("authenticate", e))??;

    let Some(driver) = authenticated else {
        metrics::counter!("taxi_login_attempts_total", "outcome" => "failure").increment(1);
        tracing::info!("Rejected login attempt");
        let html = login_page(&state, next, &form.username, Some(LOGIN_FAILED), None)?;
        return Ok(session.attach(&state, html.into_response()));
    };

    metrics::counter!("taxi_login_attempts_total", "outcome" => "success").increment(1);
    let key = auth::login(&state.sessions, &session.key, &driver)?;

    let mut response = found(next);
    response
        .headers_mut()
        .append(SET_COOKIE, session_cookie(&key, &state));
    Ok(response)
}

/// `POST /accounts/logout/`
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if let Some(key) = session_key_from_headers(&headers) {
        auth::logout(&state.sessions, &key)?;
    }

    let mut response = found(LOGIN_PATH);
    response.headers_mut().append(SET_COOKIE, expired_cookie());
    Ok(response)
}
