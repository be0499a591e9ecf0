//! Session cookie handling and request extractors.

use crate::models::Driver;
use crate::services::auth::{current_user, login_redirect};
use crate::storage::{SessionBackend, SessionKey};
use crate::web::AppState;
use crate::web::error::found;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, HeaderMap, HeaderValue};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sessionid";

/// Reads the session key from the `Cookie` header.
///
/// Malformed keys are ignored.
#[must_use]
pub fn session_key_from_headers(headers: &HeaderMap) -> Option<SessionKey> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionKey::parse(value))
}

/// `Set-Cookie` value issuing `key`.
#[must_use]
pub fn session_cookie(key: &SessionKey, state: &AppState) -> HeaderValue {
    let mut cookie = format!(
        "{SESSION_COOKIE}={key}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        state.session_ttl().as_secs()
    );
    if state.secure_cookies {
        cookie.push_str("; Secure");
    }
    HeaderValue::try_from(cookie).unwrap_or_else(|_| expired_cookie())
}

/// `Set-Cookie` value removing the session cookie.
#[must_use]
pub fn expired_cookie() -> HeaderValue {
    HeaderValue::from_static("sessionid=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Returns the live session key carried by the request, if any.
fn existing_session(parts: &Parts, state: &AppState) -> crate::Result<Option<SessionKey>> {
    match session_key_from_headers(&parts.headers) {
        Some(key) if state.sessions.exists(&key)? => Ok(Some(key)),
        _ => Ok(None),
    }
}

/// The request's session, created when the client has none.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    /// Session key.
    pub key: SessionKey,
    /// True when the session was created for this request and the cookie
    /// still has to be sent.
    pub is_new: bool,
}

impl CurrentSession {
    /// Adds the cookie to `response` if the client does not have it yet.
    pub fn attach(&self, state: &AppState, mut response: Response) -> Response {
        if self.is_new {
            response
                .headers_mut()
                .append(axum::http::header::SET_COOKIE, session_cookie(&self.key, state));
        }
        response
    }
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = crate::Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(key) = existing_session(parts, state)? {
            return Ok(Self { key, is_new: false });
        }
        let key = state.sessions.create()?;
        Ok(Self { key, is_new: true })
    }
}

/// A logged-in driver. Rejects anonymous requests with a redirect to the
/// login page that returns to the requested path.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The driver.
    pub driver: Driver,
    /// Their session.
    pub session: SessionKey,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let lookup = || -> crate::Result<Option<Self>> {
            let Some(session) = existing_session(parts, state)? else {
                return Ok(None);
            };
            let driver = current_user(&state.sessions, &state.users, &session)?;
            Ok(driver.map(|driver| Self { driver, session }))
        };

        match lookup() {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                let path = parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| parts.uri.path(), |pq| pq.as_str());
                tracing::debug!(path, "Redirecting anonymous request to login");
                Err(found(&login_redirect(path)))
            },
            Err(e) => Err(e.into_response()),
        }
    }
}

/// The logged-in driver, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Driver>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = crate::Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(session) = existing_session(parts, state)? else {
            return Ok(Self(None));
        };
        Ok(Self(current_user(&state.sessions, &state.users, &session)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use axum::http::Request;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_session_key_from_headers() {
        let key = session_key_from_headers(&headers("theme=dark; sessionid=abc123; x=1"));
        assert_eq!(key.as_ref().map(SessionKey::as_str), Some("abc123"));

        assert!(session_key_from_headers(&headers("theme=dark")).is_none());
        assert!(session_key_from_headers(&headers("sessionid=bad;key")).is_none());
        assert!(session_key_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let mut state = AppState::new(Database::in_memory().unwrap());
        let key = SessionKey::parse("abc").unwrap();

        let cookie = session_cookie(&key, &state);
        assert_eq!(
            cookie.to_str().unwrap(),
            "sessionid=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=1209600"
        );

        state.secure_cookies = true;
        assert!(session_cookie(&key, &state).to_str().unwrap().ends_with("; Secure"));
    }

    #[tokio::test]
    async fn test_current_session_reuses_live_session() {
        let state = AppState::new(Database::in_memory().unwrap());
        let key = state.sessions.create().unwrap();

        let request = Request::builder()
            .uri("/")
            .header(COOKIE, format!("sessionid={key}"))
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();
        let session = CurrentSession::from_request_parts(&mut parts, &state).await.unwrap();

        assert_eq!(session.key, key);
        assert!(!session.is_new);
    }

    #[tokio::test]
    async fn test_current_session_replaces_unknown_key() {
        let state = AppState::new(Database::in_memory().unwrap());

        let request = Request::builder()
            .uri("/")
            .header(COOKIE, "sessionid=stale")
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();
        let session = CurrentSession::from_request_parts(&mut parts, &state).await.unwrap();

        assert_ne!(session.key.as_str(), "stale");
        assert!(session.is_new);
        assert!(state.sessions.exists(&session.key).unwrap());
    }
}
