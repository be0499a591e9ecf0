//! Session-based authentication.
//!
//! A driver is logged in when their id is stored under [`AUTH_USER_KEY`] in
//! the session. Logging in moves the session to a fresh key so a key handed
//! out before authentication cannot be reused afterwards.

use crate::Result;
use crate::models::Driver;
use crate::storage::{SessionBackend, SessionKey, UserDirectory};
use serde_json::Value;

/// Session key holding the authenticated driver id.
pub const AUTH_USER_KEY: &str = "_auth_user_id";

/// Path of the login page.
pub const LOGIN_PATH: &str = "/accounts/login/";

/// Records `driver` as the session's user and returns the new session key.
pub fn login(
    sessions: &dyn SessionBackend,
    key: &SessionKey,
    driver: &Driver,
) -> Result<SessionKey> {
    let key = sessions.cycle_key(key)?;
    sessions.set(&key, AUTH_USER_KEY, Value::from(driver.id))?;
    tracing::info!(driver_id = driver.id, "Driver logged in");
    Ok(key)
}

/// Ends the session, discarding all of its data.
pub fn logout(sessions: &dyn SessionBackend, key: &SessionKey) -> Result<()> {
    sessions.delete(key)?;
    tracing::info!("Session logged out");
    Ok(())
}

/// Resolves the session's user.
///
/// Returns `None` for anonymous sessions and for sessions whose driver no
/// longer exists.
pub fn current_user(
    sessions: &dyn SessionBackend,
    users: &UserDirectory,
    key: &SessionKey,
) -> Result<Option<Driver>> {
    let Some(id) = sessions.get(key, AUTH_USER_KEY)?.as_ref().and_then(Value::as_i64) else {
        return Ok(None);
    };
    users.find(id)
}

/// Returns `next` if it is a local absolute path, otherwise `/`.
///
/// Rejects scheme-relative (`//host`) and backslash forms so the login form
/// cannot be used as an open redirect.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path
        },
        _ => "/",
    }
}

/// Builds the login URL that returns to `path` afterwards.
///
/// `path` is form-encoded as a whole, so its own query string survives as
/// part of the `next` value.
#[must_use]
pub fn login_redirect(path: &str) -> String {
    let next: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={next}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewDriver;
    use crate::security::MIN_HASH_COST;
    use crate::services::visits::tests::MemorySessions;
    use crate::storage::Database;
    use serde_json::json;
    use test_case::test_case;

    fn setup() -> (MemorySessions, UserDirectory, Driver) {
        let users =
            UserDirectory::new(Database::in_memory().unwrap()).with_hash_cost(MIN_HASH_COST);
        let driver = users
            .register(&NewDriver::new("TestUserName", "Test1234", "ABC12345"))
            .unwrap();
        (MemorySessions::default(), users, driver)
    }

    #[test]
    fn test_login_cycles_key_and_keeps_data() {
        let (sessions, users, driver) = setup();
        let anonymous = sessions.create().unwrap();
        sessions.set(&anonymous, "num_visits", json!(3)).unwrap();

        let key = login(&sessions, &anonymous, &driver).unwrap();

        assert_ne!(key, anonymous);
        assert!(!sessions.exists(&anonymous).unwrap());
        assert_eq!(sessions.get(&key, "num_visits").unwrap(), Some(json!(3)));
        assert_eq!(current_user(&sessions, &users, &key).unwrap(), Some(driver));
    }

    #[test]
    fn test_anonymous_session_has_no_user() {
        let (sessions, users, _) = setup();
        let key = sessions.create().unwrap();
        assert_eq!(current_user(&sessions, &users, &key).unwrap(), None);
    }

    #[test]
    fn test_logout_forgets_user() {
        let (sessions, users, driver) = setup();
        let key = sessions.create().unwrap();
        let key = login(&sessions, &key, &driver).unwrap();

        logout(&sessions, &key).unwrap();
        assert!(!sessions.exists(&key).unwrap());
        assert_eq!(current_user(&sessions, &users, &key).unwrap(), None);
    }

    #[test]
    fn test_unknown_driver_id_is_anonymous() {
        let (sessions, users, _) = setup();
        let key = sessions.create().unwrap();
        sessions.set(&key, AUTH_USER_KEY, json!(999)).unwrap();
        assert_eq!(current_user(&sessions, &users, &key).unwrap(), None);
    }

    #[test_case(Some("/cars/"), "/cars/" ; "local path")]
    #[test_case(Some("/cars/?search_query=a"), "/cars/?search_query=a" ; "with query")]
    #[test_case(Some("//evil.example"), "/" ; "scheme relative")]
    #[test_case(Some("https://evil.example"), "/" ; "absolute url")]
    #[test_case(Some("/\\evil.example"), "/" ; "backslash")]
    #[test_case(None, "/" ; "absent")]
    fn test_safe_next(next: Option<&str>, expected: &str) {
        assert_eq!(safe_next(next), expected);
    }

    #[test_case("/drivers/", "/accounts/login/?next=%2Fdrivers%2F" ; "plain path")]
    #[test_case(
        "/cars/?search_query=a b&x=1",
        "/accounts/login/?next=%2Fcars%2F%3Fsearch_query%3Da+b%26x%3D1" ;
        "query string"
    )]
    #[test_case("/cars/?search_query=a%20b", "/accounts/login/?next=%2Fcars%2F%3Fsearch_query%3Da%2520b" ; "already encoded")]
    #[test_case("/drivers/?search_query=Škoda", "/accounts/login/?next=%2Fdrivers%2F%3Fsearch_query%3D%C5%A0koda" ; "non ascii")]
    fn test_login_redirect_encodes_path(path: &str, expected: &str) {
        assert_eq!(login_redirect(path), expected);
    }

    #[test]
    fn test_login_redirect_decodes_back_to_path() {
        let url = login_redirect("/cars/?search_query=a b&x=1");
        let query = url.split_once('?').map(|(_, q)| q).unwrap();
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        assert_eq!(
            pairs,
            vec![("next".to_string(), "/cars/?search_query=a b&x=1".to_string())]
        );
    }
}
