use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

pub const SESSION_COOKIE: &str = "session";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub const INSTALLATION_COOKIE: &str = "github_installation_id";

const SESSION_TTL_DAYS: i64 = 7;
const OAUTH_STATE_TTL_MINUTES: i64 = 10;
const INSTALLATION_TTL_DAYS: i64 = 7;

fn scoped(name: &'static str, value: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    scoped(SESSION_COOKIE, token, secure, Duration::days(SESSION_TTL_DAYS))
}

pub fn clear_session_cookie() -> Cookie<'static> {
    removal(SESSION_COOKIE)
}

pub fn oauth_state_cookie(state: String, secure: bool) -> Cookie<'static> {
    scoped(
        OAUTH_STATE_COOKIE,
        state,
        secure,
        Duration::minutes(OAUTH_STATE_TTL_MINUTES),
    )
}

pub fn clear_oauth_state_cookie() -> Cookie<'static> {
    removal(OAUTH_STATE_COOKIE)
}

pub fn installation_cookie(installation_id: u64, secure: bool) -> Cookie<'static> {
    scoped(
        INSTALLATION_COOKIE,
        installation_id.to_string(),
        secure,
        Duration::days(INSTALLATION_TTL_DAYS),
    )
}

pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub fn oauth_state(jar: &CookieJar) -> Option<String> {
    jar.get(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Installation id remembered from the App setup callback. Unparseable
/// values are ignored.
pub fn installation_id(jar: &CookieJar) -> Option<u64> {
    jar.get(INSTALLATION_COOKIE)
        .and_then(|c| c.value().trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let c = session_cookie("tok".into(), true);
        assert_eq!(c.name(), "session");
        assert_eq!(c.value(), "tok");
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.secure(), Some(true));
        assert_eq!(c.same_site(), Some(SameSite::Lax));
        assert_eq!(c.path(), Some("/"));
        assert_eq!(c.max_age(), Some(Duration::days(7)));
    }

    #[test]
    fn oauth_state_cookie_lives_ten_minutes() {
        let c = oauth_state_cookie("abc".into(), false);
        assert_eq!(c.name(), "oauth_state");
        assert_eq!(c.secure(), Some(false));
        assert_eq!(c.max_age(), Some(Duration::minutes(10)));
    }

    #[test]
    fn clearing_cookies_expires_them_immediately() {
        for c in [clear_session_cookie(), clear_oauth_state_cookie()] {
            assert_eq!(c.value(), "");
            assert_eq!(c.max_age(), Some(Duration::ZERO));
            assert_eq!(c.path(), Some("/"));
        }
    }

    #[test]
    fn readers_extract_values_from_jar() {
        let jar = CookieJar::new()
            .add(Cookie::new(SESSION_COOKIE, "a.b.c"))
            .add(Cookie::new(OAUTH_STATE_COOKIE, "nonce"))
            .add(Cookie::new(INSTALLATION_COOKIE, "42"));
        assert_eq!(session_token(&jar).as_deref(), Some("a.b.c"));
        assert_eq!(oauth_state(&jar).as_deref(), Some("nonce"));
        assert_eq!(installation_id(&jar), Some(42));
    }

    #[test]
    fn malformed_installation_cookie_is_ignored() {
        let jar = CookieJar::new().add(Cookie::new(INSTALLATION_COOKIE, "forty-two"));
        assert_eq!(installation_id(&jar), None);
        assert_eq!(session_token(&CookieJar::new()), None);
    }
}
