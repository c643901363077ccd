//! Admin session carried in a private (encrypted) cookie holding its issue time.

use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::{DateTime, Utc};

pub const SESSION_COOKIE: &str = "aperture_session";

pub fn session_cookie(
    issued_at: DateTime<Utc>,
    ttl: chrono::Duration,
    insecure: bool,
) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, issued_at.timestamp().to_string()))
        .path("/")
        .http_only(true)
        .secure(!insecure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .build()
}

/// True when the jar carries a session issued within `ttl` of `now`.
pub fn has_valid_session(
    jar: &PrivateCookieJar,
    ttl: chrono::Duration,
    now: DateTime<Utc>,
) -> bool {
    jar.get(SESSION_COOKIE)
        .and_then(|c| c.value().parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .is_some_and(|issued| issued <= now && now - issued < ttl)
}

pub fn clear_session(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
