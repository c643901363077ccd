use std::marker::PhantomData;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::warn;

use super::client_key::client_key;
use crate::error::ApertureError;
use crate::server::rate_limit::ClientRateLimiter;
use crate::server::router::AppState;

/// Selects which limiter of [`AppState`] a [`Throttle`] uses.
pub trait LimiterKind: Send + Sync + 'static {
    const NAME: &'static str;

    fn limiter(state: &AppState) -> &ClientRateLimiter;
}

pub struct SyncEndpoint;
pub struct StreamEndpoint;
pub struct LoginEndpoint;

impl LimiterKind for SyncEndpoint {
    const NAME: &'static str = "sync";

    fn limiter(state: &AppState) -> &ClientRateLimiter {
        &state.limiters.sync
    }
}

impl LimiterKind for StreamEndpoint {
    const NAME: &'static str = "sync_stream";

    fn limiter(state: &AppState) -> &ClientRateLimiter {
        &state.limiters.stream
    }
}

impl LimiterKind for LoginEndpoint {
    const NAME: &'static str = "login";

    fn limiter(state: &AppState) -> &ClientRateLimiter {
        &state.limiters.login
    }
}

/// Rejects with 429 when the client is inside its cooldown, otherwise records the attempt.
///
/// Place it before the auth extractor so limited requests are dropped before any other work.
pub struct Throttle<K>(PhantomData<K>);

impl<K: LimiterKind> FromRequestParts<AppState> for Throttle<K> {
    type Rejection = ApertureError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = client_key(parts);
        let limiter = K::limiter(state);

        if limiter.is_limited(&key) {
            warn!(endpoint = K::NAME, client = %key, "rate limited");
            return Err(ApertureError::RateLimited);
        }
        limiter.record_attempt(&key);
        Ok(Throttle(PhantomData))
    }
}
