use chrono::{DateTime, Duration, Utc};
use oauth2::{AuthorizationCode, CsrfToken, Scope, TokenResponse};
use tracing::info;
use url::Url;

use crate::config::LightroomConfig;
use crate::db::TokenUpsert;
use crate::error::{ApertureError, OauthError};
use crate::oauth_utils::{ImsTokenResponse, build_ims_client};

use super::token::TokenCipher;

/// IMS omits `expires_in` on some grants; assume the documented 24h lifetime.
const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

pub struct AdobeOauthEndpoints;

impl AdobeOauthEndpoints {
    /// Authorize URL plus the CSRF token the callback must echo back.
    ///
    /// IMS expects scopes comma separated in a single `scope` parameter.
    pub fn build_authorize_url(cfg: &LightroomConfig) -> Result<(Url, CsrfToken), ApertureError> {
        let client = build_ims_client(cfg)?;
        let (url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(cfg.oauth_scopes.join(",")))
            .url();
        Ok((url, csrf))
    }

    pub async fn exchange_authorization_code(
        cfg: &LightroomConfig,
        code: AuthorizationCode,
        http: &reqwest::Client,
    ) -> Result<ImsTokenResponse, ApertureError> {
        let client = build_ims_client(cfg)?;
        let token = client.exchange_code(code).request_async(http).await?;
        info!(
            expires_in = ?token.expires_in(),
            has_refresh_token = token.refresh_token().is_some(),
            "Adobe IMS code exchange succeeded"
        );
        Ok(token)
    }
}

/// Row to persist for an IMS token response, sealed with `cipher`.
pub fn stored_token(
    token: &ImsTokenResponse,
    cipher: &TokenCipher,
    now: DateTime<Utc>,
) -> Result<TokenUpsert, ApertureError> {
    let access = token.access_token().secret();
    if access.trim().is_empty() {
        return Err(
            OauthError::flow("EMPTY_ACCESS_TOKEN", "IMS returned an empty access token").into(),
        );
    }

    let lifetime = token
        .expires_in()
        .and_then(|d| Duration::from_std(d).ok())
        .unwrap_or_else(|| Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS));

    cipher.token_upsert(
        access,
        token.refresh_token().map(|rt| rt.secret().as_str()),
        now + lifetime,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LightroomConfig {
        LightroomConfig {
            api_key: "client-123".to_string(),
            ..LightroomConfig::default()
        }
    }

    #[test]
    fn authorize_url_carries_client_and_scopes() {
        let (url, csrf) = AdobeOauthEndpoints::build_authorize_url(&cfg()).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone());

        assert_eq!(get("client_id").as_deref(), Some("client-123"));
        assert_eq!(get("response_type").as_deref(), Some("code"));
        assert_eq!(get("state").as_deref(), Some(csrf.secret().as_str()));
        assert_eq!(
            get("scope").as_deref(),
            Some("openid,AdobeID,lr_partner_apis,offline_access")
        );
    }

    #[test]
    fn stored_token_uses_expires_in() {
        let token: ImsTokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "at-1",
            "refresh_token": "rt-1",
            "token_type": "bearer",
            "expires_in": 3600
        }))
        .unwrap();
        let now = Utc::now();
        let row = stored_token(&token, &TokenCipher::plaintext(), now).unwrap();
        assert_eq!(row.access_token, "at-1");
        assert_eq!(row.refresh_token.as_deref(), Some("rt-1"));
        assert!(!row.access_token_encrypted);
        assert_eq!(row.expires_at, now + Duration::seconds(3600));
    }
}
