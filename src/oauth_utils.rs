use crate::config::LightroomConfig;
use crate::error::ApertureError;
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::{
    AuthUrl, Client as OAuth2Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
    ExtraTokenFields, RedirectUrl, StandardRevocableToken, StandardTokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Non-standard fields of the Adobe IMS token response.
///
/// IMS returns an OpenID `id_token` next to the access token; anything else is kept in `extra`.
#[derive(Clone, Deserialize, Serialize)]
pub struct ImsTokenFields {
    pub id_token: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ExtraTokenFields for ImsTokenFields {}

impl std::fmt::Debug for ImsTokenFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.extra.keys().collect();
        keys.sort();

        f.debug_struct("ImsTokenFields")
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("extra_keys", &keys)
            .finish()
    }
}

pub type ImsTokenResponse = StandardTokenResponse<ImsTokenFields, BasicTokenType>;

/// Authorization-code client for Adobe IMS with auth and token endpoints set.
pub type ImsOauth2Client = OAuth2Client<
    BasicErrorResponse,
    ImsTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Client id is the Lightroom API key; the secret is optional for public clients.
pub fn build_ims_client(cfg: &LightroomConfig) -> Result<ImsOauth2Client, ApertureError> {
    let mut client = OAuth2Client::<
        BasicErrorResponse,
        ImsTokenResponse,
        BasicTokenIntrospectionResponse,
        StandardRevocableToken,
        BasicRevocationErrorResponse,
    >::new(ClientId::new(cfg.api_key.clone()));

    if !cfg.client_secret.trim().is_empty() {
        client = client.set_client_secret(ClientSecret::new(cfg.client_secret.clone()));
    }

    Ok(client
        .set_auth_uri(AuthUrl::from_url(cfg.oauth_auth_url.clone()))
        .set_token_uri(TokenUrl::from_url(cfg.oauth_token_url.clone()))
        .set_redirect_uri(RedirectUrl::from_url(cfg.oauth_redirect_url.clone())))
}
