use serde::{Deserialize, Serialize};
use url::Url;

/// Adobe Lightroom API and IMS OAuth configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LightroomConfig {
    /// Lightroom API base URL.
    /// TOML: `lightroom.api_url`. Default: `https://lr.adobe.io/`.
    #[serde(default = "default_api_url")]
    pub api_url: Url,

    /// Adobe developer console API key, sent as `X-API-Key` and used as OAuth client id.
    /// TOML: `lightroom.api_key`.
    #[serde(default)]
    pub api_key: String,

    /// OAuth client secret for the IMS token exchange.
    /// TOML: `lightroom.client_secret`.
    #[serde(default)]
    pub client_secret: String,

    /// TOML: `lightroom.oauth_auth_url`.
    #[serde(default = "default_oauth_auth_url")]
    pub oauth_auth_url: Url,

    /// TOML: `lightroom.oauth_token_url`.
    #[serde(default = "default_oauth_token_url")]
    pub oauth_token_url: Url,

    /// Must match the redirect URI registered for the API key.
    /// TOML: `lightroom.oauth_redirect_url`.
    #[serde(default = "default_oauth_redirect_url")]
    pub oauth_redirect_url: Url,

    /// TOML: `lightroom.oauth_scopes`.
    #[serde(default = "default_oauth_scopes")]
    pub oauth_scopes: Vec<String>,

    /// Optional upstream HTTP proxy. If set, used for reqwest clients.
    /// TOML: `lightroom.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Allow HTTP/2 multiplexing for reqwest clients; disabled forces HTTP/1.
    /// TOML: `lightroom.enable_multiplexing`. Default: `true`.
    #[serde(default = "default_enable_multiplexing")]
    pub enable_multiplexing: bool,

    /// Outbound Lightroom API requests per second.
    /// TOML: `lightroom.request_tps`. Default: `10`.
    #[serde(default = "default_request_tps")]
    pub request_tps: usize,

    /// Secret used to encrypt stored OAuth tokens. Empty stores them in plaintext.
    /// TOML: `lightroom.token_encryption_key`.
    #[serde(default)]
    pub token_encryption_key: String,
}

impl Default for LightroomConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            client_secret: String::new(),
            oauth_auth_url: default_oauth_auth_url(),
            oauth_token_url: default_oauth_token_url(),
            oauth_redirect_url: default_oauth_redirect_url(),
            oauth_scopes: default_oauth_scopes(),
            proxy: None,
            enable_multiplexing: default_enable_multiplexing(),
            request_tps: default_request_tps(),
            token_encryption_key: String::new(),
        }
    }
}

fn default_api_url() -> Url {
    Url::parse("https://lr.adobe.io/").expect("invalid default Lightroom API url")
}

fn default_oauth_auth_url() -> Url {
    Url::parse("https://ims-na1.adobelogin.com/ims/authorize/v2")
        .expect("invalid default IMS authorize url")
}

fn default_oauth_token_url() -> Url {
    Url::parse("https://ims-na1.adobelogin.com/ims/token/v3").expect("invalid default IMS token url")
}

fn default_oauth_redirect_url() -> Url {
    Url::parse("http://localhost:8188/api/auth/adobe/callback")
        .expect("invalid default OAuth redirect url")
}

fn default_oauth_scopes() -> Vec<String> {
    ["openid", "AdobeID", "lr_partner_apis", "offline_access"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_enable_multiplexing() -> bool {
    true
}

fn default_request_tps() -> usize {
    10
}
