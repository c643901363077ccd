use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr};

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// HTTP server listen address (e.g., "0.0.0.0", "127.0.0.1").
    /// TOML: `basic.listen_addr`. Default: `0.0.0.0`.
    #[serde(default = "default_listen_ip")]
    pub listen_addr: IpAddr,

    /// HTTP server listen port.
    /// TOML: `basic.listen_port`. Default: `8188`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Database URL for SQLite.
    /// TOML: `basic.database_url`. Default: `sqlite://data.db`.
    #[serde(default)]
    pub database_url: String,

    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default)]
    pub loglevel: String,

    /// Admin password for the session login (required, non-empty).
    /// TOML: `basic.admin_password`.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_string_lax")]
    pub admin_password: String,

    /// Secret the private session cookie key is derived from (required, >= 32 chars).
    /// TOML: `basic.session_secret`.
    #[serde(default)]
    pub session_secret: String,

    /// Admin session lifetime in hours.
    /// TOML: `basic.session_ttl_hours`. Default: `168`.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,

    /// Shared secret accepted in `x-webhook-secret` for sync triggers. Empty disables webhooks.
    /// TOML: `basic.webhook_secret`.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_string_lax")]
    pub webhook_secret: String,

    /// Drop the `Secure` flag on cookies (plain-HTTP local development only).
    /// TOML: `basic.insecure_cookie`. Default: `false`.
    #[serde(default)]
    pub insecure_cookie: bool,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_ip(),
            listen_port: default_listen_port(),
            database_url: "sqlite://data.db".to_string(),
            loglevel: "info".to_string(),
            // No insecure defaults. `Config::from_toml()` enforces these.
            admin_password: "".to_string(),
            session_secret: "".to_string(),
            session_ttl_hours: default_session_ttl_hours(),
            webhook_secret: "".to_string(),
            insecure_cookie: false,
        }
    }
}

impl BasicConfig {
    pub fn webhook_secret(&self) -> Option<&str> {
        Some(self.webhook_secret.as_str()).filter(|s| !s.trim().is_empty())
    }
}

fn deserialize_string_lax<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom("expected a string or a number")),
    }
}

/// Default IP address for the HTTP server listen address.
fn default_listen_ip() -> IpAddr {
    Ipv4Addr::new(0, 0, 0, 0).into()
}

/// Default port for the HTTP server.
fn default_listen_port() -> u16 {
    8188
}

fn default_session_ttl_hours() -> u64 {
    24 * 7
}
