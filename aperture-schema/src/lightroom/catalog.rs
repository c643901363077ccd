use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `GET /v2/catalog` response: the authenticated account's single catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Catalog {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    #[serde(default)]
    pub payload: CatalogPayload,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
