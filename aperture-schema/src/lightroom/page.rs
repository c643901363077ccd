use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Links {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Link>,

    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Link>,
}

/// One page of a Lightroom collection response.
///
/// `links.next.href` is relative to `base` when present, otherwise to the request URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(default = "Vec::new")]
    pub resources: Vec<T>,

    #[serde(default)]
    pub links: Links,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            base: None,
            resources: Vec::new(),
            links: Links::default(),
        }
    }
}

impl<T> Page<T> {
    pub fn next_href(&self) -> Option<&str> {
        self.links
            .next
            .as_ref()
            .map(|link| link.href.as_str())
            .filter(|href| !href.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_resources_and_links_default_to_empty() {
        let page: Page<serde_json::Value> = serde_json::from_value(json!({})).unwrap();
        assert!(page.resources.is_empty());
        assert!(page.next_href().is_none());
    }

    #[test]
    fn blank_next_href_is_treated_as_last_page() {
        let page: Page<serde_json::Value> = serde_json::from_value(json!({
            "resources": [],
            "links": { "next": { "href": "  " } }
        }))
        .unwrap();
        assert!(page.next_href().is_none());
    }
}
