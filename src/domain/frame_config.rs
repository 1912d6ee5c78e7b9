//! Request configuration carried in the ad frame URL fragment
//!
//! The server renders the frame URL as `<base>#<json>`; the frame reads it back
//! through `application::config_resolver`. Every field is optional because a
//! fragment that fails to parse degrades to the empty configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::constants::fragment;
use crate::utils::{encode_fragment, is_truthy, js_string};

/// Loosely typed targeting properties (`age_hours`, `page`, `interests`, ...)
pub type Properties = BTreeMap<String, Value>;

/// Configuration derived from the frame URL fragment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,

    /// Comma-separated `type:creativeId` pairs forced by a sponsor preview
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placements: Option<String>,

    /// Parent page origin used as the postMessage target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl RequestConfig {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn keywords(&self) -> &[String] {
        self.keywords.as_deref().unwrap_or_default()
    }

    /// Whether the double-sidebar experiment is active (JavaScript truthiness).
    pub fn double_sidebar(&self) -> bool {
        self.properties
            .get(fragment::DOUBLE_SIDEBAR_PROPERTY)
            .is_some_and(is_truthy)
    }

    pub fn frame_id(&self) -> Option<String> {
        self.properties
            .get(fragment::FRAME_ID_PROPERTY)
            .filter(|v| !v.is_null())
            .map(js_string)
    }

    /// The top frame of the double-sidebar layout reuses its sibling's ad.
    pub fn is_top_frame(&self) -> bool {
        self.frame_id().as_deref() == Some(fragment::TOP_FRAME_ID)
    }

    /// Placement overrides, `None` when absent or blank.
    pub fn placement_overrides(&self) -> Option<&str> {
        self.placements
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Renders the frame URL the way the server embeds it in the page.
    pub fn to_frame_url(&self, base: &str) -> serde_json::Result<String> {
        Ok(format!("{base}#{}", serde_json::to_string(self)?))
    }

    /// Renders the frame URL as Firefox reports it, with the fragment percent-encoded.
    pub fn to_encoded_frame_url(&self, base: &str) -> serde_json::Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{base}#{}", encode_fragment(&json)))
    }
}
