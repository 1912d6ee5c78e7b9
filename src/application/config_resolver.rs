//! Request configuration from the frame URL fragment
//!
//! `location.hash` is not used as the source because browsers disagree on how
//! much of it they decode (`"#%30"` may come back as `"#0"`). The raw `href` is
//! split instead, and a fragment that still looks percent-encoded (Firefox) is
//! decoded exactly once.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::constants::fragment;
use crate::domain::frame_config::{Properties, RequestConfig};
use crate::infrastructure::RandomSource;
use crate::utils::decode_percent;

/// Everything after the first `#`, or an empty string.
pub fn fragment_of(raw_url: &str) -> &str {
    raw_url.split_once('#').map_or("", |(_, fragment)| fragment)
}

/// Parses the fragment config without touching `percentage`.
///
/// Any failure yields the empty configuration.
pub fn parse_fragment(raw_url: &str) -> RequestConfig {
    let raw = fragment_of(raw_url);
    let hash = if raw.starts_with(fragment::ENCODED_OBJECT_SIGNATURE) {
        decode_percent(raw)
    } else {
        raw.to_string()
    };

    match serde_json::from_str::<RequestConfig>(&hash) {
        Ok(config) => config,
        Err(e) => {
            if !hash.is_empty() {
                warn!("Unreadable fragment config, using empty config: {}", e);
            }
            RequestConfig::default()
        }
    }
}

/// Assigns `percentage` (0..=100) when absent. Returns whether it was assigned.
pub fn assign_percentage(properties: &mut Properties, random: &dyn RandomSource) -> bool {
    if properties.contains_key(fragment::PERCENTAGE_PROPERTY) {
        return false;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percentage = (random.next_f64() * 100.0).round().clamp(0.0, 100.0) as u8;
    properties.insert(
        fragment::PERCENTAGE_PROPERTY.to_string(),
        Value::from(percentage),
    );
    true
}

/// Resolves the frame's request configuration once per load.
pub struct ConfigResolver {
    random: Arc<dyn RandomSource>,
}

impl ConfigResolver {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Parses the fragment and buckets the frame for percentage targeting.
    pub fn resolve(&self, raw_url: &str) -> RequestConfig {
        let mut config = parse_fragment(raw_url);
        if assign_percentage(&mut config.properties, self.random.as_ref()) {
            debug!(
                percentage = ?config.properties.get(fragment::PERCENTAGE_PROPERTY),
                "Assigned targeting percentage"
            );
        }
        config
    }
}
