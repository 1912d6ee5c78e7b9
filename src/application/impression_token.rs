//! Impression token extraction
//!
//! Served markup embeds an impression pixel `https://<domain>/i.gif?e=<token>`
//! where the token is URL-safe base64 JSON. Markup delivered as a script
//! string escapes its slashes, so `\/` is accepted wherever `/` is.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::domain::ad_result::ImpressionToken;

/// `e` parameter inside a pixel query string
static TOKEN_PARAM: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?:^|[&;])e=([A-Za-z0-9_-]+=*)")
        .map_err(|e| warn!("Invalid token parameter pattern: {}", e))
        .ok()
});

/// Restores the standard alphabet and padding of a URL-safe base64 token.
pub fn restore_base64(token: &str) -> String {
    let mut restored: String = token
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while restored.len() % 4 != 0 {
        restored.push('=');
    }
    restored
}

/// Decodes a raw token. Any failure yields `None`.
pub fn decode_token(token: &str) -> Option<ImpressionToken> {
    let bytes = match STANDARD.decode(restore_base64(token)) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Dropping undecodable impression token: {}", e);
            return None;
        }
    };

    serde_json::from_slice(&bytes)
        .map_err(|e| debug!("Dropping unreadable impression token: {}", e))
        .ok()
}

/// Finds impression tokens served from one engine domain.
#[derive(Debug, Clone)]
pub struct ImpressionTokenDecoder {
    pixel: Option<Regex>,
}

impl ImpressionTokenDecoder {
    pub fn new(domain: &str) -> Self {
        let pattern = format!(
            r#"{}\\?/i\.gif\?([^"'\s<>]*)"#,
            regex::escape(domain)
        );
        let pixel = Regex::new(&pattern)
            .map_err(|e| warn!(domain, "Cannot build impression pixel pattern: {}", e))
            .ok();
        Self { pixel }
    }

    /// Raw `e` parameter of the first impression pixel in `markup`.
    pub fn find_token<'a>(&self, markup: &'a str) -> Option<&'a str> {
        let pixel = self.pixel.as_ref()?;
        let param = TOKEN_PARAM.as_ref()?;

        pixel.captures_iter(markup).find_map(|pixel_match| {
            let query = pixel_match.get(1)?.as_str();
            param
                .captures(query)
                .and_then(|token| token.get(1))
                .map(|token| token.as_str())
        })
    }

    /// Extracts and decodes the token, if any.
    pub fn decode(&self, markup: &str) -> Option<ImpressionToken> {
        self.find_token(markup).and_then(decode_token)
    }
}
