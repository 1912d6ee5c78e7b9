//! Outbound payloads for the parent page
//!
//! One core handles both payload layouts. `Basic` forwards what the fragment
//! carried; `Instrumented` canonicalizes keywords so the parent can match them
//! against the keywords the ad server reports back. Property values leave the
//! frame percent-encoded in both layouts, the same way the library receives them.

use serde_json::Value;

use crate::domain::ad_result::{AdResult, ImpressionToken};
use crate::domain::constants::{fragment, messaging};
use crate::domain::events::{
    OutboundRequestPayload, OutboundResponsePayload, PayloadShape, PlacementSummary,
};
use crate::domain::frame_config::{Properties, RequestConfig};
use crate::domain::placement::PlacementRequest;
use crate::infrastructure::AdServingSettings;

use super::placement_builder::encode_properties;

/// Properties forwarded by the instrumented payload
const FORWARDED_PROPERTIES: [&str; 2] = [fragment::AGE_HOURS_PROPERTY, fragment::PERCENTAGE_PROPERTY];

/// Lowercases and sorts keywords. Applying it twice changes nothing.
pub fn canonical_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    let mut canonical: Vec<String> = keywords
        .iter()
        .map(|keyword| keyword.as_ref().to_lowercase())
        .collect();
    canonical.sort();
    canonical
}

fn forwarded_properties(properties: &Properties) -> Properties {
    properties
        .iter()
        .filter(|(key, _)| FORWARDED_PROPERTIES.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn encoded(properties: &Properties) -> Properties {
    encode_properties(properties)
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

/// Builds the `request.adzerk` payload from the config and what was registered.
pub fn to_outbound_request(
    config: &RequestConfig,
    placements: &[PlacementRequest],
    shape: PayloadShape,
) -> OutboundRequestPayload {
    match shape {
        PayloadShape::Basic => OutboundRequestPayload {
            keywords: config.keywords.clone(),
            properties: encoded(&config.properties),
            placement_types: Some(placements.iter().map(|p| p.size_code).collect()),
            placements: None,
        },
        PayloadShape::Instrumented => OutboundRequestPayload {
            keywords: config.keywords.as_deref().map(canonical_keywords),
            properties: encoded(&forwarded_properties(&config.properties)),
            placement_types: None,
            placements: Some(
                placements
                    .iter()
                    .map(|p| PlacementSummary {
                        name: p.name().to_string(),
                        types: vec![p.size_code],
                    })
                    .collect(),
            ),
        },
    }
}

/// Builds one `response.adzerk` payload for the ad served under `key`.
///
/// The basic layout only carries the ad identifiers; the instrumented one adds
/// the reporting fields and whatever the impression token yielded.
pub fn to_outbound_response(
    request: &OutboundRequestPayload,
    key: &str,
    ad: &AdResult,
    token: Option<ImpressionToken>,
    settings: &AdServingSettings,
) -> OutboundResponsePayload {
    let mut payload = OutboundResponsePayload {
        request: request.clone(),
        placement_name: format!("{}{key}", messaging::PLACEMENT_NAME_PREFIX),
        campaign_id: ad.flight.campaign.id,
        flight_id: ad.flight.id,
        creative_id: ad.creative.id,
        ad_id: ad.id,
        priority_id: ad.flight.priority_id,
        ad_type: ad.creative.ad_type,
        priority_name: None,
        ecpm: None,
        rate_type: None,
        companion_ids: None,
        matched_keywords: None,
        impression_id: None,
    };

    if settings.payload_shape == PayloadShape::Instrumented {
        payload.priority_name = settings
            .priority_name(ad.flight.priority_id)
            .map(str::to_string);
        payload.ecpm = ad.ecpm;
        payload.rate_type = ad.flight.rate_type;
        payload.companion_ids = Some(ad.companions.iter().map(|c| c.id).collect());
        if let Some(token) = token {
            payload.matched_keywords = Some(canonical_keywords(&token.matched_keywords));
            payload.impression_id = Some(token.impression_id);
        }
    }

    payload
}
