//! Messages exchanged with the parent page
//!
//! The frame talks to its parent through two named events and two ad hoc
//! commands. Payload types derive `TS` so the page script can share their shape.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use ts_rs::TS;

use crate::domain::constants::messaging;
use crate::domain::frame_config::Properties;
use crate::domain::placement::PlacementType;

/// Which payload layout the frame emits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadShape {
    /// Verbatim keywords, full encoded property map, flat list of size codes
    Basic,
    /// Canonical keywords, whitelisted properties, per-placement summaries and
    /// the extra ad fields used for keyword-match reporting
    #[default]
    Instrumented,
}

/// Placement summary carried by instrumented payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlacementSummary {
    pub name: String,
    pub types: Vec<u32>,
}

/// `request.adzerk` payload, sent once before results exist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OutboundRequestPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub keywords: Option<Vec<String>>,

    pub properties: Properties,

    /// Basic shape only
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub placement_types: Option<Vec<u32>>,

    /// Instrumented shape only
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub placements: Option<Vec<PlacementSummary>>,
}

/// `response.adzerk` payload, one per served ad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OutboundResponsePayload {
    #[serde(flatten)]
    pub request: OutboundRequestPayload,

    pub placement_name: String,
    pub campaign_id: u64,
    pub flight_id: u64,
    pub creative_id: u64,
    pub ad_id: u64,
    pub priority_id: u64,
    pub ad_type: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub priority_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub ecpm: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub rate_type: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub companion_ids: Option<Vec<u64>>,

    /// Keywords the ad server matched, lowercased and sorted
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub matched_keywords: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub impression_id: Option<String>,
}

impl OutboundResponsePayload {
    /// Placement key the payload was built from (`banner_main` -> `main`).
    pub fn placement_key(&self) -> &str {
        self.placement_name
            .strip_prefix(messaging::PLACEMENT_NAME_PREFIX)
            .unwrap_or(&self.placement_name)
    }
}

/// Everything the frame sends to its parent
///
/// Events go out as `{"event": .., "payload": ..}`. Commands go out as the bare
/// command string; `target_origin` only scopes delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameMessage {
    Request(OutboundRequestPayload),

    Response(Box<OutboundResponsePayload>),

    /// Asks the parent to materialize a companion frame
    CreateAdFrame {
        placement: PlacementType,
        target_origin: String,
    },
}

impl FrameMessage {
    /// Name the parent page dispatches on.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Request(_) => messaging::REQUEST_EVENT,
            Self::Response(_) => messaging::RESPONSE_EVENT,
            Self::CreateAdFrame { placement, .. } => match placement {
                PlacementType::Main => "ados.createAdFrame:main",
                PlacementType::Top => "ados.createAdFrame:top",
                PlacementType::Sponsorship => "ados.createAdFrame:sponsorship",
            },
        }
    }

    pub const fn is_command(&self) -> bool {
        matches!(self, Self::CreateAdFrame { .. })
    }
}

impl Serialize for FrameMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Request(payload) => serialize_event(serializer, self.event_name(), payload),
            Self::Response(payload) => serialize_event(serializer, self.event_name(), payload),
            Self::CreateAdFrame { .. } => serializer.serialize_str(self.event_name()),
        }
    }
}

fn serialize_event<S, T>(serializer: S, event: &str, payload: &T) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let mut state = serializer.serialize_struct("FrameMessage", 2)?;
    state.serialize_field("event", event)?;
    state.serialize_field("payload", payload)?;
    state.end()
}

/// Ad markup published by the frame that called the library, consumed verbatim
/// by its double-sidebar sibling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedRenderPayload {
    pub markup: HashMap<String, String>,
}

impl SharedRenderPayload {
    pub fn markup_for(&self, placement: PlacementType) -> Option<&str> {
        self.markup.get(placement.as_str()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_names_follow_the_placement() {
        let message = FrameMessage::CreateAdFrame {
            placement: PlacementType::Sponsorship,
            target_origin: "https://www.reddit.com".to_string(),
        };
        assert_eq!(message.event_name(), "ados.createAdFrame:sponsorship");
        assert!(message.event_name().starts_with(messaging::CREATE_AD_FRAME_PREFIX));
        assert!(message.is_command());
        assert_eq!(
            FrameMessage::Request(OutboundRequestPayload::default()).event_name(),
            "request.adzerk"
        );
    }

    #[test]
    fn basic_request_serializes_without_instrumented_fields() {
        let payload = OutboundRequestPayload {
            keywords: Some(vec!["Foo".to_string()]),
            properties: Properties::new(),
            placement_types: Some(vec![5, 5, 8]),
            placements: None,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"keywords": ["Foo"], "properties": {}, "placement_types": [5, 5, 8]})
        );
    }

    #[test]
    fn response_flattens_request_fields() {
        let payload = OutboundResponsePayload {
            request: OutboundRequestPayload {
                keywords: Some(vec!["foo".to_string()]),
                properties: Properties::new(),
                placement_types: None,
                placements: Some(vec![PlacementSummary {
                    name: "main".to_string(),
                    types: vec![5],
                }]),
            },
            placement_name: "banner_main".to_string(),
            campaign_id: 1,
            flight_id: 2,
            creative_id: 3,
            ad_id: 4,
            priority_id: 5,
            ad_type: 5,
            priority_name: None,
            ecpm: None,
            rate_type: None,
            companion_ids: None,
            matched_keywords: Some(vec!["foo".to_string()]),
            impression_id: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["keywords"], json!(["foo"]));
        assert_eq!(value["placements"][0]["name"], "main");
        assert_eq!(value["ad_id"], 4);
        assert!(value.get("impression_id").is_none());
        assert_eq!(payload.placement_key(), "main");
    }

    #[test]
    fn messages_serialize_with_event_tag() {
        let message = FrameMessage::Request(OutboundRequestPayload::default());
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["event"], "request.adzerk");
        assert_eq!(value["payload"]["properties"], json!({}));
    }

    #[test]
    fn commands_serialize_as_the_bare_command_string() {
        for (placement, expected) in [
            (PlacementType::Top, "ados.createAdFrame:top"),
            (PlacementType::Sponsorship, "ados.createAdFrame:sponsorship"),
        ] {
            let message = FrameMessage::CreateAdFrame {
                placement,
                target_origin: "https://www.reddit.com".to_string(),
            };
            assert_eq!(serde_json::to_value(&message).unwrap(), json!(expected));
        }
        assert_eq!(
            serde_json::to_string(&FrameMessage::CreateAdFrame {
                placement: PlacementType::Top,
                target_origin: "*".to_string(),
            })
            .unwrap(),
            r#""ados.createAdFrame:top""#
        );
    }

    #[test]
    fn responses_serialize_with_event_tag() {
        let message = FrameMessage::Response(Box::new(OutboundResponsePayload {
            request: OutboundRequestPayload::default(),
            placement_name: "banner_top".to_string(),
            campaign_id: 1,
            flight_id: 2,
            creative_id: 3,
            ad_id: 4,
            priority_id: 5,
            ad_type: 5,
            priority_name: None,
            ecpm: None,
            rate_type: None,
            companion_ids: None,
            matched_keywords: None,
            impression_id: None,
        }));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["event"], "response.adzerk");
        assert_eq!(value["payload"]["placement_name"], "banner_top");
        assert_eq!(value["payload"]["ad_id"], 4);
    }

    #[test]
    fn optional_payload_fields_export_as_optional() {
        let decl = OutboundRequestPayload::decl();
        assert!(decl.contains("keywords?:"), "{decl}");
        assert!(decl.contains("placement_types?:"), "{decl}");
        assert!(decl.contains("placements?:"), "{decl}");
    }
}
