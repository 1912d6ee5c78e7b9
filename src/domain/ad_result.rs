//! Served-ad metadata as the ad library exposes it
//!
//! These structures are owned by the library and only read by the frame. Field
//! names follow the library's camelCase JSON so a real result map can be
//! deserialized directly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw result markup per placement name (`ados_results`). A non-empty map is
/// the signal that the library finished loading.
pub type LoadResults = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdResult {
    pub id: u64,
    pub creative: Creative,
    pub flight: Flight,
    #[serde(default)]
    pub ecpm: Option<f64>,
    #[serde(default)]
    pub companions: Vec<Companion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creative {
    pub id: u64,
    pub ad_type: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: u64,
    pub priority_id: u64,
    #[serde(default)]
    pub rate_type: Option<u32>,
    pub campaign: Campaign,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Companion {
    pub id: u64,
    pub ad_type: u32,
}

/// Payload of the `e` parameter on the impression pixel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImpressionToken {
    #[serde(rename = "mk", default)]
    pub matched_keywords: Vec<String>,
    #[serde(rename = "di")]
    pub impression_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_library_shape() {
        let ad: AdResult = serde_json::from_value(json!({
            "id": 901,
            "creative": {"id": 77, "adType": 5},
            "flight": {"id": 12, "priorityId": 3, "rateType": 2, "campaign": {"id": 4}},
            "ecpm": 1.25,
            "companions": [{"id": 78, "adType": 8}]
        }))
        .unwrap();

        assert_eq!(ad.flight.campaign.id, 4);
        assert_eq!(ad.flight.rate_type, Some(2));
        assert_eq!(ad.companions[0].ad_type, 8);
    }

    #[test]
    fn optional_metrics_may_be_absent() {
        let ad: AdResult = serde_json::from_value(json!({
            "id": 1,
            "creative": {"id": 2, "adType": 5},
            "flight": {"id": 3, "priorityId": 4, "campaign": {"id": 5}}
        }))
        .unwrap();
        assert_eq!(ad.ecpm, None);
        assert!(ad.companions.is_empty());
    }
}
