//! Placement types and registration requests

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// Ad slot kinds the frame knows how to request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PlacementType {
    Main,
    Top,
    Sponsorship,
}

impl PlacementType {
    /// Default registration table, in registration order.
    pub const ALL: [Self; 3] = [Self::Main, Self::Top, Self::Sponsorship];

    /// Table used by the double-sidebar experiment (no sponsorship slot).
    pub const DOUBLE_SIDEBAR: [Self; 2] = [Self::Main, Self::Top];

    /// Ad-size code registered with the library (300x250 = 5, sponsorship = 8)
    pub const fn size_code(self) -> u32 {
        match self {
            Self::Main | Self::Top => 5,
            Self::Sponsorship => 8,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Top => "top",
            Self::Sponsorship => "sponsorship",
        }
    }

    /// `frame_id` property stamped on placements built from the default table
    pub const fn frame_id(self) -> &'static str {
        match self {
            Self::Main => "ad_main",
            Self::Top => "ad_main_top",
            Self::Sponsorship => "ad_main_sponsorship",
        }
    }

    /// Types to register when no explicit placements are requested
    pub fn default_table(double_sidebar: bool) -> &'static [Self] {
        if double_sidebar {
            &Self::DOUBLE_SIDEBAR
        } else {
            &Self::ALL
        }
    }
}

impl fmt::Display for PlacementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlacementType(pub String);

impl fmt::Display for UnknownPlacementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown placement type '{}'", self.0)
    }
}

impl std::error::Error for UnknownPlacementType {}

impl FromStr for PlacementType {
    type Err = UnknownPlacementType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "main" => Ok(Self::Main),
            "top" => Ok(Self::Top),
            "sponsorship" => Ok(Self::Sponsorship),
            other => Err(UnknownPlacementType(other.to_string())),
        }
    }
}

/// Delivery zone id from the zone table
pub type ZoneId = u64;

/// One registration against the ad library. Property values are already
/// percent-encoded because the library forwards them verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRequest {
    pub placement_type: PlacementType,
    pub size_code: u32,
    pub creative_id_override: Option<String>,
    pub zone: Option<ZoneId>,
    pub properties: BTreeMap<String, String>,
}

impl PlacementRequest {
    pub fn new(placement_type: PlacementType) -> Self {
        Self {
            placement_type,
            size_code: placement_type.size_code(),
            creative_id_override: None,
            zone: None,
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_creative(mut self, creative_id: impl Into<String>) -> Self {
        self.creative_id_override = Some(creative_id.into());
        self
    }

    #[must_use]
    pub const fn with_zone(mut self, zone: Option<ZoneId>) -> Self {
        self.zone = zone;
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    /// Placement name used by the library as the result key.
    pub const fn name(&self) -> &'static str {
        self.placement_type.as_str()
    }
}
