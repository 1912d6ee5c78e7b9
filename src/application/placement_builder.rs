//! Placement registration against the ad library

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::constants::{fragment, zones};
use crate::domain::frame_config::{Properties, RequestConfig};
use crate::domain::placement::{PlacementRequest, PlacementType};
use crate::infrastructure::{AdLibrary, AdServingSettings};
use crate::utils::{encode_uri_component, js_string};

/// Stringifies and percent-encodes every property value. The library
/// forwards values verbatim, so this happens once per placement.
pub fn encode_properties(properties: &Properties) -> BTreeMap<String, String> {
    properties
        .iter()
        .map(|(key, value)| (key.clone(), encode_uri_component(&js_string(value))))
        .collect()
}

/// Splits `main:123,sponsorship:456` into typed overrides.
pub fn parse_overrides(raw: &str) -> Vec<(PlacementType, Option<String>)> {
    raw.split(',')
        .filter(|pair| !pair.trim().is_empty())
        .filter_map(|pair| {
            let (type_name, creative) = match pair.split_once(':') {
                Some((type_name, creative)) => (type_name, Some(creative.trim())),
                None => (pair, None),
            };
            match type_name.parse::<PlacementType>() {
                Ok(placement_type) => Some((
                    placement_type,
                    creative.filter(|c| !c.is_empty()).map(str::to_string),
                )),
                Err(e) => {
                    warn!("Skipping placement override '{}': {}", pair, e);
                    None
                }
            }
        })
        .collect()
}

pub struct PlacementBuilder {
    settings: Arc<AdServingSettings>,
}

impl PlacementBuilder {
    pub fn new(settings: Arc<AdServingSettings>) -> Self {
        Self { settings }
    }

    /// Placements to register for `config`, in registration order.
    pub fn build(&self, config: &RequestConfig) -> Vec<PlacementRequest> {
        match config.placement_overrides() {
            Some(raw) => self.build_overrides(config, raw),
            None => self.build_default_table(config),
        }
    }

    fn build_overrides(&self, config: &RequestConfig, raw: &str) -> Vec<PlacementRequest> {
        let properties = encode_properties(&config.properties);
        parse_overrides(raw)
            .into_iter()
            .map(|(placement_type, creative)| {
                let request = PlacementRequest::new(placement_type).with_properties(properties.clone());
                match creative {
                    Some(creative) => request.with_creative(creative),
                    None => request,
                }
            })
            .collect()
    }

    fn build_default_table(&self, config: &RequestConfig) -> Vec<PlacementRequest> {
        let double_sidebar = config.double_sidebar();

        PlacementType::default_table(double_sidebar)
            .iter()
            .map(|&placement_type| {
                let mut properties = config.properties.clone();
                properties.insert(
                    fragment::FRAME_ID_PROPERTY.to_string(),
                    placement_type.frame_id().into(),
                );

                let zone = double_sidebar
                    .then(|| self.settings.zone_id(Self::zone_name(placement_type)))
                    .flatten();

                PlacementRequest::new(placement_type)
                    .with_zone(zone)
                    .with_properties(encode_properties(&properties))
            })
            .collect()
    }

    const fn zone_name(placement_type: PlacementType) -> &'static str {
        match placement_type {
            PlacementType::Top => zones::ABOVE_THE_FOLD,
            PlacementType::Main | PlacementType::Sponsorship => zones::BELOW_THE_FOLD,
        }
    }

    /// Builds and registers every placement, returning what was registered.
    pub fn register(&self, library: &dyn AdLibrary, config: &RequestConfig) -> Vec<PlacementRequest> {
        let placements = self.build(config);
        for placement in &placements {
            debug!(
                placement = placement.name(),
                size_code = placement.size_code,
                creative = ?placement.creative_id_override,
                zone = ?placement.zone,
                "Registering placement"
            );
            library.add_placement(self.settings.network_id, self.settings.site_id, placement);
        }
        placements
    }
}
