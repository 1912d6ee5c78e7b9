//! Ad-serving client library seam
//!
//! The real library is a browser script with a synchronous, global-state API:
//! placements are registered, `load` kicks off an asynchronous fetch, and a
//! global result map appears at some later point with no callback. The trait
//! mirrors exactly that surface so the frame logic can be driven against a real
//! binding or the in-memory double below.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::domain::ad_result::{AdResult, Campaign, Creative, Flight, LoadResults};
use crate::domain::placement::PlacementRequest;

pub trait AdLibrary: Send + Sync {
    /// Registers one placement (`ados_add_placement` plus its setters).
    fn add_placement(&self, network_id: u64, site_id: u64, request: &PlacementRequest);

    fn set_keywords(&self, keywords: &[String]);

    /// Asks the library to keep the raw result markup around.
    fn set_write_results(&self, enabled: bool);

    /// Starts the fetch. Results show up later through [`AdLibrary::results`].
    fn load(&self);

    /// Raw markup per placement, `None` until the library finished.
    fn results(&self) -> Option<LoadResults>;

    /// Served ads keyed by placement name. Iteration order is unspecified.
    fn served_ads(&self) -> Vec<(String, AdResult)>;

    /// Engine domain serving the impression pixels.
    fn domain(&self) -> String;
}

/// A placement registration as the library received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub network_id: u64,
    pub site_id: u64,
    pub request: PlacementRequest,
}

#[derive(Debug, Default)]
struct LibraryState {
    registrations: Vec<Registration>,
    keywords: Option<Vec<String>>,
    write_results: bool,
    load_calls: u32,
    results: Option<LoadResults>,
    ads: HashMap<String, AdResult>,
}

/// In-memory library used by tests and the CLI.
///
/// Results stay absent until [`InMemoryAdLibrary::populate`] is called, or,
/// with auto-fill enabled, until `load` serves a house ad per placement.
#[derive(Debug)]
pub struct InMemoryAdLibrary {
    domain: String,
    auto_fill: bool,
    state: Mutex<LibraryState>,
}

impl InMemoryAdLibrary {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            auto_fill: false,
            state: Mutex::new(LibraryState::default()),
        }
    }

    pub fn with_auto_fill(domain: impl Into<String>) -> Self {
        Self {
            auto_fill: true,
            ..Self::new(domain)
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut LibraryState) -> R) -> R {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Publishes results as the real library would once its fetch completes.
    pub fn populate(&self, results: LoadResults, ads: HashMap<String, AdResult>) {
        self.with_state(|state| {
            state.results = Some(results);
            state.ads = ads;
        });
    }

    /// Adds a single served ad and its markup.
    pub fn serve(&self, placement: &str, ad: AdResult, markup: impl Into<String>) {
        self.with_state(|state| {
            state
                .results
                .get_or_insert_with(HashMap::new)
                .insert(placement.to_string(), markup.into());
            state.ads.insert(placement.to_string(), ad);
        });
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.with_state(|state| state.registrations.clone())
    }

    pub fn keywords(&self) -> Option<Vec<String>> {
        self.with_state(|state| state.keywords.clone())
    }

    pub fn writes_results(&self) -> bool {
        self.with_state(|state| state.write_results)
    }

    pub fn load_calls(&self) -> u32 {
        self.with_state(|state| state.load_calls)
    }

    fn fill_house_ads(&self, state: &mut LibraryState) {
        let keywords = state.keywords.clone().unwrap_or_default();
        let mut results = HashMap::new();
        let mut ads = HashMap::new();

        for (index, registration) in (1_u64..).zip(&state.registrations) {
            let name = registration.request.name();
            let creative_id = registration
                .request
                .creative_id_override
                .as_deref()
                .and_then(|id| id.parse().ok())
                .unwrap_or(1000 + index);

            let impression_id = uuid::Uuid::new_v4().simple().to_string();
            results.insert(
                name.to_string(),
                house_ad_markup(&self.domain, &keywords, &impression_id),
            );
            ads.insert(
                name.to_string(),
                AdResult {
                    id: 9000 + index,
                    creative: Creative {
                        id: creative_id,
                        ad_type: registration.request.size_code,
                    },
                    flight: Flight {
                        id: 500 + index,
                        priority_id: 1,
                        rate_type: Some(2),
                        campaign: Campaign { id: 100 },
                    },
                    ecpm: None,
                    companions: Vec::new(),
                },
            );
        }

        debug!(placements = ads.len(), "Auto-filled house ads");
        state.results = Some(results);
        state.ads = ads;
    }
}

impl AdLibrary for InMemoryAdLibrary {
    fn add_placement(&self, network_id: u64, site_id: u64, request: &PlacementRequest) {
        self.with_state(|state| {
            state.registrations.push(Registration {
                network_id,
                site_id,
                request: request.clone(),
            });
        });
    }

    fn set_keywords(&self, keywords: &[String]) {
        self.with_state(|state| state.keywords = Some(keywords.to_vec()));
    }

    fn set_write_results(&self, enabled: bool) {
        self.with_state(|state| state.write_results = enabled);
    }

    fn load(&self) {
        self.with_state(|state| {
            state.load_calls += 1;
            if self.auto_fill {
                self.fill_house_ads(state);
            }
        });
    }

    fn results(&self) -> Option<LoadResults> {
        self.with_state(|state| state.results.clone())
    }

    fn served_ads(&self) -> Vec<(String, AdResult)> {
        self.with_state(|state| {
            state
                .ads
                .iter()
                .map(|(key, ad)| (key.clone(), ad.clone()))
                .collect()
        })
    }

    fn domain(&self) -> String {
        self.domain.clone()
    }
}

/// Markup of a served ad carrying an impression pixel with an encoded token.
pub fn house_ad_markup(domain: &str, matched_keywords: &[String], impression_id: &str) -> String {
    let token = URL_SAFE_NO_PAD.encode(
        json!({ "mk": matched_keywords, "di": impression_id }).to_string(),
    );
    format!(
        r#"<div class="ad"><img src="https://{domain}/i.gif?e={token}&s=house" width="1" height="1"/></div>"#
    )
}
