//! Execution path selection: delegate to the sibling frame, skip with a static
//! image, or run the normal ad request.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::frame_config::RequestConfig;
use crate::infrastructure::{AdServingSettings, RandomSource};

/// Which path the frame takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Delegate,
    Skip,
    Run,
}

/// Routing decision with the data each path needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Double-sidebar top frame: reuse the sibling's ad, no request
    Delegate,
    /// Render the chosen fallback image, no request
    Skip { image_url: String },
    /// Register placements and request ads
    Run,
}

impl Route {
    pub const fn kind(&self) -> RouteKind {
        match self {
            Self::Delegate => RouteKind::Delegate,
            Self::Skip { .. } => RouteKind::Skip,
            Self::Run => RouteKind::Run,
        }
    }
}

/// Pure routing table. Delegate wins over skip, skip over run.
pub const fn decide(
    double_sidebar: bool,
    is_top_frame: bool,
    skip_sampled: bool,
    keyword_intersects: bool,
) -> RouteKind {
    if double_sidebar && is_top_frame {
        RouteKind::Delegate
    } else if skip_sampled && keyword_intersects {
        RouteKind::Skip
    } else {
        RouteKind::Run
    }
}

pub struct ExperimentRouter {
    settings: Arc<AdServingSettings>,
    random: Arc<dyn RandomSource>,
}

impl ExperimentRouter {
    pub fn new(settings: Arc<AdServingSettings>, random: Arc<dyn RandomSource>) -> Self {
        Self { settings, random }
    }

    /// Samples the skip experiment. Disabled when the probability is 0.
    fn skip_sampled(&self) -> bool {
        let probability = self.settings.skip_probability;
        probability > 0.0 && self.random.next_f64() <= probability
    }

    fn keyword_intersects(&self, config: &RequestConfig) -> bool {
        config
            .keywords()
            .iter()
            .any(|keyword| self.settings.is_skip_keyword(keyword))
    }

    pub fn route(&self, config: &RequestConfig) -> Route {
        let double_sidebar = config.double_sidebar();
        let is_top_frame = config.is_top_frame();
        if decide(double_sidebar, is_top_frame, false, false) == RouteKind::Delegate {
            info!("Double-sidebar top frame, delegating to sibling frame");
            return Route::Delegate;
        }

        // keywords are only inspected on the sampled branch
        let skip_sampled = self.skip_sampled();
        let keyword_intersects = skip_sampled && self.keyword_intersects(config);

        match decide(double_sidebar, is_top_frame, skip_sampled, keyword_intersects) {
            RouteKind::Skip => match self.random.pick_index(self.settings.skip_images.len()) {
                Some(index) => {
                    let image_url = self.settings.skip_images[index].clone();
                    info!(image = %image_url, "Skip experiment sampled, rendering fallback image");
                    Route::Skip { image_url }
                }
                None => {
                    warn!("Skip experiment sampled but no fallback images configured");
                    Route::Run
                }
            },
            _ => Route::Run,
        }
    }
}
