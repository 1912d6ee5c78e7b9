//! One ad frame load, end to end

use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::application::config_resolver::ConfigResolver;
use crate::application::experiment_router::{ExperimentRouter, Route};
use crate::application::placement_builder::PlacementBuilder;
use crate::application::request_normalizer::to_outbound_request;
use crate::application::result_synchronizer::{DrainReport, ResultSynchronizer};
use crate::context::AdServingContext;
use crate::domain::constants::frame;
use crate::domain::events::FrameMessage;
use crate::domain::frame_config::RequestConfig;
use crate::domain::placement::PlacementType;
use crate::error::Result;

/// How a frame load ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Rendered the sibling frame's ad. `rendered` is false when the sibling
    /// had not published a `top` ad yet.
    Delegated { rendered: bool },
    /// Rendered a fallback image instead of requesting an ad
    Skipped { image_url: String },
    /// Requested ads and relayed the results
    Served(DrainReport),
}

pub struct AdFrameController {
    ctx: AdServingContext,
    resolver: ConfigResolver,
    router: ExperimentRouter,
    builder: PlacementBuilder,
}

impl AdFrameController {
    pub fn new(ctx: AdServingContext) -> Self {
        Self {
            resolver: ConfigResolver::new(ctx.random.clone()),
            router: ExperimentRouter::new(ctx.settings.clone(), ctx.random.clone()),
            builder: PlacementBuilder::new(ctx.settings.clone()),
            ctx,
        }
    }

    pub const fn context(&self) -> &AdServingContext {
        &self.ctx
    }

    /// Loads the frame addressed by `raw_url` (fragment config included).
    pub async fn load(&self, raw_url: &str) -> Result<FrameOutcome> {
        let span = info_span!("frame_load", load_id = %self.ctx.load_id);
        self.load_inner(raw_url).instrument(span).await
    }

    async fn load_inner(&self, raw_url: &str) -> Result<FrameOutcome> {
        let config = self.resolver.resolve(raw_url);
        debug!(?config, "Resolved frame config");

        match self.router.route(&config) {
            Route::Delegate => Ok(self.delegate()),
            Route::Skip { image_url } => {
                let settings = self.ctx.settings();
                self.ctx.host.render_image(
                    frame::MAIN_SLOT,
                    &image_url,
                    settings.fallback_image_width,
                    settings.fallback_image_height,
                );
                Ok(FrameOutcome::Skipped { image_url })
            }
            Route::Run => self.serve(config).await,
        }
    }

    fn delegate(&self) -> FrameOutcome {
        let slot = PlacementType::Top.as_str();
        self.ctx.host.rename_slot(frame::MAIN_SLOT, slot);
        self.ctx
            .host
            .set_frame_name(&format!("{}{slot}", frame::WINDOW_NAME_PREFIX));

        let markup = self
            .ctx
            .shared
            .current()
            .and_then(|shared| shared.markup_for(PlacementType::Top).map(str::to_string));

        match markup {
            Some(markup) => {
                self.ctx.host.render_markup(slot, &markup);
                info!("Rendered sibling frame's top ad");
                FrameOutcome::Delegated { rendered: true }
            }
            None => {
                warn!("Sibling frame has not published a top ad");
                FrameOutcome::Delegated { rendered: false }
            }
        }
    }

    async fn serve(&self, config: RequestConfig) -> Result<FrameOutcome> {
        let library = self.ctx.library.as_ref();
        let placements = self.builder.register(library, &config);

        library.set_write_results(true);
        if let Some(keywords) = &config.keywords {
            library.set_keywords(keywords);
        }

        let request = to_outbound_request(&config, &placements, self.ctx.settings().payload_shape);
        if let Err(e) = self
            .ctx
            .messenger
            .post(FrameMessage::Request(request.clone()))
            .await
        {
            error!("Request delivery failed: {}", e);
        }

        info!(placements = placements.len(), "Requesting ads");
        library.load();

        let report = ResultSynchronizer::new(self.ctx.clone(), request, config.origin)
            .spawn()
            .wait()
            .await?;
        Ok(FrameOutcome::Served(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{
        AdServingSettings, FixedRandom, HostAction, InMemoryAdLibrary, RecordingFrameHost,
        RecordingMessenger,
    };
    use std::sync::Arc;

    fn controller(
        settings: AdServingSettings,
        random: FixedRandom,
    ) -> (AdFrameController, Arc<InMemoryAdLibrary>, Arc<RecordingFrameHost>) {
        let library = Arc::new(InMemoryAdLibrary::with_auto_fill("engine.adzerk.net"));
        let host = Arc::new(RecordingFrameHost::new());
        let ctx = AdServingContext::builder(settings)
            .with_library(library.clone())
            .with_messenger(Arc::new(RecordingMessenger::new()))
            .with_host(host.clone())
            .with_random(Arc::new(random))
            .build()
            .unwrap();
        (AdFrameController::new(ctx), library, host)
    }

    #[tokio::test]
    async fn skip_renders_fallback_image_without_registering() {
        let settings = AdServingSettings {
            skip_probability: 0.5,
            skip_keywords: vec!["k.lowfill".to_string()],
            skip_images: vec!["https://static.example/skip.png".to_string()],
            ..AdServingSettings::default()
        };
        let (controller, library, host) = controller(settings, FixedRandom::constant(0.2));

        let outcome = controller
            .load(r#"https://static.example/ads#{"keywords":["k.lowfill"]}"#)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            FrameOutcome::Skipped { image_url: "https://static.example/skip.png".to_string() }
        );
        assert_eq!(
            host.actions(),
            [HostAction::RenderImage {
                slot: "main".to_string(),
                src: "https://static.example/skip.png".to_string(),
                width: 300,
                height: 250,
            }]
        );
        assert!(library.registrations().is_empty());
        assert_eq!(library.load_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_registers_default_table_and_serves() {
        let (controller, library, _) = controller(AdServingSettings::default(), FixedRandom::constant(0.5));

        let outcome = controller.load("https://static.example/ads").await.unwrap();

        assert_eq!(library.registrations().len(), 3);
        assert!(library.writes_results());
        assert_eq!(library.keywords(), None);
        match outcome {
            FrameOutcome::Served(report) => assert_eq!(report.responses.len(), 3),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn delegate_without_sibling_markup_renders_nothing() {
        let (controller, library, host) = controller(AdServingSettings::default(), FixedRandom::constant(0.5));

        let outcome = controller
            .load(r#"https://static.example/ads#{"properties":{"double_sidebar":true,"frame_id":"ad_main_top"}}"#)
            .await
            .unwrap();

        assert_eq!(outcome, FrameOutcome::Delegated { rendered: false });
        assert_eq!(
            host.actions(),
            [
                HostAction::RenameSlot { from: "main".to_string(), to: "top".to_string() },
                HostAction::SetFrameName("ad-top".to_string()),
            ]
        );
        assert_eq!(library.load_calls(), 0);
    }
}
