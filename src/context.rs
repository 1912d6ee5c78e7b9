//! Ad serving context shared by every frame component
//!
//! Everything the frame script used to read from window globals (network and
//! site ids, zone/priority tables, the library's result map, `postMessage`) is
//! carried here and handed to each component at construction.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{AdFrameError, Result};
use crate::infrastructure::{
    AdLibrary, AdServingSettings, FastRandom, FrameHost, FrameMessenger, RandomSource,
    RecordingFrameHost, SharedRenderStore,
};

#[derive(Clone)]
pub struct AdServingContext {
    /// Identifier of this frame load, attached to log spans
    pub load_id: String,

    /// Host-injected settings (immutable)
    pub settings: Arc<AdServingSettings>,

    pub library: Arc<dyn AdLibrary>,
    pub messenger: Arc<dyn FrameMessenger>,
    pub host: Arc<dyn FrameHost>,

    /// Render payload shared with the sibling frame
    pub shared: Arc<SharedRenderStore>,

    pub random: Arc<dyn RandomSource>,

    /// Stops the result poll
    pub cancellation_token: CancellationToken,
}

impl AdServingContext {
    pub fn builder(settings: AdServingSettings) -> AdServingContextBuilder {
        AdServingContextBuilder::new(settings)
    }

    #[must_use]
    pub fn settings(&self) -> &AdServingSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Stops any running result poll for this frame.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }
}

impl std::fmt::Debug for AdServingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdServingContext")
            .field("load_id", &self.load_id)
            .field("settings", &self.settings)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Builder for [`AdServingContext`]. The library and the messenger are required;
/// the host, shared store and random source have in-process defaults.
pub struct AdServingContextBuilder {
    settings: AdServingSettings,
    library: Option<Arc<dyn AdLibrary>>,
    messenger: Option<Arc<dyn FrameMessenger>>,
    host: Option<Arc<dyn FrameHost>>,
    shared: Option<Arc<SharedRenderStore>>,
    random: Option<Arc<dyn RandomSource>>,
    cancellation_token: Option<CancellationToken>,
}

impl AdServingContextBuilder {
    pub const fn new(settings: AdServingSettings) -> Self {
        Self {
            settings,
            library: None,
            messenger: None,
            host: None,
            shared: None,
            random: None,
            cancellation_token: None,
        }
    }

    #[must_use]
    pub fn with_library(mut self, library: Arc<dyn AdLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    #[must_use]
    pub fn with_messenger(mut self, messenger: Arc<dyn FrameMessenger>) -> Self {
        self.messenger = Some(messenger);
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn FrameHost>) -> Self {
        self.host = Some(host);
        self
    }

    #[must_use]
    pub fn with_shared_store(mut self, shared: Arc<SharedRenderStore>) -> Self {
        self.shared = Some(shared);
        self
    }

    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn build(self) -> Result<AdServingContext> {
        self.settings.validate()?;

        Ok(AdServingContext {
            load_id: uuid::Uuid::new_v4().to_string(),
            settings: Arc::new(self.settings),
            library: self.library.ok_or(AdFrameError::MissingCollaborator("ad library"))?,
            messenger: self
                .messenger
                .ok_or(AdFrameError::MissingCollaborator("frame messenger"))?,
            host: self
                .host
                .unwrap_or_else(|| Arc::new(RecordingFrameHost::new())),
            shared: self.shared.unwrap_or_default(),
            random: self.random.unwrap_or_else(|| Arc::new(FastRandom::new())),
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}
