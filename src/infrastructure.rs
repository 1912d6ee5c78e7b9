//! Infrastructure layer for settings, logging and the frame's collaborators
//!
//! The ad library, the parent-frame messenger and the frame document are
//! external to this crate; each is reached through a trait with an in-memory
//! implementation used by tests and the CLI.

pub mod ad_library; // Ad-serving client library seam
pub mod config; // Ad serving settings
pub mod frame_host; // Document side effects and sibling render store
pub mod frame_messenger; // postMessage to the parent page
pub mod logging; // Logging infrastructure
pub mod random; // Random sources

// Re-export commonly used items
pub use ad_library::{AdLibrary, InMemoryAdLibrary};
pub use config::{AdServingSettings, ConfigError, LoggingConfig};
pub use frame_host::{FrameHost, HostAction, RecordingFrameHost, SharedRenderStore};
pub use frame_messenger::{BroadcastMessenger, FrameMessenger, RecordingMessenger};
pub use random::{FastRandom, FixedRandom, RandomSource};
