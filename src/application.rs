//! Application layer module
//!
//! Components of a single frame load, leaf first. [`AdFrameController`] wires
//! them together; each one can also be driven on its own.

pub mod config_resolver; // Fragment -> RequestConfig
pub mod experiment_router; // Delegate / skip / run
pub mod frame_controller; // End-to-end load
pub mod impression_token; // Pixel token extraction
pub mod placement_builder; // Library registrations
pub mod request_normalizer; // Outbound payloads
pub mod result_synchronizer; // Poll and drain

pub use config_resolver::ConfigResolver;
pub use experiment_router::{ExperimentRouter, Route, RouteKind};
pub use frame_controller::{AdFrameController, FrameOutcome};
pub use impression_token::ImpressionTokenDecoder;
pub use placement_builder::PlacementBuilder;
pub use request_normalizer::{canonical_keywords, to_outbound_request, to_outbound_response};
pub use result_synchronizer::{DrainReport, ResultSynchronizer, SyncHandle, SyncState};
