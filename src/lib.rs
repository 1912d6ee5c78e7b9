//! Adzerk display frame driver
//!
//! Drives a single ad placement inside a sandboxed frame: resolves the request
//! configuration from the frame URL fragment, routes between the double-sidebar
//! delegate, the skip experiment and a normal request, registers placements with
//! the ad-serving library, polls it for results and relays request/response
//! payloads to the parent page.

pub mod application;
pub mod context;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod utils;

pub use application::{AdFrameController, FrameOutcome};
pub use context::{AdServingContext, AdServingContextBuilder};
pub use error::{AdFrameError, Result};
pub use infrastructure::AdServingSettings;
