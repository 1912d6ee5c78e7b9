//! Domain module - frame configuration, placements and parent-page messages
//!
//! Plain data shared by the application layer and the collaborator traits in
//! `infrastructure`. Nothing here performs I/O.

pub mod ad_result;
pub mod constants;
pub mod events;
pub mod frame_config;
pub mod placement;

pub use ad_result::{AdResult, ImpressionToken, LoadResults};
pub use events::{
    FrameMessage, OutboundRequestPayload, OutboundResponsePayload, PayloadShape,
    PlacementSummary, SharedRenderPayload,
};
pub use frame_config::{Properties, RequestConfig};
pub use placement::{PlacementRequest, PlacementType, ZoneId};
