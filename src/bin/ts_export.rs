//! Writes the TypeScript definitions of the parent-page payloads.

use adzerk_display::domain::{
    OutboundRequestPayload, OutboundResponsePayload, PlacementSummary, PlacementType,
};
use ts_rs::TS;

fn export<T: TS + 'static>() -> bool {
    match T::export() {
        Ok(()) => {
            println!("exported {}", T::name());
            true
        }
        Err(e) => {
            eprintln!("{} export error: {}", T::name(), e);
            false
        }
    }
}

fn main() {
    let results = [
        export::<PlacementType>(),
        export::<PlacementSummary>(),
        export::<OutboundRequestPayload>(),
        export::<OutboundResponsePayload>(),
    ];

    if results.contains(&false) {
        std::process::exit(1);
    }
}
