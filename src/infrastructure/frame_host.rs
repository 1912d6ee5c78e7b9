//! Frame document seam (DOM side effects) and the shared render store
//!
//! In the double-sidebar layout only the main frame calls the ad library. It
//! publishes the raw result markup to a [`SharedRenderStore`]; the top frame reads
//! its entry back and hands it to the host verbatim.

use std::sync::{Mutex, RwLock};

use crate::domain::events::SharedRenderPayload;

/// Document operations the frame performs outside of ad registration.
pub trait FrameHost: Send + Sync {
    /// Changes the id of the slot element (`main` -> `top`).
    fn rename_slot(&self, from: &str, to: &str);

    /// Sets `window.name`.
    fn set_frame_name(&self, name: &str);

    fn render_image(&self, slot: &str, src: &str, width: u32, height: u32);

    /// Inserts ad markup produced by the sibling frame.
    fn render_markup(&self, slot: &str, markup: &str);

    /// Appends a hidden iframe to the document.
    fn inject_hidden_iframe(&self, src: &str);
}

/// Document operations as recorded by [`RecordingFrameHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    RenameSlot { from: String, to: String },
    SetFrameName(String),
    RenderImage { slot: String, src: String, width: u32, height: u32 },
    RenderMarkup { slot: String, markup: String },
    InjectHiddenIframe(String),
}

#[derive(Debug, Default)]
pub struct RecordingFrameHost {
    actions: Mutex<Vec<HostAction>>,
}

impl RecordingFrameHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<HostAction> {
        self.actions.lock().map(|a| a.clone()).unwrap_or_default()
    }

    fn record(&self, action: HostAction) {
        if let Ok(mut actions) = self.actions.lock() {
            actions.push(action);
        }
    }
}

impl FrameHost for RecordingFrameHost {
    fn rename_slot(&self, from: &str, to: &str) {
        self.record(HostAction::RenameSlot {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    fn set_frame_name(&self, name: &str) {
        self.record(HostAction::SetFrameName(name.to_string()));
    }

    fn render_image(&self, slot: &str, src: &str, width: u32, height: u32) {
        self.record(HostAction::RenderImage {
            slot: slot.to_string(),
            src: src.to_string(),
            width,
            height,
        });
    }

    fn render_markup(&self, slot: &str, markup: &str) {
        self.record(HostAction::RenderMarkup {
            slot: slot.to_string(),
            markup: markup.to_string(),
        });
    }

    fn inject_hidden_iframe(&self, src: &str) {
        self.record(HostAction::InjectHiddenIframe(src.to_string()));
    }
}

/// Render payload shared between sibling frames of one page
#[derive(Debug, Default)]
pub struct SharedRenderStore {
    payload: RwLock<Option<SharedRenderPayload>>,
}

impl SharedRenderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, payload: SharedRenderPayload) {
        match self.payload.write() {
            Ok(mut slot) => *slot = Some(payload),
            Err(poisoned) => *poisoned.into_inner() = Some(payload),
        }
    }

    pub fn current(&self) -> Option<SharedRenderPayload> {
        self.payload.read().ok().and_then(|p| p.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::placement::PlacementType;
    use std::collections::HashMap;

    #[test]
    fn store_is_empty_until_published() {
        let store = SharedRenderStore::new();
        assert!(store.current().is_none());

        store.publish(SharedRenderPayload {
            markup: HashMap::from([("top".to_string(), "<div>ad</div>".to_string())]),
        });
        let payload = store.current().unwrap();
        assert_eq!(payload.markup_for(PlacementType::Top), Some("<div>ad</div>"));
        assert_eq!(payload.markup_for(PlacementType::Main), None);
    }

    #[test]
    fn recording_host_keeps_actions_in_order() {
        let host = RecordingFrameHost::new();
        host.rename_slot("main", "top");
        host.set_frame_name("ad-top");

        assert_eq!(
            host.actions(),
            vec![
                HostAction::RenameSlot { from: "main".into(), to: "top".into() },
                HostAction::SetFrameName("ad-top".into()),
            ]
        );
    }
}
