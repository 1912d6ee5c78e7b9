//! Cross-frame messaging to the parent page
//!
//! Wraps `postMessage`: named events carrying JSON payloads plus the companion
//! frame commands. Delivery failures are reported to the caller, which logs
//! them and carries on.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, error};

use crate::domain::events::FrameMessage;
use crate::error::{AdFrameError, Result};

#[async_trait]
pub trait FrameMessenger: Send + Sync {
    /// Posts a message to the parent frame.
    async fn post(&self, message: FrameMessage) -> Result<()>;

    /// Whether the host window exposes `postMessage` at all.
    fn supports_post_message(&self) -> bool;
}

/// Messenger backed by a tokio broadcast channel.
#[derive(Clone)]
pub struct BroadcastMessenger {
    sender: broadcast::Sender<FrameMessage>,
    post_message: bool,
    /// Whether message delivery is enabled
    enabled: Arc<RwLock<bool>>,
}

impl BroadcastMessenger {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            post_message: true,
            enabled: Arc::new(RwLock::new(true)),
        }
    }

    /// Messenger for a host without `postMessage`; commands fall back to the
    /// hidden bootstrap iframe.
    pub fn without_post_message(capacity: usize) -> Self {
        Self {
            post_message: false,
            ..Self::new(capacity)
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FrameMessage> {
        self.sender.subscribe()
    }

    /// Enable or disable delivery
    pub async fn set_enabled(&self, enabled: bool) {
        *self.enabled.write().await = enabled;
        debug!("Frame messaging {}", if enabled { "enabled" } else { "disabled" });
    }

    pub async fn is_enabled(&self) -> bool {
        *self.enabled.read().await
    }
}

#[async_trait]
impl FrameMessenger for BroadcastMessenger {
    async fn post(&self, message: FrameMessage) -> Result<()> {
        if !self.is_enabled().await {
            return Ok(());
        }

        let event_name = message.event_name();
        match self.sender.send(message) {
            Ok(receivers) => {
                debug!("Posted {} to {} receiver(s)", event_name, receivers);
                Ok(())
            }
            Err(e) => {
                error!("Failed to post {}: {}", event_name, e);
                Err(AdFrameError::delivery_failed(event_name, e))
            }
        }
    }

    fn supports_post_message(&self) -> bool {
        self.post_message
    }
}

/// Keeps every posted message in order.
#[derive(Debug)]
pub struct RecordingMessenger {
    messages: Mutex<Vec<FrameMessage>>,
    post_message: bool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            post_message: true,
        }
    }

    pub fn without_post_message() -> Self {
        Self {
            post_message: false,
            ..Self::new()
        }
    }

    pub fn messages(&self) -> Vec<FrameMessage> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Messages posted under `event_name`, in order.
    pub fn named(&self, event_name: &str) -> Vec<FrameMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.event_name() == event_name)
            .collect()
    }
}

impl Default for RecordingMessenger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameMessenger for RecordingMessenger {
    async fn post(&self, message: FrameMessage) -> Result<()> {
        let event_name = message.event_name();
        self.messages
            .lock()
            .map_err(|e| AdFrameError::delivery_failed(event_name, e))?
            .push(message);
        Ok(())
    }

    fn supports_post_message(&self) -> bool {
        self.post_message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::OutboundRequestPayload;

    fn request() -> FrameMessage {
        FrameMessage::Request(OutboundRequestPayload::default())
    }

    #[tokio::test]
    async fn broadcast_delivers_to_subscribers() {
        let messenger = BroadcastMessenger::new(8);
        let mut rx = messenger.subscribe();

        messenger.post(request()).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_name(), "request.adzerk");
    }

    #[tokio::test]
    async fn broadcast_without_receivers_reports_failure() {
        let messenger = BroadcastMessenger::new(8);
        let err = messenger.post(request()).await.unwrap_err();
        assert!(matches!(err, AdFrameError::DeliveryFailed { .. }));
    }

    #[tokio::test]
    async fn disabled_messenger_drops_silently() {
        let messenger = BroadcastMessenger::new(8);
        let mut rx = messenger.subscribe();
        messenger.set_enabled(false).await;

        tokio_test::assert_ok!(messenger.post(request()).await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn recording_messenger_keeps_order() {
        let messenger = RecordingMessenger::new();
        messenger.post(request()).await.unwrap();
        messenger.post(request()).await.unwrap();

        assert_eq!(messenger.named("request.adzerk").len(), 2);
        assert!(messenger.supports_post_message());
        assert!(!RecordingMessenger::without_post_message().supports_post_message());
    }
}
