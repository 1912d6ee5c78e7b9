//! Crate error types
//!
//! Most failures in an ad frame degrade silently (an unreadable fragment becomes
//! an empty config, a broken impression token drops two fields). The variants here
//! cover the plumbing around that core: settings, delivery and the optional
//! poll bound.

use thiserror::Error;

use crate::infrastructure::config::ConfigError;

#[derive(Error, Debug)]
pub enum AdFrameError {
    #[error("Settings error: {0}")]
    Settings(#[from] ConfigError),

    #[error("Failed to deliver '{event}' to the parent frame: {reason}")]
    DeliveryFailed { event: String, reason: String },

    #[error("Target origin '{origin}' is not a valid URL")]
    InvalidOrigin { origin: String },

    #[error("Result polling cancelled after {ticks} ticks")]
    Cancelled { ticks: u64 },

    #[error("Ad library produced no results within {elapsed_ms}ms ({ticks} ticks)")]
    PollTimeout { elapsed_ms: u64, ticks: u64 },

    #[error("Result synchronizer already finished")]
    SynchronizerFinished,

    #[error("Ad serving context is missing its {0}")]
    MissingCollaborator(&'static str),
}

impl AdFrameError {
    pub fn delivery_failed(event: &str, reason: impl ToString) -> Self {
        Self::DeliveryFailed {
            event: event.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure ended the frame load without any ad being relayed.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Cancelled { .. } | Self::PollTimeout { .. } | Self::Settings(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AdFrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_failure_is_not_terminal() {
        let err = AdFrameError::delivery_failed("response.adzerk", "no receivers");
        assert!(!err.is_terminal());
        assert_eq!(
            err.to_string(),
            "Failed to deliver 'response.adzerk' to the parent frame: no receivers"
        );
    }

    #[test]
    fn timeout_is_terminal() {
        let err = AdFrameError::PollTimeout { elapsed_ms: 500, ticks: 10 };
        assert!(err.is_terminal());
    }
}
