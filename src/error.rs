//! Error types for the suggestion pipeline
//!
//! Every error on the suggestion path is recoverable: the session logs it and
//! degrades to "no live suggestions" while manual search stays usable.

use thiserror::Error;

use crate::channel::ChannelState;

/// Main error type for the typeahead engine
#[derive(Error, Debug)]
pub enum TypeaheadError {
    /// A send was attempted while the channel was not open.
    #[error("Channel not ready (state: {state})")]
    ChannelUnavailable { state: ChannelState },

    /// Inbound data did not parse as a suggestion message.
    #[error("Malformed message: {reason}")]
    MalformedMessage { reason: String },

    /// Inbound batch belongs to a query that has been superseded.
    #[error("Stale batch: correlates with {received}, latest dispatched is {latest:?}")]
    StaleBatch { received: String, latest: Option<u64> },

    /// The open channel closed unexpectedly or hit a network error.
    #[error("Channel failure: {0}")]
    ChannelFailure(String),

    /// The channel could not be established.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Lifecycle call made in a state that does not allow it.
    #[error("Invalid transition: cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: ChannelState,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TypeaheadError {
    /// Create a malformed-message error from any displayable reason.
    pub fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::MalformedMessage {
            reason: reason.to_string(),
        }
    }

    /// Errors that only mean "suggestions did not update this time".
    ///
    /// `Handshake`, `InvalidTransition` and `Config` are lifecycle or setup
    /// errors the owning view may want to surface.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ChannelUnavailable { .. }
                | Self::MalformedMessage { .. }
                | Self::StaleBatch { .. }
                | Self::ChannelFailure(_)
                | Self::Serialization(_)
        )
    }
}

/// Result alias for the typeahead engine
pub type Result<T> = std::result::Result<T, TypeaheadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_path_errors_are_recoverable() {
        let unavailable = TypeaheadError::ChannelUnavailable {
            state: ChannelState::Connecting,
        };
        assert!(unavailable.is_recoverable());
        assert!(TypeaheadError::malformed("bad json").is_recoverable());
        assert!(TypeaheadError::ChannelFailure("reset".into()).is_recoverable());
    }

    #[test]
    fn lifecycle_errors_are_not_recoverable() {
        assert!(!TypeaheadError::Handshake("refused".into()).is_recoverable());
        assert!(!TypeaheadError::Config("limit".into()).is_recoverable());
        let err = TypeaheadError::InvalidTransition {
            action: "open",
            state: ChannelState::Failed,
        };
        assert!(!err.is_recoverable());
    }

    #[test]
    fn display_includes_state() {
        let err = TypeaheadError::ChannelUnavailable {
            state: ChannelState::Closed,
        };
        assert_eq!(err.to_string(), "Channel not ready (state: closed)");
    }
}
