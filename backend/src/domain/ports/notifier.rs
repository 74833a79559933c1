//! Port abstraction for reminder delivery.
//!
//! Delivery is best-effort: the dispatcher swallows send failures and the
//! watchdog sweep is the recovery path. Rate limiting is the one failure
//! the outer retry wrapper reacts to, so it gets its own variant carrying
//! the advertised backoff.

use async_trait::async_trait;

use crate::domain::ExternalId;

/// Failures raised when delivering one notification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The delivery channel asked us to slow down.
    #[error("notification rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds the channel asked us to wait.
        retry_after_secs: u64,
    },
    /// The channel rejected the message outright (bad recipient, blocked).
    #[error("notification rejected: {message}")]
    Rejected {
        /// Channel-provided description.
        message: String,
    },
    /// The channel could not be reached.
    #[error("notification transport failed: {message}")]
    Transport {
        /// Transport-level description.
        message: String,
    },
}

impl NotifyError {
    /// Shorthand for [`NotifyError::Rejected`].
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Shorthand for [`NotifyError::Transport`].
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Sends one reminder message to a resident's chat identity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    /// Deliver `text` to the recipient.
    async fn send(&self, recipient: ExternalId, text: &str) -> Result<(), NotifyError>;
}
