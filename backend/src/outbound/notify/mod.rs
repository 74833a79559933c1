//! Chat-delivery adapters.
//!
//! [`HttpChatNotifier`] owns transport details only: request
//! serialisation, timeout, and HTTP error mapping into the domain's
//! notification errors. [`RetryingNotifier`] wraps any notifier with a
//! bounded retry loop for rate-limited sends.

mod http_notifier;
mod retry;

pub use http_notifier::HttpChatNotifier;
pub use retry::RetryingNotifier;

use async_trait::async_trait;
use tracing::info;

use crate::domain::ExternalId;
use crate::domain::ports::{NotifyError, ReminderNotifier};

/// Notifier that only logs; used when no chat gateway is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl ReminderNotifier for LogNotifier {
    async fn send(&self, recipient: ExternalId, text: &str) -> Result<(), NotifyError> {
        info!(%recipient, text, "reminder (no gateway configured)");
        Ok(())
    }
}
