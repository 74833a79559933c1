//! Bounded retry wrapper for rate-limited sends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use crate::domain::ExternalId;
use crate::domain::ports::{NotifyError, ReminderNotifier};
use crate::domain::reminder::Sleeper;

const JITTER_CEILING_MS: u64 = 250;

/// Notifier decorator that retries rate-limited sends.
///
/// Waits out the advertised backoff plus one second, with a little jitter
/// so a burst of reminders does not hammer the gateway in lockstep.
/// Rejections and transport failures pass straight through.
pub struct RetryingNotifier {
    inner: Arc<dyn ReminderNotifier>,
    sleeper: Arc<dyn Sleeper>,
    max_retries: u32,
}

impl RetryingNotifier {
    /// Wrap `inner`, allowing up to `max_retries` additional attempts.
    pub fn new(inner: Arc<dyn ReminderNotifier>, sleeper: Arc<dyn Sleeper>, max_retries: u32) -> Self {
        Self {
            inner,
            sleeper,
            max_retries,
        }
    }

    fn backoff(retry_after_secs: u64) -> Duration {
        let jitter_ms = rand::thread_rng().gen_range(0..=JITTER_CEILING_MS);
        Duration::from_secs(retry_after_secs.saturating_add(1)) + Duration::from_millis(jitter_ms)
    }
}

#[async_trait]
impl ReminderNotifier for RetryingNotifier {
    async fn send(&self, recipient: ExternalId, text: &str) -> Result<(), NotifyError> {
        let mut attempt = 0;
        loop {
            match self.inner.send(recipient, text).await {
                Err(NotifyError::RateLimited { retry_after_secs }) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        %recipient,
                        retry_after_secs,
                        attempt,
                        "send rate limited, backing off"
                    );
                    self.sleeper.sleep(Self::backoff(retry_after_secs)).await;
                }
                outcome => return outcome,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockReminderNotifier;
    use crate::test_support::InstantSleeper;

    fn rate_limited(secs: u64) -> NotifyError {
        NotifyError::RateLimited {
            retry_after_secs: secs,
        }
    }

    #[tokio::test]
    async fn retries_until_the_gateway_accepts() {
        let mut inner = MockReminderNotifier::new();
        let mut calls = 0;
        inner.expect_send().times(3).returning(move |_, _| {
            calls += 1;
            if calls < 3 { Err(rate_limited(2)) } else { Ok(()) }
        });
        let sleeper = Arc::new(InstantSleeper::default());
        let notifier = RetryingNotifier::new(Arc::new(inner), sleeper.clone(), 2);

        notifier
            .send(ExternalId::new(7), "hello")
            .await
            .expect("third attempt succeeds");

        let waits = sleeper.requested();
        assert_eq!(waits.len(), 2);
        for wait in waits {
            assert!(wait >= Duration::from_secs(3), "backoff honours retry_after + 1s");
        }
    }

    #[tokio::test]
    async fn gives_up_after_the_retry_budget() {
        let mut inner = MockReminderNotifier::new();
        inner
            .expect_send()
            .times(3)
            .returning(|_, _| Err(rate_limited(1)));
        let notifier = RetryingNotifier::new(
            Arc::new(inner),
            Arc::new(InstantSleeper::default()),
            2,
        );

        let error = notifier
            .send(ExternalId::new(7), "hello")
            .await
            .expect_err("budget exhausted");
        assert!(matches!(error, NotifyError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn rejections_are_not_retried() {
        let mut inner = MockReminderNotifier::new();
        inner
            .expect_send()
            .times(1)
            .returning(|_, _| Err(NotifyError::rejected("chat not found")));
        let sleeper = Arc::new(InstantSleeper::default());
        let notifier = RetryingNotifier::new(Arc::new(inner), sleeper.clone(), 2);

        let error = notifier
            .send(ExternalId::new(7), "hello")
            .await
            .expect_err("rejected");
        assert!(matches!(error, NotifyError::Rejected { .. }));
        assert!(sleeper.requested().is_empty());
    }
}
