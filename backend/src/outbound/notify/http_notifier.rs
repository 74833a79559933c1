//! Reqwest-backed chat gateway adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;

use crate::domain::ExternalId;
use crate::domain::ports::{NotifyError, ReminderNotifier};

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Notifier that POSTs one JSON message per reminder to a chat gateway.
pub struct HttpChatNotifier {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpChatNotifier {
    /// Build an adapter with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, token: Option<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(endpoint, token, DEFAULT_SEND_TIMEOUT)
    }

    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(
        endpoint: Url,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }
}

#[async_trait]
impl ReminderNotifier for HttpChatNotifier {
    async fn send(&self, recipient: ExternalId, text: &str) -> Result<(), NotifyError> {
        let payload = SendMessageRequest {
            chat_id: recipient.as_i64(),
            text,
        };
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response.bytes().await.unwrap_or_default();
        Err(map_status_error(status, retry_after, body.as_ref()))
    }
}

fn map_transport_error(error: reqwest::Error) -> NotifyError {
    NotifyError::transport(error.to_string())
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn map_status_error(status: StatusCode, retry_after: Option<u64>, body: &[u8]) -> NotifyError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return NotifyError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        };
    }

    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };
    if status.is_client_error() {
        NotifyError::rejected(message)
    } else {
        NotifyError::transport(message)
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Coverage for the non-network mapping helpers.

    use super::*;
    use rstest::rstest;

    #[test]
    fn rate_limit_honours_the_advertised_backoff() {
        let error = map_status_error(StatusCode::TOO_MANY_REQUESTS, Some(17), b"");
        assert_eq!(error, NotifyError::RateLimited {
            retry_after_secs: 17
        });
    }

    #[test]
    fn rate_limit_without_a_header_uses_the_default_backoff() {
        let error = map_status_error(StatusCode::TOO_MANY_REQUESTS, None, b"");
        assert_eq!(error, NotifyError::RateLimited {
            retry_after_secs: DEFAULT_RETRY_AFTER_SECS
        });
    }

    #[rstest]
    #[case::blocked_recipient(StatusCode::FORBIDDEN)]
    #[case::unknown_recipient(StatusCode::BAD_REQUEST)]
    fn client_statuses_are_rejections(#[case] status: StatusCode) {
        let error = map_status_error(status, None, b"{\"description\":\"chat not found\"}");
        assert!(
            matches!(error, NotifyError::Rejected { .. }),
            "client statuses should map to Rejected",
        );
    }

    #[test]
    fn server_statuses_are_transport_failures() {
        let error = map_status_error(StatusCode::BAD_GATEWAY, None, b"");
        assert!(matches!(error, NotifyError::Transport { .. }));
    }

    #[test]
    fn body_preview_is_compacted_and_truncated() {
        let long = "x ".repeat(200);
        let preview = body_preview(long.as_bytes());
        assert!(preview.ends_with("..."));
        assert!(!preview.contains("  "));
    }
}
