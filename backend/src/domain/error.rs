//! Domain-level error type.
//!
//! Transport agnostic: inbound adapters translate these into HTTP
//! responses, so the domain never imports status codes. The code set is
//! the user-facing failure taxonomy for booking and reminder operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ports::{
    ApplianceStoreError, BookingStoreError, ModerationStoreError, ReminderLogError, TimerStoreError,
    UserStoreError,
};

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// The requested slot start has already elapsed.
    PastSlot,
    /// The user already holds a booking of this appliance kind on that day.
    QuotaExceeded,
    /// Another user won the race for this slot.
    SlotTaken,
    /// The caller is banned from booking.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// A backing store is unreachable; the request may succeed on retry.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// Domain error payload carried up to the adapters.
///
/// ## Invariants
/// - `message` is non-empty once trimmed of whitespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl Error {
    /// Create a new error, panicking if the message is blank.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        assert!(
            !message.trim().is_empty(),
            "domain error messages must not be blank"
        );
        Self {
            code,
            message,
            details: None,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary structured details for adapters.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured details to the error.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::PastSlot`].
    pub fn past_slot(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PastSlot, message)
    }

    /// Convenience constructor for [`ErrorCode::QuotaExceeded`].
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::QuotaExceeded, message)
    }

    /// Convenience constructor for [`ErrorCode::SlotTaken`].
    pub fn slot_taken(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SlotTaken, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

// Store failures share one translation: a connection failure is worth a
// retry, anything else crossed into the domain unexpectedly. The enum
// display strings already name the failing store.

impl From<BookingStoreError> for Error {
    fn from(error: BookingStoreError) -> Self {
        match error {
            BookingStoreError::Connection { .. } => Self::service_unavailable(error.to_string()),
            BookingStoreError::Query { .. } | BookingStoreError::SlotConflict => {
                Self::internal(error.to_string())
            }
        }
    }
}

impl From<UserStoreError> for Error {
    fn from(error: UserStoreError) -> Self {
        match error {
            UserStoreError::Connection { .. } => Self::service_unavailable(error.to_string()),
            UserStoreError::Query { .. } => Self::internal(error.to_string()),
        }
    }
}

impl From<ApplianceStoreError> for Error {
    fn from(error: ApplianceStoreError) -> Self {
        match error {
            ApplianceStoreError::Connection { .. } => Self::service_unavailable(error.to_string()),
            ApplianceStoreError::Query { .. } => Self::internal(error.to_string()),
        }
    }
}

impl From<ReminderLogError> for Error {
    fn from(error: ReminderLogError) -> Self {
        match error {
            ReminderLogError::Connection { .. } => Self::service_unavailable(error.to_string()),
            ReminderLogError::Query { .. } => Self::internal(error.to_string()),
        }
    }
}

impl From<TimerStoreError> for Error {
    fn from(error: TimerStoreError) -> Self {
        match error {
            TimerStoreError::Connection { .. } => Self::service_unavailable(error.to_string()),
            TimerStoreError::Query { .. } => Self::internal(error.to_string()),
        }
    }
}

impl From<ModerationStoreError> for Error {
    fn from(error: ModerationStoreError) -> Self {
        match error {
            ModerationStoreError::Connection { .. } => Self::service_unavailable(error.to_string()),
            ModerationStoreError::Query { .. } => Self::internal(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructors_set_the_matching_code() {
        assert_eq!(Error::past_slot("gone").code(), ErrorCode::PastSlot);
        assert_eq!(Error::slot_taken("taken").code(), ErrorCode::SlotTaken);
        assert_eq!(
            Error::quota_exceeded("limit").code(),
            ErrorCode::QuotaExceeded
        );
    }

    #[test]
    fn details_round_trip_through_serde() {
        let err = Error::forbidden("banned").with_details(json!({ "until": "2026-09-06" }));
        let value = serde_json::to_value(&err).expect("serialise");
        assert_eq!(value["code"], "forbidden");
        assert_eq!(value["details"]["until"], "2026-09-06");
    }

    #[test]
    #[should_panic(expected = "must not be blank")]
    fn blank_messages_are_rejected() {
        let _ = Error::internal("  ");
    }

    #[test]
    fn store_errors_translate_by_failure_class() {
        let down = Error::from(BookingStoreError::connection("refused"));
        assert_eq!(down.code(), ErrorCode::ServiceUnavailable);
        assert!(down.message().contains("slot ledger"));

        let conflict = Error::from(BookingStoreError::slot_conflict());
        assert_eq!(conflict.code(), ErrorCode::InternalError);

        let query = Error::from(UserStoreError::query("bad column"));
        assert_eq!(query.code(), ErrorCode::InternalError);
        assert!(query.message().contains("user store"));
    }
}
