//! HTTP adapter mapping for domain errors.
//!
//! Keeps the domain error type HTTP-agnostic while letting Actix
//! handlers turn domain failures into consistent JSON responses and
//! status codes.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::error;

use crate::domain::{Error, ErrorCode};

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::PastSlot => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::QuotaExceeded | ErrorCode::SlotTaken => StatusCode::CONFLICT,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn redact_if_internal(error: &Error) -> Error {
    if matches!(error.code(), ErrorCode::InternalError) {
        Error::internal("Internal server error")
    } else {
        error.clone()
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(redact_if_internal(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        // Do not leak implementation details to clients.
        error!(error = %err, "actix error promoted to domain error");
        Error::internal("Internal server error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::invalid(ErrorCode::InvalidRequest, StatusCode::BAD_REQUEST)]
    #[case::past(ErrorCode::PastSlot, StatusCode::UNPROCESSABLE_ENTITY)]
    #[case::quota(ErrorCode::QuotaExceeded, StatusCode::CONFLICT)]
    #[case::taken(ErrorCode::SlotTaken, StatusCode::CONFLICT)]
    #[case::banned(ErrorCode::Forbidden, StatusCode::FORBIDDEN)]
    #[case::missing(ErrorCode::NotFound, StatusCode::NOT_FOUND)]
    #[case::store_down(ErrorCode::ServiceUnavailable, StatusCode::SERVICE_UNAVAILABLE)]
    #[case::bug(ErrorCode::InternalError, StatusCode::INTERNAL_SERVER_ERROR)]
    fn codes_map_to_stable_statuses(#[case] code: ErrorCode, #[case] status: StatusCode) {
        assert_eq!(status_for(code), status);
    }

    #[test]
    fn internal_details_are_redacted() {
        let redacted = redact_if_internal(&Error::internal("lock poisoned at booking.rs"));
        assert_eq!(redacted.message(), "Internal server error");
    }

    #[test]
    fn client_errors_keep_their_message() {
        let error = Error::slot_taken("slot 2026-08-30 12:00 is already booked");
        assert_eq!(redact_if_internal(&error), error);
    }
}
