//! Resident registration endpoint.
//!
//! ```text
//! POST /api/v1/users
//! ```
//!
//! Registration merges any stub record an administrator created for the
//! same surname and room, so pre-booked slots follow the resident onto
//! their real chat identity. Rejected surnames count towards the
//! moderation guard's strike limit.

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, ExternalId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

const MAX_SURNAME_CHARS: usize = 64;
const ROOM_RANGE: std::ops::RangeInclusive<u16> = 100..=555;

fn surname_is_acceptable(surname: &str) -> bool {
    let trimmed = surname.trim();
    !trimmed.is_empty()
        && trimmed.chars().count() <= MAX_SURNAME_CHARS
        && trimmed
            .chars()
            .all(|c| c.is_alphabetic() || c == '-' || c == '\'' || c == ' ')
}

fn room_is_acceptable(room: &str) -> bool {
    room.len() == 3
        && room.chars().all(|c| c.is_ascii_digit())
        && room.parse::<u16>().is_ok_and(|n| ROOM_RANGE.contains(&n))
}

/// Registration request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Caller's chat identity.
    pub external_id: i64,
    /// Resident surname.
    pub surname: String,
    /// Room number, three digits.
    pub room: String,
    /// Optional chat handle for the admin overview.
    #[serde(default)]
    pub handle: Option<String>,
}

/// Registration response payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    /// Store-assigned resident identifier.
    pub user_id: i64,
}

/// Register (or re-register) a resident.
#[post("/users")]
pub async fn register_user(
    state: web::Data<HttpState>,
    body: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let external = ExternalId::new(body.external_id);
    state.guard.ensure_not_banned(external).await?;

    if !surname_is_acceptable(&body.surname) {
        let banned = state.guard.register_failed_attempt(external).await?;
        if banned {
            return Err(Error::forbidden(
                "banned for repeated rejected registration attempts",
            ));
        }
        return Err(Error::invalid_request("surname was rejected"));
    }
    if !room_is_acceptable(&body.room) {
        return Err(Error::invalid_request(
            "room must be three digits between 100 and 555",
        ));
    }

    let surname = body.surname.trim();
    let user = state
        .users
        .merge_stub_into(external, surname, &body.room)
        .await?;
    let user = match body.handle.as_deref() {
        Some(handle) => state
            .users
            .upsert(external, surname, &body.room, Some(handle))
            .await?,
        None => user,
    };
    state.guard.clear_failed_attempts(external).await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        user_id: user.id.as_i64(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("Ivanova", true)]
    #[case::hyphenated("Ter-Ovanesyan", true)]
    #[case::blank("   ", false)]
    #[case::digits("Iv4nova", false)]
    #[case::symbols("Ivanova!", false)]
    fn surname_policy(#[case] surname: &str, #[case] acceptable: bool) {
        assert_eq!(surname_is_acceptable(surname), acceptable);
    }

    #[rstest]
    #[case::lowest("100", true)]
    #[case::highest("555", true)]
    #[case::below("099", false)]
    #[case::above("556", false)]
    #[case::short("42", false)]
    #[case::letters("21a", false)]
    fn room_policy(#[case] room: &str, #[case] acceptable: bool) {
        assert_eq!(room_is_acceptable(room), acceptable);
    }
}
