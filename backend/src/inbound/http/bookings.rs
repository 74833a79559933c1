//! Reservation endpoints.
//!
//! ```text
//! POST   /api/v1/bookings
//! DELETE /api/v1/bookings/{id}
//! GET    /api/v1/users/{external_id}/bookings
//! ```
//!
//! Callers are identified by their external chat id; the gateway in
//! front of this API has already authenticated it.

use actix_web::{HttpResponse, delete, get, post, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    ApplianceId, ApplianceKind, BookingDetails, BookingId, Error, ExternalId, User,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

async fn require_resident(state: &HttpState, external: ExternalId) -> Result<User, Error> {
    state
        .users
        .find_by_external_id(external)
        .await?
        .ok_or_else(|| Error::not_found("resident is not registered"))
}

/// Reservation request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Caller's chat identity.
    pub external_id: i64,
    /// Appliance to book.
    pub appliance_id: i64,
    /// Civil date in the house time zone.
    pub date: NaiveDate,
    /// Slot hour within the operating window.
    pub hour: u8,
}

/// Reservation response payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    /// Identifier of the created (or already held) booking.
    pub booking_id: i64,
}

/// Caller identity for cancellation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelQuery {
    /// Caller's chat identity; must own the booking.
    pub external_id: i64,
}

/// One booking in a listing, joined with its appliance.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    /// Booking identifier.
    pub id: i64,
    /// Booked appliance.
    pub appliance_id: i64,
    /// Appliance name for display.
    pub appliance_name: String,
    /// `wash` or `dry`.
    pub kind: ApplianceKind,
    /// Civil slot date.
    pub date: NaiveDate,
    /// Slot hour.
    pub hour: u8,
}

impl From<BookingDetails> for BookingResponse {
    fn from(details: BookingDetails) -> Self {
        Self {
            id: details.booking.id.as_i64(),
            appliance_id: details.appliance.id.as_i64(),
            appliance_name: details.appliance.name,
            kind: details.appliance.kind,
            date: details.booking.date,
            hour: details.booking.hour,
        }
    }
}

/// Reserve a slot.
#[post("/bookings")]
pub async fn create_booking(
    state: web::Data<HttpState>,
    body: web::Json<CreateBookingRequest>,
) -> ApiResult<HttpResponse> {
    let external = ExternalId::new(body.external_id);
    state.guard.ensure_not_banned(external).await?;
    let user = require_resident(&state, external).await?;

    let booking_id = state
        .bookings
        .reserve(
            user.id,
            ApplianceId::new(body.appliance_id),
            body.date,
            body.hour,
        )
        .await?;
    Ok(HttpResponse::Created().json(CreateBookingResponse {
        booking_id: booking_id.as_i64(),
    }))
}

/// Cancel the caller's own booking.
#[delete("/bookings/{id}")]
pub async fn cancel_booking(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
    query: web::Query<CancelQuery>,
) -> ApiResult<HttpResponse> {
    let user = require_resident(&state, ExternalId::new(query.external_id)).await?;
    state
        .bookings
        .cancel(user.id, BookingId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// List the caller's upcoming bookings, soonest first.
#[get("/users/{external_id}/bookings")]
pub async fn list_user_bookings(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let user = require_resident(&state, ExternalId::new(path.into_inner())).await?;
    let bookings = state.bookings.list_upcoming(user.id).await?;
    let response: Vec<BookingResponse> =
        bookings.into_iter().map(BookingResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}
