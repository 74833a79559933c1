//! Administrative endpoints.
//!
//! ```text
//! POST   /api/v1/admin/bookings        force-book by surname and room
//! GET    /api/v1/admin/bookings?date=  full-day overview
//! DELETE /api/v1/admin/bookings/{id}
//! POST   /api/v1/admin/bans
//! DELETE /api/v1/admin/bans/{external_id}
//! GET    /api/v1/admin/bans
//! ```
//!
//! Admin authentication happens at the gateway in front of this API;
//! these handlers trust the caller.

use actix_web::{HttpResponse, delete, get, post, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ports::BanRecord;
use crate::domain::{ApplianceId, BookingId, ExternalId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::bookings::BookingResponse;
use crate::inbound::http::state::HttpState;

/// Force-book request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceBookRequest {
    /// Resident surname; a stub record is created when unknown.
    pub surname: String,
    /// Resident room.
    pub room: String,
    /// Appliance to book.
    pub appliance_id: i64,
    /// Civil date in the house time zone.
    pub date: NaiveDate,
    /// Slot hour within the operating window.
    pub hour: u8,
}

/// Force-book response payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceBookResponse {
    /// Identifier of the created booking.
    pub booking_id: i64,
    /// The resident the slot was booked for.
    pub user_id: i64,
    /// Whether the resident record is a stub awaiting registration.
    pub stub: bool,
}

/// Date selector for the full-day overview.
#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    /// Civil date, `YYYY-MM-DD`.
    pub date: NaiveDate,
}

/// Ban request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanRequest {
    /// Identity to ban.
    pub external_id: i64,
    /// Human-entered reason shown in the overview.
    pub reason: String,
    /// Ban length in days; omit for an indefinite ban.
    #[serde(default)]
    pub days: Option<u32>,
}

/// One ban row in a listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BanResponse {
    /// Banned identity.
    pub external_id: i64,
    /// Reason recorded with the ban.
    pub reason: String,
    /// Expiry instant; absent for indefinite bans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned_until: Option<DateTime<Utc>>,
    /// When the ban was issued.
    pub banned_at: DateTime<Utc>,
}

impl From<BanRecord> for BanResponse {
    fn from(record: BanRecord) -> Self {
        Self {
            external_id: record.external_id.as_i64(),
            reason: record.reason,
            banned_until: record.banned_until,
            banned_at: record.banned_at,
        }
    }
}

/// Reserve a slot on behalf of a resident known by surname and room.
#[post("/admin/bookings")]
pub async fn force_book(
    state: web::Data<HttpState>,
    body: web::Json<ForceBookRequest>,
) -> ApiResult<HttpResponse> {
    let (user, booking_id) = state
        .bookings
        .force_book(
            body.surname.trim(),
            body.room.trim(),
            ApplianceId::new(body.appliance_id),
            body.date,
            body.hour,
        )
        .await?;
    Ok(HttpResponse::Created().json(ForceBookResponse {
        booking_id: booking_id.as_i64(),
        user_id: user.id.as_i64(),
        stub: user.is_stub(),
    }))
}

/// Every booking on a date, joined with appliance details.
#[get("/admin/bookings")]
pub async fn list_bookings_for_date(
    state: web::Data<HttpState>,
    query: web::Query<OverviewQuery>,
) -> ApiResult<HttpResponse> {
    let bookings = state.bookings.list_all_for_date(query.date).await?;
    let response: Vec<BookingResponse> =
        bookings.into_iter().map(BookingResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// Delete any booking, regardless of owner.
#[delete("/admin/bookings/{id}")]
pub async fn delete_booking(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .bookings
        .admin_delete(BookingId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Issue (or replace) a ban.
#[post("/admin/bans")]
pub async fn create_ban(
    state: web::Data<HttpState>,
    body: web::Json<BanRequest>,
) -> ApiResult<HttpResponse> {
    let record = state
        .guard
        .ban(ExternalId::new(body.external_id), &body.reason, body.days)
        .await?;
    Ok(HttpResponse::Created().json(BanResponse::from(record)))
}

/// Lift a ban.
#[delete("/admin/bans/{external_id}")]
pub async fn delete_ban(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state.guard.unban(ExternalId::new(path.into_inner())).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Every ban row, newest first.
#[get("/admin/bans")]
pub async fn list_bans(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let bans = state.guard.list_bans().await?;
    let response: Vec<BanResponse> = bans.into_iter().map(BanResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}
