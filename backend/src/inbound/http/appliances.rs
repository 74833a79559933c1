//! Appliance catalog read endpoints.
//!
//! ```text
//! GET /api/v1/appliances
//! GET /api/v1/appliances/{id}/free-hours?date=YYYY-MM-DD
//! ```

use actix_web::{HttpResponse, get, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Appliance, ApplianceId, ApplianceKind};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// One catalog entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceResponse {
    /// Catalog identifier.
    pub id: i64,
    /// `wash` or `dry`.
    pub kind: ApplianceKind,
    /// Human-facing name.
    pub name: String,
}

impl From<Appliance> for ApplianceResponse {
    fn from(appliance: Appliance) -> Self {
        Self {
            id: appliance.id.as_i64(),
            kind: appliance.kind,
            name: appliance.name,
        }
    }
}

/// Date selector for the free-hours query.
#[derive(Debug, Deserialize)]
pub struct FreeHoursQuery {
    /// Civil date in the house time zone, `YYYY-MM-DD`.
    pub date: NaiveDate,
}

/// Free-hours response payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeHoursResponse {
    /// Echo of the requested date.
    pub date: NaiveDate,
    /// Bookable hours still open, ascending.
    pub hours: Vec<u8>,
}

/// List the appliance catalog.
#[get("/appliances")]
pub async fn list_appliances(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let appliances = state.appliances.list().await?;
    let response: Vec<ApplianceResponse> =
        appliances.into_iter().map(ApplianceResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// List the hours still free for an appliance on a date.
#[get("/appliances/{id}/free-hours")]
pub async fn free_hours(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
    query: web::Query<FreeHoursQuery>,
) -> ApiResult<HttpResponse> {
    let appliance = ApplianceId::new(path.into_inner());
    let hours = state.bookings.free_hours(appliance, query.date).await?;
    Ok(HttpResponse::Ok().json(FreeHoursResponse {
        date: query.date,
        hours,
    }))
}
