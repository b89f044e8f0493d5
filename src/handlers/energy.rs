use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use crate::error::Result;
use crate::models::{EnergyReportResponse, MeterListResponse, Strategy};
use crate::services::EnergyService;

#[derive(Debug, Deserialize)]
pub struct ReportParams {
    period: String,
    /// Reference date `YYYY-MM-DD`; today when omitted.
    date: Option<String>,
    room: Option<String>,
    strategy: Option<Strategy>,
}

pub async fn get_report(
    State(service): State<EnergyService>,
    Query(params): Query<ReportParams>,
) -> Result<Json<EnergyReportResponse>> {
    let report = service
        .report(
            &params.period,
            params.date.as_deref(),
            params.room.as_deref(),
            params.strategy,
        )
        .await?;

    Ok(Json(report.into()))
}

pub async fn list_meters(State(service): State<EnergyService>) -> Result<Json<MeterListResponse>> {
    let data = service.list_meters().await?;
    let total = data.len();

    Ok(Json(MeterListResponse { data, total }))
}

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}
