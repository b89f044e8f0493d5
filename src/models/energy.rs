use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// One raw sample: the meter's lifetime energy counter plus the
/// instantaneous power at sample time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Reading {
    pub meter_id: String,
    pub ts: DateTime<Utc>,
    pub energy_wh: f64,
    pub power_w: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hour,
    Day,
    Month,
    Year,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Hour => "hour",
            Period::Day => "day",
            Period::Month => "month",
            Period::Year => "year",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hour" => Ok(Period::Hour),
            "day" => Ok(Period::Day),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            _ => Err(AppError::InvalidPeriod(s.to_string())),
        }
    }
}

/// How per-bucket energy is derived from raw readings. Both remain
/// supported; neither dominates for all data shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Last minus first cumulative counter value per bucket. Robust to
    /// missing samples, sensitive to counter resets.
    CounterDelta,
    /// Trapezoidal integration of instantaneous power over consecutive
    /// sample pairs, with a gap guard. Robust to resets, blind across
    /// long gaps.
    Trapezoidal,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CounterDelta => "counter_delta",
            Strategy::Trapezoidal => "trapezoidal",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One slot of the report timeline. Half-open range `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
    pub ordinal: i32,
}

/// Integration output for one (meter, bucket) pair. The interval fields
/// feed quality reporting and are folded per bucket by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyDelta {
    pub meter_id: String,
    pub bucket_ordinal: i32,
    pub delta_wh: f64,
    pub reading_count: u32,
    pub total_intervals: u32,
    pub valid_intervals: u32,
    pub interval_seconds_sum: f64,
    pub interval_seconds_min: f64,
    pub interval_seconds_max: f64,
    pub clamp_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityStats {
    pub total_intervals: u32,
    pub valid_intervals: u32,
    pub quality_percent: u8,
    pub avg_interval_seconds: f64,
    pub min_interval_seconds: f64,
    pub max_interval_seconds: f64,
}

impl QualityStats {
    pub fn empty() -> Self {
        Self {
            total_intervals: 0,
            valid_intervals: 0,
            quality_percent: 0,
            avg_interval_seconds: 0.0,
            min_interval_seconds: 0.0,
            max_interval_seconds: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketResult {
    pub bucket: Bucket,
    pub consumption_wh: f64,
    pub supply_wh: f64,
    pub quality: QualityStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyReport {
    pub period: Period,
    pub strategy: Strategy,
    pub room: Option<String>,
    pub buckets: Vec<BucketResult>,
    pub total_consumption_wh: f64,
    pub total_supply_wh: f64,
    /// Supply minus consumption over the whole report range.
    pub net_wh: f64,
    pub reading_count: u64,
    pub meter_count: u32,
    pub clamp_count: u32,
}

impl EnergyReport {
    /// True when no reading contributed anywhere. Still a valid,
    /// fully zero-filled answer, not a failure.
    pub fn is_empty(&self) -> bool {
        self.reading_count == 0
    }
}

// Wire DTOs. Display units are kWh; the engine itself stays in Wh.

fn wh_to_kwh(wh: f64) -> f64 {
    wh / 1000.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketResponse {
    pub label: String,
    pub ordinal: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub consumption_kwh: f64,
    pub supply_kwh: f64,
    pub quality: QualityStats,
}

impl From<BucketResult> for BucketResponse {
    fn from(result: BucketResult) -> Self {
        Self {
            label: result.bucket.label,
            ordinal: result.bucket.ordinal,
            start: result.bucket.start,
            end: result.bucket.end,
            consumption_kwh: wh_to_kwh(result.consumption_wh),
            supply_kwh: wh_to_kwh(result.supply_wh),
            quality: result.quality,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyReportResponse {
    pub period: String,
    pub strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Set when no reading matched the query, so clients can render
    /// "no data" instead of a row of zeroes that looks like an outage.
    pub no_data: bool,
    pub buckets: Vec<BucketResponse>,
    pub total_consumption_kwh: f64,
    pub total_supply_kwh: f64,
    pub net_kwh: f64,
    pub reading_count: u64,
    pub meter_count: u32,
    pub clamp_count: u32,
}

impl From<EnergyReport> for EnergyReportResponse {
    fn from(report: EnergyReport) -> Self {
        let no_data = report.is_empty();
        Self {
            period: report.period.to_string(),
            strategy: report.strategy.to_string(),
            room: report.room,
            no_data,
            buckets: report.buckets.into_iter().map(Into::into).collect(),
            total_consumption_kwh: wh_to_kwh(report.total_consumption_wh),
            total_supply_kwh: wh_to_kwh(report.total_supply_wh),
            net_kwh: wh_to_kwh(report.net_wh),
            reading_count: report.reading_count,
            meter_count: report.meter_count,
            clamp_count: report.clamp_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterListResponse {
    pub data: Vec<super::Meter>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn period_parses_case_insensitively() {
        assert_eq!("hour".parse::<Period>().unwrap(), Period::Hour);
        assert_eq!("DAY".parse::<Period>().unwrap(), Period::Day);
        assert_eq!("Month".parse::<Period>().unwrap(), Period::Month);
        assert_eq!("year".parse::<Period>().unwrap(), Period::Year);
    }

    #[test]
    fn unknown_period_is_rejected() {
        let err = "week".parse::<Period>().unwrap_err();
        assert!(matches!(err, AppError::InvalidPeriod(ref s) if s == "week"));
    }

    #[test]
    fn strategy_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&Strategy::CounterDelta).unwrap(),
            "\"counter_delta\""
        );
        let parsed: Strategy = serde_json::from_str("\"trapezoidal\"").unwrap();
        assert_eq!(parsed, Strategy::Trapezoidal);
    }

    #[test]
    fn report_response_converts_to_kwh() {
        let bucket = Bucket {
            start: Utc.with_ymd_and_hms(2024, 8, 5, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 8, 5, 1, 0, 0).unwrap(),
            label: "00:00".to_string(),
            ordinal: 0,
        };
        let report = EnergyReport {
            period: Period::Hour,
            strategy: Strategy::CounterDelta,
            room: None,
            buckets: vec![BucketResult {
                bucket,
                consumption_wh: 1500.0,
                supply_wh: 2000.0,
                quality: QualityStats::empty(),
            }],
            total_consumption_wh: 1500.0,
            total_supply_wh: 2000.0,
            net_wh: 500.0,
            reading_count: 4,
            meter_count: 2,
            clamp_count: 0,
        };

        let response = EnergyReportResponse::from(report);
        assert!(!response.no_data);
        assert_eq!(response.period, "hour");
        assert_eq!(response.strategy, "counter_delta");
        assert_eq!(response.total_consumption_kwh, 1.5);
        assert_eq!(response.total_supply_kwh, 2.0);
        assert_eq!(response.net_kwh, 0.5);
        assert_eq!(response.buckets[0].consumption_kwh, 1.5);
        assert_eq!(response.buckets[0].supply_kwh, 2.0);
    }

    #[test]
    fn empty_report_sets_no_data() {
        let report = EnergyReport {
            period: Period::Day,
            strategy: Strategy::Trapezoidal,
            room: Some("201".to_string()),
            buckets: vec![],
            total_consumption_wh: 0.0,
            total_supply_wh: 0.0,
            net_wh: 0.0,
            reading_count: 0,
            meter_count: 0,
            clamp_count: 0,
        };

        assert!(report.is_empty());
        let response = EnergyReportResponse::from(report);
        assert!(response.no_data);
        assert_eq!(response.room.as_deref(), Some("201"));
    }
}
