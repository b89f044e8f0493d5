use chrono::{Duration, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::info;

use crate::aggregate;
use crate::buckets::{parse_reference_date, BucketPlan};
use crate::config::EngineConfig;
use crate::error::{AppError, Result};
use crate::integrate;
use crate::models::{EnergyReport, Meter, MeterDirectory, Period, Strategy};
use crate::repositories::{MeterSource, ReadingSource};

/// Answers one aggregate energy query end to end: plan buckets, snapshot
/// the directory, fetch the range, integrate, aggregate.
///
/// Stateless per call; clones share the sources and settings, so any
/// number of queries may run concurrently.
#[derive(Clone)]
pub struct EnergyService {
    readings: Arc<dyn ReadingSource>,
    meters: Arc<dyn MeterSource>,
    engine: EngineConfig,
}

impl EnergyService {
    pub fn new(
        readings: Arc<dyn ReadingSource>,
        meters: Arc<dyn MeterSource>,
        engine: EngineConfig,
    ) -> Self {
        Self {
            readings,
            meters,
            engine,
        }
    }

    pub async fn report(
        &self,
        period: &str,
        date: Option<&str>,
        room: Option<&str>,
        strategy: Option<Strategy>,
    ) -> Result<EnergyReport> {
        let period: Period = period.parse()?;
        let reference = match date {
            Some(raw) => parse_reference_date(raw)?,
            None => Utc::now().date_naive(),
        };
        let strategy = strategy.unwrap_or(self.engine.strategy);

        let plan = BucketPlan::build(period, reference, self.engine.epoch_year)?;

        let meters = self.meters.list_meters().await.map_err(source_unavailable)?;
        let directory = MeterDirectory::new(meters);

        // One bounded read; retries on transient storage trouble are the
        // source's business, not ours.
        let deadline = StdDuration::from_secs(self.engine.query_timeout_seconds);
        let readings = match tokio::time::timeout(
            deadline,
            self.readings.read_range(plan.start, plan.end, None),
        )
        .await
        {
            Ok(result) => result.map_err(source_unavailable)?,
            Err(_) => return Err(AppError::QueryTimeout(self.engine.query_timeout_seconds)),
        };

        let max_gap = Duration::minutes(i64::from(self.engine.max_gap_minutes));
        let deltas = integrate::integrate_all(&readings, &plan, strategy, max_gap);
        let report = aggregate::build_report(&plan, &deltas, &directory, room, strategy);

        info!(
            period = %report.period,
            strategy = %report.strategy,
            room = room.unwrap_or("-"),
            buckets = report.buckets.len(),
            readings = report.reading_count,
            meters = report.meter_count,
            no_data = report.is_empty(),
            "energy report built"
        );

        Ok(report)
    }

    pub async fn list_meters(&self) -> Result<Vec<Meter>> {
        self.meters.list_meters().await.map_err(source_unavailable)
    }
}

fn source_unavailable(err: AppError) -> AppError {
    match err {
        AppError::SourceUnavailable(_) => err,
        other => AppError::SourceUnavailable(other.to_string()),
    }
}
