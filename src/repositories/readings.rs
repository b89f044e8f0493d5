use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::collections::HashSet;

use crate::db::DbPool;
use crate::error::Result;
use crate::models::{normalize_meter_id, Reading};

/// Range access to raw meter readings.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Readings with `start <= ts < end`, optionally restricted to the
    /// given meters, ordered by `(meter_id, ts)`. Meter ids are normalized
    /// on the way in and out.
    async fn read_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        meter_ids: Option<&[String]>,
    ) -> Result<Vec<Reading>>;
}

#[derive(Clone)]
pub struct ReadingRepository {
    pool: DbPool,
}

impl ReadingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingSource for ReadingRepository {
    async fn read_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        meter_ids: Option<&[String]>,
    ) -> Result<Vec<Reading>> {
        let rows = sqlx::query(
            "SELECT meter_id, ts, energy_wh, power_w \
             FROM meter_readings \
             WHERE ts >= $1 AND ts < $2 \
             ORDER BY meter_id, ts",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut readings: Vec<Reading> = rows
            .iter()
            .map(|row| Reading {
                meter_id: normalize_meter_id(row.get::<&str, _>("meter_id")),
                ts: row.get("ts"),
                energy_wh: row.get("energy_wh"),
                power_w: row.get("power_w"),
            })
            .collect();

        // Filter on normalized ids; stored spellings are not trusted to
        // match the caller's.
        if let Some(ids) = meter_ids {
            let wanted: HashSet<String> = ids.iter().map(|id| normalize_meter_id(id)).collect();
            readings.retain(|r| wanted.contains(&r.meter_id));
        }

        // Normalization can reorder ids relative to their stored spelling,
        // so restore the (meter_id, ts) contract afterwards.
        readings.sort_by(|a, b| (a.meter_id.as_str(), a.ts).cmp(&(b.meter_id.as_str(), b.ts)));

        Ok(readings)
    }
}
