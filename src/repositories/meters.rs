use async_trait::async_trait;
use sqlx::Row;

use crate::db::DbPool;
use crate::error::Result;
use crate::models::{normalize_meter_id, Meter};

/// Directory access: which meters exist, their room mapping and whether
/// one of them is the designated supply meter.
#[async_trait]
pub trait MeterSource: Send + Sync {
    async fn list_meters(&self) -> Result<Vec<Meter>>;
}

#[derive(Clone)]
pub struct MeterRepository {
    pool: DbPool,
}

impl MeterRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MeterSource for MeterRepository {
    async fn list_meters(&self) -> Result<Vec<Meter>> {
        let rows = sqlx::query("SELECT meter_id, room, is_supply FROM meters ORDER BY meter_id")
            .fetch_all(&self.pool)
            .await?;

        let meters = rows
            .iter()
            .map(|row| Meter {
                meter_id: normalize_meter_id(row.get::<&str, _>("meter_id")),
                room: row.get("room"),
                is_supply: row.get("is_supply"),
            })
            .collect();

        Ok(meters)
    }
}
