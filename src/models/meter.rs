use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use tracing::warn;

/// Canonical form of a meter id: lowercase, separators removed.
///
/// Device identifiers arrive in whatever spelling the reporting firmware
/// prefers ("AA:BB:CC:DD:EE:FF", "aa-bb-cc-dd-ee-ff", "aabbcc.ddeeff").
/// Readings and the directory are both normalized once at their load
/// boundary, so every lookup after that is a plain map hit.
pub fn normalize_meter_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ':' | '-' | '_' | '.' | ' '))
        .collect::<String>()
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Meter {
    pub meter_id: String,
    pub room: Option<String>,
    pub is_supply: bool,
}

/// Immutable per-query snapshot of the meter directory, keyed by
/// normalized meter id.
#[derive(Debug, Clone, Default)]
pub struct MeterDirectory {
    meters: HashMap<String, Meter>,
    supply_id: Option<String>,
}

impl MeterDirectory {
    pub fn new(meters: Vec<Meter>) -> Self {
        let mut map = HashMap::with_capacity(meters.len());
        let mut supply_id: Option<String> = None;

        for mut meter in meters {
            meter.meter_id = normalize_meter_id(&meter.meter_id);
            if meter.is_supply {
                if let Some(previous) = supply_id.replace(meter.meter_id.clone()) {
                    warn!(
                        previous = %previous,
                        kept = %meter.meter_id,
                        "multiple supply meters in directory, keeping the last"
                    );
                }
            }
            map.insert(meter.meter_id.clone(), meter);
        }

        Self {
            meters: map,
            supply_id,
        }
    }

    /// Lookup by normalized id.
    pub fn get(&self, meter_id: &str) -> Option<&Meter> {
        self.meters.get(meter_id)
    }

    pub fn is_supply(&self, meter_id: &str) -> bool {
        self.supply_id.as_deref() == Some(meter_id)
    }

    pub fn room_of(&self, meter_id: &str) -> Option<&str> {
        self.meters.get(meter_id).and_then(|m| m.room.as_deref())
    }

    pub fn contains_room(&self, room: &str) -> bool {
        self.meters
            .values()
            .any(|m| m.room.as_deref() == Some(room))
    }

    pub fn supply_id(&self) -> Option<&str> {
        self.supply_id.as_deref()
    }

    pub fn len(&self) -> usize {
        self.meters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }
}
