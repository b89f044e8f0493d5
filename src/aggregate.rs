use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::buckets::BucketPlan;
use crate::models::{BucketResult, EnergyDelta, EnergyReport, MeterDirectory, Strategy};
use crate::quality;

enum Class {
    Supply,
    Consumption,
    Excluded { unmapped: bool },
}

/// The supply meter is global by definition; a room filter never touches
/// it. Everything else is consumption, subject to the filter.
fn classify(directory: &MeterDirectory, room: Option<&str>, meter_id: &str) -> Class {
    if directory.is_supply(meter_id) {
        return Class::Supply;
    }
    match room {
        None => Class::Consumption,
        Some(wanted) => match directory.room_of(meter_id) {
            Some(mapped) if mapped == wanted => Class::Consumption,
            Some(_) => Class::Excluded { unmapped: false },
            None => Class::Excluded { unmapped: true },
        },
    }
}

#[derive(Default)]
struct Slot<'a> {
    consumption_wh: f64,
    supply_wh: f64,
    contributors: Vec<&'a EnergyDelta>,
}

/// Merge per-meter deltas into one `BucketResult` per planned bucket.
///
/// The output always has exactly the plan's buckets in ordinal order,
/// zero-filled where nothing contributed. Quality is folded over the
/// deltas that actually made it into a bucket's displayed totals.
pub fn build_report(
    plan: &BucketPlan,
    deltas: &[EnergyDelta],
    directory: &MeterDirectory,
    room: Option<&str>,
    strategy: Strategy,
) -> EnergyReport {
    let ordinal_index: HashMap<i32, usize> = plan
        .buckets
        .iter()
        .enumerate()
        .map(|(idx, bucket)| (bucket.ordinal, idx))
        .collect();

    let mut slots: Vec<Slot> = (0..plan.len()).map(|_| Slot::default()).collect();
    let mut contributing_meters: HashSet<&str> = HashSet::new();
    let mut reading_count: u64 = 0;
    let mut clamp_count: u32 = 0;

    for delta in deltas {
        let Some(&idx) = ordinal_index.get(&delta.bucket_ordinal) else {
            continue;
        };

        match classify(directory, room, &delta.meter_id) {
            Class::Supply => slots[idx].supply_wh += delta.delta_wh,
            Class::Consumption => slots[idx].consumption_wh += delta.delta_wh,
            Class::Excluded { unmapped } => {
                if unmapped {
                    debug!(
                        meter_id = %delta.meter_id,
                        "meter has no room mapping, excluded from filtered totals"
                    );
                }
                continue;
            }
        }

        slots[idx].contributors.push(delta);
        contributing_meters.insert(delta.meter_id.as_str());
        reading_count += u64::from(delta.reading_count);
        clamp_count += delta.clamp_count;
    }

    let mut total_consumption_wh = 0.0;
    let mut total_supply_wh = 0.0;
    let buckets: Vec<BucketResult> = plan
        .buckets
        .iter()
        .zip(slots)
        .map(|(bucket, slot)| {
            total_consumption_wh += slot.consumption_wh;
            total_supply_wh += slot.supply_wh;
            BucketResult {
                bucket: bucket.clone(),
                consumption_wh: slot.consumption_wh,
                supply_wh: slot.supply_wh,
                quality: quality::fold(&slot.contributors),
            }
        })
        .collect();

    EnergyReport {
        period: plan.period,
        strategy,
        room: room.map(String::from),
        buckets,
        total_consumption_wh,
        total_supply_wh,
        net_wh: total_supply_wh - total_consumption_wh,
        reading_count,
        meter_count: contributing_meters.len() as u32,
        clamp_count,
    }
}
