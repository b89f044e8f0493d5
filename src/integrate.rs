use chrono::Duration;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::buckets::BucketPlan;
use crate::models::{EnergyDelta, Reading, Strategy};

/// Integrate a whole query's readings: group per meter, sort by time and
/// fold each meter's sequence into per-bucket deltas.
///
/// Meters are visited in BTreeMap order so a repeated query over the same
/// data produces an identical delta sequence.
pub fn integrate_all(
    readings: &[Reading],
    plan: &BucketPlan,
    strategy: Strategy,
    max_gap: Duration,
) -> Vec<EnergyDelta> {
    let mut by_meter: BTreeMap<&str, Vec<&Reading>> = BTreeMap::new();
    for reading in readings {
        by_meter
            .entry(reading.meter_id.as_str())
            .or_default()
            .push(reading);
    }

    let mut deltas = Vec::new();
    for (meter_id, mut meter_readings) in by_meter {
        meter_readings.sort_by(|a, b| a.ts.cmp(&b.ts));
        deltas.extend(integrate_meter(
            meter_id,
            &meter_readings,
            plan,
            strategy,
            max_gap,
        ));
    }
    deltas
}

#[derive(Debug, Default)]
struct BucketAccum {
    first_energy: Option<f64>,
    last_energy: Option<f64>,
    trapezoid_wh: f64,
    reading_count: u32,
    total_intervals: u32,
    valid_intervals: u32,
    interval_seconds_sum: f64,
    interval_seconds_min: f64,
    interval_seconds_max: f64,
}

impl BucketAccum {
    fn observe_reading(&mut self, energy_wh: f64) {
        if self.first_energy.is_none() {
            self.first_energy = Some(energy_wh);
        }
        self.last_energy = Some(energy_wh);
        self.reading_count += 1;
    }

    fn observe_interval(&mut self, seconds: f64, valid: bool) {
        if self.total_intervals == 0 {
            self.interval_seconds_min = seconds;
            self.interval_seconds_max = seconds;
        } else {
            self.interval_seconds_min = self.interval_seconds_min.min(seconds);
            self.interval_seconds_max = self.interval_seconds_max.max(seconds);
        }
        self.total_intervals += 1;
        if valid {
            self.valid_intervals += 1;
        }
        self.interval_seconds_sum += seconds;
    }
}

/// Fold one meter's time-sorted readings into sparse per-bucket deltas.
///
/// Counter-delta takes last minus first counter value per bucket; it needs
/// no power values but a counter reset inside a bucket goes negative and is
/// clamped. Trapezoidal integrates `(p_prev + p_cur) / 2` over each
/// consecutive pair, attributing the energy to the bucket of the later
/// reading; pairs further apart than `max_gap` contribute nothing and count
/// as invalid intervals. The first reading in range has no prior sample and
/// contributes nothing on its own.
fn integrate_meter(
    meter_id: &str,
    readings: &[&Reading],
    plan: &BucketPlan,
    strategy: Strategy,
    max_gap: Duration,
) -> Vec<EnergyDelta> {
    let mut accums: BTreeMap<usize, BucketAccum> = BTreeMap::new();
    let mut prev: Option<&Reading> = None;

    for &reading in readings {
        let Some(idx) = plan.index_of(reading.ts) else {
            debug!(meter_id, ts = %reading.ts, "reading outside plan range, skipped");
            continue;
        };
        accums.entry(idx).or_default().observe_reading(reading.energy_wh);

        if let Some(previous) = prev {
            let elapsed = reading.ts - previous.ts;
            let seconds = elapsed.num_milliseconds() as f64 / 1000.0;
            let valid = elapsed <= max_gap;

            // Intervals belong to the bucket of their later endpoint.
            let accum = accums.entry(idx).or_default();
            accum.observe_interval(seconds, valid);

            if strategy == Strategy::Trapezoidal {
                if valid {
                    let hours = seconds / 3600.0;
                    accum.trapezoid_wh += (previous.power_w + reading.power_w) / 2.0 * hours;
                } else {
                    debug!(
                        meter_id,
                        gap_seconds = seconds,
                        "interval exceeds max gap, contributes no energy"
                    );
                }
            }
        }
        prev = Some(reading);
    }

    accums
        .into_iter()
        .map(|(idx, accum)| {
            let ordinal = plan.buckets[idx].ordinal;
            let raw_wh = match strategy {
                Strategy::CounterDelta => match (accum.first_energy, accum.last_energy) {
                    (Some(first), Some(last)) => last - first,
                    _ => 0.0,
                },
                Strategy::Trapezoidal => accum.trapezoid_wh,
            };

            let mut clamp_count = 0;
            let delta_wh = if raw_wh < 0.0 {
                warn!(
                    meter_id,
                    ordinal,
                    raw_wh,
                    "negative bucket delta clamped to zero, counter reset suspected"
                );
                clamp_count = 1;
                0.0
            } else {
                raw_wh
            };

            EnergyDelta {
                meter_id: meter_id.to_string(),
                bucket_ordinal: ordinal,
                delta_wh,
                reading_count: accum.reading_count,
                total_intervals: accum.total_intervals,
                valid_intervals: accum.valid_intervals,
                interval_seconds_sum: accum.interval_seconds_sum,
                interval_seconds_min: accum.interval_seconds_min,
                interval_seconds_max: accum.interval_seconds_max,
                clamp_count,
            }
        })
        .collect()
}
