use crate::models::{EnergyDelta, QualityStats};

/// Fold interval diagnostics from the deltas behind one bucket into a
/// single quality figure. Informational only; totals are never adjusted
/// based on it.
pub fn fold(deltas: &[&EnergyDelta]) -> QualityStats {
    let mut total = 0u32;
    let mut valid = 0u32;
    let mut sum = 0.0f64;
    let mut min = f64::INFINITY;
    let mut max = 0.0f64;

    for delta in deltas {
        if delta.total_intervals == 0 {
            continue;
        }
        total += delta.total_intervals;
        valid += delta.valid_intervals;
        sum += delta.interval_seconds_sum;
        min = min.min(delta.interval_seconds_min);
        max = max.max(delta.interval_seconds_max);
    }

    if total == 0 {
        // No basis for assessment; not an error.
        return QualityStats::empty();
    }

    QualityStats {
        total_intervals: total,
        valid_intervals: valid,
        quality_percent: ((100.0 * f64::from(valid)) / f64::from(total)).round() as u8,
        avg_interval_seconds: sum / f64::from(total),
        min_interval_seconds: min,
        max_interval_seconds: max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn delta(total: u32, valid: u32, sum: f64, min: f64, max: f64) -> EnergyDelta {
        EnergyDelta {
            meter_id: "m".to_string(),
            bucket_ordinal: 0,
            delta_wh: 0.0,
            reading_count: total + 1,
            total_intervals: total,
            valid_intervals: valid,
            interval_seconds_sum: sum,
            interval_seconds_min: min,
            interval_seconds_max: max,
            clamp_count: 0,
        }
    }

    #[test]
    fn no_intervals_is_all_zero() {
        let stats = fold(&[]);
        assert_eq!(stats, QualityStats::empty());
        assert_eq!(stats.quality_percent, 0);
    }

    #[test]
    fn percent_is_rounded() {
        let one_of_three = delta(3, 1, 900.0, 300.0, 300.0);
        assert_eq!(fold(&[&one_of_three]).quality_percent, 33);

        let two_of_three = delta(3, 2, 900.0, 300.0, 300.0);
        assert_eq!(fold(&[&two_of_three]).quality_percent, 67);

        let all_valid = delta(4, 4, 1200.0, 300.0, 300.0);
        assert_eq!(fold(&[&all_valid]).quality_percent, 100);
    }

    #[test]
    fn folds_across_meters() {
        let a = delta(2, 2, 600.0, 200.0, 400.0);
        let b = delta(2, 1, 5000.0, 100.0, 4900.0);

        let stats = fold(&[&a, &b]);

        assert_eq!(stats.total_intervals, 4);
        assert_eq!(stats.valid_intervals, 3);
        assert_eq!(stats.quality_percent, 75);
        assert_eq!(stats.avg_interval_seconds, 1400.0);
        assert_eq!(stats.min_interval_seconds, 100.0);
        assert_eq!(stats.max_interval_seconds, 4900.0);
    }

    #[test]
    fn interval_free_deltas_do_not_skew_min() {
        let lonely = delta(0, 0, 0.0, 0.0, 0.0);
        let real = delta(1, 1, 300.0, 300.0, 300.0);

        let stats = fold(&[&lonely, &real]);

        assert_eq!(stats.total_intervals, 1);
        assert_eq!(stats.min_interval_seconds, 300.0);
    }
}
