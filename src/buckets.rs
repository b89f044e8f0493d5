use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::{AppError, Result};
use crate::models::{Bucket, Period};

/// Parse a query's reference date (`YYYY-MM-DD`).
///
/// The year is bounded so downstream calendar arithmetic stays well inside
/// chrono's representable range.
pub fn parse_reference_date(raw: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDate(raw.to_string()))?;
    if !(1970..=9999).contains(&date.year()) {
        return Err(AppError::InvalidDate(raw.to_string()));
    }
    Ok(date)
}

fn month_start(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::InvalidDate(format!("{year}-{month:02}")))
}

fn next_month_start(year: i32, month: u32) -> Result<NaiveDate> {
    if month == 12 {
        month_start(year + 1, 1)
    } else {
        month_start(year, month + 1)
    }
}

fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// The full timeline for one query: contiguous, non-overlapping buckets in
/// strictly increasing ordinal order, plus the overall `[start, end)` read
/// range they cover.
#[derive(Debug, Clone)]
pub struct BucketPlan {
    pub period: Period,
    pub buckets: Vec<Bucket>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BucketPlan {
    pub fn build(period: Period, reference: NaiveDate, epoch_year: i32) -> Result<Self> {
        let buckets = match period {
            Period::Hour => {
                let day_start = utc_midnight(reference);
                (0..24i32)
                    .map(|h| Bucket {
                        start: day_start + Duration::hours(i64::from(h)),
                        end: day_start + Duration::hours(i64::from(h) + 1),
                        label: format!("{h:02}:00"),
                        ordinal: h,
                    })
                    .collect()
            }
            Period::Day => {
                let first = month_start(reference.year(), reference.month())?;
                let next = next_month_start(reference.year(), reference.month())?;
                let days = (next - first).num_days();
                (0..days)
                    .map(|offset| {
                        let date = first + Duration::days(offset);
                        Bucket {
                            start: utc_midnight(date),
                            end: utc_midnight(date + Duration::days(1)),
                            label: date.format("%b %-d").to_string(),
                            ordinal: date.day() as i32,
                        }
                    })
                    .collect()
            }
            Period::Month => (1..=12u32)
                .map(|m| {
                    let first = month_start(reference.year(), m)?;
                    let next = next_month_start(reference.year(), m)?;
                    Ok(Bucket {
                        start: utc_midnight(first),
                        end: utc_midnight(next),
                        label: first.format("%B").to_string(),
                        ordinal: m as i32,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Period::Year => {
                // Reference dates before the epoch still get one bucket.
                let last = reference.year();
                let first_year = epoch_year.min(last);
                (first_year..=last)
                    .map(|y| {
                        Ok(Bucket {
                            start: utc_midnight(month_start(y, 1)?),
                            end: utc_midnight(month_start(y + 1, 1)?),
                            label: y.to_string(),
                            ordinal: y,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };

        let (start, end) = match (buckets.first(), buckets.last()) {
            (Some(first), Some(last)) => (first.start, last.end),
            _ => return Err(AppError::InvalidDate(reference.to_string())),
        };

        Ok(Self {
            period,
            buckets,
            start,
            end,
        })
    }

    /// Index of the bucket containing `ts`, if any. Buckets are sorted and
    /// contiguous, so a binary search on start is enough.
    pub fn index_of(&self, ts: DateTime<Utc>) -> Option<usize> {
        let after = self.buckets.partition_point(|b| b.start <= ts);
        if after == 0 {
            return None;
        }
        let candidate = after - 1;
        (ts < self.buckets[candidate].end).then_some(candidate)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        parse_reference_date(s).unwrap()
    }

    fn assert_contiguous(plan: &BucketPlan) {
        for pair in plan.buckets.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].ordinal < pair[1].ordinal);
        }
    }

    #[test]
    fn hour_plan_covers_the_day() {
        let plan = BucketPlan::build(Period::Hour, date("2024-08-05"), 2020).unwrap();

        assert_eq!(plan.len(), 24);
        assert_eq!(plan.buckets[0].label, "00:00");
        assert_eq!(plan.buckets[0].ordinal, 0);
        assert_eq!(plan.buckets[23].label, "23:00");
        assert_eq!(plan.buckets[23].ordinal, 23);
        assert_eq!(plan.start, Utc.with_ymd_and_hms(2024, 8, 5, 0, 0, 0).unwrap());
        assert_eq!(plan.end, Utc.with_ymd_and_hms(2024, 8, 6, 0, 0, 0).unwrap());
        assert_contiguous(&plan);
    }

    #[test]
    fn day_plan_matches_days_in_month() {
        let august = BucketPlan::build(Period::Day, date("2024-08-05"), 2020).unwrap();
        assert_eq!(august.len(), 31);
        assert_eq!(august.buckets[4].label, "Aug 5");
        assert_eq!(august.buckets[4].ordinal, 5);

        let leap_feb = BucketPlan::build(Period::Day, date("2024-02-10"), 2020).unwrap();
        assert_eq!(leap_feb.len(), 29);
        assert_eq!(leap_feb.buckets[28].label, "Feb 29");

        let plain_feb = BucketPlan::build(Period::Day, date("2023-02-10"), 2020).unwrap();
        assert_eq!(plain_feb.len(), 28);
        assert_contiguous(&plain_feb);
    }

    #[test]
    fn month_plan_is_twelve_buckets() {
        let plan = BucketPlan::build(Period::Month, date("2024-08-05"), 2020).unwrap();

        assert_eq!(plan.len(), 12);
        assert_eq!(plan.buckets[0].label, "January");
        assert_eq!(plan.buckets[0].ordinal, 1);
        assert_eq!(plan.buckets[11].label, "December");
        assert_eq!(plan.buckets[11].ordinal, 12);
        assert_eq!(plan.end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_contiguous(&plan);
    }

    #[test]
    fn year_plan_runs_from_epoch_to_reference_year() {
        let plan = BucketPlan::build(Period::Year, date("2024-08-05"), 2020).unwrap();

        assert_eq!(plan.len(), 5);
        let ordinals: Vec<i32> = plan.buckets.iter().map(|b| b.ordinal).collect();
        assert_eq!(ordinals, vec![2020, 2021, 2022, 2023, 2024]);
        assert_eq!(plan.buckets[0].label, "2020");
        assert_contiguous(&plan);
    }

    #[test]
    fn year_plan_before_epoch_still_has_one_bucket() {
        let plan = BucketPlan::build(Period::Year, date("1999-06-01"), 2020).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.buckets[0].ordinal, 1999);
    }

    #[test]
    fn reference_date_parse_failures() {
        assert!(matches!(
            parse_reference_date("not-a-date").unwrap_err(),
            AppError::InvalidDate(_)
        ));
        assert!(matches!(
            parse_reference_date("2024-02-30").unwrap_err(),
            AppError::InvalidDate(_)
        ));
        assert!(matches!(
            parse_reference_date("0999-01-01").unwrap_err(),
            AppError::InvalidDate(_)
        ));
    }

    #[test]
    fn index_of_uses_half_open_buckets() {
        let plan = BucketPlan::build(Period::Hour, date("2024-08-05"), 2020).unwrap();

        let inside = Utc.with_ymd_and_hms(2024, 8, 5, 0, 30, 0).unwrap();
        assert_eq!(plan.index_of(inside), Some(0));

        // A bucket's end belongs to the next bucket.
        let boundary = Utc.with_ymd_and_hms(2024, 8, 5, 1, 0, 0).unwrap();
        assert_eq!(plan.index_of(boundary), Some(1));

        let before = Utc.with_ymd_and_hms(2024, 8, 4, 23, 59, 59).unwrap();
        assert_eq!(plan.index_of(before), None);

        let at_end = Utc.with_ymd_and_hms(2024, 8, 6, 0, 0, 0).unwrap();
        assert_eq!(plan.index_of(at_end), None);
    }
}
