use crate::duration::{self, Elapsed};
use crate::record::WorkoutRecord;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Chronological key of a month group. Labels are locale text and do not
/// sort correctly, so groups are ordered by this instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }
}

/// Chronological key of an ISO week group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WeekKey {
    pub iso_year: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        WeekKey {
            iso_year: iso.year(),
            week: iso.week(),
        }
    }
}

/// One row of a by-month or by-week summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupSummary {
    pub label: String,
    pub count: usize,
    pub distance_km: f64,
    pub duration: Elapsed,
    pub duration_text: String,
    pub pace_text: String,
}

/// Whole-log figures.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Totals {
    pub count: usize,
    pub distance_km: f64,
    pub duration: Elapsed,
    pub duration_text: String,
    pub pace_text: String,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Default)]
struct Accumulator {
    label: String,
    count: usize,
    distance_km: f64,
    duration: Elapsed,
}

impl Accumulator {
    fn push(&mut self, record: &WorkoutRecord) {
        self.count += 1;
        self.distance_km += record.distance_km().unwrap_or(0.0);
        self.duration = self.duration + record.duration();
    }

    fn finish(self) -> GroupSummary {
        GroupSummary {
            duration_text: duration::format_duration(self.duration),
            // total time over total distance, so longer runs weigh more
            pace_text: duration::format_pace(self.duration, Some(self.distance_km)),
            label: self.label,
            count: self.count,
            distance_km: self.distance_km,
            duration: self.duration,
        }
    }
}

/// Groups dated records by `key`, in ascending key order. Undated records
/// are left out.
fn group_by<K, F, L>(records: &[WorkoutRecord], key: F, label: L) -> Vec<GroupSummary>
where
    K: Ord,
    F: Fn(NaiveDate) -> K,
    L: Fn(&WorkoutRecord) -> String,
{
    let mut groups: BTreeMap<K, Accumulator> = BTreeMap::new();
    for record in records {
        let Some(date) = record.date() else {
            continue;
        };
        let acc = groups.entry(key(date)).or_insert_with(|| Accumulator {
            label: label(record),
            ..Accumulator::default()
        });
        acc.push(record);
    }
    groups.into_values().map(Accumulator::finish).collect()
}

/// Summarize records per calendar month
///
/// Groups are ordered by `(year, month)`, not by their label text. Undated
/// records are left out. The pace of a group is its total time over its total
/// distance.
///
/// # Arguments
/// * `records` - Normalized records, in any order
///
/// # Returns
/// * `Vec<GroupSummary>` - One entry per month that has a dated record
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use runlog::calendar::PORTUGUESE;
/// use runlog::duration::Elapsed;
/// use runlog::normalizer::normalize;
/// use runlog::record::Workout;
/// use runlog::summary::by_month;
///
/// let run = |day, km, minutes| Workout {
///     date: NaiveDate::from_ymd_opt(2024, 3, day),
///     distance_km: Some(km),
///     duration: Elapsed::from_hms(0, minutes, 0),
///     ..Workout::default()
/// };
/// let records = normalize(vec![run(4, 2.0, 10), run(6, 8.0, 59)], &PORTUGUESE);
///
/// let months = by_month(&records);
/// assert_eq!(months[0].label, "Março 2024");
/// assert_eq!(months[0].count, 2);
/// assert_eq!(months[0].duration_text, "01:09:00");
/// ```
pub fn by_month(records: &[WorkoutRecord]) -> Vec<GroupSummary> {
    group_by(records, MonthKey::of, |r| r.derived.month_label.clone())
}

/// Same as [`by_month`], keyed by ISO week-numbering year and week.
pub fn by_week(records: &[WorkoutRecord]) -> Vec<GroupSummary> {
    group_by(records, WeekKey::of, |r| r.derived.week_label.clone())
}

/// Totals over every record, dated or not. First and last dates only
/// consider dated records.
pub fn totals(records: &[WorkoutRecord]) -> Totals {
    let mut acc = Accumulator::default();
    for record in records {
        acc.push(record);
    }
    let first_date = records.iter().filter_map(WorkoutRecord::date).min();
    let last_date = records.iter().filter_map(WorkoutRecord::date).max();
    let group = acc.finish();
    Totals {
        count: group.count,
        distance_km: group.distance_km,
        duration: group.duration,
        duration_text: group.duration_text,
        pace_text: group.pace_text,
        first_date,
        last_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{ENGLISH, PORTUGUESE};
    use crate::normalizer::normalize;
    use crate::record::Workout;

    fn workout(date: Option<(i32, u32, u32)>, km: Option<f64>, secs: u64) -> Workout {
        Workout {
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            distance_km: km,
            duration: Elapsed::from_secs(secs),
            ..Workout::default()
        }
    }

    #[test]
    fn empty_log_has_empty_summaries() {
        assert!(by_month(&[]).is_empty());
        assert!(by_week(&[]).is_empty());
        let t = totals(&[]);
        assert_eq!(t.count, 0);
        assert_eq!(t.duration_text, "00:00:00");
        assert_eq!(t.pace_text, "");
        assert_eq!(t.first_date, None);
    }

    #[test]
    fn group_pace_is_weighted_by_distance() {
        let records = normalize(
            vec![
                workout(Some((2024, 3, 4)), Some(2.0), 10 * 60),
                workout(Some((2024, 3, 6)), Some(8.0), 60 * 60),
            ],
            &PORTUGUESE,
        );
        // per-record paces are 05:00 and 07:30
        assert_eq!(records[0].derived.pace_text, "05:00");
        assert_eq!(records[1].derived.pace_text, "07:30");

        let months = by_month(&records);
        assert_eq!(months.len(), 1);
        let march = &months[0];
        assert_eq!(march.count, 2);
        assert_eq!(march.distance_km, 10.0);
        assert_eq!(march.duration_text, "01:10:00");
        // 4200 s over 10 km is 420 s/km
        assert_eq!(march.pace_text, "07:00");
        // the naive mean of the two paces would be 06:15
        assert_ne!(march.pace_text, "06:15");
    }

    #[test]
    fn equal_distance_groups() {
        let records = normalize(
            vec![
                workout(Some((2024, 3, 4)), Some(5.0), 25 * 60),
                workout(Some((2024, 3, 5)), Some(5.0), 35 * 60),
            ],
            &PORTUGUESE,
        );
        let week = &by_week(&records)[0];
        assert_eq!(week.label, "2024-W10");
        assert_eq!(week.duration_text, "01:00:00");
        assert_eq!(week.pace_text, "06:00");
    }

    #[test]
    fn months_sort_chronologically_not_by_label() {
        let records = normalize(
            vec![
                workout(Some((2024, 1, 15)), Some(1.0), 300),
                workout(Some((2023, 12, 15)), Some(1.0), 300),
                workout(Some((2024, 2, 15)), Some(1.0), 300),
                workout(Some((2023, 4, 15)), Some(1.0), 300),
            ],
            &ENGLISH,
        );
        let labels: Vec<String> = by_month(&records).into_iter().map(|g| g.label).collect();
        assert_eq!(
            labels,
            vec!["April 2023", "December 2023", "January 2024", "February 2024"]
        );
    }

    #[test]
    fn weeks_sort_across_iso_year_boundary() {
        let records = normalize(
            vec![
                workout(Some((2025, 1, 8)), Some(1.0), 300),
                workout(Some((2024, 12, 30)), Some(1.0), 300),
                workout(Some((2024, 12, 27)), Some(1.0), 300),
            ],
            &PORTUGUESE,
        );
        let labels: Vec<String> = by_week(&records).into_iter().map(|g| g.label).collect();
        assert_eq!(labels, vec!["2024-W52", "2025-W01", "2025-W02"]);
    }

    #[test]
    fn distance_is_partitioned_by_groups() {
        let records = normalize(
            vec![
                workout(Some((2024, 1, 1)), Some(5.5), 1800),
                workout(Some((2024, 1, 20)), None, 600),
                workout(Some((2024, 2, 3)), Some(12.25), 4000),
                workout(Some((2024, 3, 9)), Some(0.0), 0),
                workout(Some((2024, 3, 10)), Some(7.0), 2100),
            ],
            &PORTUGUESE,
        );
        let all: f64 = records.iter().filter_map(|r| r.distance_km()).sum();
        let months: f64 = by_month(&records).iter().map(|g| g.distance_km).sum();
        let weeks: f64 = by_week(&records).iter().map(|g| g.distance_km).sum();
        assert!((all - months).abs() < 1e-9);
        assert!((all - weeks).abs() < 1e-9);
        let counted: usize = by_month(&records).iter().map(|g| g.count).sum();
        assert_eq!(counted, records.len());
    }

    #[test]
    fn undated_records_only_count_in_totals() {
        let records = normalize(
            vec![
                workout(Some((2024, 5, 1)), Some(5.0), 1500),
                workout(None, Some(3.0), 900),
            ],
            &PORTUGUESE,
        );
        assert_eq!(by_month(&records)[0].count, 1);
        assert_eq!(by_week(&records)[0].distance_km, 5.0);
        let t = totals(&records);
        assert_eq!(t.count, 2);
        assert_eq!(t.distance_km, 8.0);
        assert_eq!(t.duration_text, "00:40:00");
        assert_eq!(t.pace_text, "05:00");
        assert_eq!(t.first_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(t.last_date, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn group_without_distance_has_empty_pace() {
        let records = normalize(vec![workout(Some((2024, 5, 1)), None, 1500)], &PORTUGUESE);
        assert_eq!(by_month(&records)[0].pace_text, "");
    }
}
