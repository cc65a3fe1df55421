use crate::calendar::{self, Locale};
use crate::duration;
use crate::record::{CANONICAL_COLUMNS, CellValue, Column, Derived, RawTable, Workout, WorkoutRecord};
use std::collections::HashMap;

/// Settings that change how loose input is read and how labels are rendered.
#[derive(Clone, Copy, Debug)]
pub struct NormalizeOptions {
    pub locale: Locale,
    pub day_first: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        NormalizeOptions {
            locale: calendar::PORTUGUESE,
            day_first: true,
        }
    }
}

/// Maps each canonical column to its position in the loaded headers.
/// Missing columns are absent from the map and read as empty cells.
pub fn resolve_columns(headers: &[String]) -> HashMap<Column, usize> {
    let mut positions = HashMap::new();
    for (i, header) in headers.iter().enumerate() {
        match Column::from_header(header) {
            Some(column) => {
                positions.entry(column).or_insert(i);
            }
            None => log::debug!("ignoring unknown column {:?}", header),
        }
    }
    for column in CANONICAL_COLUMNS {
        if !positions.contains_key(&column) {
            log::debug!("column {:?} missing, filling with empty values", column);
        }
    }
    positions
}

/// Coerces a distance cell. Unreadable, negative and non-finite values
/// become `None`.
pub fn parse_distance(value: &CellValue) -> Option<f64> {
    let km = match value {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                None
            } else {
                text.parse::<f64>()
                    .ok()
                    .or_else(|| text.replace(',', ".").parse::<f64>().ok())
            }
        }
        _ => None,
    };
    match km {
        Some(km) if km.is_finite() && km >= 0.0 => Some(km),
        Some(km) => {
            log::warn!("discarding invalid distance {}", km);
            None
        }
        None => {
            if !value.is_empty() {
                log::debug!("unreadable distance {:?}, using null", value);
            }
            None
        }
    }
}

fn cell_at<'t>(
    table: &'t RawTable,
    positions: &HashMap<Column, usize>,
    row: usize,
    column: Column,
) -> &'t CellValue {
    match positions.get(&column) {
        Some(&col) => table.cell(row, col),
        None => table.cell(usize::MAX, usize::MAX),
    }
}

/// Reads one raw row into a workout.
fn read_row(
    table: &RawTable,
    row: usize,
    positions: &HashMap<Column, usize>,
    options: &NormalizeOptions,
) -> Workout {
    let cell = |column: Column| cell_at(table, positions, row, column);

    let workout = Workout {
        date: calendar::parse_date(cell(Column::Date), options.day_first),
        distance_km: parse_distance(cell(Column::Distance)),
        duration: duration::parse_duration(cell(Column::Duration)),
        kind: cell(Column::Kind).to_text(),
        notes: cell(Column::Notes).to_text(),
    };

    check_pace(cell(Column::Pace), &workout, row);
    workout
}

/// Pace is always recomputed; a stored pace that disagrees is only reported.
fn check_pace(stored: &CellValue, workout: &Workout, row: usize) {
    if stored.is_empty() {
        return;
    }
    let stored_secs = match stored {
        CellValue::Text(text) => duration::parse_pace_text(text),
        other => Some(duration::parse_duration(other).as_secs()),
    };
    let computed = duration::pace_seconds(workout.duration, workout.distance_km);
    if stored_secs != computed {
        log::debug!(
            "row {}: stored pace {:?} replaced by {:?}",
            row,
            stored.to_text(),
            duration::format_pace(workout.duration, workout.distance_km)
        );
    }
}

/// Computes the derived labels of one workout.
pub fn derive(workout: &Workout, locale: &Locale) -> Derived {
    let mut derived = Derived {
        duration_text: duration::format_duration(workout.duration),
        pace_text: duration::format_pace(workout.duration, workout.distance_km),
        ..Derived::default()
    };
    if let Some(date) = workout.date {
        derived.month_label = calendar::month_label(date, locale);
        derived.week_label = calendar::week_label(date);
        derived.weekday_name = calendar::weekday_name(date, locale).to_string();
    }
    derived
}

/// Rebuilds the whole collection: derives every label and sorts by date.
///
/// The sort is stable, and undated workouts go after all dated ones.
pub fn normalize(workouts: Vec<Workout>, locale: &Locale) -> Vec<WorkoutRecord> {
    let mut records: Vec<WorkoutRecord> = workouts
        .into_iter()
        .map(|workout| {
            let derived = derive(&workout, locale);
            WorkoutRecord::new(workout, derived)
        })
        .collect();
    records.sort_by_key(|r| (r.workout.date.is_none(), r.workout.date));
    records
}

/// Runs the full pipeline over a freshly loaded table.
///
/// Headers are matched to canonical columns, each cell is coerced
/// (unreadable dates become null, unreadable durations zero), all-blank rows
/// are skipped and the result is sorted by date.
///
/// # Arguments
/// * `table` - Raw rows as returned by [`crate::loader::load_table`]
/// * `options` - Locale for the labels and the day/month order for dates
///
/// # Returns
/// * `Vec<WorkoutRecord>` - The canonical table, oldest first, undated rows last
///
/// # Examples
/// ```
/// use runlog::normalizer::{NormalizeOptions, normalize_table};
/// use runlog::record::{CellValue, RawTable};
///
/// let mut table = RawTable::new(vec!["data".to_string(), "dist_km".to_string(), "tempo".to_string()]);
/// table.push_row(vec![
///     CellValue::Text("05/03/2024".to_string()),
///     CellValue::Text("10".to_string()),
///     CellValue::Text("0:52:10".to_string()),
/// ]);
///
/// let records = normalize_table(&table, &NormalizeOptions::default());
/// assert_eq!(records[0].derived.month_label, "Março 2024");
/// assert_eq!(records[0].derived.pace_text, "05:13");
/// ```
pub fn normalize_table(table: &RawTable, options: &NormalizeOptions) -> Vec<WorkoutRecord> {
    let positions = resolve_columns(&table.headers);
    let workouts = (0..table.rows.len())
        .filter(|&row| !table.rows[row].iter().all(CellValue::is_empty))
        .map(|row| read_row(table, row, &positions, options))
        .collect();
    normalize(workouts, &options.locale)
}

/// Re-runs derivation over already normalized records.
pub fn renormalize(records: Vec<WorkoutRecord>, locale: &Locale) -> Vec<WorkoutRecord> {
    normalize(records.into_iter().map(|r| r.workout).collect(), locale)
}
