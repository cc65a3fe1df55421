use crate::duration::Elapsed;
use crate::error::{Result, RunLogError};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A loosely typed cell as read from a CSV file or a workbook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Duration(Elapsed),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Free-text rendering used for the type and notes columns.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Time(t) => t.format("%H:%M:%S").to_string(),
            CellValue::Duration(e) => e.to_string(),
        }
    }
}

/// A table exactly as loaded: one header row and any number of data rows.
/// Rows may be shorter or longer than the header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        RawTable {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }
}

/// Columns of the canonical sheet, in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    MonthLabel = 0,
    Date = 1,
    Week = 2,
    Weekday = 3,
    Distance = 4,
    Duration = 5,
    Pace = 6,
    Kind = 7,
    Notes = 8,
}

pub const CANONICAL_COLUMNS: [Column; 9] = [
    Column::MonthLabel,
    Column::Date,
    Column::Week,
    Column::Weekday,
    Column::Distance,
    Column::Duration,
    Column::Pace,
    Column::Kind,
    Column::Notes,
];

impl Column {
    /// Maps a header to its canonical column, ignoring case and surrounding
    /// whitespace. Covers every locale's header and the snake-case names used
    /// by older sheets.
    pub fn from_header(header: &str) -> Option<Column> {
        let key = header.trim().to_lowercase();
        let column = match key.as_str() {
            "mês/ano" | "mes/ano" | "mês" | "mes" | "mes_ano" | "month" => Column::MonthLabel,
            "data" | "date" => Column::Date,
            "semana" | "ano_semana" | "week" | "iso week" => Column::Week,
            "dia da semana" | "dia_semana" | "weekday" | "day" => Column::Weekday,
            "distância (km)" | "distancia (km)" | "distância" | "distancia" | "dist_km"
            | "distance (km)" | "distance" | "km" => Column::Distance,
            "tempo" | "tempo_hms" | "time" | "duration" => Column::Duration,
            "pace (min/km)" | "pace" | "ritmo" | "ritmo_min_km" => Column::Pace,
            "tipo" | "type" => Column::Kind,
            "observações" | "observacoes" | "obs" | "notes" => Column::Notes,
            _ => return None,
        };
        Some(column)
    }
}

/// The user-controlled fields of one workout. Everything else about a
/// record is derived from these.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub date: Option<NaiveDate>,
    pub distance_km: Option<f64>,
    pub duration: Elapsed,
    pub kind: String,
    pub notes: String,
}

/// Labels computed from a workout's date, distance and duration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derived {
    pub month_label: String,
    pub week_label: String,
    pub weekday_name: String,
    pub duration_text: String,
    pub pace_text: String,
}

/// A normalized workout. Only the normalizer builds these, so `derived`
/// always agrees with `workout`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub workout: Workout,
    pub derived: Derived,
}

impl WorkoutRecord {
    pub(crate) fn new(workout: Workout, derived: Derived) -> Self {
        WorkoutRecord { workout, derived }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.workout.date
    }

    pub fn distance_km(&self) -> Option<f64> {
        self.workout.distance_km
    }

    pub fn duration(&self) -> Elapsed {
        self.workout.duration
    }

    /// `"2024-03-05 | 10.00 km"`, as shown when picking a record to edit.
    pub fn label(&self) -> String {
        let date = self
            .workout
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        format!("{} | {:.2} km", date, self.workout.distance_km.unwrap_or(0.0))
    }

    /// Cell text for one canonical column.
    pub fn column_text(&self, column: Column) -> String {
        match column {
            Column::MonthLabel => self.derived.month_label.clone(),
            Column::Date => self
                .workout
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            Column::Week => self.derived.week_label.clone(),
            Column::Weekday => self.derived.weekday_name.clone(),
            Column::Distance => self
                .workout
                .distance_km
                .map(|km| km.to_string())
                .unwrap_or_default(),
            Column::Duration => self.derived.duration_text.clone(),
            Column::Pace => self.derived.pace_text.clone(),
            Column::Kind => self.workout.kind.clone(),
            Column::Notes => self.workout.notes.clone(),
        }
    }
}

/// Raw values from the add/edit form. `validate` is the input boundary:
/// nothing negative or out of range gets past it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkoutForm {
    pub date: NaiveDate,
    pub distance_km: f64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub kind: String,
    pub notes: String,
}

impl WorkoutForm {
    pub fn validate(&self) -> Result<Workout> {
        let duration = validate_hms(self.hours, self.minutes, self.seconds)?;
        let distance_km = validate_distance(self.distance_km)?;
        Ok(Workout {
            date: Some(self.date),
            distance_km: Some(distance_km),
            duration,
            kind: self.kind.trim().to_string(),
            notes: self.notes.trim().to_string(),
        })
    }
}

pub fn validate_distance(km: f64) -> Result<f64> {
    if !km.is_finite() {
        return Err(RunLogError::InvalidInput(format!(
            "distance must be a number, got {}",
            km
        )));
    }
    if km < 0.0 {
        return Err(RunLogError::InvalidInput(format!(
            "distance cannot be negative, got {}",
            km
        )));
    }
    Ok(km)
}

pub fn validate_hms(hours: i64, minutes: i64, seconds: i64) -> Result<Elapsed> {
    if hours < 0 {
        return Err(RunLogError::InvalidInput(format!(
            "hours cannot be negative, got {}",
            hours
        )));
    }
    if !(0..60).contains(&minutes) {
        return Err(RunLogError::InvalidInput(format!(
            "minutes must be between 0 and 59, got {}",
            minutes
        )));
    }
    if !(0..60).contains(&seconds) {
        return Err(RunLogError::InvalidInput(format!(
            "seconds must be between 0 and 59, got {}",
            seconds
        )));
    }
    Elapsed::checked_from_hms(hours as u64, minutes as u64, seconds as u64).ok_or_else(|| {
        RunLogError::InvalidInput(format!("{} hours is too long for a workout", hours))
    })
}

/// Field changes for an edit. `None` leaves the field as it is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordPatch {
    pub date: Option<NaiveDate>,
    pub distance_km: Option<f64>,
    pub duration: Option<Elapsed>,
    pub kind: Option<String>,
    pub notes: Option<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        *self == RecordPatch::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(km) = self.distance_km {
            validate_distance(km)?;
        }
        Ok(())
    }

    pub fn apply(&self, workout: &mut Workout) {
        if let Some(date) = self.date {
            workout.date = Some(date);
        }
        if let Some(km) = self.distance_km {
            workout.distance_km = Some(km);
        }
        if let Some(duration) = self.duration {
            workout.duration = duration;
        }
        if let Some(kind) = &self.kind {
            workout.kind = kind.clone();
        }
        if let Some(notes) = &self.notes {
            workout.notes = notes.clone();
        }
    }
}
