use crate::record::{CellValue, Column};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Name tables used to render labels and headers.
///
/// All lookups are by zero-based index (January = 0, Monday = 0), so a new
/// language only needs a new table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    pub months: [&'static str; 12],
    pub weekdays: [&'static str; 7],
    /// Headers in canonical column order.
    pub headers: [&'static str; 9],
    /// Summary columns after the group label: count, distance, duration, pace.
    pub summary_headers: [&'static str; 4],
    /// First and last workout, for the totals view.
    pub first_last: [&'static str; 2],
    pub no_data: &'static str,
}

pub const PORTUGUESE: Locale = Locale {
    months: [
        "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho", "Julho", "Agosto", "Setembro",
        "Outubro", "Novembro", "Dezembro",
    ],
    weekdays: [
        "Segunda", "Terça", "Quarta", "Quinta", "Sexta", "Sábado", "Domingo",
    ],
    headers: [
        "Mês/Ano",
        "Data",
        "Semana",
        "Dia da Semana",
        "Distância (km)",
        "Tempo",
        "Pace (min/km)",
        "Tipo",
        "Observações",
    ],
    summary_headers: ["Treinos", "Distância (km)", "Tempo", "Pace (min/km)"],
    first_last: ["Primeiro treino", "Último treino"],
    no_data: "Sem dados.",
};

pub const ENGLISH: Locale = Locale {
    months: [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ],
    weekdays: [
        "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
    ],
    headers: [
        "Month",
        "Date",
        "Week",
        "Weekday",
        "Distance (km)",
        "Time",
        "Pace (min/km)",
        "Type",
        "Notes",
    ],
    summary_headers: ["Workouts", "Distance (km)", "Time", "Pace (min/km)"],
    first_last: ["First workout", "Last workout"],
    no_data: "No data.",
};

/// Locale selector as written in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocaleKind {
    #[default]
    Pt,
    En,
}

impl LocaleKind {
    pub fn locale(self) -> Locale {
        match self {
            LocaleKind::Pt => PORTUGUESE,
            LocaleKind::En => ENGLISH,
        }
    }
}

impl Locale {
    pub fn header(&self, column: Column) -> &'static str {
        self.headers[column as usize]
    }
}

/// `"Março 2024"`
pub fn month_label(date: NaiveDate, locale: &Locale) -> String {
    format!("{} {:04}", locale.months[date.month0() as usize], date.year())
}

pub fn weekday_name(date: NaiveDate, locale: &Locale) -> &'static str {
    locale.weekdays[date.weekday().num_days_from_monday() as usize]
}

/// ISO week label, `"2024-W09"`. The year is the ISO week-numbering year,
/// which differs from the calendar year around New Year.
pub fn week_label(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

const DATE_FORMATS_ISO: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATE_FORMATS_DAY_FIRST: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const DATE_FORMATS_MONTH_FIRST: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Last serial day a spreadsheet can represent (9999-12-31).
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

fn spreadsheet_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Converts a spreadsheet serial day number into a calendar date.
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL_DAY).contains(&serial) {
        return None;
    }
    spreadsheet_epoch().checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Reads date text. ISO forms first, then `a/b/yyyy` in the configured
/// order, then the opposite order.
pub fn parse_date_text(text: &str, day_first: bool) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let (preferred, fallback) = if day_first {
        (DATE_FORMATS_DAY_FIRST, DATE_FORMATS_MONTH_FIRST)
    } else {
        (DATE_FORMATS_MONTH_FIRST, DATE_FORMATS_DAY_FIRST)
    };
    DATE_FORMATS_ISO
        .iter()
        .chain(preferred)
        .chain(fallback)
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Coerces any cell into a date; unreadable values become `None`.
pub fn parse_date(value: &CellValue, day_first: bool) -> Option<NaiveDate> {
    let parsed = match value {
        CellValue::Date(date) => Some(*date),
        CellValue::DateTime(dt) => Some(dt.date()),
        CellValue::Number(serial) => date_from_serial(*serial),
        CellValue::Text(text) => parse_date_text(text, day_first),
        CellValue::Empty | CellValue::Bool(_) | CellValue::Time(_) | CellValue::Duration(_) => {
            None
        }
    };
    if parsed.is_none() && !value.is_empty() {
        log::debug!("unreadable date {:?}, using null", value);
    }
    parsed
}
