use crate::record::CellValue;
use chrono::Timelike;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

lazy_static! {
    static ref HMS_REGEX: Regex = Regex::new(r"^(\d+):(\d{1,2}):(\d{1,2})(?:\.\d+)?$").unwrap();
    static ref DAYS_HMS_REGEX: Regex =
        Regex::new(r"^\+?(\d+)\s+days?,?\s+(\d+):(\d{1,2}):(\d{1,2})(?:\.\d+)?$").unwrap();
    static ref ISO_REGEX: Regex = Regex::new(
        r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.\d+)?S)?)?$"
    )
    .unwrap();
    static ref UNITS_REGEX: Regex = Regex::new(
        r"^(?:(\d+)\s*h(?:ours?|rs?)?)?\s*(?:(\d+)\s*m(?:in(?:utes?|s)?)?)?\s*(?:(\d+)\s*s(?:ec(?:onds?|s)?)?)?$"
    )
    .unwrap();
    static ref PACE_REGEX: Regex = Regex::new(r"^(\d+):(\d{1,2})$").unwrap();
}

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A non-negative span of whole seconds.
///
/// Workout durations and group totals are both `Elapsed`; sub-second
/// precision is dropped when a value is parsed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Elapsed(u64);

impl Elapsed {
    pub const ZERO: Elapsed = Elapsed(0);

    pub fn from_secs(secs: u64) -> Self {
        Elapsed(secs)
    }

    /// Saturates at `u64::MAX` seconds; use [`Elapsed::checked_from_hms`]
    /// for untrusted input.
    pub fn from_hms(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self::checked_from_hms(hours, minutes, seconds).unwrap_or(Elapsed(u64::MAX))
    }

    /// `None` when the total does not fit in a `u64` of seconds.
    pub fn checked_from_hms(hours: u64, minutes: u64, seconds: u64) -> Option<Self> {
        hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(seconds)
            .map(Elapsed)
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Hours (days folded in), minutes and seconds.
    pub fn hms(self) -> (u64, u64, u64) {
        (self.0 / 3600, (self.0 % 3600) / 60, self.0 % 60)
    }
}

impl Add for Elapsed {
    type Output = Elapsed;

    fn add(self, rhs: Elapsed) -> Elapsed {
        Elapsed(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Elapsed {
    fn sum<I: Iterator<Item = Elapsed>>(iter: I) -> Elapsed {
        iter.fold(Elapsed::ZERO, Add::add)
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s) = self.hms();
        write!(f, "{:02}:{:02}:{:02}", h, m, s)
    }
}

/// One way of reading duration text. Strategies are tried in order.
type TextStrategy = fn(&str) -> Option<Elapsed>;

const TEXT_STRATEGIES: &[(&str, TextStrategy)] = &[
    ("h:mm:ss", parse_hms),
    ("days h:mm:ss", parse_days_hms),
    ("iso-8601", parse_iso8601),
    ("units", parse_units),
];

fn capture_u64(caps: &regex::Captures<'_>, group: usize) -> Option<u64> {
    match caps.get(group) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(0),
    }
}

fn parse_hms(text: &str) -> Option<Elapsed> {
    let caps = HMS_REGEX.captures(text)?;
    let h = capture_u64(&caps, 1)?;
    let m = capture_u64(&caps, 2)?;
    let s = capture_u64(&caps, 3)?;
    if m >= 60 || s >= 60 {
        return None;
    }
    Elapsed::checked_from_hms(h, m, s)
}

fn parse_days_hms(text: &str) -> Option<Elapsed> {
    let caps = DAYS_HMS_REGEX.captures(text)?;
    let d = capture_u64(&caps, 1)?;
    let h = capture_u64(&caps, 2)?;
    let m = capture_u64(&caps, 3)?;
    let s = capture_u64(&caps, 4)?;
    if m >= 60 || s >= 60 {
        return None;
    }
    Elapsed::checked_from_hms(d.checked_mul(24)?.checked_add(h)?, m, s)
}

fn parse_iso8601(text: &str) -> Option<Elapsed> {
    // "P" and "PT" alone match the pattern but carry no component.
    if text.len() < 3 {
        return None;
    }
    let caps = ISO_REGEX.captures(text)?;
    if text.ends_with('T') {
        return None;
    }
    let d = capture_u64(&caps, 1)?;
    let h = capture_u64(&caps, 2)?;
    let m = capture_u64(&caps, 3)?;
    let s = capture_u64(&caps, 4)?;
    Elapsed::checked_from_hms(d.checked_mul(24)?.checked_add(h)?, m, s)
}

fn parse_units(text: &str) -> Option<Elapsed> {
    let lowered = text.to_lowercase();
    let caps = UNITS_REGEX.captures(&lowered)?;
    if caps.get(1).is_none() && caps.get(2).is_none() && caps.get(3).is_none() {
        return None;
    }
    let h = capture_u64(&caps, 1)?;
    let m = capture_u64(&caps, 2)?;
    let s = capture_u64(&caps, 3)?;
    Elapsed::checked_from_hms(h, m, s)
}

/// Parses duration text with the first strategy that accepts it.
///
/// Returns `None` when no strategy matches; callers decide on the fallback.
pub fn parse_duration_text(text: &str) -> Option<Elapsed> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    TEXT_STRATEGIES.iter().find_map(|(name, strategy)| {
        let parsed = strategy(text);
        if parsed.is_some() {
            log::trace!("duration {:?} parsed as {}", text, name);
        }
        parsed
    })
}

/// Reads a duration from any cell shape. Never fails: empty or unreadable
/// input is a zero duration.
pub fn parse_duration(value: &CellValue) -> Elapsed {
    let parsed = match value {
        CellValue::Empty | CellValue::Bool(_) | CellValue::Date(_) => None,
        CellValue::Text(text) => {
            if text.trim().is_empty() {
                None
            } else {
                let parsed = parse_duration_text(text);
                if parsed.is_none() {
                    log::debug!("unreadable duration {:?}, using zero", text);
                }
                parsed
            }
        }
        CellValue::Number(days) => {
            if days.is_finite() && *days >= 0.0 {
                Some(Elapsed::from_secs((days * SECONDS_PER_DAY).round() as u64))
            } else {
                log::debug!("unusable numeric duration {}, using zero", days);
                None
            }
        }
        CellValue::Duration(span) => Some(*span),
        CellValue::Time(time) => Some(Elapsed::from_hms(
            time.hour() as u64,
            time.minute() as u64,
            time.second() as u64,
        )),
        CellValue::DateTime(dt) => Some(Elapsed::from_hms(
            dt.hour() as u64,
            dt.minute() as u64,
            dt.second() as u64,
        )),
    };
    parsed.unwrap_or(Elapsed::ZERO)
}

/// Canonical `HH:MM:SS` text. Hours grow past 24 instead of emitting a day part.
pub fn format_duration(duration: Elapsed) -> String {
    duration.to_string()
}

/// Seconds per kilometre, floored. `None` when the distance is missing,
/// not positive, or not finite.
pub fn pace_seconds(duration: Elapsed, distance_km: Option<f64>) -> Option<u64> {
    let km = distance_km?;
    if !km.is_finite() || km <= 0.0 {
        return None;
    }
    Some((duration.as_secs() as f64 / km).floor() as u64)
}

/// Pace as `MM:SS` per kilometre with unbounded minutes, or the empty string
/// when the pace is undefined.
pub fn format_pace(duration: Elapsed, distance_km: Option<f64>) -> String {
    match pace_seconds(duration, distance_km) {
        Some(secs) => format!("{:02}:{:02}", secs / 60, secs % 60),
        None => String::new(),
    }
}

/// Reads `MM:SS` pace text back into seconds per kilometre.
pub fn parse_pace_text(text: &str) -> Option<u64> {
    let caps = PACE_REGEX.captures(text.trim())?;
    let m = capture_u64(&caps, 1)?;
    let s = capture_u64(&caps, 2)?;
    if s >= 60 {
        return None;
    }
    m.checked_mul(60)?.checked_add(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn canonical_text_is_zero_padded() {
        assert_eq!(format_duration(Elapsed::from_hms(0, 5, 7)), "00:05:07");
        assert_eq!(format_duration(Elapsed::ZERO), "00:00:00");
    }

    #[test]
    fn multi_day_spans_fold_into_hours() {
        let span = Elapsed::from_secs(2 * 86_400 + 3 * 3600 + 4 * 60 + 5);
        assert_eq!(format_duration(span), "51:04:05");
    }

    #[test]
    fn strategies_accept_common_shapes() {
        assert_eq!(parse_duration(&text("1:10:00")), Elapsed::from_hms(1, 10, 0));
        assert_eq!(parse_duration(&text(" 00:45:30 ")), Elapsed::from_hms(0, 45, 30));
        assert_eq!(parse_duration(&text("00:45:30.75")), Elapsed::from_hms(0, 45, 30));
        assert_eq!(parse_duration(&text("1 days 02:00:00")), Elapsed::from_hms(26, 0, 0));
        assert_eq!(parse_duration(&text("0 days 01:10:00")), Elapsed::from_hms(1, 10, 0));
        assert_eq!(parse_duration(&text("1 day, 2:00:00")), Elapsed::from_hms(26, 0, 0));
        assert_eq!(parse_duration(&text("PT1H5M3S")), Elapsed::from_hms(1, 5, 3));
        assert_eq!(parse_duration(&text("P1DT1H")), Elapsed::from_hms(25, 0, 0));
        assert_eq!(parse_duration(&text("1h 10m 5s")), Elapsed::from_hms(1, 10, 5));
        assert_eq!(parse_duration(&text("45min")), Elapsed::from_hms(0, 45, 0));
        assert_eq!(parse_duration(&text("90s")), Elapsed::from_secs(90));
    }

    #[test]
    fn failures_fall_back_to_zero() {
        for bad in ["", "   ", "abc", "00:75:00", "-00:10:00", "P", "PT", "12:30"] {
            assert_eq!(parse_duration(&text(bad)), Elapsed::ZERO, "input {:?}", bad);
        }
        assert_eq!(parse_duration(&CellValue::Empty), Elapsed::ZERO);
        assert_eq!(parse_duration(&CellValue::Number(-0.5)), Elapsed::ZERO);
        assert_eq!(parse_duration(&CellValue::Number(f64::NAN)), Elapsed::ZERO);
        assert_eq!(
            parse_duration(&CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())),
            Elapsed::ZERO
        );
    }

    #[test]
    fn native_cell_shapes() {
        let t = NaiveTime::from_hms_opt(0, 52, 10).unwrap();
        assert_eq!(parse_duration(&CellValue::Time(t)), Elapsed::from_hms(0, 52, 10));
        let dt = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap().and_time(t);
        assert_eq!(parse_duration(&CellValue::DateTime(dt)), Elapsed::from_hms(0, 52, 10));
        // 1/24 of a day is one hour
        assert_eq!(
            parse_duration(&CellValue::Number(1.0 / 24.0)),
            Elapsed::from_hms(1, 0, 0)
        );
        assert_eq!(
            parse_duration(&CellValue::Duration(Elapsed::from_secs(42))),
            Elapsed::from_secs(42)
        );
    }

    #[test]
    fn oversized_components_become_zero() {
        for huge in [
            "9999999999999999:00:00",
            "999999999999999 days 00:00:00",
            "P999999999999999D",
            "PT9999999999999999H",
            "9999999999999999h",
            "99999999999999999999:00:00",
        ] {
            assert_eq!(parse_duration(&text(huge)), Elapsed::ZERO, "input {:?}", huge);
        }
        assert_eq!(
            parse_duration(&CellValue::Number(1e300)),
            Elapsed::from_secs(u64::MAX)
        );
    }

    #[test]
    fn checked_and_saturating_arithmetic() {
        assert_eq!(Elapsed::checked_from_hms(1, 2, 3), Some(Elapsed::from_secs(3723)));
        assert_eq!(Elapsed::checked_from_hms(u64::MAX / 3600 + 1, 0, 0), None);
        assert_eq!(Elapsed::from_hms(u64::MAX, 0, 0), Elapsed::from_secs(u64::MAX));
        let total: Elapsed = [Elapsed::from_secs(u64::MAX), Elapsed::from_secs(10)]
            .into_iter()
            .sum();
        assert_eq!(total, Elapsed::from_secs(u64::MAX));
    }

    #[test]
    fn reparsing_canonical_text_is_stable() {
        for secs in [0, 1, 59, 60, 3599, 3600, 86_399, 86_400, 90_061, 400_000] {
            let once = format_duration(Elapsed::from_secs(secs));
            let again = format_duration(parse_duration(&text(&once)));
            assert_eq!(once, again);
        }
    }

    #[test]
    fn pace_is_floored_with_unbounded_minutes() {
        let d = Elapsed::from_hms(0, 52, 10);
        assert_eq!(format_pace(d, Some(10.0)), "05:13");
        // 2 hours over 1 km is 120 minutes per km, not wrapped at 60
        assert_eq!(format_pace(Elapsed::from_hms(2, 0, 0), Some(1.0)), "120:00");
        assert_eq!(format_pace(Elapsed::from_hms(0, 10, 0), Some(3.0)), "03:20");
    }

    #[test]
    fn pace_without_positive_distance_is_empty() {
        let d = Elapsed::from_hms(0, 30, 0);
        assert_eq!(format_pace(d, Some(0.0)), "");
        assert_eq!(format_pace(d, Some(-2.0)), "");
        assert_eq!(format_pace(d, None), "");
        assert_eq!(format_pace(d, Some(f64::NAN)), "");
    }

    #[test]
    fn pace_text_reads_back() {
        assert_eq!(parse_pace_text("05:13"), Some(313));
        assert_eq!(parse_pace_text("120:00"), Some(7200));
        assert_eq!(parse_pace_text("5:75"), None);
        assert_eq!(parse_pace_text(""), None);
    }
}
