use crate::calendar::{self, Locale};
use crate::config::Config;
use crate::duration::Elapsed;
use crate::error::{Result, RunLogError};
use crate::record::{Column, RecordPatch, WorkoutForm, WorkoutRecord, validate_distance, validate_hms};
use crate::summary::{GroupSummary, Totals};
use crate::training_log::{ListFilter, ListOrder, TrainingLog};
use chrono::NaiveDate;
use std::path::PathBuf;

/// Which summary to show, export or chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum GroupBy {
    Month,
    Week,
    Total,
}

/// Form fields as typed in the shell. Nothing here is validated yet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormFields {
    pub date: Option<NaiveDate>,
    pub distance_km: Option<f64>,
    pub time: Option<(i64, i64, i64)>,
    pub hours: Option<i64>,
    pub minutes: Option<i64>,
    pub seconds: Option<i64>,
    pub kind: Option<String>,
    pub notes: Option<String>,
}

impl FormFields {
    fn touches_duration(&self) -> bool {
        self.time.is_some() || self.hours.is_some() || self.minutes.is_some() || self.seconds.is_some()
    }

    /// H/M/S with unset parts taken from `base`.
    fn hms_over(&self, base: Elapsed) -> (i64, i64, i64) {
        let (h, m, s) = base.hms();
        let (h, m, s) = self.time.unwrap_or((h as i64, m as i64, s as i64));
        (
            self.hours.unwrap_or(h),
            self.minutes.unwrap_or(m),
            self.seconds.unwrap_or(s),
        )
    }

    /// Builds the add form; a missing date means today.
    pub fn into_form(self, today: NaiveDate) -> WorkoutForm {
        let (hours, minutes, seconds) = self.hms_over(Elapsed::ZERO);
        WorkoutForm {
            date: self.date.unwrap_or(today),
            distance_km: self.distance_km.unwrap_or(0.0),
            hours,
            minutes,
            seconds,
            kind: self.kind.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
        }
    }

    /// Builds an edit patch against the record being edited.
    pub fn into_patch(self, current: &WorkoutRecord) -> Result<RecordPatch> {
        let duration = if self.touches_duration() {
            let (h, m, s) = self.hms_over(current.duration());
            Some(validate_hms(h, m, s)?)
        } else {
            None
        };
        if let Some(km) = self.distance_km {
            validate_distance(km)?;
        }
        Ok(RecordPatch {
            date: self.date,
            distance_km: self.distance_km,
            duration,
            kind: self.kind.map(|k| k.trim().to_string()),
            notes: self.notes.map(|n| n.trim().to_string()),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Help,
    Quit,
    Load(PathBuf),
    Add(FormFields),
    Edit(usize, FormFields),
    Delete(usize),
    Show(usize),
    List(ListFilter, ListOrder),
    Summary(GroupBy),
    Export(PathBuf),
    Chart(GroupBy, PathBuf),
}

pub const HELP: &[&str] = &[
    "Commands:",
    "  q                           Quit",
    "  load <file>                 Replace the log with a .csv/.xlsx file",
    "  add key=value ...           Add a workout (date, km, time or h/m/s, type, notes)",
    "  edit <n> key=value ...      Change fields of workout n",
    "  delete <n>                  Delete workout n",
    "  show <n>                    Show every field of workout n",
    "  list [year=Y] [month=YYYY-MM] [type=T] [asc]",
    "  months | weeks | totals     Summaries",
    "  export <file>               Write .csv or .xlsx (with summary sheets)",
    "  chart month|week <file.png> Bar chart of distance",
    "Values with spaces go in double quotes: notes=\"easy, windy\"",
];

/// Splits a command line on whitespace, keeping double-quoted runs together.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            _ => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if in_quotes {
        return Err(RunLogError::InvalidInput("unterminated quote".to_string()));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_index(token: Option<&String>) -> Result<usize> {
    let token = token.ok_or_else(|| RunLogError::InvalidInput("missing record number".to_string()))?;
    token
        .parse()
        .map_err(|_| RunLogError::InvalidInput(format!("not a record number: {}", token)))
}

fn parse_int(key: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| RunLogError::InvalidInput(format!("{} must be a whole number, got {:?}", key, value)))
}

fn parse_km(value: &str) -> Result<f64> {
    let value = value.trim();
    value
        .parse::<f64>()
        .or_else(|_| value.replace(',', ".").parse::<f64>())
        .map_err(|_| RunLogError::InvalidInput(format!("km must be a number, got {:?}", value)))
}

fn parse_time(value: &str) -> Result<(i64, i64, i64)> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.len() != 3 {
        return Err(RunLogError::InvalidInput(format!(
            "time must look like H:MM:SS, got {:?}",
            value
        )));
    }
    Ok((
        parse_int("hours", parts[0])?,
        parse_int("minutes", parts[1])?,
        parse_int("seconds", parts[2])?,
    ))
}

fn parse_fields(tokens: &[String], day_first: bool) -> Result<FormFields> {
    let mut fields = FormFields::default();
    for token in tokens {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| RunLogError::InvalidInput(format!("expected key=value, got {:?}", token)))?;
        match key.to_lowercase().as_str() {
            "date" | "data" => {
                let date = calendar::parse_date_text(value, day_first).ok_or_else(|| {
                    RunLogError::InvalidInput(format!("not a date: {:?}", value))
                })?;
                fields.date = Some(date);
            }
            "km" | "distance" => fields.distance_km = Some(parse_km(value)?),
            "time" | "tempo" => fields.time = Some(parse_time(value)?),
            "h" | "hours" => fields.hours = Some(parse_int("hours", value)?),
            "m" | "minutes" => fields.minutes = Some(parse_int("minutes", value)?),
            "s" | "seconds" => fields.seconds = Some(parse_int("seconds", value)?),
            "type" | "tipo" => fields.kind = Some(value.to_string()),
            "notes" | "obs" => fields.notes = Some(value.to_string()),
            other => {
                return Err(RunLogError::InvalidInput(format!("unknown field: {}", other)));
            }
        }
    }
    Ok(fields)
}

fn parse_month(value: &str) -> Result<(i32, u32)> {
    let invalid = || RunLogError::InvalidInput(format!("month must look like YYYY-MM, got {:?}", value));
    let (year, month) = value.split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

fn parse_list(tokens: &[String]) -> Result<(ListFilter, ListOrder)> {
    let mut filter = ListFilter::default();
    let mut order = ListOrder::Descending;
    for token in tokens {
        if token == "asc" {
            order = ListOrder::Ascending;
            continue;
        }
        if token == "desc" {
            order = ListOrder::Descending;
            continue;
        }
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| RunLogError::InvalidInput(format!("unknown list option: {:?}", token)))?;
        for value in value.split(',').filter(|v| !v.is_empty()) {
            match key {
                "year" | "ano" => filter.years.push(
                    value
                        .parse()
                        .map_err(|_| RunLogError::InvalidInput(format!("not a year: {:?}", value)))?,
                ),
                "month" | "mes" => filter.months.push(parse_month(value)?),
                "type" | "tipo" => filter.kinds.push(value.to_string()),
                other => {
                    return Err(RunLogError::InvalidInput(format!("unknown list filter: {}", other)));
                }
            }
        }
    }
    Ok((filter, order))
}

fn parse_group(token: Option<&String>) -> Result<GroupBy> {
    match token.map(|t| t.as_str()) {
        Some("month") | Some("months") => Ok(GroupBy::Month),
        Some("week") | Some("weeks") => Ok(GroupBy::Week),
        Some(other) => Err(RunLogError::InvalidInput(format!(
            "charts group by month or week, got {:?}",
            other
        ))),
        None => Err(RunLogError::InvalidInput("missing month|week".to_string())),
    }
}

fn parse_path(token: Option<&String>) -> Result<PathBuf> {
    token
        .map(PathBuf::from)
        .ok_or_else(|| RunLogError::InvalidInput("missing file path".to_string()))
}

/// Parses one shell line.
pub fn parse_command(line: &str, day_first: bool) -> Result<Command> {
    let tokens = tokenize(line)?;
    let Some((head, rest)) = tokens.split_first() else {
        return Err(RunLogError::InvalidInput("empty command".to_string()));
    };
    let command = match head.as_str() {
        "help" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        "load" => Command::Load(parse_path(rest.first())?),
        "add" => Command::Add(parse_fields(rest, day_first)?),
        "edit" => Command::Edit(parse_index(rest.first())?, parse_fields(&rest[1..], day_first)?),
        "delete" | "rm" => Command::Delete(parse_index(rest.first())?),
        "show" => Command::Show(parse_index(rest.first())?),
        "list" | "ls" => {
            let (filter, order) = parse_list(rest)?;
            Command::List(filter, order)
        }
        "months" => Command::Summary(GroupBy::Month),
        "weeks" => Command::Summary(GroupBy::Week),
        "totals" => Command::Summary(GroupBy::Total),
        "export" => Command::Export(parse_path(rest.first())?),
        "chart" => Command::Chart(parse_group(rest.first())?, parse_path(rest.get(1))?),
        other => {
            return Err(RunLogError::InvalidInput(format!("unknown command: {}", other)));
        }
    };
    Ok(command)
}

/// The log being edited plus the settings it was opened with.
pub struct Session {
    pub log: TrainingLog,
    pub config: Config,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Session {
            log: TrainingLog::new(config.normalize_options()),
            config,
        }
    }

    /// Loads the configured default file when it exists.
    pub fn open_default(&mut self) -> Option<Result<()>> {
        let path = self.config.default_file.clone()?;
        if !path.exists() {
            return None;
        }
        Some(self.log.load(&path, &self.config.sheet_name))
    }

    /// Runs a command and returns the lines to print.
    pub fn execute(&mut self, command: Command) -> Result<Vec<String>> {
        let today = chrono::Local::now().date_naive();
        let lines = match command {
            Command::Help => HELP.iter().map(|l| l.to_string()).collect(),
            Command::Quit => Vec::new(),
            Command::Load(path) => {
                self.log.load(&path, &self.config.sheet_name)?;
                vec![format!("{} records loaded.", self.log.len())]
            }
            Command::Add(fields) => {
                let workout = fields.into_form(today).validate()?;
                let index = self.log.add(workout);
                vec![format!("Added #{}: {}", index, self.log.get(index)?.label())]
            }
            Command::Edit(index, fields) => {
                let patch = fields.into_patch(self.log.get(index)?)?;
                self.log.update(index, &patch)?;
                vec!["Record updated.".to_string()]
            }
            Command::Delete(index) => {
                let removed = self.log.delete(index)?;
                vec![format!("Deleted: {}", removed.label())]
            }
            Command::Show(index) => render_record(self.log.get(index)?, self.log.locale()),
            Command::List(filter, order) => {
                let listed = self.log.list(&filter, order);
                render_records(&listed, self.log.locale())
            }
            Command::Summary(GroupBy::Month) => render_groups(
                &self.log.by_month(),
                self.log.locale().header(Column::MonthLabel),
                self.log.locale(),
            ),
            Command::Summary(GroupBy::Week) => render_groups(
                &self.log.by_week(),
                self.log.locale().header(Column::Week),
                self.log.locale(),
            ),
            Command::Summary(GroupBy::Total) => render_totals(&self.log.totals(), self.log.locale()),
            Command::Export(path) => {
                self.log.export(&path, &self.config.sheet_name)?;
                vec![format!("Exported {} records to {}", self.log.len(), path.display())]
            }
            Command::Chart(group, path) => self.chart(group, path)?,
        };
        Ok(lines)
    }

    #[cfg(feature = "charts")]
    fn chart(&self, group: GroupBy, path: PathBuf) -> Result<Vec<String>> {
        use crate::graph::{GraphOptions, save_distance_chart};

        let locale = self.log.locale();
        let (groups, x_label) = match group {
            GroupBy::Month => (self.log.by_month(), locale.header(Column::MonthLabel)),
            GroupBy::Week => (self.log.by_week(), locale.header(Column::Week)),
            GroupBy::Total => {
                return Err(RunLogError::InvalidInput(
                    "charts group by month or week".to_string(),
                ));
            }
        };
        let options = GraphOptions::from_config(
            &self.config.chart,
            locale.header(Column::Distance),
            x_label,
        );
        save_distance_chart(&groups, &options, &path)?;
        Ok(vec![format!("Chart written to {}", path.display())])
    }

    #[cfg(not(feature = "charts"))]
    fn chart(&self, _group: GroupBy, _path: PathBuf) -> Result<Vec<String>> {
        Err(RunLogError::Chart(
            "this build has no chart support (enable the `charts` feature)".to_string(),
        ))
    }
}

/// Lays out rows as left-aligned columns under a header.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }
    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(line(headers));
    lines.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(line(row));
    }
    lines
}

const LISTED_COLUMNS: [Column; 8] = [
    Column::Date,
    Column::Weekday,
    Column::Week,
    Column::Distance,
    Column::Duration,
    Column::Pace,
    Column::Kind,
    Column::Notes,
];

pub fn render_records(listed: &[(usize, &WorkoutRecord)], locale: &Locale) -> Vec<String> {
    if listed.is_empty() {
        return vec![locale.no_data.to_string()];
    }
    let mut headers = vec!["#".to_string()];
    headers.extend(LISTED_COLUMNS.iter().map(|&c| locale.header(c).to_string()));
    let rows: Vec<Vec<String>> = listed
        .iter()
        .map(|(index, record)| {
            let mut row = vec![index.to_string()];
            row.extend(LISTED_COLUMNS.iter().map(|&c| match c {
                Column::Distance => record
                    .distance_km()
                    .map(|km| format!("{:.2}", km))
                    .unwrap_or_default(),
                other => record.column_text(other).replace('\n', " "),
            }));
            row
        })
        .collect();
    render_table(&headers, &rows)
}

pub fn render_record(record: &WorkoutRecord, locale: &Locale) -> Vec<String> {
    crate::record::CANONICAL_COLUMNS
        .iter()
        .map(|&c| format!("{}: {}", locale.header(c), record.column_text(c)))
        .collect()
}

pub fn render_groups(groups: &[GroupSummary], label_header: &str, locale: &Locale) -> Vec<String> {
    if groups.is_empty() {
        return vec![locale.no_data.to_string()];
    }
    let mut headers = vec![label_header.to_string()];
    headers.extend(locale.summary_headers.iter().map(|h| h.to_string()));
    let rows: Vec<Vec<String>> = groups
        .iter()
        .map(|g| {
            vec![
                g.label.clone(),
                g.count.to_string(),
                format!("{:.2}", g.distance_km),
                g.duration_text.clone(),
                g.pace_text.clone(),
            ]
        })
        .collect();
    render_table(&headers, &rows)
}

pub fn render_totals(totals: &Totals, locale: &Locale) -> Vec<String> {
    if totals.count == 0 {
        return vec![locale.no_data.to_string()];
    }
    let date = |d: Option<NaiveDate>| {
        d.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let [count, distance, time, pace] = locale.summary_headers;
    vec![
        format!("{}: {}", count, totals.count),
        format!("{}: {:.2}", distance, totals.distance_km),
        format!("{}: {}", time, totals.duration_text),
        format!("{}: {}", pace, totals.pace_text),
        format!("{}: {}", locale.first_last[0], date(totals.first_date)),
        format!("{}: {}", locale.first_last[1], date(totals.last_date)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(Config::default())
    }

    fn run(session: &mut Session, line: &str) -> Result<Vec<String>> {
        let command = parse_command(line, true)?;
        session.execute(command)
    }

    #[test]
    fn tokenizer_keeps_quoted_values() {
        let tokens = tokenize(r#"add notes="easy, windy run" km=5"#).unwrap();
        assert_eq!(tokens, vec!["add", "notes=easy, windy run", "km=5"]);
        assert!(tokenize(r#"add notes="open"#).is_err());
        assert_eq!(tokenize(r#"add notes="""#).unwrap(), vec!["add", "notes="]);
    }

    #[test]
    fn parses_add_fields() {
        let command = parse_command("add date=05/03/2024 km=10,5 time=0:52:10 type=long", true).unwrap();
        let Command::Add(fields) = command else {
            panic!("expected add");
        };
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(fields.distance_km, Some(10.5));
        assert_eq!(fields.time, Some((0, 52, 10)));
        assert_eq!(fields.kind.as_deref(), Some("long"));
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(parse_command("", true).is_err());
        assert!(parse_command("fly", true).is_err());
        assert!(parse_command("add pace=5", true).is_err());
        assert!(parse_command("add date=someday", true).is_err());
        assert!(parse_command("delete x", true).is_err());
        assert!(parse_command("list month=2024-13", true).is_err());
        assert!(parse_command("chart total out.png", true).is_err());
    }

    #[test]
    fn add_edit_delete_round() {
        let mut s = session();
        let out = run(&mut s, "add date=2024-03-05 km=10 time=0:52:10 type=long").unwrap();
        assert_eq!(out, vec!["Added #0: 2024-03-05 | 10.00 km"]);
        run(&mut s, "add date=2024-03-01 km=5 h=0 m=25 s=0").unwrap();
        assert_eq!(s.log.len(), 2);
        assert_eq!(s.log.records()[0].derived.pace_text, "05:00");

        // only minutes change, hours and seconds come from the record
        run(&mut s, "edit 1 m=50").unwrap();
        assert_eq!(s.log.records()[1].derived.duration_text, "00:50:10");

        run(&mut s, "delete 0").unwrap();
        assert_eq!(s.log.len(), 1);
        assert_eq!(s.log.records()[0].workout.kind, "long");
    }

    #[test]
    fn input_boundary_rejects_negative_values() {
        let mut s = session();
        assert!(matches!(
            run(&mut s, "add date=2024-03-05 km=-1"),
            Err(RunLogError::InvalidInput(_))
        ));
        assert!(run(&mut s, "add date=2024-03-05 m=75").is_err());
        assert!(s.log.is_empty());
        run(&mut s, "add date=2024-03-05 km=3").unwrap();
        assert!(run(&mut s, "edit 0 km=-2").is_err());
        assert!(run(&mut s, "edit 0 s=-1").is_err());
        assert!(matches!(
            run(&mut s, "edit 4 km=2"),
            Err(RunLogError::RecordNotFound { index: 4, len: 1 })
        ));
    }

    #[test]
    fn oversized_hours_leave_the_log_untouched() {
        let mut s = session();
        run(&mut s, "add date=2024-03-04 km=5 time=0:25:00").unwrap();
        assert!(matches!(
            run(&mut s, "add date=2024-03-05 km=5 h=9999999999999999"),
            Err(RunLogError::InvalidInput(_))
        ));
        assert!(run(&mut s, "edit 0 h=9999999999999999").is_err());
        assert_eq!(s.log.len(), 1);
        assert_eq!(s.log.records()[0].derived.duration_text, "00:25:00");
    }

    #[test]
    fn empty_log_views_say_no_data() {
        let mut s = session();
        for line in ["list", "months", "weeks", "totals"] {
            assert_eq!(run(&mut s, line).unwrap(), vec!["Sem dados."], "{}", line);
        }
    }

    #[test]
    fn month_view_lists_groups() {
        let mut s = session();
        run(&mut s, "add date=2024-03-04 km=2 time=0:10:00").unwrap();
        run(&mut s, "add date=2024-03-06 km=8 time=1:00:00").unwrap();
        let out = run(&mut s, "months").unwrap();
        assert_eq!(out.len(), 3);
        assert!(out[0].starts_with("Mês/Ano"));
        assert!(out[2].starts_with("Março 2024"));
        assert!(out[2].contains("10.00"));
        assert!(out[2].contains("01:10:00"));
        assert!(out[2].ends_with("07:00"));
    }

    #[test]
    fn totals_view() {
        let mut s = session();
        run(&mut s, "add date=2024-03-04 km=5 time=0:25:00").unwrap();
        let out = run(&mut s, "totals").unwrap();
        assert_eq!(out[0], "Treinos: 1");
        assert_eq!(out[3], "Pace (min/km): 05:00");
        assert_eq!(out[4], "Primeiro treino: 2024-03-04");
    }

    #[test]
    fn list_filters_and_indices() {
        let mut s = session();
        run(&mut s, "add date=2023-12-30 km=8 type=easy").unwrap();
        run(&mut s, "add date=2024-01-02 km=5 type=easy").unwrap();
        run(&mut s, "add date=2024-03-05 km=10 type=long").unwrap();
        let out = run(&mut s, "list year=2024 type=easy").unwrap();
        assert_eq!(out.len(), 3);
        assert!(out[2].starts_with("1 "));
        let out = run(&mut s, "list asc").unwrap();
        assert!(out[2].starts_with("0 "));
    }

    #[test]
    fn render_table_aligns_columns() {
        let lines = render_table(
            &["a".to_string(), "bb".to_string()],
            &[vec!["ccc".to_string(), "d".to_string()]],
        );
        assert_eq!(lines, vec!["a    bb", "---  --", "ccc  d"]);
    }
}
