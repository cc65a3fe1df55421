use crate::calendar::Locale;
use crate::downloader;
use crate::error::{Result, RunLogError};
use crate::loader;
use crate::normalizer::{self, NormalizeOptions};
use crate::record::{RecordPatch, RawTable, Workout, WorkoutRecord};
use crate::summary::{self, GroupSummary, Totals};
use chrono::Datelike;
use std::path::Path;

/// Filters for the full listing. Empty lists match everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListFilter {
    pub years: Vec<i32>,
    /// `(year, month)` pairs
    pub months: Vec<(i32, u32)>,
    pub kinds: Vec<String>,
}

impl ListFilter {
    pub fn matches(&self, record: &WorkoutRecord) -> bool {
        let date = record.date();
        if !self.years.is_empty() && !date.is_some_and(|d| self.years.contains(&d.year())) {
            return false;
        }
        if !self.months.is_empty()
            && !date.is_some_and(|d| self.months.contains(&(d.year(), d.month())))
        {
            return false;
        }
        if !self.kinds.is_empty() && !self.kinds.iter().any(|k| k == &record.workout.kind) {
            return false;
        }
        true
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListOrder {
    /// Most recent first
    #[default]
    Descending,
    Ascending,
}

/// The in-memory running log.
///
/// Every mutation rebuilds the whole collection through the normalizer, so
/// readers only ever see a fully normalized table. Indices always refer to
/// the canonical (ascending date) order.
#[derive(Clone, Debug)]
pub struct TrainingLog {
    records: Vec<WorkoutRecord>,
    options: NormalizeOptions,
}

impl Default for TrainingLog {
    fn default() -> Self {
        TrainingLog::new(NormalizeOptions::default())
    }
}

impl TrainingLog {
    pub fn new(options: NormalizeOptions) -> Self {
        TrainingLog {
            records: Vec::new(),
            options,
        }
    }

    pub fn from_table(table: &RawTable, options: NormalizeOptions) -> Self {
        TrainingLog {
            records: normalizer::normalize_table(table, &options),
            options,
        }
    }

    pub fn records(&self) -> &[WorkoutRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn locale(&self) -> &Locale {
        &self.options.locale
    }

    pub fn get(&self, index: usize) -> Result<&WorkoutRecord> {
        self.records.get(index).ok_or(RunLogError::RecordNotFound {
            index,
            len: self.records.len(),
        })
    }

    fn rebuild(&mut self, workouts: Vec<Workout>) {
        self.records = normalizer::normalize(workouts, &self.options.locale);
    }

    fn workouts(&self) -> Vec<Workout> {
        self.records.iter().map(|r| r.workout.clone()).collect()
    }

    /// Replaces the log with the contents of a file. On any error the
    /// current records are kept.
    ///
    /// # Arguments
    /// * `path` - A `.csv`, `.txt`, `.xlsx`, `.xlsm`, `.xls` or `.ods` file
    /// * `sheet_name` - Sheet to read from a workbook; the first sheet is used
    ///   when it is missing
    ///
    /// # Returns
    /// * `Result<()>` - `Ok` once the log holds the normalized file contents
    ///
    /// # Examples
    /// ```no_run
    /// use runlog::training_log::TrainingLog;
    ///
    /// let mut log = TrainingLog::default();
    /// match log.load("Treinos Corrida.xlsx", "treinos") {
    ///     Ok(()) => println!("Loaded {} workouts", log.len()),
    ///     Err(e) => eprintln!("Error loading workouts: {}", e),
    /// }
    /// ```
    pub fn load(&mut self, path: impl AsRef<Path>, sheet_name: &str) -> Result<()> {
        let table = loader::load_table(path.as_ref(), sheet_name)?;
        self.replace(&table);
        log::info!(
            "loaded {} records from {}",
            self.records.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Replaces the log with a freshly loaded table.
    pub fn replace(&mut self, table: &RawTable) {
        self.records = normalizer::normalize_table(table, &self.options);
    }

    /// Appends a workout and returns its index in the new canonical order.
    pub fn add(&mut self, workout: Workout) -> usize {
        let mut workouts = self.workouts();
        let position = workouts.len();
        workouts.push(workout);

        // the sort is stable, so the new workout lands after every earlier
        // one with the same date
        let date = workouts[position].date;
        self.rebuild(workouts);
        let index = self.position_of_last(date);
        log::info!("added workout at index {}", index);
        index
    }

    fn position_of_last(&self, date: Option<chrono::NaiveDate>) -> usize {
        self.records
            .iter()
            .rposition(|r| r.date() == date)
            .unwrap_or(self.records.len().saturating_sub(1))
    }

    /// Applies field changes to the record at `index`.
    pub fn update(&mut self, index: usize, patch: &RecordPatch) -> Result<()> {
        patch.validate()?;
        self.get(index)?;
        let mut workouts = self.workouts();
        patch.apply(&mut workouts[index]);
        self.rebuild(workouts);
        log::info!("updated workout at index {}", index);
        Ok(())
    }

    /// Removes the record at `index` and returns it.
    pub fn delete(&mut self, index: usize) -> Result<WorkoutRecord> {
        self.get(index)?;
        let mut workouts = self.workouts();
        let removed = workouts.remove(index);
        self.rebuild(workouts);
        log::info!("deleted workout at index {}", index);
        Ok(normalizer::normalize(vec![removed], &self.options.locale).remove(0))
    }

    /// Records passing `filter`, each paired with its canonical index.
    pub fn list(&self, filter: &ListFilter, order: ListOrder) -> Vec<(usize, &WorkoutRecord)> {
        let mut listed: Vec<(usize, &WorkoutRecord)> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.matches(r))
            .collect();
        if order == ListOrder::Descending {
            listed.reverse();
        }
        listed
    }

    /// Distinct non-empty workout types, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self
            .records
            .iter()
            .map(|r| r.workout.kind.clone())
            .filter(|k| !k.is_empty())
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    pub fn by_month(&self) -> Vec<GroupSummary> {
        summary::by_month(&self.records)
    }

    pub fn by_week(&self) -> Vec<GroupSummary> {
        summary::by_week(&self.records)
    }

    pub fn totals(&self) -> Totals {
        summary::totals(&self.records)
    }

    /// Writes the log to `path` as CSV or XLSX.
    pub fn export(&self, path: impl AsRef<Path>, sheet_name: &str) -> Result<()> {
        downloader::export(&self.records, &self.options.locale, sheet_name, path)
    }
}
