/*!
# Running Log

A spreadsheet editor for a personal running log, built in Rust.

## Overview

Workouts live in a spreadsheet (`.xlsx`, `.xls`, `.ods` or `.csv`) kept by hand
and by other tools, so headers, date formats and duration formats drift over
time. This crate loads such a file, normalizes every row into one canonical
table, derives the calendar labels and pace of each workout, and writes the
table back out together with monthly and weekly summaries.

## Architecture

### Data Layer
- **record**: raw cells, canonical columns, workouts and their derived labels
- **duration**: tolerant duration parsing and `HH:MM:SS` / `MM:SS` rendering
- **calendar**: month, ISO week and weekday labels in Portuguese or English
- **normalizer**: raw table to canonical, sorted table

### Operations Layer
- **summary**: per-month, per-week and overall aggregation
- **training_log**: the in-memory log with add, edit, delete and filtered listing
- **loader**: CSV and workbook import
- **downloader**: CSV and XLSX export (XLSX gets the summary sheets)
- **graph**: distance bar charts (feature `charts`)

### Application Layer
- **config**: TOML configuration
- **app**: command parsing and the interactive session
- **error**: the crate error type

## Design Highlights

- Every mutation rebuilds the table through the normalizer, so derived labels
  never go stale
- Unreadable cells degrade to null dates or zero durations instead of failing
  the whole load
- Pace is always recomputed and summarized as total time over total distance
- Weeks are ISO weeks keyed by the ISO week-numbering year

## Usage

```no_run
use runlog::normalizer::NormalizeOptions;
use runlog::training_log::TrainingLog;

let mut log = TrainingLog::new(NormalizeOptions::default());
log.load("Treinos Corrida.xlsx", "treinos")?;
for month in log.by_month() {
    println!("{}: {:.2} km, pace {}", month.label, month.distance_km, month.pace_text);
}
log.export("treinos_normalizado.xlsx", "treinos")?;
# Ok::<(), runlog::error::RunLogError>(())
```
*/

pub mod app;
pub mod calendar;
pub mod config;
pub mod downloader;
pub mod duration;
pub mod error;
#[cfg(feature = "charts")]
pub mod graph;
pub mod loader;
pub mod normalizer;
pub mod record;
pub mod summary;
pub mod training_log;

pub use error::{Result, RunLogError};
pub use record::{Workout, WorkoutRecord};
pub use training_log::TrainingLog;
