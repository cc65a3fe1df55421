use crate::calendar::Locale;
use crate::error::{Result, RunLogError};
use crate::record::{CANONICAL_COLUMNS, Column, WorkoutRecord};
use crate::summary::{self, GroupSummary};
use chrono::Datelike;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};
use std::path::Path;

pub const MONTH_SUMMARY_SHEET: &str = "resumo_mes";
pub const WEEK_SUMMARY_SHEET: &str = "resumo_semana";

/// Convert the canonical table to CSV
///
/// Writes a header row in the locale's language followed by one row per
/// record, in canonical column order. Fields holding commas, quotes or line
/// breaks are quoted.
///
/// # Examples
/// ```
/// use runlog::calendar::PORTUGUESE;
/// use runlog::downloader::to_csv;
///
/// let csv = to_csv(&[], &PORTUGUESE);
/// assert!(csv.starts_with("Mês/Ano,Data,Semana"));
/// ```
pub fn to_csv(records: &[WorkoutRecord], locale: &Locale) -> String {
    let mut csv_content = String::new();

    let header: Vec<String> = CANONICAL_COLUMNS
        .iter()
        .map(|&column| escape_csv_field(locale.header(column)))
        .collect();
    csv_content.push_str(&header.join(","));
    csv_content.push('\n');

    for record in records {
        let row: Vec<String> = CANONICAL_COLUMNS
            .iter()
            .map(|&column| escape_csv_field(&record.column_text(column)))
            .collect();
        csv_content.push_str(&row.join(","));
        csv_content.push('\n');
    }

    csv_content
}

fn escape_csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r')
    {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert the canonical table to an XLSX workbook
///
/// The workbook holds the canonical sheet (named `sheet_name`) and the two
/// summary sheets, [`MONTH_SUMMARY_SHEET`] and [`WEEK_SUMMARY_SHEET`].
/// Dates are written as real date cells, distances as numbers and
/// durations as canonical `HH:MM:SS` text.
pub fn to_xlsx(records: &[WorkoutRecord], locale: &Locale, sheet_name: &str) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    workbook.push_worksheet(records_sheet(records, locale, sheet_name)?);
    workbook.push_worksheet(summary_sheet(
        &summary::by_month(records),
        locale.header(Column::MonthLabel),
        locale,
        MONTH_SUMMARY_SHEET,
    )?);
    workbook.push_worksheet(summary_sheet(
        &summary::by_week(records),
        locale.header(Column::Week),
        locale,
        WEEK_SUMMARY_SHEET,
    )?);

    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

fn records_sheet(records: &[WorkoutRecord], locale: &Locale, sheet_name: &str) -> Result<Worksheet> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(sheet_name)?;

    let bold = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for (c, &column) in CANONICAL_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, locale.header(column), &bold)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (c, &column) in CANONICAL_COLUMNS.iter().enumerate() {
            let col = c as u16;
            match column {
                Column::Date => {
                    if let Some(date) = record.date() {
                        let cell = ExcelDateTime::from_ymd(
                            date.year() as u16,
                            date.month() as u8,
                            date.day() as u8,
                        )?;
                        worksheet.write_with_format(row, col, &cell, &date_format)?;
                    }
                }
                Column::Distance => {
                    if let Some(km) = record.distance_km() {
                        worksheet.write_number(row, col, km)?;
                    }
                }
                other => {
                    let text = record.column_text(other);
                    if !text.is_empty() {
                        worksheet.write_string(row, col, &text)?;
                    }
                }
            }
        }
    }

    worksheet.set_column_width(1, 12)?;
    Ok(worksheet)
}

fn summary_sheet(
    groups: &[GroupSummary],
    label_header: &str,
    locale: &Locale,
    name: &str,
) -> Result<Worksheet> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(name)?;

    let bold = Format::new().set_bold();
    worksheet.write_string_with_format(0, 0, label_header, &bold)?;
    for (c, header) in locale.summary_headers.iter().enumerate() {
        worksheet.write_string_with_format(0, (c + 1) as u16, *header, &bold)?;
    }

    for (i, group) in groups.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(row, 0, &group.label)?;
        worksheet.write_number(row, 1, group.count as f64)?;
        worksheet.write_number(row, 2, group.distance_km)?;
        worksheet.write_string(row, 3, &group.duration_text)?;
        worksheet.write_string(row, 4, &group.pace_text)?;
    }

    Ok(worksheet)
}

/// Write the table to `path`, choosing the format from the extension.
///
/// `.csv` gets the canonical table only; `.xlsx` also gets the summary sheets.
pub fn export(
    records: &[WorkoutRecord],
    locale: &Locale,
    sheet_name: &str,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    let bytes = match extension.as_deref() {
        Some("csv") => to_csv(records, locale).into_bytes(),
        Some("xlsx") => to_xlsx(records, locale, sheet_name)?,
        Some(ext) => {
            return Err(RunLogError::UnsupportedFormat(format!(
                "cannot export to .{} (use .csv or .xlsx)",
                ext
            )));
        }
        None => {
            return Err(RunLogError::UnsupportedFormat(
                "export path has no extension".to_string(),
            ));
        }
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;
    log::info!("exported {} records to {}", records.len(), path.display());
    Ok(())
}
