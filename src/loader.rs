use crate::duration::{self, Elapsed};
use crate::error::{Result, RunLogError};
use crate::record::{CellValue, RawTable};
use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveTime;
use std::path::Path;

/// Load a table from CSV text
///
/// The first non-empty line is the header. The delimiter is `,` unless the
/// header has more `;` than `,`. Quoted fields may hold delimiters, doubled
/// quotes and line breaks. Blank cells come back as [`CellValue::Empty`],
/// everything else as [`CellValue::Text`].
///
/// # Errors
/// * [`RunLogError::Structure`] when the text holds no header row
pub fn from_csv_str(content: &str) -> Result<RawTable> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| RunLogError::Structure("CSV file is empty".to_string()))?;
    let delimiter = detect_delimiter(first_line);

    let mut records = parse_csv(content, delimiter).into_iter();
    let headers = records
        .by_ref()
        .find(|row| row.iter().any(|f| !f.trim().is_empty()))
        .ok_or_else(|| RunLogError::Structure("CSV file has no header row".to_string()))?;

    let mut table = RawTable::new(headers.into_iter().map(|h| h.trim().to_string()).collect());
    for row in records {
        table.push_row(
            row.into_iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field)
                    }
                })
                .collect(),
        );
    }
    Ok(table)
}

/// Load a table from a CSV file
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<RawTable> {
    let content = std::fs::read_to_string(filepath.as_ref())?;
    let table = from_csv_str(&content)?;
    log::info!(
        "read {} rows from {}",
        table.rows.len(),
        filepath.as_ref().display()
    );
    Ok(table)
}

fn detect_delimiter(header: &str) -> char {
    let commas = header.matches(',').count();
    let semicolons = header.matches(';').count();
    if semicolons > commas { ';' } else { ',' }
}

// Split CSV content into rows of fields. A quote only opens a quoted field
// at the start of the field; elsewhere it is literal text.
fn parse_csv(content: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            c if c == delimiter && !in_quotes => {
                row.push(std::mem::take(&mut current_field));
                at_field_start = true;
            }
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut current_field));
                rows.push(std::mem::take(&mut row));
                at_field_start = true;
            }
            _ => {
                current_field.push(c);
                at_field_start = false;
            }
        }
    }

    if !current_field.is_empty() || !row.is_empty() {
        row.push(current_field);
        rows.push(row);
    }
    rows
}

/// Load a table from a workbook (xlsx, xlsm, xls, ods)
///
/// Reads the sheet called `sheet_name` when the workbook has one and falls
/// back to the first sheet otherwise.
///
/// # Errors
/// * [`RunLogError::Workbook`] when the file cannot be opened as a workbook
/// * [`RunLogError::Structure`] when it has no sheets or the sheet is empty
pub fn from_excel(filepath: impl AsRef<Path>, sheet_name: &str) -> Result<RawTable> {
    let path = filepath.as_ref();
    let mut workbook = open_workbook_auto(path)?;

    let names = workbook.sheet_names();
    let chosen = match names.iter().find(|name| name.as_str() == sheet_name) {
        Some(name) => name.clone(),
        None => {
            let first = names
                .first()
                .ok_or_else(|| RunLogError::Structure("no sheets found in workbook".to_string()))?
                .clone();
            log::warn!(
                "sheet {:?} not found in {}, reading {:?}",
                sheet_name,
                path.display(),
                first
            );
            first
        }
    };

    let range = workbook.worksheet_range(&chosen)?;
    let mut rows = range.rows();
    let headers = rows
        .by_ref()
        .find(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .ok_or_else(|| RunLogError::Structure(format!("sheet {:?} is empty", chosen)))?;

    let mut table = RawTable::new(
        headers
            .iter()
            .map(|cell| convert_cell(cell).to_text().trim().to_string())
            .collect(),
    );
    for row in rows {
        table.push_row(row.iter().map(convert_cell).collect());
    }
    log::info!(
        "read {} rows from sheet {:?} of {}",
        table.rows.len(),
        chosen,
        path.display()
    );
    Ok(table)
}

/// Converts a workbook cell into the loader's loose cell type.
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => match dt.as_duration() {
            Some(span) => CellValue::Duration(Elapsed::from_secs(
                ((span.num_milliseconds() + 500) / 1000).max(0) as u64,
            )),
            None => CellValue::Empty,
        },
        // calamine applies the workbook's 1900 or 1904 epoch
        Data::DateTime(dt) => match dt.as_datetime() {
            // time-only cells are fractions of a day
            Some(value) if (0.0..1.0).contains(&dt.as_f64()) => CellValue::Time(value.time()),
            Some(value) if value.time() == NaiveTime::MIN => CellValue::Date(value.date()),
            Some(value) => CellValue::DateTime(value),
            None => CellValue::Empty,
        },
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => match duration::parse_duration_text(s) {
            Some(span) => CellValue::Duration(span),
            None => CellValue::Text(s.clone()),
        },
    }
}

/// Detect file type and load the appropriate format
///
/// # Examples
/// ```no_run
/// use runlog::loader::load_table;
///
/// match load_table("Treinos Corrida.xlsx", "treinos") {
///     Ok(table) => println!("{} rows", table.rows.len()),
///     Err(e) => eprintln!("Error loading file: {}", e),
/// }
/// ```
pub fn load_table(filepath: impl AsRef<Path>, sheet_name: &str) -> Result<RawTable> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") | Some("txt") => from_csv(path),
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => from_excel(path, sheet_name),
        Some(ext) => Err(RunLogError::UnsupportedFormat(format!(
            "unsupported file extension: {}",
            ext
        ))),
        None => Err(RunLogError::UnsupportedFormat(
            "file has no extension".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};

    #[test]
    fn csv_with_quotes_and_newlines() {
        let table = from_csv_str(
            "Data,Tempo,Observações\r\n2024-03-05,00:30:00,\"hills, then \"\"flat\"\"\nsecond line\"\r\n",
        )
        .unwrap();
        assert_eq!(table.headers, vec!["Data", "Tempo", "Observações"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(
            table.rows[0][2],
            CellValue::Text("hills, then \"flat\"\nsecond line".to_string())
        );
    }

    #[test]
    fn csv_quote_inside_unquoted_field_is_literal() {
        let table = from_csv_str(
            "Data,Observações,Tipo\n2024-03-05,tênis \"novo\",Leve\n2024-03-06,ok,Longo\n",
        )
        .unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], CellValue::Text("tênis \"novo\"".to_string()));
        assert_eq!(table.rows[0][2], CellValue::Text("Leve".to_string()));
        assert_eq!(table.rows[1][2], CellValue::Text("Longo".to_string()));
    }

    #[test]
    fn csv_semicolon_delimiter_and_bom() {
        let table = from_csv_str("\u{feff}Data;Distância (km)\n05/03/2024;5,2\n").unwrap();
        assert_eq!(table.headers, vec!["Data", "Distância (km)"]);
        assert_eq!(table.rows[0][1], CellValue::Text("5,2".to_string()));
    }

    #[test]
    fn csv_blank_cells_are_empty() {
        let table = from_csv_str("a,b,c\n1,,3\n").unwrap();
        assert_eq!(table.rows[0][1], CellValue::Empty);
    }

    #[test]
    fn csv_header_only_is_an_empty_table() {
        let table = from_csv_str("Data,Tempo\n").unwrap();
        assert!(table.rows.is_empty());
    }

    #[test]
    fn empty_csv_is_a_structural_error() {
        assert!(matches!(from_csv_str(""), Err(RunLogError::Structure(_))));
        assert!(matches!(from_csv_str("\n  \n"), Err(RunLogError::Structure(_))));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            load_table("workouts.json", "treinos"),
            Err(RunLogError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            load_table("workouts", "treinos"),
            Err(RunLogError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn workbook_cells_convert() {
        assert_eq!(convert_cell(&Data::Empty), CellValue::Empty);
        assert_eq!(convert_cell(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(
            convert_cell(&Data::String("x".to_string())),
            CellValue::Text("x".to_string())
        );
        assert_eq!(
            convert_cell(&Data::DurationIso("PT1H".to_string())),
            CellValue::Duration(Elapsed::from_hms(1, 0, 0))
        );
        assert_eq!(
            convert_cell(&Data::DateTimeIso("2024-03-05".to_string())),
            CellValue::Text("2024-03-05".to_string())
        );
    }

    fn excel_cell(value: f64, kind: ExcelDateTimeType, is_1904: bool) -> CellValue {
        convert_cell(&Data::DateTime(ExcelDateTime::new(value, kind, is_1904)))
    }

    #[test]
    fn workbook_dates_follow_the_workbook_epoch() {
        let march_5 = CellValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(excel_cell(45356.0, ExcelDateTimeType::DateTime, false), march_5);
        // Mac workbooks count days from 1904-01-01
        assert_eq!(excel_cell(43894.0, ExcelDateTimeType::DateTime, true), march_5);

        let noon = chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(
            excel_cell(45356.5, ExcelDateTimeType::DateTime, false),
            CellValue::DateTime(noon)
        );
    }

    #[test]
    fn workbook_times_and_durations() {
        assert_eq!(
            excel_cell(0.25, ExcelDateTimeType::DateTime, false),
            CellValue::Time(NaiveTime::from_hms_opt(6, 0, 0).unwrap())
        );
        assert_eq!(
            excel_cell(0.25, ExcelDateTimeType::DateTime, true),
            CellValue::Time(NaiveTime::from_hms_opt(6, 0, 0).unwrap())
        );
        // 00:52:10 as a day fraction
        assert_eq!(
            excel_cell(3130.0 / 86_400.0, ExcelDateTimeType::TimeDelta, false),
            CellValue::Duration(Elapsed::from_hms(0, 52, 10))
        );
    }
}
