#![cfg(feature = "excel")]

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::TimeZone;
use chrono_tz::Tz;

use crate::types::ParsedTable;

/// Options for reading one worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetOptions {
    /// Sheet to read; the first sheet when `None`.
    pub sheet: Option<String>,
    /// 1-based row whose empty cells mark columns to drop.
    pub header_name_row: usize,
    /// Zone that time-formatted cells are wall-clock times in.
    pub timezone: Tz,
}

/// Parse an in-memory workbook (`.xlsx`) into rows of text cells.
///
/// Behavior:
/// - Reads a single sheet, rows and cells in document order (leading empty rows/columns kept)
/// - Time-formatted cells with a non-zero value become RFC 3339 timestamps in `timezone`
/// - Every other cell is rendered as its literal text
/// - A column whose cell in `header_name_row` is empty is dropped from every row
pub fn parse_spreadsheet(bytes: &[u8], opts: &SpreadsheetOptions) -> Result<ParsedTable, calamine::Error> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet = match opts.sheet.as_deref() {
        Some(name) => name.to_string(),
        None => match workbook.sheet_names().first() {
            Some(first) => first.clone(),
            None => return Ok(ParsedTable::default()),
        },
    };
    let range = workbook.worksheet_range(&sheet)?;

    let rows = range_to_rows(&range, opts.timezone);
    Ok(ParsedTable::new(drop_unnamed_columns(rows, opts.header_name_row)))
}

fn range_to_rows(range: &Range<Data>, tz: Tz) -> Vec<Vec<String>> {
    // calamine trims the range to the first used cell; restore sheet coordinates.
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells: Vec<String> = vec![String::new(); col_offset];
        cells.extend(row.iter().map(|c| cell_to_string(c, tz)));
        rows.push(cells);
    }
    rows
}

fn drop_unnamed_columns(rows: Vec<Vec<String>>, header_name_row: usize) -> Vec<Vec<String>> {
    let Some(names) = header_name_row.checked_sub(1).and_then(|i| rows.get(i)) else {
        return rows;
    };
    let keep: Vec<bool> = names.iter().map(|n| !n.is_empty()).collect();
    if keep.iter().all(|k| *k) {
        return rows;
    }

    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .filter(|(i, _)| keep.get(*i).copied().unwrap_or(false))
                .map(|(_, cell)| cell)
                .collect()
        })
        .collect()
}

fn cell_to_string(c: &Data, tz: Tz) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_to_string(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            if !dt.is_datetime() || serial == 0.0 {
                return float_to_string(serial);
            }
            // Honors the workbook's 1900/1904 date system.
            dt.as_datetime()
                .and_then(|naive| tz.from_local_datetime(&naive).earliest())
                .map(|local| local.to_rfc3339())
                .unwrap_or_else(|| float_to_string(serial))
        }
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
        Data::Empty => String::new(),
    }
}

fn float_to_string(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use calamine::{CellErrorType, Data};
    use chrono_tz::Tz;

    use super::{cell_to_string, drop_unnamed_columns};

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn columns_without_a_name_are_dropped_everywhere() {
        let rows = vec![
            row(&["id", "", "name"]),
            row(&["int", "memo", "text"]),
            row(&["1", "ignored", "Ada"]),
        ];
        let out = drop_unnamed_columns(rows, 1);
        assert_eq!(out[0], row(&["id", "name"]));
        assert_eq!(out[1], row(&["int", "text"]));
        assert_eq!(out[2], row(&["1", "Ada"]));
    }

    #[test]
    fn missing_name_row_keeps_everything() {
        let rows = vec![row(&["a", ""])];
        assert_eq!(drop_unnamed_columns(rows.clone(), 5), rows);
    }

    #[test]
    fn error_cells_keep_their_excel_text() {
        assert_eq!(cell_to_string(&Data::Error(CellErrorType::Div0), Tz::UTC), "#DIV/0!");
        assert_eq!(cell_to_string(&Data::Error(CellErrorType::NA), Tz::UTC), "#N/A");
    }

    #[test]
    fn integral_floats_render_without_fraction() {
        assert_eq!(cell_to_string(&Data::Float(3.0), Tz::UTC), "3");
        assert_eq!(cell_to_string(&Data::Float(2.5), Tz::UTC), "2.5");
    }
}
