//! Unified parsing entrypoint.
//!
//! A [`TableParser`] is chosen per file from its [`FileKind`] and turns raw bytes into a
//! [`ParsedTable`]. [`parse_file`] reads a discovered file and reports to an observer.

use std::path::Path;

use chrono_tz::Tz;

use crate::config::Config;
use crate::error::{ConvertError, ConvertResult};
use crate::source::{FileKind, SourceFile};
use crate::types::{FileIndex, ParsedTable};

use super::delimited;
use super::observability::{ConversionObserver, SourceContext};

/// Options shared by every parser built for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Worksheet name for spreadsheets (first sheet when `None`).
    pub sheet: Option<String>,
    /// 1-based header name row; spreadsheet columns empty in this row are dropped.
    pub header_name_row: usize,
    pub timezone: Tz,
}

impl ParseOptions {
    pub fn from_config(cfg: &Config) -> ConvertResult<Self> {
        Ok(Self {
            sheet: cfg.xlsx.sheet.clone(),
            header_name_row: cfg.head.column_name_row,
            timezone: cfg.tz()?,
        })
    }
}

/// Parser strategy, one per declared file type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableParser {
    /// Delimited text with the given separator byte.
    DelimitedText(u8),
    #[cfg(feature = "excel")]
    /// A single worksheet of a workbook.
    Spreadsheet(super::excel::SpreadsheetOptions),
}

impl TableParser {
    pub fn for_kind(kind: FileKind, opts: &ParseOptions) -> ConvertResult<Self> {
        match kind {
            FileKind::Csv => Ok(Self::DelimitedText(b',')),
            FileKind::Tsv => Ok(Self::DelimitedText(b'\t')),
            FileKind::Xlsx => spreadsheet_parser(opts),
        }
    }

    /// Parse `bytes`; `path` is only used to label errors.
    pub fn parse(&self, path: &Path, bytes: &[u8]) -> ConvertResult<ParsedTable> {
        match self {
            Self::DelimitedText(sep) => {
                delimited::parse_delimited(bytes, *sep).map_err(|source| ConvertError::Csv {
                    path: path.to_path_buf(),
                    source,
                })
            }
            #[cfg(feature = "excel")]
            Self::Spreadsheet(opts) => {
                super::excel::parse_spreadsheet(bytes, opts).map_err(|source| ConvertError::Excel {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

fn spreadsheet_parser(opts: &ParseOptions) -> ConvertResult<TableParser> {
    // Avoid unused warnings when the feature is off.
    let _ = opts;

    #[cfg(feature = "excel")]
    {
        Ok(TableParser::Spreadsheet(super::excel::SpreadsheetOptions {
            sheet: opts.sheet.clone(),
            header_name_row: opts.header_name_row,
            timezone: opts.timezone,
        }))
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(ConvertError::Config {
            message: "xlsx parsing not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}

/// Read and parse one discovered file.
///
/// Reports `on_parsed` on success and `on_failure` (plus `on_alert` at or above the
/// observer's threshold) on failure.
pub fn parse_file(
    index: &FileIndex,
    file: &SourceFile,
    opts: &ParseOptions,
    observer: &dyn ConversionObserver,
) -> ConvertResult<ParsedTable> {
    let ctx = SourceContext {
        index: index.clone(),
        path: file.path.clone(),
    };
    let result = read_and_parse(file, opts);
    match &result {
        Ok(table) => observer.on_parsed(&ctx, table.len()),
        Err(e) => observer.report_failure(e),
    }
    result
}

fn read_and_parse(file: &SourceFile, opts: &ParseOptions) -> ConvertResult<ParsedTable> {
    let kind = file.kind().ok_or_else(|| ConvertError::UnsupportedFileType {
        path: file.path.clone(),
        ext: file.ext.clone(),
    })?;
    let parser = TableParser::for_kind(kind, opts)?;
    let bytes = std::fs::read(&file.path).map_err(ConvertError::file(&file.path))?;
    parser.parse(&file.path, &bytes)
}
