//! Row Caster & Insert Builder: body files → `INSERT` statements.
//!
//! Cells are cast into SQL literals by their destination column's [`ColumnType`]:
//!
//! | Type           | Empty cell | Otherwise                                              |
//! |----------------|------------|--------------------------------------------------------|
//! | `Integer`      | `0`        | parsed as `i64`, error if not an integer               |
//! | `Numeric`      | `0`        | parsed as `f64`, error if not a finite number          |
//! | `DateTime`     | `""`       | RFC 3339 kept; `YYYY-MM-DD hh:mm:ss` localized to zone |
//! | `NullableText` | `NULL`     | double-quoted string, embedded quotes doubled          |
//! | `Text`         | `""`       | double-quoted string, embedded quotes doubled          |

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::config::Config;
use crate::error::{ConvertError, ConvertResult};
use crate::schema::Definitions;
use crate::types::{AssociatedTable, ColumnType, Statement};

/// Zone-less datetime layout interpreted in the configured timezone.
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cast one raw cell into a SQL literal.
///
/// Returns a human-readable message when the value does not fit the type.
pub fn cast_cell(column_type: ColumnType, raw: &str, tz: Tz) -> Result<String, String> {
    match column_type {
        ColumnType::Integer => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok("0".to_string());
            }
            trimmed
                .parse::<i64>()
                .map(|v| v.to_string())
                .map_err(|e| format!("failed to parse int: {e}"))
        }
        ColumnType::Numeric => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok("0".to_string());
            }
            match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v.to_string()),
                Ok(_) => Err("failed to parse float: not a finite number".to_string()),
                Err(e) => Err(format!("failed to parse float: {e}")),
            }
        }
        ColumnType::DateTime => Ok(quote(&normalize_datetime(raw, tz))),
        ColumnType::NullableText if raw.is_empty() => Ok("NULL".to_string()),
        ColumnType::NullableText | ColumnType::Text => Ok(quote(raw)),
    }
}

/// RFC 3339 values pass through; zone-less values gain the zone's offset; anything else is
/// returned unchanged.
pub fn normalize_datetime(raw: &str, tz: Tz) -> String {
    if DateTime::parse_from_rfc3339(raw).is_ok() {
        return raw.to_string();
    }
    NaiveDateTime::parse_from_str(raw, LOCAL_DATETIME_FORMAT)
        .ok()
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|local| local.to_rfc3339())
        .unwrap_or_else(|| raw.to_string())
}

fn quote(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

/// An `INSERT` statement and the number of rows it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub statement: Statement,
    pub rows: usize,
}

/// Builds one `INSERT` per body table against the definitions from the schema phase.
#[derive(Debug, Clone)]
pub struct InsertBuilder<'a> {
    definitions: &'a Definitions,
    start_row: usize,
    tz: Tz,
}

impl<'a> InsertBuilder<'a> {
    /// `start_row` is the 1-based row where data begins.
    pub fn new(definitions: &'a Definitions, start_row: usize, tz: Tz) -> Self {
        Self {
            definitions,
            start_row,
            tz,
        }
    }

    pub fn from_config(definitions: &'a Definitions, cfg: &Config) -> ConvertResult<Self> {
        Ok(Self::new(definitions, cfg.body.start_row, cfg.tz()?))
    }

    /// Build the statement for one body table.
    pub fn build(&self, body: &AssociatedTable) -> ConvertResult<InsertStatement> {
        let name = &body.association.name;
        let rows = body.table.len();
        if rows < self.start_row {
            return Err(ConvertError::NotEnoughRows {
                table: name.clone(),
                rows,
                start_row: self.start_row,
            });
        }
        let def = self
            .definitions
            .get(name)
            .ok_or_else(|| ConvertError::NoSuchTable { table: name.clone() })?;

        // rows >= start_row >= 1, so there is at least one data row.
        let data = &body.table.rows[self.start_row.saturating_sub(1)..];

        let shard_values: Vec<&str> = body
            .association
            .shard_columns
            .iter()
            .map(|s| s.value.as_str())
            .collect();

        let mut values: Vec<String> = Vec::with_capacity(data.len());
        for (i, row) in data.iter().enumerate() {
            let user_row = self.start_row + i;
            let cells: Vec<&str> = shard_values
                .iter()
                .copied()
                .chain(row.iter().map(String::as_str))
                .collect();
            if cells.len() != def.columns.len() {
                return Err(ConvertError::Cast {
                    table: name.clone(),
                    row: user_row,
                    column: String::new(),
                    raw: row.join(","),
                    message: format!(
                        "row has {} values but table has {} columns",
                        cells.len(),
                        def.columns.len()
                    ),
                });
            }

            let mut literals = Vec::with_capacity(cells.len());
            for (column, raw) in def.columns.iter().zip(cells) {
                let literal = cast_cell(column.column_type, raw, self.tz).map_err(|message| ConvertError::Cast {
                    table: name.clone(),
                    row: user_row,
                    column: column.name.clone(),
                    raw: raw.to_string(),
                    message,
                })?;
                literals.push(literal);
            }
            values.push(format!("({})", literals.join(", ")));
        }

        let columns: Vec<String> = def.columns.iter().map(|c| format!("`{}`", c.name)).collect();
        let sql = format!(
            "INSERT INTO `{}` ({}) VALUES {};",
            def.name,
            columns.join(", "),
            values.join(", ")
        );
        Ok(InsertStatement {
            statement: Statement::new(&def.name, sql),
            rows: data.len(),
        })
    }
}
