//! `tabsql` materializes a tree of table files (`.xlsx`, `.csv`, `.tsv`) into one SQLite
//! database.
//!
//! Header files supply column names and types, body files supply rows. Files are bound to
//! logical tables by configured path templates, which can also pull shard keys out of the
//! path so that one table split across many files is reassembled with the key as a column.
//!
//! The primary entrypoint is [`pipeline::Converter`]:
//!
//! ```no_run
//! use tabsql::config::Config;
//! use tabsql::pipeline::Converter;
//!
//! # fn main() -> Result<(), tabsql::ConvertError> {
//! let config = Config::from_toml_str(r#"
//! timezone = "Asia/Tokyo"
//!
//! [local]
//! path = "tables"
//!
//! [head]
//! path = "head"
//! ext = "csv"
//! column_name_row = 1
//! column_type_row = 2
//!
//! [body]
//! path = "body"
//! ext = "csv"
//! start_row = 3
//!
//! [table."sales/:year"]
//! primary_key = ["year", "id"]
//! shard_types = ["int"]
//! "#)?;
//!
//! let stats = Converter::new(&config).convert("out.db")?;
//! println!("tables={} rows={}", stats.tables, stats.rows);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`source`]: file tree discovery and remote checkout
//! - [`ingestion`]: CSV/TSV/XLSX parsing and observer hooks
//! - [`association`]: path templates and table association
//! - [`schema`]: table definitions and `CREATE` statements
//! - [`insert`]: cell casting and `INSERT` statements
//! - [`driver`]: statement execution with foreign-key retry
//! - [`pipeline`]: the end-to-end run
//!
//! ## Column types
//!
//! Header type tokens map to [`types::ColumnType`]: `int`, `float`, `time`, `null_string`, and
//! anything else is text.

pub mod association;
pub mod config;
pub mod driver;
pub mod error;
pub mod ingestion;
pub mod insert;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod types;

pub use error::{ConvertError, ConvertResult};
