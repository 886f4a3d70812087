//! Tabular Parser: turns discovered files into [`crate::types::ParsedTable`]s.
//!
//! Most callers should use [`parse_file`] (from [`unified`]) which:
//!
//! - picks a [`TableParser`] from the file's declared type
//! - reads and parses the file into rows of text cells
//! - reports success/failure to a [`ConversionObserver`]
//!
//! Format-specific functions are also available under:
//! - [`delimited`]
//! - `excel` (feature `excel`)

pub mod delimited;
#[cfg(feature = "excel")]
pub mod excel;
pub mod observability;
pub mod unified;

pub use observability::{
    CompositeObserver, ConversionObserver, ConversionSeverity, ConversionStats, FileObserver, NoopObserver,
    SourceContext, StdErrObserver, TracingObserver,
};
pub use unified::{parse_file, ParseOptions, TableParser};
