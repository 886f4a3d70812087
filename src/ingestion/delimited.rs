//! Delimited text (CSV/TSV) parsing.

use std::io::Read;

use crate::types::ParsedTable;

/// Parse delimited text into rows of cells.
///
/// Rules:
///
/// - Every line is data; there is no header handling at this layer.
/// - Lines starting with `#` are comments.
/// - Rows may have differing cell counts.
/// - Stray quote characters inside unquoted fields are kept as-is.
pub fn parse_delimited(bytes: &[u8], delimiter: u8) -> Result<ParsedTable, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(bytes);
    parse_delimited_from_reader(&mut rdr)
}

/// Parse rows from an existing CSV reader.
pub fn parse_delimited_from_reader<R: Read>(rdr: &mut csv::Reader<R>) -> Result<ParsedTable, csv::Error> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_owned).collect());
    }
    Ok(ParsedTable::new(rows))
}
