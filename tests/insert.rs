use chrono_tz::Tz;

use tabsql::insert::{cast_cell, normalize_datetime, InsertBuilder};
use tabsql::schema::{Definitions, SchemaBuilder};
use tabsql::types::{
    AssociatedTable, ColumnType, CreateOptions, FileIndex, ParsedTable, ShardColumn, TableAssociation,
};

fn table(index: &str, name: &str, cells: &[&[&str]], shard_columns: Vec<ShardColumn>) -> AssociatedTable {
    AssociatedTable {
        association: TableAssociation {
            index: FileIndex::new(index),
            name: name.to_string(),
            shard_columns,
            options: CreateOptions::default(),
        },
        table: ParsedTable::new(
            cells
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        ),
    }
}

fn definitions(headers: &[AssociatedTable]) -> Definitions {
    let mut builder = SchemaBuilder::new(1, 2);
    for h in headers {
        builder.add(h).unwrap();
    }
    builder.finish()
}

fn tokyo() -> Tz {
    "Asia/Tokyo".parse().unwrap()
}

#[test]
fn people_rows_become_one_insert() {
    let defs = definitions(&[table("people", "People", &[&["id", "name"], &["int", "text"]], vec![])]);
    let body = table("people", "People", &[&["1", "Alice"], &["2", "Bob"]], vec![]);

    let insert = InsertBuilder::new(&defs, 1, Tz::UTC).build(&body).unwrap();
    assert_eq!(insert.rows, 2);
    assert_eq!(insert.statement.table, "People");
    assert_eq!(
        insert.statement.sql,
        "INSERT INTO `People` (`Id`, `Name`) VALUES (1, \"Alice\"), (2, \"Bob\");"
    );
}

#[test]
fn rows_before_start_row_are_skipped() {
    let defs = definitions(&[table("people", "People", &[&["id", "name"], &["int", "text"]], vec![])]);
    let body = table(
        "people",
        "People",
        &[&["id", "name"], &["int", "text"], &["7", "Grace"]],
        vec![],
    );

    let insert = InsertBuilder::new(&defs, 3, Tz::UTC).build(&body).unwrap();
    assert_eq!(insert.rows, 1);
    assert!(insert.statement.sql.ends_with("VALUES (7, \"Grace\");"));
}

#[test]
fn shard_values_are_prepended() {
    let shard = vec![ShardColumn {
        name: "year".to_string(),
        column_type: ColumnType::Integer,
        value: "2023".to_string(),
    }];
    let defs = definitions(&[table("sales/2023", "Sales", &[&["id", "total"], &["int", "float"]], shard.clone())]);
    let body = table("sales/2023", "Sales", &[&["1", "9.50"]], shard);

    let insert = InsertBuilder::new(&defs, 1, Tz::UTC).build(&body).unwrap();
    assert_eq!(
        insert.statement.sql,
        "INSERT INTO `Sales` (`Year`, `Id`, `Total`) VALUES (2023, 1, 9.5);"
    );
}

#[test]
fn not_enough_rows_names_the_table() {
    let defs = definitions(&[table("people", "People", &[&["id"], &["int"]], vec![])]);
    let body = table("people", "People", &[&["id"], &["int"]], vec![]);

    let err = InsertBuilder::new(&defs, 3, Tz::UTC).build(&body).unwrap_err();
    assert_eq!(
        err.to_string(),
        "not enough rows in table 'People'. rows: 2, start row: 3"
    );
}

#[test]
fn body_without_header_is_no_such_table() {
    let defs = definitions(&[]);
    let body = table("ghosts", "Ghosts", &[&["1"]], vec![]);
    let err = InsertBuilder::new(&defs, 1, Tz::UTC).build(&body).unwrap_err();
    assert!(err.to_string().contains("no such table 'Ghosts'"));
}

#[test]
fn cast_error_names_table_row_and_column() {
    let defs = definitions(&[table("people", "People", &[&["id", "name"], &["int", "text"]], vec![])]);
    let body = table("people", "People", &[&["1", "Alice"], &["two", "Bob"]], vec![]);

    let err = InsertBuilder::new(&defs, 1, Tz::UTC).build(&body).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("table 'People' row 2 column 'Id'"));
    assert!(msg.contains("raw='two'"));
}

#[test]
fn row_width_must_match_the_definition() {
    let defs = definitions(&[table("people", "People", &[&["id", "name"], &["int", "text"]], vec![])]);
    let body = table("people", "People", &[&["1", "Alice", "extra"]], vec![]);
    let err = InsertBuilder::new(&defs, 1, Tz::UTC).build(&body).unwrap_err();
    assert!(err.to_string().contains("row has 3 values but table has 2 columns"));
}

#[test]
fn empty_numbers_cast_to_zero() {
    assert_eq!(cast_cell(ColumnType::Integer, "", Tz::UTC).unwrap(), "0");
    assert_eq!(cast_cell(ColumnType::Numeric, "", Tz::UTC).unwrap(), "0");
    assert_eq!(cast_cell(ColumnType::Integer, "-12", Tz::UTC).unwrap(), "-12");
    assert!(cast_cell(ColumnType::Integer, "1.5", Tz::UTC).is_err());
}

#[test]
fn text_quotes_are_doubled_and_nullable_empty_is_null() {
    assert_eq!(
        cast_cell(ColumnType::Text, "say \"hi\"", Tz::UTC).unwrap(),
        "\"say \"\"hi\"\"\""
    );
    assert_eq!(cast_cell(ColumnType::Text, "", Tz::UTC).unwrap(), "\"\"");
    assert_eq!(cast_cell(ColumnType::NullableText, "", Tz::UTC).unwrap(), "NULL");
    assert_eq!(cast_cell(ColumnType::NullableText, "x", Tz::UTC).unwrap(), "\"x\"");
}

#[test]
fn datetimes_with_offset_pass_through() {
    let raw = "2023-04-01T09:30:00+09:00";
    assert_eq!(normalize_datetime(raw, Tz::UTC), raw);
    assert_eq!(normalize_datetime("2023-04-01T00:30:00Z", tokyo()), "2023-04-01T00:30:00Z");
}

#[test]
fn zone_less_datetimes_take_the_configured_zone() {
    let once = normalize_datetime("2023-04-01 09:30:00", tokyo());
    assert_eq!(once, "2023-04-01T09:30:00+09:00");
    assert_eq!(normalize_datetime(&once, tokyo()), once);
    assert_eq!(
        cast_cell(ColumnType::DateTime, "2023-04-01 09:30:00", Tz::UTC).unwrap(),
        "\"2023-04-01T09:30:00+00:00\""
    );
}

#[test]
fn unrecognized_datetimes_are_kept_verbatim() {
    assert_eq!(cast_cell(ColumnType::DateTime, "soon", tokyo()).unwrap(), "\"soon\"");
}
