//! Schema Builder: header files → one [`TableDefinition`] per logical table → DDL.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::config::Config;
use crate::error::{ConvertError, ConvertResult};
use crate::types::{camel_identifier, AssociatedTable, Column, ColumnType, Statement, TableDefinition};

/// Collects table definitions from header files.
///
/// The first header file seen for a logical table defines its schema; later files for the
/// same table (other shards) are validated but otherwise ignored.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name_row: usize,
    type_row: usize,
    definitions: BTreeMap<String, TableDefinition>,
}

impl SchemaBuilder {
    /// `name_row` and `type_row` are 1-based.
    pub fn new(name_row: usize, type_row: usize) -> Self {
        Self {
            name_row,
            type_row,
            definitions: BTreeMap::new(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.head.column_name_row, cfg.head.column_type_row)
    }

    /// Add one header table. Returns `true` when it registered a new definition.
    pub fn add(&mut self, header: &AssociatedTable) -> ConvertResult<bool> {
        let assoc = &header.association;
        let name_row = header
            .table
            .row(self.name_row)
            .ok_or_else(|| schema_err(&assoc.name, format!("{}: row[{}] does not exist", assoc.index, self.name_row)))?;
        let type_row = header
            .table
            .row(self.type_row)
            .ok_or_else(|| schema_err(&assoc.name, format!("{}: row[{}] does not exist", assoc.index, self.type_row)))?;
        if name_row.len() != type_row.len() {
            return Err(schema_err(
                &assoc.name,
                format!(
                    "{}: mismatch length of columns. name: {}, type: {}",
                    assoc.index,
                    name_row.len(),
                    type_row.len()
                ),
            ));
        }

        let entry = match self.definitions.entry(assoc.name.clone()) {
            Entry::Occupied(_) => return Ok(false),
            Entry::Vacant(v) => v,
        };

        let columns = assoc
            .shard_columns
            .iter()
            .map(|s| Column::new(camel_identifier(&s.name), s.column_type))
            .chain(
                name_row
                    .iter()
                    .zip(type_row)
                    .map(|(name, ty)| Column::new(camel_identifier(name), ColumnType::from_token(ty))),
            )
            .collect();

        entry.insert(TableDefinition {
            name: assoc.name.clone(),
            columns,
            options: assoc.options.clone(),
        });
        Ok(true)
    }

    pub fn finish(self) -> Definitions {
        Definitions(self.definitions)
    }
}

/// Read-only table name → definition mapping produced by the schema phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Definitions(BTreeMap<String, TableDefinition>);

impl Definitions {
    pub fn get(&self, name: &str) -> Option<&TableDefinition> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableDefinition> {
        self.0.values()
    }

    /// One batch (`CREATE TABLE` plus its indexes) per definition, ordered by table name.
    pub fn create_statements(&self) -> ConvertResult<Vec<Statement>> {
        self.iter()
            .map(|def| Ok(Statement::new(&def.name, create_statement(def)?)))
            .collect()
    }
}

/// Render `CREATE TABLE` and its `CREATE [UNIQUE] INDEX` statements, joined with `; `.
///
/// Without a configured primary key the first column is the primary key. Index names are the
/// key columns joined with `-`.
pub fn create_statement(def: &TableDefinition) -> ConvertResult<String> {
    let first = def
        .columns
        .first()
        .ok_or_else(|| schema_err(&def.name, "columns is empty".to_string()))?;

    let mut body: Vec<String> = def
        .columns
        .iter()
        .map(|c| format!("`{}` {}", c.name, c.column_type.as_sql()))
        .collect();

    let primary_key = if def.options.primary_key.is_empty() {
        quoted(&[first.name.clone()])
    } else {
        quoted(&def.options.primary_key)
    };
    body.push(format!("PRIMARY KEY ({primary_key})"));

    for fk in &def.options.foreign_keys {
        body.push(format!(
            "FOREIGN KEY (`{}`) REFERENCES {}",
            camel_identifier(&fk.column),
            fk.reference
        ));
    }

    let mut queries = vec![format!("CREATE TABLE `{}` ({})", def.name, body.join(", "))];
    for key in &def.options.unique_keys {
        queries.push(index_statement("CREATE UNIQUE INDEX", &def.name, key));
    }
    for key in &def.options.index_keys {
        queries.push(index_statement("CREATE INDEX", &def.name, key));
    }

    Ok(queries.join("; "))
}

fn index_statement(verb: &str, table: &str, key: &[String]) -> String {
    let names: Vec<String> = key.iter().map(|k| camel_identifier(k)).collect();
    format!("{verb} `{}` ON `{table}` ({})", names.join("-"), quoted(&names))
}

/// Normalize and backtick-quote column names, comma separated.
fn quoted(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("`{}`", camel_identifier(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn schema_err(table: &str, message: String) -> ConvertError {
    ConvertError::Schema {
        table: table.to_string(),
        message,
    }
}
