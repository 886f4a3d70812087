//! Table Associator: binds each discovered file to a logical table.
//!
//! Configured path templates such as `data/:year/widgets` are matched segment by segment
//! against a file's [`FileIndex`]. Literal segments must match exactly; parameter segments
//! (prefixed with [`PARAM_MARKER`]) capture the path segment as a shard value. The literal
//! segments form the template's identity prefix, which names the logical table, so every
//! shard file of `data/:year/widgets` lands in `DataWidgets`.
//!
//! When several templates match one index, the template with the most literal segments wins;
//! ties go to the template that sorts first.

use std::collections::BTreeMap;

use crate::config::TableConfig;
use crate::types::{
    camel_identifier, ColumnType, CreateOptions, FileIndex, ForeignKey, ShardColumn, TableAssociation,
};

/// Marks a parameter segment in a path template.
pub const PARAM_MARKER: char = ':';

/// One `/`-separated piece of a path template: matched verbatim, or captured as a shard key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .trim_matches('/')
            .split('/')
            .map(|seg| match seg.strip_prefix(PARAM_MARKER) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(seg.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Literal segments joined with `/`.
    pub fn identity_prefix(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(l) => Some(l.as_str()),
                Segment::Param(_) => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Parameter names in order.
    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(p) => Some(p.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Returns the captured parameter values when `index` matches this template's shape.
    ///
    /// Segment counts must agree, literals must be equal, and parameter segments must be
    /// non-empty.
    pub fn captures<'a>(&self, index: &'a FileIndex) -> Option<Vec<&'a str>> {
        let parts: Vec<&str> = index.segments().collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut values = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(_) => values.push(part),
            }
        }
        Some(values)
    }
}

/// Declared type of a template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardType {
    Integer,
    String,
}

impl ShardType {
    /// `int` or `string`; an undeclared type means `string`. Other tokens are invalid.
    pub fn from_token(token: Option<&str>) -> Option<Self> {
        match token.map(str::trim) {
            Some("int") => Some(Self::Integer),
            Some("string") | Some("") | None => Some(Self::String),
            Some(_) => None,
        }
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Integer => value.parse::<i64>().is_ok(),
            Self::String => true,
        }
    }

    fn column_type(&self) -> ColumnType {
        match self {
            Self::Integer => ColumnType::Integer,
            Self::String => ColumnType::Text,
        }
    }
}

/// Matches file indexes against configured path templates.
#[derive(Debug, Clone, Default)]
pub struct Associator {
    templates: Vec<(PathTemplate, TableConfig)>,
}

impl Associator {
    pub fn new(tables: &BTreeMap<String, TableConfig>) -> Self {
        let templates = tables
            .iter()
            .map(|(raw, cfg)| (PathTemplate::parse(raw), cfg.clone()))
            .collect();
        Self { templates }
    }

    /// Bind `index` to its logical table.
    ///
    /// Unmatched indexes are named after the whole index and carry no shard columns or keys.
    pub fn associate(&self, index: &FileIndex) -> TableAssociation {
        let mut best: Option<(usize, TableAssociation)> = None;
        for (template, cfg) in &self.templates {
            let Some(assoc) = try_match(template, cfg, index) else {
                continue;
            };
            let rank = template.literal_count();
            if best.as_ref().is_none_or(|(r, _)| rank > *r) {
                best = Some((rank, assoc));
            }
        }

        best.map(|(_, assoc)| assoc).unwrap_or_else(|| TableAssociation {
            index: index.clone(),
            name: camel_identifier(index.as_str()),
            shard_columns: Vec::new(),
            options: CreateOptions::default(),
        })
    }
}

fn try_match(template: &PathTemplate, cfg: &TableConfig, index: &FileIndex) -> Option<TableAssociation> {
    let values = template.captures(index)?;

    let mut shard_columns = Vec::with_capacity(values.len());
    for (i, (name, value)) in template.param_names().into_iter().zip(values).enumerate() {
        let shard_type = ShardType::from_token(cfg.shard_types.get(i).map(String::as_str))?;
        if !shard_type.accepts(value) {
            return None;
        }
        shard_columns.push(ShardColumn {
            name: name.to_string(),
            column_type: shard_type.column_type(),
            value: value.to_string(),
        });
    }

    Some(TableAssociation {
        index: index.clone(),
        name: camel_identifier(&template.identity_prefix()),
        shard_columns,
        options: CreateOptions {
            primary_key: cfg.primary_key.clone(),
            unique_keys: cfg.unique_keys.clone(),
            index_keys: cfg.index_keys.clone(),
            foreign_keys: cfg
                .foreign_keys
                .iter()
                .map(|fk| ForeignKey {
                    column: fk.column.clone(),
                    reference: fk.reference.clone(),
                })
                .collect(),
        },
    })
}
