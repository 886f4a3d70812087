//! End-to-end conversion: scan → schema → insert.

use std::path::Path;
use std::sync::Arc;

use crate::association::Associator;
use crate::config::Config;
use crate::driver::{InsertionDriver, SqliteSink, StatementSink};
use crate::error::ConvertResult;
use crate::ingestion::{parse_file, ConversionObserver, ConversionStats, NoopObserver, ParseOptions};
use crate::insert::{InsertBuilder, InsertStatement};
use crate::schema::{Definitions, SchemaBuilder};
use crate::source::{read_tree, Checkout};
use crate::types::AssociatedTable;

/// Runs one conversion with a fixed configuration.
pub struct Converter<'a> {
    config: &'a Config,
    observer: Arc<dyn ConversionObserver>,
    driver: InsertionDriver,
}

impl<'a> Converter<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            observer: Arc::new(NoopObserver),
            driver: InsertionDriver::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ConversionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_driver(mut self, driver: InsertionDriver) -> Self {
        self.driver = driver;
        self
    }

    /// Fetch the configured source and write a fresh database at `db_path`.
    pub fn convert(&self, db_path: impl AsRef<Path>) -> ConvertResult<ConversionStats> {
        let result = self.convert_inner(db_path.as_ref());
        self.finish(result)
    }

    /// Convert the tree at `root` into `sink`.
    pub fn run(&self, root: impl AsRef<Path>, sink: &mut dyn StatementSink) -> ConvertResult<ConversionStats> {
        let result = self.run_inner(root.as_ref(), sink);
        self.finish(result)
    }

    fn convert_inner(&self, db_path: &Path) -> ConvertResult<ConversionStats> {
        self.config.validate()?;
        let source = Checkout::from_config(self.config)?.fetch()?;
        let mut sink = SqliteSink::create(db_path)?;
        self.run_inner(source.path(), &mut sink)
    }

    fn run_inner(&self, root: &Path, sink: &mut dyn StatementSink) -> ConvertResult<ConversionStats> {
        let observer = self.observer.as_ref();

        let definitions = self.build_schema(root)?;
        self.driver
            .execute_schema(sink, &definitions.create_statements()?, observer)?;

        let inserts = self.build_inserts(root, &definitions)?;
        let rows = inserts.iter().map(|i| i.rows).sum();
        let statements: Vec<_> = inserts.into_iter().map(|i| i.statement).collect();
        let deferred = self.driver.execute_inserts(sink, &statements, observer)?;

        Ok(ConversionStats {
            tables: definitions.len(),
            rows,
            deferred,
        })
    }

    fn finish(&self, result: ConvertResult<ConversionStats>) -> ConvertResult<ConversionStats> {
        match &result {
            Ok(stats) => self.observer.on_success(*stats),
            Err(e) => self.observer.report_failure(e),
        }
        result
    }

    /// Parse and associate every header file, then merge them into definitions.
    pub fn build_schema(&self, root: &Path) -> ConvertResult<Definitions> {
        let head = &self.config.head;
        let headers = self.scan(&root.join(&head.path), &head.ext)?;

        let mut builder = SchemaBuilder::from_config(self.config);
        for header in &headers {
            builder.add(header)?;
        }
        Ok(builder.finish())
    }

    /// Parse and associate every body file, then build one insert per table file.
    pub fn build_inserts(&self, root: &Path, definitions: &Definitions) -> ConvertResult<Vec<InsertStatement>> {
        let body = &self.config.body;
        let bodies = self.scan(&root.join(&body.path), &body.ext)?;

        let builder = InsertBuilder::from_config(definitions, self.config)?;
        bodies.iter().map(|table| builder.build(table)).collect()
    }

    /// Discover, parse and associate files under `dir` with extension `ext`.
    pub fn scan(&self, dir: &Path, ext: &str) -> ConvertResult<Vec<AssociatedTable>> {
        let files = read_tree(dir, ext)?;
        self.observer.on_scan(dir, ext, files.len());

        let opts = ParseOptions::from_config(self.config)?;
        let associator = Associator::new(&self.config.table);
        files
            .iter()
            .map(|(index, file)| {
                let table = parse_file(index, file, &opts, self.observer.as_ref())?;
                Ok(AssociatedTable {
                    association: associator.associate(index),
                    table,
                })
            })
            .collect()
    }
}
