use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;

use tabsql::config::Config;
use tabsql::driver::SqliteSink;
use tabsql::ingestion::{ConversionObserver, ConversionSeverity, ConversionStats, SourceContext};
use tabsql::pipeline::Converter;
use tabsql::types::Statement;
use tabsql::ConvertError;

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("tabsql-{name}-{nanos}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

const CONFIG: &str = r#"
timezone = "Asia/Tokyo"

[head]
path = "head"

[body]
path = "body"
start_row = 3

[table.orders]
foreign_keys = [{ column = "user_id", reference = "Users(Id)" }]

[table."sales/:year"]
primary_key = ["year", "id"]
shard_types = ["int"]
"#;

/// Users, orders referencing users, and a sales table sharded by year.
fn shop_tree(name: &str) -> PathBuf {
    let root = tmp_dir(name);
    write(&root, "head/users.csv", "id,name,joined_at\nint,text,time\n");
    write(&root, "head/orders.csv", "id,user_id,amount\nint,int,float\n");
    write(&root, "head/sales/2023.csv", "id,total\nint,float\n");
    write(&root, "head/sales/2024.csv", "id,total\nint,float\n");

    write(
        &root,
        "body/users.csv",
        "# exported from the admin sheet\nid,name,joined_at\nint,text,time\n1,Alice,2023-04-01 09:30:00\n2,\"Bob \"\"B\"\"\",2023-04-02T00:00:00Z\n",
    );
    write(&root, "body/orders.csv", "id,user_id,amount\nint,int,float\n1,1,12.5\n2,2,\n");
    write(&root, "body/sales/2023.csv", "id,total\nint,float\n1,9.5\n2,3\n");
    write(&root, "body/sales/2024.csv", "id,total\nint,float\n1,4.25\n");
    root
}

fn config_for(root: &Path) -> Config {
    let mut cfg = Config::from_toml_str(CONFIG).unwrap();
    cfg.local.path = Some(root.to_path_buf());
    cfg
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM `{table}`"), [], |r| r.get(0))
        .unwrap()
}

#[derive(Default)]
struct Recording {
    parsed: Mutex<Vec<String>>,
    deferred: Mutex<Vec<String>>,
    success: Mutex<Option<ConversionStats>>,
    failures: Mutex<Vec<(ConversionSeverity, String)>>,
}

impl ConversionObserver for Recording {
    fn on_parsed(&self, ctx: &SourceContext, _rows: usize) {
        self.parsed.lock().unwrap().push(ctx.index.to_string());
    }

    fn on_deferred(&self, statement: &Statement, _attempt: usize) {
        self.deferred.lock().unwrap().push(statement.table.clone());
    }

    fn on_success(&self, stats: ConversionStats) {
        *self.success.lock().unwrap() = Some(stats);
    }

    fn on_failure(&self, severity: ConversionSeverity, error: &ConvertError) {
        self.failures
            .lock()
            .unwrap()
            .push((severity, error.to_string()));
    }
}

#[test]
fn shop_tree_converts_into_sqlite() {
    let root = shop_tree("shop");
    let cfg = config_for(&root);
    let observer = Arc::new(Recording::default());
    let mut sink = SqliteSink::in_memory().unwrap();

    let stats = Converter::new(&cfg)
        .with_observer(observer.clone())
        .run(&root, &mut sink)
        .unwrap();

    assert_eq!(
        stats,
        ConversionStats {
            tables: 3,
            rows: 7,
            deferred: 1
        }
    );
    assert_eq!(*observer.success.lock().unwrap(), Some(stats));
    // Orders sorts before Users, so its first attempt hits the foreign key.
    assert_eq!(*observer.deferred.lock().unwrap(), vec!["Orders".to_string()]);
    assert!(observer.failures.lock().unwrap().is_empty());
    assert_eq!(observer.parsed.lock().unwrap().len(), 8);

    let conn = sink.connection();
    assert_eq!(count(conn, "Users"), 2);
    assert_eq!(count(conn, "Orders"), 2);
    assert_eq!(count(conn, "Sales"), 3);

    let joined: String = conn
        .query_row("SELECT `JoinedAt` FROM `Users` WHERE `Id` = 1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(joined, "2023-04-01T09:30:00+09:00");

    let (name, joined): (String, String) = conn
        .query_row("SELECT `Name`, `JoinedAt` FROM `Users` WHERE `Id` = 2", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(name, "Bob \"B\"");
    assert_eq!(joined, "2023-04-02T00:00:00Z");

    let amount: f64 = conn
        .query_row("SELECT `Amount` FROM `Orders` WHERE `Id` = 2", [], |r| r.get(0))
        .unwrap();
    assert_eq!(amount, 0.0);

    let by_year: Vec<(i64, i64)> = conn
        .prepare("SELECT `Year`, COUNT(*) FROM `Sales` GROUP BY `Year` ORDER BY `Year`")
        .unwrap()
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(by_year, vec![(2023, 2), (2024, 1)]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn sharded_table_is_created_once_with_shard_column_first() {
    let root = shop_tree("schema");
    let cfg = config_for(&root);

    let defs = Converter::new(&cfg).build_schema(&root).unwrap();
    let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Orders", "Sales", "Users"]);

    let sales = defs.get("Sales").unwrap();
    let columns: Vec<&str> = sales.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, vec!["Year", "Id", "Total"]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn tab_separated_sources_are_supported() {
    let root = tmp_dir("tsv");
    write(&root, "head/items.tsv", "id\tlabel\tnote\nint\ttext\tnull_string\n");
    write(&root, "body/items.tsv", "id\tlabel\tnote\nint\ttext\tnull_string\n1\tsay 5\" tall\t\n");

    let mut cfg = Config::from_toml_str(
        r#"
[head]
path = "head"
ext = "tsv"

[body]
path = "body"
ext = "tsv"
"#,
    )
    .unwrap();
    cfg.local.path = Some(root.clone());

    let mut sink = SqliteSink::in_memory().unwrap();
    let stats = Converter::new(&cfg).run(&root, &mut sink).unwrap();
    assert_eq!(stats.rows, 1);

    let (label, note): (String, Option<String>) = sink
        .connection()
        .query_row("SELECT `Label`, `Note` FROM `Items`", [], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap();
    assert_eq!(label, "say 5\" tall");
    assert_eq!(note, None);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn body_without_header_is_reported() {
    let root = shop_tree("orphan");
    write(&root, "body/ghosts.csv", "id\nint\n1\n");
    let cfg = config_for(&root);
    let observer = Arc::new(Recording::default());
    let mut sink = SqliteSink::in_memory().unwrap();

    let err = Converter::new(&cfg)
        .with_observer(observer.clone())
        .run(&root, &mut sink)
        .unwrap_err();

    assert!(matches!(err, ConvertError::NoSuchTable { ref table } if table == "Ghosts"));
    let failures = observer.failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, ConversionSeverity::Error);
    assert!(observer.success.lock().unwrap().is_none());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn convert_overwrites_existing_database_file() {
    let root = shop_tree("convert");
    let cfg = config_for(&root);
    let db = root.join("out.db");
    fs::write(&db, b"garbage that is not sqlite").unwrap();

    let stats = Converter::new(&cfg).convert(&db).unwrap();
    assert_eq!(stats.tables, 3);

    let conn = Connection::open(&db).unwrap();
    assert_eq!(count(&conn, "Users"), 2);
    assert_eq!(count(&conn, "Sales"), 3);
    drop(conn);

    // A second run starts from scratch instead of colliding with existing tables.
    let again = Converter::new(&cfg).convert(&db).unwrap();
    assert_eq!(again, stats);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn convert_requires_a_source() {
    let cfg = Config::from_toml_str(CONFIG).unwrap();
    let db = tmp_dir("nosource").join("out.db");

    let err = Converter::new(&cfg).convert(&db).unwrap_err();
    assert!(err.to_string().contains("no source"), "{err}");
}
