//! Connection wrapper behavior seen from the driver side.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use slimorm::prelude::*;
use slimorm::{ConnectionState, DbCommand, ResultSet, TransactionHandle};

#[derive(Debug, Default, Clone, PartialEq, Model)]
struct Counter {
    #[orm(primary_key)]
    name: String,
    hits: i64,
}

#[derive(Debug, Clone, PartialEq)]
struct Seen {
    sql: String,
    timeout: Option<Duration>,
    transaction: Option<TransactionHandle>,
}

/// Driver connection decorator recording every command it executes.
struct Recorder {
    inner: Box<dyn DbConnection>,
    log: Arc<Mutex<Vec<Seen>>>,
}

impl Recorder {
    fn record(&self, command: &DbCommand) {
        self.log.lock().unwrap().push(Seen {
            sql: command.sql.clone(),
            timeout: command.timeout,
            transaction: command.transaction,
        });
    }
}

impl DbConnection for Recorder {
    fn open(&mut self) -> Result<()> {
        self.inner.open()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    fn begin_transaction(&mut self, isolation: Option<IsolationLevel>) -> Result<()> {
        self.inner.begin_transaction(isolation)
    }

    fn commit(&mut self) -> Result<()> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.inner.rollback()
    }

    fn execute_non_query(&mut self, command: &DbCommand) -> Result<u64> {
        self.record(command);
        self.inner.execute_non_query(command)
    }

    fn execute_reader(&mut self, command: &DbCommand) -> Result<ResultSet> {
        self.record(command);
        self.inner.execute_reader(command)
    }
}

fn recording_factory() -> (OrmConnectionFactory, Arc<Mutex<Vec<Seen>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let factory = OrmConnectionFactory::new(":memory:", Arc::new(SqliteDriver))
        .dialect(Arc::new(SqliteDialect::new()))
        .command_timeout(Duration::from_secs(10))
        .connection_filter(move |inner| {
            Box::new(Recorder {
                inner,
                log: Arc::clone(&sink),
            })
        });
    (factory, log)
}

fn last(log: &Arc<Mutex<Vec<Seen>>>) -> Seen {
    log.lock().unwrap().last().cloned().unwrap()
}

#[test]
fn commands_carry_effective_timeout() {
    let (factory, log) = recording_factory();
    let mut conn = factory.open_db_connection().unwrap();
    conn.create_table::<Counter>(false).unwrap();
    assert_eq!(last(&log).timeout, Some(Duration::from_secs(10)));

    {
        let _short = ambient::with_command_timeout(Duration::from_millis(250));
        conn.select::<Counter>().unwrap();
        assert_eq!(last(&log).timeout, Some(Duration::from_millis(250)));
    }

    conn.set_command_timeout(None);
    conn.count::<Counter>("", &[]).unwrap();
    assert_eq!(last(&log).timeout, Some(slimorm::session::DEFAULT_COMMAND_TIMEOUT));
}

#[test]
fn commands_inside_a_scope_carry_its_transaction() {
    let (factory, log) = recording_factory();
    let mut conn = factory.open_db_connection().unwrap();
    conn.create_table::<Counter>(false).unwrap();

    let handle = {
        let mut tx = conn.transaction().unwrap();
        tx.insert(&Counter {
            name: "a".into(),
            hits: 1,
        })
        .unwrap();
        let handle = tx.handle();
        tx.commit().unwrap();
        handle
    };
    let insert = last(&log);
    assert!(insert.sql.starts_with("INSERT INTO"));
    assert_eq!(insert.transaction, Some(handle));

    conn.select::<Counter>().unwrap();
    assert_eq!(last(&log).transaction, None);
}

#[test]
fn dropped_scope_discards_writes() {
    let (factory, _log) = recording_factory();
    let mut conn = factory.open_db_connection().unwrap();
    conn.create_table::<Counter>(false).unwrap();

    {
        let mut tx = conn.transaction().unwrap();
        tx.insert(&Counter {
            name: "kept".into(),
            hits: 1,
        })
        .unwrap();
        {
            let mut inner = tx.transaction().unwrap();
            inner
                .insert(&Counter {
                    name: "discarded".into(),
                    hits: 2,
                })
                .unwrap();
        }
        tx.commit().unwrap();
    }

    let names: Vec<String> = conn.column("SELECT name FROM Counter", &[]).unwrap();
    assert_eq!(names, ["kept"]);

    {
        let mut tx = conn.transaction().unwrap();
        tx.delete_all::<Counter>().unwrap();
    }
    assert_eq!(conn.count::<Counter>("", &[]).unwrap(), 1);
}

#[test]
fn thread_dialect_serves_connections_without_one() {
    let mut conn = OrmConnectionFactory::new(":memory:", Arc::new(SqliteDriver))
        .open_db_connection()
        .unwrap();
    assert!(matches!(
        conn.create_table::<Counter>(false),
        Err(Error::Config(_))
    ));

    let _guard = ambient::with_thread_dialect(Arc::new(SqliteDialect::new()));
    conn.create_table::<Counter>(false).unwrap();
    assert!(conn.table_exists::<Counter>().unwrap());
}

#[derive(Debug, Default, Clone, PartialEq, Model)]
struct OrderLine {
    #[orm(primary_key, auto_increment)]
    id: i64,
    #[orm(alias = "UnitPrice")]
    unit_price: f64,
    #[orm(alias = "ProductName", length = 50)]
    product_name: String,
}

#[test]
fn naming_strategy_shapes_schema() {
    let dialect = SqliteDialect::new();
    dialect
        .settings()
        .set_naming_strategy(Arc::new(LowercaseUnderscoreNaming));
    let mut conn = OrmConnectionFactory::new(":memory:", Arc::new(SqliteDriver))
        .dialect(Arc::new(dialect))
        .open_db_connection()
        .unwrap();

    conn.create_table::<OrderLine>(false).unwrap();
    let mut line = OrderLine {
        unit_price: 2.5,
        product_name: "Widget".into(),
        ..OrderLine::default()
    };
    conn.save(&mut line).unwrap();

    let raw: Vec<String> = conn
        .column("SELECT product_name FROM order_line WHERE unit_price > {0}", &[Value::Double(2.0)])
        .unwrap();
    assert_eq!(raw, ["Widget"]);
    assert_eq!(conn.get_by_id::<OrderLine>(line.id).unwrap(), line);
}
