//! Relational source: read-only access to the SQLite database holding the
//! intermediate tables.

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task;
use crate::error::{MigrationError, Result};

/// Rows buffered between the blocking scan and the consumer.
const ROW_CHANNEL_CAPACITY: usize = 256;

/// A dynamically-typed value read from the source.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => SqlValue::Bytes(b.to_vec()),
        }
    }
}

/// One row of a table, columns in the order the source returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    pub values: Vec<(String, SqlValue)>,
}

impl SourceRow {
    pub fn new(values: Vec<(String, SqlValue)>) -> Self {
        Self { values }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

/// Lazily delivered rows of a full table scan.
///
/// Finite and not restartable; dropping the stream stops the scan.
pub struct RowStream {
    rx: mpsc::Receiver<Result<SourceRow>>,
}

impl RowStream {
    /// Next row, or `None` once the table is exhausted.
    pub async fn next(&mut self) -> Option<Result<SourceRow>> {
        self.rx.recv().await
    }
}

/// Source database handle
pub struct SourceDb {
    path: PathBuf,
}

impl SourceDb {
    /// Create a handle without touching the file
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Create a handle and verify the database can be opened
    pub async fn connect<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db = Self::new(db_path);
        db.with_connection(|conn| {
            conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })?;
            Ok(())
        })
        .await?;
        log::info!("Connected to source database {}", db.path.display());
        Ok(db)
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = open_read_only(&path)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| MigrationError::Io(std::io::Error::other(e.to_string())))?
    }

    /// `SELECT count(*)` over a table
    pub async fn count_rows(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT count(*) FROM {}", quote_identifier(table));
        let count = self
            .with_connection(move |conn| {
                conn.query_row(&sql, [], |row| row.get::<_, i64>(0))
                    .map_err(MigrationError::Database)
            })
            .await?;
        Ok(count.max(0) as u64)
    }

    /// `SELECT *` over a table, streamed row by row
    pub fn stream_rows(&self, table: &str) -> RowStream {
        let (tx, rx) = mpsc::channel(ROW_CHANNEL_CAPACITY);
        let path = self.path.clone();
        let sql = format!("SELECT * FROM {}", quote_identifier(table));

        task::spawn_blocking(move || {
            if let Err(e) = scan_table(&path, &sql, &tx) {
                let _ = tx.blocking_send(Err(e));
            }
        });

        RowStream { rx }
    }
}

fn open_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| {
        MigrationError::Connection(format!(
            "cannot open source database {}: {}",
            path.display(),
            e
        ))
    })?;

    // query_only guards against accidental writes, the rest speeds up full scans
    conn.execute_batch(
        "PRAGMA query_only = ON; \
         PRAGMA temp_store = MEMORY; \
         PRAGMA cache_size = -65536;",
    )?;

    Ok(conn)
}

fn scan_table(
    path: &Path,
    sql: &str,
    tx: &mpsc::Sender<Result<SourceRow>>,
) -> Result<()> {
    let conn = open_read_only(path)?;
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            values.push((name.clone(), SqlValue::from(row.get_ref(idx)?)));
        }
        if tx.blocking_send(Ok(SourceRow::new(values))).is_err() {
            log::debug!("Row consumer went away, stopping scan");
            break;
        }
    }

    Ok(())
}

/// Double-quote an SQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
