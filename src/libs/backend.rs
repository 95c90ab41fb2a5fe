use std::collections::VecDeque;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgColumn, PgConnection, PgRow};
use sqlx::types::Decimal;
use sqlx::{Column, Connection, Row as _, TypeInfo};

use crate::libs::config::ConnectionConfig;
use crate::libs::error::{Error, Result};

/// A fetched row, column name to decoded value.
pub type Row = serde_json::Map<String, Value>;

/// PostgreSQL SQLSTATE for `duplicate_table`.
const DUPLICATE_TABLE: &str = "42P07";

/// Rows produced by one statement, consumed front to back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cursor {
    rows: VecDeque<Row>,
}

impl Cursor {
    pub fn new(rows: impl IntoIterator<Item = Row>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.front()
    }
}

impl Iterator for Cursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }
}

/// What happened to a statement that didn't fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    /// Committed; carries whatever rows the statement returned.
    Applied(Cursor),
    /// The table being created already exists. Nothing was committed.
    DuplicateSkipped,
}

impl Execution {
    pub fn is_applied(&self) -> bool {
        matches!(self, Execution::Applied(_))
    }

    /// The returned rows, empty for a skipped statement.
    pub fn into_cursor(self) -> Cursor {
        match self {
            Execution::Applied(cursor) => cursor,
            Execution::DuplicateSkipped => Cursor::default(),
        }
    }
}

/// A live connection statements run against.
///
/// Each call to [`execute`](Backend::execute) is its own transaction:
/// committed when the statement succeeds, rolled back when it fails.
#[async_trait]
pub trait Backend: Send {
    async fn execute(&mut self, sql: &str) -> Result<Execution>;

    /// Releases the connection. Later statements fail.
    async fn close(&mut self) -> Result<()>;
}

/// A single PostgreSQL connection.
pub struct PgBackend {
    connection: Option<PgConnection>,
}

impl PgBackend {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let connection = PgConnection::connect_with(&config.connect_options()).await?;
        tracing::info!(host = %config.host, database = %config.database, "connected");
        Ok(Self {
            connection: Some(connection),
        })
    }

    fn connection(&mut self) -> Result<&mut PgConnection> {
        self.connection
            .as_mut()
            .ok_or_else(|| Error::Database(sqlx::Error::PoolClosed))
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn execute(&mut self, sql: &str) -> Result<Execution> {
        let mut tx = self.connection()?.begin().await?;

        match sqlx::query(sql).fetch_all(&mut *tx).await {
            Ok(rows) => {
                tx.commit().await?;
                Ok(Execution::Applied(Cursor::new(rows.iter().map(decode_row))))
            }
            Err(err) => rolled_back(err, tx.rollback().await),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.close().await?;
            tracing::info!("connection closed");
        }
        Ok(())
    }
}

/// Outcome of a failed statement once its transaction has been rolled back.
/// The statement's own error wins over a failed rollback.
fn rolled_back(err: sqlx::Error, rollback: sqlx::Result<()>) -> Result<Execution> {
    if let Err(rollback) = rollback {
        tracing::warn!(error = %rollback, "rollback failed");
    }
    if is_duplicate_table(&err) {
        Ok(Execution::DuplicateSkipped)
    } else {
        Err(err.into())
    }
}

fn is_duplicate_table(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(DUPLICATE_TABLE),
        _ => false,
    }
}

fn decode_row(row: &PgRow) -> Row {
    let mut map = Row::new();
    for col in row.columns() {
        map.insert(col.name().to_string(), decode_value(row, col));
    }
    map
}

/// Decodes one column by its PostgreSQL type. Types without a JSON
/// counterpart fall back to text, and to `null` when that fails too.
fn decode_value(row: &PgRow, col: &PgColumn) -> Value {
    let name = col.name();
    let decoded = match col.type_info().name() {
        "INT2" => row.try_get::<Option<i16>, _>(name).map(|v| v.map(Value::from)),
        "INT4" => row.try_get::<Option<i32>, _>(name).map(|v| v.map(Value::from)),
        "INT8" => row.try_get::<Option<i64>, _>(name).map(|v| v.map(Value::from)),
        "FLOAT4" => row.try_get::<Option<f32>, _>(name).map(|v| v.map(Value::from)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(name).map(|v| v.map(Value::from)),
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(name)
            .map(|v| v.map(decimal_value)),
        "BOOL" => row.try_get::<Option<bool>, _>(name).map(|v| v.map(Value::from)),
        _ => row.try_get::<Option<String>, _>(name).map(|v| v.map(Value::from)),
    };
    decoded.ok().flatten().unwrap_or(Value::Null)
}

/// A JSON number when a float represents the decimal exactly, its text
/// otherwise.
fn decimal_value(decimal: Decimal) -> Value {
    let text = decimal.normalize().to_string();
    match text.parse::<f64>() {
        Ok(float) if float.to_string() == text => Value::from(float),
        _ => Value::String(text),
    }
}
