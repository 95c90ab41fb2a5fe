use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use serde_json::Value;

use crate::libs::backend::{Backend, Cursor, Execution, PgBackend};
use crate::libs::config::ConnectionConfig;
use crate::libs::error::{Error, Result};
use crate::libs::field::Field;
use crate::libs::schema::TableSchema;

/// The single point of contact with the database: one connection plus the
/// registry of tables known to exist.
///
/// Statements are serialized through the connection lock, so a `Database`
/// can be shared (usually behind an `Arc`) between callers.
pub struct Database {
    backend: tokio::sync::Mutex<Box<dyn Backend>>,
    tables: Mutex<IndexMap<String, TableSchema>>,
}

impl Database {
    /// Wraps an already established backend.
    pub fn new(backend: impl Backend + 'static) -> Self {
        let backend: Box<dyn Backend> = Box::new(backend);
        Self {
            backend: tokio::sync::Mutex::new(backend),
            tables: Mutex::new(IndexMap::new()),
        }
    }

    /// Opens the PostgreSQL connection described by `config`.
    ///
    /// # Example
    /// ```no_run
    /// # async fn run() -> slintschema::Result<()> {
    /// use slintschema::{ConnectionConfig, Database};
    ///
    /// let db = Database::connect(&ConnectionConfig::from_env()?).await?;
    /// db.close().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        Ok(Self::new(PgBackend::connect(config).await?))
    }

    /// Releases the connection. Statements issued afterwards fail.
    pub async fn close(&self) -> Result<()> {
        self.backend.lock().await.close().await
    }

    fn tables(&self) -> MutexGuard<'_, IndexMap<String, TableSchema>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one statement; it is committed on success and rolled back on
    /// failure.
    pub async fn execute(&self, sql: &str) -> Result<Execution> {
        tracing::debug!(%sql, "execute");
        let result = self.backend.lock().await.execute(sql).await;
        if let Err(err) = &result {
            tracing::warn!(%sql, error = %err, "statement rolled back");
        }
        result
    }

    /// Creates the table and registers its schema.
    ///
    /// A table the catalog already lists is not created again: the call
    /// reports [`Execution::DuplicateSkipped`] and registers the schema all
    /// the same, so it can be inserted into afterwards.
    pub async fn create_table<I, F>(&self, name: &str, fields: I) -> Result<Execution>
    where
        I: IntoIterator<Item = F>,
        F: Into<Field>,
    {
        let schema = TableSchema::new(name, fields)?;

        let outcome = if self.table_exists(schema.name()).await? {
            Execution::DuplicateSkipped
        } else {
            self.execute(&schema.create_table_sql()).await?
        };

        match &outcome {
            Execution::Applied(_) => tracing::info!(table = %schema.name(), "table created"),
            Execution::DuplicateSkipped => {
                tracing::warn!(table = %schema.name(), "table already exists, skipped")
            }
        }

        self.tables().insert(schema.name().to_string(), schema);
        Ok(outcome)
    }

    /// A copy of the registered schema for `name`.
    pub fn schema(&self, name: &str) -> Option<TableSchema> {
        self.tables().get(name).cloned()
    }

    fn registered(&self, name: &str) -> Result<TableSchema> {
        self.schema(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables().keys().cloned().collect()
    }

    /// Inserts one row of positional values into a registered table.
    pub async fn insert(&self, name: &str, values: &[Value]) -> Result<Execution> {
        let sql = self.registered(name)?.insert_sql(values)?;
        self.execute(&sql).await
    }

    /// Fetches `columns` (every column when `None`) of a registered table.
    pub async fn select(&self, name: &str, columns: Option<&[&str]>) -> Result<Cursor> {
        let sql = self.registered(name)?.select_sql(columns)?;
        Ok(self.execute(&sql).await?.into_cursor())
    }

    /// Asks the catalog whether `name` exists, registered or not.
    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let schema = TableSchema::new(name, Vec::<Field>::new())?;
        let cursor = self.execute(&schema.exists_sql()).await?.into_cursor();
        Ok(cursor
            .first()
            .and_then(|row| row.values().next())
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    /// Drops the table if it exists and forgets its schema.
    pub async fn drop_table(&self, name: &str) -> Result<Execution> {
        let schema = match self.schema(name) {
            Some(schema) => schema,
            None => TableSchema::new(name, Vec::<Field>::new())?,
        };
        let outcome = self.execute(&schema.drop_table_sql()).await?;
        self.tables().shift_remove(name);
        tracing::info!(table = %name, "table dropped");
        Ok(outcome)
    }
}
