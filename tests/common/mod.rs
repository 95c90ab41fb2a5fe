#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use slintschema::{Backend, Cursor, Error, Execution, Result, Row};

#[derive(Default)]
struct State {
    statements: Vec<String>,
    tables: HashMap<String, Vec<Row>>,
    failures: Vec<String>,
    closed: bool,
}

/// In-memory stand-in for a PostgreSQL connection. Understands just enough
/// of the generated statements to store and return rows.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `table` is already in the catalog before any statement runs.
    pub fn existing(self, table: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .tables
            .insert(table.to_string(), Vec::new());
        self
    }

    /// Any statement containing `needle` fails.
    pub fn failing_on(self, needle: &str) -> Self {
        self.state.lock().unwrap().failures.push(needle.to_string());
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    /// The `CREATE TABLE` statements issued so far.
    pub fn creates(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|sql| sql.starts_with("CREATE TABLE"))
            .collect()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

fn between<'a>(sql: &'a str, open: &str, close: &str) -> &'a str {
    let start = sql.find(open).map(|i| i + open.len()).unwrap_or(0);
    let end = sql[start..].find(close).map(|i| start + i).unwrap_or(sql.len());
    &sql[start..end]
}

fn word_after<'a>(sql: &'a str, keyword: &str) -> &'a str {
    between(sql, keyword, " ")
        .trim_end_matches(';')
        .split('(')
        .next()
        .unwrap_or_default()
}

fn parse_insert(sql: &str) -> (String, Row) {
    let table = word_after(sql, "INSERT INTO ").to_string();
    let columns = between(sql, "(", ")");
    let values = between(sql, "VALUES (", ");");

    let mut row = Row::new();
    for (column, value) in columns.split(", ").zip(values.split(", ")) {
        let value = match value {
            "NULL" => Value::Null,
            quoted => Value::String(quoted.trim_matches('\'').to_string()),
        };
        row.insert(column.to_string(), value);
    }
    (table, row)
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn execute(&mut self, sql: &str) -> Result<Execution> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(Error::Database(sqlx::Error::PoolClosed));
        }
        state.statements.push(sql.to_string());

        if state.failures.iter().any(|needle| sql.contains(needle.as_str())) {
            return Err(Error::Database(sqlx::Error::Protocol(format!(
                "simulated failure: {}",
                sql
            ))));
        }

        let rows = if sql.starts_with("CREATE TABLE IF NOT EXISTS ") {
            let table = word_after(sql, "CREATE TABLE IF NOT EXISTS ").to_string();
            state.tables.entry(table).or_default();
            Vec::new()
        } else if sql.starts_with("INSERT INTO ") {
            let (table, mut row) = parse_insert(sql);
            let rows = state.tables.entry(table).or_default();
            row.insert("id".to_string(), Value::from(rows.len() as i64 + 1));
            rows.push(row);
            Vec::new()
        } else if sql.contains("pg_tables") {
            let table = between(sql, "tablename='", "'");
            let mut row = Row::new();
            row.insert(
                "exists".to_string(),
                Value::Bool(state.tables.contains_key(table)),
            );
            vec![row]
        } else if sql.starts_with("SELECT ") {
            let table = word_after(sql, " FROM ");
            state.tables.get(table).cloned().unwrap_or_default()
        } else if sql.starts_with("DROP TABLE IF EXISTS ") {
            let table = word_after(sql, "DROP TABLE IF EXISTS ").to_string();
            state.tables.remove(&table);
            Vec::new()
        } else {
            Vec::new()
        };

        Ok(Execution::Applied(Cursor::new(rows)))
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}
