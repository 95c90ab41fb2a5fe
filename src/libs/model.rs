use std::cell::{Cell, OnceCell};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::libs::backend::{Cursor, Execution, Row};
use crate::libs::error::{Error, Result};
use crate::libs::field::{Field, Relationship};
use crate::libs::orm::Database;
use crate::libs::schema::TableSchema;

/// A named entity bound to a table.
///
/// Declaring a model creates its table.
///
/// # Example
/// ```no_run
/// # async fn run(db: std::sync::Arc<slintschema::Database>) -> slintschema::Result<()> {
/// use slintschema::{Column, Model};
/// use serde_json::json;
///
/// let campaigns = Model::new(&db, "Campaigns", [Column::varchar("name").not_null()]).await?;
/// campaigns.create(&json!({ "name": "Spring launch" })).await?;
/// println!("{}", campaigns.all().await?);
/// # Ok(())
/// # }
/// ```
pub struct Model {
    name: String,
    db: Arc<Database>,
}

impl Model {
    /// Declares a model named `name` (lower-cased) and creates its table.
    pub async fn new<I, F>(db: &Arc<Database>, name: &str, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<Field>,
    {
        let name = name.to_lowercase();
        db.create_table(&name, fields).await?;

        Ok(Self {
            name,
            db: Arc::clone(db),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registered schema of this model's table.
    pub fn table(&self) -> Result<TableSchema> {
        self.db
            .schema(&self.name)
            .ok_or_else(|| Error::UnknownTable(self.name.clone()))
    }

    /// A reference from another model's rows to this one.
    pub fn reference(&self) -> Relationship {
        Relationship::reference(&self.name)
    }

    pub fn many_to_many(&self) -> Relationship {
        Relationship::many_to_many(&self.name)
    }

    /// Inserts one row.
    ///
    /// `item` must serialize to an object. Its values are taken in
    /// serialization order and matched to the declared columns by position;
    /// the keys themselves are not checked.
    pub async fn create<T>(&self, item: &T) -> Result<Execution>
    where
        T: Serialize,
    {
        let values = match serde_json::to_value(item) {
            Ok(Value::Object(map)) => map.into_iter().map(|(_, v)| v).collect::<Vec<_>>(),
            Ok(other) => {
                return Err(Error::InvalidPayload(format!(
                    "expected an object of field values, got {}",
                    other
                )));
            }
            Err(e) => return Err(Error::InvalidPayload(e.to_string())),
        };
        self.db.insert(&self.name, &values).await
    }

    /// Fetches every row. Each call returns a queryset holding its own
    /// cursor, drained when that queryset is first read.
    pub async fn all(&self) -> Result<Queryset<'_>> {
        let cursor = self.db.select(&self.name, None).await?;
        Ok(Queryset::new(self, Some(cursor)))
    }

    /// Predicates are accepted but not applied yet; the queryset never
    /// yields rows.
    pub fn filter(&self, _predicates: Value) -> Queryset<'_> {
        Queryset::new(self, None)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model").field("name", &self.name).finish()
    }
}

/// Rows fetched for a model, materialized once on first read.
pub struct Queryset<'a> {
    model: &'a Model,
    pending: Cell<Option<Cursor>>,
    cache: OnceCell<Vec<Row>>,
}

impl<'a> Queryset<'a> {
    fn new(model: &'a Model, cursor: Option<Cursor>) -> Self {
        Self {
            model,
            pending: Cell::new(cursor),
            cache: OnceCell::new(),
        }
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    /// Drains the cursor into the cache the first time it's called.
    pub fn rows(&self) -> &[Row] {
        self.cache
            .get_or_init(|| self.pending.take().map(Iterator::collect).unwrap_or_default())
    }

    pub fn count(&self) -> usize {
        self.rows().len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows().iter()
    }

    /// Deserializes every row into `T`.
    pub fn decode<T>(&self) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.iter()
            .map(|row| {
                serde_json::from_value(Value::Object(row.clone()))
                    .map_err(|e| Error::InvalidPayload(e.to_string()))
            })
            .collect()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows();
        self.cache.into_inner().unwrap_or_default()
    }
}

impl<'q, 'a> IntoIterator for &'q Queryset<'a> {
    type Item = &'q Row;
    type IntoIter = std::slice::Iter<'q, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Queryset<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self
            .iter()
            .map(|row| Value::Object(row.clone()).to_string())
            .collect::<Vec<_>>();
        write!(f, "<Queryset [{}]>", rows.join(", "))
    }
}
