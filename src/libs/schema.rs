use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::libs::error::{Error, Result};
use crate::libs::field::{Column, ColumnType, Field, Relationship};
use crate::libs::sql::{self, Fragment};

/// In-process description of one table, able to emit its DDL and DML.
///
/// A primary-key `id` column is always present: if the declared fields don't
/// carry one it is prepended, and an `id` column declared without the
/// primary-key flag is promoted to one.
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    columns: IndexMap<String, Column>,
    relationships: IndexMap<String, Relationship>,
}

impl TableSchema {
    pub fn new<I, F>(name: impl Into<String>, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<Field>,
    {
        let name = name.into();
        let mut declared = Vec::new();
        let mut relationships = Vec::new();

        for field in fields {
            match field.into() {
                Field::Column(column) => declared.push(column),
                Field::Relationship(relationship) => relationships.push(relationship),
            }
        }

        Self::check_fields(&name, &declared, &relationships)?;

        let mut columns = IndexMap::new();
        if !declared.iter().any(Column::is_id) {
            columns.insert(Column::id().name().to_string(), Column::id());
        }
        for column in declared {
            let column = if column.is_id() && !column.is_primary_key() {
                column.primary_key()
            } else {
                column
            };
            // Last declaration wins, first position is kept.
            columns.insert(column.name().to_string(), column);
        }

        let relationships = relationships
            .into_iter()
            .map(|rel| (rel.column_name(&name), rel))
            .collect();

        Ok(Self {
            name,
            columns,
            relationships,
        })
    }

    fn check_fields(table: &str, columns: &[Column], relationships: &[Relationship]) -> Result<()> {
        let malformed = |name: &str, reason| Error::MalformedField {
            table: table.to_string(),
            name: name.to_string(),
            reason,
        };

        if !is_identifier(table) {
            return Err(malformed(table, "table name is not a plain identifier"));
        }
        for column in columns {
            if !is_identifier(column.name()) {
                return Err(malformed(column.name(), "column name is not a plain identifier"));
            }
            if column.ty() == ColumnType::VarChar && column.max_length() == 0 {
                return Err(malformed(column.name(), "varchar max_length must be positive"));
            }
            if column.is_primary_key() && !column.is_id() {
                return Err(malformed(column.name(), "only the id column can be the primary key"));
            }
        }
        for relationship in relationships {
            if !is_identifier(relationship.target()) {
                return Err(malformed(
                    relationship.target(),
                    "relationship target is not a plain identifier",
                ));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Relationships keyed by their implied `<local>_<target>_id` column.
    pub fn relationships(&self) -> impl Iterator<Item = (&str, &Relationship)> {
        self.relationships.iter().map(|(name, rel)| (name.as_str(), rel))
    }

    /// Declared columns, the `id` column excluded. Insert payloads must have
    /// exactly this many values.
    pub fn fields_count(&self) -> usize {
        self.columns.values().filter(|c| !c.is_id()).count()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    fn column_fragment(column: &Column) -> Vec<String> {
        let mut tokens = vec![column.name().to_string()];

        if column.is_primary_key() {
            tokens.push("serial".to_string());
            tokens.push("PRIMARY KEY".to_string());
            return tokens;
        }

        if let Some(clause) = column.ty().sql_clause(column.max_length()) {
            tokens.push(clause);
        }
        if column.is_not_null() {
            tokens.push("NOT NULL".to_string());
        }
        if let Some(value) = column.default_value() {
            tokens.push("DEFAULT".to_string());
            tokens.push(sql::quote(value));
        }
        tokens
    }

    fn relationship_fragment(&self, relationship: &Relationship) -> Vec<String> {
        let column = relationship.column_name(&self.name);
        vec![
            column.clone(),
            "INTEGER".to_string(),
            "REFERENCES".to_string(),
            format!("{}({})", relationship.target(), column),
        ]
    }

    pub fn create_table_sql(&self) -> String {
        let mut fields = sql::join_fragments(
            self.columns.values().map(|c| Fragment::from(Self::column_fragment(c))),
            false,
        );

        if !self.relationships.is_empty() {
            let constraints = sql::join_fragments(
                self.relationships
                    .values()
                    .map(|rel| Fragment::from(self.relationship_fragment(rel))),
                true,
            );
            if !constraints.is_empty() {
                fields.push_str(", ");
                fields.push_str(&constraints);
            }
        }

        sql::finalize(&format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, fields))
    }

    /// `INSERT` for positional values in declaration order.
    pub fn insert_sql(&self, values: &[Value]) -> Result<String> {
        if values.len() != self.fields_count() {
            return Err(Error::ArityMismatch {
                table: self.name.clone(),
                expected: self.fields_count(),
                found: values.len(),
            });
        }

        let fields = sql::join_fragments(self.field_names(), true);
        let values = sql::join_fragments(values.iter().map(sql::quote), false);

        Ok(sql::finalize(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name, fields, values
        )))
    }

    /// `SELECT`, every column when `columns` is `None` or empty. Column
    /// names must be plain identifiers.
    pub fn select_sql(&self, columns: Option<&[&str]>) -> Result<String> {
        let fields = match columns {
            Some(columns) if !columns.is_empty() => {
                if let Some(bad) = columns.iter().find(|c| !is_identifier(c)) {
                    return Err(Error::MalformedField {
                        table: self.name.clone(),
                        name: bad.to_string(),
                        reason: "selected column is not a plain identifier",
                    });
                }
                columns.join(", ")
            }
            _ => "*".to_string(),
        };
        Ok(sql::finalize(&format!("SELECT {} FROM {}", fields, self.name)))
    }

    /// Catalog lookup for this table in the `public` schema.
    pub fn exists_sql(&self) -> String {
        let name = sql::quote(&Value::String(self.name.clone()));
        sql::finalize(&format!(
            "SELECT EXISTS (SELECT FROM pg_tables WHERE schemaname='public' AND tablename={})",
            name
        ))
    }

    pub fn drop_table_sql(&self) -> String {
        sql::finalize(&format!("DROP TABLE IF EXISTS {}", self.name))
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Table [{}]>", self.name)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
