//! Fragment helpers shared by every statement a [`TableSchema`] emits.
//!
//! Values are inlined as quoted text rather than bound as parameters, and
//! embedded quote characters are not escaped. Only feed trusted values
//! through these helpers.
//!
//! [`TableSchema`]: crate::TableSchema

use serde_json::Value;

use crate::libs::field::ID_COLUMN;

/// One comma-separated element of a statement: a bare name or a run of
/// space-separated tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Name(String),
    Tokens(Vec<String>),
}

impl Fragment {
    fn tokens(&self) -> &[String] {
        match self {
            Fragment::Name(name) => std::slice::from_ref(name),
            Fragment::Tokens(tokens) => tokens,
        }
    }

    fn mentions_id(&self) -> bool {
        self.tokens().iter().any(|token| token == ID_COLUMN)
    }
}

impl From<&str> for Fragment {
    fn from(name: &str) -> Self {
        Fragment::Name(name.to_string())
    }
}

impl From<String> for Fragment {
    fn from(name: String) -> Self {
        Fragment::Name(name)
    }
}

impl From<Vec<String>> for Fragment {
    fn from(tokens: Vec<String>) -> Self {
        Fragment::Tokens(tokens)
    }
}

/// Wraps a scalar in single quotes. `null` stays the bare `NULL` keyword.
pub fn quote(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => format!("'{}'", s),
        other => format!("'{}'", other),
    }
}

/// Terminates a statement with `;` unless it already ends with one.
pub fn finalize(sql: &str) -> String {
    if sql.trim_end().ends_with(';') {
        sql.to_string()
    } else {
        format!("{};", sql)
    }
}

/// Joins fragments with `, `, each fragment's tokens with a space.
///
/// With `suppress_id`, fragments containing the literal `id` token are
/// dropped first.
pub fn join_fragments<I, F>(fragments: I, suppress_id: bool) -> String
where
    I: IntoIterator<Item = F>,
    F: Into<Fragment>,
{
    fragments
        .into_iter()
        .map(Into::<Fragment>::into)
        .filter(|fragment| !(suppress_id && fragment.mentions_id()))
        .map(|fragment| fragment.tokens().join(" "))
        .collect::<Vec<_>>()
        .join(", ")
}
