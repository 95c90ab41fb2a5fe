use serde_json::Value;
use std::hash::{Hash, Hasher};

/// Length used for `varchar` columns that don't specify one.
pub const DEFAULT_MAX_LENGTH: u32 = 100;

/// Name of the auto-increment primary key every table carries.
pub const ID_COLUMN: &str = "id";

/// SQL type family of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnType {
    /// No type clause is rendered.
    #[default]
    Untyped,
    Text,
    VarChar,
    Integer,
    Decimal,
    Boolean,
}

impl ColumnType {
    /// Type clause for this family, `None` for untyped columns.
    pub fn sql_clause(self, max_length: u32) -> Option<String> {
        match self {
            ColumnType::Untyped => None,
            ColumnType::Text => Some("text".to_string()),
            ColumnType::VarChar => Some(format!("varchar({})", max_length)),
            ColumnType::Integer => Some("integer".to_string()),
            ColumnType::Decimal => Some("decimal".to_string()),
            ColumnType::Boolean => Some("boolean".to_string()),
        }
    }
}

/// Describes one table column.
///
/// Two columns are equal when they share a name and primary-key-ness; the
/// remaining attributes don't take part in equality or hashing.
///
/// ```
/// use slintschema::Column;
///
/// let name = Column::varchar("name").not_null();
/// assert_eq!(name.max_length(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    max_length: u32,
    ty: ColumnType,
    not_null: bool,
    primary_key: bool,
    default_value: Option<Value>,
}

impl Column {
    /// An untyped column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_length: DEFAULT_MAX_LENGTH,
            ty: ColumnType::Untyped,
            not_null: false,
            primary_key: false,
            default_value: None,
        }
    }

    pub fn typed(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            ty,
            ..Self::new(name)
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::typed(name, ColumnType::Text)
    }

    pub fn varchar(name: impl Into<String>) -> Self {
        Self::typed(name, ColumnType::VarChar)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::typed(name, ColumnType::Integer)
    }

    pub fn decimal(name: impl Into<String>) -> Self {
        Self::typed(name, ColumnType::Decimal)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::typed(name, ColumnType::Boolean)
    }

    /// The `id serial PRIMARY KEY` column.
    pub fn id() -> Self {
        Self::new(ID_COLUMN).primary_key()
    }

    pub fn max_length(&self) -> u32 {
        self.max_length
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> ColumnType {
        self.ty
    }

    pub fn is_not_null(&self) -> bool {
        self.not_null
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn is_id(&self) -> bool {
        self.name == ID_COLUMN
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.primary_key == other.primary_key
    }
}

impl Eq for Column {}

impl Hash for Column {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.primary_key.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Reference,
    ManyToMany,
}

/// A reference from one table's rows to another table's primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    target: String,
    cardinality: Cardinality,
}

impl Relationship {
    pub fn new(target: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            target: target.into().to_lowercase(),
            cardinality,
        }
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Self::new(target, Cardinality::Reference)
    }

    pub fn many_to_many(target: impl Into<String>) -> Self {
        Self::new(target, Cardinality::ManyToMany)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// `<local>_<target>`, the stem of the implied column.
    pub fn stem(&self, local_table: &str) -> String {
        format!("{}_{}", local_table, self.target)
    }

    /// `<local>_<target>_id`, the implied integer column.
    pub fn column_name(&self, local_table: &str) -> String {
        format!("{}_id", self.stem(local_table))
    }
}

/// Anything a model can be declared with.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Column(Column),
    Relationship(Relationship),
}

impl Field {
    pub fn is_relationship(&self) -> bool {
        matches!(self, Field::Relationship(_))
    }
}

impl From<Column> for Field {
    fn from(column: Column) -> Self {
        Field::Column(column)
    }
}

impl From<Relationship> for Field {
    fn from(relationship: Relationship) -> Self {
        Field::Relationship(relationship)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_everything_but_name_and_key() {
        let a = Column::varchar("name").not_null();
        let b = Column::integer("name").with_default(3);
        assert_eq!(a, b);
        assert_ne!(Column::new("id"), Column::id());

        let set: HashSet<Column> = [a, b, Column::id()].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn type_clauses() {
        assert_eq!(ColumnType::Untyped.sql_clause(10), None);
        assert_eq!(
            ColumnType::VarChar.sql_clause(42).as_deref(),
            Some("varchar(42)")
        );
        assert_eq!(ColumnType::Boolean.sql_clause(0).as_deref(), Some("boolean"));
    }

    #[test]
    fn relationship_column_name() {
        let rel = Relationship::reference("Country");
        assert_eq!(rel.target(), "country");
        assert_eq!(rel.column_name("cars"), "cars_country_id");
        assert!(Field::from(rel).is_relationship());
    }
}
