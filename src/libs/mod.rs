pub mod backend;
pub mod config;
pub mod error;
pub mod field;
pub mod model;
pub mod orm;
pub mod schema;
pub mod sql;

// Re-export them for easier access from the crate root
pub use backend::{Backend, Cursor, Execution, PgBackend, Row};
pub use config::*;
pub use error::*;
pub use field::*;
pub use model::*;
pub use orm::*;
pub use schema::*;
