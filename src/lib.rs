//! Code-first tables for PostgreSQL.
//!
//! Declare a [`Model`] as a list of [`Column`]s and [`Relationship`]s; the
//! crate builds the `CREATE TABLE`, `INSERT` and `SELECT` text for it, runs
//! them through a [`Database`] and hands rows back as a [`Queryset`].

mod libs;

pub use libs::*;
