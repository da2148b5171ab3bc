//! Storage layer for Quire.
//!
//! Provides SQLite connection pooling (via `r2d2`), the declarative schema
//! catalog describing every table, and the migration engine that turns that
//! catalog into `CREATE TABLE` statements.
//!
//! # Design decisions
//!
//! - **Catalog as data**: tables are described by [`SchemaCatalog`] values
//!   rather than hand-written SQL, so the DDL for every table comes out of
//!   one generator and follows the same modifier rules.
//! - **One-shot migration**: [`create_all_tables`] has no `IF NOT EXISTS`
//!   guard. It is meant to run once against an empty database; running it
//!   again is an error, not a no-op.
//! - **`r2d2` connection pool**: bounded connection reuse shared by every
//!   request handler.

pub mod migrate;
mod pool;
pub mod schema;

pub use migrate::{
    create_all_tables, plan_tables, render_script, ColumnDefinition, CreateTable, MigrationError,
};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use schema::{
    blog_catalog, ColumnSpec, ColumnType, DefaultValue, ForeignRef, SchemaCatalog, SchemaError,
    TableSpec, TextSize,
};
