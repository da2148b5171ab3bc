//! Catalog-driven table creation.
//!
//! Every table in a [`SchemaCatalog`] becomes exactly one `CREATE TABLE`
//! statement. Each column definition is built by running its [`ColumnSpec`]
//! through a fixed sequence of modifier steps:
//!
//! 1. base type and size argument
//! 2. nullability
//! 3. primary key
//! 4. uniqueness
//! 5. unsigned
//! 6. foreign-key reference
//! 7. default value
//!
//! There is no `IF NOT EXISTS` guard and no tracking table. Running
//! [`create_all_tables`] against a database that already holds the schema
//! fails on the first table.

use crate::schema::{
    ColumnSpec, ColumnType, DefaultValue, ForeignRef, SchemaCatalog, TableSpec, TextSize,
    DEFAULT_STRING_LENGTH,
};
use rusqlite::Connection;
use thiserror::Error;

/// Errors that can occur while creating tables.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The `CREATE TABLE` statement for a table failed.
    #[error("creating table '{table}' failed: {source}")]
    Table {
        /// The table being created.
        table: String,
        /// The column the failure is attributed to, when known.
        column: Option<String>,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// A column references a table that has not been created yet.
    #[error("column '{table}.{column}' references table '{referenced}', which does not exist yet")]
    MissingReference {
        table: String,
        column: String,
        referenced: String,
    },

    /// Failed to query the existing schema.
    #[error("failed to inspect existing schema: {0}")]
    StateQuery(rusqlite::Error),
}

impl MigrationError {
    /// Name of the table whose creation failed, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            MigrationError::Table { table, .. } | MigrationError::MissingReference { table, .. } => {
                Some(table.as_str())
            }
            MigrationError::StateQuery(_) => None,
        }
    }
}

/// One rendered column, assembled step by step from a [`ColumnSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    name: String,
    sql_type: String,
    not_null: bool,
    primary_key: bool,
    autoincrement: bool,
    unique: bool,
    non_negative: bool,
    references: Option<ForeignRef>,
    default: Option<DefaultValue>,
}

impl ColumnDefinition {
    /// Runs the modifier pipeline for one column.
    pub fn from_spec(spec: &ColumnSpec) -> Self {
        Self::base(spec)
            .nullability(spec)
            .primary(spec)
            .unique(spec)
            .unsigned(spec)
            .references(spec)
            .default_value(spec)
    }

    fn base(spec: &ColumnSpec) -> Self {
        let sql_type = match spec.column_type {
            ColumnType::Increments | ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::String => {
                format!("VARCHAR({})", spec.max_length.unwrap_or(DEFAULT_STRING_LENGTH))
            }
            ColumnType::Text => match spec.text_size {
                None | Some(TextSize::Small) => "TEXT".to_string(),
                Some(TextSize::Medium) => "MEDIUMTEXT".to_string(),
                Some(TextSize::Long) => "LONGTEXT".to_string(),
            },
            ColumnType::DateTime => "DATETIME".to_string(),
        };

        Self {
            name: spec.name.clone(),
            sql_type,
            not_null: false,
            primary_key: false,
            autoincrement: false,
            unique: false,
            non_negative: false,
            references: None,
            default: None,
        }
    }

    fn nullability(mut self, spec: &ColumnSpec) -> Self {
        self.not_null = !spec.nullable;
        self
    }

    fn primary(mut self, spec: &ColumnSpec) -> Self {
        if spec.is_primary() {
            self.primary_key = true;
            self.autoincrement = spec.column_type == ColumnType::Increments;
        }
        self
    }

    fn unique(mut self, spec: &ColumnSpec) -> Self {
        // A primary key is already unique.
        self.unique = spec.unique && !self.primary_key;
        self
    }

    fn unsigned(mut self, spec: &ColumnSpec) -> Self {
        // SQLite has no unsigned integers; a CHECK constraint stands in.
        self.non_negative = match spec.column_type {
            ColumnType::Increments => true,
            ColumnType::Integer => spec.unsigned,
            _ => false,
        };
        self
    }

    fn references(mut self, spec: &ColumnSpec) -> Self {
        self.references = spec.references.clone();
        self
    }

    fn default_value(mut self, spec: &ColumnSpec) -> Self {
        self.default = spec.default.clone();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn referenced_table(&self) -> Option<&str> {
        self.references.as_ref().map(|r| r.table.as_str())
    }

    /// Renders the column definition as it appears inside `CREATE TABLE`.
    pub fn to_sql(&self) -> String {
        let name = quote_ident(&self.name);
        let mut def = format!("{} {}", name, self.sql_type);

        if self.not_null {
            def.push_str(" NOT NULL");
        }
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
            if self.autoincrement {
                def.push_str(" AUTOINCREMENT");
            }
        }
        if self.unique {
            def.push_str(" UNIQUE");
        }
        if self.non_negative {
            def.push_str(&format!(" CHECK ({} >= 0)", name));
        }
        if let Some(fk) = &self.references {
            def.push_str(&format!(
                " REFERENCES {}({})",
                quote_ident(&fk.table),
                quote_ident(&fk.column)
            ));
        }
        if let Some(default) = &self.default {
            def.push_str(" DEFAULT ");
            def.push_str(&render_default(default));
        }

        def
    }
}

/// A single "create table" operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
    pub unique_together: Vec<Vec<String>>,
}

impl CreateTable {
    pub fn from_spec(spec: &TableSpec) -> Self {
        Self {
            table: spec.name.clone(),
            columns: spec.columns.iter().map(ColumnDefinition::from_spec).collect(),
            unique_together: spec.unique_together.clone(),
        }
    }

    /// Renders the `CREATE TABLE` statement.
    pub fn to_sql(&self) -> String {
        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("    {}", c.to_sql()))
            .collect();

        for group in &self.unique_together {
            let cols: Vec<String> = group.iter().map(|c| quote_ident(c)).collect();
            defs.push(format!("    UNIQUE ({})", cols.join(", ")));
        }

        format!(
            "CREATE TABLE {} (\n{}\n);",
            quote_ident(&self.table),
            defs.join(",\n")
        )
    }

    /// Executes the statement. When SQLite's message names one of this
    /// table's columns, the error carries that column.
    pub fn execute(&self, conn: &Connection) -> Result<(), MigrationError> {
        conn.execute_batch(&self.to_sql())
            .map_err(|source| MigrationError::Table {
                table: self.table.clone(),
                column: self.column_named_in(&source),
                source,
            })
    }

    fn column_named_in(&self, err: &rusqlite::Error) -> Option<String> {
        let rusqlite::Error::SqliteFailure(_, Some(message)) = err else {
            return None;
        };
        // SQLite writes "...: name" or "... column [name] ..." for column faults.
        self.columns
            .iter()
            .map(ColumnDefinition::name)
            .find(|name| {
                message.ends_with(&format!(": {name}")) || message.contains(&format!("[{name}]"))
            })
            .map(str::to_string)
    }
}

/// Builds the create-table operations for a catalog, in catalog order,
/// without touching a database.
pub fn plan_tables(catalog: &SchemaCatalog) -> Vec<CreateTable> {
    catalog.tables().iter().map(CreateTable::from_spec).collect()
}

/// Renders the whole catalog as a DDL script.
pub fn render_script(catalog: &SchemaCatalog) -> String {
    plan_tables(catalog)
        .iter()
        .map(CreateTable::to_sql)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Creates every table in the catalog, in catalog order.
///
/// Stops at the first failure; tables created before it are left in place.
/// Returns the number of tables created.
///
/// # Errors
///
/// - `MigrationError::MissingReference` if a column points at a table that
///   is neither in the database nor the table being created.
/// - `MigrationError::Table` if SQLite rejects a statement, including when
///   the table already exists.
pub fn create_all_tables(
    conn: &Connection,
    catalog: &SchemaCatalog,
) -> Result<usize, MigrationError> {
    let mut created = 0;

    for op in plan_tables(catalog) {
        for column in &op.columns {
            let Some(referenced) = column.referenced_table() else {
                continue;
            };
            if referenced != op.table && !table_exists(conn, referenced)? {
                return Err(MigrationError::MissingReference {
                    table: op.table.clone(),
                    column: column.name().to_string(),
                    referenced: referenced.to_string(),
                });
            }
        }

        tracing::info!(
            table = op.table.as_str(),
            columns = op.columns.len(),
            "creating table"
        );

        op.execute(conn)?;

        created += 1;
    }

    Ok(created)
}

/// Whether a table with this name exists in the connected database.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, MigrationError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |row| row.get(0),
    )
    .map_err(MigrationError::StateQuery)
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn render_default(value: &DefaultValue) -> String {
    match value {
        DefaultValue::Integer(n) => n.to_string(),
        DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
    }
}
