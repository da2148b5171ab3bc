//! Declarative schema catalog.
//!
//! A [`SchemaCatalog`] is an ordered list of [`TableSpec`]s, each an ordered
//! list of [`ColumnSpec`]s. It is plain data: the migration engine in
//! [`crate::migrate`] is the only consumer that turns it into DDL.
//!
//! Catalogs are validated once, when constructed, and are immutable
//! afterwards. Table order is significant: the migration engine creates
//! tables in catalog order, so every table must come after the tables its
//! foreign keys point at.

use std::collections::HashSet;
use thiserror::Error;

/// Default `VARCHAR` length when a string column declares no `max_length`.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Logical column types understood by the migration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Auto-incrementing unsigned integer id; always the table's primary key.
    Increments,
    /// 32-bit integer, signed unless the column is marked `unsigned`.
    Integer,
    /// Character column sized by `max_length`.
    String,
    /// Large text column; `text_size` selects the storage class.
    Text,
    /// Timestamp column.
    DateTime,
}

/// Storage class for [`ColumnType::Text`] columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Small,
    Medium,
    Long,
}

/// Target of a foreign-key reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignRef {
    pub table: String,
    pub column: String,
}

/// Column default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Integer(i64),
    Text(String),
    CurrentTimestamp,
}

/// Declarative description of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub max_length: Option<u32>,
    pub text_size: Option<TextSize>,
    pub nullable: bool,
    pub primary: bool,
    pub unique: bool,
    pub unsigned: bool,
    pub references: Option<ForeignRef>,
    pub default: Option<DefaultValue>,
}

impl ColumnSpec {
    fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            max_length: None,
            text_size: None,
            nullable: false,
            primary: false,
            unique: false,
            unsigned: false,
            references: None,
            default: None,
        }
    }

    /// An auto-increment primary key column.
    pub fn increments(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Increments).primary()
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::String)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::DateTime)
    }

    pub fn max_length(mut self, len: u32) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn text_size(mut self, size: TextSize) -> Self {
        self.text_size = Some(size);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    pub fn default_to(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Whether this column is the table's primary key, either explicitly or
    /// because it is an auto-increment id.
    pub fn is_primary(&self) -> bool {
        self.primary || self.column_type == ColumnType::Increments
    }
}

/// Declarative description of one table: columns in emission order plus
/// optional composite unique constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub unique_together: Vec<Vec<String>>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            unique_together: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a table-level `UNIQUE (a, b, ...)` constraint.
    pub fn unique_together(mut self, columns: &[&str]) -> Self {
        self.unique_together
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn column_named(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The table's single primary key column, if the table is well formed.
    pub fn primary_column(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.is_primary())
    }
}

/// Errors detected while validating a catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("table '{table}' is declared more than once")]
    DuplicateTable { table: String },

    #[error("column '{table}.{column}' is declared more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("table '{table}' has no primary key column")]
    MissingPrimary { table: String },

    #[error("table '{table}' declares more than one primary key column")]
    MultiplePrimary { table: String },

    #[error("primary key '{table}.{column}' must be an auto-increment id")]
    PrimaryNotIncrements { table: String, column: String },

    #[error("column '{table}.{column}' references unknown table '{referenced}'")]
    UnknownReferenceTable {
        table: String,
        column: String,
        referenced: String,
    },

    #[error("column '{table}.{column}' references unknown column '{referenced}.{referenced_column}'")]
    UnknownReferenceColumn {
        table: String,
        column: String,
        referenced: String,
        referenced_column: String,
    },

    #[error("column '{table}.{column}' references '{referenced}.{referenced_column}', which is neither a primary key nor unique")]
    ReferenceNotUnique {
        table: String,
        column: String,
        referenced: String,
        referenced_column: String,
    },

    #[error("unique constraint on '{table}' names unknown column '{column}'")]
    UnknownUniqueColumn { table: String, column: String },
}

/// Validated, immutable set of table descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaCatalog {
    tables: Vec<TableSpec>,
}

impl SchemaCatalog {
    /// Builds a catalog, checking that every table has exactly one
    /// auto-increment primary key and that every reference and unique
    /// constraint names something declared in the catalog. A reference must
    /// point at a primary key or a unique column.
    ///
    /// Table order is kept as given; it is not checked against foreign-key
    /// dependencies here (the migration engine reports an out-of-order
    /// reference when it reaches it).
    pub fn new(tables: Vec<TableSpec>) -> Result<Self, SchemaError> {
        let mut seen_tables = HashSet::new();
        for table in &tables {
            if !seen_tables.insert(table.name.as_str()) {
                return Err(SchemaError::DuplicateTable {
                    table: table.name.clone(),
                });
            }
            validate_columns(table)?;
        }

        for table in &tables {
            for column in &table.columns {
                let Some(fk) = &column.references else {
                    continue;
                };
                let target = tables.iter().find(|t| t.name == fk.table).ok_or_else(|| {
                    SchemaError::UnknownReferenceTable {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        referenced: fk.table.clone(),
                    }
                })?;
                let Some(referenced) = target.column_named(&fk.column) else {
                    return Err(SchemaError::UnknownReferenceColumn {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        referenced: fk.table.clone(),
                        referenced_column: fk.column.clone(),
                    });
                };
                // SQLite only enforces a foreign key whose parent key is unique.
                if !referenced.is_primary() && !referenced.unique {
                    return Err(SchemaError::ReferenceNotUnique {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        referenced: fk.table.clone(),
                        referenced_column: fk.column.clone(),
                    });
                }
            }
        }

        Ok(Self { tables })
    }

    /// Tables in creation order.
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }
}

fn validate_columns(table: &TableSpec) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for column in &table.columns {
        if !seen.insert(column.name.as_str()) {
            return Err(SchemaError::DuplicateColumn {
                table: table.name.clone(),
                column: column.name.clone(),
            });
        }
    }

    let mut primaries = table.columns.iter().filter(|c| c.is_primary());
    let primary = primaries.next().ok_or_else(|| SchemaError::MissingPrimary {
        table: table.name.clone(),
    })?;
    if primaries.next().is_some() {
        return Err(SchemaError::MultiplePrimary {
            table: table.name.clone(),
        });
    }
    if primary.column_type != ColumnType::Increments {
        return Err(SchemaError::PrimaryNotIncrements {
            table: table.name.clone(),
            column: primary.name.clone(),
        });
    }

    for group in &table.unique_together {
        if let Some(missing) = group.iter().find(|c| !seen.contains(c.as_str())) {
            return Err(SchemaError::UnknownUniqueColumn {
                table: table.name.clone(),
                column: missing.clone(),
            });
        }
    }

    Ok(())
}

/// The blog's tables: users, categories, posts, tags and the posts/tags
/// join table, in foreign-key dependency order.
pub fn blog_catalog() -> Result<SchemaCatalog, SchemaError> {
    SchemaCatalog::new(vec![
        TableSpec::new("users")
            .column(ColumnSpec::increments("id"))
            .column(ColumnSpec::string("email").max_length(254).unique())
            .column(ColumnSpec::string("name").max_length(150)),
        TableSpec::new("categories")
            .column(ColumnSpec::increments("id"))
            .column(ColumnSpec::string("name").max_length(150)),
        TableSpec::new("posts")
            .column(ColumnSpec::increments("id"))
            .column(
                ColumnSpec::integer("user_id")
                    .unsigned()
                    .references("users", "id"),
            )
            .column(
                ColumnSpec::integer("category_id")
                    .unsigned()
                    .references("categories", "id"),
            )
            .column(ColumnSpec::string("title").max_length(150))
            .column(ColumnSpec::string("slug").max_length(150).unique())
            .column(ColumnSpec::text("html").text_size(TextSize::Medium))
            .column(ColumnSpec::datetime("created_at"))
            .column(ColumnSpec::datetime("updated_at").nullable()),
        TableSpec::new("tags")
            .column(ColumnSpec::increments("id"))
            .column(ColumnSpec::string("slug").max_length(150).unique())
            .column(ColumnSpec::string("name").max_length(150)),
        TableSpec::new("posts_tags")
            .column(ColumnSpec::increments("id"))
            .column(
                ColumnSpec::integer("post_id")
                    .unsigned()
                    .references("posts", "id"),
            )
            .column(
                ColumnSpec::integer("tag_id")
                    .unsigned()
                    .references("tags", "id"),
            )
            .unique_together(&["post_id", "tag_id"]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(name: &str) -> TableSpec {
        TableSpec::new(name).column(ColumnSpec::increments("id"))
    }

    #[test]
    fn blog_catalog_is_valid_and_ordered() {
        let catalog = blog_catalog().expect("built-in catalog should validate");
        let names: Vec<&str> = catalog.tables().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            ["users", "categories", "posts", "tags", "posts_tags"]
        );

        let posts = catalog.table("posts").unwrap();
        assert_eq!(posts.columns.len(), 8);
        assert_eq!(posts.primary_column().unwrap().name, "id");
        let updated_at = posts.column_named("updated_at").unwrap();
        assert!(updated_at.nullable);
        let category = posts.column_named("category_id").unwrap();
        assert_eq!(
            category.references,
            Some(ForeignRef {
                table: "categories".into(),
                column: "id".into()
            })
        );
    }

    #[test]
    fn increments_is_primary_by_default() {
        let id = ColumnSpec::increments("id");
        assert!(id.primary);
        assert!(id.is_primary());
        assert!(!id.nullable);
    }

    #[test]
    fn rejects_missing_primary() {
        let err = SchemaCatalog::new(vec![
            TableSpec::new("t").column(ColumnSpec::string("name"))
        ])
        .unwrap_err();
        assert_eq!(err, SchemaError::MissingPrimary { table: "t".into() });
    }

    #[test]
    fn rejects_second_primary() {
        let err = SchemaCatalog::new(vec![
            minimal("t").column(ColumnSpec::integer("other").primary())
        ])
        .unwrap_err();
        assert_eq!(err, SchemaError::MultiplePrimary { table: "t".into() });
    }

    #[test]
    fn rejects_primary_that_is_not_increments() {
        let err = SchemaCatalog::new(vec![
            TableSpec::new("t").column(ColumnSpec::string("code").primary())
        ])
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::PrimaryNotIncrements {
                table: "t".into(),
                column: "code".into()
            }
        );
    }

    #[test]
    fn rejects_reference_to_unknown_table() {
        let err = SchemaCatalog::new(vec![
            minimal("posts").column(ColumnSpec::integer("user_id").references("users", "id"))
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnknownReferenceTable { ref referenced, .. } if referenced == "users"
        ));
    }

    #[test]
    fn rejects_reference_to_unknown_column() {
        let err = SchemaCatalog::new(vec![
            minimal("users"),
            minimal("posts").column(ColumnSpec::integer("user_id").references("users", "uid")),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownReferenceColumn { .. }));
    }

    #[test]
    fn rejects_reference_to_non_unique_column() {
        let err = SchemaCatalog::new(vec![
            minimal("users").column(ColumnSpec::string("name")),
            minimal("posts").column(ColumnSpec::string("author").references("users", "name")),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::ReferenceNotUnique {
                table: "posts".into(),
                column: "author".into(),
                referenced: "users".into(),
                referenced_column: "name".into(),
            }
        );
    }

    #[test]
    fn accepts_reference_to_unique_column() {
        let catalog = SchemaCatalog::new(vec![
            minimal("users").column(ColumnSpec::string("email").unique()),
            minimal("posts").column(ColumnSpec::string("author").references("users", "email")),
        ]);
        assert!(catalog.is_ok());
    }

    #[test]
    fn rejects_duplicates() {
        let err = SchemaCatalog::new(vec![minimal("a"), minimal("a")]).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateTable { table: "a".into() });

        let err = SchemaCatalog::new(vec![minimal("a")
            .column(ColumnSpec::string("x"))
            .column(ColumnSpec::string("x"))])
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateColumn { .. }));
    }

    #[test]
    fn rejects_unknown_unique_column() {
        let err = SchemaCatalog::new(vec![minimal("t").unique_together(&["id", "nope"])])
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownUniqueColumn {
                table: "t".into(),
                column: "nope".into()
            }
        );
    }

    #[test]
    fn references_are_not_checked_for_order() {
        // Out-of-order catalogs validate; the migration engine rejects them.
        let catalog = SchemaCatalog::new(vec![
            minimal("posts").column(ColumnSpec::integer("user_id").references("users", "id")),
            minimal("users"),
        ]);
        assert!(catalog.is_ok());
    }
}
