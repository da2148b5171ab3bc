//! Post categories.

use crate::{delete_row, update_row, ContentError};
use rusqlite::{types::ToSql, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
}

/// Creates a category and returns its id.
pub fn create_category(conn: &Connection, category: &NewCategory) -> Result<i64, ContentError> {
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [&category.name])?;
    Ok(conn.last_insert_rowid())
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Category, ContentError> {
    conn.query_row(
        "SELECT id, name FROM categories WHERE id = ?1",
        [id],
        map_row_to_category,
    )
    .optional()?
    .ok_or_else(|| ContentError::not_found("category", id))
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>, ContentError> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id ASC")?;
    let rows = stmt.query_map([], map_row_to_category)?;
    let mut categories = Vec::new();
    for row in rows {
        categories.push(row?);
    }
    Ok(categories)
}

pub fn update_category(
    conn: &Connection,
    id: i64,
    changes: &CategoryChanges,
) -> Result<(), ContentError> {
    let mut fields: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
    if let Some(name) = &changes.name {
        fields.push(("name", Box::new(name.clone())));
    }
    update_row(conn, "categories", "category", id, fields)
}

pub fn delete_category(conn: &Connection, id: i64) -> Result<(), ContentError> {
    delete_row(conn, "categories", "category", id)
}

fn map_row_to_category(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}
