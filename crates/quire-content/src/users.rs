//! Post authors.

use crate::{delete_row, update_row, ContentError};
use rusqlite::{params, types::ToSql, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// A registered author.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
}

/// Parameters for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Fields to change on an existing user; `None` leaves a field untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Creates a user and returns its id.
pub fn create_user(conn: &Connection, user: &NewUser) -> Result<i64, ContentError> {
    conn.execute(
        "INSERT INTO users (email, name) VALUES (?1, ?2)",
        params![user.email, user.name],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> Result<User, ContentError> {
    conn.query_row(
        "SELECT id, email, name FROM users WHERE id = ?1",
        [id],
        map_row_to_user,
    )
    .optional()?
    .ok_or_else(|| ContentError::not_found("user", id))
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, ContentError> {
    let mut stmt = conn.prepare("SELECT id, email, name FROM users ORDER BY id ASC")?;
    let rows = stmt.query_map([], map_row_to_user)?;
    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

pub fn update_user(conn: &Connection, id: i64, changes: &UserChanges) -> Result<(), ContentError> {
    let mut fields: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
    if let Some(name) = &changes.name {
        fields.push(("name", Box::new(name.clone())));
    }
    if let Some(email) = &changes.email {
        fields.push(("email", Box::new(email.clone())));
    }
    update_row(conn, "users", "user", id, fields)
}

/// Deletes a user. Fails with a constraint violation while the user still
/// authors posts.
pub fn delete_user(conn: &Connection, id: i64) -> Result<(), ContentError> {
    delete_row(conn, "users", "user", id)
}

fn map_row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
    })
}
