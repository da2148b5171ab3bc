//! Blog content for Quire: users, categories, posts and tags.
//!
//! Every operation takes a `rusqlite::Connection` and runs synchronously;
//! callers on an async runtime are expected to hop onto a blocking thread.
//! The tables themselves are created by `quire_db::create_all_tables`.
//!
//! The interesting part is [`tags`]: turning a free-text list of tag names
//! into tag rows (reusing existing ones, creating the rest) and linking them
//! to a post. [`posts::publish_post`] strings post creation, tag resolution
//! and attachment together.

pub mod categories;
pub mod posts;
pub mod tags;
pub mod users;

pub use categories::{
    create_category, delete_category, get_category, list_categories, update_category, Category,
    CategoryChanges, NewCategory,
};
pub use posts::{
    create_post, delete_post, get_post, get_post_detail, list_posts, list_posts_by_category,
    list_posts_by_tag, publish_post, update_post, NewPost, Post, PostChanges, PostDetail,
    PublishedPost,
};
pub use tags::{
    attach_tags, get_tag_by_slug, normalize_tag_names, parse_tag_list, plan_tags, resolve_tags,
    slugify, tags_for_post, Tag, TagPlan, TagRequest, DEFAULT_TAG,
};
pub use users::{create_user, delete_user, get_user, list_users, update_user, NewUser, User, UserChanges};

use rusqlite::{types::ToSql, Connection};
use thiserror::Error;

/// Errors that can occur during content operations.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Any failure reported by the store, including constraint violations.
    #[error("database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// The requested row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl ContentError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ContentError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether the store rejected a write because of a UNIQUE, NOT NULL,
    /// CHECK or FOREIGN KEY constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            ContentError::Persistence(rusqlite::Error::SqliteFailure(code, _))
                if code.code == rusqlite::ffi::ErrorCode::ConstraintViolation
        )
    }
}

/// Applies a partial update to one row with a single UPDATE statement.
///
/// With no fields to change, only checks that the row exists.
pub(crate) fn update_row(
    conn: &Connection,
    table: &str,
    entity: &'static str,
    id: i64,
    fields: Vec<(&'static str, Box<dyn ToSql>)>,
) -> Result<(), ContentError> {
    if fields.is_empty() {
        let exists: bool = conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
            [id],
            |row| row.get(0),
        )?;
        return if exists {
            Ok(())
        } else {
            Err(ContentError::not_found(entity, id))
        };
    }

    let set_parts: Vec<String> = fields
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
        .collect();
    let sql = format!(
        "UPDATE {table} SET {} WHERE id = ?{}",
        set_parts.join(", "),
        fields.len() + 1
    );

    let mut values: Vec<&dyn ToSql> = fields.iter().map(|(_, v)| v.as_ref()).collect();
    values.push(&id);

    let count = conn.execute(&sql, values.as_slice())?;
    if count == 0 {
        return Err(ContentError::not_found(entity, id));
    }
    Ok(())
}

/// Deletes one row by id.
pub(crate) fn delete_row(
    conn: &Connection,
    table: &str,
    entity: &'static str,
    id: i64,
) -> Result<(), ContentError> {
    let count = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
    if count == 0 {
        return Err(ContentError::not_found(entity, id));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use rusqlite::Connection;

    /// An in-memory database with the blog schema and foreign keys on.
    pub fn migrated_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .expect("should enable foreign keys");
        let catalog = quire_db::blog_catalog().expect("catalog should validate");
        quire_db::create_all_tables(&conn, &catalog).expect("migration should succeed");
        conn
    }

    /// Inserts one user and one category, returning their ids.
    pub fn seed_author(conn: &Connection) -> (i64, i64) {
        conn.execute(
            "INSERT INTO users (email, name) VALUES ('ada@example.com', 'Ada')",
            [],
        )
        .expect("should insert user");
        let user_id = conn.last_insert_rowid();
        conn.execute("INSERT INTO categories (name) VALUES ('General')", [])
            .expect("should insert category");
        (user_id, conn.last_insert_rowid())
    }
}
