//! Blog posts.

use crate::categories::{get_category, Category};
use crate::tags::{attach_tags, get_tag_by_slug, resolve_tags, slugify, tags_for_post, Tag};
use crate::{delete_row, update_row, ContentError};
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, types::ToSql, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

const POST_COLUMNS: &str = "id, user_id, category_id, title, slug, html, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    /// Author.
    pub user_id: i64,
    pub category_id: i64,
    pub title: String,
    /// Derived from the title; unique across posts.
    pub slug: String,
    pub html: String,
    /// Creation timestamp (RFC 3339, UTC).
    pub created_at: String,
    /// Last modification timestamp (RFC 3339, UTC).
    pub updated_at: Option<String>,
}

/// A post together with its category and tags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub category: Category,
    pub tags: Vec<Tag>,
}

/// Parameters for creating a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub user_id: i64,
    pub category_id: i64,
    pub title: String,
    pub html: String,
}

/// Fields to change on an existing post; `None` leaves a field untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PostChanges {
    pub category_id: Option<i64>,
    pub title: Option<String>,
    pub html: Option<String>,
}

/// Result of [`publish_post`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishedPost {
    pub post_id: i64,
    pub tag_ids: Vec<i64>,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Inserts a post and returns its id. The slug is derived from the title and
/// both timestamps are set to now.
///
/// An unknown author or category surfaces as a foreign-key violation.
pub fn create_post(conn: &Connection, post: &NewPost) -> Result<i64, ContentError> {
    let timestamp = now();
    conn.execute(
        "INSERT INTO posts (user_id, category_id, title, slug, html, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            post.user_id,
            post.category_id,
            post.title,
            slugify(&post.title),
            post.html,
            timestamp,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Creates a post and links it to its tags.
///
/// The three steps run in order (insert the post, resolve tag names, attach
/// the resolved tags) inside one transaction, so a failure at any step leaves
/// neither the post nor its new tags behind.
pub fn publish_post(
    conn: &Connection,
    post: &NewPost,
    tag_names: &[String],
) -> Result<PublishedPost, ContentError> {
    let tx = conn.unchecked_transaction()?;

    let post_id = create_post(&tx, post)?;
    let tag_ids = resolve_tags(&tx, tag_names)?;
    attach_tags(&tx, post_id, &tag_ids)?;

    tx.commit()?;

    tracing::info!(post_id, tags = tag_ids.len(), "published post");
    Ok(PublishedPost { post_id, tag_ids })
}

pub fn get_post(conn: &Connection, id: i64) -> Result<Post, ContentError> {
    conn.query_row(
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
        [id],
        map_row_to_post,
    )
    .optional()?
    .ok_or_else(|| ContentError::not_found("post", id))
}

/// Fetches a post with its category and tags.
pub fn get_post_detail(conn: &Connection, id: i64) -> Result<PostDetail, ContentError> {
    let post = get_post(conn, id)?;
    let category = get_category(conn, post.category_id)?;
    let tags = tags_for_post(conn, post.id)?;
    Ok(PostDetail {
        post,
        category,
        tags,
    })
}

pub fn list_posts(conn: &Connection) -> Result<Vec<Post>, ContentError> {
    query_posts(
        conn,
        &format!("SELECT {POST_COLUMNS} FROM posts ORDER BY id ASC"),
        &[],
    )
}

/// Posts in a category. Fails with `NotFound` if the category does not exist.
pub fn list_posts_by_category(
    conn: &Connection,
    category_id: i64,
) -> Result<Vec<Post>, ContentError> {
    get_category(conn, category_id)?;
    query_posts(
        conn,
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE category_id = ?1 ORDER BY id ASC"),
        &[&category_id],
    )
}

/// Posts carrying a tag. Fails with `NotFound` if no tag has this slug.
pub fn list_posts_by_tag(conn: &Connection, slug: &str) -> Result<Vec<Post>, ContentError> {
    let tag = get_tag_by_slug(conn, slug)?;
    query_posts(
        conn,
        "SELECT p.id, p.user_id, p.category_id, p.title, p.slug, p.html, p.created_at, p.updated_at
         FROM posts p JOIN posts_tags pt ON pt.post_id = p.id
         WHERE pt.tag_id = ?1
         ORDER BY p.id ASC",
        &[&tag.id],
    )
}

/// Applies a partial update. A new title also re-derives the slug; every
/// update bumps `updated_at`.
pub fn update_post(conn: &Connection, id: i64, changes: &PostChanges) -> Result<(), ContentError> {
    let mut fields: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
    if let Some(category_id) = changes.category_id {
        fields.push(("category_id", Box::new(category_id)));
    }
    if let Some(title) = &changes.title {
        fields.push(("title", Box::new(title.clone())));
        fields.push(("slug", Box::new(slugify(title))));
    }
    if let Some(html) = &changes.html {
        fields.push(("html", Box::new(html.clone())));
    }
    if !fields.is_empty() {
        fields.push(("updated_at", Box::new(now())));
    }
    update_row(conn, "posts", "post", id, fields)
}

/// Deletes a post and its tag links. Tags themselves are kept.
pub fn delete_post(conn: &Connection, id: i64) -> Result<(), ContentError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM posts_tags WHERE post_id = ?1", [id])?;
    delete_row(&tx, "posts", "post", id)?;
    tx.commit()?;
    Ok(())
}

fn query_posts(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<Post>, ContentError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map_row_to_post)?;
    let mut posts = Vec::new();
    for row in rows {
        posts.push(row?);
    }
    Ok(posts)
}

fn map_row_to_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        title: row.get(3)?,
        slug: row.get(4)?,
        html: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{migrated_conn, seed_author};

    fn new_post(user_id: i64, category_id: i64, title: &str) -> NewPost {
        NewPost {
            user_id,
            category_id,
            title: title.into(),
            html: "<p>body</p>".into(),
        }
    }

    fn tag_names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn create_derives_slug_and_timestamps() {
        let conn = migrated_conn();
        let (user_id, category_id) = seed_author(&conn);
        let id = create_post(&conn, &new_post(user_id, category_id, "Hello World")).unwrap();

        let post = get_post(&conn, id).unwrap();
        assert_eq!(post.slug, "hello-world");
        assert!(post.created_at.ends_with('Z'));
        assert_eq!(post.updated_at.as_deref(), Some(post.created_at.as_str()));
    }

    #[test]
    fn unknown_category_is_a_constraint_violation() {
        let conn = migrated_conn();
        let (user_id, _) = seed_author(&conn);
        let err = create_post(&conn, &new_post(user_id, 404, "Orphan")).unwrap_err();
        assert!(err.is_constraint_violation(), "got {err:?}");
        assert!(list_posts(&conn).unwrap().is_empty());
    }

    #[test]
    fn publish_links_resolved_tags() {
        let conn = migrated_conn();
        let (user_id, category_id) = seed_author(&conn);

        let published = publish_post(
            &conn,
            &new_post(user_id, category_id, "Intro"),
            &tag_names(&["Rust", "SQLite", "rust"]),
        )
        .unwrap();
        assert_eq!(published.tag_ids.len(), 2);

        let detail = get_post_detail(&conn, published.post_id).unwrap();
        assert_eq!(detail.category.name, "General");
        let slugs: Vec<&str> = detail.tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["rust", "sqlite"]);

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["title"], "Intro");
        assert_eq!(json["category"]["name"], "General");
        assert_eq!(json["tags"][1]["name"], "SQLite");
    }

    #[test]
    fn publish_without_tags_uses_default() {
        let conn = migrated_conn();
        let (user_id, category_id) = seed_author(&conn);
        let published =
            publish_post(&conn, &new_post(user_id, category_id, "Untagged"), &[]).unwrap();
        let tags = tags_for_post(&conn, published.post_id).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].slug, crate::DEFAULT_TAG);
    }

    #[test]
    fn failed_publish_leaves_nothing_behind() {
        let conn = migrated_conn();
        let (user_id, category_id) = seed_author(&conn);
        publish_post(&conn, &new_post(user_id, category_id, "Same"), &tag_names(&["a"])).unwrap();

        // Duplicate post slug fails at the first step.
        let err = publish_post(&conn, &new_post(user_id, category_id, "same"), &tag_names(&["b"]))
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(list_posts(&conn).unwrap().len(), 1);
        assert!(get_tag_by_slug(&conn, "b").is_err());
    }

    #[test]
    fn listing_by_category_and_tag() {
        let conn = migrated_conn();
        let (user_id, category_id) = seed_author(&conn);
        let first = publish_post(
            &conn,
            &new_post(user_id, category_id, "One"),
            &tag_names(&["rust"]),
        )
        .unwrap();
        publish_post(
            &conn,
            &new_post(user_id, category_id, "Two"),
            &tag_names(&["go"]),
        )
        .unwrap();

        assert_eq!(list_posts_by_category(&conn, category_id).unwrap().len(), 2);
        let tagged = list_posts_by_tag(&conn, "rust").unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].id, first.post_id);

        assert!(matches!(
            list_posts_by_category(&conn, 999),
            Err(ContentError::NotFound {
                entity: "category",
                ..
            })
        ));
        assert!(matches!(
            list_posts_by_tag(&conn, "missing"),
            Err(ContentError::NotFound { entity: "tag", .. })
        ));
    }

    #[test]
    fn update_rederives_slug() {
        let conn = migrated_conn();
        let (user_id, category_id) = seed_author(&conn);
        let id = create_post(&conn, &new_post(user_id, category_id, "Draft")).unwrap();

        update_post(
            &conn,
            id,
            &PostChanges {
                title: Some("Final Cut".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let post = get_post(&conn, id).unwrap();
        assert_eq!(post.title, "Final Cut");
        assert_eq!(post.slug, "final-cut");
        assert_eq!(post.html, "<p>body</p>");
    }

    #[test]
    fn delete_removes_links_but_keeps_tags() {
        let conn = migrated_conn();
        let (user_id, category_id) = seed_author(&conn);
        let published = publish_post(
            &conn,
            &new_post(user_id, category_id, "Gone"),
            &tag_names(&["rust"]),
        )
        .unwrap();

        delete_post(&conn, published.post_id).unwrap();
        assert!(matches!(
            get_post(&conn, published.post_id),
            Err(ContentError::NotFound { .. })
        ));
        assert!(get_tag_by_slug(&conn, "rust").is_ok());
        assert!(matches!(
            delete_post(&conn, published.post_id),
            Err(ContentError::NotFound { .. })
        ));
    }
}
