//! Tag resolution and post/tag linking.
//!
//! A tag is identified by its slug: the display name lowercased with every
//! space replaced by a hyphen. Resolving a list of names works in two
//! phases:
//!
//! 1. [`plan_tags`] normalizes the names, derives slugs, and looks up all of
//!    them in a single query, splitting the request into tags that already
//!    exist and tags that must be created.
//! 2. [`TagPlan::apply`] inserts the missing tags and returns the ids of the
//!    whole set.
//!
//! Nothing is locked between the two phases. If two requests race to create
//! the same new slug, the UNIQUE constraint on `tags.slug` rejects the
//! second insert and that error is returned as is.

use crate::ContentError;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tag used when a post is created without any tags.
pub const DEFAULT_TAG: &str = "uncategorised";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// A normalized tag name with its slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRequest {
    pub slug: String,
    pub name: String,
}

/// Requested tags split by whether they already exist.
#[derive(Debug, Clone, PartialEq)]
pub struct TagPlan {
    pub existing: Vec<Tag>,
    pub missing: Vec<TagRequest>,
}

/// Derives a tag slug: lowercase, spaces become hyphens.
///
/// Only spaces are replaced; other characters pass through, so `"Node.js"`
/// becomes `"node.js"`.
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// Splits comma-separated tag text into trimmed, non-empty names.
pub fn parse_tag_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Trims names, drops empty ones, and keeps one request per slug (the first
/// spelling wins). An empty result is replaced by [`DEFAULT_TAG`].
pub fn normalize_tag_names(names: &[String]) -> Vec<TagRequest> {
    let mut seen = HashSet::new();
    let mut requests: Vec<TagRequest> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .filter_map(|name| {
            let slug = slugify(name);
            seen.insert(slug.clone()).then(|| TagRequest {
                slug,
                name: name.to_string(),
            })
        })
        .collect();

    if requests.is_empty() {
        requests.push(TagRequest {
            slug: slugify(DEFAULT_TAG),
            name: DEFAULT_TAG.to_string(),
        });
    }
    requests
}

/// Looks up the requested slugs with one batched query per
/// `SLUG_LOOKUP_CHUNK` slugs and splits the request into existing and missing
/// tags.
pub fn plan_tags(conn: &Connection, names: &[String]) -> Result<TagPlan, ContentError> {
    let requests = normalize_tag_names(names);
    let slugs: Vec<&str> = requests.iter().map(|r| r.slug.as_str()).collect();
    let existing = find_tags_by_slugs(conn, &slugs)?;

    let found: HashSet<&str> = existing.iter().map(|t| t.slug.as_str()).collect();
    let missing = requests
        .iter()
        .filter(|r| !found.contains(r.slug.as_str()))
        .cloned()
        .collect();

    tracing::debug!(
        requested = requests.len(),
        existing = existing.len(),
        "planned tag resolution"
    );

    Ok(TagPlan { existing, missing })
}

impl TagPlan {
    /// Creates the missing tags and returns the ids of every requested tag,
    /// existing ones first, each id at most once.
    ///
    /// Stops at the first failed insert; tags inserted before it remain.
    pub fn apply(self, conn: &Connection) -> Result<Vec<i64>, ContentError> {
        let mut stmt = conn.prepare("INSERT INTO tags (slug, name) VALUES (?1, ?2)")?;

        let mut seen = HashSet::new();
        let mut ids: Vec<i64> = self
            .existing
            .iter()
            .map(|t| t.id)
            .filter(|id| seen.insert(*id))
            .collect();

        for request in &self.missing {
            let id = stmt.insert(params![request.slug, request.name])?;
            tracing::debug!(tag_id = id, slug = request.slug.as_str(), "created tag");
            if seen.insert(id) {
                ids.push(id);
            }
        }

        Ok(ids)
    }
}

/// Resolves tag names to tag ids, creating tags that do not exist yet.
///
/// The returned ids are distinct and there is one per distinct slug in the
/// input; an empty input resolves [`DEFAULT_TAG`].
pub fn resolve_tags(conn: &Connection, names: &[String]) -> Result<Vec<i64>, ContentError> {
    plan_tags(conn, names)?.apply(conn)
}

/// Upper bound on bound parameters per lookup; SQLite builds before 3.32
/// cap a statement at 999.
const SLUG_LOOKUP_CHUNK: usize = 500;

fn find_tags_by_slugs(conn: &Connection, slugs: &[&str]) -> Result<Vec<Tag>, ContentError> {
    let mut tags = Vec::new();

    for chunk in slugs.chunks(SLUG_LOOKUP_CHUNK) {
        let placeholders: Vec<String> = (1..=chunk.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT id, slug, name FROM tags WHERE slug IN ({})",
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), map_row_to_tag)?;
        for row in rows {
            tags.push(row?);
        }
    }

    tags.sort_by_key(|t| t.id);
    Ok(tags)
}

pub fn get_tag_by_slug(conn: &Connection, slug: &str) -> Result<Tag, ContentError> {
    conn.query_row(
        "SELECT id, slug, name FROM tags WHERE slug = ?1",
        [slug],
        map_row_to_tag,
    )
    .optional()?
    .ok_or_else(|| ContentError::not_found("tag", slug))
}

/// Links a post to each tag that it is not already linked to.
///
/// Existing links are kept. Returns the number of links added.
pub fn attach_tags(conn: &Connection, post_id: i64, tag_ids: &[i64]) -> Result<usize, ContentError> {
    let mut stmt =
        conn.prepare("INSERT OR IGNORE INTO posts_tags (post_id, tag_id) VALUES (?1, ?2)")?;
    let mut added = 0;
    for tag_id in tag_ids {
        added += stmt.execute([post_id, *tag_id])?;
    }
    tracing::debug!(post_id, requested = tag_ids.len(), added, "attached tags");
    Ok(added)
}

/// Tags linked to a post, ordered by tag id.
pub fn tags_for_post(conn: &Connection, post_id: i64) -> Result<Vec<Tag>, ContentError> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.slug, t.name
         FROM tags t JOIN posts_tags pt ON pt.tag_id = t.id
         WHERE pt.post_id = ?1
         ORDER BY t.id ASC",
    )?;
    let rows = stmt.query_map([post_id], map_row_to_tag)?;
    let mut tags = Vec::new();
    for row in rows {
        tags.push(row?);
    }
    Ok(tags)
}

fn map_row_to_tag(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
    })
}
