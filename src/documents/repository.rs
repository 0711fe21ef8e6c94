use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Text};
use diesel::sqlite::SqliteConnection;

use crate::models::{Document, NewDocument};
use crate::schema::{document_tags, documents};

pub fn insert_document(
    conn: &mut SqliteConnection,
    new_document: &NewDocument,
) -> QueryResult<Document> {
    diesel::insert_into(documents::table)
        .values(new_document)
        .execute(conn)?;
    documents::table.find(&new_document.id).first(conn)
}

pub fn find_document(
    conn: &mut SqliteConnection,
    organization_id: &str,
    document_id: &str,
) -> QueryResult<Option<Document>> {
    documents::table
        .filter(documents::id.eq(document_id))
        .filter(documents::organization_id.eq(organization_id))
        .first(conn)
        .optional()
}

/// Active documents, newest first, optionally narrowed to one tag.
pub fn list_active_documents(
    conn: &mut SqliteConnection,
    organization_id: &str,
    tag_id: Option<&str>,
    page: i64,
    page_size: i64,
) -> QueryResult<Vec<Document>> {
    let mut query = documents::table
        .filter(documents::organization_id.eq(organization_id))
        .filter(documents::is_deleted.eq(false))
        .into_boxed();

    if let Some(tag_id) = tag_id {
        let tagged = document_tags::table
            .filter(document_tags::tag_id.eq(tag_id.to_string()))
            .select(document_tags::document_id);
        query = query.filter(documents::id.eq_any(tagged));
    }

    query
        .order(documents::created_at.desc())
        .limit(page_size)
        .offset(page * page_size)
        .load(conn)
}

pub fn count_active_documents(
    conn: &mut SqliteConnection,
    organization_id: &str,
    tag_id: Option<&str>,
) -> QueryResult<i64> {
    let mut query = documents::table
        .filter(documents::organization_id.eq(organization_id))
        .filter(documents::is_deleted.eq(false))
        .into_boxed();

    if let Some(tag_id) = tag_id {
        let tagged = document_tags::table
            .filter(document_tags::tag_id.eq(tag_id.to_string()))
            .select(document_tags::document_id);
        query = query.filter(documents::id.eq_any(tagged));
    }

    query.count().get_result(conn)
}

/// Soft-deleted documents, most recently deleted first.
pub fn list_deleted_documents(
    conn: &mut SqliteConnection,
    organization_id: &str,
    page: i64,
    page_size: i64,
) -> QueryResult<Vec<Document>> {
    documents::table
        .filter(documents::organization_id.eq(organization_id))
        .filter(documents::is_deleted.eq(true))
        .order(documents::deleted_at.desc())
        .limit(page_size)
        .offset(page * page_size)
        .load(conn)
}

/// Turns raw user input into an FTS5 match expression. Quote and wildcard
/// characters are stripped; a single word becomes a prefix query, several
/// words become a phrase query.
pub fn normalize_search_query(raw: &str) -> Option<String> {
    let sanitized: String = raw.chars().filter(|ch| *ch != '"' && *ch != '*').collect();
    let sanitized = sanitized.split_whitespace().collect::<Vec<_>>().join(" ");
    if sanitized.is_empty() {
        return None;
    }
    if sanitized.contains(' ') {
        Some(format!("\"{sanitized}\""))
    } else {
        Some(format!("\"{sanitized}\"*"))
    }
}

/// Full-text search over the trigger-maintained mirror, ranked by FTS5
/// relevance rather than recency.
pub fn search_documents(
    conn: &mut SqliteConnection,
    organization_id: &str,
    raw_query: &str,
    page: i64,
    page_size: i64,
) -> QueryResult<Vec<Document>> {
    let Some(match_expr) = normalize_search_query(raw_query) else {
        return Ok(Vec::new());
    };

    diesel::sql_query(
        "SELECT d.* FROM documents_fts \
         JOIN documents d ON d.id = documents_fts.document_id \
         WHERE documents_fts MATCH ? AND d.organization_id = ? AND d.is_deleted = ? \
         ORDER BY documents_fts.rank LIMIT ? OFFSET ?",
    )
    .bind::<Text, _>(match_expr)
    .bind::<Text, _>(organization_id)
    .bind::<Bool, _>(false)
    .bind::<BigInt, _>(page_size)
    .bind::<BigInt, _>(page * page_size)
    .load(conn)
}

pub fn mark_document_deleted(
    conn: &mut SqliteConnection,
    document_id: &str,
    deleted_by: &str,
    now: NaiveDateTime,
) -> QueryResult<usize> {
    diesel::update(documents::table.find(document_id))
        .set((
            documents::is_deleted.eq(true),
            documents::deleted_at.eq(Some(now)),
            documents::deleted_by.eq(Some(deleted_by.to_string())),
            documents::updated_at.eq(now),
        ))
        .execute(conn)
}

pub fn clear_deletion_markers(
    conn: &mut SqliteConnection,
    document_id: &str,
    now: NaiveDateTime,
) -> QueryResult<usize> {
    diesel::update(documents::table.find(document_id))
        .set((
            documents::is_deleted.eq(false),
            documents::deleted_at.eq(None::<NaiveDateTime>),
            documents::deleted_by.eq(None::<String>),
            documents::updated_at.eq(now),
        ))
        .execute(conn)
}

pub fn delete_document_row(conn: &mut SqliteConnection, document_id: &str) -> QueryResult<usize> {
    diesel::delete(documents::table.find(document_id)).execute(conn)
}

/// Soft-deleted documents whose retention window elapsed before `cutoff`,
/// across all organizations.
pub fn find_expired_documents(
    conn: &mut SqliteConnection,
    cutoff: NaiveDateTime,
) -> QueryResult<Vec<Document>> {
    documents::table
        .filter(documents::is_deleted.eq(true))
        .filter(documents::deleted_at.lt(cutoff))
        .order(documents::deleted_at.asc())
        .load(conn)
}
