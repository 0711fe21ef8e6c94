use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::AuthenticatedUser;
use crate::documents::repository;
use crate::documents::service::{self, NewUpload};
use crate::error::{AppError, AppResult};
use crate::models::{Document, Tag};
use crate::organizations::ensure_member;
use crate::state::AppState;
use crate::tagging::engine::apply_tagging_rules;
use crate::tagging::repository as tag_repository;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Deserialize)]
pub struct DocumentListQuery {
    #[serde(default)]
    pub page: i64,
    pub page_size: Option<i64>,
    pub tag_id: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default)]
    pub page: i64,
    pub page_size: Option<i64>,
}

#[derive(Serialize)]
pub struct TagResponse {
    pub id: String,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub created_by: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub tags: Vec<TagResponse>,
}

#[derive(Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentResponse>,
    pub total: i64,
}

fn to_tag_response(tag: Tag) -> TagResponse {
    TagResponse {
        id: tag.id,
        name: tag.name,
        color: tag.color,
        description: tag.description,
    }
}

fn to_document_response(document: Document, tags: Vec<Tag>) -> DocumentResponse {
    DocumentResponse {
        id: document.id,
        organization_id: document.organization_id,
        name: document.name,
        original_name: document.original_name,
        mime_type: document.mime_type,
        size: document.size,
        created_by: document.created_by,
        is_deleted: document.is_deleted,
        deleted_at: document.deleted_at,
        created_at: document.created_at,
        updated_at: document.updated_at,
        tags: tags.into_iter().map(to_tag_response).collect(),
    }
}

fn with_tags(
    conn: &mut crate::state::SqlitePooledConnection,
    documents: Vec<Document>,
) -> AppResult<Vec<DocumentResponse>> {
    let ids: Vec<String> = documents.iter().map(|doc| doc.id.clone()).collect();
    let mut tags_map = tag_repository::tags_for_documents(conn, &ids)?;
    Ok(documents
        .into_iter()
        .map(|doc| {
            let tags = tags_map.remove(&doc.id).unwrap_or_default();
            to_document_response(doc, tags)
        })
        .collect())
}

fn clamp_page_size(page_size: Option<i64>) -> i64 {
    page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE)
}

fn inline_content_disposition(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();
    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

pub async fn upload_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(organization_id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    {
        let mut conn = state.db()?;
        ensure_member(&mut conn, &organization_id, &user.user_id)?;
    }

    let mut file_bytes = None;
    let mut original_name = None;
    let mut content_type = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        if field.name() == Some("file") {
            original_name = field.file_name().map(|name| name.to_string());
            content_type = field.content_type().map(|mime| mime.to_string());
            let data = field.bytes().await.map_err(|err| {
                error!(error = %err, "failed to read file bytes");
                AppError::bad_request(format!("failed to read file bytes: {err}"))
            })?;
            file_bytes = Some(data);
        }
    }

    let bytes = file_bytes.ok_or_else(|| AppError::bad_request("file field is required"))?;
    if bytes.is_empty() {
        return Err(AppError::bad_request("file field must not be empty"));
    }
    let original_name =
        original_name.ok_or_else(|| AppError::bad_request("filename is required"))?;

    let document = service::create_document(
        &state,
        NewUpload {
            organization_id,
            original_name,
            mime_type: content_type,
            bytes,
            created_by: Some(user.user_id),
        },
    )
    .await?;

    let mut conn = state.db()?;
    apply_tagging_rules(&mut conn, &document)?;
    let mut responses = with_tags(&mut conn, vec![document])?;
    let response = responses
        .pop()
        .ok_or_else(|| AppError::internal("document vanished after creation"))?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(organization_id): Path<String>,
    Query(query): Query<DocumentListQuery>,
) -> AppResult<Json<DocumentListResponse>> {
    let page = query.page.max(0);
    let page_size = clamp_page_size(query.page_size);

    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    let documents = repository::list_active_documents(
        &mut conn,
        &organization_id,
        query.tag_id.as_deref(),
        page,
        page_size,
    )?;
    let total =
        repository::count_active_documents(&mut conn, &organization_id, query.tag_id.as_deref())?;
    let documents = with_tags(&mut conn, documents)?;

    Ok(Json(DocumentListResponse { documents, total }))
}

pub async fn list_deleted_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(organization_id): Path<String>,
    Query(query): Query<DocumentListQuery>,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    let page = query.page.max(0);
    let page_size = clamp_page_size(query.page_size);

    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    let documents =
        repository::list_deleted_documents(&mut conn, &organization_id, page, page_size)?;
    let documents = with_tags(&mut conn, documents)?;
    Ok(Json(documents))
}

pub async fn search_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(organization_id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    let page = query.page.max(0);
    let page_size = clamp_page_size(query.page_size);

    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    let documents =
        repository::search_documents(&mut conn, &organization_id, &query.query, page, page_size)?;
    let documents = with_tags(&mut conn, documents)?;
    Ok(Json(documents))
}

pub async fn get_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((organization_id, document_id)): Path<(String, String)>,
) -> AppResult<Json<DocumentResponse>> {
    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    let document = repository::find_document(&mut conn, &organization_id, &document_id)?
        .ok_or_else(|| AppError::not_found("document.not_found", "document not found"))?;
    let mut responses = with_tags(&mut conn, vec![document])?;
    let response = responses
        .pop()
        .ok_or_else(|| AppError::not_found("document.not_found", "document not found"))?;
    Ok(Json(response))
}

/// Streams the original file back without buffering it in memory.
pub async fn download_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((organization_id, document_id)): Path<(String, String)>,
) -> AppResult<Response> {
    let document = {
        let mut conn = state.db()?;
        ensure_member(&mut conn, &organization_id, &user.user_id)?;
        repository::find_document(&mut conn, &organization_id, &document_id)?
            .filter(|doc| !doc.is_deleted)
            .ok_or_else(|| AppError::not_found("document.not_found", "document not found"))?
    };

    let stream = state.storage.get_file_stream(&document.storage_key).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &document.mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            inline_content_disposition(&document.original_name),
        )
        .header(header::CONTENT_LENGTH, document.size)
        .body(Body::from_stream(stream))
        .map_err(AppError::internal)?;
    Ok(response)
}

pub async fn delete_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((organization_id, document_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    {
        let mut conn = state.db()?;
        ensure_member(&mut conn, &organization_id, &user.user_id)?;
    }
    service::soft_delete_document(&state, &organization_id, &document_id, &user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((organization_id, document_id)): Path<(String, String)>,
) -> AppResult<Json<DocumentResponse>> {
    {
        let mut conn = state.db()?;
        ensure_member(&mut conn, &organization_id, &user.user_id)?;
    }
    let document = service::restore_document(&state, &organization_id, &document_id).await?;

    let mut conn = state.db()?;
    let mut responses = with_tags(&mut conn, vec![document])?;
    let response = responses
        .pop()
        .ok_or_else(|| AppError::not_found("document.not_found", "document not found"))?;
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct AssignTagRequest {
    pub tag_id: String,
}

pub async fn assign_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((organization_id, document_id)): Path<(String, String)>,
    Json(payload): Json<AssignTagRequest>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    repository::find_document(&mut conn, &organization_id, &document_id)?
        .filter(|doc| !doc.is_deleted)
        .ok_or_else(|| AppError::not_found("document.not_found", "document not found"))?;
    tag_repository::find_tag(&mut conn, &organization_id, &payload.tag_id)?
        .ok_or_else(|| AppError::not_found("tag.not_found", "tag not found"))?;

    match tag_repository::add_tag_to_document(
        &mut conn,
        &document_id,
        &payload.tag_id,
        chrono::Utc::now().naive_utc(),
    ) {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => Err(AppError::conflict(
            "tag.already_on_document",
            "tag is already assigned to this document",
        )),
        Err(err) => Err(AppError::from(err)),
    }
}

pub async fn remove_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((organization_id, document_id, tag_id)): Path<(String, String, String)>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    repository::find_document(&mut conn, &organization_id, &document_id)?
        .ok_or_else(|| AppError::not_found("document.not_found", "document not found"))?;

    tag_repository::remove_tag_from_document(&mut conn, &document_id, &tag_id)?;
    Ok(StatusCode::NO_CONTENT)
}
