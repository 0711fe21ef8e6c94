use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::ids::{generate_id, TAG_ID_PREFIX};
use crate::models::NewTag;
use crate::organizations::ensure_member;
use crate::state::AppState;
use crate::tagging::repository;

const DEFAULT_TAG_COLOR: &str = "#cbd5e1";

#[derive(Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct TagCatalogEntry {
    pub id: String,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub usage_count: i64,
}

pub async fn list_tags(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(organization_id): Path<String>,
) -> AppResult<Json<Vec<TagCatalogEntry>>> {
    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    let tags = repository::list_tags(&mut conn, &organization_id)?;
    let usage = repository::tag_usage_counts(&mut conn, &organization_id)?;

    let response = tags
        .into_iter()
        .map(|tag| {
            let usage_count = usage.get(&tag.id).copied().unwrap_or(0);
            TagCatalogEntry {
                id: tag.id,
                name: tag.name,
                color: tag.color,
                description: tag.description,
                usage_count,
            }
        })
        .collect();
    Ok(Json(response))
}

pub async fn create_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(organization_id): Path<String>,
    Json(payload): Json<CreateTagRequest>,
) -> AppResult<(StatusCode, Json<TagCatalogEntry>)> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("tag name must not be empty"));
    }

    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    let now = Utc::now().naive_utc();
    let new_tag = NewTag {
        id: generate_id(TAG_ID_PREFIX),
        organization_id,
        name: name.to_string(),
        color: payload
            .color
            .unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string()),
        description: payload.description,
        created_at: now,
        updated_at: now,
    };

    let tag = match repository::insert_tag(&mut conn, &new_tag) {
        Ok(tag) => tag,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::conflict(
                "tag.already_exists",
                "a tag with this name already exists",
            ))
        }
        Err(err) => return Err(AppError::from(err)),
    };

    Ok((
        StatusCode::CREATED,
        Json(TagCatalogEntry {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            description: tag.description,
            usage_count: 0,
        }),
    ))
}
