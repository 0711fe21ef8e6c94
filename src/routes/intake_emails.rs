use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::ids::{generate_id, INTAKE_EMAIL_ID_PREFIX};
use crate::intake::pipeline::{process_intake_email, EmailAttachment, InboundEmail};
use crate::intake::{self, repository};
use crate::models::{IntakeEmail, NewIntakeEmail};
use crate::organizations::ensure_member;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateIntakeEmailRequest {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Serialize)]
pub struct IntakeEmailResponse {
    pub id: String,
    pub organization_id: String,
    pub email_address: String,
    pub is_enabled: bool,
    pub allowed_origins: Vec<String>,
    pub created_at: NaiveDateTime,
}

fn to_response(intake_email: IntakeEmail) -> IntakeEmailResponse {
    let allowed_origins = intake_email.allowed_origins();
    IntakeEmailResponse {
        id: intake_email.id,
        organization_id: intake_email.organization_id,
        email_address: intake_email.email_address,
        is_enabled: intake_email.is_enabled,
        allowed_origins,
        created_at: intake_email.created_at,
    }
}

fn ensure_feature_enabled(state: &AppState) -> AppResult<()> {
    if !state.config.intake_emails_enabled {
        return Err(AppError::forbidden(
            "intake_emails.disabled",
            "intake emails are disabled on this deployment",
        ));
    }
    Ok(())
}

pub async fn list_intake_emails(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(organization_id): Path<String>,
) -> AppResult<Json<Vec<IntakeEmailResponse>>> {
    ensure_feature_enabled(&state)?;

    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    let intake_emails = repository::list_intake_emails(&mut conn, &organization_id)?;
    Ok(Json(intake_emails.into_iter().map(to_response).collect()))
}

pub async fn create_intake_email(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(organization_id): Path<String>,
    Json(payload): Json<CreateIntakeEmailRequest>,
) -> AppResult<(StatusCode, Json<IntakeEmailResponse>)> {
    ensure_feature_enabled(&state)?;

    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    let now = Utc::now().naive_utc();
    let new_intake_email = NewIntakeEmail {
        id: generate_id(INTAKE_EMAIL_ID_PREFIX),
        organization_id,
        email_address: intake::generate_email_address(&state.config.intake_emails_domain),
        is_enabled: payload.is_enabled,
        allowed_origins: serde_json::to_string(&payload.allowed_origins)?,
        created_at: now,
        updated_at: now,
    };

    let intake_email = repository::insert_intake_email(&mut conn, &new_intake_email)?;
    Ok((StatusCode::CREATED, Json(to_response(intake_email))))
}

pub async fn delete_intake_email(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((organization_id, intake_email_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    ensure_feature_enabled(&state)?;

    let mut conn = state.db()?;
    ensure_member(&mut conn, &organization_id, &user.user_id)?;

    let deleted = repository::delete_intake_email(&mut conn, &organization_id, &intake_email_id)?;
    if deleted == 0 {
        return Err(AppError::not_found(
            "intake_email.not_found",
            "intake email not found",
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Checks the shared secret the mail provider was configured with. The
/// feature flag is checked first so a disabled deployment reveals nothing
/// about whether a secret is set.
fn verify_webhook_secret(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let expected = state
        .config
        .intake_emails_webhook_secret
        .as_deref()
        .ok_or_else(|| {
            error!("intake webhook called but INTAKE_EMAILS_WEBHOOK_SECRET is not set");
            AppError::unauthorized()
        })?;

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(AppError::unauthorized)?;

    if presented != expected {
        return Err(AppError::unauthorized());
    }
    Ok(())
}

/// Webhook endpoint the mail provider posts inbound emails to. The payload
/// is multipart: a `meta` part carrying the envelope as JSON, followed by
/// zero or more `attachments[]` file parts. Always answers 204 once the
/// payload parses; per-recipient failures are logged, not surfaced, so the
/// provider never retries mail we already routed.
pub async fn ingest_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<StatusCode> {
    ensure_feature_enabled(&state)?;
    verify_webhook_secret(&state, &headers)?;

    let mut envelope: Option<InboundEmail> = None;
    let mut attachments = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid intake webhook payload");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        match field.name() {
            Some("meta") => {
                let raw = field.text().await.map_err(|err| {
                    AppError::bad_request(format!("failed to read email envelope: {err}"))
                })?;
                let parsed: InboundEmail = serde_json::from_str(&raw).map_err(|err| {
                    AppError::bad_request(format!("email envelope must be valid JSON: {err}"))
                })?;
                envelope = Some(parsed);
            }
            Some("attachments[]") => {
                let filename = field
                    .file_name()
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| "attachment".to_string());
                let mime_type = field.content_type().map(|mime| mime.to_string());
                let bytes = field.bytes().await.map_err(|err| {
                    AppError::bad_request(format!("failed to read attachment bytes: {err}"))
                })?;
                attachments.push(EmailAttachment {
                    filename,
                    mime_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    let mut email =
        envelope.ok_or_else(|| AppError::bad_request("meta envelope part is required"))?;
    email.attachments = attachments;

    process_intake_email(&state, email).await;
    Ok(StatusCode::NO_CONTENT)
}
