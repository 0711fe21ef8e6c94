use bytes::Bytes;
use chrono::{Duration, NaiveDateTime, Utc};
use tracing::{error, info, warn};

use crate::documents::{derive_storage_key, extract_text_content, repository};
use crate::error::{AppError, AppResult};
use crate::ids::{generate_id, DOCUMENT_ID_PREFIX};
use crate::models::{Document, NewDocument};
use crate::state::AppState;
use crate::storage::StorageError;

pub struct NewUpload {
    pub organization_id: String,
    pub original_name: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
    pub created_by: Option<String>,
}

#[derive(Debug, Default)]
pub struct SweepSummary {
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Creates a document: storage write first, metadata row second. A storage
/// failure aborts before any row exists; a repository failure after a
/// successful write leaves an orphan blob, which is tolerated rather than
/// compensated (a synchronous rollback delete could itself fail).
pub async fn create_document(state: &AppState, upload: NewUpload) -> AppResult<Document> {
    let document_id = generate_id(DOCUMENT_ID_PREFIX);
    let storage_key = derive_storage_key(&upload.organization_id, &document_id, &upload.original_name);

    let mime_type = upload.mime_type.unwrap_or_else(|| {
        mime_guess::from_path(&upload.original_name)
            .first_or_octet_stream()
            .to_string()
    });
    let content = extract_text_content(&mime_type, &upload.bytes);
    let size = upload.bytes.len() as i64;

    state
        .storage
        .save_file(&storage_key, upload.bytes, Some(mime_type.clone()))
        .await?;

    let now = Utc::now().naive_utc();
    let new_document = NewDocument {
        id: document_id,
        organization_id: upload.organization_id,
        name: upload.original_name.clone(),
        original_name: upload.original_name,
        mime_type,
        size,
        storage_key,
        content,
        created_by: upload.created_by,
        created_at: now,
        updated_at: now,
    };

    let mut conn = state.db()?;
    let document = repository::insert_document(&mut conn, &new_document).map_err(|err| {
        warn!(
            storage_key = %new_document.storage_key,
            error = %err,
            "document row insert failed after storage write; orphan blob left behind"
        );
        AppError::from(err)
    })?;

    info!(
        document_id = %document.id,
        organization_id = %document.organization_id,
        size = document.size,
        "document created"
    );
    Ok(document)
}

pub async fn soft_delete_document(
    state: &AppState,
    organization_id: &str,
    document_id: &str,
    deleted_by: &str,
) -> AppResult<()> {
    let mut conn = state.db()?;
    let document = repository::find_document(&mut conn, organization_id, document_id)?
        .filter(|doc| !doc.is_deleted)
        .ok_or_else(|| AppError::not_found("document.not_found", "document not found"))?;

    repository::mark_document_deleted(&mut conn, &document.id, deleted_by, Utc::now().naive_utc())?;
    info!(document_id = %document.id, deleted_by, "document soft-deleted");
    Ok(())
}

/// Restores a soft-deleted document. Only valid while the retention window
/// keeps the row around; an active document is a conflict, not a no-op.
pub async fn restore_document(
    state: &AppState,
    organization_id: &str,
    document_id: &str,
) -> AppResult<Document> {
    let mut conn = state.db()?;
    let document = repository::find_document(&mut conn, organization_id, document_id)?
        .ok_or_else(|| AppError::not_found("document.not_found", "document not found"))?;

    if !document.is_deleted {
        return Err(AppError::conflict(
            "document.not_deleted",
            "document is not deleted",
        ));
    }

    repository::clear_deletion_markers(&mut conn, &document.id, Utc::now().naive_utc())?;
    let restored = repository::find_document(&mut conn, organization_id, document_id)?
        .ok_or_else(|| AppError::not_found("document.not_found", "document not found"))?;
    info!(document_id = %restored.id, "document restored");
    Ok(restored)
}

/// Background sweep: hard-deletes every document whose soft-deletion is
/// older than the retention window. Documents are processed independently;
/// one failed blob delete defers that document to the next sweep without
/// blocking the rest.
pub async fn hard_delete_expired(
    state: &AppState,
    retention_days: i64,
    now: NaiveDateTime,
) -> AppResult<SweepSummary> {
    let cutoff = now - Duration::days(retention_days);
    let expired = {
        let mut conn = state.db()?;
        repository::find_expired_documents(&mut conn, cutoff)?
    };

    let mut summary = SweepSummary {
        scanned: expired.len(),
        ..SweepSummary::default()
    };

    for document in expired {
        match state.storage.delete_file(&document.storage_key).await {
            Ok(()) => {}
            // A missing blob means an earlier sweep got this far; still
            // remove the row.
            Err(StorageError::NotFound { .. }) => {}
            Err(err) => {
                error!(
                    document_id = %document.id,
                    storage_key = %document.storage_key,
                    error = %err,
                    "failed to delete expired document blob"
                );
                summary.failed += 1;
                continue;
            }
        }

        let mut conn = state.db()?;
        match repository::delete_document_row(&mut conn, &document.id) {
            Ok(_) => summary.deleted += 1,
            Err(err) => {
                error!(
                    document_id = %document.id,
                    error = %err,
                    "failed to delete expired document row"
                );
                summary.failed += 1;
            }
        }
    }

    info!(
        scanned = summary.scanned,
        deleted = summary.deleted,
        failed = summary.failed,
        "expiration sweep finished"
    );
    Ok(summary)
}
