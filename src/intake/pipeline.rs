use bytes::Bytes;
use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{info, warn};

use crate::documents::service::{create_document, NewUpload};
use crate::error::AppResult;
use crate::intake::repository;
use crate::state::AppState;
use crate::tagging::engine::apply_tagging_rules;

/// An inbound email as delivered by the mail provider's webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEmail {
    pub from: EmailAddress,
    pub to: Vec<EmailAddress>,
    #[serde(default, skip_deserializing)]
    pub attachments: Vec<EmailAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailAddress {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

/// What one webhook delivery produced, summed over all recipients.
#[derive(Debug, Default)]
pub struct IngestionReport {
    pub recipients_processed: usize,
    pub documents_created: usize,
    pub attachments_failed: usize,
}

/// Fans an inbound email out to every recipient address. Recipients are
/// independent: an unknown address, a disabled intake, a rejected sender or
/// a failing attachment on one recipient never affects the others. The
/// webhook is acknowledged regardless, so the provider does not retry mail
/// we have already routed.
pub async fn process_intake_email(state: &AppState, email: InboundEmail) -> IngestionReport {
    let outcomes = join_all(
        email
            .to
            .iter()
            .map(|recipient| ingest_for_recipient(state, &email, &recipient.address)),
    )
    .await;

    let mut report = IngestionReport::default();
    for (recipient, outcome) in email.to.iter().zip(outcomes) {
        report.recipients_processed += 1;
        match outcome {
            Ok((created, failed)) => {
                report.documents_created += created;
                report.attachments_failed += failed;
            }
            Err(err) => {
                warn!(
                    recipient = %recipient.address,
                    error = %err,
                    "intake ingestion failed for recipient"
                );
            }
        }
    }
    info!(
        recipients = report.recipients_processed,
        documents_created = report.documents_created,
        attachments_failed = report.attachments_failed,
        "intake email processed"
    );
    report
}

/// Routes one recipient address: exact intake lookup, enabled check, sender
/// allow-list, then one document per attachment with tagging rules applied.
/// Returns (documents created, attachments failed).
async fn ingest_for_recipient(
    state: &AppState,
    email: &InboundEmail,
    recipient: &str,
) -> AppResult<(usize, usize)> {
    let intake = {
        let mut conn = state.db()?;
        repository::find_by_address(&mut conn, recipient)?
    };
    let Some(intake) = intake else {
        // Not an address we issued. Silently dropped rather than errored so a
        // stray CC cannot make the provider retry the whole delivery.
        info!(recipient, "no intake email for recipient, dropping");
        return Ok((0, 0));
    };

    if !intake.is_enabled {
        info!(recipient, intake_email_id = %intake.id, "intake email disabled, dropping");
        return Ok((0, 0));
    }

    let sender = email.from.address.to_lowercase();
    let allowed = intake
        .allowed_origins()
        .iter()
        .any(|origin| origin.to_lowercase() == sender);
    if !allowed {
        // An empty allow-list lands here too: it permits nobody.
        warn!(
            recipient,
            sender = %email.from.address,
            "sender not in allow-list, dropping"
        );
        return Ok((0, 0));
    }

    let mut created = 0;
    let mut failed = 0;
    for attachment in &email.attachments {
        let upload = NewUpload {
            organization_id: intake.organization_id.clone(),
            original_name: attachment.filename.clone(),
            mime_type: attachment.mime_type.clone(),
            bytes: attachment.bytes.clone(),
            created_by: None,
        };
        match create_document(state, upload).await {
            Ok(document) => {
                created += 1;
                let mut conn = state.db()?;
                if let Err(err) = apply_tagging_rules(&mut conn, &document) {
                    warn!(
                        document_id = %document.id,
                        error = %err,
                        "tagging rules failed for ingested document"
                    );
                }
            }
            Err(err) => {
                failed += 1;
                warn!(
                    recipient,
                    filename = %attachment.filename,
                    error = %err,
                    "failed to ingest attachment"
                );
            }
        }
    }
    Ok((created, failed))
}
