mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{body_to_vec, TestApp};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct TagEntry {
    id: String,
    name: String,
    usage_count: i64,
}

#[derive(Deserialize)]
struct DocumentInfo {
    id: String,
    tags: Vec<TagSummary>,
}

#[derive(Deserialize)]
struct TagSummary {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct DocumentList {
    documents: Vec<DocumentInfo>,
    total: i64,
}

#[derive(Deserialize)]
struct RuleInfo {
    id: String,
    enabled: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
}

async fn create_tag(app: &TestApp, org: &str, name: &str, user: &str) -> Result<String> {
    let response = app
        .post_json(
            &format!("/api/organizations/{org}/tags"),
            &json!({ "name": name }),
            Some(user),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_vec(response.into_body()).await?;
    let tag: TagEntry = serde_json::from_slice(&body)?;
    Ok(tag.id)
}

#[tokio::test]
async fn tag_lifecycle_and_usage_counts() -> Result<()> {
    let app = TestApp::new().await?;
    let org = app.seed_organization("acme", "user_1")?;

    let tag_id = create_tag(&app, &org, "invoices", "user_1").await?;

    // Same name twice is a conflict.
    let duplicate = app
        .post_json(
            &format!("/api/organizations/{org}/tags"),
            &json!({ "name": "invoices" }),
            Some("user_1"),
        )
        .await?;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let upload = app
        .upload_document(&org, "invoice-1.pdf", "application/pdf", b"%PDF-1.7", "user_1")
        .await?;
    let body = body_to_vec(upload.into_body()).await?;
    let document: DocumentInfo = serde_json::from_slice(&body)?;

    let assign = app
        .post_json(
            &format!("/api/organizations/{org}/documents/{}/tags", document.id),
            &json!({ "tag_id": tag_id }),
            Some("user_1"),
        )
        .await?;
    assert_eq!(assign.status(), StatusCode::NO_CONTENT);

    // Assigning the same tag again is a conflict with a stable code.
    let again = app
        .post_json(
            &format!("/api/organizations/{org}/documents/{}/tags", document.id),
            &json!({ "tag_id": tag_id }),
            Some("user_1"),
        )
        .await?;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    let body = body_to_vec(again.into_body()).await?;
    let error: ErrorBody = serde_json::from_slice(&body)?;
    assert_eq!(error.error.code, "tag.already_on_document");

    let response = app
        .get(&format!("/api/organizations/{org}/tags"), Some("user_1"))
        .await?;
    let body = body_to_vec(response.into_body()).await?;
    let tags: Vec<TagEntry> = serde_json::from_slice(&body)?;
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "invoices");
    assert_eq!(tags[0].usage_count, 1);

    let removed = app
        .delete(
            &format!(
                "/api/organizations/{org}/documents/{}/tags/{tag_id}",
                document.id
            ),
            Some("user_1"),
        )
        .await?;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let response = app
        .get(
            &format!("/api/organizations/{org}/documents/{}", document.id),
            Some("user_1"),
        )
        .await?;
    let body = body_to_vec(response.into_body()).await?;
    let document: DocumentInfo = serde_json::from_slice(&body)?;
    assert!(document.tags.is_empty());
    Ok(())
}

#[tokio::test]
async fn rules_tag_uploads_automatically() -> Result<()> {
    let app = TestApp::new().await?;
    let org = app.seed_organization("acme", "user_1")?;

    let invoices = create_tag(&app, &org, "invoices", "user_1").await?;
    let urgent = create_tag(&app, &org, "urgent", "user_1").await?;

    // Case-insensitive name prefix plus a content condition.
    let response = app
        .post_json(
            &format!("/api/organizations/{org}/tagging-rules"),
            &json!({
                "name": "incoming invoices",
                "conditions": [
                    { "field": "name", "operator": "starts_with", "value": "invoice" },
                    { "field": "content", "operator": "contains", "value": "total due" }
                ],
                "tag_ids": [invoices]
            }),
            Some("user_1"),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    // A rule without conditions matches every upload.
    let response = app
        .post_json(
            &format!("/api/organizations/{org}/tagging-rules"),
            &json!({ "name": "catch-all", "conditions": [], "tag_ids": [urgent] }),
            Some("user_1"),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let upload = app
        .upload_document(
            &org,
            "Invoice-2025-001.txt",
            "text/plain",
            b"Total due: 99 EUR",
            "user_1",
        )
        .await?;
    assert_eq!(upload.status(), StatusCode::CREATED);
    let body = body_to_vec(upload.into_body()).await?;
    let document: DocumentInfo = serde_json::from_slice(&body)?;
    let mut names: Vec<&str> = document.tags.iter().map(|tag| tag.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["invoices", "urgent"]);

    // Both conditions must hold; only the catch-all fires here.
    let upload = app
        .upload_document(&org, "invoice-draft.txt", "text/plain", b"no amount yet", "user_1")
        .await?;
    let body = body_to_vec(upload.into_body()).await?;
    let document: DocumentInfo = serde_json::from_slice(&body)?;
    let names: Vec<&str> = document.tags.iter().map(|tag| tag.name.as_str()).collect();
    assert_eq!(names, ["urgent"]);
    Ok(())
}

#[tokio::test]
async fn disabled_and_deleted_rules_do_not_fire() -> Result<()> {
    let app = TestApp::new().await?;
    let org = app.seed_organization("acme", "user_1")?;

    let tag_id = create_tag(&app, &org, "archive", "user_1").await?;

    let response = app
        .post_json(
            &format!("/api/organizations/{org}/tagging-rules"),
            &json!({ "name": "paused", "enabled": false, "conditions": [], "tag_ids": [tag_id] }),
            Some("user_1"),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_vec(response.into_body()).await?;
    let rule: RuleInfo = serde_json::from_slice(&body)?;
    assert!(!rule.enabled);

    let upload = app
        .upload_document(&org, "anything.txt", "text/plain", b"content", "user_1")
        .await?;
    let body = body_to_vec(upload.into_body()).await?;
    let document: DocumentInfo = serde_json::from_slice(&body)?;
    assert!(document.tags.is_empty());

    let deleted = app
        .delete(
            &format!("/api/organizations/{org}/tagging-rules/{}", rule.id),
            Some("user_1"),
        )
        .await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let response = app
        .get(
            &format!("/api/organizations/{org}/tagging-rules"),
            Some("user_1"),
        )
        .await?;
    let body = body_to_vec(response.into_body()).await?;
    let rules: Vec<RuleInfo> = serde_json::from_slice(&body)?;
    assert!(rules.is_empty());
    Ok(())
}

#[tokio::test]
async fn rule_validation_rejects_unknown_shapes() -> Result<()> {
    let app = TestApp::new().await?;
    let org = app.seed_organization("acme", "user_1")?;
    let tag_id = create_tag(&app, &org, "misc", "user_1").await?;

    let response = app
        .post_json(
            &format!("/api/organizations/{org}/tagging-rules"),
            &json!({
                "name": "bad operator",
                "conditions": [{ "field": "name", "operator": "matches_regex", "value": ".*" }],
                "tag_ids": [tag_id]
            }),
            Some("user_1"),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            &format!("/api/organizations/{org}/tagging-rules"),
            &json!({
                "name": "bad field",
                "conditions": [{ "field": "size", "operator": "equal", "value": "1" }],
                "tag_ids": [tag_id]
            }),
            Some("user_1"),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            &format!("/api/organizations/{org}/tagging-rules"),
            &json!({ "name": "no tags", "conditions": [], "tag_ids": [] }),
            Some("user_1"),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            &format!("/api/organizations/{org}/tagging-rules"),
            &json!({ "name": "unknown tag", "conditions": [], "tag_ids": ["tag_missing"] }),
            Some("user_1"),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn listing_filters_by_tag() -> Result<()> {
    let app = TestApp::new().await?;
    let org = app.seed_organization("acme", "user_1")?;
    let tag_id = create_tag(&app, &org, "contracts", "user_1").await?;

    let upload = app
        .upload_document(&org, "contract.txt", "text/plain", b"signed", "user_1")
        .await?;
    let body = body_to_vec(upload.into_body()).await?;
    let tagged: DocumentInfo = serde_json::from_slice(&body)?;
    app.post_json(
        &format!("/api/organizations/{org}/documents/{}/tags", tagged.id),
        &json!({ "tag_id": tag_id }),
        Some("user_1"),
    )
    .await?;

    app.upload_document(&org, "other.txt", "text/plain", b"unrelated", "user_1")
        .await?;

    let response = app
        .get(
            &format!("/api/organizations/{org}/documents?tag_id={tag_id}"),
            Some("user_1"),
        )
        .await?;
    let body = body_to_vec(response.into_body()).await?;
    let list: DocumentList = serde_json::from_slice(&body)?;
    assert_eq!(list.total, 1);
    assert_eq!(list.documents.len(), 1);
    assert_eq!(list.documents[0].id, tagged.id);
    assert_eq!(list.documents[0].tags[0].id, tag_id);
    Ok(())
}
