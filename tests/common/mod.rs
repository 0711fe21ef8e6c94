use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use chrono::Utc;
use diesel::prelude::*;
use docshelf::config::{AppConfig, StorageDriverKind};
use docshelf::db;
use docshelf::ids::{generate_id, ORGANIZATION_ID_PREFIX};
use docshelf::models::{NewOrganization, NewOrganizationMember};
use docshelf::routes;
use docshelf::state::AppState;
use docshelf::storage::{MemoryStorage, StorageDriver};
use http_body_util::BodyExt;
use serde::Serialize;
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

#[allow(dead_code)]
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

pub struct TestApp {
    pub state: AppState,
    router: Router,
    storage: Arc<MemoryStorage>,
    _data_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::build(true).await
    }

    /// Variant with the intake email feature flag off, for testing the
    /// disabled surface.
    #[allow(dead_code)]
    pub async fn new_with_intake_disabled() -> Result<Self> {
        Self::build(false).await
    }

    async fn build(intake_emails_enabled: bool) -> Result<Self> {
        let data_dir = tempfile::tempdir().context("failed to create temp dir")?;
        let database_url = data_dir
            .path()
            .join("docshelf-test.sqlite")
            .to_string_lossy()
            .into_owned();

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            cors_allowed_origin: None,
            max_upload_bytes: 1024 * 1024 * 8,
            storage_driver: StorageDriverKind::InMemory,
            filesystem_storage_root: None,
            aws_endpoint_url: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: "us-east-1".to_string(),
            s3_bucket: None,
            azure_container_url: None,
            azure_sas_token: None,
            b2_key_id: None,
            b2_application_key: None,
            b2_endpoint: None,
            b2_region: "us-west-004".to_string(),
            b2_bucket: None,
            documents_retention_days: 30,
            expiration_sweep_enabled: false,
            expiration_sweep_interval_seconds: 900,
            expiration_sweep_run_on_startup: false,
            intake_emails_enabled,
            intake_emails_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            intake_emails_domain: "intake.test".to_string(),
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        {
            let mut conn = pool.get().context("failed to acquire connection")?;
            db::run_migrations(&mut conn)?;
        }

        let storage = Arc::new(MemoryStorage::default());
        let storage_for_state: Arc<dyn StorageDriver> = storage.clone();
        let state = AppState::new(pool, config, storage_for_state);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            storage,
            _data_dir: data_dir,
        })
    }

    #[allow(dead_code)]
    pub fn storage(&self) -> Arc<MemoryStorage> {
        self.storage.clone()
    }

    /// Creates an organization with `user_id` as a member and returns its id.
    pub fn seed_organization(&self, name: &str, user_id: &str) -> Result<String> {
        let mut conn = self
            .state
            .pool
            .get()
            .map_err(|err| anyhow!("failed to get connection: {err}"))?;
        let now = Utc::now().naive_utc();
        let organization = NewOrganization {
            id: generate_id(ORGANIZATION_ID_PREFIX),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(docshelf::schema::organizations::table)
            .values(&organization)
            .execute(&mut conn)
            .context("failed to insert organization")?;
        diesel::insert_into(docshelf::schema::organization_members::table)
            .values(&NewOrganizationMember {
                organization_id: organization.id.clone(),
                user_id: user_id.to_string(),
                role: "member".to_string(),
                created_at: now,
            })
            .execute(&mut conn)
            .context("failed to insert membership")?;
        Ok(organization.id)
    }

    pub async fn get(&self, path: &str, user_id: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(user_id) = user_id {
            builder = builder.header("x-user-id", user_id);
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        user_id: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(user_id) = user_id {
            builder = builder.header("x-user-id", user_id);
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn post_empty(
        &self,
        path: &str,
        user_id: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::POST).uri(path);
        if let Some(user_id) = user_id {
            builder = builder.header("x-user-id", user_id);
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn delete(
        &self,
        path: &str,
        user_id: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::DELETE).uri(path);
        if let Some(user_id) = user_id {
            builder = builder.header("x-user-id", user_id);
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn upload_document(
        &self,
        organization_id: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
        user_id: &str,
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend(data);
        body.extend(b"\r\n");
        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/organizations/{organization_id}/documents"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header("x-user-id", user_id)
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    /// Posts an inbound email to the intake webhook: a `meta` envelope part
    /// plus one `attachments[]` part per (filename, content_type, bytes)
    /// triple.
    #[allow(dead_code)]
    pub async fn ingest_email(
        &self,
        from: &str,
        to: &[&str],
        attachments: &[(&str, &str, &[u8])],
        secret: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let envelope = serde_json::json!({
            "from": { "address": from },
            "to": to.iter().map(|address| serde_json::json!({ "address": address })).collect::<Vec<_>>(),
        });

        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(b"Content-Disposition: form-data; name=\"meta\"\r\n");
        body.extend(b"Content-Type: application/json\r\n\r\n");
        body.extend(serde_json::to_vec(&envelope)?);
        body.extend(b"\r\n");

        for (filename, content_type, data) in attachments {
            body.extend(format!("--{boundary}\r\n").as_bytes());
            body.extend(
                format!(
                    "Content-Disposition: form-data; name=\"attachments[]\"; filename=\"{filename}\"\r\n"
                )
                .as_bytes(),
            );
            body.extend(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
            body.extend(*data);
            body.extend(b"\r\n");
        }
        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/intake-emails/ingest")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            );
        if let Some(secret) = secret {
            builder = builder.header("authorization", format!("Bearer {secret}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}
