use std::env;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::db::DEFAULT_MAX_POOL_SIZE;

pub const DEFAULT_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 15 * 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 64;

/// The storage backend active for this deployment. Exactly one driver is
/// selected at startup; drivers are never mixed and swapping drivers does not
/// migrate existing blobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageDriverKind {
    Filesystem,
    S3,
    AzureBlob,
    B2,
    InMemory,
}

impl FromStr for StorageDriverKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "filesystem" | "fs" => Ok(Self::Filesystem),
            "s3" => Ok(Self::S3),
            "azure-blob" | "azure" => Ok(Self::AzureBlob),
            "b2" => Ok(Self::B2),
            "in-memory" | "memory" => Ok(Self::InMemory),
            other => bail!(
                "unknown storage driver '{other}' (expected filesystem, s3, azure-blob, b2 or in-memory)"
            ),
        }
    }
}

impl StorageDriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::S3 => "s3",
            Self::AzureBlob => "azure-blob",
            Self::B2 => "b2",
            Self::InMemory => "in-memory",
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub cors_allowed_origin: Option<String>,
    pub max_upload_bytes: usize,
    pub storage_driver: StorageDriverKind,
    pub filesystem_storage_root: Option<String>,
    pub aws_endpoint_url: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: String,
    pub s3_bucket: Option<String>,
    pub azure_container_url: Option<String>,
    pub azure_sas_token: Option<String>,
    pub b2_key_id: Option<String>,
    pub b2_application_key: Option<String>,
    pub b2_endpoint: Option<String>,
    pub b2_region: String,
    pub b2_bucket: Option<String>,
    pub documents_retention_days: i64,
    pub expiration_sweep_enabled: bool,
    pub expiration_sweep_interval_seconds: u64,
    pub expiration_sweep_run_on_startup: bool,
    pub intake_emails_enabled: bool,
    pub intake_emails_webhook_secret: Option<String>,
    pub intake_emails_domain: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let storage_driver = env::var("STORAGE_DRIVER")
            .unwrap_or_else(|_| "filesystem".to_string())
            .parse()?;
        let filesystem_storage_root = env::var("FILESYSTEM_STORAGE_ROOT").ok();
        let aws_endpoint_url = env::var("AWS_ENDPOINT_URL").ok();
        let aws_access_key_id = env::var("AWS_ACCESS_KEY_ID").ok();
        let aws_secret_access_key = env::var("AWS_SECRET_ACCESS_KEY").ok();
        let aws_region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let s3_bucket = env::var("S3_BUCKET").ok();
        let azure_container_url = env::var("AZURE_STORAGE_CONTAINER_URL").ok();
        let azure_sas_token = env::var("AZURE_STORAGE_SAS_TOKEN").ok();
        let b2_key_id = env::var("B2_KEY_ID").ok();
        let b2_application_key = env::var("B2_APPLICATION_KEY").ok();
        let b2_endpoint = env::var("B2_ENDPOINT").ok();
        let b2_region = env::var("B2_REGION").unwrap_or_else(|_| "us-west-004".to_string());
        let b2_bucket = env::var("B2_BUCKET").ok();

        let documents_retention_days = env::var("DOCUMENTS_RETENTION_DAYS")
            .unwrap_or_else(|_| DEFAULT_RETENTION_DAYS.to_string())
            .parse()
            .context("DOCUMENTS_RETENTION_DAYS must be an integer")?;
        let expiration_sweep_enabled = env_flag("EXPIRATION_SWEEP_ENABLED", true);
        let expiration_sweep_interval_seconds = env::var("EXPIRATION_SWEEP_INTERVAL_SECONDS")
            .unwrap_or_else(|_| DEFAULT_SWEEP_INTERVAL_SECONDS.to_string())
            .parse()
            .context("EXPIRATION_SWEEP_INTERVAL_SECONDS must be an integer")?;
        let expiration_sweep_run_on_startup = env_flag("EXPIRATION_SWEEP_RUN_ON_STARTUP", false);

        let intake_emails_enabled = env_flag("INTAKE_EMAILS_ENABLED", false);
        let intake_emails_webhook_secret = env::var("INTAKE_EMAILS_WEBHOOK_SECRET").ok();
        let intake_emails_domain =
            env::var("INTAKE_EMAILS_DOMAIN").unwrap_or_else(|_| "intake.localhost".to_string());

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            cors_allowed_origin,
            max_upload_bytes,
            storage_driver,
            filesystem_storage_root,
            aws_endpoint_url,
            aws_access_key_id,
            aws_secret_access_key,
            aws_region,
            s3_bucket,
            azure_container_url,
            azure_sas_token,
            b2_key_id,
            b2_application_key,
            b2_endpoint,
            b2_region,
            b2_bucket,
            documents_retention_days,
            expiration_sweep_enabled,
            expiration_sweep_interval_seconds,
            expiration_sweep_run_on_startup,
            intake_emails_enabled,
            intake_emails_webhook_secret,
            intake_emails_domain,
        })
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::StorageDriverKind;

    #[test]
    fn parses_storage_driver_names() {
        assert_eq!(
            "filesystem".parse::<StorageDriverKind>().unwrap(),
            StorageDriverKind::Filesystem
        );
        assert_eq!(
            "azure-blob".parse::<StorageDriverKind>().unwrap(),
            StorageDriverKind::AzureBlob
        );
        assert_eq!(
            " B2 ".parse::<StorageDriverKind>().unwrap(),
            StorageDriverKind::B2
        );
        assert_eq!(
            "in-memory".parse::<StorageDriverKind>().unwrap(),
            StorageDriverKind::InMemory
        );
    }

    #[test]
    fn rejects_unknown_storage_driver() {
        assert!("ftp".parse::<StorageDriverKind>().is_err());
    }
}
