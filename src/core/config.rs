use std::path::PathBuf;

use crate::core::errors::{AppError, AppResult};

pub const DEFAULT_REPLICATE_MODEL: &str =
    "meta/llama-2-70b-chat:02e509c789964a7ea8736978a43525956ef40397be9033abf9fd2badfe68c9e3";

const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct Settings {
    pub aws_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub s3_bucket: String,
    /// Custom endpoint for S3-compatible stores (MinIO); None for AWS.
    pub s3_endpoint: Option<String>,
    pub upload_prefix: String,
    pub presign_expiry_secs: u64,
    pub replicate_api_token: String,
    pub replicate_model: String,
    /// Override for the on-disk database location; defaults next to the cwd.
    pub data_dir: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            aws_region: env_or("AWS_REGION", "us-east-1"),
            aws_access_key_id: std::env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            aws_secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
            s3_bucket: require_env("S3_BUCKET_NAME")?,
            s3_endpoint: std::env::var("S3_ENDPOINT_URL").ok().filter(|v| !v.is_empty()),
            upload_prefix: env_or("UPLOAD_PREFIX", "pdfs/"),
            presign_expiry_secs: std::env::var("PRESIGN_EXPIRY_SECS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(DEFAULT_PRESIGN_EXPIRY_SECS),
            replicate_api_token: require_env("REPLICATE_API_TOKEN")?,
            replicate_model: env_or("REPLICATE_MODEL_NAME", DEFAULT_REPLICATE_MODEL),
            data_dir: std::env::var("FORMLIFT_DATA_DIR").ok().map(PathBuf::from),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn require_env(key: &str) -> AppResult<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::InvalidInput(format!("missing required environment variable {key}")))
}
