pub mod replicate;
pub mod textract;

use async_trait::async_trait;

use crate::core::errors::AppResult;
use crate::ocr::blocks::BlockGraph;

/// Cloud document-analysis collaborator: takes a storage key, returns the raw
/// block graph. An unsupported file format surfaces as
/// `AppError::UnsupportedDocument`, which the pipeline downgrades to a soft
/// error payload.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(&self, storage_key: &str) -> AppResult<BlockGraph>;
}

/// Text-in/text-out language model collaborator.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}
