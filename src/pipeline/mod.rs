//! Background processing for one uploaded document: analysis, structuring,
//! and terminal persistence with bounded retries.

pub mod structuring;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    core::{
        errors::{AppError, AppResult},
        types::{OcrOutcome, OcrResult},
    },
    db::{repositories::documents, Database},
    ocr,
    providers::{DocumentAnalyzer, LanguageModel},
};

const PERSIST_ATTEMPTS: u32 = 3;

/// Persistence seam for the pipeline's terminal write. Implementations must
/// acquire their own connection per call so retries stay isolated.
#[async_trait]
pub trait OcrSink: Send + Sync {
    async fn record_ocr_payload(&self, document_id: i64, payload: &Value) -> AppResult<()>;
}

#[async_trait]
impl OcrSink for Database {
    async fn record_ocr_payload(&self, document_id: i64, payload: &Value) -> AppResult<()> {
        documents::set_ocr_payload(self.pool(), document_id, payload).await
    }
}

#[derive(Clone)]
pub struct OcrPipeline {
    analyzer: Arc<dyn DocumentAnalyzer>,
    model: Arc<dyn LanguageModel>,
}

impl OcrPipeline {
    pub fn new(analyzer: Arc<dyn DocumentAnalyzer>, model: Arc<dyn LanguageModel>) -> Self {
        Self { analyzer, model }
    }

    /// Detached per-document run; the caller never awaits completion and the
    /// task cannot be cancelled once scheduled.
    pub fn spawn(&self, sink: Database, document_id: i64, storage_key: String) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            pipeline.run(&sink, document_id, &storage_key).await;
        })
    }

    /// Runs analysis and structuring, always leaving a terminal payload on
    /// the document when persistence cooperates. Never returns an error: an
    /// uncaught failure is converted into a hard-error payload, and failure
    /// to record even that is logged and swallowed.
    pub async fn run<S: OcrSink + ?Sized>(&self, sink: &S, document_id: i64, storage_key: &str) {
        if let Err(err) = self.execute(sink, document_id, storage_key).await {
            error!(document_id, error = %err, "document processing failed");
            let payload = OcrOutcome::Failure {
                message: err.to_string(),
            }
            .into_payload();
            if let Err(record_err) = persist_with_retry(sink, document_id, &payload).await {
                // No further escalation path exists for the error-recording write.
                error!(document_id, error = %record_err, "failed to record processing error");
            }
        }
    }

    async fn execute<S: OcrSink + ?Sized>(
        &self,
        sink: &S,
        document_id: i64,
        storage_key: &str,
    ) -> AppResult<()> {
        let ocr_result = match self.analyzer.analyze(storage_key).await {
            Ok(graph) => ocr::assemble(&graph),
            Err(AppError::UnsupportedDocument(message)) => {
                warn!(document_id, "analysis rejected the document format");
                OcrResult::soft_error(message)
            }
            Err(err) => return Err(err),
        };

        if ocr_result.has_error() {
            // Analysis failed in-band; persist that payload and skip structuring.
            persist_with_retry(sink, document_id, &ocr_result.structured_data).await?;
            return Ok(());
        }

        let structured_data =
            structuring::structure_ocr_text(self.model.as_ref(), &ocr_result.text).await;

        let payload = OcrOutcome::Success {
            text: ocr_result.text,
            structured_data,
            bounding_boxes: ocr_result.bounding_boxes,
        }
        .into_payload();
        persist_with_retry(sink, document_id, &payload).await?;
        info!(document_id, "document processing complete");
        Ok(())
    }
}

/// Writes the terminal payload, retrying immediately up to the fixed bound.
pub async fn persist_with_retry<S: OcrSink + ?Sized>(
    sink: &S,
    document_id: i64,
    payload: &Value,
) -> AppResult<()> {
    let mut last_error = None;
    for attempt in 1..=PERSIST_ATTEMPTS {
        match sink.record_ocr_payload(document_id, payload).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                warn!(document_id, attempt, error = %err, "persisting OCR payload failed");
                last_error = Some(err);
            }
        }
    }
    Err(last_error
        .unwrap_or_else(|| AppError::Internal("persist retry loop yielded no error".to_string())))
}
