//! Document operations the transport layer calls into. Validation failures
//! here are the only OCR-adjacent errors an uploader ever sees; everything
//! past the spawn is observable only through the persisted OCR payload.

use std::time::Duration;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::{
    core::{
        errors::{AppError, AppResult},
        types::{
            DeleteDocumentResponse, DocumentUrlResponse, GetDocumentResponse,
            ListDocumentsResponse, OcrResult, UploadDocumentResponse,
        },
    },
    db::repositories::documents::{self, NewDocument},
    AppState,
};

const PDF_CONTENT_TYPE: &str = "application/pdf";

fn checksum_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub async fn upload_document(
    state: &AppState,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> AppResult<UploadDocumentResponse> {
    if content_type != PDF_CONTENT_TYPE {
        return Err(AppError::InvalidInput("only PDF files are allowed".to_string()));
    }
    if filename.trim().is_empty() {
        return Err(AppError::InvalidInput("missing filename".to_string()));
    }
    if bytes.is_empty() {
        return Err(AppError::InvalidInput("empty file".to_string()));
    }

    let storage_key = state.storage.upload(bytes, filename, content_type).await?;
    let document = documents::insert_document(
        state.db.pool(),
        NewDocument {
            filename,
            storage_key: &storage_key,
            content_type,
            size_bytes: bytes.len() as i64,
            checksum: &checksum_bytes(bytes),
        },
    )
    .await?;

    info!(document_id = document.id, filename, "document uploaded, scheduling OCR");
    state
        .pipeline
        .spawn(state.db.clone(), document.id, storage_key);

    Ok(UploadDocumentResponse { document })
}

pub async fn list_documents(state: &AppState) -> AppResult<ListDocumentsResponse> {
    let docs = documents::list_documents(state.db.pool()).await?;
    Ok(ListDocumentsResponse { documents: docs })
}

pub async fn get_document(state: &AppState, document_id: i64) -> AppResult<GetDocumentResponse> {
    let document = documents::get_document(state.db.pool(), document_id).await?;
    Ok(GetDocumentResponse { document })
}

pub async fn document_url(state: &AppState, document_id: i64) -> AppResult<DocumentUrlResponse> {
    let document = documents::get_document(state.db.pool(), document_id).await?;
    let url = state
        .storage
        .presigned_url(
            &document.storage_key,
            Duration::from_secs(state.settings.presign_expiry_secs),
        )
        .await?;
    Ok(DocumentUrlResponse { url })
}

pub async fn delete_document(
    state: &AppState,
    document_id: i64,
) -> AppResult<DeleteDocumentResponse> {
    let document = documents::get_document(state.db.pool(), document_id).await?;
    if !state.storage.delete(&document.storage_key).await? {
        // Row deletion proceeds anyway; the object may already be gone.
        warn!(document_id, storage_key = %document.storage_key, "stored object was not deleted");
    }
    let deleted = documents::delete_document(state.db.pool(), document_id).await?;
    Ok(DeleteDocumentResponse { deleted })
}

/// Reshapes the persisted payload back into an [`OcrResult`], defaulting
/// absent structured data to an empty mapping. Not found until the pipeline
/// has written a terminal payload.
pub async fn get_ocr_result(state: &AppState, document_id: i64) -> AppResult<OcrResult> {
    let document = documents::get_document(state.db.pool(), document_id).await?;
    let payload = document
        .ocr_data
        .ok_or_else(|| AppError::NotFound("OCR results not available yet".to_string()))?;

    let text = payload
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let bounding_boxes = payload
        .get("bounding_boxes")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|err| AppError::Internal(format!("stored fragments unreadable: {err}")))?
        .unwrap_or_default();
    let structured_data = payload
        .get("structured_data")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));

    Ok(OcrResult {
        text,
        bounding_boxes,
        structured_data,
    })
}
