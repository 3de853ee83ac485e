use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use formlift::api::documents;
use formlift::core::config::{Settings, DEFAULT_REPLICATE_MODEL};
use formlift::core::errors::{AppError, AppResult};
use formlift::db::repositories::documents as repo;
use formlift::db::Database;
use formlift::ocr::blocks::BlockGraph;
use formlift::pipeline::OcrPipeline;
use formlift::providers::{DocumentAnalyzer, LanguageModel};
use formlift::storage::ObjectStorage;
use formlift::AppState;

#[derive(Default)]
struct MemoryStorage {
    uploads: Mutex<Vec<String>>,
    delete_succeeds: bool,
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, _bytes: &[u8], filename: &str, _content_type: &str) -> AppResult<String> {
        let key = format!("pdfs/{filename}");
        self.uploads.lock().expect("uploads lock").push(key.clone());
        Ok(key)
    }

    async fn presigned_url(&self, storage_key: &str, expires_in: Duration) -> AppResult<String> {
        Ok(format!(
            "https://storage.test/{storage_key}?expires={}",
            expires_in.as_secs()
        ))
    }

    async fn delete(&self, _storage_key: &str) -> AppResult<bool> {
        Ok(self.delete_succeeds)
    }
}

struct StubAnalyzer;

#[async_trait]
impl DocumentAnalyzer for StubAnalyzer {
    async fn analyze(&self, _storage_key: &str) -> AppResult<BlockGraph> {
        BlockGraph::from_value(&json!({ "Blocks": [] }))
    }
}

struct StubModel;

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete(&self, _prompt: &str) -> AppResult<String> {
        Ok("{}".to_string())
    }
}

fn test_settings() -> Settings {
    Settings {
        aws_region: "us-east-1".to_string(),
        aws_access_key_id: String::new(),
        aws_secret_access_key: String::new(),
        s3_bucket: "formlift-test".to_string(),
        s3_endpoint: None,
        upload_prefix: "pdfs/".to_string(),
        presign_expiry_secs: 900,
        replicate_api_token: "test-token".to_string(),
        replicate_model: DEFAULT_REPLICATE_MODEL.to_string(),
        data_dir: None,
    }
}

async fn test_state(storage: MemoryStorage) -> AppState {
    AppState {
        db: Database::in_memory().await.expect("in-memory db"),
        storage: Arc::new(storage),
        pipeline: OcrPipeline::new(Arc::new(StubAnalyzer), Arc::new(StubModel)),
        settings: test_settings(),
    }
}

#[tokio::test]
async fn upload_rejects_non_pdf_content_type() {
    let state = test_state(MemoryStorage::default()).await;
    let err = documents::upload_document(&state, "notes.txt", "text/plain", b"hello")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert!(err.to_string().contains("only PDF files are allowed"));
}

#[tokio::test]
async fn upload_rejects_blank_filename_and_empty_body() {
    let state = test_state(MemoryStorage::default()).await;
    let err = documents::upload_document(&state, "   ", "application/pdf", b"data")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("missing filename"));

    let err = documents::upload_document(&state, "empty.pdf", "application/pdf", b"")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("empty file"));
}

#[tokio::test]
async fn upload_stores_object_and_persists_a_row() {
    let state = test_state(MemoryStorage::default()).await;
    let response = documents::upload_document(&state, "invoice.pdf", "application/pdf", b"%PDF-1.7")
        .await
        .expect("upload");

    let document = response.document;
    assert_eq!(document.filename, "invoice.pdf");
    assert_eq!(document.storage_key, "pdfs/invoice.pdf");
    assert_eq!(document.content_type, "application/pdf");
    assert_eq!(document.size_bytes, 8);
    assert_eq!(document.checksum.len(), 64);

    let listed = documents::list_documents(&state).await.expect("list");
    assert_eq!(listed.documents.len(), 1);
    assert_eq!(listed.documents[0].id, document.id);
}

#[tokio::test]
async fn document_url_presigns_the_stored_key() {
    let state = test_state(MemoryStorage::default()).await;
    let uploaded = documents::upload_document(&state, "scan.pdf", "application/pdf", b"%PDF")
        .await
        .expect("upload");

    let response = documents::document_url(&state, uploaded.document.id)
        .await
        .expect("url");
    assert!(response.url.contains("pdfs/scan.pdf"));
    assert!(response.url.contains("expires=900"));
}

#[tokio::test]
async fn delete_proceeds_when_object_removal_fails() {
    let state = test_state(MemoryStorage {
        delete_succeeds: false,
        ..MemoryStorage::default()
    })
    .await;
    let uploaded = documents::upload_document(&state, "doc.pdf", "application/pdf", b"%PDF")
        .await
        .expect("upload");

    let response = documents::delete_document(&state, uploaded.document.id)
        .await
        .expect("delete");
    assert!(response.deleted);

    let err = documents::get_document(&state, uploaded.document.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn ocr_result_is_not_found_before_the_pipeline_writes() {
    let state = test_state(MemoryStorage::default()).await;
    let doc = repo::insert_document(
        state.db.pool(),
        repo::NewDocument {
            filename: "pending.pdf",
            storage_key: "pdfs/pending.pdf",
            content_type: "application/pdf",
            size_bytes: 4,
            checksum: "abc",
        },
    )
    .await
    .expect("insert");

    let err = documents::get_ocr_result(&state, doc.id).await.unwrap_err();
    assert!(err.to_string().contains("OCR results not available yet"));
}

#[tokio::test]
async fn ocr_result_reshapes_a_success_payload() {
    let state = test_state(MemoryStorage::default()).await;
    let doc = repo::insert_document(
        state.db.pool(),
        repo::NewDocument {
            filename: "done.pdf",
            storage_key: "pdfs/done.pdf",
            content_type: "application/pdf",
            size_bytes: 4,
            checksum: "abc",
        },
    )
    .await
    .expect("insert");
    repo::set_ocr_payload(
        state.db.pool(),
        doc.id,
        &json!({
            "text": "Name : John\n",
            "structured_data": { "name": "John" },
            "bounding_boxes": [{
                "x": 0.1, "y": 0.2, "width": 0.3, "height": 0.05,
                "page": 1, "text": "Name : John", "confidence": 99.0,
            }],
        }),
    )
    .await
    .expect("set payload");

    let result = documents::get_ocr_result(&state, doc.id).await.expect("ocr result");
    assert_eq!(result.text, "Name : John\n");
    assert_eq!(result.structured_data, json!({ "name": "John" }));
    assert_eq!(result.bounding_boxes.len(), 1);
    assert_eq!(result.bounding_boxes[0].page, 1);
    assert!(!result.has_error());
}

#[tokio::test]
async fn ocr_result_defaults_absent_fields_for_error_payloads() {
    let state = test_state(MemoryStorage::default()).await;
    let doc = repo::insert_document(
        state.db.pool(),
        repo::NewDocument {
            filename: "failed.pdf",
            storage_key: "pdfs/failed.pdf",
            content_type: "application/pdf",
            size_bytes: 4,
            checksum: "abc",
        },
    )
    .await
    .expect("insert");
    repo::set_ocr_payload(state.db.pool(), doc.id, &json!({ "error": "unsupported" }))
        .await
        .expect("set payload");

    let result = documents::get_ocr_result(&state, doc.id).await.expect("ocr result");
    assert_eq!(result.text, "");
    assert!(result.bounding_boxes.is_empty());
    // An error payload surfaces through structured_data untouched.
    assert_eq!(result.structured_data, json!({}));
}

#[test]
fn errors_serialize_with_code_and_message() {
    let err = AppError::NotFound("document 7".to_string());
    let value: Value = serde_json::to_value(&err).expect("serialize");
    assert_eq!(value["code"], "NOT_FOUND");
    assert_eq!(value["message"], "not found: document 7");
}
