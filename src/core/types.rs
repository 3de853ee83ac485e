use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One recognized line of text with its normalized position on the page.
///
/// Coordinates are 0..1 fractions of page width/height; the source geometry
/// format does not disambiguate pages, so `page` is always 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub page: i64,
    pub text: String,
    pub confidence: f64,
}

/// Assembled output of one document analysis: newline-joined full text, the
/// positioned line fragments in response order, and the reconstructed form
/// key/value mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    pub text: String,
    pub bounding_boxes: Vec<TextFragment>,
    pub structured_data: Value,
}

impl OcrResult {
    /// A result carrying an in-band analysis failure instead of text.
    pub fn soft_error(message: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            bounding_boxes: vec![],
            structured_data: json!({ "error": message.into() }),
        }
    }

    pub fn has_error(&self) -> bool {
        self.structured_data.get("error").is_some()
    }
}

/// Terminal outcome of one pipeline run. Success and failure serialize into
/// the same untyped payload column; presence of the `error` key is the only
/// state signal the storage layer carries.
#[derive(Debug, Clone)]
pub enum OcrOutcome {
    Success {
        text: String,
        structured_data: Value,
        bounding_boxes: Vec<TextFragment>,
    },
    Failure {
        message: String,
    },
}

impl OcrOutcome {
    pub fn into_payload(self) -> Value {
        match self {
            Self::Success {
                text,
                structured_data,
                bounding_boxes,
            } => json!({
                "text": text,
                "structured_data": structured_data,
                "bounding_boxes": bounding_boxes,
            }),
            Self::Failure { message } => json!({ "error": message }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: i64,
    pub filename: String,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub checksum: String,
    pub ocr_data: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDocumentResponse {
    pub document: DocumentRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    pub documents: Vec<DocumentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDocumentResponse {
    pub document: DocumentRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUrlResponse {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDocumentResponse {
    pub deleted: bool,
}
