//! Turns raw OCR text into structured JSON via the language model.
//!
//! Both model-call failures and unparseable model output are soft failures:
//! they become an error-shaped JSON value that is persisted like any other
//! structuring result, never a propagated fault.

use serde_json::{json, Value};
use tracing::error;

use crate::providers::LanguageModel;

pub fn extraction_prompt(text: &str) -> String {
    format!(
        "You are an AI assistant that extracts structured information from OCR text.\n\n\
         Extract all relevant information from the following OCR text and organize it into a structured JSON format.\n\
         Focus on key fields like names, dates, addresses, amounts, and any other important information.\n\n\
         OCR Text:\n{text}\n\n\
         Return ONLY a valid JSON object with the extracted information. Do not include any explanations or text outside the JSON."
    )
}

pub async fn structure_ocr_text(model: &dyn LanguageModel, text: &str) -> Value {
    match model.complete(&extraction_prompt(text)).await {
        Ok(raw) => parse_model_output(&raw, text),
        Err(err) => {
            error!(error = %err, "language model call failed");
            json!({ "error": err.to_string(), "raw_text": text })
        }
    }
}

/// Strips an optional code fence around the model output and parses it as
/// JSON. The fallback carries the original OCR text, never the unparseable
/// model output.
pub fn parse_model_output(raw: &str, ocr_text: &str) -> Value {
    let mut cleaned = raw.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }

    match serde_json::from_str(cleaned.trim()) {
        Ok(value) => value,
        Err(err) => {
            error!(error = %err, "model output was not valid JSON");
            json!({
                "error": format!("failed to parse model output as JSON: {err}"),
                "raw_text": ocr_text,
            })
        }
    }
}
