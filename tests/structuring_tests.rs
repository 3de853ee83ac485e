use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use formlift::core::errors::{AppError, AppResult};
use formlift::pipeline::structuring::{parse_model_output, structure_ocr_text};
use formlift::providers::LanguageModel;

struct FakeModel {
    reply: Box<dyn Fn() -> AppResult<String> + Send + Sync>,
    last_prompt: Mutex<Option<String>>,
}

impl FakeModel {
    fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self {
            reply: Box::new(move || Ok(text.clone())),
            last_prompt: Mutex::new(None),
        }
    }

    fn failing(make_err: fn() -> AppError) -> Self {
        Self {
            reply: Box::new(move || Err(make_err())),
            last_prompt: Mutex::new(None),
        }
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        *self.last_prompt.lock().expect("prompt lock") = Some(prompt.to_string());
        (self.reply)()
    }
}

#[tokio::test]
async fn plain_json_output_is_parsed() {
    let model = FakeModel::replying(r#"{"invoice_number": "42"}"#);
    let value = structure_ocr_text(&model, "Invoice #42").await;
    assert_eq!(value, json!({ "invoice_number": "42" }));
}

#[tokio::test]
async fn fenced_json_output_is_stripped() {
    let model = FakeModel::replying("```json\n{\"name\": \"John\"}\n```");
    let value = structure_ocr_text(&model, "Name : John").await;
    assert_eq!(value, json!({ "name": "John" }));
}

#[tokio::test]
async fn bare_fence_is_also_stripped() {
    let model = FakeModel::replying("```\n{\"ok\": true}\n```");
    let value = structure_ocr_text(&model, "").await;
    assert_eq!(value, json!({ "ok": true }));
}

#[tokio::test]
async fn unparseable_output_falls_back_with_original_text() {
    let model = FakeModel::replying("not json");
    let value = structure_ocr_text(&model, "the ocr text").await;
    let error = value["error"].as_str().expect("error field");
    assert!(error.starts_with("failed to parse model output as JSON"));
    // The fallback carries the OCR text, never the model output.
    assert_eq!(value["raw_text"], "the ocr text");
    assert!(!value.to_string().contains("not json"));
}

#[tokio::test]
async fn model_failure_falls_back_with_error_message() {
    let model = FakeModel::failing(|| AppError::ProviderTimeout);
    let value = structure_ocr_text(&model, "some text").await;
    assert!(value["error"].as_str().expect("error field").contains("provider timeout"));
    assert_eq!(value["raw_text"], "some text");
}

#[tokio::test]
async fn prompt_embeds_the_ocr_text() {
    let model = FakeModel::replying("{}");
    structure_ocr_text(&model, "UNIQUE-MARKER-TEXT").await;
    let prompt = model
        .last_prompt
        .lock()
        .expect("prompt lock")
        .clone()
        .expect("prompt captured");
    assert!(prompt.contains("UNIQUE-MARKER-TEXT"));
    assert!(prompt.contains("valid JSON object"));
}

#[test]
fn parse_model_output_accepts_empty_input_as_failure() {
    let value = parse_model_output("", "original");
    assert!(value.get("error").is_some());
    assert_eq!(value["raw_text"], "original");
}

#[test]
fn parse_model_output_tolerates_surrounding_whitespace() {
    let value = parse_model_output("  \n {\"a\": 1} \n ", "ignored");
    assert_eq!(value, json!({ "a": 1 }));
}
