pub mod blocks;
pub mod extract;

use serde_json::Value;

use crate::core::types::OcrResult;

use blocks::BlockGraph;

/// Bundles full text, line fragments, and the reconstructed form pairs into
/// one result. Pure composition; upstream failures never originate here.
pub fn assemble(graph: &BlockGraph) -> OcrResult {
    let (text, bounding_boxes) = extract::extract_lines(graph);
    let pairs = extract::extract_form_pairs(graph);
    let structured_data = Value::Object(
        pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    );

    OcrResult {
        text,
        bounding_boxes,
        structured_data,
    }
}
