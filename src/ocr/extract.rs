//! Line and form-pair extraction over a parsed block graph.

use std::collections::HashMap;

use crate::core::types::TextFragment;

use super::blocks::{Block, BlockGraph, BlockKind, RelationKind};

/// Walks LINE blocks in response order, accumulating `text + "\n"` into the
/// full-text buffer and emitting one positioned fragment per line that
/// carries geometry. Lines without geometry still contribute text.
pub fn extract_lines(graph: &BlockGraph) -> (String, Vec<TextFragment>) {
    let mut full_text = String::new();
    let mut fragments = Vec::new();

    for block in &graph.blocks {
        if block.block_type != BlockKind::Line {
            continue;
        }
        let text = block.text.clone().unwrap_or_default();
        full_text.push_str(&text);
        full_text.push('\n');

        if let Some(bbox) = block.bounding_box() {
            fragments.push(TextFragment {
                x: bbox.left,
                y: bbox.top,
                width: bbox.width,
                height: bbox.height,
                page: 1,
                text,
                confidence: block.confidence.unwrap_or(0.0),
            });
        }
    }

    (full_text, fragments)
}

/// Reconstructs logical key→value form pairs from KEY_VALUE_SET blocks.
///
/// The format encodes a two-level indirection: a KEY block's CHILD words form
/// the key text, its VALUE relationship points at a holder block, and the
/// holder's CHILD words form the value text. Pairs where either side trims to
/// empty are dropped; a later duplicate key overwrites an earlier one.
pub fn extract_form_pairs(graph: &BlockGraph) -> HashMap<String, String> {
    let index = graph.index();
    let mut pairs = HashMap::new();

    for block in &graph.blocks {
        if block.block_type != BlockKind::KeyValueSet || !block.is_key() {
            continue;
        }

        let key_text = child_words(block, &index).trim().to_string();

        let mut value_buffer = String::new();
        for relationship in &block.relationships {
            if relationship.kind != RelationKind::Value {
                continue;
            }
            for target in &relationship.ids {
                if let Some(holder) = index.get(target.as_str()) {
                    value_buffer.push_str(&child_words(holder, &index));
                }
            }
        }
        let value_text = value_buffer.trim().to_string();

        if !key_text.is_empty() && !value_text.is_empty() {
            pairs.insert(key_text, value_text);
        }
    }

    pairs
}

/// Space-joins the WORD children of a block, in relationship list order.
/// Unresolved target ids contribute nothing. The trailing space is left for
/// the caller to trim so value buffers can accumulate across holders.
fn child_words(block: &Block, index: &HashMap<&str, &Block>) -> String {
    let mut buffer = String::new();
    for relationship in &block.relationships {
        if relationship.kind != RelationKind::Child {
            continue;
        }
        for target in &relationship.ids {
            let Some(child) = index.get(target.as_str()) else {
                continue;
            };
            if child.block_type != BlockKind::Word {
                continue;
            }
            if let Some(text) = &child.text {
                buffer.push_str(text);
                buffer.push(' ');
            }
        }
    }
    buffer
}
