//! Data model for the document-analysis response graph.
//!
//! The analysis service returns a flat list of blocks connected by typed
//! relationships referencing block ids. Blocks are immutable for the duration
//! of one analysis; the id index is rebuilt per traversal and never cached
//! across requests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    #[serde(rename = "LINE")]
    Line,
    #[serde(rename = "WORD")]
    Word,
    #[serde(rename = "KEY_VALUE_SET")]
    KeyValueSet,
    /// Any other block type (PAGE, TABLE, CELL, ...) is retained but opaque.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityRole {
    #[serde(rename = "KEY")]
    Key,
    #[serde(rename = "VALUE")]
    Value,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    #[serde(rename = "CHILD")]
    Child,
    #[serde(rename = "VALUE")]
    Value,
    #[serde(other)]
    Other,
}

/// A typed, directed edge from one block to an ordered list of target ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "Type")]
    pub kind: RelationKind,
    #[serde(rename = "Ids", default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    pub id: String,
    pub block_type: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_types: Vec<EntityRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
}

impl Block {
    pub fn is_key(&self) -> bool {
        self.entity_types.contains(&EntityRole::Key)
    }

    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        self.geometry.as_ref().and_then(|geometry| geometry.bounding_box.as_ref())
    }
}

/// The parsed analysis response: an ordered block list plus id lookups.
#[derive(Debug, Clone, Default)]
pub struct BlockGraph {
    pub blocks: Vec<Block>,
}

impl BlockGraph {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Parses a raw analysis response. Fails only when the response is not a
    /// list of block-shaped structures; downstream traversal tolerates
    /// everything else (unknown types, dangling ids, missing geometry).
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let raw = value
            .get("Blocks")
            .ok_or_else(|| AppError::AnalysisMalformed("response carries no Blocks list".to_string()))?;
        let blocks: Vec<Block> = serde_json::from_value(raw.clone())
            .map_err(|err| AppError::AnalysisMalformed(err.to_string()))?;
        Ok(Self { blocks })
    }

    /// Id lookup table for relationship resolution, built fresh per call.
    pub fn index(&self) -> HashMap<&str, &Block> {
        self.blocks.iter().map(|block| (block.id.as_str(), block)).collect()
    }
}
