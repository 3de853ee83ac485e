use async_trait::async_trait;
use aws_sdk_textract::{
    config::{Credentials, Region},
    types as sdk,
    types::{Document, FeatureType, S3Object},
    Client,
};

use crate::core::config::Settings;
use crate::core::errors::{AppError, AppResult};
use crate::ocr::blocks::{
    Block, BlockGraph, BlockKind, BoundingBox, EntityRole, Geometry, RelationKind, Relationship,
};

use super::DocumentAnalyzer;

/// Canonical message the upstream service produces for non-PDF/image input;
/// preserved verbatim so persisted soft-error payloads stay recognizable.
pub const UNSUPPORTED_DOCUMENT_MESSAGE: &str = "An error occurred (UnsupportedDocumentException) \
     when calling the AnalyzeDocument operation: Request has unsupported document format";

#[derive(Debug, Clone)]
pub struct TextractAnalyzer {
    client: Client,
    bucket: String,
}

impl TextractAnalyzer {
    pub fn new(settings: &Settings) -> Self {
        let credentials = Credentials::new(
            settings.aws_access_key_id.clone(),
            settings.aws_secret_access_key.clone(),
            None,
            None,
            "formlift",
        );
        let config = aws_sdk_textract::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(settings.aws_region.clone()))
            .behavior_version_latest()
            .build();

        Self {
            client: Client::from_conf(config),
            bucket: settings.s3_bucket.clone(),
        }
    }
}

#[async_trait]
impl DocumentAnalyzer for TextractAnalyzer {
    async fn analyze(&self, storage_key: &str) -> AppResult<BlockGraph> {
        let document = Document::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&self.bucket)
                    .name(storage_key)
                    .build(),
            )
            .build();

        let output = self
            .client
            .analyze_document()
            .document(document)
            .feature_types(FeatureType::Tables)
            .feature_types(FeatureType::Forms)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service_err) if service_err.is_unsupported_document_exception() => {
                    AppError::UnsupportedDocument(UNSUPPORTED_DOCUMENT_MESSAGE.to_string())
                }
                _ => AppError::Network(err.to_string()),
            })?;

        let blocks = output
            .blocks()
            .iter()
            .map(convert_block)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(BlockGraph::new(blocks))
    }
}

fn convert_block(raw: &sdk::Block) -> AppResult<Block> {
    let id = raw
        .id()
        .map(str::to_string)
        .ok_or_else(|| AppError::AnalysisMalformed("block without an id".to_string()))?;

    let block_type = raw.block_type().map_or(BlockKind::Other, |kind| match kind {
        sdk::BlockType::Line => BlockKind::Line,
        sdk::BlockType::Word => BlockKind::Word,
        sdk::BlockType::KeyValueSet => BlockKind::KeyValueSet,
        _ => BlockKind::Other,
    });

    let entity_types = raw
        .entity_types()
        .iter()
        .map(|role| match role {
            sdk::EntityType::Key => EntityRole::Key,
            sdk::EntityType::Value => EntityRole::Value,
            _ => EntityRole::Other,
        })
        .collect();

    let geometry = raw.geometry().map(|geometry| Geometry {
        bounding_box: geometry.bounding_box().map(|bbox| BoundingBox {
            left: f64::from(bbox.left()),
            top: f64::from(bbox.top()),
            width: f64::from(bbox.width()),
            height: f64::from(bbox.height()),
        }),
    });

    let relationships = raw
        .relationships()
        .iter()
        .map(|relationship| Relationship {
            kind: relationship.r#type().map_or(RelationKind::Other, |kind| match kind {
                sdk::RelationshipType::Child => RelationKind::Child,
                sdk::RelationshipType::Value => RelationKind::Value,
                _ => RelationKind::Other,
            }),
            ids: relationship.ids().iter().map(ToString::to_string).collect(),
        })
        .collect();

    Ok(Block {
        id,
        block_type,
        text: raw.text().map(str::to_string),
        entity_types,
        confidence: raw.confidence().map(f64::from),
        geometry,
        relationships,
    })
}
