use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::core::{
    errors::{AppError, AppResult},
    types::DocumentRecord,
};

const DOCUMENT_COLUMNS: &str =
    "id, filename, storage_key, content_type, size_bytes, checksum, ocr_json, created_at, updated_at";

fn parse_timestamp(value: String) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|err| AppError::Database(format!("invalid timestamp {value}: {err}")))
}

pub struct NewDocument<'a> {
    pub filename: &'a str,
    pub storage_key: &'a str,
    pub content_type: &'a str,
    pub size_bytes: i64,
    pub checksum: &'a str,
}

pub async fn insert_document(pool: &SqlitePool, document: NewDocument<'_>) -> AppResult<DocumentRecord> {
    let id = sqlx::query(
        r#"
        INSERT INTO documents (filename, storage_key, content_type, size_bytes, checksum)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(document.filename)
    .bind(document.storage_key)
    .bind(document.content_type)
    .bind(document.size_bytes)
    .bind(document.checksum)
    .execute(pool)
    .await?
    .last_insert_rowid();

    get_document(pool, id).await
}

pub async fn list_documents(pool: &SqlitePool) -> AppResult<Vec<DocumentRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_document).collect()
}

pub async fn get_document(pool: &SqlitePool, document_id: i64) -> AppResult<DocumentRecord> {
    let row = sqlx::query(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"
    ))
    .bind(document_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("document {document_id}")))?;

    map_document(row)
}

pub async fn delete_document(pool: &SqlitePool, document_id: i64) -> AppResult<bool> {
    let changed = sqlx::query("DELETE FROM documents WHERE id = ?1")
        .bind(document_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(changed > 0)
}

/// Writes the terminal OCR payload for a document. Each call runs in its own
/// transaction on a freshly acquired connection, so a failed attempt never
/// poisons a later retry.
pub async fn set_ocr_payload(pool: &SqlitePool, document_id: i64, payload: &Value) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    let changed = sqlx::query(
        r#"
        UPDATE documents
        SET ocr_json = ?2, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?1
        "#,
    )
    .bind(document_id)
    .bind(payload.to_string())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if changed == 0 {
        return Err(AppError::NotFound(format!("document {document_id}")));
    }
    tx.commit().await?;
    Ok(())
}

fn map_document(row: sqlx::sqlite::SqliteRow) -> AppResult<DocumentRecord> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: Option<String> = row.try_get("updated_at")?;
    let ocr_json: Option<String> = row.try_get("ocr_json")?;
    let ocr_data = ocr_json
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|err| AppError::Database(format!("stored OCR payload unreadable: {err}")))?;

    Ok(DocumentRecord {
        id: row.try_get("id")?,
        filename: row.try_get("filename")?,
        storage_key: row.try_get("storage_key")?,
        content_type: row.try_get("content_type")?,
        size_bytes: row.try_get("size_bytes")?,
        checksum: row.try_get("checksum")?,
        ocr_data,
        created_at: parse_timestamp(created_at)?,
        updated_at: updated_at.map(parse_timestamp).transpose()?,
    })
}
