use anyhow::Context;
use chrono::NaiveDateTime;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, Row};

use crate::models::document::TIMESTAMP_FORMAT;
use crate::models::{Document, FieldValue, Fields, Filter};

const DOCUMENT_COLUMNS: &str = "id, fields, created_at";

/// Field names end up inside a JSON path literal, so only identifiers pass.
pub fn is_valid_field_name(field: &str) -> bool {
    let mut chars = field.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn value_param(value: &FieldValue) -> Box<dyn ToSql> {
    match value {
        FieldValue::Integer(n) => Box::new(*n),
        other => Box::new(other.to_text()),
    }
}

fn where_clause(
    collection: &str,
    filters: &[Filter],
) -> anyhow::Result<(String, Vec<Box<dyn ToSql>>)> {
    let mut sql = String::from("collection = ?1");
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(collection.to_string())];

    for filter in filters {
        anyhow::ensure!(
            is_valid_field_name(&filter.field),
            "invalid field name: {}",
            filter.field
        );
        params_vec.push(value_param(&filter.value));
        sql.push_str(&format!(
            " AND json_extract(fields, '$.{}') = ?{}",
            filter.field,
            params_vec.len()
        ));
    }

    Ok((sql, params_vec))
}

fn parse_document_row(row: &Row) -> rusqlite::Result<anyhow::Result<Document>> {
    let id: String = row.get(0)?;
    let fields_json: String = row.get(1)?;
    let created_at_str: String = row.get(2)?;
    Ok(decode_document(id, &fields_json, &created_at_str))
}

fn decode_document(id: String, fields_json: &str, created_at: &str) -> anyhow::Result<Document> {
    let fields: Fields = serde_json::from_str(fields_json)
        .with_context(|| format!("corrupt fields in document {id}"))?;
    let created_at = NaiveDateTime::parse_from_str(created_at, TIMESTAMP_FORMAT)
        .with_context(|| format!("corrupt timestamp in document {id}"))?;
    Ok(Document {
        id,
        fields,
        created_at,
    })
}

pub fn insert_document(conn: &Connection, collection: &str, doc: &Document) -> anyhow::Result<()> {
    let fields_json = serde_json::to_string(&doc.fields)?;
    let created_at = doc.created_at.format(TIMESTAMP_FORMAT).to_string();

    conn.execute(
        "INSERT INTO documents (id, collection, fields, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![doc.id, collection, fields_json, created_at],
    )?;
    Ok(())
}

pub fn find_documents(
    conn: &Connection,
    collection: &str,
    filters: &[Filter],
) -> anyhow::Result<Vec<Document>> {
    let (clause, params_vec) = where_clause(collection, filters)?;
    let sql = format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE {clause} ORDER BY created_at ASC, rowid ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), parse_document_row)?;

    let mut documents = vec![];
    for row in rows {
        documents.push(row??);
    }
    Ok(documents)
}

pub fn count_documents(
    conn: &Connection,
    collection: &str,
    filters: &[Filter],
) -> anyhow::Result<usize> {
    let (clause, params_vec) = where_clause(collection, filters)?;
    let sql = format!("SELECT COUNT(*) FROM documents WHERE {clause}");

    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let count: i64 = conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or(0))
}

pub fn get_document(
    conn: &Connection,
    collection: &str,
    id: &str,
) -> anyhow::Result<Option<Document>> {
    let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE collection = ?1 AND id = ?2");
    let result = conn.query_row(&sql, params![collection, id], parse_document_row);

    match result {
        Ok(doc) => Ok(Some(doc?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
