//! File-record CRUD operations.

use chrono::Utc;
use fc_core::{Error, FileId, Result};
use rusqlite::Connection;

use crate::models::{FileRecord, NewFileRecord};

pub(crate) const COLS: &str = "id, stored_name, original_name, title, uploader, created_at,
    storage_path, is_streamable, size_bytes, mime_type";

/// Insert a new file record and return it with its assigned id.
pub fn create_file(conn: &Connection, new: &NewFileRecord) -> Result<FileRecord> {
    let created_at = Utc::now().to_rfc3339();
    let size = i64::try_from(new.size_bytes)
        .map_err(|_| Error::Validation(format!("size {} out of range", new.size_bytes)))?;

    conn.execute(
        "INSERT INTO files (stored_name, original_name, title, uploader, created_at,
            storage_path, is_streamable, size_bytes, mime_type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            new.stored_name,
            new.original_name,
            new.title,
            new.uploader,
            created_at,
            new.storage_path,
            new.is_streamable as i32,
            size,
            new.mime_type,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(FileRecord {
        id: FileId::from(conn.last_insert_rowid()),
        stored_name: new.stored_name.clone(),
        original_name: new.original_name.clone(),
        title: new.title.clone(),
        uploader: new.uploader.clone(),
        created_at,
        storage_path: new.storage_path.clone(),
        is_streamable: new.is_streamable,
        size_bytes: new.size_bytes,
        mime_type: new.mime_type.clone(),
    })
}

/// Get a file record by id.
pub fn get_file(conn: &Connection, id: FileId) -> Result<Option<FileRecord>> {
    let q = format!("SELECT {COLS} FROM files WHERE id = ?1");
    let result = conn.query_row(&q, [id.get()], FileRecord::from_row);
    match result {
        Ok(rec) => Ok(Some(rec)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List records in insertion order.
pub fn list_files(conn: &Connection, offset: i64, limit: i64) -> Result<Vec<FileRecord>> {
    let q = format!("SELECT {COLS} FROM files ORDER BY id ASC LIMIT ?1 OFFSET ?2");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![limit, offset], FileRecord::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Count all records.
pub fn count_files(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}

/// Case-insensitive substring search on `original_name`, in insertion order.
pub fn search_files(conn: &Connection, keyword: &str) -> Result<Vec<FileRecord>> {
    let pattern = format!("%{}%", escape_like(keyword));
    let q = format!(
        "SELECT {COLS} FROM files WHERE original_name LIKE ?1 ESCAPE '\\' ORDER BY id ASC"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([pattern], FileRecord::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Delete a record by id. Returns whether a row was removed.
pub fn delete_file(conn: &Connection, id: FileId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM files WHERE id = ?1", [id.get()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Sum of all recorded artifact sizes.
pub fn total_size(conn: &Connection) -> Result<u64> {
    let total: i64 = conn
        .query_row("SELECT COALESCE(SUM(size_bytes), 0) FROM files", [], |row| {
            row.get(0)
        })
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(total.max(0) as u64)
}

/// Escape LIKE wildcards so the keyword matches literally.
fn escape_like(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
