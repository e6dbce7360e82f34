//! Rust structs mapping to database tables.

use fc_core::FileId;

/// One uploaded artifact as recorded in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: FileId,
    /// Collision-free name of the artifact inside the content root.
    pub stored_name: String,
    /// Name the uploader's client supplied.
    pub original_name: String,
    pub title: Option<String>,
    pub uploader: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
    pub storage_path: String,
    pub is_streamable: bool,
    pub size_bytes: u64,
    pub mime_type: String,
}

impl FileRecord {
    /// Build from a row selected with [`crate::queries::files::COLS`].
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let size: i64 = row.get(8)?;
        Ok(Self {
            id: FileId::from(row.get::<_, i64>(0)?),
            stored_name: row.get(1)?,
            original_name: row.get(2)?,
            title: row.get(3)?,
            uploader: row.get(4)?,
            created_at: row.get(5)?,
            storage_path: row.get(6)?,
            is_streamable: row.get::<_, i32>(7)? != 0,
            size_bytes: u64::try_from(size).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    8,
                    rusqlite::types::Type::Integer,
                    Box::new(e),
                )
            })?,
            mime_type: row.get(9)?,
        })
    }
}

/// Everything the catalog needs to insert a record; the id and timestamp
/// are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub stored_name: String,
    pub original_name: String,
    pub title: Option<String>,
    pub uploader: String,
    pub storage_path: String,
    pub is_streamable: bool,
    pub size_bytes: u64,
    pub mime_type: String,
}
