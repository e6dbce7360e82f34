//! The metadata catalog handle.
//!
//! [`Catalog`] is constructed once at startup and cloned into every
//! component that needs it. Writes go through a single lock so that
//! `create`/`delete` are serialized relative to each other; reads take a
//! pooled connection and never wait on that lock. Every statement runs in
//! autocommit mode, so a record returned by [`Catalog::create`] is visible
//! to any read issued afterwards.

use std::sync::Arc;

use fc_core::{FileId, Result};
use parking_lot::Mutex;

use crate::models::{FileRecord, NewFileRecord};
use crate::pool::{get_conn, init_memory_pool, init_pool, DbPool};
use crate::queries::files;

/// Largest page a caller may request.
pub const MAX_PER_PAGE: u32 = 100;

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<FileRecord>,
    /// 1-based page number actually served.
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
}

/// Durable store of file records.
#[derive(Clone)]
pub struct Catalog {
    pool: DbPool,
    write_lock: Arc<Mutex<()>>,
}

impl Catalog {
    /// Open (or create) the catalog database at `db_path`.
    pub fn open(db_path: &str) -> Result<Self> {
        Ok(Self::from_pool(init_pool(db_path)?))
    }

    /// A private in-memory catalog.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_pool(init_memory_pool()?))
    }

    /// Wrap an already-initialized pool.
    pub fn from_pool(pool: DbPool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Insert a record and return it with its assigned id.
    pub fn create(&self, new: &NewFileRecord) -> Result<FileRecord> {
        let conn = get_conn(&self.pool)?;
        let _guard = self.write_lock.lock();
        let record = files::create_file(&conn, new)?;
        tracing::debug!(file_id = %record.id, stored_name = %record.stored_name, "Catalog record created");
        Ok(record)
    }

    /// Look up a record by id.
    pub fn get_by_id(&self, id: FileId) -> Result<Option<FileRecord>> {
        let conn = get_conn(&self.pool)?;
        files::get_file(&conn, id)
    }

    /// Fetch one page of records in insertion order.
    ///
    /// `page` is 1-based (0 is treated as 1) and `per_page` is clamped to
    /// `1..=MAX_PER_PAGE`.
    pub fn list(&self, page: u32, per_page: u32) -> Result<Page> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let offset = i64::from(page - 1) * i64::from(per_page);

        let conn = get_conn(&self.pool)?;
        let items = files::list_files(&conn, offset, i64::from(per_page))?;
        let total = files::count_files(&conn)?;

        Ok(Page {
            items,
            page,
            per_page,
            total_items: total.max(0) as u64,
        })
    }

    /// Case-insensitive substring match on the original file name.
    pub fn search(&self, keyword: &str) -> Result<Vec<FileRecord>> {
        let conn = get_conn(&self.pool)?;
        files::search_files(&conn, keyword.trim())
    }

    /// Remove a record, returning it if it existed.
    pub fn delete(&self, id: FileId) -> Result<Option<FileRecord>> {
        let conn = get_conn(&self.pool)?;
        let _guard = self.write_lock.lock();
        let Some(record) = files::get_file(&conn, id)? else {
            return Ok(None);
        };
        files::delete_file(&conn, id)?;
        tracing::debug!(file_id = %id, "Catalog record deleted");
        Ok(Some(record))
    }

    /// Sum of all recorded artifact sizes.
    pub fn total_bytes(&self) -> Result<u64> {
        let conn = get_conn(&self.pool)?;
        files::total_size(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(n: usize) -> NewFileRecord {
        NewFileRecord {
            stored_name: format!("stored-{n}.mp4"),
            original_name: format!("clip {n}.mp4"),
            title: Some(format!("Clip {n}")),
            uploader: "ana".into(),
            storage_path: format!("/content/stored-{n}.mp4"),
            is_streamable: n % 2 == 0,
            size_bytes: n as u64,
            mime_type: "video/mp4".into(),
        }
    }

    #[test]
    fn create_then_read_is_visible() {
        let catalog = Catalog::in_memory().unwrap();
        let rec = catalog.create(&new_record(1)).unwrap();

        let fetched = catalog.get_by_id(rec.id).unwrap().unwrap();
        assert_eq!(fetched.original_name, "clip 1.mp4");
        assert_eq!(fetched.title.as_deref(), Some("Clip 1"));

        let page = catalog.list(1, 20).unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].id, rec.id);
    }

    #[test]
    fn consecutive_pages_cover_first_forty_in_order() {
        let catalog = Catalog::in_memory().unwrap();
        let ids: Vec<FileId> = (0..45)
            .map(|n| catalog.create(&new_record(n)).unwrap().id)
            .collect();

        let p1 = catalog.list(1, 20).unwrap();
        let p2 = catalog.list(2, 20).unwrap();
        let listed: Vec<FileId> = p1.items.iter().chain(&p2.items).map(|r| r.id).collect();

        assert_eq!(listed, ids[..40].to_vec());
        assert_eq!(p1.total_items, 45);
        assert_eq!(p2.page, 2);
    }

    #[test]
    fn page_arguments_are_normalized() {
        let catalog = Catalog::in_memory().unwrap();
        for n in 0..3 {
            catalog.create(&new_record(n)).unwrap();
        }

        let page = catalog.list(0, 0).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 1);
        assert_eq!(page.items.len(), 1);

        let page = catalog.list(1, 10_000).unwrap();
        assert_eq!(page.per_page, MAX_PER_PAGE);
        assert_eq!(page.items.len(), 3);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let catalog = Catalog::in_memory().unwrap();
        catalog.create(&new_record(1)).unwrap();
        let page = catalog.list(5, 20).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_items, 1);
    }

    #[test]
    fn search_trims_keyword() {
        let catalog = Catalog::in_memory().unwrap();
        catalog.create(&new_record(7)).unwrap();
        assert_eq!(catalog.search("  CLIP 7 ").unwrap().len(), 1);
        assert!(catalog.search("nothing").unwrap().is_empty());
    }

    #[test]
    fn concurrent_creates_get_distinct_ids() {
        let catalog = Catalog::in_memory().unwrap();
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let catalog = catalog.clone();
                std::thread::spawn(move || catalog.create(&new_record(n)).unwrap().id)
            })
            .collect();

        let mut ids: Vec<FileId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn delete_and_total_bytes() {
        let catalog = Catalog::in_memory().unwrap();
        let a = catalog.create(&new_record(10)).unwrap();
        catalog.create(&new_record(20)).unwrap();
        assert_eq!(catalog.total_bytes().unwrap(), 30);

        let removed = catalog.delete(a.id).unwrap().unwrap();
        assert_eq!(removed.id, a.id);
        assert!(catalog.delete(a.id).unwrap().is_none());
        assert!(catalog.get_by_id(a.id).unwrap().is_none());
        assert_eq!(catalog.total_bytes().unwrap(), 20);
    }
}
