//! Per-bucket object catalog (`{bucket}/objects.csv`).

use crate::{
    models::object::Object,
    services::{
        catalog_store::{self, OBJECTS_CATALOG},
        storage_service::StorageResult,
    },
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Object records of one bucket, addressed by the bucket's directory.
#[derive(Clone, Debug)]
pub struct ObjectCatalog {
    bucket_path: PathBuf,
}

impl ObjectCatalog {
    pub fn for_bucket(bucket_path: impl Into<PathBuf>) -> Self {
        Self {
            bucket_path: bucket_path.into(),
        }
    }

    fn catalog_path(&self) -> PathBuf {
        self.bucket_path.join(OBJECTS_CATALOG)
    }

    /// All object records in catalog order. A bucket that never held an
    /// object has no catalog file yet and yields an empty list.
    pub fn list(&self) -> StorageResult<Vec<Object>> {
        catalog_store::load_or_empty(&self.catalog_path())
    }

    /// Number of object records, or `None` if the catalog file is absent.
    pub fn record_count(&self) -> StorageResult<Option<usize>> {
        Ok(catalog_store::load_all::<Object>(&self.catalog_path())?.map(|rows| rows.len()))
    }

    /// Replace the record with the same key, or append a new one.
    pub fn upsert(&self, record: Object) -> StorageResult<()> {
        let path = self.catalog_path();
        let mut records: Vec<Object> = catalog_store::load_or_empty(&path)?;

        match records.iter_mut().find(|existing| existing.key == record.key) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }

        catalog_store::replace_all(&path, &records)
    }

    /// Drop the record for `key`. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.catalog_path();
        let mut records: Vec<Object> = catalog_store::load_or_empty(&path)?;
        let before = records.len();
        records.retain(|existing| existing.key != key);
        if records.len() == before {
            debug!("no catalog row for `{}` in {}", key, path.display());
        }
        catalog_store::replace_all(&path, &records)
    }

    /// True when the bucket directory holds no regular files besides the
    /// catalog itself. Subdirectories are ignored.
    pub fn is_empty(&self) -> StorageResult<bool> {
        is_bucket_dir_empty(&self.bucket_path)
    }
}

fn is_bucket_dir_empty(bucket_path: &Path) -> StorageResult<bool> {
    for entry in std::fs::read_dir(bucket_path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        if entry.file_name() != OBJECTS_CATALOG {
            return Ok(false);
        }
    }
    Ok(true)
}
