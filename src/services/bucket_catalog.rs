//! Top-level bucket catalog (`buckets.csv`) and the bucket directories it
//! describes.
//!
//! Directory and record changes are separate steps. Two windows are left
//! open on purpose and reported rather than repaired:
//! - create: the directory exists but the append failed (orphan directory,
//!   later creates of the same name get `BucketDirectoryExists`);
//! - delete: the directory is gone but the rewrite failed (dangling record,
//!   later deletes get `BucketDirectoryMissing`).

use crate::{
    models::bucket::Bucket,
    services::{
        catalog_store::{self, BUCKETS_CATALOG},
        name_validator::validate_bucket_name,
        object_catalog::ObjectCatalog,
        storage_service::{StorageError, StorageResult},
    },
};
use chrono::{DateTime, Utc};
use std::{io::ErrorKind, path::PathBuf};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct BucketCatalog {
    base_dir: PathBuf,
}

impl BucketCatalog {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn catalog_path(&self) -> PathBuf {
        self.base_dir.join(BUCKETS_CATALOG)
    }

    /// Directory backing `name`. Does not check for existence.
    pub fn bucket_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// All buckets in insertion order. One bad row fails the listing.
    pub fn list(&self) -> StorageResult<Vec<Bucket>> {
        catalog_store::load_or_empty(&self.catalog_path())
    }

    pub fn find(&self, name: &str) -> StorageResult<Option<Bucket>> {
        Ok(self.list()?.into_iter().find(|b| b.name == name))
    }

    /// Validate, check uniqueness against records and disk, create the
    /// directory, then append the record.
    pub fn create(&self, name: &str, now: DateTime<Utc>) -> StorageResult<Bucket> {
        validate_bucket_name(name)?;

        if self.find(name)?.is_some() {
            return Err(StorageError::BucketAlreadyExists(name.to_string()));
        }

        let bucket_path = self.bucket_path(name);
        match std::fs::create_dir(&bucket_path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                warn!(
                    "directory {} exists without a catalog record",
                    bucket_path.display()
                );
                return Err(StorageError::BucketDirectoryExists(name.to_string()));
            }
            Err(err) => return Err(StorageError::Io(err)),
        }

        let bucket = Bucket::new(name, now);
        if let Err(err) = catalog_store::append(&self.catalog_path(), &bucket) {
            warn!(
                "bucket directory {} created but its record was not written: {}",
                bucket_path.display(),
                err
            );
            return Err(err);
        }

        info!("created bucket `{}`", name);
        Ok(bucket)
    }

    /// Remove an empty bucket: directory first, then its record.
    pub fn delete(&self, name: &str) -> StorageResult<()> {
        if name.is_empty() {
            return Err(StorageError::MissingBucketName);
        }
        if validate_bucket_name(name).is_err() {
            return Err(StorageError::BucketNotFound(name.to_string()));
        }

        let path = self.catalog_path();
        let mut buckets: Vec<Bucket> = catalog_store::load_all(&path)?
            .ok_or_else(|| StorageError::BucketNotFound(name.to_string()))?;
        if !buckets.iter().any(|b| b.name == name) {
            return Err(StorageError::BucketNotFound(name.to_string()));
        }

        let bucket_path = self.bucket_path(name);
        if !bucket_path.is_dir() {
            warn!("bucket `{}` has a record but no directory", name);
            return Err(StorageError::BucketDirectoryMissing(name.to_string()));
        }

        if let Some(count) = ObjectCatalog::for_bucket(&bucket_path).record_count()? {
            if count > 0 {
                return Err(StorageError::BucketNotEmpty(name.to_string()));
            }
        }

        std::fs::remove_dir_all(&bucket_path)?;

        buckets.retain(|b| b.name != name);
        if let Err(err) = catalog_store::replace_all(&path, &buckets) {
            warn!(
                "bucket directory {} removed but its record was not: {}",
                bucket_path.display(),
                err
            );
            return Err(err);
        }

        info!("deleted bucket `{}`", name);
        Ok(())
    }
}
