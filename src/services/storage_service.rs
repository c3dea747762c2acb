//! src/services/storage_service.rs
//!
//! StorageService — bucket and object operations backed by plain files.
//! Bucket metadata lives in `base_path/buckets.csv`, object metadata in
//! `base_path/{bucket}/objects.csv` and payloads in `base_path/{bucket}/{key}`.
//! There is no in-memory cache: every call re-reads the catalog files.

use crate::{
    models::{
        bucket::{Bucket, BucketStatus},
        object::{DEFAULT_CONTENT_TYPE, Object},
    },
    services::{
        bucket_catalog::BucketCatalog, catalog_store::OBJECTS_CATALOG, lifecycle,
        locks::LockRegistry, name_validator::validate_bucket_name, object_catalog::ObjectCatalog,
    },
};
use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("bucket name not specified")]
    MissingBucketName,
    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),
    #[error("directory for bucket `{0}` already exists")]
    BucketDirectoryExists(String),
    #[error("bucket `{0}` is not empty")]
    BucketNotEmpty(String),
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("directory for bucket `{0}` does not exist")]
    BucketDirectoryMissing(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error("catalog {path} is corrupt: {reason}")]
    CorruptCatalog { path: String, reason: String },
    #[error("bucket `{0}` metadata does not match the filesystem")]
    CatalogDrift(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Directory under `base_path` where upload bodies are written before they
/// are moved into their bucket. Not a valid bucket name, so never a bucket.
const STAGING_DIR: &str = ".staging";

/// StorageService provides the S3-like operations:
/// - Create / list / describe / delete buckets
/// - Upload an object (streams bytes to disk, upserts its record, marks the
///   bucket active)
/// - Get object (opens the payload for streaming)
/// - Delete object (removes payload and record, recomputes bucket status)
///
/// Catalog mutations are serialized per bucket and for `buckets.csv`
/// through a shared [`LockRegistry`].
#[derive(Clone)]
pub struct StorageService {
    /// Base directory on disk holding catalogs and object payloads.
    pub base_path: PathBuf,

    buckets: BucketCatalog,
    locks: LockRegistry,
}

/// Reject keys that would escape or collide inside the flat bucket directory.
fn ensure_key_safe(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
        return Err(StorageError::InvalidObjectKey);
    }
    if key == "." || key == ".." || key == OBJECTS_CATALOG {
        return Err(StorageError::InvalidObjectKey);
    }
    if key
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'/' || b == b'\\')
    {
        return Err(StorageError::InvalidObjectKey);
    }
    Ok(())
}

/// Catalog timestamps carry whole seconds; drop the rest up front so the
/// value handed back equals the value read back later.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Copy `stream` into a new file at `path`, returning the byte count.
async fn write_stream<S>(path: &Path, stream: S) -> io::Result<u64>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let mut file = File::create(path).await?;
    let mut size: u64 = 0;
    pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        size += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(size)
}

impl StorageService {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        Self {
            buckets: BucketCatalog::new(base_path.clone()),
            base_path,
            locks: LockRegistry::new(),
        }
    }

    fn staging_dir(&self) -> PathBuf {
        self.base_path.join(STAGING_DIR)
    }

    /// Create the storage root and the upload staging area if missing.
    pub async fn prepare(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.base_path).await?;
        fs::create_dir_all(self.staging_dir()).await?;
        Ok(())
    }

    /// Resolve the directory of an existing bucket.
    ///
    /// Names that fail validation cannot belong to a bucket and are reported
    /// as not found.
    async fn existing_bucket_dir(&self, bucket: &str) -> StorageResult<PathBuf> {
        let not_found = || StorageError::BucketNotFound(bucket.to_string());
        validate_bucket_name(bucket).map_err(|_| not_found())?;

        let path = self.buckets.bucket_path(bucket);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Ok(path),
            Ok(_) => Err(not_found()),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(not_found()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Check, under the caller's bucket lock, that `bucket` still has both
    /// its directory and its catalog record before anything is written to it.
    async fn ensure_bucket_recorded(&self, bucket: &str, bucket_path: &Path) -> StorageResult<()> {
        // The bucket may have been deleted while the body was streaming.
        if !fs::try_exists(bucket_path).await.unwrap_or(false) {
            return Err(StorageError::BucketNotFound(bucket.to_string()));
        }
        let _catalog = self.locks.catalog().await;
        if self.buckets.find(bucket)?.is_none() {
            warn!("bucket directory `{}` has no catalog record", bucket);
            return Err(StorageError::CatalogDrift(bucket.to_string()));
        }
        Ok(())
    }

    /// Create a bucket and its directory.
    ///
    /// Holds the catalog lock throughout, so of two concurrent creates of the
    /// same name exactly one succeeds.
    pub async fn create_bucket(&self, name: &str) -> StorageResult<Bucket> {
        let _catalog = self.locks.catalog().await;
        self.buckets.create(name, now())
    }

    /// List all buckets in creation order.
    pub async fn list_buckets(&self) -> StorageResult<Vec<Bucket>> {
        let _catalog = self.locks.catalog().await;
        self.buckets.list()
    }

    /// Fetch one bucket together with its object records.
    pub async fn get_bucket(&self, name: &str) -> StorageResult<(Bucket, Vec<Object>)> {
        let bucket_path = self.existing_bucket_dir(name).await?;
        let _bucket = self.locks.bucket(name).await;
        let catalog = self.locks.catalog().await;
        let record = self
            .buckets
            .find(name)?
            .ok_or_else(|| StorageError::BucketNotFound(name.to_string()))?;
        drop(catalog);

        let objects = ObjectCatalog::for_bucket(bucket_path).list()?;
        Ok((record, objects))
    }

    /// Delete an empty bucket: directory first, then its record.
    pub async fn delete_bucket(&self, name: &str) -> StorageResult<()> {
        if name.is_empty() {
            return Err(StorageError::MissingBucketName);
        }
        // Invalid names never reach the lock registry.
        validate_bucket_name(name).map_err(|_| StorageError::BucketNotFound(name.to_string()))?;
        let _bucket = self.locks.bucket(name).await;
        let _catalog = self.locks.catalog().await;
        self.buckets.delete(name)
    }

    /// Stream-upload an object and update metadata.
    ///
    /// - Writes bytes incrementally to a staging file (no locks held).
    /// - Counts the size while streaming; the client cannot claim one.
    /// - Under the bucket lock, renames into place, upserts the record and
    ///   marks the bucket active.
    ///
    /// A failed transfer removes the staging file and leaves any previous
    /// version of the object untouched.
    pub async fn upload_object_stream<S>(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<String>,
        stream: S,
    ) -> StorageResult<Object>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        ensure_key_safe(key)?;
        let bucket_path = self.existing_bucket_dir(bucket).await?;

        let staging_dir = self.staging_dir();
        fs::create_dir_all(&staging_dir).await?;
        let tmp_path = staging_dir.join(format!("upload-{}", Uuid::new_v4()));
        let size = match write_stream(&tmp_path, stream).await {
            Ok(size) => size,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        };

        let _bucket = self.locks.bucket(bucket).await;
        if let Err(err) = self.ensure_bucket_recorded(bucket, &bucket_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        // Replaces any previous version in one step.
        let file_path = bucket_path.join(key);
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        let last_modified = now();
        let object = Object {
            key: key.to_string(),
            size,
            content_type: content_type
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            last_modified,
        };
        ObjectCatalog::for_bucket(&bucket_path).upsert(object.clone())?;

        let _catalog = self.locks.catalog().await;
        lifecycle::recompute(&self.base_path, bucket, last_modified, BucketStatus::Active)?;

        info!("stored `{}/{}` ({} bytes)", bucket, key, size);
        Ok(object)
    }

    /// Open an object for reading.
    ///
    /// Returns the open file and its length, ready for streaming out.
    pub async fn get_object_reader(&self, bucket: &str, key: &str) -> StorageResult<(File, u64)> {
        ensure_key_safe(key)?;
        let bucket_path = self.existing_bucket_dir(bucket).await?;
        let not_found = || StorageError::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };

        let file_path = bucket_path.join(key);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                not_found()
            } else {
                StorageError::Io(err)
            }
        })?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(not_found());
        }

        Ok((file, meta.len()))
    }

    /// Delete an object's payload and record, then recompute bucket status.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<Bucket> {
        ensure_key_safe(key)?;
        let bucket_path = self.existing_bucket_dir(bucket).await?;
        let _bucket = self.locks.bucket(bucket).await;

        let file_path = bucket_path.join(key);
        match fs::metadata(&file_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(StorageError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                });
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StorageError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                });
            }
            Err(err) => return Err(StorageError::Io(err)),
        }

        fs::remove_file(&file_path).await?;
        debug!("removed physical file {}", file_path.display());

        let objects = ObjectCatalog::for_bucket(&bucket_path);
        objects.remove(key)?;
        let status = BucketStatus::for_emptiness(objects.is_empty()?);

        let _catalog = self.locks.catalog().await;
        let updated = lifecycle::recompute(&self.base_path, bucket, now(), status)?;

        info!("deleted `{}/{}`", bucket, key);
        Ok(updated)
    }
}
