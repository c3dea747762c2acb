//! Keeps a bucket's status and last-modified time in step with its objects.

use crate::{
    models::bucket::{Bucket, BucketStatus},
    services::{
        catalog_store::{self, BUCKETS_CATALOG},
        storage_service::{StorageError, StorageResult},
    },
};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, warn};

/// Stamp `bucket_name` with `now` and `status` and persist the catalog.
///
/// The caller decides the status: uploads force `Active`, object deletions
/// pass the result of an emptiness check. A missing catalog or record means
/// metadata and filesystem have drifted apart and is reported as such.
pub fn recompute(
    base_dir: &Path,
    bucket_name: &str,
    now: DateTime<Utc>,
    status: BucketStatus,
) -> StorageResult<Bucket> {
    let path = base_dir.join(BUCKETS_CATALOG);
    let drift = || {
        warn!("bucket `{}` has a directory but no catalog record", bucket_name);
        StorageError::CatalogDrift(bucket_name.to_string())
    };

    let mut buckets: Vec<Bucket> = catalog_store::load_all(&path)?.ok_or_else(drift)?;
    let bucket = buckets
        .iter_mut()
        .find(|b| b.name == bucket_name)
        .ok_or_else(drift)?;

    bucket.last_modified = now;
    bucket.status = status;
    let updated = bucket.clone();

    catalog_store::replace_all(&path, &buckets)?;
    debug!("bucket `{}` is now {}", bucket_name, status);
    Ok(updated)
}
