//! Flat CSV catalog files: read-all, atomic replace-all and append.
//!
//! Every logical edit of a catalog is "read all rows, transform in memory,
//! replace the whole file". The replace goes through a temporary file in the
//! same directory that is fsynced and then renamed over the target, so a
//! reader sees either the old or the new file, never a torn one.
//!
//! Nothing here serializes writers; see `locks::LockRegistry`.

use crate::{
    models::{
        bucket::{Bucket, BucketStatus},
        object::Object,
    },
    services::storage_service::{StorageError, StorageResult},
};
use chrono::{DateTime, SecondsFormat, Utc};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::{
    fs::{File, OpenOptions},
    io::{self, ErrorKind},
    path::Path,
};
use tempfile::NamedTempFile;
use tracing::debug;

/// Name of the top-level bucket catalog inside the storage directory.
pub const BUCKETS_CATALOG: &str = "buckets.csv";

/// Name of the per-bucket object catalog inside each bucket directory.
pub const OBJECTS_CATALOG: &str = "objects.csv";

/// Mode of a newly created catalog file.
#[cfg(unix)]
const CATALOG_FILE_MODE: u32 = 0o644;

/// A struct that can be stored as one row of a catalog file.
pub trait CatalogRecord: Sized {
    /// Number of columns in the on-disk row.
    const FIELDS: usize;

    fn to_row(&self) -> Vec<String>;

    /// Decode a row. `Err` carries a human-readable reason.
    fn from_row(row: &StringRecord) -> Result<Self, String>;
}

/// Render a timestamp the way catalogs store it (RFC 3339, UTC, seconds).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(raw: &str, field: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| format!("invalid {} `{}`: {}", field, raw, err))
}

impl CatalogRecord for Bucket {
    const FIELDS: usize = 4;

    fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            format_timestamp(&self.created_at),
            format_timestamp(&self.last_modified),
            self.status.as_str().to_string(),
        ]
    }

    fn from_row(row: &StringRecord) -> Result<Self, String> {
        Ok(Bucket {
            name: row[0].to_string(),
            created_at: parse_timestamp(&row[1], "creation time")?,
            last_modified: parse_timestamp(&row[2], "last modified time")?,
            status: row[3].parse::<BucketStatus>()?,
        })
    }
}

impl CatalogRecord for Object {
    const FIELDS: usize = 4;

    fn to_row(&self) -> Vec<String> {
        vec![
            self.key.clone(),
            self.size.to_string(),
            self.content_type.clone(),
            format_timestamp(&self.last_modified),
        ]
    }

    fn from_row(row: &StringRecord) -> Result<Self, String> {
        let size = row[1]
            .parse::<u64>()
            .map_err(|err| format!("invalid size `{}`: {}", &row[1], err))?;
        Ok(Object {
            key: row[0].to_string(),
            size,
            content_type: row[2].to_string(),
            last_modified: parse_timestamp(&row[3], "last modified time")?,
        })
    }
}

/// Read every row of `path` in file order.
///
/// Returns `Ok(None)` when the file does not exist; callers decide whether
/// that means "no records" or something worse. Any undecodable row fails the
/// whole read.
pub fn load_all<R: CatalogRecord>(path: &Path) -> StorageResult<Option<Vec<R>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StorageError::Io(err)),
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row?;
        if row.len() != R::FIELDS {
            return Err(StorageError::CorruptCatalog {
                path: path.display().to_string(),
                reason: format!(
                    "row {} has {} fields, expected {}",
                    idx + 1,
                    row.len(),
                    R::FIELDS
                ),
            });
        }
        let record = R::from_row(&row).map_err(|reason| StorageError::CorruptCatalog {
            path: path.display().to_string(),
            reason: format!("row {}: {}", idx + 1, reason),
        })?;
        records.push(record);
    }

    Ok(Some(records))
}

/// Like [`load_all`], treating a missing file as an empty catalog.
pub fn load_or_empty<R: CatalogRecord>(path: &Path) -> StorageResult<Vec<R>> {
    Ok(load_all(path)?.unwrap_or_default())
}

/// Atomically replace the contents of `path` with `records`.
///
/// On any error before the final rename the temporary file is dropped
/// (and deleted) and `path` keeps its previous contents.
pub fn replace_all<R: CatalogRecord>(path: &Path, records: &[R]) -> StorageResult<()> {
    let parent = path.parent().ok_or_else(|| {
        StorageError::Io(io::Error::new(
            ErrorKind::InvalidInput,
            "catalog path has no parent directory",
        ))
    })?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(temp.as_file());
        for record in records {
            writer.write_record(record.to_row())?;
        }
        writer.flush()?;
    }
    carry_over_mode(temp.as_file(), path)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| StorageError::Io(err.error))?;

    debug!("rewrote {} with {} rows", path.display(), records.len());
    Ok(())
}

/// Give the replacement file the permissions of the file it replaces.
///
/// Temporary files start out owner-only; without this every rewrite would
/// narrow the catalog's mode.
#[cfg(unix)]
fn carry_over_mode(temp: &File, target: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = match std::fs::metadata(target) {
        Ok(meta) => meta.permissions().mode() & 0o7777,
        Err(err) if err.kind() == ErrorKind::NotFound => CATALOG_FILE_MODE,
        Err(err) => return Err(err),
    };
    temp.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn carry_over_mode(_temp: &File, _target: &Path) -> io::Result<()> {
    Ok(())
}

/// Append one row to `path`, creating the file if needed.
pub fn append<R: CatalogRecord>(path: &Path, record: &R) -> StorageResult<()> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(CATALOG_FILE_MODE);
    }
    let file = options.open(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(record.to_row())?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
    }

    fn make_object(key: &str, size: u64) -> Object {
        Object {
            key: key.to_string(),
            size,
            content_type: "text/plain; charset=utf-8".to_string(),
            last_modified: ts(size as i64),
        }
    }

    #[test]
    fn test_missing_file_is_distinct_from_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(OBJECTS_CATALOG);
        assert!(load_all::<Object>(&path).unwrap().is_none());
        assert!(load_or_empty::<Object>(&path).unwrap().is_empty());

        File::create(&path).unwrap();
        assert_eq!(load_all::<Object>(&path).unwrap(), Some(vec![]));
    }

    #[test]
    fn test_replace_all_then_load_all_preserves_order_and_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(OBJECTS_CATALOG);
        let records = vec![
            make_object("zeta.txt", 3),
            make_object("with,comma \"quoted\".txt", 0),
            make_object("alpha.png", 42),
        ];

        replace_all(&path, &records).unwrap();
        let loaded: Vec<Object> = load_all(&path).unwrap().unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_replace_all_leaves_no_temporary_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(OBJECTS_CATALOG);
        replace_all(&path, &[make_object("a.txt", 1)]).unwrap();
        replace_all(&path, &[make_object("b.txt", 2)]).unwrap();

        let names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(OBJECTS_CATALOG)]);
    }

    /// Rows of varying width; the csv writer rejects the second one.
    #[derive(Debug)]
    struct Ragged(usize);

    impl CatalogRecord for Ragged {
        const FIELDS: usize = 1;

        fn to_row(&self) -> Vec<String> {
            vec!["x".to_string(); self.0]
        }

        fn from_row(row: &StringRecord) -> Result<Self, String> {
            Ok(Ragged(row.len()))
        }
    }

    #[test]
    fn test_replace_all_failure_keeps_original() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(OBJECTS_CATALOG);
        replace_all(&path, &[make_object("keep.txt", 1)]).unwrap();

        let err = replace_all(&path, &[Ragged(1), Ragged(2)]).unwrap_err();
        assert!(matches!(err, StorageError::Csv(_)));

        let names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(OBJECTS_CATALOG)]);

        let loaded: Vec<Object> = load_or_empty(&path).unwrap();
        assert_eq!(loaded, vec![make_object("keep.txt", 1)]);
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_all_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let mode = |path: &Path| std::fs::metadata(path).unwrap().permissions().mode() & 0o777;

        let fresh = tmp.path().join(OBJECTS_CATALOG);
        replace_all(&fresh, &[make_object("a.txt", 1)]).unwrap();
        assert_eq!(mode(&fresh), 0o644);

        let path = tmp.path().join(BUCKETS_CATALOG);
        append(&path, &Bucket::new("first", ts(0))).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();
        replace_all(&path, &[Bucket::new("second", ts(1))]).unwrap();
        assert_eq!(mode(&path), 0o640);
    }

    #[test]
    fn test_bucket_rows_use_rfc3339_and_spaced_status() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(BUCKETS_CATALOG);
        let bucket = Bucket::new("my-bucket", ts(0));

        append(&path, &bucket).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            raw,
            "my-bucket,2024-05-01T10:00:00Z,2024-05-01T10:00:00Z,marked for deletion\n"
        );

        let loaded: Vec<Bucket> = load_or_empty(&path).unwrap();
        assert_eq!(loaded, vec![bucket]);
    }

    #[test]
    fn test_append_keeps_previous_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(BUCKETS_CATALOG);
        append(&path, &Bucket::new("first", ts(0))).unwrap();
        append(&path, &Bucket::new("second", ts(1))).unwrap();

        let names: Vec<String> = load_or_empty::<Bucket>(&path)
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_malformed_timestamp_fails_whole_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(BUCKETS_CATALOG);
        std::fs::write(
            &path,
            "good,2024-05-01T10:00:00Z,2024-05-01T10:00:00Z,active\n\
             bad,yesterday,2024-05-01T10:00:00Z,active\n",
        )
        .unwrap();

        let err = load_all::<Bucket>(&path).unwrap_err();
        assert!(matches!(err, StorageError::CorruptCatalog { .. }));
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_wrong_field_count_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(OBJECTS_CATALOG);
        std::fs::write(&path, "a.txt,1,text/plain\n").unwrap();

        let err = load_all::<Object>(&path).unwrap_err();
        assert!(matches!(err, StorageError::CorruptCatalog { .. }));
    }
}
