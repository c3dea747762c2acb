//! Represents a logical bucket — a top-level container for objects.

use chrono::{DateTime, Utc};
use std::{fmt, str::FromStr};

/// Lifecycle state of a bucket, derived from whether it holds objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketStatus {
    /// The bucket owns at least one object.
    Active,
    /// The bucket currently owns no objects. Purely informational.
    MarkedForDeletion,
}

impl BucketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketStatus::Active => "active",
            BucketStatus::MarkedForDeletion => "marked for deletion",
        }
    }

    /// Status a bucket should carry given whether it is empty.
    pub fn for_emptiness(empty: bool) -> Self {
        if empty {
            BucketStatus::MarkedForDeletion
        } else {
            BucketStatus::Active
        }
    }
}

impl fmt::Display for BucketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BucketStatus::Active),
            "marked for deletion" | "marked_for_deletion" => Ok(BucketStatus::MarkedForDeletion),
            other => Err(format!("unknown bucket status `{}`", other)),
        }
    }
}

/// A storage bucket in the S3-like system.
///
/// Backed by a directory of the same name under the storage root and by one
/// row in `buckets.csv`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bucket {
    /// Globally unique bucket name (must conform to DNS naming rules).
    pub name: String,

    /// When this bucket was created.
    pub created_at: DateTime<Utc>,

    /// Last time the bucket or its object set changed.
    pub last_modified: DateTime<Utc>,

    /// Current lifecycle status.
    pub status: BucketStatus,
}

impl Bucket {
    /// A freshly created bucket: no objects yet, so marked for deletion.
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created_at: now,
            last_modified: now,
            status: BucketStatus::MarkedForDeletion,
        }
    }
}
