//! Core data models for the S3-like object storage service.
//!
//! These entities represent the logical structure of buckets and objects.
//! Their on-disk CSV form lives in `services::catalog_store`.

pub mod bucket;
pub mod object;
