//! Storage engine: CSV catalogs, bucket lifecycle and the service facade
//! the HTTP handlers call into.

pub mod bucket_catalog;
pub mod catalog_store;
pub mod lifecycle;
pub mod locks;
pub mod name_validator;
pub mod object_catalog;
pub mod storage_service;
