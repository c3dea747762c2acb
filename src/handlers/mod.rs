//! Axum handlers translating HTTP verbs into `StorageService` calls.

pub mod bucket_handlers;
pub mod object_handlers;
pub mod xml;
