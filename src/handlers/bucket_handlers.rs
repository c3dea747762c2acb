//! HTTP handlers for the root path and bucket-level operations.

use crate::{
    errors::AppError,
    handlers::xml::{render_create_bucket, render_list_buckets, render_list_objects},
    services::storage_service::StorageService,
};
use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

fn xml_response(status: StatusCode, xml: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/xml"))],
        xml,
    )
        .into_response()
}

/// GET `/` — list all buckets.
pub async fn list_buckets(State(service): State<StorageService>) -> Result<Response, AppError> {
    let buckets = service.list_buckets().await?;
    Ok(xml_response(StatusCode::OK, render_list_buckets(&buckets)))
}

/// PUT or DELETE `/` — the request did not name a bucket.
pub async fn missing_bucket_name() -> AppError {
    AppError::bad_request("bucket name not specified")
}

/// PUT `/{bucket}` — create bucket.
pub async fn create_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<Response, AppError> {
    let created = service.create_bucket(&bucket).await?;
    Ok(xml_response(StatusCode::OK, render_create_bucket(&created)))
}

/// GET `/{bucket}` — bucket record plus its objects.
pub async fn get_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<Response, AppError> {
    let (record, objects) = service.get_bucket(&bucket).await?;
    Ok(xml_response(
        StatusCode::OK,
        render_list_objects(&record, &objects),
    ))
}

/// DELETE `/{bucket}` — delete an empty bucket.
pub async fn delete_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_bucket(&bucket).await?;
    Ok(StatusCode::NO_CONTENT)
}
