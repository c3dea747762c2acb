//! Defines routes for all S3-like bucket and object operations.
//!
//! ## Structure
//! - **Root**
//!   - `GET    /` — list buckets
//!   - `PUT    /`, `DELETE /` — 400, no bucket named
//!
//! - **Bucket-level endpoints**
//!   - `GET    /{bucket}` — bucket record and its objects
//!   - `PUT    /{bucket}` — create bucket
//!   - `DELETE /{bucket}` — delete empty bucket
//!
//! - **Object-level endpoints**
//!   - `PUT    /{bucket}/{*key}` — upload object
//!   - `GET    /{bucket}/{*key}` — download object
//!   - `DELETE /{bucket}/{*key}` — delete object
//!
//! The wildcard `*key` captures the rest of the path so that keys containing
//! `/` reach the key validator and are rejected with 400 instead of a 404.

use crate::{
    handlers::{
        bucket_handlers::{
            create_bucket, delete_bucket, get_bucket, list_buckets, missing_bucket_name,
        },
        object_handlers::{delete_object, get_object, upload_object},
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    routing::{get, put},
};
use tower_http::trace::TraceLayer;

/// Build and return the router for all routes.
///
/// The router carries shared state (`StorageService`) to all handlers.
pub fn routes() -> Router<StorageService> {
    Router::new()
        .route(
            "/",
            get(list_buckets)
                .put(missing_bucket_name)
                .delete(missing_bucket_name),
        )
        // Object-level routes
        .route(
            "/{bucket}/{*key}",
            put(upload_object).get(get_object).delete(delete_object),
        )
        // Bucket-level routes
        .route(
            "/{bucket}",
            get(get_bucket).put(create_bucket).delete(delete_bucket),
        )
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_app() -> (Router, TempDir) {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let service = StorageService::new(tmp.path());
        service.prepare().await.unwrap();
        (routes().with_state(service), tmp)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: &'static str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_bucket_and_object_lifecycle_over_http() {
        let (app, _tmp) = test_app().await;

        let (status, body) = send(&app, Method::PUT, "/my-bucket", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<CreateBucketResponse><Bucket><Name>my-bucket</Name>"));
        assert!(body.contains("<Status>marked for deletion</Status>"));

        let (status, body) = send(&app, Method::PUT, "/my-bucket/hello.txt", "hi").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<UploadObjectResponse><Object><ObjectKey>hello.txt</ObjectKey>"));
        assert!(body.contains("<Size>2</Size>"));
        assert!(body.contains("<ContentType>application/octet-stream</ContentType>"));

        let (status, body) = send(&app, Method::GET, "/my-bucket", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<Status>active</Status>"));
        assert!(body.contains("<ObjectKey>hello.txt</ObjectKey>"));

        let (status, body) = send(&app, Method::GET, "/my-bucket/hello.txt", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "hi");

        let (status, _) = send(&app, Method::DELETE, "/my-bucket/hello.txt", "").await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, Method::GET, "/my-bucket", "").await;
        assert!(body.contains("<Status>marked for deletion</Status>"));

        let (status, _) = send(&app, Method::DELETE, "/my-bucket", "").await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, Method::DELETE, "/my-bucket", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("<Error><Code>404</Code>"));
    }

    #[tokio::test]
    async fn test_list_buckets_at_root() {
        let (app, _tmp) = test_app().await;
        let (status, body) = send(&app, Method::GET, "/", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.ends_with("<ListBucketsResponse></ListBucketsResponse>"));

        send(&app, Method::PUT, "/first", "").await;
        send(&app, Method::PUT, "/second", "").await;
        let (_, body) = send(&app, Method::GET, "/", "").await;
        let first = body.find("<Name>first</Name>").unwrap();
        let second = body.find("<Name>second</Name>").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_create_bucket_errors() {
        let (app, tmp) = test_app().await;

        let (status, body) = send(&app, Method::PUT, "/Bad_Name", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("<Code>400</Code>"));
        assert!(!tmp.path().join("Bad_Name").exists());

        send(&app, Method::PUT, "/taken", "").await;
        let (status, _) = send(&app, Method::PUT, "/taken", "").await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_delete_bucket_errors() {
        let (app, _tmp) = test_app().await;

        let (status, _) = send(&app, Method::DELETE, "/", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::DELETE, "/unknown", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(&app, Method::PUT, "/full", "").await;
        send(&app, Method::PUT, "/full/a.txt", "x").await;
        let (status, body) = send(&app, Method::DELETE, "/full", "").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("<Code>409</Code>"));
    }

    #[tokio::test]
    async fn test_object_errors() {
        let (app, _tmp) = test_app().await;

        let (status, _) = send(&app, Method::PUT, "/nowhere/a.txt", "x").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::GET, "/nowhere/a.txt", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(&app, Method::PUT, "/here", "").await;
        let (status, _) = send(&app, Method::GET, "/here/missing.txt", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::DELETE, "/here/missing.txt", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::PUT, "/here/nested/key.txt", "x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, Method::GET, "/here/objects.csv", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_download_content_type_comes_from_extension() {
        let (app, _tmp) = test_app().await;
        send(&app, Method::PUT, "/imgs", "").await;

        let upload = Request::builder()
            .method(Method::PUT)
            .uri("/imgs/pic.png")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("not really a png"))
            .unwrap();
        let response = app.clone().oneshot(upload).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("<ContentType>text/plain</ContentType>"));

        let download = Request::builder()
            .uri("/imgs/pic.png")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(download).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "16");
    }
}
