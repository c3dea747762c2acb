//! XML bodies for the bucket/object API.

use crate::{
    models::{bucket::Bucket, object::Object},
    services::catalog_store::format_timestamp,
};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

pub fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn push_bucket(xml: &mut String, bucket: &Bucket) {
    xml.push_str("<Bucket>");
    xml.push_str(&format!("<Name>{}</Name>", xml_escape(&bucket.name)));
    xml.push_str(&format!(
        "<CreationDate>{}</CreationDate>",
        format_timestamp(&bucket.created_at)
    ));
    xml.push_str(&format!(
        "<LastModified>{}</LastModified>",
        format_timestamp(&bucket.last_modified)
    ));
    xml.push_str(&format!("<Status>{}</Status>", bucket.status));
    xml.push_str("</Bucket>");
}

fn push_object(xml: &mut String, object: &Object) {
    xml.push_str("<Object>");
    xml.push_str(&format!("<ObjectKey>{}</ObjectKey>", xml_escape(&object.key)));
    xml.push_str(&format!("<Size>{}</Size>", object.size));
    xml.push_str(&format!(
        "<ContentType>{}</ContentType>",
        xml_escape(&object.content_type)
    ));
    xml.push_str(&format!(
        "<LastModified>{}</LastModified>",
        format_timestamp(&object.last_modified)
    ));
    xml.push_str("</Object>");
}

/// `<Error><Code>404</Code><Message>..</Message></Error>`
pub fn render_error(code: u16, message: &str) -> String {
    format!(
        "{}<Error><Code>{}</Code><Message>{}</Message></Error>",
        XML_DECL,
        code,
        xml_escape(message)
    )
}

pub fn render_create_bucket(bucket: &Bucket) -> String {
    let mut xml = format!("{}<CreateBucketResponse>", XML_DECL);
    push_bucket(&mut xml, bucket);
    xml.push_str("</CreateBucketResponse>");
    xml
}

pub fn render_list_buckets(buckets: &[Bucket]) -> String {
    let mut xml = format!("{}<ListBucketsResponse>", XML_DECL);
    for bucket in buckets {
        push_bucket(&mut xml, bucket);
    }
    xml.push_str("</ListBucketsResponse>");
    xml
}

pub fn render_list_objects(bucket: &Bucket, objects: &[Object]) -> String {
    let mut xml = format!("{}<ListObjectsResponse>", XML_DECL);
    push_bucket(&mut xml, bucket);
    for object in objects {
        push_object(&mut xml, object);
    }
    xml.push_str("</ListObjectsResponse>");
    xml
}

pub fn render_upload_object(object: &Object) -> String {
    let mut xml = format!("{}<UploadObjectResponse>", XML_DECL);
    push_object(&mut xml, object);
    xml.push_str("</UploadObjectResponse>");
    xml
}
