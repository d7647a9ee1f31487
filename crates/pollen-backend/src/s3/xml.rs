//! S3 XML bodies

use serde::{Deserialize, Serialize};

/// GET Service response
#[derive(Debug, Deserialize)]
#[serde(rename = "ListAllMyBucketsResult")]
pub struct ListAllMyBucketsResult {
    #[serde(rename = "Buckets", default)]
    pub buckets: Buckets,
}

#[derive(Debug, Default, Deserialize)]
pub struct Buckets {
    #[serde(rename = "Bucket", default)]
    pub bucket: Vec<BucketEntry>,
}

#[derive(Debug, Deserialize)]
pub struct BucketEntry {
    #[serde(rename = "Name")]
    pub name: String,
}

/// ListObjectsV2 response
#[derive(Debug, Deserialize)]
#[serde(rename = "ListBucketResult")]
pub struct ListBucketResult {
    #[serde(rename = "IsTruncated", default)]
    pub is_truncated: bool,
    #[serde(rename = "NextContinuationToken")]
    pub next_continuation_token: Option<String>,
    #[serde(rename = "Contents", default)]
    pub contents: Vec<ObjectEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectEntry {
    #[serde(rename = "Key")]
    pub key: String,
}

/// Body of a CreateBucket request outside us-east-1
#[derive(Debug, Serialize)]
#[serde(rename = "CreateBucketConfiguration")]
pub struct CreateBucketConfiguration {
    #[serde(rename = "@xmlns")]
    pub xmlns: &'static str,
    #[serde(rename = "LocationConstraint")]
    pub location_constraint: String,
}

impl CreateBucketConfiguration {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            xmlns: "http://s3.amazonaws.com/doc/2006-03-01/",
            location_constraint: region.into(),
        }
    }
}

/// S3 error document
#[derive(Debug, Deserialize)]
#[serde(rename = "Error")]
pub struct ErrorResponse {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

/// Turn an S3 error body into `Code: Message`
pub fn describe_error(body: &str) -> Option<String> {
    let error: ErrorResponse = quick_xml::de::from_str(body).ok()?;
    if error.message.is_empty() {
        Some(error.code)
    } else {
        Some(format!("{}: {}", error.code, error.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_buckets() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Owner><ID>abc</ID><DisplayName>me</DisplayName></Owner>
  <Buckets>
    <Bucket><Name>alpha</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate></Bucket>
    <Bucket><Name>beta</Name><CreationDate>2024-01-02T00:00:00.000Z</CreationDate></Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;
        let result: ListAllMyBucketsResult = quick_xml::de::from_str(body).unwrap();
        let names: Vec<_> = result.buckets.bucket.into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_parse_empty_bucket_list() {
        let body = r"<ListAllMyBucketsResult><Buckets></Buckets></ListAllMyBucketsResult>";
        let result: ListAllMyBucketsResult = quick_xml::de::from_str(body).unwrap();
        assert!(result.buckets.bucket.is_empty());
    }

    #[test]
    fn test_parse_list_objects_page() {
        let body = r"<ListBucketResult>
  <Name>photos</Name>
  <KeyCount>2</KeyCount>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>1ueGcxLPRx1Tr</NextContinuationToken>
  <Contents><Key>a.txt</Key><Size>3</Size></Contents>
  <Contents><Key>b/c.txt</Key><Size>5</Size></Contents>
</ListBucketResult>";
        let result: ListBucketResult = quick_xml::de::from_str(body).unwrap();
        assert!(result.is_truncated);
        assert_eq!(result.next_continuation_token.as_deref(), Some("1ueGcxLPRx1Tr"));
        assert_eq!(result.contents.len(), 2);
        assert_eq!(result.contents[1].key, "b/c.txt");
    }

    #[test]
    fn test_create_bucket_configuration() {
        let xml = quick_xml::se::to_string(&CreateBucketConfiguration::new("us-east-2")).unwrap();
        assert!(xml.starts_with("<CreateBucketConfiguration"));
        assert!(xml.contains("<LocationConstraint>us-east-2</LocationConstraint>"));
    }

    #[test]
    fn test_describe_error() {
        let body = "<Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist</Message></Error>";
        assert_eq!(
            describe_error(body).as_deref(),
            Some("NoSuchBucket: The specified bucket does not exist")
        );
        assert_eq!(describe_error("not xml"), None);
    }
}
