//! AWS SDK implementation of the object store contract
//!
//! Drives the async `aws-sdk-s3` client from blocking worker threads
//! through an owned multi-thread tokio runtime. Retries, TLS, and endpoint
//! resolution belong to the SDK; this layer only shapes requests and maps
//! errors onto the crate's error kinds.

use crate::credentials::FileCredentialCache;
use crate::error::{Result, S3ParcpError};
use crate::storage::{ObjectHead, ObjectStore, ObjectSummary};
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use std::collections::HashMap;
use tokio::runtime::Runtime;
use tracing::warn;

/// Connection settings for the production S3 client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Custom S3 endpoint; forces path-style addressing when set
    pub s3_url: Option<String>,
    /// Downgrade the endpoint scheme to clear-text HTTP
    pub disable_ssl: bool,
    /// Maximum attempts per request, including the first
    pub max_retries: u32,
    /// Wrap the resolved credential chain in the file cache
    pub cached_credentials: bool,
}

/// `ObjectStore` backed by `aws-sdk-s3`.
pub struct S3Store {
    client: Client,
    runtime: Runtime,
}

impl S3Store {
    /// Resolve AWS configuration and build a client.
    ///
    /// Region and base credentials follow the standard AWS resolution
    /// chain; a custom endpoint overrides resolution and switches the
    /// client to path-style requests, which S3-compatible servers expect.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| S3ParcpError::config(format!("failed to start async runtime: {e}")))?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_retries.max(1)));

        if let Some(endpoint) = effective_endpoint(config.s3_url.as_deref(), config.disable_ssl) {
            loader = loader.endpoint_url(endpoint);
        } else if config.disable_ssl {
            warn!("--disable-ssl has no effect without a custom --s3-url endpoint");
        }

        let sdk_config = runtime.block_on(loader.load());

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if config.cached_credentials {
            if let Some(base) = sdk_config.credentials_provider() {
                match FileCredentialCache::new(base.clone()) {
                    Ok(cache) => builder = builder.credentials_provider(cache),
                    Err(e) => warn!(error = %e, "credential cache unavailable, using the plain provider chain"),
                }
            }
        }
        if config.s3_url.is_some() {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            runtime,
        })
    }
}

impl ObjectStore for S3Store {
    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectHead>> {
        self.runtime.block_on(async {
            let response = self
                .client
                .head_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await;
            match response {
                Ok(out) => Ok(Some(ObjectHead {
                    size: out.content_length().unwrap_or(0) as u64,
                    metadata: out.metadata().cloned().unwrap_or_default(),
                })),
                Err(err) => {
                    if let SdkError::ServiceError(service_err) = &err {
                        if service_err.err().is_not_found() {
                            return Ok(None);
                        }
                    }
                    Err(map_sdk_err("head object", err))
                }
            }
        })
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: Option<i32>,
    ) -> Result<Vec<ObjectSummary>> {
        self.runtime.block_on(async {
            let mut summaries = Vec::new();
            let mut continuation: Option<String> = None;

            loop {
                let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
                if let Some(limit) = max_keys {
                    request = request.max_keys(limit);
                }
                if let Some(token) = &continuation {
                    request = request.continuation_token(token);
                }

                let out = request
                    .send()
                    .await
                    .map_err(|e| map_sdk_err("list objects", e))?;

                for object in out.contents() {
                    summaries.push(ObjectSummary {
                        key: object.key().unwrap_or_default().to_string(),
                        size: object.size().unwrap_or(0) as u64,
                    });
                }

                // A bounded probe never paginates.
                if max_keys.is_some() || out.is_truncated() != Some(true) {
                    break;
                }
                continuation = out.next_continuation_token().map(String::from);
            }

            Ok(summaries)
        })
    }

    fn get_object_range(&self, bucket: &str, key: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        self.runtime.block_on(async {
            let out = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .range(format!("bytes={}-{}", start, end - 1))
                .send()
                .await
                .map_err(|e| map_sdk_err("get object", e))?;

            let body = out
                .body
                .collect()
                .await
                .map_err(|e| S3ParcpError::network("get object", e.to_string()))?;
            Ok(body.into_bytes().to_vec())
        })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        self.runtime.block_on(async {
            let mut request = self
                .client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(ByteStream::from(body));
            if !metadata.is_empty() {
                request = request.set_metadata(Some(metadata));
            }
            request
                .send()
                .await
                .map_err(|e| map_sdk_err("put object", e))?;
            Ok(())
        })
    }

    fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String> {
        self.runtime.block_on(async {
            let mut request = self.client.create_multipart_upload().bucket(bucket).key(key);
            if !metadata.is_empty() {
                request = request.set_metadata(Some(metadata));
            }
            let out = request
                .send()
                .await
                .map_err(|e| map_sdk_err("create multipart upload", e))?;
            out.upload_id().map(String::from).ok_or_else(|| {
                S3ParcpError::network("create multipart upload", "response carried no upload id")
            })
        })
    }

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String> {
        self.runtime.block_on(async {
            let out = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(body))
                .send()
                .await
                .map_err(|e| map_sdk_err("upload part", e))?;
            Ok(out.e_tag().unwrap_or_default().to_string())
        })
    }

    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<(i32, String)>,
    ) -> Result<()> {
        self.runtime.block_on(async {
            let completed_parts: Vec<CompletedPart> = parts
                .into_iter()
                .map(|(part_number, e_tag)| {
                    CompletedPart::builder()
                        .part_number(part_number)
                        .e_tag(e_tag)
                        .build()
                })
                .collect();
            let completed = CompletedMultipartUpload::builder()
                .set_parts(Some(completed_parts))
                .build();

            self.client
                .complete_multipart_upload()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .multipart_upload(completed)
                .send()
                .await
                .map_err(|e| map_sdk_err("complete multipart upload", e))?;
            Ok(())
        })
    }

    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        self.runtime.block_on(async {
            self.client
                .abort_multipart_upload()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .send()
                .await
                .map_err(|e| map_sdk_err("abort multipart upload", e))?;
            Ok(())
        })
    }
}

/// Apply the `--disable-ssl` scheme downgrade to a custom endpoint.
fn effective_endpoint(s3_url: Option<&str>, disable_ssl: bool) -> Option<String> {
    s3_url.map(|url| {
        if disable_ssl && url.starts_with("https://") {
            url.replacen("https://", "http://", 1)
        } else {
            url.to_string()
        }
    })
}

/// Map an SDK error onto the crate's error kinds, folding well-known S3
/// error codes into the messages the CLI prints.
fn map_sdk_err<E, R>(operation: &str, err: SdkError<E, R>) -> S3ParcpError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let message = format!("{}", DisplayErrorContext(&err));

    match code.as_deref() {
        Some("AccessDenied") => S3ParcpError::Auth("access denied".to_string()),
        Some("NoSuchBucket") => S3ParcpError::NotFound("no such bucket".to_string()),
        Some("NoSuchKey") => S3ParcpError::NotFound(message),
        _ if message.contains("region must be set")
            || message.contains("missing region")
            || message.contains("MissingRegion") =>
        {
            S3ParcpError::Config("missing region configuration".to_string())
        }
        _ => S3ParcpError::network(operation, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_endpoint_passthrough() {
        assert_eq!(
            effective_endpoint(Some("https://minio.local:9000"), false),
            Some("https://minio.local:9000".to_string())
        );
        assert_eq!(effective_endpoint(None, true), None);
    }

    #[test]
    fn test_effective_endpoint_ssl_downgrade() {
        assert_eq!(
            effective_endpoint(Some("https://minio.local:9000"), true),
            Some("http://minio.local:9000".to_string())
        );
        // Already clear-text endpoints are left alone.
        assert_eq!(
            effective_endpoint(Some("http://minio.local:9000"), true),
            Some("http://minio.local:9000".to_string())
        );
    }
}
