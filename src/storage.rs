//! Upload gateway: object storage boundary for published exports.
//!
//! The orchestrator only sees the [`ObjectStorage`] trait; the production
//! implementation sits on the AWS S3 SDK. Buckets are looked up and created
//! on demand; a bucket created here is granted public read and cross-origin
//! GET so published artifacts are retrievable from browsers. Objects upload
//! with public-read access and the classified content type, and the returned
//! URL is durable and non-expiring. Failures map to
//! [`ExportError::StorageUnavailable`] and are never retried here.

use crate::error::ExportError;
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketCannedAcl, CorsConfiguration, CorsRule, ObjectCannedAcl};
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::{debug, info};

/// Destination boundary consumed by the pipeline orchestrator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Makes sure the bucket exists (idempotent check-then-create).
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ExportError>;

    /// Uploads a finished local artifact and returns its retrieval URL.
    async fn publish(
        &self,
        bucket: &str,
        local_path: &Path,
        name: &str,
        content_type: &str,
    ) -> Result<String, ExportError>;
}

/// S3-backed gateway.
pub struct S3Gateway {
    client: Client,
    region: String,
    /// Overrides the virtual-hosted AWS URL form, e.g. for a CDN front or an
    /// S3-compatible endpoint.
    public_base_url: Option<String>,
}

impl S3Gateway {
    pub fn new(client: Client, region: impl Into<String>, public_base_url: Option<String>) -> Self {
        Self {
            client,
            region: region.into(),
            public_base_url,
        }
    }

    /// Builds a gateway from ambient AWS environment configuration.
    pub async fn from_env(public_base_url: Option<String>) -> Self {
        let config =
            aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "eu-west-1".to_string());
        Self::new(Client::new(&config), region, public_base_url)
    }

    fn object_url(&self, bucket: &str, name: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}/{}", base.trim_end_matches('/'), bucket, name),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                bucket, self.region, name
            ),
        }
    }
}

fn storage_err(e: impl std::error::Error) -> ExportError {
    ExportError::StorageUnavailable(DisplayErrorContext(e).to_string())
}

#[async_trait]
impl ObjectStorage for S3Gateway {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ExportError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => {
                debug!(bucket, "Bucket exists");
                return Ok(());
            }
            Err(e) => {
                let service_err = e.into_service_error();
                if !service_err.is_not_found() {
                    return Err(storage_err(service_err));
                }
            }
        }

        info!(bucket, "Creating bucket");
        self.client
            .create_bucket()
            .bucket(bucket)
            .acl(BucketCannedAcl::PublicRead)
            .send()
            .await
            .map_err(storage_err)?;

        // newly created buckets permit cross-origin GET
        let rule = CorsRule::builder()
            .allowed_methods("GET")
            .allowed_origins("*")
            .build()
            .map_err(storage_err)?;
        let cors = CorsConfiguration::builder()
            .cors_rules(rule)
            .build()
            .map_err(storage_err)?;
        self.client
            .put_bucket_cors()
            .bucket(bucket)
            .cors_configuration(cors)
            .send()
            .await
            .map_err(storage_err)?;

        Ok(())
    }

    async fn publish(
        &self,
        bucket: &str,
        local_path: &Path,
        name: &str,
        content_type: &str,
    ) -> Result<String, ExportError> {
        let body = ByteStream::from_path(local_path).await.map_err(storage_err)?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(name)
            .acl(ObjectCannedAcl::PublicRead)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(storage_err)?;

        let url = self.object_url(bucket, name);
        info!(bucket, name, %url, "Published artifact");
        Ok(url)
    }
}
