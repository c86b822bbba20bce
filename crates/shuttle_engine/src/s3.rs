//! `aws-sdk-s3` implementation of the object-store capabilities.
//!
//! Uploads go through the multipart API so that the writer only ever holds one
//! part in memory, whatever the size of the object being relayed.

use std::fmt::Debug;

use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, MetadataDirective};
use aws_sdk_s3::Client;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use shuttle_logging::{shuttle_debug, shuttle_warn};

use crate::store::{CopyOutput, CopyRequest, ObjectStore, UploadWriter};
use crate::{S3Settings, SetupError, StoreError};

const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY_ID";
const SECRET_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

#[derive(Clone)]
pub struct S3Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl S3Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Read the standard AWS variables from the process environment.
    pub fn from_env() -> Result<Self, SetupError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SetupError> {
        let non_empty = |name: &'static str| lookup(name).filter(|value| !value.is_empty());
        let access_key_id =
            non_empty(ACCESS_KEY_VAR).ok_or(SetupError::MissingCredential(ACCESS_KEY_VAR))?;
        let secret_access_key =
            non_empty(SECRET_KEY_VAR).ok_or(SetupError::MissingCredential(SECRET_KEY_VAR))?;
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: non_empty(SESSION_TOKEN_VAR),
        })
    }
}

#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    part_size: usize,
}

impl S3Store {
    pub fn new(settings: &S3Settings, credentials: S3Credentials) -> Self {
        let credentials = Credentials::new(
            credentials.access_key_id,
            credentials.secret_access_key,
            credentials.session_token,
            None,
            "shuttle-env",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(settings.region.clone()))
            .behavior_version(BehaviorVersion::latest())
            .retry_config(RetryConfig::disabled());

        if settings.force_path_style || settings.endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }
        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            part_size: settings.part_size.max(1),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    async fn copy_object(&self, request: CopyRequest) -> Result<CopyOutput, StoreError> {
        let directive = if request.replace_metadata {
            MetadataDirective::Replace
        } else {
            MetadataDirective::Copy
        };

        let output = self
            .client
            .copy_object()
            .bucket(request.bucket)
            .key(request.key)
            .copy_source(request.copy_source)
            .metadata_directive(directive)
            .set_content_type(non_empty(request.content_type))
            .send()
            .await
            .map_err(map_sdk_error)?;

        let last_modified = output
            .copy_object_result()
            .and_then(|result| result.last_modified())
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos()));

        Ok(CopyOutput { last_modified })
    }

    async fn open_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Box<dyn UploadWriter>, StoreError> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .set_content_type(non_empty(content_type.to_string()))
            .send()
            .await
            .map_err(map_sdk_error)?;

        let upload_id = output
            .upload_id()
            .ok_or_else(|| StoreError::Request("response carried no upload id".into()))?
            .to_string();
        shuttle_debug!("Opened multipart upload {} for {}/{}", upload_id, bucket, key);

        Ok(Box::new(S3UploadWriter {
            client: self.client.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
            part_size: self.part_size,
            buffer: BytesMut::new(),
            parts: Vec::new(),
            failed: false,
        }))
    }
}

struct S3UploadWriter {
    client: Client,
    bucket: String,
    key: String,
    upload_id: String,
    part_size: usize,
    buffer: BytesMut,
    parts: Vec<CompletedPart>,
    failed: bool,
}

impl S3UploadWriter {
    async fn upload_part(&mut self, body: Bytes) -> Result<(), StoreError> {
        let part_number = i32::try_from(self.parts.len() + 1)
            .map_err(|_| StoreError::Request("too many parts".into()))?;

        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&self.upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(map_sdk_error)?;

        self.parts.push(
            CompletedPart::builder()
                .set_e_tag(output.e_tag().map(str::to_string))
                .part_number(part_number)
                .build(),
        );
        Ok(())
    }

    async fn abort(&self) {
        let aborted = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&self.upload_id)
            .send()
            .await;
        if let Err(err) = aborted {
            shuttle_warn!(
                "Failed to abort multipart upload {} for {}: {}",
                self.upload_id,
                self.key,
                map_sdk_error(err)
            );
        }
    }

    async fn complete(&mut self) -> Result<(), StoreError> {
        let rest = self.buffer.split().freeze();
        // An empty object still needs one (empty) part.
        if !rest.is_empty() || self.parts.is_empty() {
            self.upload_part(rest).await?;
        }

        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(std::mem::take(&mut self.parts)))
            .build();
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&self.upload_id)
            .multipart_upload(upload)
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl UploadWriter for S3UploadWriter {
    async fn write(&mut self, chunk: Bytes) -> Result<(), StoreError> {
        if self.failed {
            return Err(StoreError::Aborted);
        }
        self.buffer.extend_from_slice(&chunk);
        while self.buffer.len() >= self.part_size {
            let part = self.buffer.split_to(self.part_size).freeze();
            if let Err(err) = self.upload_part(part).await {
                self.failed = true;
                return Err(err);
            }
        }
        Ok(())
    }

    async fn close(mut self: Box<Self>) -> Result<(), StoreError> {
        if self.failed {
            self.abort().await;
            return Err(StoreError::Aborted);
        }
        match self.complete().await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.abort().await;
                Err(err)
            }
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn map_sdk_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: Debug,
{
    match err.as_service_error() {
        Some(service) => StoreError::Service {
            code: service.code().unwrap_or("Unknown").to_string(),
            message: service.message().unwrap_or_default().to_string(),
        },
        None => StoreError::Request(DisplayErrorContext(&err).to_string()),
    }
}
