use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use lead_followup_core::lead::Lead;
use lead_followup_core::storage_keys::{lead_id_from_object_key, lead_object_key, listing_prefix};

use crate::adapters::lead_store::{
    decode_lead, encode_lead, ConditionalPut, LeadIdPage, LeadStore, LeadVersion, StoreError,
    StoredLead,
};

const PRECONDITION_FAILED: u16 = 412;
const CONDITIONAL_REQUEST_CONFLICT: u16 = 409;

/// One JSON object per lead under `{prefix}/`. ETags act as versions and
/// `If-Match` turns a put into a compare-and-swap.
#[derive(Debug, Clone)]
pub struct S3LeadStore {
    bucket: String,
    prefix: String,
    s3_client: aws_sdk_s3::Client,
}

impl S3LeadStore {
    pub fn new(
        s3_client: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            s3_client,
        }
    }
}

#[async_trait]
impl LeadStore for S3LeadStore {
    async fn put(&self, id: &str, lead: &Lead) -> Result<(), StoreError> {
        let body = encode_lead(lead)?;
        self.s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(lead_object_key(&self.prefix, id))
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(|error| {
                StoreError::Unavailable(format!(
                    "failed to write lead to s3: {}",
                    DisplayErrorContext(&error)
                ))
            })
    }

    async fn get(&self, id: &str) -> Result<Option<StoredLead>, StoreError> {
        let response = self
            .s3_client
            .get_object()
            .bucket(&self.bucket)
            .key(lead_object_key(&self.prefix, id))
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(error) => {
                if error
                    .as_service_error()
                    .map(|service_error| service_error.is_no_such_key())
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                return Err(StoreError::Unavailable(format!(
                    "failed to read lead from s3: {}",
                    DisplayErrorContext(&error)
                )));
            }
        };

        let version = LeadVersion::new(output.e_tag().unwrap_or_default());
        let body = output.body.collect().await.map_err(|error| {
            StoreError::Unavailable(format!("failed to read lead body from s3: {error}"))
        })?;
        let lead = decode_lead(id, &body.into_bytes())?;

        Ok(Some(StoredLead { lead, version }))
    }

    async fn list_ids_page(&self, continuation: Option<String>) -> Result<LeadIdPage, StoreError> {
        let output = self
            .s3_client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(listing_prefix(&self.prefix))
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(|error| {
                StoreError::Unavailable(format!(
                    "failed to list leads in s3: {}",
                    DisplayErrorContext(&error)
                ))
            })?;

        let ids = output
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .filter_map(|key| lead_id_from_object_key(&self.prefix, key))
            .collect();

        Ok(LeadIdPage {
            ids,
            next: output.next_continuation_token().map(str::to_string),
        })
    }

    fn supports_conditional_writes(&self) -> bool {
        true
    }

    async fn put_if_version(
        &self,
        id: &str,
        lead: &Lead,
        expected: &LeadVersion,
    ) -> Result<ConditionalPut, StoreError> {
        let body = encode_lead(lead)?;
        let response = self
            .s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(lead_object_key(&self.prefix, id))
            .content_type("application/json")
            .if_match(expected.as_str())
            .body(ByteStream::from(body))
            .send()
            .await;

        match response {
            Ok(output) => Ok(ConditionalPut::Written(LeadVersion::new(
                output.e_tag().unwrap_or_default(),
            ))),
            Err(error) => {
                let status = error
                    .raw_response()
                    .map(|response| response.status().as_u16());
                if matches!(
                    status,
                    Some(PRECONDITION_FAILED) | Some(CONDITIONAL_REQUEST_CONFLICT)
                ) {
                    return Ok(ConditionalPut::Conflict);
                }
                Err(StoreError::Unavailable(format!(
                    "failed to conditionally write lead to s3: {}",
                    DisplayErrorContext(&error)
                )))
            }
        }
    }
}
