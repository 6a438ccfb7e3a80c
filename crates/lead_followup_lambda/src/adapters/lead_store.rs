use async_trait::async_trait;
use lead_followup_core::lead::Lead;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("lead store unavailable: {0}")]
    Unavailable(String),
    #[error("stored lead '{id}' could not be decoded: {message}")]
    Corrupt { id: String, message: String },
}

/// Opaque content version of a stored lead (an S3 ETag or a content hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeadVersion(String);

impl LeadVersion {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLead {
    pub lead: Lead,
    pub version: LeadVersion,
}

/// One page of lead ids. Passing `next` back resumes the enumeration; starting
/// again from `None` restarts it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadIdPage {
    pub ids: Vec<String>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalPut {
    Written(LeadVersion),
    Conflict,
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Replaces whatever is stored at `id`.
    async fn put(&self, id: &str, lead: &Lead) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<StoredLead>, StoreError>;

    async fn list_ids_page(&self, continuation: Option<String>) -> Result<LeadIdPage, StoreError>;

    fn supports_conditional_writes(&self) -> bool {
        false
    }

    /// Writes only if the stored version still equals `expected`.
    async fn put_if_version(
        &self,
        _id: &str,
        _lead: &Lead,
        _expected: &LeadVersion,
    ) -> Result<ConditionalPut, StoreError> {
        Err(StoreError::Unavailable(
            "conditional writes are not supported by this store".to_string(),
        ))
    }
}

pub async fn list_all_ids(store: &dyn LeadStore) -> Result<Vec<String>, StoreError> {
    let mut ids = Vec::new();
    let mut continuation = None;
    loop {
        let page = store.list_ids_page(continuation).await?;
        ids.extend(page.ids);
        match page.next {
            Some(next) => continuation = Some(next),
            None => return Ok(ids),
        }
    }
}

pub fn encode_lead(lead: &Lead) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(lead)
        .map_err(|error| StoreError::Unavailable(format!("failed to encode lead: {error}")))
}

pub fn decode_lead(id: &str, body: &[u8]) -> Result<Lead, StoreError> {
    serde_json::from_slice(body).map_err(|error| StoreError::Corrupt {
        id: id.to_string(),
        message: error.to_string(),
    })
}
