use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use lead_followup_core::lead::Lead;
use sha2::{Digest, Sha256};

use crate::adapters::lead_store::{
    decode_lead, encode_lead, ConditionalPut, LeadIdPage, LeadStore, LeadVersion, StoreError,
    StoredLead,
};

const DEFAULT_PAGE_SIZE: usize = 100;

/// Process-local lead store for tests and local runs. Versions are content
/// hashes, so identical re-puts keep the same version like S3 ETags do.
#[derive(Debug)]
pub struct InMemoryLeadStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    page_size: usize,
}

impl Default for InMemoryLeadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Stores raw bytes at `id`, bypassing encoding. Useful for seeding
    /// records in the legacy layout or corrupt blobs.
    pub fn insert_raw(&self, id: &str, body: &[u8]) -> Result<(), StoreError> {
        self.objects()?.insert(id.to_string(), body.to_vec());
        Ok(())
    }

    pub fn raw(&self, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.objects()?.get(id).cloned())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.objects()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.objects()?.is_empty())
    }

    fn objects(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>, StoreError> {
        self.objects
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

fn content_version(body: &[u8]) -> LeadVersion {
    let mut hasher = Sha256::new();
    hasher.update(body);
    LeadVersion::new(format!("{:x}", hasher.finalize()))
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn put(&self, id: &str, lead: &Lead) -> Result<(), StoreError> {
        let body = encode_lead(lead)?;
        self.objects()?.insert(id.to_string(), body);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredLead>, StoreError> {
        let Some(body) = self.objects()?.get(id).cloned() else {
            return Ok(None);
        };
        let lead = decode_lead(id, &body)?;
        Ok(Some(StoredLead {
            lead,
            version: content_version(&body),
        }))
    }

    async fn list_ids_page(&self, continuation: Option<String>) -> Result<LeadIdPage, StoreError> {
        let objects = self.objects()?;
        let mut ids: Vec<String> = match continuation.as_deref() {
            Some(after) => objects
                .keys()
                .filter(|id| id.as_str() > after)
                .take(self.page_size + 1)
                .cloned()
                .collect(),
            None => objects.keys().take(self.page_size + 1).cloned().collect(),
        };

        let next = if ids.len() > self.page_size {
            ids.truncate(self.page_size);
            ids.last().cloned()
        } else {
            None
        };
        Ok(LeadIdPage { ids, next })
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
        let mut objects = self.objects()?;
        let current = objects.get(id).map(|existing| content_version(existing));
        if current.as_ref() != Some(expected) {
            return Ok(ConditionalPut::Conflict);
        }

        let version = content_version(&body);
        objects.insert(id.to_string(), body);
        Ok(ConditionalPut::Written(version))
    }
}
