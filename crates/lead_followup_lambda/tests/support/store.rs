use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use lead_followup_core::lead::Lead;
use lead_followup_lambda::adapters::lead_store::{
    ConditionalPut, LeadIdPage, LeadStore, LeadVersion, StoreError, StoredLead,
};
use lead_followup_lambda::adapters::memory_store::InMemoryLeadStore;

/// In-memory store with injectable faults for exercising sweep isolation.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: InMemoryLeadStore,
    fail_listing: bool,
    phantom_ids: Vec<String>,
    failing_reads: BTreeSet<String>,
    failing_writes: BTreeSet<String>,
    conditional_puts: Mutex<usize>,
    overwrite_before: Mutex<Option<(usize, Lead)>>,
}

impl FaultyStore {
    pub fn new(inner: InMemoryLeadStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &InMemoryLeadStore {
        &self.inner
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Lists `id` even though no object exists for it, like an object
    /// deleted between listing and reading.
    pub fn with_phantom_id(mut self, id: &str) -> Self {
        self.phantom_ids.push(id.to_string());
        self
    }

    pub fn failing_reads_for(mut self, id: &str) -> Self {
        self.failing_reads.insert(id.to_string());
        self
    }

    pub fn failing_writes_for(mut self, id: &str) -> Self {
        self.failing_writes.insert(id.to_string());
        self
    }

    /// Right before the `nth` (1-based) conditional put, replaces the target
    /// record with `lead`, as a concurrent writer would.
    pub fn overwriting_before_conditional_put(self, nth: usize, lead: Lead) -> Self {
        *self.overwrite_before.lock().expect("poisoned mutex") = Some((nth, lead));
        self
    }

    fn unavailable(id: &str) -> StoreError {
        StoreError::Unavailable(format!("injected fault for {id}"))
    }
}

#[async_trait]
impl LeadStore for FaultyStore {
    async fn put(&self, id: &str, lead: &Lead) -> Result<(), StoreError> {
        if self.failing_writes.contains(id) {
            return Err(Self::unavailable(id));
        }
        self.inner.put(id, lead).await
    }

    async fn get(&self, id: &str) -> Result<Option<StoredLead>, StoreError> {
        if self.failing_reads.contains(id) {
            return Err(Self::unavailable(id));
        }
        self.inner.get(id).await
    }

    async fn list_ids_page(&self, continuation: Option<String>) -> Result<LeadIdPage, StoreError> {
        if self.fail_listing {
            return Err(StoreError::Unavailable("injected listing fault".to_string()));
        }
        let mut page = self.inner.list_ids_page(continuation).await?;
        if page.next.is_none() {
            page.ids.extend(self.phantom_ids.iter().cloned());
        }
        Ok(page)
    }

    fn supports_conditional_writes(&self) -> bool {
        self.inner.supports_conditional_writes()
    }

    async fn put_if_version(
        &self,
        id: &str,
        lead: &Lead,
        expected: &LeadVersion,
    ) -> Result<ConditionalPut, StoreError> {
        if self.failing_writes.contains(id) {
            return Err(Self::unavailable(id));
        }

        let overwrite = {
            let mut count = self.conditional_puts.lock().expect("poisoned mutex");
            *count += 1;
            let mut pending = self.overwrite_before.lock().expect("poisoned mutex");
            match pending.as_ref() {
                Some((nth, _)) if *nth == *count => pending.take().map(|(_, lead)| lead),
                _ => None,
            }
        };
        if let Some(replacement) = overwrite {
            self.inner.put(id, &replacement).await?;
        }

        self.inner.put_if_version(id, lead, expected).await
    }
}
