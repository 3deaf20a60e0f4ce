use async_trait::async_trait;
use jiff::Timestamp;
use parcel_core::error::Result;
use parcel_core::{AccessLogEntry, AccessLogStore, LogScope};
use parking_lot::RwLock;

/// An append-only access log kept in a vector.
#[derive(Debug, Default)]
pub struct InMemoryAccessLog {
    entries: RwLock<Vec<AccessLogEntry>>,
}

impl InMemoryAccessLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl AccessLogStore for InMemoryAccessLog {
    async fn append(&self, entry: AccessLogEntry) -> Result<()> {
        self.entries.write().push(entry);
        Ok(())
    }

    async fn query(
        &self,
        scope: LogScope,
        from: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<AccessLogEntry>> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|entry| entry.matches(&scope) && entry.at >= from && entry.at < until)
            .cloned()
            .collect())
    }

    async fn prune_before(&self, cutoff: Timestamp) -> Result<u64> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.at >= cutoff);
        Ok((before - entries.len()) as u64)
    }
}
