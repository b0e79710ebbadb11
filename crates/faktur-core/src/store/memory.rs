//! In-process store, used by tests and one-off CLI runs.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{InvoiceRecord, InvoiceStore, RecordTable, Result};
use crate::models::invoice::{NormalizedInvoiceFields, ReviewFlag};

#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<RecordTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn create(&self, record: InvoiceRecord) -> Result<InvoiceRecord> {
        Ok(self.table.write().await.create(record))
    }

    async fn get(&self, owner_id: &str, id: Uuid) -> Result<InvoiceRecord> {
        self.table.read().await.get(owner_id, id)
    }

    async fn update(
        &self,
        owner_id: &str,
        id: Uuid,
        fields: NormalizedInvoiceFields,
        flags: Vec<ReviewFlag>,
    ) -> Result<InvoiceRecord> {
        self.table.write().await.update(owner_id, id, fields, flags)
    }

    async fn finalize(&self, owner_id: &str, id: Uuid) -> Result<InvoiceRecord> {
        self.table.write().await.finalize(owner_id, id)
    }

    async fn delete(&self, owner_id: &str, id: Uuid) -> Result<()> {
        self.table.write().await.delete(owner_id, id)
    }

    async fn delete_drafts(&self, owner_id: &str) -> Result<usize> {
        Ok(self.table.write().await.delete_drafts(owner_id))
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<InvoiceRecord>> {
        Ok(self.table.read().await.find_by_owner(owner_id))
    }
}
