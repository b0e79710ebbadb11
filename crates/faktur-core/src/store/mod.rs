//! Persisted invoice records.
//!
//! Every operation is scoped to an owner; a record that belongs to someone
//! else is reported as not found.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::invoice::{NormalizedInvoiceFields, ReviewFlag};
use crate::pipeline::PipelineOutput;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Review state of a stored invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Saved from an upload, still editable and removed by cleanup.
    Draft,
    /// Confirmed by the user; read-only.
    Final,
}

/// A stored invoice: the normalized fields plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub file_name: String,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub flags: Vec<ReviewFlag>,
    #[serde(flatten)]
    pub fields: NormalizedInvoiceFields,
}

impl InvoiceRecord {
    /// A new draft from a pipeline run.
    pub fn draft(owner_id: impl Into<String>, file_name: impl Into<String>, output: PipelineOutput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            file_name: file_name.into(),
            status: RecordStatus::Draft,
            created_at: now,
            updated_at: now,
            flags: output.flags,
            fields: output.fields,
        }
    }

    pub fn is_final(&self) -> bool {
        self.status == RecordStatus::Final
    }

    /// Case-insensitive substring match on invoice number, seller and buyer.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [
            &self.fields.invoice_number,
            &self.fields.seller_name,
            &self.fields.buyer_name,
        ]
        .into_iter()
        .flatten()
        .any(|value| value.to_lowercase().contains(&query))
    }
}

/// Invoice persistence.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Insert a new record.
    async fn create(&self, record: InvoiceRecord) -> Result<InvoiceRecord>;

    async fn get(&self, owner_id: &str, id: Uuid) -> Result<InvoiceRecord>;

    /// Replace the fields and flags of a draft.
    async fn update(
        &self,
        owner_id: &str,
        id: Uuid,
        fields: NormalizedInvoiceFields,
        flags: Vec<ReviewFlag>,
    ) -> Result<InvoiceRecord>;

    /// Mark a record final. Finalizing twice is a no-op.
    async fn finalize(&self, owner_id: &str, id: Uuid) -> Result<InvoiceRecord>;

    async fn delete(&self, owner_id: &str, id: Uuid) -> Result<()>;

    /// Delete the owner's drafts, returning how many were removed.
    async fn delete_drafts(&self, owner_id: &str) -> Result<usize>;

    /// The owner's records, newest first.
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<InvoiceRecord>>;

    /// The owner's records matching `query`, newest first.
    async fn search(&self, owner_id: &str, query: &str) -> Result<Vec<InvoiceRecord>> {
        let records = self.find_by_owner(owner_id).await?;
        Ok(records.into_iter().filter(|r| r.matches(query)).collect())
    }
}

/// Record table shared by the store backends. Each method is one atomic
/// operation under the backend's lock.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
struct RecordTable {
    records: HashMap<Uuid, InvoiceRecord>,
}

impl RecordTable {
    fn owned(&self, owner_id: &str, id: Uuid) -> Result<&InvoiceRecord> {
        self.records
            .get(&id)
            .filter(|r| r.owner_id == owner_id)
            .ok_or(StoreError::NotFound(id))
    }

    fn owned_mut(&mut self, owner_id: &str, id: Uuid) -> Result<&mut InvoiceRecord> {
        self.records
            .get_mut(&id)
            .filter(|r| r.owner_id == owner_id)
            .ok_or(StoreError::NotFound(id))
    }

    fn create(&mut self, record: InvoiceRecord) -> InvoiceRecord {
        self.records.insert(record.id, record.clone());
        record
    }

    fn get(&self, owner_id: &str, id: Uuid) -> Result<InvoiceRecord> {
        self.owned(owner_id, id).cloned()
    }

    fn update(
        &mut self,
        owner_id: &str,
        id: Uuid,
        fields: NormalizedInvoiceFields,
        flags: Vec<ReviewFlag>,
    ) -> Result<InvoiceRecord> {
        let record = self.owned_mut(owner_id, id)?;
        if record.is_final() {
            return Err(StoreError::Finalized(id));
        }
        record.fields = fields;
        record.flags = flags;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    fn finalize(&mut self, owner_id: &str, id: Uuid) -> Result<InvoiceRecord> {
        let record = self.owned_mut(owner_id, id)?;
        if !record.is_final() {
            record.status = RecordStatus::Final;
            record.updated_at = Utc::now();
        }
        Ok(record.clone())
    }

    fn delete(&mut self, owner_id: &str, id: Uuid) -> Result<()> {
        self.owned(owner_id, id)?;
        self.records.remove(&id);
        Ok(())
    }

    fn delete_drafts(&mut self, owner_id: &str) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, r| r.owner_id != owner_id || r.status != RecordStatus::Draft);
        before - self.records.len()
    }

    fn find_by_owner(&self, owner_id: &str) -> Vec<InvoiceRecord> {
        let mut records: Vec<InvoiceRecord> = self
            .records
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        records
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::invoice::CurrencyCode;

    pub fn record(owner: &str, invoice_number: &str) -> InvoiceRecord {
        let mut fields = NormalizedInvoiceFields::empty(CurrencyCode::idr());
        fields.invoice_number = Some(invoice_number.to_string());
        fields.seller_name = Some("PT Sumber Makmur".to_string());
        InvoiceRecord::draft(
            owner,
            format!("{invoice_number}.pdf"),
            PipelineOutput {
                fields,
                flags: Vec::new(),
                raw_text: String::new(),
            },
        )
    }

    /// Behaviour every backend must share.
    pub async fn exercise_store(store: &dyn InvoiceStore) {
        let a = store.create(record("alice", "INV-1")).await.unwrap();
        let b = store.create(record("alice", "INV-2")).await.unwrap();
        let c = store.create(record("bob", "INV-3")).await.unwrap();

        assert_eq!(store.get("alice", a.id).await.unwrap(), a);
        assert!(matches!(store.get("bob", a.id).await, Err(StoreError::NotFound(_))));

        let mut fields = a.fields.clone();
        fields.buyer_name = Some("Acme Corp".to_string());
        let updated = store.update("alice", a.id, fields, Vec::new()).await.unwrap();
        assert_eq!(updated.fields.buyer_name.as_deref(), Some("Acme Corp"));
        assert!(store
            .update("bob", a.id, a.fields.clone(), Vec::new())
            .await
            .is_err());

        let finalized = store.finalize("alice", a.id).await.unwrap();
        assert_eq!(finalized.status, RecordStatus::Final);
        assert!(matches!(
            store.update("alice", a.id, a.fields.clone(), Vec::new()).await,
            Err(StoreError::Finalized(_))
        ));

        let hits = store.search("alice", "acme").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a.id);

        assert_eq!(store.delete_drafts("alice").await.unwrap(), 1);
        let remaining = store.find_by_owner("alice").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, a.id);
        assert!(matches!(store.get("alice", b.id).await, Err(StoreError::NotFound(_))));

        assert!(store.delete("alice", c.id).await.is_err());
        store.delete("bob", c.id).await.unwrap();
        assert!(store.find_by_owner("bob").await.unwrap().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::testing::record;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_serializes_flat() {
        let record = record("alice", "INV-1");
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["ownerId"], "alice");
        assert_eq!(value["status"], "draft");
        assert_eq!(value["invoiceNumber"], "INV-1");
        assert_eq!(value["currencyCode"], "IDR");
        assert_eq!(value["dueDate"], serde_json::Value::Null);

        let back: InvoiceRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let record = record("alice", "INV-42");
        assert!(record.matches("inv-4"));
        assert!(record.matches("sumber"));
        assert!(record.matches(""));
        assert!(!record.matches("acme"));
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut table = RecordTable::default();
        let r = table.create(record("alice", "INV-1"));
        let first = table.finalize("alice", r.id).unwrap();
        let second = table.finalize("alice", r.id).unwrap();
        assert_eq!(first.updated_at, second.updated_at);
    }
}
