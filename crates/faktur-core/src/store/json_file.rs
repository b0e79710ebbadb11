//! Store backed by a single JSON file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{InvoiceRecord, InvoiceStore, RecordTable, Result};
use crate::models::invoice::{NormalizedInvoiceFields, ReviewFlag};

/// Keeps the table in memory and rewrites the file after every change.
///
/// The file is replaced through a temporary sibling and a rename, so a crash
/// mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    table: Mutex<RecordTable>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => RecordTable::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecordTable::default(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), records = table.records.len(), "Opened invoice store");

        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, table: &RecordTable) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(table)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Apply `op` and write the file while still holding the lock.
    async fn mutate<T>(&self, op: impl FnOnce(&mut RecordTable) -> Result<T>) -> Result<T> {
        let mut table = self.table.lock().await;
        let mut next = table.clone();
        let value = op(&mut next)?;
        self.persist(&next).await?;
        *table = next;
        Ok(value)
    }
}

#[async_trait]
impl InvoiceStore for JsonFileStore {
    async fn create(&self, record: InvoiceRecord) -> Result<InvoiceRecord> {
        self.mutate(|table| Ok(table.create(record))).await
    }

    async fn get(&self, owner_id: &str, id: Uuid) -> Result<InvoiceRecord> {
        self.table.lock().await.get(owner_id, id)
    }

    async fn update(
        &self,
        owner_id: &str,
        id: Uuid,
        fields: NormalizedInvoiceFields,
        flags: Vec<ReviewFlag>,
    ) -> Result<InvoiceRecord> {
        self.mutate(|table| table.update(owner_id, id, fields, flags)).await
    }

    async fn finalize(&self, owner_id: &str, id: Uuid) -> Result<InvoiceRecord> {
        self.mutate(|table| table.finalize(owner_id, id)).await
    }

    async fn delete(&self, owner_id: &str, id: Uuid) -> Result<()> {
        self.mutate(|table| table.delete(owner_id, id)).await
    }

    async fn delete_drafts(&self, owner_id: &str) -> Result<usize> {
        self.mutate(|table| Ok(table.delete_drafts(owner_id))).await
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<InvoiceRecord>> {
        Ok(self.table.lock().await.find_by_owner(owner_id))
    }
}
