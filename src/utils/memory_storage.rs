//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

type Settlements = BTreeMap<DocumentId, SettlementStatus>;

/// In-memory storage implementation for testing and development
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    batches: Arc<RwLock<HashMap<String, StoredBatch>>>,
    settlements: Arc<RwLock<HashMap<String, Settlements>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            batches: Arc::new(RwLock::new(HashMap::new())),
            settlements: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> CnabResult<()> {
        write(&self.batches)?.clear();
        write(&self.settlements)?.clear();
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> CnabResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| CnabError::Storage("storage lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> CnabResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| CnabError::Storage("storage lock poisoned".to_string()))
}

#[async_trait]
impl BatchStorage for MemoryStorage {
    async fn save_batch(&mut self, batch: &StoredBatch) -> CnabResult<()> {
        write(&self.batches)?.insert(batch.id.clone(), batch.clone());
        Ok(())
    }

    async fn get_batch(&self, batch_id: &str) -> CnabResult<Option<StoredBatch>> {
        Ok(read(&self.batches)?.get(batch_id).cloned())
    }

    async fn list_batches(
        &self,
        bank_code: Option<&str>,
        file_type: Option<FileType>,
    ) -> CnabResult<Vec<StoredBatch>> {
        let batches = read(&self.batches)?;
        let mut filtered: Vec<StoredBatch> = batches
            .values()
            .filter(|b| bank_code.is_none_or(|code| b.batch.bank_code() == code))
            .filter(|b| file_type.is_none_or(|t| b.batch.file_type() == t))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(filtered)
    }

    async fn update_status(&mut self, batch_id: &str, status: BatchStatus) -> CnabResult<()> {
        let mut batches = write(&self.batches)?;
        let stored = batches
            .get_mut(batch_id)
            .ok_or_else(|| CnabError::NotFound(batch_id.to_string()))?;
        stored.status = status;
        stored.updated_at = Utc::now().naive_utc();
        Ok(())
    }

    async fn save_settlements(
        &mut self,
        remittance_id: &str,
        statuses: &BTreeMap<DocumentId, SettlementStatus>,
    ) -> CnabResult<()> {
        if !read(&self.batches)?.contains_key(remittance_id) {
            return Err(CnabError::NotFound(remittance_id.to_string()));
        }
        write(&self.settlements)?
            .entry(remittance_id.to_string())
            .or_default()
            .extend(statuses.iter().map(|(id, status)| (id.clone(), status.clone())));
        Ok(())
    }

    async fn save_reconciliation(
        &mut self,
        remittance_id: &str,
        return_batch: &StoredBatch,
        statuses: &BTreeMap<DocumentId, SettlementStatus>,
    ) -> CnabResult<()> {
        let mut batches = write(&self.batches)?;
        let mut settlements = write(&self.settlements)?;

        let remittance = batches
            .get_mut(remittance_id)
            .ok_or_else(|| CnabError::NotFound(remittance_id.to_string()))?;
        remittance.status = BatchStatus::Reconciled;
        remittance.updated_at = Utc::now().naive_utc();

        settlements
            .entry(remittance_id.to_string())
            .or_default()
            .extend(statuses.iter().map(|(id, status)| (id.clone(), status.clone())));
        batches.insert(return_batch.id.clone(), return_batch.clone());
        Ok(())
    }

    async fn get_settlement(
        &self,
        remittance_id: &str,
        document_id: &DocumentId,
    ) -> CnabResult<Option<SettlementStatus>> {
        Ok(read(&self.settlements)?
            .get(remittance_id)
            .and_then(|s| s.get(document_id))
            .cloned())
    }

    async fn get_settlements(
        &self,
        remittance_id: &str,
    ) -> CnabResult<BTreeMap<DocumentId, SettlementStatus>> {
        Ok(read(&self.settlements)?
            .get(remittance_id)
            .cloned()
            .unwrap_or_default())
    }
}
