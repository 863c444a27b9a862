//! Traits for bank adapters, storage abstraction and extensibility

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::banks::{BankId, ReturnCodeTable};
use crate::layout::{FileLayout, LayoutResult};
use crate::types::*;
use crate::validation::ValidationIssue;

/// Capabilities a bank must provide to be processed
///
/// Codec, validator and reconciliation engine only ever see what an adapter
/// hands out, so supporting a new bank means implementing this trait.
pub trait BankAdapter: Send + Sync {
    /// Bank code and name
    fn bank_identifier(&self) -> BankId;

    /// File layout for a format and direction
    fn layout(&self, format: CnabFormat, file_type: FileType) -> LayoutResult<FileLayout>;

    /// Occurrence and rejection-motive codes used in return files
    fn return_code_table(&self, format: CnabFormat) -> &ReturnCodeTable;
}

/// Storage abstraction for processed files and settlement results
///
/// This trait allows the processing service to work with any storage backend
/// (PostgreSQL, SQLite, in-memory, etc.) by implementing these methods.
#[async_trait]
pub trait BatchStorage: Send + Sync {
    /// Save a processed file
    async fn save_batch(&mut self, batch: &StoredBatch) -> CnabResult<()>;

    /// Get a processed file by ID
    async fn get_batch(&self, batch_id: &str) -> CnabResult<Option<StoredBatch>>;

    /// List processed files, optionally filtered by bank and direction
    async fn list_batches(
        &self,
        bank_code: Option<&str>,
        file_type: Option<FileType>,
    ) -> CnabResult<Vec<StoredBatch>>;

    /// Change the status of a stored file
    async fn update_status(&mut self, batch_id: &str, status: BatchStatus) -> CnabResult<()>;

    /// Record settlement statuses for the titles of a remittance
    ///
    /// Statuses are merged with those already stored for the remittance.
    async fn save_settlements(
        &mut self,
        remittance_id: &str,
        statuses: &BTreeMap<DocumentId, SettlementStatus>,
    ) -> CnabResult<()>;

    /// Store a processed return together with the settlements it produced
    /// and mark the remittance reconciled
    ///
    /// The default implementation applies the settlements before storing the
    /// return, so a failure never leaves a stored return whose statuses were
    /// not recorded. Backends with transactions should override it.
    async fn save_reconciliation(
        &mut self,
        remittance_id: &str,
        return_batch: &StoredBatch,
        statuses: &BTreeMap<DocumentId, SettlementStatus>,
    ) -> CnabResult<()> {
        self.save_settlements(remittance_id, statuses).await?;
        self.update_status(remittance_id, BatchStatus::Reconciled)
            .await?;
        self.save_batch(return_batch).await
    }

    /// Settlement status of one title of a remittance
    async fn get_settlement(
        &self,
        remittance_id: &str,
        document_id: &DocumentId,
    ) -> CnabResult<Option<SettlementStatus>>;

    /// All settlement statuses of a remittance
    async fn get_settlements(
        &self,
        remittance_id: &str,
    ) -> CnabResult<BTreeMap<DocumentId, SettlementStatus>>;
}

/// Trait for implementing custom batch validation rules
///
/// Rules run after the built-in checks; each returned issue is appended to
/// the report.
pub trait ValidationRule: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Inspect a batch and report issues
    fn check(&self, batch: &Batch) -> Vec<ValidationIssue>;
}
