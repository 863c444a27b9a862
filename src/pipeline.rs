//! Processing service that orchestrates codec, validation, reconciliation and storage

use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::banks::AdapterRegistry;
use crate::codec::{self, BatchBuilder};
use crate::layout::fields;
use crate::reconciliation::{ReconciliationEngine, ReconciliationSummary, SettlementMap};
use crate::settings::CnabConfig;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_bank_code, validate_file_name, validate_file_size};
use crate::validation::{BatchValidator, ValidationReport};

/// One uploaded file waiting to be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub file_name: String,
    pub bank_code: String,
    pub format: CnabFormat,
    pub file_type: FileType,
    pub content: Vec<u8>,
}

impl BatchJob {
    pub fn remittance(
        file_name: impl Into<String>,
        bank_code: impl Into<String>,
        format: CnabFormat,
        content: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            bank_code: bank_code.into(),
            format,
            file_type: FileType::Remittance,
            content,
        }
    }

    pub fn return_file(
        file_name: impl Into<String>,
        bank_code: impl Into<String>,
        format: CnabFormat,
        content: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            bank_code: bank_code.into(),
            format,
            file_type: FileType::Return,
            content,
        }
    }
}

/// A decoded and validated file, not yet stored
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedBatch {
    pub file_name: String,
    pub batch: Batch,
    pub report: ValidationReport,
}

/// Outcome of processing a return file against its remittance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    /// Id of the stored return file
    pub batch_id: String,
    /// Titles found in the return file
    pub processed: usize,
    /// Return titles that ended rejected
    pub with_errors: usize,
    /// Sum of the amounts paid in the return file
    pub total_value: BigDecimal,
    pub statuses: SettlementMap,
    /// Return titles with no counterpart in the remittance
    pub unmatched: Vec<DocumentId>,
    pub reconciliation: ReconciliationSummary,
}

/// Decode and validate a single job
///
/// Runs synchronously; [`BatchProcessor::process_many`] moves it onto blocking
/// workers.
pub fn process_job(
    registry: &AdapterRegistry,
    config: &CnabConfig,
    validator: &BatchValidator,
    job: &BatchJob,
) -> CnabResult<ProcessedBatch> {
    validate_bank_code(&job.bank_code)?;
    config.active_bank(&job.bank_code)?;
    validate_file_name(&job.file_name, job.file_type)?;
    validate_file_size(job.content.len(), config.processing.max_file_size_bytes)?;

    let adapter = registry.get(&job.bank_code)?;
    let layout = adapter.layout(job.format, job.file_type)?;
    let batch = codec::decode(&job.content, &layout)?;
    let report = validator.validate(&batch);

    debug!(
        file = %job.file_name,
        bank = %job.bank_code,
        records = batch.records().len(),
        issues = report.issues.len(),
        "Processed file"
    );

    Ok(ProcessedBatch {
        file_name: job.file_name.clone(),
        batch,
        report,
    })
}

/// Processing service over a storage backend
pub struct BatchProcessor<S: BatchStorage> {
    storage: S,
    registry: Arc<AdapterRegistry>,
    config: Arc<CnabConfig>,
    validator: Arc<BatchValidator>,
}

impl<S: BatchStorage> BatchProcessor<S> {
    /// Create a processor with the built-in bank adapters
    pub fn new(storage: S, config: CnabConfig) -> Self {
        Self::with_registry(storage, config, AdapterRegistry::default())
    }

    pub fn with_registry(storage: S, config: CnabConfig, registry: AdapterRegistry) -> Self {
        let validator = BatchValidator::new(config.validation.clone());
        Self {
            storage,
            registry: Arc::new(registry),
            config: Arc::new(config),
            validator: Arc::new(validator),
        }
    }

    /// Replace the validator, e.g. to add custom rules
    pub fn with_validator(mut self, validator: BatchValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &CnabConfig {
        &self.config
    }

    /// Encode a remittance file for a configured bank
    pub fn generate_remittance(
        &self,
        bank_code: &str,
        format: CnabFormat,
        sequence: u64,
        titles: Vec<Title>,
    ) -> CnabResult<Vec<u8>> {
        let account = self.config.active_bank(bank_code)?;
        let layout = self
            .registry
            .get(bank_code)?
            .layout(format, FileType::Remittance)?;
        let batch = BatchBuilder::new(&layout, sequence, Utc::now().naive_utc())
            .account(account)
            .titles(titles)
            .build()?;

        info!(
            bank = bank_code,
            %format,
            sequence,
            titles = batch.titles().len(),
            "Generated remittance"
        );
        Ok(codec::encode(&batch, &layout)?)
    }

    /// Decode, validate and store a remittance file
    pub async fn submit_remittance(&mut self, job: BatchJob) -> CnabResult<StoredBatch> {
        if job.file_type != FileType::Remittance {
            return Err(CnabError::InvalidFile(format!(
                "'{}' is not a remittance file",
                job.file_name
            )));
        }

        let processed = process_job(&self.registry, &self.config, &self.validator, &job)?;
        let stored = StoredBatch::new(processed.file_name, processed.batch, processed.report);
        self.storage.save_batch(&stored).await?;

        info!(
            id = %stored.id,
            file = %stored.file_name,
            status = ?stored.status,
            "Stored remittance"
        );
        Ok(stored)
    }

    /// Decode and validate a return file, reconcile it against a stored
    /// remittance and record the settlement statuses
    pub async fn process_return(
        &mut self,
        job: BatchJob,
        remittance_id: &str,
    ) -> CnabResult<ProcessingSummary> {
        if job.file_type != FileType::Return {
            return Err(CnabError::InvalidFile(format!(
                "'{}' is not a return file",
                job.file_name
            )));
        }

        let remittance = self
            .storage
            .get_batch(remittance_id)
            .await?
            .ok_or_else(|| CnabError::NotFound(remittance_id.to_string()))?;

        let processed = process_job(&self.registry, &self.config, &self.validator, &job)?;
        let engine = ReconciliationEngine::new(self.registry.get(&job.bank_code)?);
        let statuses = engine.reconcile(&remittance.batch, &processed.batch)?;

        let titles = processed.batch.titles();
        let with_errors = titles
            .iter()
            .filter(|t| matches!(statuses.get(&t.document_id()), Some(SettlementStatus::Rejected(_))))
            .count();
        let total_value: BigDecimal = titles
            .iter()
            .filter_map(|t| t.amount(fields::PAID_AMOUNT))
            .sum();
        let processed_titles = titles.len();

        // Unmatched return titles are reported but never become part of the remittance
        let outbound: BTreeSet<DocumentId> = remittance
            .batch
            .titles()
            .iter()
            .map(|t| t.document_id())
            .collect();
        let (matched, unmatched): (SettlementMap, SettlementMap) = statuses
            .iter()
            .map(|(id, status)| (id.clone(), status.clone()))
            .partition(|(id, _)| outbound.contains(id));
        if !unmatched.is_empty() {
            warn!(
                remittance = remittance_id,
                unmatched = unmatched.len(),
                "Return carries titles the remittance does not know"
            );
        }

        let mut stored = StoredBatch::new(processed.file_name, processed.batch, processed.report);
        if stored.status == BatchStatus::Validated {
            stored.status = BatchStatus::Reconciled;
        }
        self.storage
            .save_reconciliation(remittance_id, &stored, &matched)
            .await?;

        let reconciliation = ReconciliationSummary::from_statuses(&statuses);
        info!(
            id = %stored.id,
            remittance = remittance_id,
            processed = processed_titles,
            with_errors,
            total_value = %total_value,
            "Processed return"
        );

        Ok(ProcessingSummary {
            batch_id: stored.id,
            processed: processed_titles,
            with_errors,
            total_value,
            statuses,
            unmatched: unmatched.into_keys().collect(),
            reconciliation,
        })
    }

    /// Settlement statuses recorded for a remittance
    pub async fn settlements(&self, remittance_id: &str) -> CnabResult<SettlementMap> {
        self.storage.get_settlements(remittance_id).await
    }

    /// Decode and validate independent jobs in parallel
    ///
    /// Each job runs on a blocking worker under the configured timeout.
    /// Results come back in job order; nothing is stored.
    pub async fn process_many(&self, jobs: Vec<BatchJob>) -> Vec<CnabResult<ProcessedBatch>> {
        let timeout_ms = self.config.processing.batch_timeout_ms;
        let timeout = Duration::from_millis(timeout_ms);

        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let registry = Arc::clone(&self.registry);
                let config = Arc::clone(&self.config);
                let validator = Arc::clone(&self.validator);
                tokio::spawn(async move {
                    let file_name = job.file_name.clone();
                    let work = tokio::task::spawn_blocking(move || {
                        process_job(&registry, &config, &validator, &job)
                    });
                    match tokio::time::timeout(timeout, work).await {
                        Ok(Ok(result)) => result,
                        Ok(Err(e)) => Err(CnabError::Worker(e.to_string())),
                        Err(_) => {
                            warn!(file = %file_name, timeout_ms, "File processing timed out");
                            Err(CnabError::Timeout(timeout_ms))
                        }
                    }
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(
                handle
                    .await
                    .unwrap_or_else(|e| Err(CnabError::Worker(e.to_string()))),
            );
        }
        results
    }
}
