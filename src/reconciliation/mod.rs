//! Reconciliation engine: matches remittance titles against return occurrences
//!
//! Every title of the outbound (remittance) batch starts as
//! [`SettlementStatus::Pending`]. Each title of the inbound (return) batch is
//! then applied in file order, using the bank's return-code table to decide
//! whether it settles, rejects or merely informs about the title.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::banks::ReturnCodeClass;
use crate::layout::fields;
use crate::traits::BankAdapter;
use crate::types::{Batch, DocumentId, FileType, SettlementStatus};

/// Reason given to inbound titles without an outbound counterpart
pub const NO_MATCH_REASON: &str = "no matching outbound record";

/// Errors that abort reconciliation of a batch pair
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconciliationError {
    #[error("Document id {0} appears more than once in the remittance")]
    DuplicateDocumentId(DocumentId),
    #[error("Batch belongs to bank {found}, engine handles bank {expected}")]
    BankMismatch { expected: String, found: String },
    #[error("Expected a {expected} batch, got a {found} batch")]
    UnexpectedFileType { expected: FileType, found: FileType },
}

/// Result type for reconciliation
pub type ReconciliationResult<T> = Result<T, ReconciliationError>;

/// Settlement statuses keyed by document id
pub type SettlementMap = BTreeMap<DocumentId, SettlementStatus>;

/// Counts per settlement status
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub pending: usize,
    pub settled: usize,
    pub partially_settled: usize,
    pub rejected: usize,
}

impl ReconciliationSummary {
    pub fn from_statuses(statuses: &SettlementMap) -> Self {
        statuses
            .values()
            .fold(Self::default(), |mut summary, status| {
                match status {
                    SettlementStatus::Pending => summary.pending += 1,
                    SettlementStatus::Settled => summary.settled += 1,
                    SettlementStatus::PartiallySettled => summary.partially_settled += 1,
                    SettlementStatus::Rejected(_) => summary.rejected += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.pending + self.settled + self.partially_settled + self.rejected
    }
}

/// Outbound title being tracked during reconciliation
struct OpenTitle {
    face_value: BigDecimal,
    paid: BigDecimal,
    status: SettlementStatus,
}

/// Matches remittance batches against return batches of one bank
pub struct ReconciliationEngine {
    adapter: Arc<dyn BankAdapter>,
}

impl ReconciliationEngine {
    pub fn new(adapter: Arc<dyn BankAdapter>) -> Self {
        Self { adapter }
    }

    /// Compute the settlement status of every title involved
    ///
    /// The result holds every outbound document id plus any inbound id that
    /// has no outbound counterpart (rejected).
    pub fn reconcile(&self, outbound: &Batch, inbound: &Batch) -> ReconciliationResult<SettlementMap> {
        self.check_pair(outbound, inbound)?;

        let mut open: HashMap<DocumentId, OpenTitle> = HashMap::new();
        for title in outbound.titles() {
            let id = title.document_id();
            if open.contains_key(&id) {
                return Err(ReconciliationError::DuplicateDocumentId(id));
            }
            let face_value = title
                .amount(fields::AMOUNT)
                .cloned()
                .unwrap_or_else(|| BigDecimal::from(0));
            open.insert(
                id,
                OpenTitle {
                    face_value,
                    paid: BigDecimal::from(0),
                    status: SettlementStatus::Pending,
                },
            );
        }

        let table = self.adapter.return_code_table(inbound.format());
        let mut unmatched = SettlementMap::new();
        let zero = BigDecimal::from(0);

        for title in inbound.titles() {
            let id = title.document_id();
            let Some(entry) = open.get_mut(&id) else {
                debug!(document_id = %id, "Return title has no remittance counterpart");
                unmatched.insert(id, SettlementStatus::Rejected(NO_MATCH_REASON.to_string()));
                continue;
            };

            let code = title.text(fields::OCCURRENCE_CODE).unwrap_or_default();
            let Some(return_code) = table.classify(code) else {
                warn!(document_id = %id, occurrence = code, "Unknown occurrence code, status unchanged");
                continue;
            };

            match return_code.class {
                ReturnCodeClass::Settled => {
                    let paid = title
                        .amount(fields::PAID_AMOUNT)
                        .filter(|p| **p > zero)
                        .cloned()
                        .unwrap_or_else(|| entry.face_value.clone());
                    entry.paid += paid;
                    entry.status = if entry.paid >= entry.face_value {
                        SettlementStatus::Settled
                    } else {
                        SettlementStatus::PartiallySettled
                    };
                }
                // Money already received is never undone by a later write-off
                ReturnCodeClass::Rejected
                    if matches!(
                        entry.status,
                        SettlementStatus::Settled | SettlementStatus::PartiallySettled
                    ) =>
                {
                    debug!(
                        document_id = %id,
                        occurrence = code,
                        "Rejection ignored for a title with payments"
                    );
                }
                ReturnCodeClass::Rejected => {
                    let motives = title.text(fields::REJECTION_REASONS).unwrap_or_default();
                    entry.status =
                        SettlementStatus::Rejected(table.rejection_reason(return_code, motives));
                }
                ReturnCodeClass::Acknowledged | ReturnCodeClass::Informational => {}
            }
            debug!(
                document_id = %id,
                occurrence = code,
                status = %entry.status,
                "Applied return occurrence"
            );
        }

        let mut statuses: SettlementMap = open
            .into_iter()
            .map(|(id, entry)| (id, entry.status))
            .collect();
        statuses.extend(unmatched);

        let summary = ReconciliationSummary::from_statuses(&statuses);
        info!(
            bank = %outbound.bank_code(),
            settled = summary.settled,
            partially_settled = summary.partially_settled,
            rejected = summary.rejected,
            pending = summary.pending,
            "Reconciliation complete"
        );
        Ok(statuses)
    }

    fn check_pair(&self, outbound: &Batch, inbound: &Batch) -> ReconciliationResult<()> {
        if outbound.file_type() != FileType::Remittance {
            return Err(ReconciliationError::UnexpectedFileType {
                expected: FileType::Remittance,
                found: outbound.file_type(),
            });
        }
        if inbound.file_type() != FileType::Return {
            return Err(ReconciliationError::UnexpectedFileType {
                expected: FileType::Return,
                found: inbound.file_type(),
            });
        }

        let bank = self.adapter.bank_identifier().code;
        for batch in [outbound, inbound] {
            if batch.bank_code() != bank {
                return Err(ReconciliationError::BankMismatch {
                    expected: bank,
                    found: batch.bank_code().to_string(),
                });
            }
        }
        Ok(())
    }
}
