//! Trailer control totals

use bigdecimal::BigDecimal;

use crate::layout::fields;
use crate::types::Batch;

/// A trailer total that disagrees with the batch content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsMismatch {
    /// Canonical name of the trailer field
    pub field: &'static str,
    /// Index of the trailer record in the batch
    pub record_index: usize,
    pub declared: String,
    pub computed: String,
}

/// Compare every declared total the trailers carry with the computed value
///
/// Returns mismatches in a fixed order: record count, title count, total
/// amount, file record count.
pub fn check(batch: &Batch) -> Vec<TotalsMismatch> {
    let mut mismatches = Vec::new();
    let totals_index = batch.totals_record_index();

    if let Some(index) = totals_index {
        if batch.declared_count() != batch.computed_count() {
            mismatches.push(TotalsMismatch {
                field: fields::RECORD_COUNT,
                record_index: index,
                declared: batch.declared_count().to_string(),
                computed: batch.computed_count().to_string(),
            });
        }
    }

    let title_count = batch.titles().len() as u64;
    if let Some((index, declared)) = declared_number(batch, fields::TITLE_COUNT) {
        if declared != title_count {
            mismatches.push(TotalsMismatch {
                field: fields::TITLE_COUNT,
                record_index: index,
                declared: declared.to_string(),
                computed: title_count.to_string(),
            });
        }
    }

    if let Some(index) = totals_index {
        let computed: BigDecimal = batch.computed_total();
        if *batch.declared_total() != computed {
            mismatches.push(TotalsMismatch {
                field: fields::TOTAL_AMOUNT,
                record_index: index,
                declared: batch.declared_total().to_string(),
                computed: computed.to_string(),
            });
        }
    }

    let record_total = batch.records().len() as u64;
    if let Some((index, declared)) = declared_number(batch, fields::FILE_RECORD_COUNT) {
        if declared != record_total {
            mismatches.push(TotalsMismatch {
                field: fields::FILE_RECORD_COUNT,
                record_index: index,
                declared: declared.to_string(),
                computed: record_total.to_string(),
            });
        }
    }

    mismatches
}

fn declared_number(batch: &Batch, name: &str) -> Option<(usize, u64)> {
    batch
        .records()
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, r)| r.number(name).map(|n| (i, n)))
}
