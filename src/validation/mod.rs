//! Batch validator: structural and domain checks over a decoded batch
//!
//! Validation never fails. Every check appends [`ValidationIssue`]s to the
//! report and the next check runs regardless, so a caller always sees the
//! complete list of problems of a file.

use bigdecimal::BigDecimal;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use crate::codec::totals;
use crate::layout::fields;
use crate::traits::ValidationRule;
use crate::types::{Batch, DocumentId, FieldValue, FileType};

/// Kind of problem found in a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    BankCodeMismatch,
    SequenceOutOfOrder,
    SequenceGap,
    CountMismatch,
    ChecksumMismatch,
    ImplausibleDate,
    NegativeAmount,
    ZeroAmount,
    MissingDocumentId,
    DuplicateDocumentId,
    /// Raised by a custom [`ValidationRule`]
    Custom(String),
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueCode::Custom(name) => write!(f, "{}", name),
            other => write!(f, "{:?}", other),
        }
    }
}

/// One problem found in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    /// Index of the offending record in the batch, if any
    pub record_index: Option<usize>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, record_index: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            code,
            record_index,
            message: message.into(),
        }
    }
}

/// Outcome of validating a batch; no issues means the batch passed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub bank_code: String,
    pub file_type: FileType,
    pub record_count: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues_with(&self, code: &IssueCode) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| &i.code == code).collect()
    }

    /// Number of distinct records with at least one issue
    pub fn records_with_issues(&self) -> usize {
        let mut indexes: Vec<usize> = self.issues.iter().filter_map(|i| i.record_index).collect();
        indexes.sort_unstable();
        indexes.dedup();
        indexes.len()
    }
}

/// Limits for the domain checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Dates before this are implausible
    pub earliest_date: NaiveDate,
    /// Dates more than this many days after file generation are implausible
    pub max_future_days: u64,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            earliest_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN),
            max_future_days: 3650,
        }
    }
}

/// Runs the built-in checks followed by any custom rules
pub struct BatchValidator {
    policy: ValidationPolicy,
    rules: Vec<Box<dyn ValidationRule>>,
}

impl BatchValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self {
            policy,
            rules: Vec::new(),
        }
    }

    /// Add a custom rule; rules run in the order they were added
    pub fn with_rule(mut self, rule: Box<dyn ValidationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn validate(&self, batch: &Batch) -> ValidationReport {
        let mut issues = Vec::new();

        check_bank_codes(batch, &mut issues);
        check_sequences(batch, &mut issues);
        check_totals(batch, &mut issues);
        self.check_domain(batch, &mut issues);

        for rule in &self.rules {
            let found = rule.check(batch);
            debug!(rule = rule.name(), issues = found.len(), "Custom validation rule ran");
            issues.extend(found);
        }

        let report = ValidationReport {
            bank_code: batch.bank_code().to_string(),
            file_type: batch.file_type(),
            record_count: batch.records().len(),
            issues,
        };
        info!(
            bank = %report.bank_code,
            file_type = %report.file_type,
            issues = report.issues.len(),
            "Batch validated"
        );
        report
    }

    fn check_domain(&self, batch: &Batch, issues: &mut Vec<ValidationIssue>) {
        let earliest = self.policy.earliest_date;
        let latest = batch
            .generated_at()
            .date()
            .checked_add_days(Days::new(self.policy.max_future_days))
            .unwrap_or(NaiveDate::MAX);
        let zero = BigDecimal::from(0);

        for (index, record) in batch.details() {
            for (name, field) in record.fields() {
                match &field.value {
                    FieldValue::Date(Some(date)) if *date < earliest || *date > latest => {
                        issues.push(ValidationIssue::new(
                            IssueCode::ImplausibleDate,
                            Some(index),
                            format!("{} {} is outside {} to {}", name, date, earliest, latest),
                        ));
                    }
                    FieldValue::Amount(amount) if *amount < zero => {
                        issues.push(ValidationIssue::new(
                            IssueCode::NegativeAmount,
                            Some(index),
                            format!("{} is negative: {}", name, amount),
                        ));
                    }
                    _ => {}
                }
            }
        }

        let mut seen: HashMap<DocumentId, usize> = HashMap::new();
        for title in batch.titles() {
            let document_id = title.document_id();
            if let (Some(due), Some(issued)) =
                (title.date(fields::DUE_DATE), title.date(fields::ISSUE_DATE))
            {
                if due < issued {
                    issues.push(ValidationIssue::new(
                        IssueCode::ImplausibleDate,
                        Some(title.index),
                        format!("title {} is due {} before its issue date {}", document_id, due, issued),
                    ));
                }
            }

            if batch.file_type() == FileType::Remittance {
                if let Some(amount) = title.amount(fields::AMOUNT) {
                    if *amount == zero {
                        issues.push(ValidationIssue::new(
                            IssueCode::ZeroAmount,
                            Some(title.index),
                            format!("title {} has no face value", document_id),
                        ));
                    }
                }
            }

            if document_id.is_empty() || document_id.as_str().chars().all(|c| c == '0') {
                issues.push(ValidationIssue::new(
                    IssueCode::MissingDocumentId,
                    Some(title.index),
                    "title has no document id",
                ));
                continue;
            }

            // Returns may report several occurrences for the same title
            if batch.file_type() == FileType::Remittance {
                if let Some(first) = seen.get(&document_id) {
                    issues.push(ValidationIssue::new(
                        IssueCode::DuplicateDocumentId,
                        Some(title.index),
                        format!(
                            "document id {} already used by record {}",
                            document_id, first
                        ),
                    ));
                } else {
                    seen.insert(document_id, title.index);
                }
            }
        }
    }
}

impl Default for BatchValidator {
    fn default() -> Self {
        Self::new(ValidationPolicy::default())
    }
}

impl fmt::Debug for BatchValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchValidator")
            .field("policy", &self.policy)
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Validate with the default policy and no custom rules
pub fn validate(batch: &Batch) -> ValidationReport {
    BatchValidator::default().validate(batch)
}

fn check_bank_codes(batch: &Batch, issues: &mut Vec<ValidationIssue>) {
    for (index, record) in batch.records().iter().enumerate() {
        if let Some(code) = record.text(fields::BANK_CODE) {
            if code != batch.bank_code() {
                issues.push(ValidationIssue::new(
                    IssueCode::BankCodeMismatch,
                    Some(index),
                    format!(
                        "{} declares bank {}, header declares {}",
                        record.layout(),
                        code,
                        batch.bank_code()
                    ),
                ));
            }
        }
    }
}

fn check_sequences(batch: &Batch, issues: &mut Vec<ValidationIssue>) {
    let mut previous: Option<u64> = None;
    for (index, record) in batch.details() {
        let Some(sequence) = record.number(fields::SEQUENCE) else {
            continue;
        };
        if let Some(prev) = previous {
            if sequence <= prev {
                issues.push(ValidationIssue::new(
                    IssueCode::SequenceOutOfOrder,
                    Some(index),
                    format!("sequence {} follows {}", sequence, prev),
                ));
            } else if sequence != prev + 1 {
                issues.push(ValidationIssue::new(
                    IssueCode::SequenceGap,
                    Some(index),
                    format!("sequence jumps from {} to {}", prev, sequence),
                ));
            }
        }
        previous = Some(sequence);
    }
}

fn check_totals(batch: &Batch, issues: &mut Vec<ValidationIssue>) {
    for mismatch in totals::check(batch) {
        let code = if mismatch.field == fields::TOTAL_AMOUNT {
            IssueCode::ChecksumMismatch
        } else {
            IssueCode::CountMismatch
        };
        issues.push(ValidationIssue::new(
            code,
            Some(mismatch.record_index),
            format!(
                "{} declares {}, computed {}",
                mismatch.field, mismatch.declared, mismatch.computed
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banks::Santander;
    use crate::codec::BatchBuilder;
    use crate::layout::FileLayout;
    use crate::traits::BankAdapter;
    use crate::types::{CnabFormat, Title};
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn layout() -> FileLayout {
        Santander::new()
            .layout(CnabFormat::Cnab240, FileType::Remittance)
            .unwrap()
    }

    fn title(id: &str, amount: &str) -> Title {
        Title::new(
            id,
            BigDecimal::from_str(amount).unwrap(),
            date(2024, 7, 10),
            date(2024, 6, 1),
        )
    }

    fn builder(layout: &FileLayout) -> BatchBuilder<'_> {
        BatchBuilder::new(layout, 3, date(2024, 6, 3).and_hms_opt(10, 0, 0).unwrap())
    }

    #[test]
    fn test_valid_batch_has_no_issues() {
        let layout = layout();
        let batch = builder(&layout)
            .titles([title("D1", "100.00"), title("D2", "250.50")])
            .build()
            .unwrap();
        let report = validate(&batch);
        assert!(report.is_valid(), "{:?}", report.issues);
        assert_eq!(report.record_count, 8);
    }

    fn set(batch: &mut Batch, layout: &FileLayout, index: usize, name: &str, value: FieldValue) {
        let record = &mut batch.records[index];
        let record_layout = layout.record(record.layout()).unwrap();
        assert!(record_layout.assign(record, name, &value).unwrap());
    }

    fn found(report: &ValidationReport) -> Vec<(IssueCode, Option<usize>)> {
        report
            .issues
            .iter()
            .map(|i| (i.code.clone(), i.record_index))
            .collect()
    }

    // Two titles: headers 0-1, P/Q segments 2-5, trailers 6-7
    fn two_titles(layout: &FileLayout) -> Batch {
        builder(layout)
            .titles([title("D1", "100.00"), title("D2", "250.50")])
            .build()
            .unwrap()
    }

    #[test]
    fn test_foreign_bank_codes_are_each_reported() {
        let layout = layout();
        let mut batch = two_titles(&layout);
        set(&mut batch, &layout, 3, fields::BANK_CODE, FieldValue::from("341"));
        set(&mut batch, &layout, 6, fields::BANK_CODE, FieldValue::from("341"));

        let report = validate(&batch);
        assert_eq!(
            found(&report),
            vec![
                (IssueCode::BankCodeMismatch, Some(3)),
                (IssueCode::BankCodeMismatch, Some(6)),
            ]
        );
    }

    #[test]
    fn test_swapped_sequences_are_reported() {
        let layout = layout();
        let mut batch = two_titles(&layout);
        set(&mut batch, &layout, 3, fields::SEQUENCE, FieldValue::Number(3));
        set(&mut batch, &layout, 4, fields::SEQUENCE, FieldValue::Number(2));

        let report = validate(&batch);
        assert_eq!(
            found(&report),
            vec![
                (IssueCode::SequenceGap, Some(3)),
                (IssueCode::SequenceOutOfOrder, Some(4)),
                (IssueCode::SequenceGap, Some(5)),
            ]
        );
    }

    #[test]
    fn test_skipped_sequence_is_a_gap() {
        let layout = layout();
        let mut batch = two_titles(&layout);
        set(&mut batch, &layout, 5, fields::SEQUENCE, FieldValue::Number(5));
        set(&mut batch, &layout, 2, fields::BANK_CODE, FieldValue::from("001"));

        let report = validate(&batch);
        assert_eq!(
            found(&report),
            vec![
                (IssueCode::BankCodeMismatch, Some(2)),
                (IssueCode::SequenceGap, Some(5)),
            ]
        );
    }

    #[test]
    fn test_total_mismatch_is_checksum_issue() {
        let layout = layout();
        let batch = builder(&layout)
            .title(title("D1", "100.00"))
            .declared_total(BigDecimal::from(1))
            .build()
            .unwrap();
        let report = validate(&batch);
        assert_eq!(report.issues_with(&IssueCode::ChecksumMismatch).len(), 1);
        assert_eq!(report.issues_with(&IssueCode::CountMismatch).len(), 0);
    }

    #[test]
    fn test_count_mismatch_is_reported() {
        let layout = layout();
        let batch = builder(&layout)
            .title(title("D1", "100.00"))
            .declared_count(5)
            .build()
            .unwrap();
        let report = validate(&batch);
        let counts = report.issues_with(&IssueCode::CountMismatch);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].record_index, Some(4));
    }

    #[test]
    fn test_domain_checks_accumulate() {
        let layout = layout();
        let mut backdated = title("D3", "5.00");
        backdated.due_date = date(2024, 5, 1);
        let mut ancient = title("D4", "5.00");
        ancient.issue_date = date(1990, 1, 1);
        let batch = builder(&layout)
            .titles([
                title("D1", "0.00"),
                title("D1", "10.00"),
                backdated,
                ancient,
                title("", "1.00"),
            ])
            .build()
            .unwrap();

        let report = validate(&batch);
        assert_eq!(report.issues_with(&IssueCode::ZeroAmount).len(), 1);
        assert_eq!(report.issues_with(&IssueCode::DuplicateDocumentId).len(), 1);
        assert_eq!(report.issues_with(&IssueCode::ImplausibleDate).len(), 2);
        assert_eq!(report.issues_with(&IssueCode::MissingDocumentId).len(), 1);
        assert!(report.records_with_issues() >= 4);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let layout = layout();
        let batch = builder(&layout)
            .title(title("D1", "0.00"))
            .declared_total(BigDecimal::from(3))
            .build()
            .unwrap();
        assert_eq!(validate(&batch), validate(&batch));
    }

    struct NoLargeTitles;

    impl ValidationRule for NoLargeTitles {
        fn name(&self) -> &str {
            "no_large_titles"
        }

        fn check(&self, batch: &Batch) -> Vec<ValidationIssue> {
            batch
                .titles()
                .into_iter()
                .filter(|t| t.amount(fields::AMOUNT).is_some_and(|a| *a > BigDecimal::from(1000)))
                .map(|t| {
                    ValidationIssue::new(
                        IssueCode::Custom("LargeTitle".to_string()),
                        Some(t.index),
                        "title above approval limit",
                    )
                })
                .collect()
        }
    }

    #[test]
    fn test_custom_rules_run_after_builtin_checks() {
        let layout = layout();
        let batch = builder(&layout)
            .titles([title("D1", "5000.00"), title("D2", "10.00")])
            .declared_total(BigDecimal::from(0))
            .build()
            .unwrap();
        let report = BatchValidator::default()
            .with_rule(Box::new(NoLargeTitles))
            .validate(&batch);
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].code, IssueCode::ChecksumMismatch);
        assert_eq!(report.issues[1].code, IssueCode::Custom("LargeTitle".to_string()));
        assert_eq!(report.issues[1].record_index, Some(2));
    }
}
