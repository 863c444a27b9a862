//! Integration tests for cnab-core

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use std::str::FromStr;
use std::sync::Arc;

use cnab_core::banks::{BancoDoBrasil, Santander};
use cnab_core::layout::FileLayout;
use cnab_core::reconciliation::NO_MATCH_REASON;
use cnab_core::settings::ProcessingConfig;
use cnab_core::utils::MemoryStorage;
use cnab_core::{
    decode, encode, validate, BankAdapter, Batch, BatchBuilder, BatchJob, BatchProcessor,
    BatchStatus, BatchStorage, BatchValidator, CnabConfig, CnabError, CnabFormat, DecodeError,
    DocumentId, FileType, IssueCode, Payer, ReconciliationEngine, SettlementStatus, Title,
    ValidationIssue, ValidationReport, ValidationRule,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(8, 15, 0).unwrap()
}

fn amount(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

fn santander_240(file_type: FileType) -> FileLayout {
    Santander::new().layout(CnabFormat::Cnab240, file_type).unwrap()
}

fn build(layout: &FileLayout, generated_at: NaiveDateTime, titles: Vec<Title>) -> Batch {
    BatchBuilder::new(layout, 1, generated_at)
        .titles(titles)
        .build()
        .unwrap()
}

/// Remittance with D1 = 100.00 and D2 = 250.50
fn sample_remittance() -> Batch {
    build(
        &santander_240(FileType::Remittance),
        at(2024, 6, 3),
        vec![
            Title::new("D1", amount("100.00"), date(2024, 7, 1), date(2024, 6, 3)),
            Title::new("D2", amount("250.50"), date(2024, 7, 15), date(2024, 6, 3)),
        ],
    )
}

fn santander_engine() -> ReconciliationEngine {
    ReconciliationEngine::new(Arc::new(Santander::new()))
}

#[test]
fn test_settlement_of_one_title_leaves_other_pending() {
    let outbound = sample_remittance();
    let inbound = build(
        &santander_240(FileType::Return),
        at(2024, 7, 2),
        vec![Title::new("D1", amount("100.00"), date(2024, 7, 1), date(2024, 6, 3)).settled(
            "06",
            amount("100.00"),
            date(2024, 7, 1),
        )],
    );

    let statuses = santander_engine().reconcile(&outbound, &inbound).unwrap();

    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[&DocumentId::new("D1")], SettlementStatus::Settled);
    assert_eq!(statuses[&DocumentId::new("D2")], SettlementStatus::Pending);
}

#[test]
fn test_empty_return_keeps_everything_pending() {
    let outbound = sample_remittance();
    let inbound = build(&santander_240(FileType::Return), at(2024, 7, 2), vec![]);

    let statuses = santander_engine().reconcile(&outbound, &inbound).unwrap();

    assert_eq!(statuses.len(), 2);
    assert!(statuses.values().all(|s| *s == SettlementStatus::Pending));
}

#[test]
fn test_unmatched_return_title_is_rejected() {
    let outbound = sample_remittance();
    let inbound = build(
        &santander_240(FileType::Return),
        at(2024, 7, 2),
        vec![Title::new("X9", amount("10.00"), date(2024, 7, 1), date(2024, 6, 3)).settled(
            "06",
            amount("10.00"),
            date(2024, 7, 1),
        )],
    );

    let statuses = santander_engine().reconcile(&outbound, &inbound).unwrap();

    assert_eq!(statuses.len(), 3);
    assert_eq!(
        statuses[&DocumentId::new("X9")],
        SettlementStatus::Rejected(NO_MATCH_REASON.to_string())
    );
    assert_eq!(statuses[&DocumentId::new("D1")], SettlementStatus::Pending);
}

#[test]
fn test_febraban_rejection_motives() {
    let outbound = sample_remittance();
    let inbound = build(
        &santander_240(FileType::Return),
        at(2024, 6, 4),
        vec![Title::new("D2", amount("250.50"), date(2024, 7, 15), date(2024, 6, 3))
            .rejected("03", "0820")],
    );

    let statuses = santander_engine().reconcile(&outbound, &inbound).unwrap();

    assert_eq!(
        statuses[&DocumentId::new("D2")],
        SettlementStatus::Rejected(
            "Entrada rejeitada: Nosso número inválido; Valor do título inválido".to_string()
        )
    );
}

#[test]
fn test_validation_is_idempotent() {
    let batch = sample_remittance();
    let first = validate(&batch);
    let second = validate(&batch);

    assert!(first.is_valid());
    assert_eq!(first, second);
    assert_eq!(first.record_count, batch.records().len());
}

#[test]
fn test_declared_total_mismatch_is_reported() {
    let layout = santander_240(FileType::Remittance);
    let batch = BatchBuilder::new(&layout, 1, at(2024, 6, 3))
        .title(Title::new("D1", amount("100.00"), date(2024, 7, 1), date(2024, 6, 3)))
        .declared_total(amount("99.99"))
        .build()
        .unwrap();

    let report = validate(&batch);
    assert!(!report.is_valid());
    assert_eq!(report.issues_with(&IssueCode::ChecksumMismatch).len(), 1);

    let bytes = encode(&batch, &layout).unwrap();
    assert!(matches!(
        decode(&bytes, &layout),
        Err(DecodeError::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_decode_errors() {
    let layout = santander_240(FileType::Remittance);
    assert_eq!(decode(b"", &layout), Err(DecodeError::Empty));
    assert!(matches!(
        decode(b"03300000short\r\n", &layout),
        Err(DecodeError::MalformedRecord { line: 1, .. })
    ));

    let bytes = encode(&sample_remittance(), &layout).unwrap();
    let bb_layout = BancoDoBrasil::new()
        .layout(CnabFormat::Cnab240, FileType::Remittance)
        .unwrap();
    // Santander declares other layout versions in its headers
    assert!(matches!(
        decode(&bytes, &bb_layout),
        Err(DecodeError::MalformedRecord { line: 1, .. })
    ));
}

fn without_line(bytes: &[u8], index: usize) -> Vec<u8> {
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    text.split_inclusive('\n')
        .enumerate()
        .filter(|(i, _)| *i != index)
        .flat_map(|(_, line)| line.bytes())
        .collect()
}

#[test]
fn test_decode_rejects_title_missing_segment() {
    let layout = santander_240(FileType::Remittance);
    let bytes = encode(&sample_remittance(), &layout).unwrap();

    // First Q dropped: the second P shows up where the Q belongs
    assert!(matches!(
        decode(&without_line(&bytes, 3), &layout),
        Err(DecodeError::MalformedRecord { line: 4, .. })
    ));
    // Last Q dropped: the batch trailer arrives mid-title
    assert!(matches!(
        decode(&without_line(&bytes, 5), &layout),
        Err(DecodeError::MalformedRecord { line: 6, .. })
    ));
}

#[test]
fn test_decode_rejects_record_count_below_header_and_trailer() {
    let layout = Santander::new()
        .layout(CnabFormat::Cnab400, FileType::Remittance)
        .unwrap();
    let bytes = encode(&build(&layout, at(2024, 6, 3), vec![]), &layout).unwrap();
    let text = String::from_utf8(bytes).unwrap();

    let tampered: String = text
        .split_inclusive('\n')
        .map(|line| {
            if line.starts_with('9') {
                format!("9000000{}", &line[7..])
            } else {
                line.to_string()
            }
        })
        .collect();

    assert!(matches!(
        decode(tampered.as_bytes(), &layout),
        Err(DecodeError::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_encoded_lines_have_layout_width() {
    for format in [CnabFormat::Cnab240, CnabFormat::Cnab400] {
        let layout = BancoDoBrasil::new().layout(format, FileType::Remittance).unwrap();
        let batch = build(
            &layout,
            at(2024, 6, 3),
            vec![Title::new("101", amount("10.00"), date(2024, 7, 1), date(2024, 6, 3))],
        );
        let bytes = encode(&batch, &layout).unwrap();
        for line in bytes.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            assert_eq!(line.len(), format.line_width());
        }
    }
}

#[test]
fn test_report_serializes_to_json() {
    let layout = santander_240(FileType::Remittance);
    let batch = BatchBuilder::new(&layout, 1, at(2024, 6, 3))
        .title(Title::new("D1", amount("0.00"), date(2024, 7, 1), date(2024, 6, 3)))
        .build()
        .unwrap();
    let report = validate(&batch);
    assert_eq!(report.issues_with(&IssueCode::ZeroAmount).len(), 1);

    let json = serde_json::to_string(&report).unwrap();
    let parsed: ValidationReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, report);
}

fn all_layouts() -> Vec<FileLayout> {
    let adapters: [Arc<dyn BankAdapter>; 2] = [Arc::new(Santander::new()), Arc::new(BancoDoBrasil::new())];
    let mut layouts = Vec::new();
    for adapter in &adapters {
        for file_type in [FileType::Remittance, FileType::Return] {
            for format in [CnabFormat::Cnab240, CnabFormat::Cnab400] {
                layouts.push(adapter.layout(format, file_type).unwrap());
            }
        }
    }
    layouts
}

/// Largest file sequence the header of a layout can hold
fn max_sequence(layout: &FileLayout) -> u64 {
    let width = layout
        .file_header()
        .and_then(|header| header.field(cnab_core::layout::fields::FILE_SEQUENCE))
        .unwrap()
        .width;
    10u64.pow(width as u32) - 1
}

fn payer_strategy() -> impl Strategy<Value = Payer> {
    (
        1u64..=2,
        "[0-9]{11}",
        "[A-Z]{1,20}",
        "[A-Z ]{0,30}",
        "[0-9]{8}",
        "[A-Z]{2}",
    )
        .prop_map(|(document_type, document, name, address, zip, state)| Payer {
            document_type,
            document,
            name,
            address,
            district: "CENTRO".to_string(),
            zip,
            city: "SAO PAULO".to_string(),
            state,
        })
}

fn title_strategy() -> impl Strategy<Value = Title> {
    (
        "[0-9]{1,8}",
        1u64..10_000_000_000,
        0i64..3_000,
        0u64..60,
        proptest::option::of(payer_strategy()),
    )
        .prop_map(|(id, cents, issue_offset, term, payer)| {
            let issued = date(2010, 1, 1) + chrono::Days::new(issue_offset as u64);
            let due = issued + chrono::Days::new(term);
            let title = Title::new(id, BigDecimal::new(cents.into(), 2), due, issued);
            match payer {
                Some(payer) => title.with_payer(payer),
                None => title,
            }
        })
}

fn return_title_strategy() -> impl Strategy<Value = Title> {
    (
        "[0-9]{1,8}",
        1u64..10_000_000_000,
        0i64..3_000,
        0u64..10_000_000_000,
        "[0-9]{2}",
        0u8..3,
    )
        .prop_map(|(id, cents, issue_offset, paid_cents, motive, kind)| {
            let issued = date(2010, 1, 1) + chrono::Days::new(issue_offset as u64);
            let due = issued + chrono::Days::new(30);
            let title = Title::new(id, BigDecimal::new(cents.into(), 2), due, issued);
            match kind {
                0 => title.with_occurrence("02", Some(issued)),
                1 => title.settled("06", BigDecimal::new(paid_cents.into(), 2), due),
                _ => title.rejected("03", motive),
            }
        })
}

proptest! {
    #[test]
    fn prop_encode_decode_round_trip(
        layout_index in 0usize..8,
        sequence_seed in 0u64..10_000_000,
        remittance_titles in proptest::collection::vec(title_strategy(), 0..6),
        return_titles in proptest::collection::vec(return_title_strategy(), 0..6),
    ) {
        let layouts = all_layouts();
        let layout = &layouts[layout_index];
        let sequence = 1 + sequence_seed % max_sequence(layout);
        let titles = match layout.file_type {
            FileType::Remittance => remittance_titles,
            FileType::Return => return_titles,
        };
        let batch = BatchBuilder::new(layout, sequence, at(2024, 6, 3))
            .titles(titles)
            .build()
            .unwrap();

        let bytes = encode(&batch, layout).unwrap();
        let decoded = decode(&bytes, layout).unwrap();
        prop_assert_eq!(decoded, batch);
    }
}

// Pipeline

fn bb_title(id: &str, face: &str) -> Title {
    Title::new(id, amount(face), date(2024, 7, 1), date(2024, 6, 3))
}

fn bb_return_bytes(titles: Vec<Title>) -> Vec<u8> {
    let layout = BancoDoBrasil::new()
        .layout(CnabFormat::Cnab400, FileType::Return)
        .unwrap();
    encode(&build(&layout, at(2024, 7, 2), titles), &layout).unwrap()
}

#[tokio::test]
async fn test_remittance_and_return_workflow() {
    let mut processor = BatchProcessor::new(MemoryStorage::new(), CnabConfig::default());

    let remittance = processor
        .generate_remittance(
            "001",
            CnabFormat::Cnab400,
            12,
            vec![bb_title("101", "100.00"), bb_title("102", "250.50"), bb_title("103", "80.00")],
        )
        .unwrap();
    let stored = processor
        .submit_remittance(BatchJob::remittance("CBR0612.REM", "001", CnabFormat::Cnab400, remittance))
        .await
        .unwrap();
    assert_eq!(stored.status, BatchStatus::Validated);

    let paid_on = date(2024, 7, 1);
    let inbound = bb_return_bytes(vec![
        bb_title("101", "100.00").settled("06", amount("100.00"), paid_on),
        bb_title("102", "250.50").settled("06", amount("50.50"), paid_on),
        bb_title("103", "80.00").rejected("03", "09"),
    ]);
    let summary = processor
        .process_return(
            BatchJob::return_file("CBR0702.RET", "001", CnabFormat::Cnab400, inbound),
            &stored.id,
        )
        .await
        .unwrap();

    assert!(summary.batch_id.starts_with("RET-"));
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.with_errors, 1);
    assert_eq!(summary.total_value, amount("150.50"));
    assert_eq!(summary.reconciliation.settled, 1);
    assert_eq!(summary.reconciliation.partially_settled, 1);
    assert_eq!(summary.reconciliation.rejected, 1);

    let storage = processor.storage();
    let remittance = storage.get_batch(&stored.id).await.unwrap().unwrap();
    assert_eq!(remittance.status, BatchStatus::Reconciled);
    assert_eq!(
        storage
            .get_settlement(&stored.id, &DocumentId::new("00000000000000101"))
            .await
            .unwrap(),
        Some(SettlementStatus::Settled)
    );
    assert!(summary.unmatched.is_empty());
    assert_eq!(processor.settlements(&stored.id).await.unwrap(), summary.statuses);

    let returns = storage
        .list_batches(Some("001"), Some(FileType::Return))
        .await
        .unwrap();
    assert_eq!(returns.len(), 1);
    assert_eq!(returns[0].id, summary.batch_id);
}

#[tokio::test]
async fn test_unmatched_return_titles_stay_out_of_remittance() {
    let mut processor = BatchProcessor::new(MemoryStorage::new(), CnabConfig::default());

    let remittance = processor
        .generate_remittance("001", CnabFormat::Cnab400, 3, vec![bb_title("101", "100.00")])
        .unwrap();
    let stored = processor
        .submit_remittance(BatchJob::remittance("CBR0603.REM", "001", CnabFormat::Cnab400, remittance))
        .await
        .unwrap();

    let paid_on = date(2024, 7, 1);
    let inbound = bb_return_bytes(vec![
        bb_title("101", "100.00").settled("06", amount("100.00"), paid_on),
        bb_title("999", "40.00").settled("06", amount("40.00"), paid_on),
    ]);
    let summary = processor
        .process_return(
            BatchJob::return_file("CBR0702.RET", "001", CnabFormat::Cnab400, inbound),
            &stored.id,
        )
        .await
        .unwrap();

    let stray = DocumentId::new("00000000000000999");
    assert_eq!(summary.unmatched, vec![stray.clone()]);
    assert_eq!(
        summary.statuses[&stray],
        SettlementStatus::Rejected(NO_MATCH_REASON.to_string())
    );

    let settlements = processor.settlements(&stored.id).await.unwrap();
    assert_eq!(settlements.len(), 1);
    assert_eq!(
        settlements[&DocumentId::new("00000000000000101")],
        SettlementStatus::Settled
    );
    assert!(!settlements.contains_key(&stray));
}

#[tokio::test]
async fn test_disabled_bank_is_refused() {
    let mut config = CnabConfig::default();
    let santander = config.banks.iter_mut().find(|b| b.code == "033").unwrap();
    santander.active = false;

    let mut processor = BatchProcessor::new(MemoryStorage::new(), config);
    let bytes = encode(&sample_remittance(), &santander_240(FileType::Remittance)).unwrap();
    let result = processor
        .submit_remittance(BatchJob::remittance("CB0001.REM", "033", CnabFormat::Cnab240, bytes))
        .await;

    assert!(matches!(result, Err(CnabError::BankDisabled(_))));
    assert!(processor.storage().list_batches(None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_process_many_keeps_job_order() {
    let processor = BatchProcessor::new(MemoryStorage::new(), CnabConfig::default());
    let good = encode(&sample_remittance(), &santander_240(FileType::Remittance)).unwrap();

    let results = processor
        .process_many(vec![
            BatchJob::remittance("a.rem", "033", CnabFormat::Cnab240, good.clone()),
            BatchJob::remittance("b.rem", "033", CnabFormat::Cnab240, b"garbage".to_vec()),
            BatchJob::remittance("c.rem", "033", CnabFormat::Cnab240, good),
        ])
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().file_name, "a.rem");
    assert!(matches!(results[1], Err(CnabError::Decode(_))));
    assert!(results[2].as_ref().unwrap().report.is_valid());
}

struct SlowRule;

impl ValidationRule for SlowRule {
    fn name(&self) -> &str {
        "slow"
    }

    fn check(&self, _batch: &Batch) -> Vec<ValidationIssue> {
        std::thread::sleep(std::time::Duration::from_millis(300));
        Vec::new()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_job_times_out() {
    let config = CnabConfig {
        processing: ProcessingConfig {
            batch_timeout_ms: 20,
            ..ProcessingConfig::default()
        },
        ..CnabConfig::default()
    };
    let validator = BatchValidator::new(config.validation.clone()).with_rule(Box::new(SlowRule));
    let processor =
        BatchProcessor::new(MemoryStorage::new(), config).with_validator(validator);
    let bytes = encode(&sample_remittance(), &santander_240(FileType::Remittance)).unwrap();

    let results = processor
        .process_many(vec![BatchJob::remittance("slow.rem", "033", CnabFormat::Cnab240, bytes)])
        .await;

    assert!(matches!(results[0], Err(CnabError::Timeout(20))));
    assert!(processor.storage().list_batches(None, None).await.unwrap().is_empty());
}
