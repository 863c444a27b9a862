//! Core types and data structures for CNAB batches

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::codec::{DecodeError, EncodeError};
use crate::layout::{fields, LayoutError};
use crate::reconciliation::ReconciliationError;
use crate::validation::ValidationReport;

/// CNAB file width variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CnabFormat {
    /// FEBRABAN 240-column layout
    Cnab240,
    /// Bank-specific 400-column layout
    Cnab400,
}

impl CnabFormat {
    /// Number of columns every line of this format must have
    pub fn line_width(&self) -> usize {
        match self {
            CnabFormat::Cnab240 => 240,
            CnabFormat::Cnab400 => 400,
        }
    }
}

impl fmt::Display for CnabFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CnabFormat::Cnab240 => write!(f, "CNAB 240"),
            CnabFormat::Cnab400 => write!(f, "CNAB 400"),
        }
    }
}

/// Direction of a CNAB file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    /// Remessa - outbound file sent to the bank
    Remittance,
    /// Retorno - inbound file received from the bank
    Return,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Remittance => write!(f, "remittance"),
            FileType::Return => write!(f, "return"),
        }
    }
}

/// Record variants found in any CNAB file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Header,
    Detail,
    Trailer,
}

/// Typed value decoded from a fixed-width field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(u64),
    Amount(BigDecimal),
    /// All-zero or blank dates decode to `None`
    Date(Option<NaiveDate>),
    Time(Option<NaiveTime>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<BigDecimal> for FieldValue {
    fn from(value: BigDecimal) -> Self {
        FieldValue::Amount(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(Some(value))
    }
}

/// Raw column content together with its decoded value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub raw: String,
    pub value: FieldValue,
}

/// One line of a CNAB file
///
/// Fields are only ever set through a [`crate::layout::RecordLayout`], which
/// keeps `raw` and `value` consistent with each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    kind: RecordKind,
    layout: String,
    fields: BTreeMap<String, Field>,
}

impl Record {
    pub(crate) fn new(kind: RecordKind, layout: impl Into<String>) -> Self {
        Self {
            kind,
            layout: layout.into(),
            fields: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, name: &str, field: Field) {
        self.fields.insert(name.to_string(), field);
    }

    /// Record variant
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Name of the record layout that produced this record (e.g. `segment_p`)
    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// All stored fields keyed by name
    pub fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Decoded value of a field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).map(|f| &f.value)
    }

    /// Raw fixed-width content of a field
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|f| f.raw.as_str())
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn amount(&self, name: &str) -> Option<&BigDecimal> {
        match self.get(name) {
            Some(FieldValue::Amount(a)) => Some(a),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.get(name) {
            Some(FieldValue::Date(d)) => *d,
            _ => None,
        }
    }

    pub fn time(&self, name: &str) -> Option<NaiveTime> {
        match self.get(name) {
            Some(FieldValue::Time(t)) => *t,
            _ => None,
        }
    }

    /// Bank-assigned document identifier, if this record carries one
    pub fn document_id(&self) -> Option<DocumentId> {
        self.text(fields::DOCUMENT_ID).map(DocumentId::new)
    }
}

/// Bank-assigned identifier of a title ("nosso número")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Parsed CNAB file: one header group, its detail records and the trailers
///
/// A batch is immutable once built; it is produced either by
/// [`crate::codec::decode`] or by [`crate::codec::BatchBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub(crate) bank_code: String,
    pub(crate) format: CnabFormat,
    pub(crate) file_type: FileType,
    pub(crate) sequence: u64,
    pub(crate) generated_at: NaiveDateTime,
    pub(crate) declared_count: u64,
    pub(crate) declared_total: BigDecimal,
    pub(crate) records: Vec<Record>,
}

impl Batch {
    /// Bank code declared in the file header
    pub fn bank_code(&self) -> &str {
        &self.bank_code
    }

    pub fn format(&self) -> CnabFormat {
        self.format
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// File sequence number (NSA) from the header
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn generated_at(&self) -> NaiveDateTime {
        self.generated_at
    }

    /// Number of detail records the trailer declares
    pub fn declared_count(&self) -> u64 {
        self.declared_count
    }

    /// Total face value the trailer declares
    pub fn declared_total(&self) -> &BigDecimal {
        &self.declared_total
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Detail records together with their index in the batch
    pub fn details(&self) -> impl Iterator<Item = (usize, &Record)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == RecordKind::Detail)
    }

    /// Group detail records into titles
    ///
    /// A title starts at every detail record carrying a document id and
    /// extends over the secondary segments that follow it.
    pub fn titles(&self) -> Vec<TitleRef<'_>> {
        let mut titles: Vec<TitleRef<'_>> = Vec::new();
        for (index, record) in self.details() {
            if record.has_field(fields::DOCUMENT_ID) {
                titles.push(TitleRef {
                    index,
                    primary: record,
                    segments: Vec::new(),
                });
            } else if let Some(current) = titles.last_mut() {
                current.segments.push(record);
            }
        }
        titles
    }

    /// Number of detail records actually present
    pub fn computed_count(&self) -> u64 {
        self.details().count() as u64
    }

    /// Sum of the face values of all detail records
    pub fn computed_total(&self) -> BigDecimal {
        self.details()
            .filter_map(|(_, r)| r.amount(fields::AMOUNT))
            .sum()
    }

    /// Index of the trailer record holding the declared totals
    pub fn totals_record_index(&self) -> Option<usize> {
        self.records
            .iter()
            .rposition(|r| r.kind == RecordKind::Trailer && r.has_field(fields::RECORD_COUNT))
    }
}

/// View over one title inside a batch: primary detail plus its secondary segments
#[derive(Debug, Clone)]
pub struct TitleRef<'a> {
    /// Index of the primary record within the batch
    pub index: usize,
    pub primary: &'a Record,
    pub segments: Vec<&'a Record>,
}

impl<'a> TitleRef<'a> {
    pub fn document_id(&self) -> DocumentId {
        self.primary.document_id().unwrap_or_else(|| DocumentId::new(""))
    }

    /// Look a field up in the primary record first, then in the segments
    pub fn get(&self, name: &str) -> Option<&'a FieldValue> {
        self.primary
            .get(name)
            .or_else(|| self.segments.iter().find_map(|s| s.get(name)))
    }

    pub fn text(&self, name: &str) -> Option<&'a str> {
        match self.get(name) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn amount(&self, name: &str) -> Option<&'a BigDecimal> {
        match self.get(name) {
            Some(FieldValue::Amount(a)) => Some(a),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.get(name) {
            Some(FieldValue::Date(d)) => *d,
            _ => None,
        }
    }
}

/// Payer ("pagador") of a title
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Payer {
    /// 1 = CPF, 2 = CNPJ
    pub document_type: u64,
    pub document: String,
    pub name: String,
    pub address: String,
    pub district: String,
    pub zip: String,
    pub city: String,
    pub state: String,
}

/// Billable document used to compose remittance (or simulated return) batches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub document_id: String,
    /// Company-side document number ("seu número")
    pub your_number: String,
    pub amount: BigDecimal,
    pub due_date: NaiveDate,
    pub issue_date: NaiveDate,
    /// Movement code on remittances, occurrence code on returns
    pub occurrence_code: String,
    pub payer: Option<Payer>,
    pub paid_amount: Option<BigDecimal>,
    pub occurrence_date: Option<NaiveDate>,
    pub credit_date: Option<NaiveDate>,
    pub rejection_reasons: Option<String>,
    /// Any additional layout field, by canonical name
    pub extra: BTreeMap<String, FieldValue>,
}

impl Title {
    /// New title registered with movement code "01" (entrada de título)
    pub fn new(
        document_id: impl Into<String>,
        amount: BigDecimal,
        due_date: NaiveDate,
        issue_date: NaiveDate,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            your_number: String::new(),
            amount,
            due_date,
            issue_date,
            occurrence_code: "01".to_string(),
            payer: None,
            paid_amount: None,
            occurrence_date: None,
            credit_date: None,
            rejection_reasons: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_payer(mut self, payer: Payer) -> Self {
        self.payer = Some(payer);
        self
    }

    pub fn with_occurrence(mut self, code: impl Into<String>, date: Option<NaiveDate>) -> Self {
        self.occurrence_code = code.into();
        self.occurrence_date = date;
        self
    }

    /// Mark as a settlement return with the amount actually paid
    pub fn settled(mut self, code: impl Into<String>, paid: BigDecimal, on: NaiveDate) -> Self {
        self.occurrence_code = code.into();
        self.paid_amount = Some(paid);
        self.occurrence_date = Some(on);
        self.credit_date = Some(on);
        self
    }

    /// Mark as a rejection return with the bank's motive codes
    pub fn rejected(mut self, code: impl Into<String>, reasons: impl Into<String>) -> Self {
        self.occurrence_code = code.into();
        self.rejection_reasons = Some(reasons.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    /// Values keyed by canonical field name; layouts pick what they carry
    pub fn field_values(&self) -> Vec<(String, FieldValue)> {
        let mut values = vec![
            (fields::DOCUMENT_ID.to_string(), FieldValue::Text(self.document_id.clone())),
            (fields::YOUR_NUMBER.to_string(), FieldValue::Text(self.your_number.clone())),
            (fields::AMOUNT.to_string(), FieldValue::Amount(self.amount.clone())),
            (fields::DUE_DATE.to_string(), FieldValue::Date(Some(self.due_date))),
            (fields::ISSUE_DATE.to_string(), FieldValue::Date(Some(self.issue_date))),
            (
                fields::OCCURRENCE_CODE.to_string(),
                FieldValue::Text(self.occurrence_code.clone()),
            ),
            (
                fields::OCCURRENCE_DATE.to_string(),
                FieldValue::Date(self.occurrence_date),
            ),
            (fields::CREDIT_DATE.to_string(), FieldValue::Date(self.credit_date)),
        ];

        if let Some(paid) = &self.paid_amount {
            values.push((fields::PAID_AMOUNT.to_string(), FieldValue::Amount(paid.clone())));
        }
        if let Some(reasons) = &self.rejection_reasons {
            values.push((
                fields::REJECTION_REASONS.to_string(),
                FieldValue::Text(reasons.clone()),
            ));
        }
        if let Some(payer) = &self.payer {
            values.extend([
                (
                    fields::PAYER_DOCUMENT_TYPE.to_string(),
                    FieldValue::Number(payer.document_type),
                ),
                (fields::PAYER_DOCUMENT.to_string(), FieldValue::Text(payer.document.clone())),
                (fields::PAYER_NAME.to_string(), FieldValue::Text(payer.name.clone())),
                (fields::PAYER_ADDRESS.to_string(), FieldValue::Text(payer.address.clone())),
                (fields::PAYER_DISTRICT.to_string(), FieldValue::Text(payer.district.clone())),
                (fields::PAYER_ZIP.to_string(), FieldValue::Text(payer.zip.clone())),
                (fields::PAYER_CITY.to_string(), FieldValue::Text(payer.city.clone())),
                (fields::PAYER_STATE.to_string(), FieldValue::Text(payer.state.clone())),
            ]);
        }
        values.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        values
    }
}

/// Settlement outcome of a title after reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementStatus {
    /// No return has settled or rejected the title yet
    Pending,
    Settled,
    Rejected(String),
    /// Settled for less than the face value
    PartiallySettled,
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementStatus::Pending => write!(f, "pending"),
            SettlementStatus::Settled => write!(f, "settled"),
            SettlementStatus::Rejected(reason) => write!(f, "rejected: {}", reason),
            SettlementStatus::PartiallySettled => write!(f, "partially settled"),
        }
    }
}

/// Lifecycle of a stored file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchStatus {
    /// Decoded and validated without issues
    Validated,
    /// Decoded, but validation reported issues
    Invalid,
    /// Remittance matched against a return, or return processed
    Reconciled,
}

/// A processed file as kept by [`crate::traits::BatchStorage`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBatch {
    /// `REM-<uuid>` for remittances, `RET-<uuid>` for returns
    pub id: String,
    pub file_name: String,
    pub status: BatchStatus,
    pub batch: Batch,
    pub report: ValidationReport,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl StoredBatch {
    pub fn new(file_name: String, batch: Batch, report: ValidationReport) -> Self {
        let prefix = match batch.file_type() {
            FileType::Remittance => "REM",
            FileType::Return => "RET",
        };
        let status = if report.is_valid() {
            BatchStatus::Validated
        } else {
            BatchStatus::Invalid
        };
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: format!("{}-{}", prefix, uuid::Uuid::new_v4().simple()),
            file_name,
            status,
            batch,
            report,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Errors that can occur anywhere in the CNAB pipeline
#[derive(Debug, thiserror::Error)]
pub enum CnabError {
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("Reconciliation error: {0}")]
    Reconciliation(#[from] ReconciliationError),
    #[error("Unsupported bank: {0}")]
    UnsupportedBank(String),
    #[error("Bank disabled in configuration: {0}")]
    BankDisabled(String),
    #[error("Invalid file: {0}")]
    InvalidFile(String),
    #[error("Processing timed out after {0} ms")]
    Timeout(u64),
    #[error("Worker failed: {0}")]
    Worker(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Batch not found: {0}")]
    NotFound(String),
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

/// Result type for pipeline operations
pub type CnabResult<T> = Result<T, CnabError>;
