//! Fluent construction of well-formed batches

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;

use super::{assemble, EncodeError, EncodeResult};
use crate::layout::{fields, FileLayout, RecordLayout};
use crate::settings::BankAccountConfig;
use crate::types::{Batch, FieldValue, Record, RecordKind, Title};

/// Builder for creating batches from titles
///
/// Sequence numbers, line numbers and trailer totals are computed from the
/// titles; `declared_count` and `declared_total` override the trailer so
/// inconsistent files can be produced on purpose.
#[derive(Debug)]
pub struct BatchBuilder<'a> {
    layout: &'a FileLayout,
    sequence: u64,
    generated_at: NaiveDateTime,
    common: Vec<(String, FieldValue)>,
    titles: Vec<Title>,
    declared_count: Option<u64>,
    declared_total: Option<BigDecimal>,
}

impl<'a> BatchBuilder<'a> {
    pub fn new(layout: &'a FileLayout, sequence: u64, generated_at: NaiveDateTime) -> Self {
        Self {
            layout,
            sequence,
            generated_at,
            common: Vec::new(),
            titles: Vec::new(),
            declared_count: None,
            declared_total: None,
        }
    }

    /// Fill company and account fields from a configured bank account
    pub fn account(self, account: &BankAccountConfig) -> Self {
        self.common_field(fields::AGENCY, FieldValue::from(account.agency.as_str()))
            .common_field(fields::AGENCY_DIGIT, FieldValue::from(account.agency_digit.as_str()))
            .common_field(fields::ACCOUNT, FieldValue::from(account.account.as_str()))
            .common_field(fields::ACCOUNT_DIGIT, FieldValue::from(account.account_digit.as_str()))
            .common_field(fields::AGREEMENT, FieldValue::from(account.agreement.as_str()))
            .common_field(fields::COMPANY_NAME, FieldValue::from(account.company_name.as_str()))
            .common_field(
                fields::COMPANY_DOCUMENT,
                FieldValue::from(account.company_document.as_str()),
            )
            .common_field(fields::COMPANY_DOCUMENT_TYPE, FieldValue::Number(2))
    }

    /// Set a field on every record whose layout defines it
    pub fn common_field(mut self, name: &str, value: FieldValue) -> Self {
        self.common.push((name.to_string(), value));
        self
    }

    pub fn title(mut self, title: Title) -> Self {
        self.titles.push(title);
        self
    }

    pub fn titles(mut self, titles: impl IntoIterator<Item = Title>) -> Self {
        self.titles.extend(titles);
        self
    }

    /// Override the detail count written to the trailer
    pub fn declared_count(mut self, count: u64) -> Self {
        self.declared_count = Some(count);
        self
    }

    /// Override the total amount written to the trailer
    pub fn declared_total(mut self, total: BigDecimal) -> Self {
        self.declared_total = Some(total);
        self
    }

    pub fn build(self) -> EncodeResult<Batch> {
        let layout = self.layout;
        let mut records = Vec::new();

        for name in &layout.header_order {
            records.push(self.blank(name)?);
        }

        let mut detail_index = 0u64;
        for title in &self.titles {
            let values = title.field_values();
            for name in &layout.detail_order {
                let record_layout = self.record_layout(name)?;
                let mut record = self.blank(name)?;
                for (field, value) in &values {
                    record_layout.assign(&mut record, field, value)?;
                }
                record_layout.assign(
                    &mut record,
                    fields::SEQUENCE,
                    &FieldValue::Number(layout.sequence_start + detail_index),
                )?;
                detail_index += 1;
                records.push(record);
            }
        }

        for name in &layout.trailer_order {
            records.push(self.blank(name)?);
        }

        let total_records = records.len() as u64;
        let computed_total: BigDecimal = self.titles.iter().map(|t| t.amount.clone()).sum();
        let record_count = self.declared_count.unwrap_or(detail_index) + layout.count_offset;
        let total_amount = self.declared_total.clone().unwrap_or(computed_total);
        let totals = [
            (fields::RECORD_COUNT, FieldValue::Number(record_count)),
            (fields::TITLE_COUNT, FieldValue::Number(self.titles.len() as u64)),
            (fields::TOTAL_AMOUNT, FieldValue::Amount(total_amount)),
            (fields::FILE_RECORD_COUNT, FieldValue::Number(total_records)),
            (fields::BATCH_COUNT, FieldValue::Number(1)),
        ];

        for (index, record) in records.iter_mut().enumerate() {
            let record_layout = self.record_layout(record.layout())?;
            record_layout.assign(
                record,
                fields::LINE_NUMBER,
                &FieldValue::Number(index as u64 + 1),
            )?;
            if record.kind() == RecordKind::Trailer {
                for (field, value) in &totals {
                    record_layout.assign(record, field, value)?;
                }
            }
        }

        assemble(layout, records).map_err(|e| EncodeError::InvalidValue {
            field: "batch".to_string(),
            reason: e.to_string(),
        })
    }

    fn record_layout(&self, name: &str) -> EncodeResult<&'a RecordLayout> {
        self.layout
            .record(name)
            .ok_or_else(|| EncodeError::UnknownLayout(name.to_string()))
    }

    /// Record with header-level and common fields filled in
    fn blank(&self, name: &str) -> EncodeResult<Record> {
        let layout = self.layout;
        let record_layout = self.record_layout(name)?;
        let mut record = record_layout.blank_record()?;

        let header_values = [
            (fields::BANK_CODE, FieldValue::from(layout.bank_code.as_str())),
            (fields::BANK_NAME, FieldValue::from(layout.bank_name.as_str())),
            (fields::FILE_SEQUENCE, FieldValue::Number(self.sequence)),
            (fields::REMITTANCE_NUMBER, FieldValue::Number(self.sequence)),
            (fields::BATCH_NUMBER, FieldValue::Number(1)),
            (fields::GENERATED_ON, FieldValue::Date(Some(self.generated_at.date()))),
            (fields::GENERATED_AT_TIME, FieldValue::Time(Some(self.generated_at.time()))),
        ];
        for (field, value) in &header_values {
            record_layout.assign(&mut record, field, value)?;
        }
        for (field, value) in &self.common {
            record_layout.assign(&mut record, field, value)?;
        }
        Ok(record)
    }
}
