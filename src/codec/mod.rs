//! Record codec: fixed-width CNAB lines to typed batches and back
//!
//! Decoding walks the file line by line, identifies each record through the
//! [`FileLayout`], checks the file structure (headers, details, trailers) and
//! finally compares the trailer-declared totals with the computed ones.
//! Encoding writes each record back column by column, so that
//! `decode(encode(b)) == b` holds for every batch built by [`BatchBuilder`]
//! or returned by [`decode`].

pub mod builder;
pub mod totals;

pub use builder::BatchBuilder;

use bigdecimal::BigDecimal;
use chrono::{NaiveDateTime, NaiveTime};
use tracing::{debug, info};

use crate::layout::{fields, FileLayout};
use crate::types::{Batch, Record, RecordKind};

/// Errors raised while decoding a file
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
    #[error("Unknown record type '{code}' at line {line}")]
    UnknownRecordType { line: usize, code: String },
    #[error("Checksum mismatch on {field}: declared {declared}, computed {computed}")]
    ChecksumMismatch {
        field: String,
        declared: String,
        computed: String,
    },
    #[error("Unexpected record at line {line}: {reason}")]
    UnexpectedRecord { line: usize, reason: String },
    #[error("File belongs to bank {found}, layout expects {expected}")]
    WrongBank { expected: String, found: String },
    #[error("File contains no records")]
    Empty,
}

/// Errors raised while encoding a batch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("Value '{value}' does not fit field {field} ({width} columns)")]
    FieldOverflow {
        field: String,
        width: usize,
        value: String,
    },
    #[error("Invalid value for field {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("Negative amount in field {field}")]
    NegativeAmount { field: String },
    #[error("Amount {value} in field {field} has more decimals than the layout allows")]
    PrecisionLoss { field: String, value: String },
    #[error("No record layout named {0}")]
    UnknownLayout(String),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
pub type EncodeResult<T> = Result<T, EncodeError>;

const EOF_MARKER: u8 = 0x1A;

/// Interpret bytes as Latin-1 text, one char per byte
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Decode a complete CNAB file
pub fn decode(raw: &[u8], layout: &FileLayout) -> DecodeResult<Batch> {
    debug!(
        bank = %layout.bank_code,
        format = %layout.format,
        file_type = %layout.file_type,
        bytes = raw.len(),
        "Decoding CNAB file"
    );

    let width = layout.line_width();
    let mut records = Vec::new();
    let mut line_numbers = Vec::new();

    for (index, line) in raw.split(|&b| b == b'\n').enumerate() {
        let line_no = index + 1;
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() || line == [EOF_MARKER] {
            continue;
        }
        if line.len() != width {
            return Err(DecodeError::MalformedRecord {
                line: line_no,
                reason: format!("expected {} columns, found {}", width, line.len()),
            });
        }
        let record_layout = layout
            .identify(line)
            .map_err(|code| DecodeError::UnknownRecordType { line: line_no, code })?;
        records.push(record_layout.decode_line(line, line_no)?);
        line_numbers.push(line_no);
    }

    if records.is_empty() {
        return Err(DecodeError::Empty);
    }

    check_structure(layout, &records, &line_numbers)?;
    let batch = assemble(layout, records)?;

    if let Some(mismatch) = totals::check(&batch).into_iter().next() {
        return Err(DecodeError::ChecksumMismatch {
            field: mismatch.field.to_string(),
            declared: mismatch.declared,
            computed: mismatch.computed,
        });
    }

    info!(
        bank = %batch.bank_code,
        sequence = batch.sequence,
        records = batch.records.len(),
        titles = batch.declared_count,
        "Decoded CNAB file"
    );
    Ok(batch)
}

/// Encode a batch with the given layout
pub fn encode(batch: &Batch, layout: &FileLayout) -> EncodeResult<Vec<u8>> {
    debug!(
        bank = %batch.bank_code,
        records = batch.records.len(),
        "Encoding CNAB file"
    );

    let ending = layout.line_ending.as_bytes();
    let mut out = Vec::with_capacity(batch.records.len() * (layout.line_width() + ending.len()));
    for record in &batch.records {
        let record_layout = layout
            .record(record.layout())
            .ok_or_else(|| EncodeError::UnknownLayout(record.layout().to_string()))?;
        out.extend(record_layout.encode_record(record)?);
        out.extend_from_slice(ending);
    }

    info!(bank = %batch.bank_code, bytes = out.len(), "Encoded CNAB file");
    Ok(out)
}

/// Headers first, then titles, then trailers, each in layout order
fn check_structure(
    layout: &FileLayout,
    records: &[Record],
    line_numbers: &[usize],
) -> DecodeResult<()> {
    let unexpected = |index: usize, reason: String| DecodeError::UnexpectedRecord {
        line: line_numbers[index],
        reason,
    };

    let headers = layout.header_order.len();
    let trailers = layout.trailer_order.len();
    if records.len() < headers + trailers {
        let index = records.len() - 1;
        return Err(unexpected(
            index,
            format!(
                "file ends after {} records, layout needs at least {}",
                records.len(),
                headers + trailers
            ),
        ));
    }

    for (offset, expected) in layout.header_order.iter().enumerate() {
        let record = &records[offset];
        if record.layout() != expected {
            return Err(unexpected(
                offset,
                format!("expected {}, found {}", expected, record.layout()),
            ));
        }
    }

    let trailer_start = records.len() - trailers;
    for (offset, expected) in layout.trailer_order.iter().enumerate() {
        let index = trailer_start + offset;
        if records[index].layout() != expected {
            return Err(unexpected(
                index,
                format!("expected {}, found {}", expected, records[index].layout()),
            ));
        }
    }

    // Every title repeats the layout's detail segments in order
    let segments = &layout.detail_order;
    let incomplete = |index: usize, missing: &str, found: &str| DecodeError::MalformedRecord {
        line: line_numbers[index],
        reason: format!("title is missing {}, found {}", missing, found),
    };
    let mut position = 0;
    for (index, record) in records.iter().enumerate().take(trailer_start).skip(headers) {
        match record.kind() {
            RecordKind::Detail => {
                let Some(expected) = segments.get(position) else {
                    return Err(unexpected(index, "layout has no detail records".to_string()));
                };
                if record.layout() != expected {
                    if position == 0 {
                        return Err(unexpected(
                            index,
                            format!("{} appears before any title", record.layout()),
                        ));
                    }
                    return Err(incomplete(index, expected, record.layout()));
                }
                position = (position + 1) % segments.len();
            }
            RecordKind::Header => {
                return Err(unexpected(
                    index,
                    "multiple batches in one file are not supported".to_string(),
                ));
            }
            RecordKind::Trailer => {
                return Err(unexpected(
                    index,
                    format!("{} before the end of the file", record.layout()),
                ));
            }
        }
    }

    if let Some(missing) = segments.get(position).filter(|_| position != 0) {
        return Err(incomplete(trailer_start, missing, records[trailer_start].layout()));
    }

    Ok(())
}

/// Build the batch attributes from the header and trailer records
pub(crate) fn assemble(layout: &FileLayout, records: Vec<Record>) -> DecodeResult<Batch> {
    let header = records.first().ok_or(DecodeError::Empty)?;

    let bank_code = header.text(fields::BANK_CODE).unwrap_or_default().to_string();
    if bank_code != layout.bank_code {
        return Err(DecodeError::WrongBank {
            expected: layout.bank_code.clone(),
            found: bank_code,
        });
    }

    let generated_on = header
        .date(fields::GENERATED_ON)
        .ok_or_else(|| DecodeError::MalformedRecord {
            line: 1,
            reason: "header has no generation date".to_string(),
        })?;
    let generated_at = NaiveDateTime::new(
        generated_on,
        header.time(fields::GENERATED_AT_TIME).unwrap_or(NaiveTime::MIN),
    );
    let sequence = header.number(fields::FILE_SEQUENCE).unwrap_or(0);

    let (totals_index, totals) = records
        .iter()
        .enumerate()
        .rev()
        .find(|(_, r)| r.kind() == RecordKind::Trailer && r.has_field(fields::RECORD_COUNT))
        .ok_or_else(|| DecodeError::MalformedRecord {
            line: records.len(),
            reason: "no trailer declares a record count".to_string(),
        })?;
    let declared_records = totals
        .number(fields::RECORD_COUNT)
        .ok_or_else(|| DecodeError::MalformedRecord {
            line: totals_index + 1,
            reason: format!("{} has no record count", totals.layout()),
        })?;
    // The declared count includes the records around the details
    let declared_count = declared_records
        .checked_sub(layout.count_offset)
        .ok_or_else(|| {
            let details = records.iter().filter(|r| r.kind() == RecordKind::Detail).count();
            DecodeError::ChecksumMismatch {
                field: fields::RECORD_COUNT.to_string(),
                declared: declared_records.to_string(),
                computed: (details as u64 + layout.count_offset).to_string(),
            }
        })?;
    let declared_total = totals
        .amount(fields::TOTAL_AMOUNT)
        .cloned()
        .unwrap_or_else(|| BigDecimal::from(0));

    Ok(Batch {
        bank_code,
        format: layout.format,
        file_type: layout.file_type,
        sequence,
        generated_at,
        declared_count,
        declared_total,
        records,
    })
}
