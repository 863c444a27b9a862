//! Record layouts and their sequential builder

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::field::{DateFormat, FieldKind, FieldSpec};
use super::fields;
use super::{LayoutError, LayoutResult};
use crate::codec::{latin1_to_string, DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::types::{Field, FieldValue, Record, RecordKind};

/// Column layout of one record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLayout {
    pub name: String,
    pub kind: RecordKind,
    /// Content of the record type column(s)
    pub type_code: String,
    /// Segment code for CNAB 240 detail records
    pub segment: Option<String>,
    pub fields: Vec<FieldSpec>,
}

impl RecordLayout {
    /// Start a layout; fields are appended left to right
    pub fn builder(
        name: impl Into<String>,
        kind: RecordKind,
        type_code: impl Into<String>,
    ) -> RecordLayoutBuilder {
        RecordLayoutBuilder {
            layout: RecordLayout {
                name: name.into(),
                kind,
                type_code: type_code.into(),
                segment: None,
                fields: Vec::new(),
            },
            next_column: 1,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Total number of columns covered
    pub fn width(&self) -> usize {
        self.fields.iter().map(|f| f.width).sum()
    }

    /// Detail record that opens a title (carries the document id)
    pub fn is_primary(&self) -> bool {
        self.kind == RecordKind::Detail && self.has_field(fields::DOCUMENT_ID)
    }

    /// Record with every stored field at its default value
    pub fn blank_record(&self) -> EncodeResult<Record> {
        let mut record = Record::new(self.kind, self.name.clone());
        for spec in self.fields.iter().filter(|f| f.is_stored()) {
            let raw = spec.format(&spec.default_value())?;
            let value = reparse(spec, &raw)?;
            record.insert(&spec.name, Field { raw, value });
        }
        Ok(record)
    }

    /// Set a field if this layout defines it; returns whether it was set
    ///
    /// The stored value is re-read from the formatted columns, so a record
    /// always holds exactly what decoding its line would produce.
    pub fn assign(&self, record: &mut Record, name: &str, value: &FieldValue) -> EncodeResult<bool> {
        let Some(spec) = self.field(name).filter(|f| f.is_stored()) else {
            return Ok(false);
        };
        let raw = spec.format(value)?;
        let value = reparse(spec, &raw)?;
        record.insert(&spec.name, Field { raw, value });
        Ok(true)
    }

    /// Decode one line (already stripped of its line ending)
    pub fn decode_line(&self, line: &[u8], line_no: usize) -> DecodeResult<Record> {
        let mut record = Record::new(self.kind, self.name.clone());
        for spec in &self.fields {
            let raw = latin1_to_string(spec.slice(line));
            match &spec.kind {
                FieldKind::Filler => {}
                FieldKind::Literal(expected) => {
                    if raw != *expected {
                        return Err(DecodeError::MalformedRecord {
                            line: line_no,
                            reason: format!(
                                "columns {}-{} should read '{}', found '{}'",
                                spec.start,
                                spec.end(),
                                expected,
                                raw
                            ),
                        });
                    }
                }
                _ => {
                    let value = spec.parse(&raw).map_err(|reason| DecodeError::MalformedRecord {
                        line: line_no,
                        reason: format!(
                            "field '{}' (columns {}-{}): {}",
                            spec.name,
                            spec.start,
                            spec.end(),
                            reason
                        ),
                    })?;
                    record.insert(&spec.name, Field { raw, value });
                }
            }
        }
        Ok(record)
    }

    /// Render a record into one line of Latin-1 bytes, without line ending
    pub fn encode_record(&self, record: &Record) -> EncodeResult<Vec<u8>> {
        let mut line = Vec::with_capacity(self.width());
        for spec in &self.fields {
            let text = if spec.is_stored() {
                match record.raw(&spec.name) {
                    Some(raw) => raw.to_string(),
                    None => spec.format(&spec.default_value())?,
                }
            } else {
                spec.fixed_text()
            };
            if text.chars().count() != spec.width {
                return Err(EncodeError::InvalidValue {
                    field: spec.name.clone(),
                    reason: format!("content '{}' does not fill {} columns", text, spec.width),
                });
            }
            for c in text.chars() {
                let byte = u8::try_from(c as u32).map_err(|_| EncodeError::InvalidValue {
                    field: spec.name.clone(),
                    reason: format!("character {:?} is not representable", c),
                })?;
                line.push(byte);
            }
        }
        Ok(line)
    }
}

fn reparse(spec: &FieldSpec, raw: &str) -> EncodeResult<FieldValue> {
    spec.parse(raw).map_err(|reason| EncodeError::InvalidValue {
        field: spec.name.clone(),
        reason,
    })
}

/// Appends fields left to right, tracking the next free column
#[derive(Debug)]
pub struct RecordLayoutBuilder {
    layout: RecordLayout,
    next_column: usize,
}

impl RecordLayoutBuilder {
    fn push(mut self, name: impl Into<String>, width: usize, kind: FieldKind) -> Self {
        self.layout.fields.push(FieldSpec {
            name: name.into(),
            start: self.next_column,
            width,
            kind,
        });
        self.next_column += width;
        self
    }

    pub fn numeric(self, name: &str, width: usize) -> Self {
        self.push(name, width, FieldKind::Numeric)
    }

    pub fn digits(self, name: &str, width: usize) -> Self {
        self.push(name, width, FieldKind::Digits)
    }

    pub fn alpha(self, name: &str, width: usize) -> Self {
        self.push(name, width, FieldKind::Alpha)
    }

    /// Amount with two implied decimal places
    pub fn amount(self, name: &str, width: usize) -> Self {
        self.push(name, width, FieldKind::Amount { decimals: 2 })
    }

    pub fn date8(self, name: &str) -> Self {
        self.push(name, 8, FieldKind::Date(DateFormat::Ddmmyyyy))
    }

    pub fn date6(self, name: &str) -> Self {
        self.push(name, 6, FieldKind::Date(DateFormat::Ddmmyy))
    }

    pub fn time(self, name: &str) -> Self {
        self.push(name, 6, FieldKind::Time)
    }

    /// Fixed text, blank-padded to `width`
    pub fn literal(self, text: &str, width: usize) -> Self {
        let name = format!("literal_{}", self.next_column);
        let padded = format!("{:<width$}", text, width = width);
        self.push(name, width, FieldKind::Literal(padded))
    }

    /// Single-column segment code of a CNAB 240 detail record
    pub fn segment(mut self, code: &str) -> Self {
        self.layout.segment = Some(code.to_string());
        self.literal(code, code.len())
    }

    pub fn filler(self, width: usize) -> Self {
        let name = format!("filler_{}", self.next_column);
        self.push(name, width, FieldKind::Filler)
    }

    /// Finish the layout, checking it covers exactly `width` columns
    pub fn build(self, width: usize) -> LayoutResult<RecordLayout> {
        let layout = self.layout;
        let found = self.next_column - 1;
        if found != width {
            return Err(LayoutError::WidthMismatch {
                record: layout.name,
                expected: width,
                found,
            });
        }

        let mut seen = HashSet::new();
        for spec in &layout.fields {
            if spec.width == 0 {
                return Err(LayoutError::Invalid(format!(
                    "field '{}' of '{}' has no columns",
                    spec.name, layout.name
                )));
            }
            if let FieldKind::Amount { decimals } = spec.kind {
                if decimals as usize >= spec.width {
                    return Err(LayoutError::Invalid(format!(
                        "amount '{}' of '{}' is narrower than its decimals",
                        spec.name, layout.name
                    )));
                }
            }
            if let FieldKind::Literal(text) = &spec.kind {
                if text.chars().count() != spec.width {
                    return Err(LayoutError::Invalid(format!(
                        "literal '{}' of '{}' does not fit {} columns",
                        text, layout.name, spec.width
                    )));
                }
            }
            if !seen.insert(spec.name.clone()) {
                return Err(LayoutError::DuplicateField {
                    record: layout.name.clone(),
                    field: spec.name.clone(),
                });
            }
        }

        Ok(layout)
    }
}
