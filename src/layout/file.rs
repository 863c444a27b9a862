//! Whole-file layouts: record ordering and record type identification

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::fields;
use super::record::RecordLayout;
use super::{LayoutError, LayoutResult};
use crate::codec::latin1_to_string;
use crate::types::{CnabFormat, FileType, RecordKind};

/// Line terminator written by the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::CrLf => b"\r\n",
        }
    }
}

/// Complete description of one bank's file for a format and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLayout {
    pub bank_code: String,
    pub bank_name: String,
    pub format: CnabFormat,
    pub file_type: FileType,
    /// (start, width) of the record type code
    pub type_code_at: (usize, usize),
    /// (start, width) of the segment code, CNAB 240 only
    pub segment_at: Option<(usize, usize)>,
    pub records: Vec<RecordLayout>,
    /// Header records, in file order
    pub header_order: Vec<String>,
    /// Detail records making up one title, primary first
    pub detail_order: Vec<String>,
    /// Trailer records, in file order
    pub trailer_order: Vec<String>,
    /// Sequence number of the first detail record
    pub sequence_start: u64,
    /// Records counted by the trailer besides the details
    pub count_offset: u64,
    pub line_ending: LineEnding,
}

impl FileLayout {
    pub fn builder(
        bank_code: impl Into<String>,
        bank_name: impl Into<String>,
        format: CnabFormat,
        file_type: FileType,
    ) -> FileLayoutBuilder {
        FileLayoutBuilder {
            layout: FileLayout {
                bank_code: bank_code.into(),
                bank_name: bank_name.into(),
                format,
                file_type,
                type_code_at: (1, 1),
                segment_at: None,
                records: Vec::new(),
                header_order: Vec::new(),
                detail_order: Vec::new(),
                trailer_order: Vec::new(),
                sequence_start: 1,
                count_offset: 0,
                line_ending: LineEnding::CrLf,
            },
        }
    }

    pub fn record(&self, name: &str) -> Option<&RecordLayout> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn line_width(&self) -> usize {
        self.format.line_width()
    }

    /// First header record layout (carries bank code, sequence and date)
    pub fn file_header(&self) -> Option<&RecordLayout> {
        self.header_order.first().and_then(|name| self.record(name))
    }

    /// Detail layout opening a title
    pub fn primary_detail(&self) -> Option<&RecordLayout> {
        self.detail_order.first().and_then(|name| self.record(name))
    }

    /// Find the record layout a line belongs to
    ///
    /// Returns the unmatched type code (plus segment) on failure.
    pub fn identify(&self, line: &[u8]) -> Result<&RecordLayout, String> {
        let type_code = column_text(line, self.type_code_at);
        let segment = self.segment_at.map(|at| column_text(line, at));

        self.records
            .iter()
            .find(|r| {
                r.type_code == type_code
                    && match (&r.segment, &segment) {
                        (Some(expected), Some(found)) => expected == found,
                        (None, _) => true,
                        (Some(_), None) => false,
                    }
            })
            .ok_or_else(|| match segment {
                Some(seg) if type_code == "3" => format!("{}{}", type_code, seg),
                _ => type_code,
            })
    }
}

fn column_text(line: &[u8], (start, width): (usize, usize)) -> String {
    let end = (start - 1 + width).min(line.len());
    let begin = (start - 1).min(end);
    latin1_to_string(&line[begin..end])
}

/// Assembles a [`FileLayout`] and checks its consistency
#[derive(Debug)]
pub struct FileLayoutBuilder {
    layout: FileLayout,
}

impl FileLayoutBuilder {
    pub fn type_code_at(mut self, start: usize, width: usize) -> Self {
        self.layout.type_code_at = (start, width);
        self
    }

    pub fn segment_at(mut self, start: usize, width: usize) -> Self {
        self.layout.segment_at = Some((start, width));
        self
    }

    pub fn sequence_start(mut self, start: u64) -> Self {
        self.layout.sequence_start = start;
        self
    }

    pub fn count_offset(mut self, offset: u64) -> Self {
        self.layout.count_offset = offset;
        self
    }

    pub fn line_ending(mut self, ending: LineEnding) -> Self {
        self.layout.line_ending = ending;
        self
    }

    /// Add a record layout; its position in the file follows its kind
    pub fn record(mut self, record: RecordLayout) -> Self {
        let order = match record.kind {
            RecordKind::Header => &mut self.layout.header_order,
            RecordKind::Detail => &mut self.layout.detail_order,
            RecordKind::Trailer => &mut self.layout.trailer_order,
        };
        order.push(record.name.clone());
        self.layout.records.push(record);
        self
    }

    pub fn build(self) -> LayoutResult<FileLayout> {
        let layout = self.layout;
        let width = layout.line_width();

        for record in &layout.records {
            if record.width() != width {
                return Err(LayoutError::WidthMismatch {
                    record: record.name.clone(),
                    expected: width,
                    found: record.width(),
                });
            }
        }

        let mut codes = HashSet::new();
        for record in &layout.records {
            if !codes.insert((record.type_code.clone(), record.segment.clone())) {
                return Err(LayoutError::DuplicateRecordType(format!(
                    "{}{}",
                    record.type_code,
                    record.segment.as_deref().unwrap_or("")
                )));
            }
            if record.kind == RecordKind::Detail && !record.has_field(fields::SEQUENCE) {
                return Err(LayoutError::MissingField {
                    record: record.name.clone(),
                    field: fields::SEQUENCE.to_string(),
                });
            }
        }

        let header = layout
            .file_header()
            .ok_or_else(|| LayoutError::Invalid("layout has no header record".to_string()))?;
        for field in [fields::BANK_CODE, fields::FILE_SEQUENCE, fields::GENERATED_ON] {
            if !header.has_field(field) {
                return Err(LayoutError::MissingField {
                    record: header.name.clone(),
                    field: field.to_string(),
                });
            }
        }

        let primary = layout
            .primary_detail()
            .ok_or_else(|| LayoutError::Invalid("layout has no detail record".to_string()))?;
        if !primary.is_primary() {
            return Err(LayoutError::MissingField {
                record: primary.name.clone(),
                field: fields::DOCUMENT_ID.to_string(),
            });
        }
        if !primary.has_field(fields::AMOUNT) {
            return Err(LayoutError::MissingField {
                record: primary.name.clone(),
                field: fields::AMOUNT.to_string(),
            });
        }

        let totals = layout
            .trailer_order
            .iter()
            .filter_map(|name| layout.record(name))
            .find(|r| r.has_field(fields::RECORD_COUNT))
            .ok_or_else(|| LayoutError::MissingField {
                record: "trailer".to_string(),
                field: fields::RECORD_COUNT.to_string(),
            })?;
        if !totals.has_field(fields::TOTAL_AMOUNT) {
            return Err(LayoutError::MissingField {
                record: totals.name.clone(),
                field: fields::TOTAL_AMOUNT.to_string(),
            });
        }

        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> RecordLayout {
        RecordLayout::builder("header", RecordKind::Header, "0")
            .literal("0", 1)
            .digits(fields::BANK_CODE, 3)
            .numeric(fields::FILE_SEQUENCE, 4)
            .date8(fields::GENERATED_ON)
            .filler(224)
            .build(240)
            .unwrap()
    }

    fn detail() -> RecordLayout {
        RecordLayout::builder("detail", RecordKind::Detail, "1")
            .literal("1", 1)
            .alpha(fields::DOCUMENT_ID, 6)
            .amount(fields::AMOUNT, 8)
            .filler(222)
            .numeric(fields::SEQUENCE, 3)
            .build(240)
            .unwrap()
    }

    fn trailer() -> RecordLayout {
        RecordLayout::builder("trailer", RecordKind::Trailer, "9")
            .literal("9", 1)
            .numeric(fields::RECORD_COUNT, 5)
            .amount(fields::TOTAL_AMOUNT, 10)
            .filler(224)
            .build(240)
            .unwrap()
    }

    fn builder() -> FileLayoutBuilder {
        FileLayout::builder("999", "TEST BANK", CnabFormat::Cnab240, FileType::Remittance)
    }

    #[test]
    fn test_build_orders_records_by_kind() {
        let layout = builder()
            .record(trailer())
            .record(detail())
            .record(header())
            .build()
            .unwrap();
        assert_eq!(layout.header_order, vec!["header"]);
        assert_eq!(layout.detail_order, vec!["detail"]);
        assert_eq!(layout.trailer_order, vec!["trailer"]);
        assert_eq!(layout.primary_detail().unwrap().name, "detail");
    }

    #[test]
    fn test_build_checks_line_width() {
        let narrow = RecordLayout::builder("narrow", RecordKind::Header, "0")
            .literal("0", 1)
            .filler(19)
            .build(20)
            .unwrap();
        let result = FileLayout::builder("999", "TEST", CnabFormat::Cnab400, FileType::Return)
            .record(narrow)
            .build();
        assert!(matches!(
            result,
            Err(LayoutError::WidthMismatch { expected: 400, found: 20, .. })
        ));
    }

    #[test]
    fn test_build_requires_totals_trailer() {
        let result = builder().record(header()).record(detail()).build();
        assert!(matches!(result, Err(LayoutError::MissingField { .. })));

        assert_eq!(
            builder().build(),
            Err(LayoutError::Invalid("layout has no header record".to_string()))
        );
    }

    #[test]
    fn test_build_rejects_duplicate_type_codes() {
        let result = builder()
            .record(header())
            .record(detail())
            .record(detail())
            .record(trailer())
            .build();
        assert_eq!(result, Err(LayoutError::DuplicateRecordType("1".to_string())));
    }

    #[test]
    fn test_identify_uses_type_code() {
        let layout = builder()
            .record(header())
            .record(detail())
            .record(trailer())
            .build()
            .unwrap();

        assert_eq!(layout.identify(b"1ABC").unwrap().name, "detail");
        assert_eq!(layout.identify(b"9").unwrap().name, "trailer");
        assert_eq!(layout.identify(b"7xyz").unwrap_err(), "7");
    }
}
