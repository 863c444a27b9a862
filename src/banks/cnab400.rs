//! Pieces shared by the bank-specific CNAB 400 layouts
//!
//! Every CNAB 400 record starts with its type code in column 1 and ends with
//! its line number in columns 395-400. Headers are line 1, so the first
//! detail record is numbered 2 and trailer counts include header and trailer.

use crate::layout::{fields as f, FileLayout, FileLayoutBuilder, LayoutResult, RecordLayout};
use crate::types::{CnabFormat, FileType, RecordKind};

pub(crate) const WIDTH: usize = 400;

/// File layout skeleton with the CNAB 400 conventions applied
pub(crate) fn file_layout(bank_code: &str, bank_name: &str, file_type: FileType) -> FileLayoutBuilder {
    FileLayout::builder(bank_code, bank_name, CnabFormat::Cnab400, file_type)
        .type_code_at(1, 1)
        .sequence_start(2)
        .count_offset(2)
}

/// Literal prefix of a header: record type, direction code and service
pub(crate) fn header_start(file_type: FileType) -> crate::layout::RecordLayoutBuilder {
    let (code, label) = match file_type {
        FileType::Remittance => ("1", "REMESSA"),
        FileType::Return => ("2", "RETORNO"),
    };
    RecordLayout::builder("header", RecordKind::Header, "0")
        .literal("0", 1)
        .literal(code, 1)
        .literal(label, 7)
        .literal("01", 2)
}

/// Return trailer ("registro trailer de retorno") used by both banks
pub(crate) fn return_trailer() -> LayoutResult<RecordLayout> {
    RecordLayout::builder("trailer", RecordKind::Trailer, "9")
        .literal("9", 1)
        .literal("2", 1)
        .literal("01", 2)
        .digits(f::BANK_CODE, 3)
        .filler(10)
        .numeric(f::TITLE_COUNT, 8)
        .amount(f::TOTAL_AMOUNT, 14)
        .numeric(f::RECORD_COUNT, 6)
        .filler(349)
        .numeric(f::LINE_NUMBER, 6)
        .build(WIDTH)
}

/// Payer block (columns 219-351) of remittance details
pub(crate) fn payer_block(
    builder: crate::layout::RecordLayoutBuilder,
    name_width: usize,
) -> crate::layout::RecordLayoutBuilder {
    let builder = builder
        .numeric(f::PAYER_DOCUMENT_TYPE, 2)
        .digits(f::PAYER_DOCUMENT, 14)
        .alpha(f::PAYER_NAME, name_width);
    let builder = if name_width < 40 {
        builder.filler(40 - name_width)
    } else {
        builder
    };
    builder
        .alpha(f::PAYER_ADDRESS, 40)
        .alpha(f::PAYER_DISTRICT, 12)
        .digits(f::PAYER_ZIP, 8)
        .alpha(f::PAYER_CITY, 15)
        .alpha(f::PAYER_STATE, 2)
}
