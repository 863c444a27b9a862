//! FEBRABAN CNAB 240 cobrança layout
//!
//! One file header, one batch ("lote") header, two detail segments per title
//! (P+Q on remittances, T+U on returns), a batch trailer and a file trailer.
//! The record type sits at column 8 and the segment code at column 14.
//! Banks differ only in the layout versions they declare.

use crate::layout::{fields as f, FileLayout, LayoutResult, RecordLayout};
use crate::types::{CnabFormat, FileType, RecordKind};

const WIDTH: usize = 240;

/// Layout versions a bank writes in the file and batch headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutVersions {
    pub file: &'static str,
    pub batch: &'static str,
}

/// Build the CNAB 240 layout for a bank and direction
pub fn layout(
    bank_code: &str,
    bank_name: &str,
    file_type: FileType,
    versions: LayoutVersions,
) -> LayoutResult<FileLayout> {
    let builder = FileLayout::builder(bank_code, bank_name, CnabFormat::Cnab240, file_type)
        .type_code_at(8, 1)
        .segment_at(14, 1)
        .sequence_start(1)
        .count_offset(2)
        .record(file_header(file_type, versions.file)?)
        .record(batch_header(file_type, versions.batch)?);

    let builder = match file_type {
        FileType::Remittance => builder.record(segment_p()?).record(segment_q()?),
        FileType::Return => builder.record(segment_t()?).record(segment_u()?),
    };

    builder.record(batch_trailer()?).record(file_trailer()?).build()
}

fn file_header(file_type: FileType, version: &str) -> LayoutResult<RecordLayout> {
    let file_code = match file_type {
        FileType::Remittance => "1",
        FileType::Return => "2",
    };
    RecordLayout::builder("file_header", RecordKind::Header, "0")
        .digits(f::BANK_CODE, 3)
        .literal("0000", 4)
        .literal("0", 1)
        .filler(9)
        .numeric(f::COMPANY_DOCUMENT_TYPE, 1)
        .digits(f::COMPANY_DOCUMENT, 14)
        .alpha(f::AGREEMENT, 20)
        .digits(f::AGENCY, 5)
        .alpha(f::AGENCY_DIGIT, 1)
        .digits(f::ACCOUNT, 12)
        .alpha(f::ACCOUNT_DIGIT, 1)
        .filler(1)
        .alpha(f::COMPANY_NAME, 30)
        .alpha(f::BANK_NAME, 30)
        .filler(10)
        .literal(file_code, 1)
        .date8(f::GENERATED_ON)
        .time(f::GENERATED_AT_TIME)
        .numeric(f::FILE_SEQUENCE, 6)
        .literal(version, 3)
        .filler(74)
        .build(WIDTH)
}

fn batch_header(file_type: FileType, version: &str) -> LayoutResult<RecordLayout> {
    let operation = match file_type {
        FileType::Remittance => "R",
        FileType::Return => "T",
    };
    RecordLayout::builder("batch_header", RecordKind::Header, "1")
        .digits(f::BANK_CODE, 3)
        .numeric(f::BATCH_NUMBER, 4)
        .literal("1", 1)
        .literal(operation, 1)
        .literal("01", 2)
        .filler(2)
        .literal(version, 3)
        .filler(1)
        .numeric(f::COMPANY_DOCUMENT_TYPE, 1)
        .digits(f::COMPANY_DOCUMENT, 15)
        .alpha(f::AGREEMENT, 20)
        .digits(f::AGENCY, 5)
        .alpha(f::AGENCY_DIGIT, 1)
        .digits(f::ACCOUNT, 12)
        .alpha(f::ACCOUNT_DIGIT, 1)
        .filler(1)
        .alpha(f::COMPANY_NAME, 30)
        .alpha(f::MESSAGE_1, 40)
        .alpha(f::MESSAGE_2, 40)
        .numeric(f::REMITTANCE_NUMBER, 8)
        .date8(f::GENERATED_ON)
        .date8(f::CREDIT_DATE)
        .filler(33)
        .build(WIDTH)
}

/// Columns 1-17 shared by every detail segment
fn segment_start(name: &str, segment: &str) -> crate::layout::RecordLayoutBuilder {
    RecordLayout::builder(name, RecordKind::Detail, "3")
        .digits(f::BANK_CODE, 3)
        .numeric(f::BATCH_NUMBER, 4)
        .literal("3", 1)
        .numeric(f::SEQUENCE, 5)
        .segment(segment)
        .filler(1)
        .digits(f::OCCURRENCE_CODE, 2)
}

fn segment_p() -> LayoutResult<RecordLayout> {
    segment_start("segment_p", "P")
        .digits(f::AGENCY, 5)
        .alpha(f::AGENCY_DIGIT, 1)
        .digits(f::ACCOUNT, 12)
        .alpha(f::ACCOUNT_DIGIT, 1)
        .filler(1)
        .alpha(f::DOCUMENT_ID, 20)
        .digits(f::WALLET_CODE, 1)
        .filler(4)
        .alpha(f::YOUR_NUMBER, 15)
        .date8(f::DUE_DATE)
        .amount(f::AMOUNT, 15)
        .filler(6)
        .digits(f::TITLE_SPECIES, 2)
        .alpha(f::ACCEPTANCE, 1)
        .date8(f::ISSUE_DATE)
        .filler(9)
        .amount(f::INTEREST_AMOUNT, 15)
        .filler(54)
        .alpha(f::COMPANY_REFERENCE, 25)
        .filler(20)
        .build(WIDTH)
}

fn segment_q() -> LayoutResult<RecordLayout> {
    segment_start("segment_q", "Q")
        .numeric(f::PAYER_DOCUMENT_TYPE, 1)
        .digits(f::PAYER_DOCUMENT, 15)
        .alpha(f::PAYER_NAME, 40)
        .alpha(f::PAYER_ADDRESS, 40)
        .alpha(f::PAYER_DISTRICT, 15)
        .digits(f::PAYER_ZIP, 8)
        .alpha(f::PAYER_CITY, 15)
        .alpha(f::PAYER_STATE, 2)
        .filler(87)
        .build(WIDTH)
}

fn segment_t() -> LayoutResult<RecordLayout> {
    segment_start("segment_t", "T")
        .digits(f::AGENCY, 5)
        .alpha(f::AGENCY_DIGIT, 1)
        .digits(f::ACCOUNT, 12)
        .alpha(f::ACCOUNT_DIGIT, 1)
        .filler(1)
        .alpha(f::DOCUMENT_ID, 20)
        .digits(f::WALLET_CODE, 1)
        .alpha(f::YOUR_NUMBER, 15)
        .date8(f::DUE_DATE)
        .amount(f::AMOUNT, 15)
        .digits(f::COLLECTING_BANK, 3)
        .digits(f::COLLECTING_AGENCY, 5)
        .filler(1)
        .alpha(f::COMPANY_REFERENCE, 25)
        .digits(f::CURRENCY_CODE, 2)
        .numeric(f::PAYER_DOCUMENT_TYPE, 1)
        .digits(f::PAYER_DOCUMENT, 15)
        .alpha(f::PAYER_NAME, 40)
        .filler(10)
        .amount(f::FEE_AMOUNT, 15)
        .alpha(f::REJECTION_REASONS, 10)
        .filler(17)
        .build(WIDTH)
}

fn segment_u() -> LayoutResult<RecordLayout> {
    segment_start("segment_u", "U")
        .amount(f::CHARGES_AMOUNT, 15)
        .amount(f::DISCOUNT_AMOUNT, 15)
        .amount(f::REBATE_AMOUNT, 15)
        .amount(f::IOF_AMOUNT, 15)
        .amount(f::PAID_AMOUNT, 15)
        .amount(f::NET_AMOUNT, 15)
        .filler(30)
        .date8(f::OCCURRENCE_DATE)
        .date8(f::CREDIT_DATE)
        .filler(87)
        .build(WIDTH)
}

fn batch_trailer() -> LayoutResult<RecordLayout> {
    RecordLayout::builder("batch_trailer", RecordKind::Trailer, "5")
        .digits(f::BANK_CODE, 3)
        .numeric(f::BATCH_NUMBER, 4)
        .literal("5", 1)
        .filler(9)
        .numeric(f::RECORD_COUNT, 6)
        .numeric(f::TITLE_COUNT, 6)
        .amount(f::TOTAL_AMOUNT, 17)
        .filler(194)
        .build(WIDTH)
}

fn file_trailer() -> LayoutResult<RecordLayout> {
    RecordLayout::builder("file_trailer", RecordKind::Trailer, "9")
        .digits(f::BANK_CODE, 3)
        .literal("9999", 4)
        .literal("9", 1)
        .filler(9)
        .numeric(f::BATCH_COUNT, 6)
        .numeric(f::FILE_RECORD_COUNT, 6)
        .filler(211)
        .build(WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSIONS: LayoutVersions = LayoutVersions {
        file: "040",
        batch: "030",
    };

    #[test]
    fn test_remittance_uses_segments_p_and_q() {
        let layout = layout("033", "BANCO SANTANDER", FileType::Remittance, VERSIONS).unwrap();
        assert_eq!(layout.detail_order, vec!["segment_p", "segment_q"]);
        assert_eq!(layout.header_order, vec!["file_header", "batch_header"]);
        assert_eq!(layout.trailer_order, vec!["batch_trailer", "file_trailer"]);

        let p = layout.record("segment_p").unwrap();
        let document = p.field(f::DOCUMENT_ID).unwrap();
        assert_eq!((document.start, document.end()), (38, 57));
        let amount = p.field(f::AMOUNT).unwrap();
        assert_eq!((amount.start, amount.end()), (86, 100));
    }

    #[test]
    fn test_return_uses_segments_t_and_u() {
        let layout = layout("001", "BANCO DO BRASIL", FileType::Return, VERSIONS).unwrap();
        assert_eq!(layout.detail_order, vec!["segment_t", "segment_u"]);
        let u = layout.record("segment_u").unwrap();
        let paid = u.field(f::PAID_AMOUNT).unwrap();
        assert_eq!((paid.start, paid.end()), (78, 92));
        assert!(!u.is_primary());
    }

    #[test]
    fn test_identify_by_segment() {
        let layout = layout("033", "BANCO SANTANDER", FileType::Remittance, VERSIONS).unwrap();
        let mut line = vec![b' '; WIDTH];
        line[7] = b'3';
        line[13] = b'Q';
        assert_eq!(layout.identify(&line).unwrap().name, "segment_q");
        line[13] = b'T';
        assert_eq!(layout.identify(&line).unwrap_err(), "3T");
    }
}
