//! Banco Santander (033)

use super::cnab400::{self, WIDTH};
use super::febraban240::{self, LayoutVersions};
use super::{febraban_return_codes, BankId, ReturnCodeClass, ReturnCodeTable};
use crate::layout::{fields as f, FileLayout, LayoutResult, RecordLayout};
use crate::traits::BankAdapter;
use crate::types::{CnabFormat, FileType, RecordKind};

pub const BANK_CODE: &str = "033";
pub const BANK_NAME: &str = "BANCO SANTANDER";

const VERSIONS: LayoutVersions = LayoutVersions {
    file: "040",
    batch: "030",
};

/// Santander adapter: FEBRABAN 240 and Santander's own CNAB 400 cobrança
#[derive(Debug, Clone)]
pub struct Santander {
    codes_240: ReturnCodeTable,
    codes_400: ReturnCodeTable,
}

impl Santander {
    pub fn new() -> Self {
        Self {
            codes_240: febraban_return_codes(),
            codes_400: return_codes_400(),
        }
    }
}

impl Default for Santander {
    fn default() -> Self {
        Self::new()
    }
}

impl BankAdapter for Santander {
    fn bank_identifier(&self) -> BankId {
        BankId {
            code: BANK_CODE.to_string(),
            name: BANK_NAME.to_string(),
        }
    }

    fn layout(&self, format: CnabFormat, file_type: FileType) -> LayoutResult<FileLayout> {
        match format {
            CnabFormat::Cnab240 => febraban240::layout(BANK_CODE, BANK_NAME, file_type, VERSIONS),
            CnabFormat::Cnab400 => layout_400(file_type),
        }
    }

    fn return_code_table(&self, format: CnabFormat) -> &ReturnCodeTable {
        match format {
            CnabFormat::Cnab240 => &self.codes_240,
            CnabFormat::Cnab400 => &self.codes_400,
        }
    }
}

fn layout_400(file_type: FileType) -> LayoutResult<FileLayout> {
    let builder = cnab400::file_layout(BANK_CODE, BANK_NAME, file_type).record(header(file_type)?);
    match file_type {
        FileType::Remittance => builder
            .record(remittance_detail()?)
            .record(remittance_trailer()?)
            .build(),
        FileType::Return => builder
            .record(return_detail()?)
            .record(cnab400::return_trailer()?)
            .build(),
    }
}

fn header(file_type: FileType) -> LayoutResult<RecordLayout> {
    cnab400::header_start(file_type)
        .literal("COBRANCA", 15)
        .alpha(f::AGREEMENT, 20)
        .alpha(f::COMPANY_NAME, 30)
        .digits(f::BANK_CODE, 3)
        .alpha(f::BANK_NAME, 15)
        .date6(f::GENERATED_ON)
        .filler(291)
        .numeric(f::FILE_SEQUENCE, 3)
        .numeric(f::LINE_NUMBER, 6)
        .build(WIDTH)
}

fn remittance_detail() -> LayoutResult<RecordLayout> {
    let builder = RecordLayout::builder("detail", RecordKind::Detail, "1")
        .literal("1", 1)
        .numeric(f::COMPANY_DOCUMENT_TYPE, 2)
        .digits(f::COMPANY_DOCUMENT, 14)
        .alpha(f::AGREEMENT, 20)
        .alpha(f::COMPANY_REFERENCE, 25)
        .digits(f::DOCUMENT_ID, 8)
        .filler(37)
        .digits(f::WALLET_CODE, 1)
        .digits(f::OCCURRENCE_CODE, 2)
        .alpha(f::YOUR_NUMBER, 10)
        .date6(f::DUE_DATE)
        .amount(f::AMOUNT, 13)
        .digits(f::BANK_CODE, 3)
        .filler(5)
        .digits(f::TITLE_SPECIES, 2)
        .alpha(f::ACCEPTANCE, 1)
        .date6(f::ISSUE_DATE)
        .filler(4)
        .amount(f::INTEREST_AMOUNT, 13)
        .filler(45);
    cnab400::payer_block(builder, 40)
        .filler(43)
        .numeric(f::SEQUENCE, 6)
        .build(WIDTH)
}

fn remittance_trailer() -> LayoutResult<RecordLayout> {
    RecordLayout::builder("trailer", RecordKind::Trailer, "9")
        .literal("9", 1)
        .numeric(f::RECORD_COUNT, 6)
        .amount(f::TOTAL_AMOUNT, 13)
        .filler(371)
        .digits(f::BANK_CODE, 3)
        .numeric(f::LINE_NUMBER, 6)
        .build(WIDTH)
}

fn return_detail() -> LayoutResult<RecordLayout> {
    RecordLayout::builder("detail", RecordKind::Detail, "1")
        .literal("1", 1)
        .numeric(f::COMPANY_DOCUMENT_TYPE, 2)
        .digits(f::COMPANY_DOCUMENT, 14)
        .alpha(f::AGREEMENT, 20)
        .alpha(f::COMPANY_REFERENCE, 25)
        .digits(f::DOCUMENT_ID, 8)
        .filler(37)
        .digits(f::WALLET_CODE, 1)
        .digits(f::OCCURRENCE_CODE, 2)
        .date6(f::OCCURRENCE_DATE)
        .alpha(f::YOUR_NUMBER, 10)
        .filler(8)
        .alpha(f::REJECTION_REASONS, 12)
        .date6(f::DUE_DATE)
        .amount(f::AMOUNT, 13)
        .digits(f::COLLECTING_BANK, 3)
        .digits(f::COLLECTING_AGENCY, 5)
        .digits(f::TITLE_SPECIES, 2)
        .amount(f::FEE_AMOUNT, 13)
        .filler(39)
        .amount(f::DISCOUNT_AMOUNT, 13)
        .amount(f::PAID_AMOUNT, 13)
        .amount(f::CHARGES_AMOUNT, 13)
        .filler(27)
        .date6(f::CREDIT_DATE)
        .filler(95)
        .numeric(f::SEQUENCE, 6)
        .build(WIDTH)
}

/// Santander CNAB 400 occurrence table; rejection motives are 3 digits
fn return_codes_400() -> ReturnCodeTable {
    use ReturnCodeClass::*;

    ReturnCodeTable::new(3)
        .occurrence("01", Informational, "Título não existe")
        .occurrence("02", Acknowledged, "Entrada título confirmada")
        .occurrence("03", Rejected, "Entrada título rejeitada")
        .occurrence("06", Settled, "Liquidação")
        .occurrence("07", Settled, "Liquidação por conta")
        .occurrence("08", Settled, "Liquidação por saldo")
        .occurrence("09", Rejected, "Baixa automática")
        .occurrence("10", Rejected, "Título baixado conforme instrução")
        .occurrence("11", Informational, "Títulos em ser")
        .occurrence("12", Informational, "Abatimento concedido")
        .occurrence("13", Informational, "Abatimento cancelado")
        .occurrence("14", Informational, "Prorrogação de vencimento")
        .occurrence("15", Informational, "Confirmação de protesto")
        .occurrence("16", Rejected, "Título baixado/liquidado")
        .occurrence("17", Settled, "Liquidado em cartório")
        .occurrence("21", Informational, "Título enviado a cartório")
        .occurrence("22", Informational, "Título retirado de cartório")
        .occurrence("24", Informational, "Custas de cartório")
        .occurrence("25", Rejected, "Protestar título")
        .occurrence("26", Informational, "Sustar protesto")
        .motive("001", "Nosso número não numérico")
        .motive("002", "Valor do abatimento não numérico")
        .motive("003", "Data de vencimento não numérica")
        .motive("004", "Conta cobrança não numérica")
        .motive("005", "Código da carteira não numérico")
        .motive("006", "Código da carteira inválido")
        .motive("007", "Espécie do documento inválida")
        .motive("011", "Data de emissão inválida")
        .motive("013", "Valor do título inválido")
        .motive("017", "Data de vencimento anterior à data de emissão")
        .motive("025", "Nome do pagador não informado")
        .motive("029", "Número de inscrição do pagador inválido")
        .motive("038", "Nosso número duplicado")
}
