//! Banco do Brasil (001)

use super::cnab400::{self, WIDTH};
use super::febraban240::{self, LayoutVersions};
use super::{febraban_return_codes, BankId, ReturnCodeClass, ReturnCodeTable};
use crate::layout::{fields as f, FileLayout, LayoutResult, RecordLayout};
use crate::traits::BankAdapter;
use crate::types::{CnabFormat, FileType, RecordKind};

pub const BANK_CODE: &str = "001";
pub const BANK_NAME: &str = "BANCO DO BRASIL";

const VERSIONS: LayoutVersions = LayoutVersions {
    file: "083",
    batch: "042",
};

/// Banco do Brasil adapter
///
/// The CNAB 400 layout is the one for agreements ("convênios") with seven
/// digits, whose detail records have type code 7 and a 17-digit nosso número.
#[derive(Debug, Clone)]
pub struct BancoDoBrasil {
    codes_240: ReturnCodeTable,
    codes_400: ReturnCodeTable,
}

impl BancoDoBrasil {
    pub fn new() -> Self {
        Self {
            codes_240: febraban_return_codes(),
            codes_400: return_codes_400(),
        }
    }
}

impl Default for BancoDoBrasil {
    fn default() -> Self {
        Self::new()
    }
}

impl BankAdapter for BancoDoBrasil {
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
    let builder = cnab400::file_layout(BANK_CODE, BANK_NAME, file_type);
    match file_type {
        FileType::Remittance => builder
            .record(remittance_header()?)
            .record(remittance_detail()?)
            .record(remittance_trailer()?)
            .build(),
        FileType::Return => builder
            .record(return_header()?)
            .record(return_detail()?)
            .record(cnab400::return_trailer()?)
            .build(),
    }
}

/// Columns 1-107 shared by both headers
fn header_start(file_type: FileType) -> crate::layout::RecordLayoutBuilder {
    cnab400::header_start(file_type)
        .literal("COBRANCA", 8)
        .filler(7)
        .digits(f::AGENCY, 4)
        .alpha(f::AGENCY_DIGIT, 1)
        .digits(f::ACCOUNT, 8)
        .alpha(f::ACCOUNT_DIGIT, 1)
        .filler(6)
        .alpha(f::COMPANY_NAME, 30)
        .digits(f::BANK_CODE, 3)
        .alpha(f::BANK_NAME, 15)
        .date6(f::GENERATED_ON)
        .numeric(f::FILE_SEQUENCE, 7)
}

fn remittance_header() -> LayoutResult<RecordLayout> {
    header_start(FileType::Remittance)
        .filler(22)
        .digits(f::AGREEMENT, 7)
        .filler(258)
        .numeric(f::LINE_NUMBER, 6)
        .build(WIDTH)
}

fn return_header() -> LayoutResult<RecordLayout> {
    header_start(FileType::Return)
        .filler(42)
        .digits(f::AGREEMENT, 7)
        .filler(238)
        .numeric(f::LINE_NUMBER, 6)
        .build(WIDTH)
}

/// Columns 1-80: company, account, agreement and nosso número
fn detail_start() -> crate::layout::RecordLayoutBuilder {
    RecordLayout::builder("detail", RecordKind::Detail, "7")
        .literal("7", 1)
        .numeric(f::COMPANY_DOCUMENT_TYPE, 2)
        .digits(f::COMPANY_DOCUMENT, 14)
        .digits(f::AGENCY, 4)
        .alpha(f::AGENCY_DIGIT, 1)
        .digits(f::ACCOUNT, 8)
        .alpha(f::ACCOUNT_DIGIT, 1)
        .digits(f::AGREEMENT, 7)
        .alpha(f::COMPANY_REFERENCE, 25)
        .digits(f::DOCUMENT_ID, 17)
}

fn remittance_detail() -> LayoutResult<RecordLayout> {
    let builder = detail_start()
        .filler(26)
        .digits(f::WALLET_CODE, 2)
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
    cnab400::payer_block(builder, 37)
        .filler(43)
        .numeric(f::SEQUENCE, 6)
        .build(WIDTH)
}

fn remittance_trailer() -> LayoutResult<RecordLayout> {
    RecordLayout::builder("trailer", RecordKind::Trailer, "9")
        .literal("9", 1)
        .numeric(f::RECORD_COUNT, 6)
        .amount(f::TOTAL_AMOUNT, 13)
        .digits(f::BANK_CODE, 3)
        .filler(371)
        .numeric(f::LINE_NUMBER, 6)
        .build(WIDTH)
}

fn return_detail() -> LayoutResult<RecordLayout> {
    detail_start()
        .filler(6)
        .alpha(f::REJECTION_REASONS, 2)
        .filler(18)
        .digits(f::WALLET_CODE, 2)
        .digits(f::OCCURRENCE_CODE, 2)
        .date6(f::OCCURRENCE_DATE)
        .alpha(f::YOUR_NUMBER, 10)
        .filler(20)
        .date6(f::DUE_DATE)
        .amount(f::AMOUNT, 13)
        .digits(f::COLLECTING_BANK, 3)
        .digits(f::COLLECTING_AGENCY, 4)
        .filler(1)
        .digits(f::TITLE_SPECIES, 2)
        .date6(f::CREDIT_DATE)
        .amount(f::FEE_AMOUNT, 7)
        .filler(39)
        .amount(f::DISCOUNT_AMOUNT, 13)
        .filler(13)
        .amount(f::PAID_AMOUNT, 13)
        .amount(f::CHARGES_AMOUNT, 13)
        .filler(115)
        .numeric(f::SEQUENCE, 6)
        .build(WIDTH)
}

/// Banco do Brasil CNAB 400 occurrence table ("comandos" 02-72)
fn return_codes_400() -> ReturnCodeTable {
    use ReturnCodeClass::*;

    ReturnCodeTable::new(2)
        .occurrence("02", Acknowledged, "Confirmação de entrada de título")
        .occurrence("03", Rejected, "Comando recusado")
        .occurrence("05", Settled, "Liquidado sem registro")
        .occurrence("06", Settled, "Liquidação normal")
        .occurrence("07", Settled, "Liquidação por conta")
        .occurrence("08", Settled, "Liquidação por saldo")
        .occurrence("09", Rejected, "Baixa de título")
        .occurrence("10", Rejected, "Baixa solicitada")
        .occurrence("11", Informational, "Títulos em ser")
        .occurrence("12", Informational, "Abatimento concedido")
        .occurrence("13", Informational, "Abatimento cancelado")
        .occurrence("14", Informational, "Alteração de vencimento")
        .occurrence("15", Settled, "Liquidação em cartório")
        .occurrence("19", Informational, "Confirmação de instrução de protesto")
        .occurrence("20", Informational, "Débito em conta")
        .occurrence("21", Informational, "Alteração do nome do pagador")
        .occurrence("23", Informational, "Indicação de encaminhamento a cartório")
        .occurrence("24", Informational, "Sustar protesto")
        .occurrence("46", Informational, "Alteração de nosso número")
        .occurrence("72", Informational, "Alteração de tipo de cobrança")
        .motive("01", "Identificação inválida")
        .motive("02", "Variação da carteira inválida")
        .motive("03", "Valor dos juros por um dia inválido")
        .motive("05", "Espécie de título inválida para carteira")
        .motive("08", "Nome do pagador não informado")
        .motive("09", "Valor do título inválido")
        .motive("10", "Número de inscrição do pagador inválido")
        .motive("16", "Data de vencimento inválida")
        .motive("19", "Nosso número já registrado")
        .motive("21", "Agência/conta do beneficiário inválida")
        .motive("39", "Data de emissão inválida")
        .motive("44", "Convênio inválido")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_400_detail_uses_type_seven() {
        let layout = BancoDoBrasil::new()
            .layout(CnabFormat::Cnab400, FileType::Remittance)
            .unwrap();
        let mut line = vec![b' '; WIDTH];
        line[0] = b'7';
        assert_eq!(layout.identify(&line).unwrap().name, "detail");
        line[0] = b'1';
        assert_eq!(layout.identify(&line).unwrap_err(), "1");

        let detail = layout.record("detail").unwrap();
        let document = detail.field(f::DOCUMENT_ID).unwrap();
        assert_eq!((document.start, document.end()), (64, 80));
        let agreement = detail.field(f::AGREEMENT).unwrap();
        assert_eq!((agreement.start, agreement.end()), (32, 38));
    }

    #[test]
    fn test_return_layout_columns() {
        let layout = BancoDoBrasil::new()
            .layout(CnabFormat::Cnab400, FileType::Return)
            .unwrap();
        let detail = layout.record("detail").unwrap();
        let paid = detail.field(f::PAID_AMOUNT).unwrap();
        assert_eq!((paid.start, paid.end()), (254, 266));
        let header = layout.record("header").unwrap();
        assert_eq!(header.field(f::AGREEMENT).unwrap().start, 150);
    }
}
