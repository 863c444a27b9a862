//! Canonical field names shared by every bank layout
//!
//! Codec, validator and reconciliation only ever look fields up by these
//! names, so a bank adapter only has to place them at the right columns.

pub const BANK_CODE: &str = "bank_code";
pub const BANK_NAME: &str = "bank_name";
pub const BATCH_NUMBER: &str = "batch_number";
pub const REMITTANCE_NUMBER: &str = "remittance_number";
/// Physical line number (CNAB 400 headers and trailers)
pub const LINE_NUMBER: &str = "line_number";
/// Detail record sequence number
pub const SEQUENCE: &str = "sequence";

pub const FILE_SEQUENCE: &str = "file_sequence";
pub const GENERATED_ON: &str = "generated_on";
pub const GENERATED_AT_TIME: &str = "generated_at_time";

pub const COMPANY_DOCUMENT_TYPE: &str = "company_document_type";
pub const COMPANY_DOCUMENT: &str = "company_document";
pub const COMPANY_NAME: &str = "company_name";
pub const AGREEMENT: &str = "agreement";
pub const AGENCY: &str = "agency";
pub const AGENCY_DIGIT: &str = "agency_digit";
pub const ACCOUNT: &str = "account";
pub const ACCOUNT_DIGIT: &str = "account_digit";
pub const MESSAGE_1: &str = "message_1";
pub const MESSAGE_2: &str = "message_2";

pub const DOCUMENT_ID: &str = "document_id";
pub const YOUR_NUMBER: &str = "your_number";
pub const COMPANY_REFERENCE: &str = "company_reference";
pub const WALLET_CODE: &str = "wallet_code";
pub const OCCURRENCE_CODE: &str = "occurrence_code";
pub const OCCURRENCE_DATE: &str = "occurrence_date";
pub const REJECTION_REASONS: &str = "rejection_reasons";
pub const DUE_DATE: &str = "due_date";
pub const ISSUE_DATE: &str = "issue_date";
pub const CREDIT_DATE: &str = "credit_date";
pub const AMOUNT: &str = "amount";
pub const PAID_AMOUNT: &str = "paid_amount";
pub const NET_AMOUNT: &str = "net_amount";
pub const INTEREST_AMOUNT: &str = "interest_amount";
pub const DISCOUNT_AMOUNT: &str = "discount_amount";
pub const REBATE_AMOUNT: &str = "rebate_amount";
pub const IOF_AMOUNT: &str = "iof_amount";
pub const CHARGES_AMOUNT: &str = "charges_amount";
pub const FEE_AMOUNT: &str = "fee_amount";
pub const TITLE_SPECIES: &str = "title_species";
pub const ACCEPTANCE: &str = "acceptance";
pub const COLLECTING_BANK: &str = "collecting_bank";
pub const COLLECTING_AGENCY: &str = "collecting_agency";
pub const CURRENCY_CODE: &str = "currency_code";

pub const PAYER_DOCUMENT_TYPE: &str = "payer_document_type";
pub const PAYER_DOCUMENT: &str = "payer_document";
pub const PAYER_NAME: &str = "payer_name";
pub const PAYER_ADDRESS: &str = "payer_address";
pub const PAYER_DISTRICT: &str = "payer_district";
pub const PAYER_ZIP: &str = "payer_zip";
pub const PAYER_CITY: &str = "payer_city";
pub const PAYER_STATE: &str = "payer_state";

/// Trailer: records declared (including the layout's count offset)
pub const RECORD_COUNT: &str = "record_count";
/// Trailer: titles declared
pub const TITLE_COUNT: &str = "title_count";
/// Trailer: declared sum of detail face values
pub const TOTAL_AMOUNT: &str = "total_amount";
/// File trailer: every line of the file
pub const FILE_RECORD_COUNT: &str = "file_record_count";
pub const BATCH_COUNT: &str = "batch_count";
