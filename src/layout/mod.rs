//! Fixed-width layout definitions: field specs, record layouts and file layouts

pub mod field;
pub mod fields;
pub mod file;
pub mod record;

pub use field::*;
pub use file::*;
pub use record::*;

/// Errors raised while defining a layout
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Record '{record}' covers {found} columns, expected {expected}")]
    WidthMismatch {
        record: String,
        expected: usize,
        found: usize,
    },
    #[error("Record '{record}' defines field '{field}' twice")]
    DuplicateField { record: String, field: String },
    #[error("Record '{record}' is missing required field '{field}'")]
    MissingField { record: String, field: String },
    #[error("Record type '{0}' is defined more than once")]
    DuplicateRecordType(String),
    #[error("Invalid layout: {0}")]
    Invalid(String),
    #[error("No {format} {file_type} layout for bank {bank_code}")]
    Unsupported {
        bank_code: String,
        format: crate::types::CnabFormat,
        file_type: crate::types::FileType,
    },
}

/// Result type for layout definitions
pub type LayoutResult<T> = Result<T, LayoutError>;
