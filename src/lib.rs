//! # CNAB Core
//!
//! A library for the FEBRABAN CNAB bank file formats, providing encoding and
//! decoding of remittance and return files, batch validation and settlement
//! reconciliation.
//!
//! ## Features
//!
//! - **Codec**: Layout-driven decoding and encoding of CNAB 240 and CNAB 400 files
//! - **Validation**: Structural, checksum and domain checks with custom rules
//! - **Reconciliation**: Settlement status of every remittance title from return files
//! - **Bank adapters**: Santander and Banco do Brasil layouts and return-code tables
//! - **Storage abstraction**: Database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use cnab_core::banks::Santander;
//! use cnab_core::{decode, encode, validate, BankAdapter, BatchBuilder, CnabFormat, FileType, Title};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! let layout = Santander::new()
//!     .layout(CnabFormat::Cnab240, FileType::Remittance)
//!     .unwrap();
//! let due = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
//! let issued = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//!
//! let batch = BatchBuilder::new(&layout, 1, issued.and_hms_opt(9, 30, 0).unwrap())
//!     .title(Title::new("D1", BigDecimal::from(100), due, issued))
//!     .build()
//!     .unwrap();
//! let bytes = encode(&batch, &layout).unwrap();
//!
//! assert_eq!(decode(&bytes, &layout).unwrap(), batch);
//! assert!(validate(&batch).is_valid());
//! ```

pub mod banks;
pub mod codec;
pub mod layout;
pub mod pipeline;
pub mod reconciliation;
pub mod settings;
pub mod traits;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use traits::*;
pub use types::*;

pub use banks::{AdapterRegistry, BankId, ReturnCodeClass, ReturnCodeTable};
pub use codec::{decode, encode, BatchBuilder, DecodeError, EncodeError};
pub use pipeline::{BatchJob, BatchProcessor, ProcessedBatch, ProcessingSummary};
pub use reconciliation::{ReconciliationEngine, ReconciliationSummary, SettlementMap};
pub use settings::{BankAccountConfig, CnabConfig};
pub use validation::{validate, BatchValidator, IssueCode, ValidationIssue, ValidationReport};
