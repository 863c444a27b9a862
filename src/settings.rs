//! Processing configuration
//!
//! Loaded from `config/default`, `config/{RUN_MODE}` and `CNAB__*`
//! environment variables, in that order of precedence (last wins).

use serde::{Deserialize, Serialize};

use crate::types::{CnabError, CnabResult};
use crate::validation::ValidationPolicy;

/// Complete processing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnabConfig {
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub validation: ValidationPolicy,
    /// Bank accounts files are exchanged for
    #[serde(default = "default_banks")]
    pub banks: Vec<BankAccountConfig>,
}

impl Default for CnabConfig {
    fn default() -> Self {
        Self {
            processing: ProcessingConfig::default(),
            validation: ValidationPolicy::default(),
            banks: default_banks(),
        }
    }
}

/// Limits applied to every processed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Time allowed to decode and validate one file
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: usize,
}

fn default_batch_timeout_ms() -> u64 {
    30_000
}

fn default_max_file_size() -> usize {
    50 * 1024 * 1024 // 50 MB
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_timeout_ms: default_batch_timeout_ms(),
            max_file_size_bytes: default_max_file_size(),
        }
    }
}

/// Company account at one bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountConfig {
    /// Bank code, e.g. "033"
    pub code: String,
    pub name: String,
    pub agency: String,
    #[serde(default)]
    pub agency_digit: String,
    pub account: String,
    #[serde(default)]
    pub account_digit: String,
    /// Agreement ("convênio") number
    pub agreement: String,
    #[serde(default)]
    pub company_name: String,
    /// CNPJ, digits only
    #[serde(default)]
    pub company_document: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

fn default_banks() -> Vec<BankAccountConfig> {
    vec![
        BankAccountConfig {
            code: "033".to_string(),
            name: "Santander".to_string(),
            agency: "1234".to_string(),
            agency_digit: String::new(),
            account: "567890".to_string(),
            account_digit: "1".to_string(),
            agreement: "123456".to_string(),
            company_name: "NASAJON SISTEMAS".to_string(),
            company_document: "00000000000191".to_string(),
            active: true,
        },
        BankAccountConfig {
            code: "001".to_string(),
            name: "Banco do Brasil".to_string(),
            agency: "5678".to_string(),
            agency_digit: String::new(),
            account: "123456".to_string(),
            account_digit: "7".to_string(),
            agreement: "789012".to_string(),
            company_name: "NASAJON SISTEMAS".to_string(),
            company_document: "00000000000191".to_string(),
            active: true,
        },
    ]
}

impl CnabConfig {
    /// Loads configuration from config files and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or deserialized.
    pub fn load() -> CnabResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = ::config::Config::builder()
            .add_source(::config::File::with_name("config/default").required(false))
            .add_source(::config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(::config::Environment::with_prefix("CNAB").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(toml: &str) -> CnabResult<Self> {
        let config = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Account configured for a bank code
    pub fn bank(&self, code: &str) -> Option<&BankAccountConfig> {
        self.banks.iter().find(|b| b.code == code)
    }

    /// Account for a bank that must be configured and active
    pub fn active_bank(&self, code: &str) -> CnabResult<&BankAccountConfig> {
        let bank = self
            .bank(code)
            .ok_or_else(|| CnabError::UnsupportedBank(code.to_string()))?;
        if !bank.active {
            return Err(CnabError::BankDisabled(code.to_string()));
        }
        Ok(bank)
    }
}
