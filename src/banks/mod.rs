//! Bank adapters: layouts and return-code tables per bank
//!
//! Each supported bank implements [`BankAdapter`]. CNAB 240 files follow the
//! FEBRABAN layout shared by all banks; CNAB 400 layouts are bank specific.

pub mod banco_do_brasil;
pub mod cnab400;
pub mod febraban240;
pub mod santander;

pub use banco_do_brasil::BancoDoBrasil;
pub use santander::Santander;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::traits::BankAdapter;
use crate::types::{CnabError, CnabResult};

/// Bank code ("código de compensação") and display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BankId {
    pub code: String,
    pub name: String,
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// What an occurrence code in a return file means for the title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnCodeClass {
    /// Registration confirmed, title still open
    Acknowledged,
    /// Title paid
    Settled,
    /// Registration refused or title written off
    Rejected,
    /// Any other movement (instructions, protests, fee notices)
    Informational,
}

/// Entry of a bank's occurrence table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnCode {
    pub class: ReturnCodeClass,
    pub description: String,
}

/// Occurrence codes and rejection motives of one bank and format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnCodeTable {
    occurrences: HashMap<String, ReturnCode>,
    motives: HashMap<String, String>,
    motive_width: usize,
}

impl ReturnCodeTable {
    /// Table whose rejection motives are `motive_width` characters each
    pub fn new(motive_width: usize) -> Self {
        Self {
            occurrences: HashMap::new(),
            motives: HashMap::new(),
            motive_width: motive_width.max(1),
        }
    }

    pub fn occurrence(mut self, code: &str, class: ReturnCodeClass, description: &str) -> Self {
        self.occurrences.insert(
            code.to_string(),
            ReturnCode {
                class,
                description: description.to_string(),
            },
        );
        self
    }

    pub fn motive(mut self, code: &str, description: &str) -> Self {
        self.motives.insert(code.to_string(), description.to_string());
        self
    }

    /// Look an occurrence code up; `None` for codes the bank does not document
    pub fn classify(&self, code: &str) -> Option<&ReturnCode> {
        self.occurrences.get(code.trim())
    }

    /// Human readable rejection reason: occurrence description plus motives
    ///
    /// `motives_raw` is the raw motive field of the return record, a run of
    /// fixed-width motive codes. Blank and zero codes are skipped.
    pub fn rejection_reason(&self, code: &ReturnCode, motives_raw: &str) -> String {
        let chars: Vec<char> = motives_raw.chars().collect();
        let motives: Vec<String> = chars
            .chunks(self.motive_width)
            .map(|chunk| chunk.iter().collect::<String>())
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty() && !m.chars().all(|c| c == '0'))
            .map(|m| match self.motives.get(&m) {
                Some(description) => description.clone(),
                None => format!("motivo {}", m),
            })
            .collect();

        if motives.is_empty() {
            code.description.clone()
        } else {
            format!("{}: {}", code.description, motives.join("; "))
        }
    }
}

/// FEBRABAN CNAB 240 occurrence table shared by the supported banks
pub fn febraban_return_codes() -> ReturnCodeTable {
    use ReturnCodeClass::*;

    ReturnCodeTable::new(2)
        .occurrence("02", Acknowledged, "Entrada confirmada")
        .occurrence("03", Rejected, "Entrada rejeitada")
        .occurrence("04", Informational, "Transferência de carteira/entrada")
        .occurrence("06", Settled, "Liquidação")
        .occurrence("09", Rejected, "Baixa")
        .occurrence("11", Informational, "Títulos em carteira (em ser)")
        .occurrence("12", Informational, "Confirmação recebimento instrução de abatimento")
        .occurrence("14", Informational, "Confirmação recebimento instrução alteração de vencimento")
        .occurrence("17", Settled, "Liquidação após baixa ou liquidação título não registrado")
        .occurrence("19", Informational, "Confirmação recebimento instrução de protesto")
        .occurrence("23", Informational, "Remessa a cartório")
        .occurrence("25", Rejected, "Protestado e baixado")
        .occurrence("26", Informational, "Instrução rejeitada")
        .occurrence("28", Informational, "Débito de tarifas/custas")
        .occurrence("30", Informational, "Alteração de outros dados rejeitados")
        .motive("01", "Código do banco inválido")
        .motive("02", "Código do registro detalhe inválido")
        .motive("03", "Código do segmento inválido")
        .motive("04", "Código de movimento não permitido para carteira")
        .motive("05", "Código de movimento inválido")
        .motive("06", "Tipo/número de inscrição do beneficiário inválidos")
        .motive("07", "Agência/conta/DV inválido")
        .motive("08", "Nosso número inválido")
        .motive("09", "Nosso número duplicado")
        .motive("10", "Carteira inválida")
        .motive("16", "Data de vencimento inválida")
        .motive("17", "Data de vencimento anterior à data de emissão")
        .motive("20", "Valor do título inválido")
        .motive("24", "Data de emissão inválida")
        .motive("45", "Nome do pagador não informado")
        .motive("46", "Tipo/número de inscrição do pagador inválidos")
        .motive("48", "CEP inválido")
}

/// Looks adapters up by bank code
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn BankAdapter>>,
}

impl AdapterRegistry {
    /// Registry without any adapter
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, adapter: Arc<dyn BankAdapter>) {
        self.adapters
            .insert(adapter.bank_identifier().code, adapter);
    }

    pub fn get(&self, bank_code: &str) -> CnabResult<Arc<dyn BankAdapter>> {
        self.adapters
            .get(bank_code)
            .cloned()
            .ok_or_else(|| CnabError::UnsupportedBank(bank_code.to_string()))
    }

    /// Supported banks, sorted by code
    pub fn banks(&self) -> Vec<BankId> {
        let mut banks: Vec<BankId> = self.adapters.values().map(|a| a.bank_identifier()).collect();
        banks.sort_by(|a, b| a.code.cmp(&b.code));
        banks
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(Santander::new()));
        registry.register(Arc::new(BancoDoBrasil::new()));
        registry
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("banks", &self.banks())
            .finish()
    }
}
