//! Validation utilities for uploaded files

use crate::types::*;

/// Validate that a file name carries an extension accepted for its direction
///
/// Remittances are `.rem` or `.txt`, returns `.ret` or `.txt`.
pub fn validate_file_name(file_name: &str, file_type: FileType) -> CnabResult<()> {
    if file_name.trim().is_empty() {
        return Err(CnabError::InvalidFile("File name cannot be empty".to_string()));
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let accepted: &[&str] = match file_type {
        FileType::Remittance => &["rem", "txt"],
        FileType::Return => &["ret", "txt"],
    };

    if !accepted.contains(&extension.as_str()) {
        return Err(CnabError::InvalidFile(format!(
            "{} files must end in {}, got '{}'",
            file_type,
            accepted
                .iter()
                .map(|e| format!(".{}", e))
                .collect::<Vec<_>>()
                .join(" or "),
            file_name
        )));
    }

    Ok(())
}

/// Validate that a file is not empty and not above the configured size
pub fn validate_file_size(size: usize, max_size: usize) -> CnabResult<()> {
    if size == 0 {
        return Err(CnabError::InvalidFile("File is empty".to_string()));
    }

    if size > max_size {
        return Err(CnabError::InvalidFile(format!(
            "File has {} bytes, limit is {} bytes",
            size, max_size
        )));
    }

    Ok(())
}

/// Validate that a bank code is three digits
pub fn validate_bank_code(code: &str) -> CnabResult<()> {
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CnabError::UnsupportedBank(format!(
            "'{}' is not a three-digit bank code",
            code
        )));
    }

    Ok(())
}
