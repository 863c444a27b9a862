//! Field specifications and fixed-width value conversion

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::codec::{EncodeError, EncodeResult};
use crate::types::FieldValue;

/// Date encodings used by CNAB layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    /// DDMMAAAA (CNAB 240)
    Ddmmyyyy,
    /// DDMMAA (CNAB 400); years 70-99 map to 19xx, 00-69 to 20xx
    Ddmmyy,
}

impl DateFormat {
    pub fn width(&self) -> usize {
        match self {
            DateFormat::Ddmmyyyy => 8,
            DateFormat::Ddmmyy => 6,
        }
    }
}

/// How a field's columns are interpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Zero-padded counter decoded as a number
    Numeric,
    /// Zero-padded identifier; leading zeros are preserved
    Digits,
    /// Left-aligned, blank-padded text
    Alpha,
    /// Zero-padded amount with implied decimal places
    Amount { decimals: u32 },
    Date(DateFormat),
    /// HHMMSS
    Time,
    /// Fixed content, checked on decode and written verbatim on encode
    Literal(String),
    /// Reserved columns ("uso exclusivo"), blank on encode, ignored on decode
    Filler,
}

/// A named field occupying `width` columns starting at 1-based column `start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub start: usize,
    pub width: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Last column (1-based, inclusive)
    pub fn end(&self) -> usize {
        self.start + self.width - 1
    }

    /// Whether the field's value is kept on the decoded record
    pub fn is_stored(&self) -> bool {
        !matches!(self.kind, FieldKind::Literal(_) | FieldKind::Filler)
    }

    /// Column slice of a full line
    pub fn slice<'a>(&self, line: &'a [u8]) -> &'a [u8] {
        &line[self.start - 1..self.start - 1 + self.width]
    }

    /// Content written for literal and filler fields
    pub fn fixed_text(&self) -> String {
        match &self.kind {
            FieldKind::Literal(text) => text.clone(),
            _ => " ".repeat(self.width),
        }
    }

    /// Value a freshly created record holds for this field
    pub fn default_value(&self) -> FieldValue {
        match self.kind {
            FieldKind::Numeric => FieldValue::Number(0),
            FieldKind::Amount { .. } => FieldValue::Amount(BigDecimal::from(0)),
            FieldKind::Date(_) => FieldValue::Date(None),
            FieldKind::Time => FieldValue::Time(None),
            _ => FieldValue::Text(String::new()),
        }
    }

    /// Decode the raw column content of a stored field
    pub fn parse(&self, raw: &str) -> Result<FieldValue, String> {
        match &self.kind {
            FieldKind::Numeric => {
                require_digits(raw)?;
                raw.parse::<u64>()
                    .map(FieldValue::Number)
                    .map_err(|e| format!("'{}' is not a valid number: {}", raw, e))
            }
            FieldKind::Digits => {
                require_digits(raw)?;
                Ok(FieldValue::Text(raw.to_string()))
            }
            FieldKind::Alpha => Ok(FieldValue::Text(raw.trim_end().to_string())),
            FieldKind::Amount { decimals } => parse_amount(raw, *decimals).map(FieldValue::Amount),
            FieldKind::Date(format) => parse_date(raw, *format).map(FieldValue::Date),
            FieldKind::Time => parse_time(raw).map(FieldValue::Time),
            FieldKind::Literal(_) | FieldKind::Filler => {
                Err(format!("field '{}' holds no value", self.name))
            }
        }
    }

    /// Render a value into exactly `width` columns
    pub fn format(&self, value: &FieldValue) -> EncodeResult<String> {
        let text = match (&self.kind, value) {
            (FieldKind::Numeric | FieldKind::Digits, FieldValue::Number(n)) => {
                self.pad_left(n.to_string())?
            }
            (FieldKind::Numeric | FieldKind::Digits, FieldValue::Text(s)) => {
                require_digits(s).map_err(|reason| self.invalid(reason))?;
                self.pad_left(s.clone())?
            }
            (FieldKind::Alpha, FieldValue::Text(s)) => self.pad_right(s)?,
            (FieldKind::Alpha, FieldValue::Number(n)) => self.pad_right(&n.to_string())?,
            (FieldKind::Amount { decimals }, FieldValue::Amount(amount)) => {
                self.format_amount(amount, *decimals)?
            }
            (FieldKind::Date(format), FieldValue::Date(date)) => self.format_date(*date, *format)?,
            (FieldKind::Time, FieldValue::Time(time)) => match time {
                Some(t) => format!("{:02}{:02}{:02}", t.hour(), t.minute(), t.second()),
                None => "0".repeat(self.width),
            },
            (FieldKind::Literal(_) | FieldKind::Filler, _) => self.fixed_text(),
            (kind, value) => {
                return Err(self.invalid(format!("{:?} cannot hold {:?}", kind, value)));
            }
        };
        if text.chars().count() != self.width {
            return Err(self.invalid(format!(
                "content '{}' does not fill {} columns",
                text, self.width
            )));
        }
        Ok(text)
    }

    fn pad_left(&self, digits: String) -> EncodeResult<String> {
        if digits.len() > self.width {
            return Err(self.overflow(&digits));
        }
        Ok(format!("{:0>width$}", digits, width = self.width))
    }

    fn pad_right(&self, text: &str) -> EncodeResult<String> {
        if let Some(c) = text.chars().find(|c| (*c as u32) > 0xFF || c.is_control()) {
            return Err(self.invalid(format!("character {:?} is not representable", c)));
        }
        let text = text.trim_end();
        if text.chars().count() > self.width {
            return Err(self.overflow(text));
        }
        Ok(format!("{:<width$}", text, width = self.width))
    }

    fn format_amount(&self, amount: &BigDecimal, decimals: u32) -> EncodeResult<String> {
        if *amount < BigDecimal::from(0) {
            return Err(EncodeError::NegativeAmount {
                field: self.name.clone(),
            });
        }
        let scaled = amount.with_scale(i64::from(decimals));
        if scaled != *amount {
            return Err(EncodeError::PrecisionLoss {
                field: self.name.clone(),
                value: amount.to_string(),
            });
        }
        let (digits, _) = scaled.as_bigint_and_exponent();
        self.pad_left(digits.to_string())
    }

    fn format_date(&self, date: Option<NaiveDate>, format: DateFormat) -> EncodeResult<String> {
        let Some(d) = date else {
            return Ok("0".repeat(self.width));
        };
        match format {
            DateFormat::Ddmmyyyy => {
                if !(0..=9999).contains(&d.year()) {
                    return Err(self.invalid(format!("year {} has no four-digit form", d.year())));
                }
                Ok(format!("{:02}{:02}{:04}", d.day(), d.month(), d.year()))
            }
            DateFormat::Ddmmyy => {
                if !(1970..=2069).contains(&d.year()) {
                    return Err(self.invalid(format!("year {} has no two-digit form", d.year())));
                }
                Ok(format!("{:02}{:02}{:02}", d.day(), d.month(), d.year() % 100))
            }
        }
    }

    fn overflow(&self, value: &str) -> EncodeError {
        EncodeError::FieldOverflow {
            field: self.name.clone(),
            width: self.width,
            value: value.to_string(),
        }
    }

    fn invalid(&self, reason: String) -> EncodeError {
        EncodeError::InvalidValue {
            field: self.name.clone(),
            reason,
        }
    }
}

fn require_digits(raw: &str) -> Result<(), String> {
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(format!("'{}' must contain only digits", raw))
    }
}

fn is_blank_or_zero(raw: &str) -> bool {
    raw.bytes().all(|b| b == b'0') || raw.bytes().all(|b| b == b' ')
}

fn parse_amount(raw: &str, decimals: u32) -> Result<BigDecimal, String> {
    require_digits(raw)?;
    let decimals = decimals as usize;
    let text = if decimals == 0 {
        raw.to_string()
    } else {
        let split = raw.len() - decimals;
        format!("{}.{}", &raw[..split], &raw[split..])
    };
    BigDecimal::from_str(&text).map_err(|e| format!("'{}' is not a valid amount: {}", raw, e))
}

fn parse_date(raw: &str, format: DateFormat) -> Result<Option<NaiveDate>, String> {
    if is_blank_or_zero(raw) {
        return Ok(None);
    }
    require_digits(raw)?;
    let number = |range: std::ops::Range<usize>| raw[range].parse::<u32>().unwrap_or(0);
    let day = number(0..2);
    let month = number(2..4);
    let year = match format {
        DateFormat::Ddmmyyyy => number(4..8) as i32,
        DateFormat::Ddmmyy => {
            let yy = number(4..6) as i32;
            if yy >= 70 {
                1900 + yy
            } else {
                2000 + yy
            }
        }
    };
    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or_else(|| format!("'{}' is not a valid date", raw))
}

fn parse_time(raw: &str) -> Result<Option<NaiveTime>, String> {
    if is_blank_or_zero(raw) {
        return Ok(None);
    }
    require_digits(raw)?;
    let number = |range: std::ops::Range<usize>| raw[range].parse::<u32>().unwrap_or(0);
    NaiveTime::from_hms_opt(number(0..2), number(2..4), number(4..6))
        .map(Some)
        .ok_or_else(|| format!("'{}' is not a valid time", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: FieldKind, width: usize) -> FieldSpec {
        FieldSpec {
            name: "test".to_string(),
            start: 1,
            width,
            kind,
        }
    }

    #[test]
    fn test_amount_uses_implied_decimals() {
        let field = spec(FieldKind::Amount { decimals: 2 }, 15);
        let value = FieldValue::Amount(BigDecimal::from_str("250.50").unwrap());
        let raw = field.format(&value).unwrap();
        assert_eq!(raw, "000000000025050");
        assert_eq!(field.parse(&raw).unwrap(), value);
    }

    #[test]
    fn test_amount_rejects_negative_and_extra_precision() {
        let field = spec(FieldKind::Amount { decimals: 2 }, 13);
        assert!(matches!(
            field.format(&FieldValue::Amount(BigDecimal::from(-1))),
            Err(EncodeError::NegativeAmount { .. })
        ));
        assert!(matches!(
            field.format(&FieldValue::Amount(BigDecimal::from_str("1.005").unwrap())),
            Err(EncodeError::PrecisionLoss { .. })
        ));
    }

    #[test]
    fn test_alpha_pads_and_overflows() {
        let field = spec(FieldKind::Alpha, 5);
        assert_eq!(field.format(&FieldValue::from("AB")).unwrap(), "AB   ");
        assert_eq!(field.parse("AB   ").unwrap(), FieldValue::from("AB"));
        assert!(matches!(
            field.format(&FieldValue::from("ABCDEF")),
            Err(EncodeError::FieldOverflow { width: 5, .. })
        ));
    }

    #[test]
    fn test_digits_keep_leading_zeros() {
        let field = spec(FieldKind::Digits, 8);
        assert_eq!(field.format(&FieldValue::from("1234")).unwrap(), "00001234");
        assert_eq!(field.parse("00001234").unwrap(), FieldValue::from("00001234"));
        assert!(field.parse("0000A234").is_err());
    }

    #[test]
    fn test_short_dates_pivot_on_seventy() {
        let field = spec(FieldKind::Date(DateFormat::Ddmmyy), 6);
        assert_eq!(
            field.parse("150124").unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15))
        );
        assert_eq!(
            field.parse("311299").unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(1999, 12, 31))
        );
        assert_eq!(field.parse("000000").unwrap(), FieldValue::Date(None));
        assert!(field.parse("310224").is_err());
    }

    #[test]
    fn test_long_dates_and_times() {
        let date = spec(FieldKind::Date(DateFormat::Ddmmyyyy), 8);
        let value = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(date.format(&value).unwrap(), "09032024");

        let time = spec(FieldKind::Time, 6);
        assert_eq!(
            time.parse("143005").unwrap(),
            FieldValue::Time(NaiveTime::from_hms_opt(14, 30, 5))
        );
        assert!(time.parse("250000").is_err());
    }

    #[test]
    fn test_long_dates_reject_five_digit_years() {
        let date = spec(FieldKind::Date(DateFormat::Ddmmyyyy), 8);
        let far = FieldValue::Date(NaiveDate::from_ymd_opt(12024, 7, 1));
        assert!(matches!(
            date.format(&far),
            Err(EncodeError::InvalidValue { ref field, .. }) if field == "test"
        ));

        let short = spec(FieldKind::Date(DateFormat::Ddmmyy), 6);
        assert!(short.format(&far).is_err());
    }
}
