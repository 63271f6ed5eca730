//! Digit-length classification of decoded text.

use super::gs1;
use crate::capture::ValidationConfig;
use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;

/// Retail symbologies the scanner accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BarcodeFormat {
    #[serde(rename = "EAN-13")]
    Ean13,
    #[serde(rename = "EAN-8")]
    Ean8,
    #[serde(rename = "UPC-A")]
    UpcA,
}

impl BarcodeFormat {
    /// Number of digits the symbology encodes.
    pub fn digit_count(self) -> usize {
        match self {
            BarcodeFormat::Ean13 => 13,
            BarcodeFormat::Ean8 => 8,
            BarcodeFormat::UpcA => 12,
        }
    }

    fn from_digit_count(len: usize) -> Option<Self> {
        match len {
            13 => Some(BarcodeFormat::Ean13),
            8 => Some(BarcodeFormat::Ean8),
            12 => Some(BarcodeFormat::UpcA),
            _ => None,
        }
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BarcodeFormat::Ean13 => "EAN-13",
            BarcodeFormat::Ean8 => "EAN-8",
            BarcodeFormat::UpcA => "UPC-A",
        })
    }
}

/// Outcome of validating one raw string.
///
/// When `valid` is true, `format` is set and `code` has exactly
/// `format.digit_count()` digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedCode {
    /// Digits extracted from the raw input.
    pub code: String,
    pub format: Option<BarcodeFormat>,
    pub valid: bool,
    /// Why the code was rejected.
    pub reason: Option<String>,
    /// GS1 mod-10 check. Informational.
    pub check_digit_ok: Option<bool>,
    /// Leading three digits of an EAN-13.
    pub gs1_prefix: Option<u16>,
    pub region: Option<&'static str>,
    /// EAN-13 prefix inside the configured national range.
    pub domestic: bool,
}

impl ValidatedCode {
    fn rejected(code: String) -> Self {
        let reason = format!(
            "expected 8, 12 or 13 digits (EAN-8, UPC-A, EAN-13) but found {} digits",
            code.len()
        );
        Self {
            code,
            format: None,
            valid: false,
            reason: Some(reason),
            check_digit_ok: None,
            gs1_prefix: None,
            region: None,
            domestic: false,
        }
    }
}

/// Stateless classifier for decoded barcode text.
#[derive(Debug, Clone)]
pub struct CodeValidator {
    domestic: RangeInclusive<u16>,
}

impl Default for CodeValidator {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

impl CodeValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            domestic: config.domestic_prefix_start..=config.domestic_prefix_end,
        }
    }

    /// Strips non-digits from `raw` and classifies the rest by length.
    pub fn validate(&self, raw: &str) -> ValidatedCode {
        let code: String = raw.chars().filter(char::is_ascii_digit).collect();

        let Some(format) = BarcodeFormat::from_digit_count(code.len()) else {
            return ValidatedCode::rejected(code);
        };

        let gs1_prefix = match format {
            BarcodeFormat::Ean13 => gs1::prefix(&code),
            _ => None,
        };

        ValidatedCode {
            check_digit_ok: Some(gs1::check_digit_ok(&code)),
            gs1_prefix,
            region: gs1_prefix.and_then(gs1::region),
            domestic: gs1_prefix.map_or(false, |p| self.domestic.contains(&p)),
            code,
            format: Some(format),
            valid: true,
            reason: None,
        }
    }
}
