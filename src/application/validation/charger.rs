//! Charger identity validation
//!
//! Decides whether a charging station announced in a BootNotification is
//! allowed to register, based on the configured charger allow-list.

use regex::Regex;
use thiserror::Error;

use crate::config::ChargerAllowEntry;

/// Raised at startup when an allow-list entry cannot be compiled.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("Invalid serial number pattern {pattern:?} for {vendor_name}/{model}: {source}")]
    InvalidSerialPattern {
        vendor_name: String,
        model: String,
        pattern: String,
        source: regex::Error,
    },
}

struct ChargerPattern {
    vendor_name: String,
    model: String,
    serial_number: Regex,
}

/// Matches (vendor, model, serial) triples against the charger allow-list.
///
/// Serial number patterns are compiled when the validator is built, so
/// `validate` itself is total: it cannot fail, it only answers yes or no.
pub struct ChargerIdentityValidator {
    entries: Vec<ChargerPattern>,
}

impl ChargerIdentityValidator {
    /// Build the validator, compiling every serial number pattern.
    ///
    /// Patterns are matched anchored at the start of the serial number, so
    /// `E2507-` accepts `E2507-8420-1274` but not `X-E2507-8420`.
    pub fn from_entries(entries: &[ChargerAllowEntry]) -> Result<Self, ValidatorError> {
        let entries = entries
            .iter()
            .map(|entry| {
                let anchored = format!("^(?:{})", entry.serial_number_regex);
                let serial_number =
                    Regex::new(&anchored).map_err(|source| ValidatorError::InvalidSerialPattern {
                        vendor_name: entry.vendor_name.clone(),
                        model: entry.model.clone(),
                        pattern: entry.serial_number_regex.clone(),
                        source,
                    })?;
                Ok(ChargerPattern {
                    vendor_name: entry.vendor_name.clone(),
                    model: entry.model.clone(),
                    serial_number,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    /// True iff some allow-list entry matches vendor and model exactly and
    /// its pattern matches the serial number from position 0.
    pub fn validate(&self, vendor_name: &str, model: &str, serial_number: &str) -> bool {
        self.entries.iter().any(|entry| {
            entry.vendor_name == vendor_name
                && entry.model == model
                && entry.serial_number.is_match(serial_number)
        })
    }
}
