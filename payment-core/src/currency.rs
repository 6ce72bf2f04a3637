//! ISO 4217 currency table and minor-unit conversion
//!
//! Amounts cross the adapter boundary in major units as [`Decimal`]; each
//! adapter converts to its provider's minor-unit convention through this
//! module. The table is curated, not exhaustive: a code outside it is
//! rejected at validation time, before any PSP contact.

use crate::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Supported currencies with their minor-unit exponent.
///
/// Most ISO currencies carry 2 decimal places; JPY/KRW/VND carry none and
/// the Gulf dinars carry 3.
const CURRENCIES: &[(&str, u32)] = &[
    ("USD", 2),
    ("EUR", 2),
    ("GBP", 2),
    ("AED", 2),
    ("AUD", 2),
    ("BRL", 2),
    ("CAD", 2),
    ("CHF", 2),
    ("CNY", 2),
    ("DKK", 2),
    ("HKD", 2),
    ("INR", 2),
    ("MXN", 2),
    ("NOK", 2),
    ("NZD", 2),
    ("PLN", 2),
    ("SAR", 2),
    ("SEK", 2),
    ("SGD", 2),
    ("ZAR", 2),
    ("JPY", 0),
    ("KRW", 0),
    ("VND", 0),
    ("BHD", 3),
    ("JOD", 3),
    ("KWD", 3),
    ("OMR", 3),
    ("TND", 3),
];

/// Whether `code` is in the supported table (case-sensitive, upper-case)
pub fn is_recognized(code: &str) -> bool {
    CURRENCIES.iter().any(|(c, _)| *c == code)
}

/// Minor-unit exponent for `code`, if supported
pub fn minor_unit_exponent(code: &str) -> Option<u32> {
    CURRENCIES.iter().find(|(c, _)| *c == code).map(|(_, e)| *e)
}

/// Convert a major-unit amount to provider minor units.
///
/// Rejects unknown currencies, amounts with sub-minor-unit precision
/// (e.g. 1.005 USD) and amounts that overflow `i64`.
pub fn to_minor_units(amount: Decimal, code: &str) -> Result<i64> {
    let exponent = minor_unit_exponent(code)
        .ok_or_else(|| Error::UnknownCurrency(code.to_string()))?;

    let scaled = amount
        .checked_mul(Decimal::from(10i64.pow(exponent)))
        .ok_or_else(|| Error::MinorUnitConversion {
            amount: amount.to_string(),
            currency: code.to_string(),
        })?;

    if scaled.fract() != Decimal::ZERO {
        return Err(Error::MinorUnitConversion {
            amount: amount.to_string(),
            currency: code.to_string(),
        });
    }

    scaled.to_i64().ok_or_else(|| Error::MinorUnitConversion {
        amount: amount.to_string(),
        currency: code.to_string(),
    })
}

/// Convert provider minor units back to a major-unit amount
pub fn from_minor_units(minor: i64, code: &str) -> Result<Decimal> {
    let exponent = minor_unit_exponent(code)
        .ok_or_else(|| Error::UnknownCurrency(code.to_string()))?;
    Ok(Decimal::new(minor, exponent))
}
