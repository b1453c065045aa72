//! Fixed-point amounts.
//!
//! Every quantity in StrikeVault is a raw integer count of base units of
//! its asset; the asset's decimal exponent says how many base units make
//! one whole unit. Arithmetic is checked and never touches floating point.
//! [`Decimal`] appears only at the human boundary: rendering an amount for
//! logs and parsing amounts written in configuration files.

use rust_decimal::Decimal;

use crate::{Result, StrikevaultError, constants};

/// Raw base units of an asset or of the option ledger.
pub type Amount = u128;

/// `10^decimals`, or `ArithmeticOverflow` when it does not fit in a `u128`.
pub fn pow10(decimals: u8) -> Result<Amount> {
    if decimals > constants::MAX_ASSET_DECIMALS {
        return Err(StrikevaultError::ArithmeticOverflow { context: "pow10" });
    }
    Ok(10u128.pow(u32::from(decimals)))
}

/// Checked `a × b`, tagging an overflow with `context`.
pub fn mul(a: Amount, b: Amount, context: &'static str) -> Result<Amount> {
    a.checked_mul(b)
        .ok_or(StrikevaultError::ArithmeticOverflow { context })
}

/// Checked `a + b`, tagging an overflow with `context`.
pub fn add(a: Amount, b: Amount, context: &'static str) -> Result<Amount> {
    a.checked_add(b)
        .ok_or(StrikevaultError::ArithmeticOverflow { context })
}

/// Render a raw amount as a human number, e.g. `1_000_001` at 6 decimals
/// becomes `1.000001`. Returns `None` if the value exceeds what a
/// [`Decimal`] can represent.
#[must_use]
pub fn to_decimal(raw: Amount, decimals: u8) -> Option<Decimal> {
    let mantissa = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(mantissa, u32::from(decimals)).ok()
}

/// Parse a human number into raw base units.
///
/// `parse_units("1.000001", 6) == 1_000_001`. Negative values and values
/// with more fractional digits than `decimals` are rejected rather than
/// rounded.
pub fn parse_units(text: &str, decimals: u8) -> Result<Amount> {
    let value = Decimal::from_str_exact(text.trim())
        .map_err(|e| StrikevaultError::Configuration(format!("amount {text:?}: {e}")))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(StrikevaultError::Configuration(format!(
            "amount {text:?} is negative"
        )));
    }
    let value = value.normalize();
    let scale = value.scale();
    if scale > u32::from(decimals) {
        return Err(StrikevaultError::Configuration(format!(
            "amount {text:?} has {scale} fractional digits, asset supports {decimals}"
        )));
    }
    let mantissa: Amount = value.mantissa().unsigned_abs();
    // scale <= decimals <= u8::MAX, so the difference fits in a u8.
    let shift = u8::try_from(u32::from(decimals) - scale)
        .map_err(|_| StrikevaultError::ArithmeticOverflow { context: "parse_units" })?;
    mul(mantissa, pow10(shift)?, "parse_units")
}

/// Serde adapter that writes amounts as decimal strings, so they survive
/// JSON consumers limited to 53-bit integers.
pub mod serde_str {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Amount;

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.trim().parse::<Amount>().map_err(serde::de::Error::custom)
    }
}
