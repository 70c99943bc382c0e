//! Fixed-point arithmetic.
//!
//! Rates and the index are `u128` values scaled by [`SCALE`] (10^27).
//! Every helper multiplies before dividing and truncates toward zero.
//! Overflow anywhere is reported as [`LedgerError::Overflow`].

use crate::{LedgerError, Result};

/// Fixed-point scale factor (10^27).
pub const SCALE: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Checked `a * b`.
pub fn mul(a: u128, b: u128) -> Result<u128> {
    a.checked_mul(b).ok_or(LedgerError::Overflow)
}

/// Checked `a * b / denominator`, truncating.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128> {
    mul(a, b)?
        .checked_div(denominator)
        .ok_or(LedgerError::Overflow)
}

/// Per-second, per-stake-unit rate for a vault:
/// `bid_amount * SCALE / (stake * period)`.
pub fn vault_rate(bid_amount: u64, stake: u64, period: u64) -> Result<u128> {
    let denominator = mul(u128::from(stake), u128::from(period))?;
    mul_div(u128::from(bid_amount), SCALE, denominator)
}

/// Convert a scaled per-stake quantity into base units: `stake * scaled / SCALE`.
pub fn scaled_amount(stake: u64, scaled: u128) -> Result<u64> {
    let amount = mul_div(u128::from(stake), scaled, SCALE)?;
    u64::try_from(amount).map_err(|_| LedgerError::Overflow)
}
