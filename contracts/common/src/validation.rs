//! Validation Helpers
//!
//! Reusable guards shared by the ledger and the monitor.
//!
//! ```rust,ignore
//! use yieldwrap_common::validation::{check, require_nonzero};
//!
//! check!(amount > 0, WrapperError::ZeroAmount);
//! require_valid_address(config.underlying, "underlying")?;
//! ```

use crate::{
    constants::precision::{BASE_ACCRUAL_DECIMALS, MAX_TOKEN_DECIMALS},
    errors::{WrapperError, WrapperResult},
    types::{Address, ZERO_ADDRESS},
};

// ============ Validation Macro ============

/// Check a condition and return an error if it fails.
///
/// ```rust,ignore
/// check!(
///     requested <= available,
///     WrapperError::InsufficientPrincipal { available, requested }
/// );
/// ```
#[macro_export]
macro_rules! check {
    ($condition:expr, $error:expr) => {
        if !($condition) {
            return Err($error);
        }
    };
}

pub use check;

// ============ Amount Validation ============

/// Require a non-zero amount
pub fn require_nonzero(amount: u64) -> WrapperResult<()> {
    check!(amount > 0, WrapperError::ZeroAmount);
    Ok(())
}

/// Require `requested` not to exceed the account's attributable balance
pub fn require_sufficient_principal(available: u64, requested: u64) -> WrapperResult<()> {
    check!(
        requested <= available,
        WrapperError::InsufficientPrincipal { available, requested }
    );
    Ok(())
}

/// Require the payer's external balance to cover `requested`
pub fn require_sufficient_balance(available: u64, requested: u64) -> WrapperResult<()> {
    check!(
        requested <= available,
        WrapperError::InsufficientBalance { available, requested }
    );
    Ok(())
}

// ============ Authorization ============

/// Require the caller to be the owner or an approved operator
pub fn require_owner_or_operator(owner: Address, caller: Address, approved: bool) -> WrapperResult<()> {
    check!(owner == caller || approved, WrapperError::Unauthorized { owner, caller });
    Ok(())
}

// ============ Configuration ============

/// Require a non-zero address for a configured role
pub fn require_valid_address(address: Address, param: &'static str) -> WrapperResult<()> {
    check!(
        address != ZERO_ADDRESS,
        WrapperError::ConfigurationError { param, reason: "zero address" }
    );
    Ok(())
}

/// Require a non-zero configured value
pub fn require_configured(value: u128, param: &'static str) -> WrapperResult<()> {
    check!(value > 0, WrapperError::ConfigurationError { param, reason: "must be non-zero" });
    Ok(())
}

/// Require token decimals the accrual scale can express
pub fn require_token_decimals(decimals: u8, param: &'static str) -> WrapperResult<()> {
    check!(decimals > 0, WrapperError::ConfigurationError { param, reason: "zero decimals" });
    check!(
        (BASE_ACCRUAL_DECIMALS..=MAX_TOKEN_DECIMALS).contains(&decimals),
        WrapperError::ConfigurationError { param, reason: "decimals out of range" }
    );
    Ok(())
}
