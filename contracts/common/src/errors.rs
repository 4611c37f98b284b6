//! Error Types for the Wrapper
//!
//! One typed error for the ledger, the synchronizer and the monitor.
//! Variants carry enough context to explain a failure without a debugger.

/// Result type alias for wrapper operations
pub type WrapperResult<T> = Result<T, WrapperError>;

/// Main error enum for all wrapper and monitor errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapperError {
    // ============ Authorization Errors ============
    /// Caller is neither the owner nor an approved operator
    Unauthorized { owner: [u8; 32], caller: [u8; 32] },

    // ============ Amount Errors ============
    /// Zero amount not allowed
    ZeroAmount,

    /// Withdraw or transfer exceeds the account's attributable balance
    InsufficientPrincipal { available: u64, requested: u64 },

    /// Payer does not hold enough underlying in the pool
    InsufficientBalance { available: u64, requested: u64 },

    /// Wrapper holds fewer reward tokens than it owes
    InsufficientRewardReserve { available: u64, requested: u64 },

    // ============ Oracle Errors ============
    /// Oracle reading is older than the timeout or its round is invalid
    StalePrice {
        updated_at: u64,
        now: u64,
        timeout: u64,
    },

    /// Oracle reading is zero or negative
    InvalidPrice { value: i128 },

    /// Oracle call itself failed
    OracleUnavailable,

    // ============ External Protocol Errors ============
    /// A call into the pooled lending protocol failed
    ExternalProtocolFailure { call: &'static str },

    /// The pooled protocol reported an unusable index
    IndexUnavailable { index: &'static str },

    // ============ Configuration Errors ============
    /// Missing or out-of-range configuration value
    ConfigurationError {
        param: &'static str,
        reason: &'static str,
    },

    /// Invalid call argument
    InvalidInput {
        param: &'static str,
        reason: &'static str,
    },

    // ============ Math Errors ============
    /// Arithmetic overflow
    Overflow,

    /// Arithmetic underflow
    Underflow,

    /// Division by zero
    DivisionByZero,
}

impl WrapperError {
    /// Get error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "E001_UNAUTHORIZED",
            Self::ZeroAmount => "E010_ZERO_AMOUNT",
            Self::InsufficientPrincipal { .. } => "E011_INSUFFICIENT_PRINCIPAL",
            Self::InsufficientBalance { .. } => "E012_INSUFFICIENT_BALANCE",
            Self::InsufficientRewardReserve { .. } => "E013_INSUFFICIENT_REWARD_RESERVE",
            Self::StalePrice { .. } => "E020_STALE_PRICE",
            Self::InvalidPrice { .. } => "E021_INVALID_PRICE",
            Self::OracleUnavailable => "E022_ORACLE_UNAVAILABLE",
            Self::ExternalProtocolFailure { .. } => "E030_EXTERNAL_PROTOCOL_FAILURE",
            Self::IndexUnavailable { .. } => "E031_INDEX_UNAVAILABLE",
            Self::ConfigurationError { .. } => "E040_CONFIGURATION",
            Self::InvalidInput { .. } => "E041_INVALID_INPUT",
            Self::Overflow => "E050_OVERFLOW",
            Self::Underflow => "E051_UNDERFLOW",
            Self::DivisionByZero => "E052_DIVISION_BY_ZERO",
        }
    }

    /// Check if the caller can fix this error by retrying or changing inputs
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InsufficientPrincipal { .. } => true, // Withdraw less
            Self::InsufficientBalance { .. } => true,   // Deposit less
            Self::StalePrice { .. } => true,            // Wait for a fresh round
            Self::OracleUnavailable => true,            // Retry later
            Self::ExternalProtocolFailure { .. } => true,
            _ => false,
        }
    }

    /// Price failures that a status refresh absorbs instead of raising
    pub fn is_soft_price_failure(&self) -> bool {
        matches!(self, Self::StalePrice { .. } | Self::InvalidPrice { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_error_codes_unique() {
        let errors = [
            WrapperError::Unauthorized { owner: [1; 32], caller: [2; 32] },
            WrapperError::ZeroAmount,
            WrapperError::InsufficientPrincipal { available: 1, requested: 2 },
            WrapperError::InsufficientBalance { available: 1, requested: 2 },
            WrapperError::InsufficientRewardReserve { available: 1, requested: 2 },
            WrapperError::StalePrice { updated_at: 0, now: 1, timeout: 1 },
            WrapperError::InvalidPrice { value: 0 },
            WrapperError::OracleUnavailable,
            WrapperError::ExternalProtocolFailure { call: "balance_of" },
            WrapperError::IndexUnavailable { index: "supply" },
            WrapperError::ConfigurationError { param: "x", reason: "y" },
            WrapperError::InvalidInput { param: "x", reason: "y" },
            WrapperError::Overflow,
            WrapperError::Underflow,
            WrapperError::DivisionByZero,
        ];

        let codes: BTreeSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_soft_price_failures() {
        assert!(WrapperError::StalePrice { updated_at: 0, now: 10, timeout: 5 }.is_soft_price_failure());
        assert!(WrapperError::InvalidPrice { value: -1 }.is_soft_price_failure());
        assert!(!WrapperError::OracleUnavailable.is_soft_price_failure());
        assert!(!WrapperError::ExternalProtocolFailure { call: "reserves" }.is_soft_price_failure());
    }

    #[test]
    fn test_recoverable() {
        assert!(WrapperError::InsufficientPrincipal { available: 1, requested: 2 }.is_recoverable());
        assert!(!WrapperError::Overflow.is_recoverable());
        assert!(!WrapperError::Unauthorized { owner: [1; 32], caller: [2; 32] }.is_recoverable());
    }
}
