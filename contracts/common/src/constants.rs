//! Protocol Constants
//!
//! Fixed-point scales and default configuration values for the wrapper
//! and the collateral monitor. The scales mirror the lending protocol the
//! wrapper sits on, so principal and index arithmetic round exactly the
//! way the pool itself rounds.

/// Underlying token (a 6-decimal dollar stablecoin by default)
pub mod token {
    /// One whole unit of the underlying in raw units
    pub const ONE: u64 = 1_000_000;
}

/// Fixed-point scales
pub mod precision {
    /// 18-decimal fixed point used for prices and exchange rates
    pub const FIX_ONE: u128 = 1_000_000_000_000_000_000; // 1e18

    /// Decimals carried by `FIX_ONE`
    pub const FIX_DECIMALS: u8 = 18;

    /// Scale of the supply index (1.0 == 1e15)
    pub const BASE_INDEX_SCALE: u64 = 1_000_000_000_000_000;

    /// Scale of the reward tracking index
    pub const TRACKING_INDEX_SCALE: u64 = 1_000_000_000_000_000;

    /// Reward accrual is tracked at 6 decimals regardless of token decimals
    pub const BASE_ACCRUAL_DECIMALS: u8 = 6;

    /// Largest token decimals accepted in configuration
    pub const MAX_TOKEN_DECIMALS: u8 = 18;
}

/// Shadow ledger parameters
pub mod ledger {
    /// Amount sentinel meaning "as much as possible"
    ///
    /// Deposits clamp to the payer's external balance, withdrawals to the
    /// owner's attributable underlying, transfers to the sender's shares.
    pub const MAX_AMOUNT: u64 = u64::MAX;
}

/// Collateral monitor defaults
pub mod monitor {
    use super::precision::FIX_ONE;

    /// Maximum age of an oracle reading (24 hours)
    pub const ORACLE_TIMEOUT: u64 = 86_400;

    /// Peg deviation tolerated before the position turns IFFY (5%)
    pub const DEFAULT_THRESHOLD: u128 = 50_000_000_000_000_000; // 5e16

    /// Grace period between IFFY and DISABLED (24 hours)
    pub const DELAY_UNTIL_DEFAULT: u64 = 86_400;

    /// Longest accepted oracle timeout (1 week)
    pub const MAX_ORACLE_TIMEOUT: u64 = 604_800;

    /// Longest accepted grace period (2 weeks)
    pub const MAX_DELAY_UNTIL_DEFAULT: u64 = 1_209_600;

    /// Sentinel for "no default pending"
    pub const NEVER: u64 = u64::MAX;

    /// Price reported when the oracle is unusable and fallback is allowed
    pub const FALLBACK_PRICE: u128 = FIX_ONE;

    /// Maximum trade volume in units of account
    pub const MAX_TRADE_VOLUME: u128 = 1_000_000 * FIX_ONE;

    /// Reserves below this mark the position IFFY
    pub const RESERVES_THRESHOLD_IFFY: i128 = 10;

    /// Reserves below this (or negative) mark the position DISABLED
    pub const RESERVES_THRESHOLD_DISABLED: i128 = 1;

    /// Expected reference-unit price per target unit (1.0)
    pub const PRICE_PER_TARGET: u128 = FIX_ONE;

    /// Target units per reference unit (1.0)
    pub const TARGET_PER_REF: u128 = FIX_ONE;

    /// Target name `"USD"`, zero padded to 32 bytes
    pub const TARGET_USD: [u8; 32] = {
        let mut name = [0u8; 32];
        name[0] = b'U';
        name[1] = b'S';
        name[2] = b'D';
        name
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scales_agree() {
        assert_eq!(precision::BASE_INDEX_SCALE, precision::TRACKING_INDEX_SCALE);
        assert_eq!(10u128.pow(precision::FIX_DECIMALS as u32), precision::FIX_ONE);
        assert!(precision::BASE_ACCRUAL_DECIMALS <= precision::MAX_TOKEN_DECIMALS);
    }

    #[test]
    fn test_monitor_defaults() {
        assert!(monitor::DEFAULT_THRESHOLD < precision::FIX_ONE);
        assert!(monitor::RESERVES_THRESHOLD_DISABLED <= monitor::RESERVES_THRESHOLD_IFFY);
        assert!(monitor::ORACLE_TIMEOUT <= monitor::MAX_ORACLE_TIMEOUT);
        assert!(monitor::DELAY_UNTIL_DEFAULT <= monitor::MAX_DELAY_UNTIL_DEFAULT);
        assert_eq!(&monitor::TARGET_USD[..3], b"USD");
        assert!(monitor::TARGET_USD[3..].iter().all(|b| *b == 0));
    }
}
