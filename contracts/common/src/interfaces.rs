//! External Collaborators
//!
//! The wrapper never owns the lending pool, the oracle or the backing
//! value it reports on. These traits are the only way it reaches them,
//! so hosts bind real protocols and tests bind in-memory doubles.

use crate::errors::WrapperResult;
use crate::types::{Address, PriceReading};

/// Pooled, interest-accruing lending protocol holding the wrapper's position
///
/// Indices are lazy: they only advance when `trigger_accrual` runs.
pub trait PooledProtocol {
    /// Bring global indices current for `account`
    fn trigger_accrual(&mut self, account: &Address) -> WrapperResult<()>;

    /// Supply index, scaled by `BASE_INDEX_SCALE`
    fn current_supply_index(&self) -> WrapperResult<u64>;

    /// Reward tracking index for `account`, scaled by `TRACKING_INDEX_SCALE`
    fn current_tracking_index(&self, account: &Address) -> WrapperResult<u64>;

    /// Present value held by `account`, in underlying units
    fn balance_of(&self, account: &Address) -> WrapperResult<u64>;

    /// Pull `amount` of `payer`'s balance into the pooled position
    fn transfer_in(&mut self, payer: &Address, amount: u64) -> WrapperResult<()>;

    /// Push `amount` from the pooled position to `recipient`
    fn transfer_out(&mut self, recipient: &Address, amount: u64) -> WrapperResult<()>;

    /// Pay the pooled account's accrued rewards to the wrapper, returning the amount
    fn claim_rewards(&mut self, account: &Address) -> WrapperResult<u64>;

    /// Forward reward tokens held by the wrapper
    fn transfer_reward(&mut self, recipient: &Address, amount: u64) -> WrapperResult<()>;

    /// Protocol reserves in underlying units (may be negative)
    fn reserves(&self) -> WrapperResult<i128>;
}

/// External price oracle
pub trait PriceFeed {
    /// Latest answer. An `Err` means the call itself failed.
    fn latest_reading(&self) -> WrapperResult<PriceReading>;

    /// Decimals of `PriceReading::value`
    fn decimals(&self) -> u8;
}

/// Source of backing value for a monitored position
pub trait BackingSource {
    /// Reference units per wrapped token, 18 decimals
    fn ref_per_tok(&mut self) -> WrapperResult<u128>;

    /// Reserves of the protocol backing the position
    fn reserves(&mut self) -> WrapperResult<i128>;
}
