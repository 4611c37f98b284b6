//! In-memory Test Doubles
//!
//! Deterministic stand-ins for the lending pool, the price feed and a
//! backing source. Enabled for this crate's tests and, through the
//! `testing` feature, for the other workspace members.

use crate::constants::precision::BASE_INDEX_SCALE;
use crate::errors::{WrapperError, WrapperResult};
use crate::interfaces::{BackingSource, PooledProtocol, PriceFeed};
use crate::math::{present_value, principal_value, tracking_accrual};
use crate::types::{Address, PriceReading};
use crate::BTreeMap;

/// Calls that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCall {
    TriggerAccrual,
    SupplyIndex,
    TrackingIndex,
    BalanceOf,
    TransferIn,
    TransferOut,
    ClaimRewards,
    TransferReward,
    Reserves,
}

impl MockCall {
    fn name(self) -> &'static str {
        match self {
            Self::TriggerAccrual => "trigger_accrual",
            Self::SupplyIndex => "current_supply_index",
            Self::TrackingIndex => "current_tracking_index",
            Self::BalanceOf => "balance_of",
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
            Self::ClaimRewards => "claim_rewards",
            Self::TransferReward => "transfer_reward",
            Self::Reserves => "reserves",
        }
    }
}

// ============ Lending Pool ============

/// Lending pool with lazily applied indices and principal accounting
#[derive(Debug, Clone)]
pub struct MockLendingPool {
    pool_account: Address,
    supply_index: u64,
    tracking_index: u64,
    pending_supply_index: u64,
    pending_tracking_index: u64,
    principals: BTreeMap<Address, i64>,
    pool_tracking_snapshot: u64,
    pool_reward_accrued: u64,
    accrual_descale: u64,
    reward_rescale: u64,
    reward_payout_cap: Option<u64>,
    wrapper_reward_balance: u64,
    reward_balances: BTreeMap<Address, u64>,
    reserves: i128,
    fail_on: Option<MockCall>,
    /// Number of successful `trigger_accrual` calls
    pub accrual_calls: u32,
}

impl MockLendingPool {
    /// Pool at index 1.0 with no rewards and healthy reserves
    pub fn new(pool_account: Address) -> Self {
        Self {
            pool_account,
            supply_index: BASE_INDEX_SCALE,
            tracking_index: 0,
            pending_supply_index: BASE_INDEX_SCALE,
            pending_tracking_index: 0,
            principals: BTreeMap::new(),
            pool_tracking_snapshot: 0,
            pool_reward_accrued: 0,
            accrual_descale: 1,
            reward_rescale: 1,
            reward_payout_cap: None,
            wrapper_reward_balance: 0,
            reward_balances: BTreeMap::new(),
            reserves: 1_000_000_000_000,
            fail_on: None,
            accrual_calls: 0,
        }
    }

    /// Underlying decimals above the 6-decimal accrual scale
    pub fn with_accrual_descale(mut self, accrual_descale: u64) -> Self {
        self.accrual_descale = accrual_descale;
        self
    }

    /// Reward token decimals above the 6-decimal accrual scale
    pub fn with_reward_rescale(mut self, reward_rescale: u64) -> Self {
        self.reward_rescale = reward_rescale;
        self
    }

    /// Credit `amount` of underlying to `account`
    pub fn mint(&mut self, account: Address, amount: u64) {
        let balance = self.present(&account);
        let principal = principal_value(balance.saturating_add(amount), self.supply_index).unwrap_or(0);
        self.principals.insert(account, principal);
    }

    /// Indices that become visible on the next `trigger_accrual`
    pub fn set_pending_indices(&mut self, supply_index: u64, tracking_index: u64) {
        self.pending_supply_index = supply_index;
        self.pending_tracking_index = tracking_index;
    }

    pub fn set_reserves(&mut self, reserves: i128) {
        self.reserves = reserves;
    }

    /// Limit how many reward tokens one `claim_rewards` pays out
    pub fn set_reward_payout_cap(&mut self, cap: Option<u64>) {
        self.reward_payout_cap = cap;
    }

    /// Make one call fail until cleared
    pub fn fail_on(&mut self, call: Option<MockCall>) {
        self.fail_on = call;
    }

    pub fn principal_of(&self, account: &Address) -> i64 {
        self.principals.get(account).copied().unwrap_or(0)
    }

    pub fn reward_balance_of(&self, account: &Address) -> u64 {
        self.reward_balances.get(account).copied().unwrap_or(0)
    }

    pub fn wrapper_reward_balance(&self) -> u64 {
        self.wrapper_reward_balance
    }

    /// Balance at the currently visible index
    pub fn present(&self, account: &Address) -> u64 {
        present_value(self.principal_of(account), self.supply_index).unwrap_or(0)
    }

    fn guard(&self, call: MockCall) -> WrapperResult<()> {
        if self.fail_on == Some(call) {
            return Err(WrapperError::ExternalProtocolFailure { call: call.name() });
        }
        Ok(())
    }

    fn settle_pool_rewards(&mut self) -> WrapperResult<()> {
        let accrued = tracking_accrual(
            self.principal_of(&self.pool_account),
            self.pool_tracking_snapshot,
            self.tracking_index,
            self.accrual_descale,
            self.reward_rescale,
        )?;
        self.pool_reward_accrued = self
            .pool_reward_accrued
            .checked_add(accrued)
            .ok_or(WrapperError::Overflow)?;
        self.pool_tracking_snapshot = self.tracking_index;
        Ok(())
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: u64) -> WrapperResult<()> {
        let from_balance = self.present(&from);
        if amount > from_balance {
            return Err(WrapperError::InsufficientBalance {
                available: from_balance,
                requested: amount,
            });
        }
        let to_balance = self.present(&to);

        let from_principal = principal_value(from_balance - amount, self.supply_index)?;
        let to_principal = principal_value(
            to_balance.checked_add(amount).ok_or(WrapperError::Overflow)?,
            self.supply_index,
        )?;
        self.principals.insert(from, from_principal);
        self.principals.insert(to, to_principal);
        Ok(())
    }
}

impl PooledProtocol for MockLendingPool {
    fn trigger_accrual(&mut self, _account: &Address) -> WrapperResult<()> {
        self.guard(MockCall::TriggerAccrual)?;
        self.supply_index = self.pending_supply_index.max(self.supply_index);
        self.tracking_index = self.pending_tracking_index.max(self.tracking_index);
        self.settle_pool_rewards()?;
        self.accrual_calls += 1;
        Ok(())
    }

    fn current_supply_index(&self) -> WrapperResult<u64> {
        self.guard(MockCall::SupplyIndex)?;
        Ok(self.supply_index)
    }

    fn current_tracking_index(&self, _account: &Address) -> WrapperResult<u64> {
        self.guard(MockCall::TrackingIndex)?;
        Ok(self.tracking_index)
    }

    fn balance_of(&self, account: &Address) -> WrapperResult<u64> {
        self.guard(MockCall::BalanceOf)?;
        present_value(self.principal_of(account), self.supply_index)
    }

    fn transfer_in(&mut self, payer: &Address, amount: u64) -> WrapperResult<()> {
        self.guard(MockCall::TransferIn)?;
        self.settle_pool_rewards()?;
        self.move_balance(*payer, self.pool_account, amount)
    }

    fn transfer_out(&mut self, recipient: &Address, amount: u64) -> WrapperResult<()> {
        self.guard(MockCall::TransferOut)?;
        self.settle_pool_rewards()?;
        self.move_balance(self.pool_account, *recipient, amount)
    }

    fn claim_rewards(&mut self, _account: &Address) -> WrapperResult<u64> {
        self.guard(MockCall::ClaimRewards)?;
        self.settle_pool_rewards()?;
        let paid = match self.reward_payout_cap {
            Some(cap) => self.pool_reward_accrued.min(cap),
            None => self.pool_reward_accrued,
        };
        self.pool_reward_accrued -= paid;
        self.wrapper_reward_balance += paid;
        Ok(paid)
    }

    fn transfer_reward(&mut self, recipient: &Address, amount: u64) -> WrapperResult<()> {
        self.guard(MockCall::TransferReward)?;
        if amount > self.wrapper_reward_balance {
            return Err(WrapperError::InsufficientRewardReserve {
                available: self.wrapper_reward_balance,
                requested: amount,
            });
        }
        self.wrapper_reward_balance -= amount;
        *self.reward_balances.entry(*recipient).or_insert(0) += amount;
        Ok(())
    }

    fn reserves(&self) -> WrapperResult<i128> {
        self.guard(MockCall::Reserves)?;
        Ok(self.reserves)
    }
}

// ============ Price Feed ============

/// Price feed returning whatever it was last told
#[derive(Debug, Clone)]
pub struct MockPriceFeed {
    pub value: i128,
    pub timestamp: u64,
    pub round_valid: bool,
    pub decimals: u8,
    pub reverts: bool,
}

impl MockPriceFeed {
    pub fn new(value: i128, decimals: u8, timestamp: u64) -> Self {
        Self {
            value,
            timestamp,
            round_valid: true,
            decimals,
            reverts: false,
        }
    }

    /// Publish a new answer
    pub fn set_price(&mut self, value: i128, timestamp: u64) {
        self.value = value;
        self.timestamp = timestamp;
        self.round_valid = true;
    }
}

impl PriceFeed for MockPriceFeed {
    fn latest_reading(&self) -> WrapperResult<PriceReading> {
        if self.reverts {
            return Err(WrapperError::OracleUnavailable);
        }
        Ok(PriceReading {
            value: self.value,
            timestamp: self.timestamp,
            round_valid: self.round_valid,
        })
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }
}

// ============ Backing Source ============

/// Backing source with fixed answers
#[derive(Debug, Clone)]
pub struct MockBacking {
    pub ref_per_tok: u128,
    pub reserves: i128,
    pub fails: bool,
}

impl MockBacking {
    pub fn new(ref_per_tok: u128, reserves: i128) -> Self {
        Self { ref_per_tok, reserves, fails: false }
    }
}

impl BackingSource for MockBacking {
    fn ref_per_tok(&mut self) -> WrapperResult<u128> {
        if self.fails {
            return Err(WrapperError::ExternalProtocolFailure { call: "ref_per_tok" });
        }
        Ok(self.ref_per_tok)
    }

    fn reserves(&mut self) -> WrapperResult<i128> {
        if self.fails {
            return Err(WrapperError::ExternalProtocolFailure { call: "reserves" });
        }
        Ok(self.reserves)
    }
}
