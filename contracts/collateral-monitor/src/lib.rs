//! Collateral Status Monitor
//!
//! Grades the wrapped position as collateral: SOUND, IFFY or DISABLED.
//!
//! ## State Machine
//!
//! ```text
//!   SOUND ──(off peg / price unusable / low reserves)──▶ IFFY
//!   IFFY  ──(condition clears before when_default)─────▶ SOUND
//!   IFFY  ──(refresh at or after when_default)─────────▶ DISABLED
//!   any   ──(value per share drops / reserves gone)────▶ DISABLED
//! ```
//!
//! DISABLED is terminal. Nothing drives `refresh`; callers invoke it
//! whenever they need a current status.
//!
//! A stale or non-positive oracle answer only degrades the status during
//! `refresh`, while `strict_price` raises it. A feed or backing call that
//! fails outright aborts `refresh` with the status untouched.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

pub mod oracle;

#[cfg(test)]
mod integration_tests;

use yieldwrap_common::{
    check,
    constants::{monitor, precision::FIX_ONE},
    errors::{WrapperError, WrapperResult},
    events::{EventLog, WrapperEvent},
    interfaces::{BackingSource, PriceFeed},
    math::{fix_mul, within_peg},
    types::{Address, CollateralStatus, StatusState},
    validation::{require_configured, require_valid_address},
    Vec,
};

// ============ Collateral Config ============

/// Configuration for one monitored position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CollateralConfig {
    /// Unit the position is expected to track, zero padded
    pub target_name: [u8; 32],
    /// Oracle pricing the reference unit
    pub price_feed: Address,
    /// Wrapped token being graded
    pub erc20: Address,
    /// Reward token, zero if none
    pub reward_erc20: Address,
    /// Price reported when fallback is allowed and the oracle is unusable
    pub fallback_price: u128,
    /// Maximum trade volume in units of account
    pub max_trade_volume: u128,
    /// Maximum age of an oracle answer (seconds)
    pub oracle_timeout: u64,
    /// Tolerated peg deviation, 18 decimals
    pub default_threshold: u128,
    /// Grace period from IFFY to DISABLED (seconds)
    pub delay_until_default: u64,
    /// Target units per reference unit, 18 decimals
    pub target_per_ref: u128,
    /// Units of account per target unit, 18 decimals
    pub price_per_target: u128,
    /// Reserves below this are IFFY
    pub reserves_threshold_iffy: i128,
    /// Reserves below this are DISABLED
    pub reserves_threshold_disabled: i128,
}

impl CollateralConfig {
    /// USD-pegged position with the standard thresholds
    pub fn with_defaults(price_feed: Address, erc20: Address, reward_erc20: Address) -> Self {
        Self {
            target_name: monitor::TARGET_USD,
            price_feed,
            erc20,
            reward_erc20,
            fallback_price: monitor::FALLBACK_PRICE,
            max_trade_volume: monitor::MAX_TRADE_VOLUME,
            oracle_timeout: monitor::ORACLE_TIMEOUT,
            default_threshold: monitor::DEFAULT_THRESHOLD,
            delay_until_default: monitor::DELAY_UNTIL_DEFAULT,
            target_per_ref: monitor::TARGET_PER_REF,
            price_per_target: monitor::PRICE_PER_TARGET,
            reserves_threshold_iffy: monitor::RESERVES_THRESHOLD_IFFY,
            reserves_threshold_disabled: monitor::RESERVES_THRESHOLD_DISABLED,
        }
    }

    /// Reject configurations that cannot grade anything
    pub fn validate(&self) -> WrapperResult<()> {
        check!(
            self.target_name != [0u8; 32],
            WrapperError::ConfigurationError { param: "target_name", reason: "missing" }
        );
        require_valid_address(self.price_feed, "price_feed")?;
        require_valid_address(self.erc20, "erc20")?;

        require_configured(self.fallback_price, "fallback_price")?;
        require_configured(self.max_trade_volume, "max_trade_volume")?;
        require_configured(self.oracle_timeout as u128, "oracle_timeout")?;
        require_configured(self.default_threshold, "default_threshold")?;
        require_configured(self.delay_until_default as u128, "delay_until_default")?;
        require_configured(self.target_per_ref, "target_per_ref")?;
        require_configured(self.price_per_target, "price_per_target")?;

        check!(
            self.oracle_timeout <= monitor::MAX_ORACLE_TIMEOUT,
            WrapperError::ConfigurationError { param: "oracle_timeout", reason: "too long" }
        );
        check!(
            self.delay_until_default <= monitor::MAX_DELAY_UNTIL_DEFAULT,
            WrapperError::ConfigurationError { param: "delay_until_default", reason: "too long" }
        );
        check!(
            self.default_threshold < FIX_ONE,
            WrapperError::ConfigurationError { param: "default_threshold", reason: "must be below 1.0" }
        );
        check!(
            self.reserves_threshold_disabled <= self.reserves_threshold_iffy,
            WrapperError::ConfigurationError {
                param: "reserves_threshold_disabled",
                reason: "above iffy threshold",
            }
        );
        Ok(())
    }
}

// ============ Collateral Monitor ============

/// Status state machine for one wrapped position
#[derive(Debug, Clone)]
pub struct CollateralMonitor {
    config: CollateralConfig,
    state: StatusState,
    events: EventLog,
}

impl CollateralMonitor {
    /// Fresh monitor: SOUND, no default pending
    pub fn new(config: CollateralConfig) -> WrapperResult<Self> {
        Self::from_state(config, StatusState::default())
    }

    /// Rebuild a monitor from persisted state
    pub fn from_state(config: CollateralConfig, state: StatusState) -> WrapperResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state,
            events: EventLog::new(),
        })
    }

    /// Re-grade the position at `now`
    ///
    /// Stale or invalid prices move the status toward IFFY. A failing
    /// feed or backing call returns the error with no state change.
    pub fn refresh<F, B>(&mut self, feed: &F, backing: &mut B, now: u64) -> WrapperResult<CollateralStatus>
    where
        F: PriceFeed + ?Sized,
        B: BackingSource + ?Sized,
    {
        let old_status = self.state.status;

        // 1. DISABLED is terminal
        if old_status == CollateralStatus::Disabled {
            return Ok(old_status);
        }

        // 2. An expired grace period defaults before anything is read
        if self.state.when_default <= now {
            self.mark_status(CollateralStatus::Disabled, now);
            self.emit_if_changed(old_status, now);
            return Ok(self.state.status);
        }

        // 3. Every fallible read happens before any state change
        let ref_per_tok = backing.ref_per_tok()?;
        let reserves = backing.reserves()?;
        let price = match oracle::price(feed, self.config.oracle_timeout, now) {
            Ok(price) => Some(price),
            Err(err) if err.is_soft_price_failure() => None,
            Err(err) => return Err(err),
        };
        let on_peg = match price {
            Some(price) => within_peg(price, self.peg_price()?, self.config.default_threshold)?,
            None => false,
        };

        // 4. Grade, worst condition first
        let target = if ref_per_tok < self.state.prev_ref_per_tok {
            CollateralStatus::Disabled
        } else if reserves < 0 || reserves < self.config.reserves_threshold_disabled {
            CollateralStatus::Disabled
        } else if reserves < self.config.reserves_threshold_iffy || !on_peg {
            CollateralStatus::Iffy
        } else {
            CollateralStatus::Sound
        };

        self.state.prev_ref_per_tok = ref_per_tok;
        self.mark_status(target, now);
        self.emit_if_changed(old_status, now);

        Ok(self.state.status)
    }

    /// Price of one wrapped token, 18 decimals
    ///
    /// Stale or invalid oracle answers are returned as errors.
    pub fn strict_price<F, B>(&self, feed: &F, backing: &mut B, now: u64) -> WrapperResult<u128>
    where
        F: PriceFeed + ?Sized,
        B: BackingSource + ?Sized,
    {
        let price = oracle::price(feed, self.config.oracle_timeout, now)?;
        fix_mul(price, backing.ref_per_tok()?)
    }

    /// `(is_fallback, price)`
    ///
    /// With `allow_fallback`, a stale or invalid oracle answer yields the
    /// configured fallback price instead of an error. Other failures are
    /// always returned.
    pub fn price<F, B>(&self, feed: &F, backing: &mut B, now: u64, allow_fallback: bool) -> WrapperResult<(bool, u128)>
    where
        F: PriceFeed + ?Sized,
        B: BackingSource + ?Sized,
    {
        match self.strict_price(feed, backing, now) {
            Ok(price) => Ok((false, price)),
            Err(err) if allow_fallback && err.is_soft_price_failure() => Ok((true, self.config.fallback_price)),
            Err(err) => Err(err),
        }
    }

    /// Expected reference-unit price: `price_per_target * target_per_ref`
    pub fn peg_price(&self) -> WrapperResult<u128> {
        fix_mul(self.config.price_per_target, self.config.target_per_ref)
    }

    // ============ Views ============

    pub fn status(&self) -> CollateralStatus {
        self.state.status
    }

    /// Time at which IFFY becomes DISABLED; `NEVER` when not pending
    pub fn when_default(&self) -> u64 {
        self.state.when_default
    }

    /// Persistable state
    pub fn state(&self) -> &StatusState {
        &self.state
    }

    pub fn config(&self) -> &CollateralConfig {
        &self.config
    }

    pub fn is_collateral(&self) -> bool {
        true
    }

    pub fn target_name(&self) -> [u8; 32] {
        self.config.target_name
    }

    pub fn max_trade_volume(&self) -> u128 {
        self.config.max_trade_volume
    }

    pub fn erc20(&self) -> Address {
        self.config.erc20
    }

    pub fn reward_erc20(&self) -> Address {
        self.config.reward_erc20
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Hand emitted events to the host
    pub fn take_events(&mut self) -> Vec<WrapperEvent> {
        self.events.take()
    }

    // ============ Internals ============

    /// Move toward `target`, keeping the earliest pending default
    fn mark_status(&mut self, target: CollateralStatus, now: u64) {
        self.state.when_default = match target {
            CollateralStatus::Sound => monitor::NEVER,
            CollateralStatus::Iffy => self
                .state
                .when_default
                .min(now.saturating_add(self.config.delay_until_default)),
            CollateralStatus::Disabled => self.state.when_default.min(now),
        };

        self.state.status = if self.state.when_default <= now {
            CollateralStatus::Disabled
        } else if self.state.when_default == monitor::NEVER {
            CollateralStatus::Sound
        } else {
            CollateralStatus::Iffy
        };
    }

    fn emit_if_changed(&mut self, old_status: CollateralStatus, now: u64) {
        if self.state.status != old_status {
            self.events.emit(WrapperEvent::CollateralStatusChanged {
                old_status,
                new_status: self.state.status,
                when_default: self.state.when_default,
                timestamp: now,
            });
        }
    }
}

// ============ Tests ============
