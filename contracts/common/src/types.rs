//! Core Types for the Wrapper
//!
//! Persisted ledger and status state plus the ephemeral values passed
//! between the synchronizer, the ledger and the monitor.

use crate::constants::monitor::NEVER;
use crate::{BTreeMap, BTreeSet, Vec};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Type alias for account identifiers (32-byte hash)
pub type Address = [u8; 32];

/// The all-zero address, never valid in a required role
pub const ZERO_ADDRESS: Address = [0u8; 32];

// ============ Call Context ============

/// Who is calling and when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Account invoking the operation
    pub caller: Address,
    /// Current time in seconds
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(caller: Address, timestamp: u64) -> Self {
        Self { caller, timestamp }
    }
}

// ============ Ledger Types ============

/// Global figures read from the pooled protocol right after accrual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlobalIndexSnapshot {
    /// Cumulative interest factor, scaled by `BASE_INDEX_SCALE`
    pub supply_index: u64,
    /// Cumulative reward per unit principal, scaled by `TRACKING_INDEX_SCALE`
    pub tracking_index: u64,
    /// Present value of the pooled position in underlying units
    pub pooled_underlying_balance: u64,
}

/// Per-depositor bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Account {
    /// Stake in the pool's own principal units
    pub principal: i64,
    /// Tracking index at the last reward settlement
    pub tracking_index_snapshot: u64,
    /// Settled, unclaimed rewards in reward-token raw units
    pub accrued_reward_units: u64,
}

impl Account {
    /// Non-rebasing share balance (one share per unit of principal)
    pub fn shares(&self) -> u64 {
        if self.principal > 0 {
            self.principal as u64
        } else {
            0
        }
    }

    /// True when nothing is held or owed
    pub fn is_empty(&self) -> bool {
        self.principal == 0 && self.accrued_reward_units == 0
    }
}

/// Durable ledger state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LedgerState {
    /// Account table
    pub accounts: BTreeMap<Address, Account>,
    /// Total outstanding shares
    pub share_supply: u64,
    /// Standing (owner, operator) approvals
    pub allowances: BTreeSet<(Address, Address)>,
    /// Reward tokens held by the wrapper and not yet forwarded
    pub reward_reserve: u64,
}

impl LedgerState {
    /// Account entry, or an empty one if never seen
    pub fn account(&self, owner: &Address) -> Account {
        self.accounts.get(owner).copied().unwrap_or_default()
    }

    /// Serialize state to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize state from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }

    /// SHA-256 over the serialized state
    pub fn commitment(&self) -> [u8; 32] {
        hash_bytes(&self.to_bytes())
    }
}

// ============ Collateral Types ============

/// Health of the wrapped position as collateral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum CollateralStatus {
    /// Price trustworthy and on peg
    #[default]
    Sound = 0,
    /// Soft default pending, may recover before `when_default`
    Iffy = 1,
    /// Defaulted, terminal
    Disabled = 2,
}

/// Durable monitor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StatusState {
    pub status: CollateralStatus,
    /// Time at which IFFY becomes DISABLED, `NEVER` when not pending
    pub when_default: u64,
    /// Value per share seen at the previous refresh (18 decimals)
    pub prev_ref_per_tok: u128,
}

impl Default for StatusState {
    fn default() -> Self {
        Self {
            status: CollateralStatus::Sound,
            when_default: NEVER,
            prev_ref_per_tok: 0,
        }
    }
}

impl StatusState {
    /// Serialize state to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize state from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }

    /// SHA-256 over the serialized state
    pub fn commitment(&self) -> [u8; 32] {
        hash_bytes(&self.to_bytes())
    }
}

/// Raw oracle answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceReading {
    /// Answer in the feed's own decimals
    pub value: i128,
    /// Time the answer was recorded
    pub timestamp: u64,
    /// False when the round never completed
    pub round_valid: bool,
}

fn hash_bytes(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}
