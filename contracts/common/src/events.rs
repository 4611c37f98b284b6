//! Wrapper Events
//!
//! Events are collected during an operation and handed to the host once
//! the operation has fully succeeded. They are the only record of state
//! changes and can be indexed off-chain.

use crate::types::{Address, CollateralStatus};
use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Ledger Events (0x01 - 0x1F)
    Deposit = 0x01,
    Withdraw = 0x02,
    Transfer = 0x03,
    Approval = 0x04,

    // Reward Events (0x20 - 0x3F)
    RewardsAccrued = 0x20,
    RewardClaimed = 0x21,

    // Collateral Events (0x40 - 0x5F)
    CollateralStatusChanged = 0x40,
}

/// Main event enum containing all wrapper and monitor events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum WrapperEvent {
    // ============ Ledger Events ============
    /// Underlying moved into the pool and shares minted
    Deposit {
        payer: Address,
        recipient: Address,
        amount: u64,
        shares_minted: u64,
        timestamp: u64,
    },

    /// Shares burned and underlying moved out of the pool
    Withdraw {
        owner: Address,
        recipient: Address,
        amount: u64,
        shares_burned: u64,
        timestamp: u64,
    },

    /// Shares moved between accounts
    Transfer {
        from: Address,
        to: Address,
        shares: u64,
        timestamp: u64,
    },

    /// Operator approval granted or revoked
    Approval {
        owner: Address,
        operator: Address,
        approved: bool,
        timestamp: u64,
    },

    // ============ Reward Events ============
    /// Rewards settled into an account
    RewardsAccrued {
        account: Address,
        newly_accrued: u64,
        tracking_index: u64,
        timestamp: u64,
    },

    /// Settled rewards paid out
    RewardClaimed {
        account: Address,
        recipient: Address,
        amount: u64,
        timestamp: u64,
    },

    // ============ Collateral Events ============
    /// Monitor status transition
    CollateralStatusChanged {
        old_status: CollateralStatus,
        new_status: CollateralStatus,
        when_default: u64,
        timestamp: u64,
    },
}

impl WrapperEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Deposit { .. } => EventType::Deposit,
            Self::Withdraw { .. } => EventType::Withdraw,
            Self::Transfer { .. } => EventType::Transfer,
            Self::Approval { .. } => EventType::Approval,
            Self::RewardsAccrued { .. } => EventType::RewardsAccrued,
            Self::RewardClaimed { .. } => EventType::RewardClaimed,
            Self::CollateralStatusChanged { .. } => EventType::CollateralStatusChanged,
        }
    }

    /// Get the time the event occurred
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Deposit { timestamp, .. } => *timestamp,
            Self::Withdraw { timestamp, .. } => *timestamp,
            Self::Transfer { timestamp, .. } => *timestamp,
            Self::Approval { timestamp, .. } => *timestamp,
            Self::RewardsAccrued { timestamp, .. } => *timestamp,
            Self::RewardClaimed { timestamp, .. } => *timestamp,
            Self::CollateralStatusChanged { timestamp, .. } => *timestamp,
        }
    }

    /// Serialize event to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<WrapperEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: WrapperEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[WrapperEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<WrapperEvent> {
        self.events
    }

    /// Drain the log, leaving it empty
    pub fn take(&mut self) -> Vec<WrapperEvent> {
        core::mem::take(&mut self.events)
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&WrapperEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop events recorded after the first `len`
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
