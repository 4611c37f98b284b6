//! Yieldwrap Common Library
//!
//! Shared types, constants, and utilities for the yield-bearing position
//! wrapper and its collateral monitor.
//!
//! ## Model
//!
//! - One pooled position in an external lending protocol backs many
//!   depositors. The pool's supply index compounds interest and a second
//!   tracking index meters rewards.
//! - Each depositor is tracked in a shadow ledger by principal, in the
//!   pool's own principal units, so the pool's index converts it to value.
//! - Shares are non-rebasing: one share per unit of principal. Value per
//!   share rises with the supply index.
//! - A monitor grades the wrapped position SOUND, IFFY or DISABLED from
//!   oracle health, peg deviation and protocol reserves.
//!
//! ## Modules
//!
//! - `constants`: scales and default configuration
//! - `errors`: `WrapperError` and `WrapperResult`
//! - `types`: accounts, persisted state, status
//! - `events`: typed event log
//! - `math`: checked fixed-point conversions
//! - `validation`: `check!` and shared guards
//! - `interfaces`: traits for the pool, the oracle and backing sources
//! - `testing`: in-memory doubles (feature `testing`)
//!
//! This crate is `no_std` compatible when built without the `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export collections for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::collections::{BTreeMap, BTreeSet};
#[cfg(not(feature = "std"))]
pub use alloc::vec::Vec;
#[cfg(feature = "std")]
pub use std::collections::{BTreeMap, BTreeSet};
#[cfg(feature = "std")]
pub use std::vec::Vec;

pub mod constants;
pub mod errors;
pub mod events;
pub mod interfaces;
pub mod math;
pub mod types;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use errors::{WrapperError, WrapperResult};
pub use events::{EventLog, EventType, WrapperEvent};
pub use interfaces::{BackingSource, PooledProtocol, PriceFeed};
pub use types::*;
