//! Ledger-backed collateral source
//!
//! Lets the collateral monitor read value per share straight from the pool
//! the ledger wraps.

use yieldwrap_common::{
    errors::WrapperResult,
    interfaces::{BackingSource, PooledProtocol},
    math::index_to_fix,
};

use crate::ShadowLedger;

/// A ledger paired with the pool it wraps
///
/// One share is one unit of pool principal, so value per share is the
/// pool's supply index. The index never decreases, so neither does
/// `ref_per_tok`.
pub struct LedgerBacking<'a, P: PooledProtocol> {
    ledger: &'a ShadowLedger,
    protocol: &'a mut P,
}

impl<'a, P: PooledProtocol> LedgerBacking<'a, P> {
    pub fn new(ledger: &'a ShadowLedger, protocol: &'a mut P) -> Self {
        Self { ledger, protocol }
    }
}

impl<P: PooledProtocol> BackingSource for LedgerBacking<'_, P> {
    fn ref_per_tok(&mut self) -> WrapperResult<u128> {
        let snapshot = self.ledger.snapshot(self.protocol)?;
        index_to_fix(snapshot.supply_index)
    }

    fn reserves(&mut self) -> WrapperResult<i128> {
        self.protocol.reserves()
    }
}
