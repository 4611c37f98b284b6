//! Index Synchronizer
//!
//! The pool only advances its indices when something touches it, so every
//! read is preceded by an explicit accrual for the pooled account.

use yieldwrap_common::{
    check,
    errors::{WrapperError, WrapperResult},
    interfaces::PooledProtocol,
    types::{Address, GlobalIndexSnapshot},
};

/// Force accrual for `pool`, then read both indices and the pooled balance
///
/// Any failed protocol call is returned as is. No value is ever estimated.
pub fn sync<P: PooledProtocol + ?Sized>(protocol: &mut P, pool: &Address) -> WrapperResult<GlobalIndexSnapshot> {
    // 1. Bring the pool's lazy indices current
    protocol.trigger_accrual(pool)?;

    // 2. Read back
    let supply_index = protocol.current_supply_index()?;
    check!(supply_index > 0, WrapperError::IndexUnavailable { index: "supply" });

    let tracking_index = protocol.current_tracking_index(pool)?;
    let pooled_underlying_balance = protocol.balance_of(pool)?;

    Ok(GlobalIndexSnapshot {
        supply_index,
        tracking_index,
        pooled_underlying_balance,
    })
}
