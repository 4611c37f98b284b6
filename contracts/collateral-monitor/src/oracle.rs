//! Oracle reading validation
//!
//! Turns a raw feed answer into an 18-decimal price or a typed failure.
//! Stale and non-positive answers are errors here; deciding whether they
//! are fatal is the caller's business.

use yieldwrap_common::{
    check,
    errors::{WrapperError, WrapperResult},
    interfaces::PriceFeed,
    math::scale_to_fix,
};

/// Validated feed price at `now`, 18 decimals
///
/// # Errors
/// - whatever the feed returns if the call itself fails
/// - `StalePrice` for an incomplete round, a zero timestamp, or an answer
///   older than `timeout`
/// - `InvalidPrice` for a zero or negative answer
pub fn price<F: PriceFeed + ?Sized>(feed: &F, timeout: u64, now: u64) -> WrapperResult<u128> {
    let reading = feed.latest_reading()?;

    let stale = WrapperError::StalePrice {
        updated_at: reading.timestamp,
        now,
        timeout,
    };
    check!(reading.round_valid && reading.timestamp > 0, stale);
    check!(now.saturating_sub(reading.timestamp) <= timeout, stale);
    check!(reading.value > 0, WrapperError::InvalidPrice { value: reading.value });

    scale_to_fix(reading.value as u128, feed.decimals())
}
