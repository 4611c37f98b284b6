//! End-to-end scenarios
//!
//! Drives the shadow ledger and the collateral monitor together against
//! the mock pool and feed.

#[cfg(test)]
mod tests {
    use crate::{CollateralConfig, CollateralMonitor};
    use yieldwrap_common::constants::{
        ledger::MAX_AMOUNT,
        monitor::{DELAY_UNTIL_DEFAULT, NEVER},
        precision::FIX_ONE,
        token::ONE,
    };
    use yieldwrap_common::errors::WrapperError;
    use yieldwrap_common::events::{EventType, WrapperEvent};
    use yieldwrap_common::interfaces::PooledProtocol;
    use yieldwrap_common::testing::{MockBacking, MockCall, MockLendingPool, MockPriceFeed};
    use yieldwrap_common::types::{Address, CallContext, CollateralStatus};
    use yieldwrap_ledger::{LedgerBacking, LedgerConfig, ShadowLedger};

    const POOL: Address = [9u8; 32];
    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];
    const START: u64 = 1_700_000_000;

    // ============ Helpers ============

    fn ledger() -> ShadowLedger {
        ShadowLedger::new(LedgerConfig {
            pool_account: POOL,
            underlying: [7u8; 32],
            reward_token: [8u8; 32],
            underlying_decimals: 6,
            reward_decimals: 6,
        })
        .unwrap()
    }

    fn monitor() -> CollateralMonitor {
        CollateralMonitor::new(CollateralConfig::with_defaults([4u8; 32], POOL, [8u8; 32])).unwrap()
    }

    fn ctx(caller: Address, timestamp: u64) -> CallContext {
        CallContext::new(caller, timestamp)
    }

    // ============ Scenarios ============

    #[test]
    fn test_wrap_grow_and_unwrap() {
        let mut ledger = ledger();
        let mut pool = MockLendingPool::new(POOL);
        pool.mint(ALICE, 20_000 * ONE);

        // 1. Wrap everything
        let shares = ledger.deposit(&mut pool, &ctx(ALICE, START), MAX_AMOUNT).unwrap();
        assert_eq!(shares, 20_000 * ONE);
        assert_eq!(pool.balance_of(&ALICE).unwrap(), 0);

        // 2. Pool earns 0.25%, shares stay put
        pool.set_pending_indices(1_002_500_000_000_000, 0);
        assert_eq!(ledger.balance_of(&ALICE), 20_000 * ONE);
        assert_eq!(ledger.underlying_balance_of(&mut pool, &ALICE).unwrap(), 20_050 * ONE);

        // 3. Unwrap everything
        let withdrawn = ledger.withdraw(&mut pool, &ctx(ALICE, START + 60), MAX_AMOUNT).unwrap();
        assert_eq!(withdrawn, 20_050 * ONE);
        assert_eq!(pool.balance_of(&ALICE).unwrap(), 20_050 * ONE);
        assert_eq!(ledger.total_supply(), 0);

        let kinds: Vec<EventType> = ledger.events().events().iter().map(|e| e.event_type()).collect();
        assert!(kinds.contains(&EventType::Deposit));
        assert!(kinds.contains(&EventType::Withdraw));
    }

    #[test]
    fn test_ledger_backed_position_stays_sound() {
        let mut ledger = ledger();
        let mut pool = MockLendingPool::new(POOL);
        pool.mint(ALICE, 20_000 * ONE);
        ledger.deposit(&mut pool, &ctx(ALICE, START), 20_000 * ONE).unwrap();

        let mut monitor = monitor();
        let feed = MockPriceFeed::new(100_000_000, 8, START);

        pool.set_pending_indices(1_002_500_000_000_000, 0);
        {
            let mut backing = LedgerBacking::new(&ledger, &mut pool);
            assert_eq!(monitor.refresh(&feed, &mut backing, START).unwrap(), CollateralStatus::Sound);
            assert_eq!(
                monitor.strict_price(&feed, &mut backing, START).unwrap(),
                1_002_500_000_000_000_000
            );
        }
        assert_eq!(monitor.state().prev_ref_per_tok, 1_002_500_000_000_000_000);
        assert_eq!(ledger.exchange_rate(&mut pool).unwrap(), monitor.state().prev_ref_per_tok);

        // Further growth keeps it sound
        pool.set_pending_indices(1_010_000_000_000_000, 0);
        let mut backing = LedgerBacking::new(&ledger, &mut pool);
        assert_eq!(monitor.refresh(&feed, &mut backing, START + 3_600).unwrap(), CollateralStatus::Sound);
        assert!(monitor.events().is_empty());
    }

    #[test]
    fn test_rising_index_never_hard_defaults() {
        let mut ledger = ledger();
        let mut pool = MockLendingPool::new(POOL);
        pool.mint(ALICE, 10_000 * ONE);
        pool.mint(BOB, 10_000 * ONE);
        ledger.deposit(&mut pool, &ctx(ALICE, START), 10_000 * ONE).unwrap();

        let mut monitor = monitor();
        let mut feed = MockPriceFeed::new(100_000_000, 8, START);
        let mut previous = 0u128;

        for step in 0..6u64 {
            let now = START + step * 3_600;
            pool.set_pending_indices(1_000_000_000_000_000 + step * 333_333_333_333, 0);
            feed.set_price(100_000_000, now);

            // Ledger activity between refreshes
            match step {
                1 => {
                    ledger.deposit(&mut pool, &ctx(BOB, now), 3_333_333).unwrap();
                }
                3 => {
                    ledger.withdraw(&mut pool, &ctx(ALICE, now), 1_234_567).unwrap();
                }
                4 => {
                    ledger.transfer(&mut pool, &ctx(BOB, now), ALICE, 1_000).unwrap();
                }
                _ => {}
            }

            let mut backing = LedgerBacking::new(&ledger, &mut pool);
            assert_eq!(monitor.refresh(&feed, &mut backing, now).unwrap(), CollateralStatus::Sound);
            assert!(monitor.state().prev_ref_per_tok >= previous);
            previous = monitor.state().prev_ref_per_tok;
        }

        assert_eq!(monitor.when_default(), NEVER);
        assert!(monitor.events().is_empty());
        assert_eq!(previous, 1_001_666_666_666_665_000);
    }

    #[test]
    fn test_depeg_to_default() {
        let mut monitor = monitor();
        let mut feed = MockPriceFeed::new(100_000_000, 8, START);
        let mut backing = MockBacking::new(FIX_ONE, 1_000_000);

        assert_eq!(monitor.refresh(&feed, &mut backing, START).unwrap(), CollateralStatus::Sound);

        // 1. Reference unit trades at 0.80
        feed.set_price(80_000_000, START + 100);
        assert_eq!(monitor.refresh(&feed, &mut backing, START + 100).unwrap(), CollateralStatus::Iffy);
        let deadline = START + 100 + DELAY_UNTIL_DEFAULT;
        assert_eq!(monitor.when_default(), deadline);

        // 2. Still off peg after the grace period
        feed.set_price(80_000_000, deadline);
        assert_eq!(monitor.refresh(&feed, &mut backing, deadline).unwrap(), CollateralStatus::Disabled);

        // 3. Terminal, even once the peg is back
        feed.set_price(100_000_000, deadline + 1_000);
        backing.ref_per_tok = 2 * FIX_ONE;
        assert_eq!(
            monitor.refresh(&feed, &mut backing, deadline + 1_000).unwrap(),
            CollateralStatus::Disabled
        );
        assert_eq!(monitor.when_default(), deadline);

        let transitions: Vec<(CollateralStatus, CollateralStatus)> = monitor
            .events()
            .filter_by_type(EventType::CollateralStatusChanged)
            .into_iter()
            .filter_map(|event| match event {
                WrapperEvent::CollateralStatusChanged { old_status, new_status, .. } => Some((*old_status, *new_status)),
                _ => None,
            })
            .collect();
        assert_eq!(
            transitions,
            vec![
                (CollateralStatus::Sound, CollateralStatus::Iffy),
                (CollateralStatus::Iffy, CollateralStatus::Disabled),
            ]
        );
    }

    #[test]
    fn test_pool_insolvency_disables_position() {
        let ledger = ledger();
        let mut pool = MockLendingPool::new(POOL);
        let mut monitor = monitor();
        let feed = MockPriceFeed::new(100_000_000, 8, START);

        pool.set_reserves(-1);
        let mut backing = LedgerBacking::new(&ledger, &mut pool);
        assert_eq!(monitor.refresh(&feed, &mut backing, START).unwrap(), CollateralStatus::Disabled);
        assert_eq!(monitor.when_default(), START);
    }

    #[test]
    fn test_pool_outage_leaves_status_alone() {
        let mut ledger = ledger();
        let mut pool = MockLendingPool::new(POOL);
        pool.mint(ALICE, 1_000 * ONE);
        ledger.deposit(&mut pool, &ctx(ALICE, START), 1_000 * ONE).unwrap();

        let mut monitor = monitor();
        let mut feed = MockPriceFeed::new(80_000_000, 8, START);
        {
            let mut backing = LedgerBacking::new(&ledger, &mut pool);
            monitor.refresh(&feed, &mut backing, START).unwrap();
        }
        let before = *monitor.state();

        pool.fail_on(Some(MockCall::Reserves));
        feed.set_price(100_000_000, START + 10);
        let mut backing = LedgerBacking::new(&ledger, &mut pool);
        assert_eq!(
            monitor.refresh(&feed, &mut backing, START + 10),
            Err(WrapperError::ExternalProtocolFailure { call: "reserves" })
        );
        assert_eq!(monitor.state(), &before);
        assert_eq!(monitor.status(), CollateralStatus::Iffy);
    }

    #[test]
    fn test_transfers_do_not_move_value_between_holders() {
        let mut ledger = ledger();
        let mut pool = MockLendingPool::new(POOL);
        pool.mint(ALICE, 10_000 * ONE);
        pool.mint(BOB, 10_000 * ONE);

        ledger.deposit(&mut pool, &ctx(ALICE, START), 10_000 * ONE).unwrap();
        ledger.deposit(&mut pool, &ctx(BOB, START), 10_000 * ONE).unwrap();
        pool.set_pending_indices(1_100_000_000_000_000, 0);

        ledger.transfer(&mut pool, &ctx(ALICE, START + 1), BOB, 5_000 * ONE).unwrap();

        let alice = ledger.withdraw(&mut pool, &ctx(ALICE, START + 2), MAX_AMOUNT).unwrap();
        let bob = ledger.withdraw(&mut pool, &ctx(BOB, START + 2), MAX_AMOUNT).unwrap();

        assert_eq!(alice, 5_500 * ONE);
        assert_eq!(bob, 16_500 * ONE);
        assert_eq!(pool.balance_of(&POOL).unwrap(), 0);
    }

    #[test]
    fn test_recovery_before_deadline_resets_timer() {
        let mut monitor = monitor();
        let mut feed = MockPriceFeed::new(80_000_000, 8, START);
        let mut backing = MockBacking::new(FIX_ONE, 1_000_000);

        monitor.refresh(&feed, &mut backing, START).unwrap();
        feed.set_price(100_000_000, START + 500);
        monitor.refresh(&feed, &mut backing, START + 500).unwrap();
        assert_eq!(monitor.when_default(), NEVER);

        // A second depeg starts a fresh grace period
        feed.set_price(80_000_000, START + 1_000);
        monitor.refresh(&feed, &mut backing, START + 1_000).unwrap();
        assert_eq!(monitor.when_default(), START + 1_000 + DELAY_UNTIL_DEFAULT);
    }
}
