//! Shadow Ledger
//!
//! Attributes one pooled lending position to many depositors.
//!
//! ## Accounting
//!
//! - Every account holds principal in the pool's own principal units, so
//!   the pool's supply index converts it to underlying exactly as the pool
//!   would for a direct depositor.
//! - Shares are principal: balances never rebase, value per share grows.
//! - Rewards are settled against the pool's tracking index before any
//!   principal change, so earnings under the old balance stay put.
//! - Conversions round toward the pool. Dust stays in the pool and is
//!   never credited to a single account.
//! - Deposits and withdrawals credit or burn the principal the pool itself
//!   books for the move, recovered from the pooled balance. With a supply
//!   index of at least 1.0 that recovery is exact, so the ledger's total
//!   principal never exceeds the pool's.
//!
//! ## Atomicity
//!
//! Each mutating call syncs the pool, finishes its bookkeeping, and only
//! then calls out to move funds. A failure at any step restores the
//! accounts it touched and the share supply.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

pub mod backing;
pub mod sync;

pub use backing::LedgerBacking;
pub use sync::sync;

use yieldwrap_common::{
    check,
    constants::{ledger::MAX_AMOUNT, precision::BASE_ACCRUAL_DECIMALS},
    errors::{WrapperError, WrapperResult},
    events::{EventLog, WrapperEvent},
    interfaces::PooledProtocol,
    math::{
        decimals_factor, exchange_rate, present_value, present_value_up, principal_value,
        principal_value_up, pro_rata_share, tracking_accrual,
    },
    types::{Account, Address, CallContext, GlobalIndexSnapshot, LedgerState, ZERO_ADDRESS},
    validation::{
        require_nonzero, require_owner_or_operator, require_sufficient_balance,
        require_sufficient_principal, require_token_decimals, require_valid_address,
    },
    Vec,
};

// ============ Ledger Config ============

/// Configuration for the shadow ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LedgerConfig {
    /// Account holding the pooled position in the lending protocol
    pub pool_account: Address,
    /// Underlying token
    pub underlying: Address,
    /// Reward token paid by the lending protocol
    pub reward_token: Address,
    /// Decimals of the underlying
    pub underlying_decimals: u8,
    /// Decimals of the reward token
    pub reward_decimals: u8,
}

impl LedgerConfig {
    /// Reject missing roles and decimals the accrual scale cannot express
    pub fn validate(&self) -> WrapperResult<()> {
        require_valid_address(self.pool_account, "pool_account")?;
        require_valid_address(self.underlying, "underlying")?;
        require_valid_address(self.reward_token, "reward_token")?;
        require_token_decimals(self.underlying_decimals, "underlying_decimals")?;
        require_token_decimals(self.reward_decimals, "reward_decimals")?;
        Ok(())
    }

    /// Divisor taking `principal * index` down to the 6-decimal accrual scale
    pub fn accrual_descale(&self) -> WrapperResult<u64> {
        decimals_factor(self.underlying_decimals, BASE_ACCRUAL_DECIMALS)
    }

    /// Multiplier taking accrual units up to reward token units
    pub fn reward_rescale(&self) -> WrapperResult<u64> {
        decimals_factor(self.reward_decimals, BASE_ACCRUAL_DECIMALS)
    }
}

// ============ Rollback ============

/// Pre-operation values of everything a call may touch
struct Checkpoint {
    accounts: Vec<(Address, Option<Account>)>,
    share_supply: u64,
    events: usize,
}

// ============ Shadow Ledger ============

/// Per-depositor bookkeeping over one pooled position
#[derive(Debug, Clone)]
pub struct ShadowLedger {
    config: LedgerConfig,
    state: LedgerState,
    events: EventLog,
    accrual_descale: u64,
    reward_rescale: u64,
}

impl ShadowLedger {
    /// Create an empty ledger
    pub fn new(config: LedgerConfig) -> WrapperResult<Self> {
        Self::from_state(config, LedgerState::default())
    }

    /// Rebuild a ledger from persisted state
    pub fn from_state(config: LedgerConfig, state: LedgerState) -> WrapperResult<Self> {
        config.validate()?;
        let accrual_descale = config.accrual_descale()?;
        let reward_rescale = config.reward_rescale()?;

        Ok(Self {
            config,
            state,
            events: EventLog::new(),
            accrual_descale,
            reward_rescale,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Persistable state
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Hand emitted events to the host
    pub fn take_events(&mut self) -> Vec<WrapperEvent> {
        self.events.take()
    }

    // ============ Deposit ============

    /// Deposit the caller's underlying for the caller
    ///
    /// Returns the shares minted. `MAX_AMOUNT` deposits the caller's whole
    /// balance in the pool.
    pub fn deposit<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        amount: u64,
    ) -> WrapperResult<u64> {
        self.deposit_from(protocol, ctx, ctx.caller, ctx.caller, amount)
    }

    /// Deposit the caller's underlying, crediting `dst`
    pub fn deposit_to<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        dst: Address,
        amount: u64,
    ) -> WrapperResult<u64> {
        self.deposit_from(protocol, ctx, ctx.caller, dst, amount)
    }

    /// Deposit `src`'s underlying, crediting `dst`
    ///
    /// The caller must be `src` or approved by it.
    pub fn deposit_from<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        src: Address,
        dst: Address,
        amount: u64,
    ) -> WrapperResult<u64> {
        self.atomically(&[dst], |ledger| ledger.do_deposit(protocol, ctx, src, dst, amount))
    }

    fn do_deposit<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        src: Address,
        dst: Address,
        amount: u64,
    ) -> WrapperResult<u64> {
        // 1. Caller must control the payer
        require_owner_or_operator(src, ctx.caller, self.is_allowed(&src, &ctx.caller))?;
        check!(
            dst != ZERO_ADDRESS,
            WrapperError::InvalidInput { param: "dst", reason: "zero address" }
        );

        // 2. Bring indices current
        let snapshot = self.snapshot(protocol)?;

        // 3. Resolve the amount against the payer's balance
        let available = protocol.balance_of(&src)?;
        let amount = if amount == MAX_AMOUNT {
            available
        } else {
            require_sufficient_balance(available, amount)?;
            amount
        };
        require_nonzero(amount)?;

        // 4. Settle rewards under the old principal
        let mut account = self.settle(&dst, &snapshot, ctx.timestamp)?;

        // 5. Credit exactly the principal the pool books for this deposit
        //    and pull only what it costs; the payer keeps the remainder
        let pooled = snapshot.pooled_underlying_balance;
        let pool_principal = principal_value_up(pooled, snapshot.supply_index)?;
        let booked = principal_value(
            pooled.checked_add(amount).ok_or(WrapperError::Overflow)?,
            snapshot.supply_index,
        )?;
        let minted = booked.checked_sub(pool_principal).ok_or(WrapperError::Underflow)?;
        check!(minted > 0, WrapperError::ZeroAmount);
        let pulled = present_value_up(booked, snapshot.supply_index)?
            .checked_sub(pooled)
            .ok_or(WrapperError::Underflow)?;

        account.principal = account.principal.checked_add(minted).ok_or(WrapperError::Overflow)?;
        self.state.share_supply = self
            .state
            .share_supply
            .checked_add(minted as u64)
            .ok_or(WrapperError::Overflow)?;
        self.state.accounts.insert(dst, account);

        // 6. Move funds last
        protocol.transfer_in(&src, pulled)?;

        self.events.emit(WrapperEvent::Deposit {
            payer: src,
            recipient: dst,
            amount: pulled,
            shares_minted: minted as u64,
            timestamp: ctx.timestamp,
        });

        Ok(minted as u64)
    }

    // ============ Withdraw ============

    /// Withdraw the caller's underlying to the caller
    ///
    /// Returns the underlying withdrawn. `MAX_AMOUNT` withdraws everything
    /// attributable to the caller.
    pub fn withdraw<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        amount: u64,
    ) -> WrapperResult<u64> {
        self.withdraw_from(protocol, ctx, ctx.caller, ctx.caller, amount)
    }

    /// Withdraw the caller's underlying to `to`
    pub fn withdraw_to<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        to: Address,
        amount: u64,
    ) -> WrapperResult<u64> {
        self.withdraw_from(protocol, ctx, ctx.caller, to, amount)
    }

    /// Withdraw `src`'s underlying to `to`
    ///
    /// The caller must be `src` or approved by it.
    pub fn withdraw_from<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        src: Address,
        to: Address,
        amount: u64,
    ) -> WrapperResult<u64> {
        self.atomically(&[src], |ledger| ledger.do_withdraw(protocol, ctx, src, to, amount))
    }

    fn do_withdraw<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        src: Address,
        to: Address,
        amount: u64,
    ) -> WrapperResult<u64> {
        // 1. Caller must control the owner
        require_owner_or_operator(src, ctx.caller, self.is_allowed(&src, &ctx.caller))?;
        check!(
            to != ZERO_ADDRESS,
            WrapperError::InvalidInput { param: "to", reason: "zero address" }
        );

        // 2. Bring indices current and settle
        let snapshot = self.snapshot(protocol)?;
        let mut account = self.settle(&src, &snapshot, ctx.timestamp)?;

        // 3. Cap by the owner's own attribution, never the pool total
        let available = self.attributable(&account, &snapshot)?;
        let amount = if amount == MAX_AMOUNT {
            available
        } else {
            require_sufficient_principal(available, amount)?;
            amount
        };
        require_nonzero(amount)?;

        // 4. Burn what the pool debits for this amount, everything on a full exit
        let burned = if amount == available {
            account.principal
        } else {
            let pooled = snapshot.pooled_underlying_balance;
            let pool_principal = principal_value_up(pooled, snapshot.supply_index)?;
            let remaining = principal_value(pooled - amount, snapshot.supply_index)?;
            pool_principal
                .checked_sub(remaining)
                .ok_or(WrapperError::Underflow)?
                .min(account.principal)
        };

        account.principal -= burned;
        self.state.share_supply = self
            .state
            .share_supply
            .checked_sub(burned as u64)
            .ok_or(WrapperError::Underflow)?;
        self.state.accounts.insert(src, account);

        // 5. Move funds last
        protocol.transfer_out(&to, amount)?;

        self.events.emit(WrapperEvent::Withdraw {
            owner: src,
            recipient: to,
            amount,
            shares_burned: burned as u64,
            timestamp: ctx.timestamp,
        });

        Ok(amount)
    }

    // ============ Transfer ============

    /// Move the caller's shares to `to`
    pub fn transfer<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        to: Address,
        shares: u64,
    ) -> WrapperResult<u64> {
        self.transfer_from(protocol, ctx, ctx.caller, to, shares)
    }

    /// Move `from`'s shares to `to`
    ///
    /// The caller must be `from` or approved by it. `MAX_AMOUNT` moves
    /// every share `from` holds.
    pub fn transfer_from<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        from: Address,
        to: Address,
        shares: u64,
    ) -> WrapperResult<u64> {
        self.atomically(&[from, to], |ledger| ledger.do_transfer(protocol, ctx, from, to, shares))
    }

    fn do_transfer<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        from: Address,
        to: Address,
        shares: u64,
    ) -> WrapperResult<u64> {
        // 1. Authorization and sanity
        require_owner_or_operator(from, ctx.caller, self.is_allowed(&from, &ctx.caller))?;
        check!(from != to, WrapperError::InvalidInput { param: "to", reason: "self transfer" });
        check!(
            to != ZERO_ADDRESS,
            WrapperError::InvalidInput { param: "to", reason: "zero address" }
        );

        // 2. Settle both sides at the current tracking index
        let snapshot = self.snapshot(protocol)?;
        let mut sender = self.settle(&from, &snapshot, ctx.timestamp)?;
        let mut receiver = self.settle(&to, &snapshot, ctx.timestamp)?;

        // 3. Resolve amount
        let available = sender.shares();
        let shares = if shares == MAX_AMOUNT { available } else { shares };
        require_sufficient_principal(available, shares)?;
        require_nonzero(shares)?;

        // 4. Move principal; supply is unchanged
        let moved = i64::try_from(shares).map_err(|_| WrapperError::Overflow)?;
        sender.principal -= moved;
        receiver.principal = receiver.principal.checked_add(moved).ok_or(WrapperError::Overflow)?;
        self.state.accounts.insert(from, sender);
        self.state.accounts.insert(to, receiver);

        self.events.emit(WrapperEvent::Transfer {
            from,
            to,
            shares,
            timestamp: ctx.timestamp,
        });

        Ok(shares)
    }

    // ============ Rewards ============

    /// Settle `account`'s rewards at the current tracking index
    ///
    /// Anyone may call this. Returns the newly accrued reward units.
    pub fn accrue_account<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        account: Address,
    ) -> WrapperResult<u64> {
        self.atomically(&[account], |ledger| {
            let snapshot = ledger.snapshot(protocol)?;
            let before = ledger.state.account(&account).accrued_reward_units;
            let settled = ledger.settle(&account, &snapshot, ctx.timestamp)?;
            Ok(settled.accrued_reward_units - before)
        })
    }

    /// Claim the caller's rewards to the caller
    pub fn claim<P: PooledProtocol>(&mut self, protocol: &mut P, ctx: &CallContext) -> WrapperResult<u64> {
        self.claim_to(protocol, ctx, ctx.caller, ctx.caller)
    }

    /// Claim `src`'s rewards and forward them to `to`
    ///
    /// The caller must be `src` or approved by it. Returns the amount
    /// forwarded; zero when nothing is owed.
    pub fn claim_to<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        src: Address,
        to: Address,
    ) -> WrapperResult<u64> {
        self.atomically(&[src], |ledger| ledger.do_claim(protocol, ctx, src, to))
    }

    fn do_claim<P: PooledProtocol>(
        &mut self,
        protocol: &mut P,
        ctx: &CallContext,
        src: Address,
        to: Address,
    ) -> WrapperResult<u64> {
        // 1. Caller must control the account
        require_owner_or_operator(src, ctx.caller, self.is_allowed(&src, &ctx.caller))?;
        check!(
            to != ZERO_ADDRESS,
            WrapperError::InvalidInput { param: "to", reason: "zero address" }
        );

        // 2. Settle
        let snapshot = self.snapshot(protocol)?;
        let mut account = self.settle(&src, &snapshot, ctx.timestamp)?;
        let owed = account.accrued_reward_units;
        if owed == 0 {
            return Ok(0);
        }

        // 3. Zero the claim before any external call
        account.accrued_reward_units = 0;
        self.state.accounts.insert(src, account);

        // 4. Pull the pool's rewards; tokens received stay in the reserve
        //    even if forwarding fails below
        let received = protocol.claim_rewards(&self.config.pool_account)?;
        self.state.reward_reserve = self
            .state
            .reward_reserve
            .checked_add(received)
            .ok_or(WrapperError::Overflow)?;

        check!(
            self.state.reward_reserve >= owed,
            WrapperError::InsufficientRewardReserve {
                available: self.state.reward_reserve,
                requested: owed,
            }
        );

        // 5. Forward exactly what this account is owed
        self.state.reward_reserve -= owed;
        if let Err(err) = protocol.transfer_reward(&to, owed) {
            self.state.reward_reserve += owed;
            return Err(err);
        }

        self.events.emit(WrapperEvent::RewardClaimed {
            account: src,
            recipient: to,
            amount: owed,
            timestamp: ctx.timestamp,
        });

        Ok(owed)
    }

    // ============ Approvals ============

    /// Grant or revoke `operator`'s standing approval over the caller
    pub fn allow(&mut self, ctx: &CallContext, operator: Address, approved: bool) {
        if approved {
            self.state.allowances.insert((ctx.caller, operator));
        } else {
            self.state.allowances.remove(&(ctx.caller, operator));
        }

        self.events.emit(WrapperEvent::Approval {
            owner: ctx.caller,
            operator,
            approved,
            timestamp: ctx.timestamp,
        });
    }

    /// True if `owner` approved `operator`
    pub fn is_allowed(&self, owner: &Address, operator: &Address) -> bool {
        self.state.allowances.contains(&(*owner, *operator))
    }

    /// True if `operator` may act for `owner`
    pub fn has_permission(&self, owner: &Address, operator: &Address) -> bool {
        owner == operator || self.is_allowed(owner, operator)
    }

    // ============ Views ============

    /// Share balance
    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.state.account(owner).shares()
    }

    /// Total outstanding shares
    pub fn total_supply(&self) -> u64 {
        self.state.share_supply
    }

    pub fn account(&self, owner: &Address) -> Account {
        self.state.account(owner)
    }

    /// Fresh index snapshot for the pooled account
    pub fn snapshot<P: PooledProtocol + ?Sized>(&self, protocol: &mut P) -> WrapperResult<GlobalIndexSnapshot> {
        sync(protocol, &self.config.pool_account)
    }

    /// Underlying attributable to `owner` at the current index
    pub fn underlying_balance_of<P: PooledProtocol>(&self, protocol: &mut P, owner: &Address) -> WrapperResult<u64> {
        let snapshot = self.snapshot(protocol)?;
        self.attributable(&self.state.account(owner), &snapshot)
    }

    /// Underlying per share, 18 decimals; 1.0 while no shares exist
    pub fn exchange_rate<P: PooledProtocol>(&self, protocol: &mut P) -> WrapperResult<u128> {
        let snapshot = self.snapshot(protocol)?;
        exchange_rate(snapshot.pooled_underlying_balance, self.state.share_supply)
    }

    /// Settled plus pending rewards, without settling
    pub fn reward_owed<P: PooledProtocol>(&self, protocol: &mut P, owner: &Address) -> WrapperResult<u64> {
        let snapshot = self.snapshot(protocol)?;
        let account = self.state.account(owner);
        let pending = tracking_accrual(
            account.principal,
            account.tracking_index_snapshot,
            snapshot.tracking_index,
            self.accrual_descale,
            self.reward_rescale,
        )?;
        account
            .accrued_reward_units
            .checked_add(pending)
            .ok_or(WrapperError::Overflow)
    }

    /// Present value of the pooled position
    pub fn total_underlying<P: PooledProtocol>(&self, protocol: &mut P) -> WrapperResult<u64> {
        Ok(self.snapshot(protocol)?.pooled_underlying_balance)
    }

    // ============ Internals ============

    /// Present value of the account's principal, capped by its pro-rata
    /// share of what the pool actually holds
    ///
    /// Also capped so the pool's principal debit for the amount never
    /// exceeds the account's principal.
    fn attributable(&self, account: &Account, snapshot: &GlobalIndexSnapshot) -> WrapperResult<u64> {
        let pooled = snapshot.pooled_underlying_balance;
        let value = present_value(account.principal, snapshot.supply_index)?;
        let pool_share = pro_rata_share(pooled, account.shares(), self.state.share_supply)?;

        let pool_principal = principal_value_up(pooled, snapshot.supply_index)?;
        let left_behind = present_value_up(
            pool_principal.saturating_sub(account.principal.max(0)),
            snapshot.supply_index,
        )?;
        let backed = pooled.saturating_sub(left_behind);

        Ok(value.min(pool_share).min(backed))
    }

    /// Accrue `owner`'s rewards up to the snapshot's tracking index and
    /// store the result
    fn settle(&mut self, owner: &Address, snapshot: &GlobalIndexSnapshot, timestamp: u64) -> WrapperResult<Account> {
        let mut account = self.state.account(owner);
        let newly_accrued = tracking_accrual(
            account.principal,
            account.tracking_index_snapshot,
            snapshot.tracking_index,
            self.accrual_descale,
            self.reward_rescale,
        )?;

        account.accrued_reward_units = account
            .accrued_reward_units
            .checked_add(newly_accrued)
            .ok_or(WrapperError::Overflow)?;
        account.tracking_index_snapshot = snapshot.tracking_index;
        // Rows are created by a credit, never by settlement alone
        if !account.is_empty() || self.state.accounts.contains_key(owner) {
            self.state.accounts.insert(*owner, account);
        }

        if newly_accrued > 0 {
            self.events.emit(WrapperEvent::RewardsAccrued {
                account: *owner,
                newly_accrued,
                tracking_index: snapshot.tracking_index,
                timestamp,
            });
        }

        Ok(account)
    }

    fn checkpoint(&self, touched: &[Address]) -> Checkpoint {
        Checkpoint {
            accounts: touched
                .iter()
                .map(|owner| (*owner, self.state.accounts.get(owner).copied()))
                .collect(),
            share_supply: self.state.share_supply,
            events: self.events.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        // Reverse order so a duplicated address ends on its oldest value
        for (owner, account) in checkpoint.accounts.into_iter().rev() {
            match account {
                Some(account) => {
                    self.state.accounts.insert(owner, account);
                }
                None => {
                    self.state.accounts.remove(&owner);
                }
            }
        }
        self.state.share_supply = checkpoint.share_supply;
        self.events.truncate(checkpoint.events);
    }

    /// Run `op`, undoing its account and supply changes if it fails
    fn atomically<T, F>(&mut self, touched: &[Address], op: F) -> WrapperResult<T>
    where
        F: FnOnce(&mut Self) -> WrapperResult<T>,
    {
        let checkpoint = self.checkpoint(touched);
        let result = op(self);
        if result.is_err() {
            self.restore(checkpoint);
        }
        result
    }
}

// ============ Tests ============
