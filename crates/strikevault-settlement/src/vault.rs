//! Collateral vault: the single writer for one option series.
//!
//! Every mutating call follows the same order:
//! 1. Latch time-driven expiry, then check the series state
//! 2. Compute every resulting amount with checked math
//! 3. Verify balances, locked collateral, pools, and custody
//! 4. Make the one fallible pull from the caller (if any)
//! 5. Pay out, undoing the pull if a payout is rejected
//!    (`withdraw` instead keeps a rejected leg as owed to the caller)
//! 6. Commit pools, locked book, and option ledger, then issue a receipt
//!
//! All of it runs under the vault's write lock, so operations never
//! interleave. Nothing before step 4 has side effects, and step 6 cannot
//! fail for a reason step 3 did not already rule out.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use strikevault_ledger::{FungibleAsset, OptionLedger};
use strikevault_types::{
    Address, Amount, ReceiptKind, Result, Series, SeriesConfig, SeriesState, StrikevaultError,
    VaultReceipt, amount,
};

use crate::clock::{SeriesClock, TimeSource};
use crate::collateral::CollateralBook;
use crate::conservation::{ConservationCheck, MinterPosition, VaultSnapshot};
use crate::engine::{SettlementEngine, WithdrawalAmounts};

/// Everything an operation may mutate.
struct VaultState {
    options: OptionLedger,
    clock: SeriesClock,
    book: CollateralBook,
    strike_pool: Amount,
    underlying_pool: Amount,
    /// Settled withdrawals whose transfer was rejected.
    owed: BTreeMap<Address, WithdrawalAmounts>,
    next_sequence: u64,
}

impl VaultState {
    fn receipt(
        &mut self,
        series: &Series,
        kind: ReceiptKind,
        caller: Address,
        now: DateTime<Utc>,
    ) -> VaultReceipt {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        VaultReceipt::new(sequence, series.id, kind, caller, now)
    }
}

/// Pools, locked collateral, and option units of one series.
pub struct CollateralVault {
    series: Series,
    address: Address,
    engine: SettlementEngine,
    strike: Arc<dyn FungibleAsset>,
    underlying: Arc<dyn FungibleAsset>,
    time: Arc<dyn TimeSource>,
    state: RwLock<VaultState>,
}

impl CollateralVault {
    /// One-time setup of a vault for `series`.
    ///
    /// # Errors
    /// Returns `InvalidSeries` if the series is malformed or the assets do
    /// not match the identities and decimals it records.
    pub fn initialize(
        series: Series,
        strike: Arc<dyn FungibleAsset>,
        underlying: Arc<dyn FungibleAsset>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        series.validate()?;
        for (role, recorded, asset) in [
            ("strike", &series.strike, &strike),
            ("underlying", &series.underlying, &underlying),
        ] {
            let actual = asset.info();
            if actual != *recorded {
                return Err(StrikevaultError::InvalidSeries {
                    reason: format!(
                        "{role} asset is {} ({} decimals) but series records {} ({} decimals)",
                        actual.symbol, actual.decimals, recorded.symbol, recorded.decimals
                    ),
                });
            }
        }
        let engine = SettlementEngine::for_series(&series)?;
        let address = series.vault_address();
        let state = VaultState {
            options: OptionLedger::new(series.name.clone(), series.symbol.clone()),
            clock: SeriesClock::new(series.expiration.clone()),
            book: CollateralBook::new(),
            strike_pool: 0,
            underlying_pool: 0,
            owed: BTreeMap::new(),
            next_sequence: 0,
        };

        tracing::info!(
            series = %series.id,
            symbol = %series.symbol,
            vault = %address,
            strike = %series.strike.symbol,
            underlying = %series.underlying.symbol,
            strike_ratio = %series.strike_ratio,
            expires_at = ?series.expiration.expires_at,
            "Series initialized"
        );

        Ok(Self {
            series,
            address,
            engine,
            strike,
            underlying,
            time,
            state: RwLock::new(state),
        })
    }

    /// Build the series from operator configuration, then initialize.
    pub fn from_config(
        config: SeriesConfig,
        strike: Arc<dyn FungibleAsset>,
        underlying: Arc<dyn FungibleAsset>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        let series = config.into_series(underlying.info(), strike.info())?;
        Self::initialize(series, strike, underlying, time)
    }

    // =================================================================
    // Series operations
    // =================================================================

    /// Lock `amount × strike_ratio` of strike and issue `amount` options.
    ///
    /// # Errors
    /// - `PreconditionFailed` once expired
    /// - `InvalidAmount` for zero
    /// - `InsufficientAllowance` / `InsufficientBalance` from the strike pull
    /// - `ArithmeticOverflow`
    pub fn mint(&self, caller: Address, amount: Amount) -> Result<VaultReceipt> {
        let now = self.time.now();
        let mut state = self.state.write();
        self.observe_expiry(&mut state, now);
        self.mint_locked(&mut state, caller, amount, now)
            .inspect_err(|e| self.rejected("mint", &caller, amount, e))
    }

    fn mint_locked(
        &self,
        state: &mut VaultState,
        caller: Address,
        options: Amount,
        now: DateTime<Utc>,
    ) -> Result<VaultReceipt> {
        state.clock.ensure_not_expired("mint", now)?;
        if options == 0 {
            return Err(StrikevaultError::InvalidAmount);
        }
        let cost = self.engine.collateral_for(options)?;
        let units = SettlementEngine::option_units(options)?;
        let strike_pool = amount::add(state.strike_pool, cost, "strike pool")?;
        amount::add(state.options.total_supply(), units, "option supply")?;
        state.book.ensure_can_lock(&caller, cost)?;

        self.strike
            .transfer_from(self.address, caller, self.address, cost)?;

        state.strike_pool = strike_pool;
        state.book.lock(caller, cost)?;
        state.options.mint(caller, units)?;

        let mut receipt = state.receipt(&self.series, ReceiptKind::Minted, caller, now);
        receipt.option_units = units;
        receipt.strike_in = cost;

        tracing::info!(
            series = %self.series.id,
            seq = receipt.sequence,
            caller = %caller.short(),
            options = %options,
            strike_locked = %cost,
            strike_pool = %state.strike_pool,
            total_locked = %state.book.total_locked(),
            "Options minted"
        );
        Ok(receipt)
    }

    /// Return `amount` options and unlock the strike they were minted with.
    ///
    /// The cap is the caller's own locked contribution, not their option
    /// balance.
    ///
    /// # Errors
    /// - `PreconditionFailed` once expired
    /// - `InvalidAmount` for zero
    /// - `InsufficientBalance` if the caller holds too few option units
    /// - `InsufficientLocked` if the caller locked too little strike
    /// - `InsufficientLiquidity` if the pool or custody is short
    pub fn burn(&self, caller: Address, amount: Amount) -> Result<VaultReceipt> {
        let now = self.time.now();
        let mut state = self.state.write();
        self.observe_expiry(&mut state, now);
        self.burn_locked(&mut state, caller, amount, now)
            .inspect_err(|e| self.rejected("burn", &caller, amount, e))
    }

    fn burn_locked(
        &self,
        state: &mut VaultState,
        caller: Address,
        options: Amount,
        now: DateTime<Utc>,
    ) -> Result<VaultReceipt> {
        state.clock.ensure_not_expired("burn", now)?;
        if options == 0 {
            return Err(StrikevaultError::InvalidAmount);
        }
        let units = SettlementEngine::option_units(options)?;
        let refund = self.engine.collateral_for(options)?;

        let held = state.options.balance_of(&caller);
        if held < units {
            return Err(StrikevaultError::InsufficientBalance {
                needed: units,
                available: held,
            });
        }
        state.book.ensure_can_unlock(&caller, refund)?;
        self.ensure_strike_payable(state, refund)?;

        self.strike.transfer(self.address, caller, refund)?;

        state.strike_pool -= refund;
        state.book.unlock(&caller, refund)?;
        state.options.burn(caller, units)?;

        let mut receipt = state.receipt(&self.series, ReceiptKind::Burned, caller, now);
        receipt.option_units = units;
        receipt.strike_out = refund;

        tracing::info!(
            series = %self.series.id,
            seq = receipt.sequence,
            caller = %caller.short(),
            options = %options,
            strike_refunded = %refund,
            strike_pool = %state.strike_pool,
            total_locked = %state.book.total_locked(),
            "Options burned"
        );
        Ok(receipt)
    }

    /// Exercise `amount` options: underlying in, strike out, units burned.
    ///
    /// Any holder may exercise. Locked records are never touched.
    ///
    /// # Errors
    /// - `PreconditionFailed` once expired
    /// - `InvalidAmount` for zero
    /// - `InsufficientBalance` if the caller holds too few option units
    /// - `InsufficientLiquidity` if the strike pool or custody is short
    /// - `InsufficientAllowance` / `InsufficientBalance` from the underlying pull
    pub fn exchange(&self, caller: Address, amount: Amount) -> Result<VaultReceipt> {
        let now = self.time.now();
        let mut state = self.state.write();
        self.observe_expiry(&mut state, now);
        self.exchange_locked(&mut state, caller, amount, now)
            .inspect_err(|e| self.rejected("exchange", &caller, amount, e))
    }

    fn exchange_locked(
        &self,
        state: &mut VaultState,
        caller: Address,
        options: Amount,
        now: DateTime<Utc>,
    ) -> Result<VaultReceipt> {
        state.clock.ensure_not_expired("exchange", now)?;
        if options == 0 {
            return Err(StrikevaultError::InvalidAmount);
        }
        let exercise = self.engine.exercise(options)?;

        let held = state.options.balance_of(&caller);
        if held < exercise.option_units {
            return Err(StrikevaultError::InsufficientBalance {
                needed: exercise.option_units,
                available: held,
            });
        }
        self.ensure_strike_payable(state, exercise.strike_out)?;
        let underlying_pool = amount::add(
            state.underlying_pool,
            exercise.underlying_in,
            "underlying pool",
        )?;

        self.underlying
            .transfer_from(self.address, caller, self.address, exercise.underlying_in)?;
        if let Err(payout_err) = self
            .strike
            .transfer(self.address, caller, exercise.strike_out)
        {
            return Err(self.refund_underlying(caller, exercise.underlying_in, payout_err));
        }

        state.underlying_pool = underlying_pool;
        state.strike_pool -= exercise.strike_out;
        state.options.burn(caller, exercise.option_units)?;

        let mut receipt = state.receipt(&self.series, ReceiptKind::Exercised, caller, now);
        receipt.option_units = exercise.option_units;
        receipt.underlying_in = exercise.underlying_in;
        receipt.strike_out = exercise.strike_out;

        tracing::info!(
            series = %self.series.id,
            seq = receipt.sequence,
            caller = %caller.short(),
            options = %options,
            underlying_in = %exercise.underlying_in,
            strike_out = %exercise.strike_out,
            strike_pool = %state.strike_pool,
            underlying_pool = %state.underlying_pool,
            "Options exercised"
        );
        Ok(receipt)
    }

    /// Undo an exercise pull after the strike payout was rejected.
    fn refund_underlying(
        &self,
        caller: Address,
        pulled: Amount,
        payout_err: StrikevaultError,
    ) -> StrikevaultError {
        match self.underlying.transfer(self.address, caller, pulled) {
            Ok(()) => {
                tracing::error!(
                    series = %self.series.id,
                    caller = %caller.short(),
                    underlying_refunded = %pulled,
                    error = %payout_err,
                    "Strike payout rejected, underlying pull reversed"
                );
                payout_err
            }
            Err(refund_err) => {
                tracing::error!(
                    series = %self.series.id,
                    caller = %caller.short(),
                    underlying_stranded = %pulled,
                    payout_error = %payout_err,
                    refund_error = %refund_err,
                    "Strike payout rejected and underlying refund failed"
                );
                StrikevaultError::InvariantViolation {
                    reason: format!(
                        "exercise by {caller} pulled {pulled} underlying that could not be returned"
                    ),
                }
            }
        }
    }

    /// Expire the series on behalf of `caller`.
    ///
    /// # Errors
    /// - `AlreadyExpired` if it already has, latched or by time
    /// - `ExpirationDenied` if `caller` is not the series admin
    pub fn force_expiration(&self, caller: Address) -> Result<VaultReceipt> {
        let now = self.time.now();
        let mut state = self.state.write();
        self.observe_expiry(&mut state, now);
        if let Err(e) = state.clock.force(&caller, now) {
            self.rejected("force_expiration", &caller, 0, &e);
            return Err(e);
        }
        let receipt = state.receipt(&self.series, ReceiptKind::Expired, caller, now);

        tracing::info!(
            series = %self.series.id,
            seq = receipt.sequence,
            caller = %caller.short(),
            strike_pool = %state.strike_pool,
            underlying_pool = %state.underlying_pool,
            total_locked = %state.book.total_locked(),
            "Series expired by admin"
        );
        Ok(receipt)
    }

    /// Pay the caller their locked share of both pools, plus anything
    /// still owed from an earlier withdrawal.
    ///
    /// The locked record is settled as soon as at least one payout leg
    /// goes through. A leg the asset rejects is kept as an owed balance
    /// and paid by the caller's next `withdraw`, so nothing is paid twice.
    /// An address with nothing locked or owed gets an empty receipt.
    ///
    /// # Errors
    /// - `PreconditionFailed` before expiry
    /// - `InsufficientLiquidity` if custody no longer covers the payout
    /// - the asset's error if every payout leg was rejected
    pub fn withdraw(&self, caller: Address) -> Result<VaultReceipt> {
        let now = self.time.now();
        let mut state = self.state.write();
        self.observe_expiry(&mut state, now);
        self.withdraw_locked(&mut state, caller, now)
            .inspect_err(|e| self.rejected("withdraw", &caller, 0, e))
    }

    fn withdraw_locked(
        &self,
        state: &mut VaultState,
        caller: Address,
        now: DateTime<Utc>,
    ) -> Result<VaultReceipt> {
        state.clock.ensure_expired("withdraw", now)?;

        let locked = state.book.locked_of(&caller);
        let owed = state.owed.get(&caller).copied().unwrap_or_default();
        if locked == 0 && owed == WithdrawalAmounts::default() {
            let receipt = state.receipt(&self.series, ReceiptKind::Withdrawn, caller, now);
            tracing::debug!(
                series = %self.series.id,
                seq = receipt.sequence,
                caller = %caller.short(),
                "Nothing locked, empty withdrawal"
            );
            return Ok(receipt);
        }

        let payout = if locked == 0 {
            WithdrawalAmounts::default()
        } else {
            SettlementEngine::withdrawal(
                state.strike_pool,
                state.underlying_pool,
                locked,
                state.book.total_locked(),
            )?
        };
        ensure_covers(state.strike_pool, payout.strike)?;
        ensure_covers(state.underlying_pool, payout.underlying)?;
        let due = WithdrawalAmounts {
            strike: amount::add(payout.strike, owed.strike, "strike due")?,
            underlying: amount::add(payout.underlying, owed.underlying, "underlying due")?,
        };
        ensure_covers(self.strike.balance_of(&self.address), due.strike)?;
        ensure_covers(self.underlying.balance_of(&self.address), due.underlying)?;

        let strike_paid = self.pay(self.strike.as_ref(), caller, due.strike);
        let underlying_paid = self.pay(self.underlying.as_ref(), caller, due.underlying);
        let still_owed = WithdrawalAmounts {
            strike: if strike_paid.is_err() { due.strike } else { 0 },
            underlying: if underlying_paid.is_err() {
                due.underlying
            } else {
                0
            },
        };
        let paid = WithdrawalAmounts {
            strike: due.strike - still_owed.strike,
            underlying: due.underlying - still_owed.underlying,
        };
        if paid == WithdrawalAmounts::default() {
            // Nothing moved, so nothing is committed.
            strike_paid?;
            underlying_paid?;
        } else {
            for (leg, result) in [("strike", strike_paid), ("underlying", underlying_paid)] {
                if let Err(e) = result {
                    tracing::error!(
                        series = %self.series.id,
                        caller = %caller.short(),
                        leg,
                        error = %e,
                        "Withdrawal payout rejected, kept as owed"
                    );
                }
            }
        }

        state.book.settle(&caller)?;
        state.strike_pool -= payout.strike;
        state.underlying_pool -= payout.underlying;
        if still_owed == WithdrawalAmounts::default() {
            state.owed.remove(&caller);
        } else {
            state.owed.insert(caller, still_owed);
        }

        let mut receipt = state.receipt(&self.series, ReceiptKind::Withdrawn, caller, now);
        receipt.strike_out = paid.strike;
        receipt.underlying_out = paid.underlying;

        tracing::info!(
            series = %self.series.id,
            seq = receipt.sequence,
            caller = %caller.short(),
            locked = %locked,
            strike_out = %paid.strike,
            underlying_out = %paid.underlying,
            strike_owed = %still_owed.strike,
            underlying_owed = %still_owed.underlying,
            strike_pool = %state.strike_pool,
            underlying_pool = %state.underlying_pool,
            total_locked = %state.book.total_locked(),
            "Collateral withdrawn"
        );
        Ok(receipt)
    }

    // =================================================================
    // Option token surface (available in every state)
    // =================================================================

    pub fn transfer(&self, caller: Address, to: Address, amount: Amount) -> Result<()> {
        let now = self.time.now();
        let mut state = self.state.write();
        self.observe_expiry(&mut state, now);
        state.options.transfer(caller, to, amount)
    }

    pub fn approve(&self, owner: Address, spender: Address, amount: Amount) {
        let now = self.time.now();
        let mut state = self.state.write();
        self.observe_expiry(&mut state, now);
        state.options.approve(owner, spender, amount);
    }

    pub fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let now = self.time.now();
        let mut state = self.state.write();
        self.observe_expiry(&mut state, now);
        state.options.transfer_from(spender, from, to, amount)
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn name(&self) -> &str {
        &self.series.name
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.series.symbol
    }

    /// Option unit decimals, always 18.
    #[must_use]
    pub fn decimals(&self) -> u8 {
        self.series.option_decimals()
    }

    #[must_use]
    pub fn series(&self) -> &Series {
        &self.series
    }

    /// Custody address at the strike and underlying assets.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.state().is_expired()
    }

    #[must_use]
    pub fn state(&self) -> SeriesState {
        let now = self.time.now();
        self.state.read().clock.state_at(now)
    }

    /// Strike currently pooled.
    #[must_use]
    pub fn strike_balance(&self) -> Amount {
        self.state.read().strike_pool
    }

    /// Underlying currently pooled.
    #[must_use]
    pub fn underlying_balance(&self) -> Amount {
        self.state.read().underlying_pool
    }

    #[must_use]
    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.state.read().options.balance_of(owner)
    }

    #[must_use]
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.state.read().options.allowance(owner, spender)
    }

    #[must_use]
    pub fn total_supply(&self) -> Amount {
        self.state.read().options.total_supply()
    }

    #[must_use]
    pub fn locked_of(&self, minter: &Address) -> Amount {
        self.state.read().book.locked_of(minter)
    }

    #[must_use]
    pub fn total_locked(&self) -> Amount {
        self.state.read().book.total_locked()
    }

    /// Withdrawal payout settled for `minter` but not yet delivered.
    #[must_use]
    pub fn owed_of(&self, minter: &Address) -> WithdrawalAmounts {
        self.state
            .read()
            .owed
            .get(minter)
            .copied()
            .unwrap_or_default()
    }

    /// Consistent copy of the vault's state.
    #[must_use]
    pub fn snapshot(&self) -> VaultSnapshot {
        let now = self.time.now();
        let state = self.state.read();
        self.snapshot_of(&state, now)
    }

    /// Check conservation against live state and actual custody.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if any invariant fails.
    pub fn verify_invariants(&self) -> Result<()> {
        let now = self.time.now();
        let state = self.state.read();
        let snapshot = self.snapshot_of(&state, now);
        let strike_custody = self.strike.balance_of(&self.address);
        let underlying_custody = self.underlying.balance_of(&self.address);
        ConservationCheck::verify(&snapshot, strike_custody, underlying_custody)
            .inspect_err(|e| {
                tracing::error!(series = %self.series.id, error = %e, "Conservation check failed");
            })
    }

    // =================================================================
    // Internals
    // =================================================================

    fn snapshot_of(&self, state: &VaultState, now: DateTime<Utc>) -> VaultSnapshot {
        let mut positions: BTreeMap<Address, MinterPosition> = BTreeMap::new();
        for (address, locked) in state.book.entries() {
            positions
                .entry(*address)
                .or_insert_with(|| empty_position(*address))
                .locked = *locked;
        }
        for (address, options) in state.options.holders() {
            positions
                .entry(*address)
                .or_insert_with(|| empty_position(*address))
                .options = *options;
        }
        VaultSnapshot {
            series_id: self.series.id,
            state: state.clock.state_at(now),
            strike_ratio: self.engine.strike_ratio(),
            strike_pool: state.strike_pool,
            underlying_pool: state.underlying_pool,
            owed_strike: state
                .owed
                .values()
                .fold(0, |acc, o| acc.saturating_add(o.strike)),
            owed_underlying: state
                .owed
                .values()
                .fold(0, |acc, o| acc.saturating_add(o.underlying)),
            total_locked: state.book.total_locked(),
            option_supply: state.options.total_supply(),
            positions: positions.into_values().collect(),
            taken_at: now,
        }
    }

    fn observe_expiry(&self, state: &mut VaultState, now: DateTime<Utc>) {
        if state.clock.observe(now) {
            tracing::info!(
                series = %self.series.id,
                expires_at = ?state.clock.policy().expires_at,
                strike_pool = %state.strike_pool,
                underlying_pool = %state.underlying_pool,
                "Series expired by time"
            );
        }
    }

    /// Both the pool and the vault's real custody must cover `needed`.
    fn ensure_strike_payable(&self, state: &VaultState, needed: Amount) -> Result<()> {
        ensure_covers(state.strike_pool, needed)?;
        ensure_covers(self.strike.balance_of(&self.address), needed)
    }

    fn pay(&self, asset: &dyn FungibleAsset, to: Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        asset.transfer(self.address, to, amount)
    }

    fn rejected(
        &self,
        operation: &'static str,
        caller: &Address,
        amount: Amount,
        err: &StrikevaultError,
    ) {
        tracing::warn!(
            series = %self.series.id,
            operation,
            caller = %caller.short(),
            amount = %amount,
            error = %err,
            "Vault operation rejected"
        );
    }
}

fn ensure_covers(available: Amount, needed: Amount) -> Result<()> {
    if available < needed {
        return Err(StrikevaultError::InsufficientLiquidity { needed, available });
    }
    Ok(())
}

fn empty_position(address: Address) -> MinterPosition {
    MinterPosition {
        address,
        locked: 0,
        options: 0,
    }
}
