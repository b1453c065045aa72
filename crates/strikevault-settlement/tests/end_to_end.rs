//! End-to-end tests for one option series.
//!
//! A DAI:USDC series with a strike ratio of 1.000001 USDC per option:
//! - `usdc_holder` starts with 100 USDC and is the series admin
//! - `dai_holder` starts with 100 DAI
//! - `other_holder` starts empty
//!
//! Each test drives the vault through its public surface and checks the
//! holders' balances at all three assets, then the conservation
//! invariants.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use strikevault_ledger::{FungibleAsset, Token};
use strikevault_settlement::{CollateralVault, ManualTimeSource};
use strikevault_types::{
    Address, Amount, ExpirationPolicy, ReceiptKind, SeriesConfig, SeriesState, StrikevaultError,
    VaultReceipt, constants,
};

const ONE: Amount = constants::OPTION_UNIT;
const RATIO: Amount = 1_000_001;
const HUNDRED_USDC: Amount = 100_000_000;
const HUNDRED_DAI: Amount = 100 * ONE;

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-06-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Two assets, three holders, one vault.
struct World {
    usdc: Arc<Token>,
    dai: Arc<Token>,
    time: Arc<ManualTimeSource>,
    vault: CollateralVault,
    usdc_holder: Address,
    dai_holder: Address,
    other_holder: Address,
}

impl World {
    fn new() -> Self {
        Self::with_policy(ExpirationPolicy::manual)
    }

    fn with_policy(policy: impl FnOnce(Address) -> ExpirationPolicy) -> Self {
        let usdc_holder = Address::random();
        let dai_holder = Address::random();
        let other_holder = Address::random();
        let usdc =
            Arc::new(Token::standalone("Fake USDC", "USDC", 6, HUNDRED_USDC, usdc_holder).unwrap());
        let dai =
            Arc::new(Token::standalone("Fake DAI", "DAI", 18, HUNDRED_DAI, dai_holder).unwrap());
        let time = Arc::new(ManualTimeSource::new(t0()));
        let config = SeriesConfig {
            name: "oh DAI:USDC".into(),
            symbol: "OH:DAI:USDC".into(),
            underlying_decimals: 18,
            strike_ratio: Some(RATIO.to_string()),
            strike_price: None,
            expiration: policy(usdc_holder),
        };
        let vault =
            CollateralVault::from_config(config, usdc.clone(), dai.clone(), time.clone()).unwrap();
        Self {
            usdc,
            dai,
            time,
            vault,
            usdc_holder,
            dai_holder,
            other_holder,
        }
    }

    /// (option units, USDC, DAI) held by `account`.
    fn balances(&self, account: &Address) -> (Amount, Amount, Amount) {
        (
            self.vault.balance_of(account),
            self.usdc.balance_of(account),
            self.dai.balance_of(account),
        )
    }

    fn mint(&self, account: Address, options: Amount) -> VaultReceipt {
        self.usdc
            .approve(account, self.vault.address(), options * RATIO)
            .unwrap();
        self.vault.mint(account, options).unwrap()
    }

    fn exercise(&self, account: Address, options: Amount) -> VaultReceipt {
        self.dai
            .approve(account, self.vault.address(), options * ONE)
            .unwrap();
        self.vault.exchange(account, options).unwrap()
    }

    fn expire(&self) {
        self.vault.force_expiration(self.usdc_holder).unwrap();
        assert!(self.vault.has_expired());
    }

    fn assert_conserved(&self) {
        self.vault.verify_invariants().unwrap();
    }
}

// =====================================================================
// Before expiration
// =====================================================================

#[test]
fn e2e_option_decimals_fixed_at_18() {
    let w = World::new();
    assert_eq!(w.vault.decimals(), 18);
    assert_eq!(w.vault.series().strike.decimals, 6);
    assert!(!w.vault.has_expired());
}

#[test]
fn e2e_mint_requires_strike_allowance() {
    let w = World::new();
    let err = w.vault.mint(w.usdc_holder, 1).unwrap_err();
    assert!(matches!(err, StrikevaultError::InsufficientAllowance { .. }));
    assert_eq!(w.balances(&w.usdc_holder), (0, HUNDRED_USDC, 0));
    assert_eq!(w.vault.strike_balance(), 0);
    w.assert_conserved();
}

#[test]
fn e2e_mint_locks_strike() {
    let w = World::new();
    assert_eq!(w.balances(&w.usdc_holder), (0, HUNDRED_USDC, 0));
    assert_eq!(w.balances(&w.dai_holder), (0, 0, HUNDRED_DAI));

    let receipt = w.mint(w.usdc_holder, 1);

    assert_eq!(receipt.kind, ReceiptKind::Minted);
    assert_eq!(w.balances(&w.usdc_holder), (ONE, 98_999_999, 0));
    assert_eq!(w.balances(&w.dai_holder), (0, 0, HUNDRED_DAI));
    assert_eq!(w.vault.strike_balance(), 1_000_001);
    assert_eq!(w.vault.strike_balance().to_string(), "1000001");
    assert_eq!(w.vault.locked_of(&w.usdc_holder), RATIO);
    assert_eq!(w.vault.total_locked(), RATIO);
    w.assert_conserved();
}

#[test]
fn e2e_mint_then_burn_restores_everything() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);

    let receipt = w.vault.burn(w.usdc_holder, 1).unwrap();

    assert_eq!(receipt.strike_out, RATIO);
    assert_eq!(w.balances(&w.usdc_holder), (0, HUNDRED_USDC, 0));
    assert_eq!(w.balances(&w.dai_holder), (0, 0, HUNDRED_DAI));
    assert_eq!(w.vault.strike_balance(), 0);
    assert_eq!(w.vault.locked_of(&w.usdc_holder), 0);
    assert_eq!(w.vault.total_supply(), 0);
    w.assert_conserved();
}

#[test]
fn e2e_burn_capped_by_own_locked_collateral() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);

    // Fund another holder, let them mint, and send the option back.
    w.usdc
        .transfer(w.usdc_holder, w.other_holder, RATIO)
        .unwrap();
    assert_eq!(w.balances(&w.other_holder), (0, RATIO, 0));
    w.mint(w.other_holder, 1);
    assert_eq!(w.balances(&w.other_holder), (ONE, 0, 0));
    w.vault.transfer(w.other_holder, w.usdc_holder, ONE).unwrap();
    assert_eq!(w.balances(&w.usdc_holder), (2 * ONE, 97_999_998, 0));

    let err = w.vault.burn(w.usdc_holder, 2).unwrap_err();
    assert!(matches!(
        err,
        StrikevaultError::InsufficientLocked {
            needed: 2_000_002,
            locked: 1_000_001
        }
    ));
    assert_eq!(w.balances(&w.usdc_holder), (2 * ONE, 97_999_998, 0));
    assert_eq!(w.vault.strike_balance(), 2 * RATIO);
    w.assert_conserved();
}

#[test]
fn e2e_transferred_options_cannot_be_burned() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.vault.transfer(w.usdc_holder, w.other_holder, ONE).unwrap();

    assert_eq!(w.vault.locked_of(&w.other_holder), 0);
    assert_eq!(w.vault.locked_of(&w.usdc_holder), RATIO);

    let err = w.vault.burn(w.other_holder, 1).unwrap_err();
    assert!(matches!(err, StrikevaultError::InsufficientLocked { .. }));

    let err = w.vault.burn(w.usdc_holder, 1).unwrap_err();
    assert!(matches!(err, StrikevaultError::InsufficientBalance { .. }));

    assert_eq!(w.vault.strike_balance(), RATIO);
    w.assert_conserved();
}

#[test]
fn e2e_exercise_swaps_pool_composition() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.vault.transfer(w.usdc_holder, w.dai_holder, ONE).unwrap();
    assert_eq!(w.balances(&w.usdc_holder), (0, 98_999_999, 0));
    assert_eq!(w.balances(&w.dai_holder), (ONE, 0, HUNDRED_DAI));

    let receipt = w.exercise(w.dai_holder, 1);

    assert_eq!(receipt.kind, ReceiptKind::Exercised);
    assert_eq!(receipt.underlying_in, ONE);
    assert_eq!(receipt.strike_out, RATIO);
    assert_eq!(w.balances(&w.usdc_holder), (0, 98_999_999, 0));
    assert_eq!(w.balances(&w.dai_holder), (0, 1_000_001, 99 * ONE));
    assert_eq!(w.vault.strike_balance(), 0);
    assert_eq!(w.vault.underlying_balance(), 1_000_000_000_000_000_000);
    // Exercise never touches locked records.
    assert_eq!(w.vault.locked_of(&w.usdc_holder), RATIO);
    assert_eq!(w.vault.locked_of(&w.dai_holder), 0);
    assert_eq!(w.vault.total_locked(), RATIO);
    w.assert_conserved();
}

#[test]
fn e2e_exercise_without_underlying_allowance_changes_nothing() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.vault.transfer(w.usdc_holder, w.dai_holder, ONE).unwrap();
    let before = w.vault.snapshot();

    let err = w.vault.exchange(w.dai_holder, 1).unwrap_err();

    assert!(matches!(err, StrikevaultError::InsufficientAllowance { .. }));
    assert_eq!(w.vault.snapshot(), before);
    assert_eq!(w.balances(&w.dai_holder), (ONE, 0, HUNDRED_DAI));
    w.assert_conserved();
}

#[test]
fn e2e_burn_short_strike_custody_changes_nothing() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.usdc.transfer(w.vault.address(), w.other_holder, 1).unwrap();
    let before = w.vault.snapshot();

    let err = w.vault.burn(w.usdc_holder, 1).unwrap_err();
    assert!(matches!(
        err,
        StrikevaultError::InsufficientLiquidity { needed: RATIO, available }
            if available == RATIO - 1
    ));
    assert_eq!(w.vault.snapshot(), before);
    assert_eq!(w.balances(&w.usdc_holder), (ONE, HUNDRED_USDC - RATIO, 0));
    assert!(matches!(
        w.vault.verify_invariants(),
        Err(StrikevaultError::InvariantViolation { .. })
    ));
}

#[test]
fn e2e_exercise_short_strike_custody_changes_nothing() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.vault.transfer(w.usdc_holder, w.dai_holder, ONE).unwrap();
    w.usdc.transfer(w.vault.address(), w.other_holder, 1).unwrap();
    w.dai.approve(w.dai_holder, w.vault.address(), ONE).unwrap();
    let before = w.vault.snapshot();

    let err = w.vault.exchange(w.dai_holder, 1).unwrap_err();
    assert!(matches!(
        err,
        StrikevaultError::InsufficientLiquidity { needed: RATIO, available }
            if available == RATIO - 1
    ));
    assert_eq!(w.vault.snapshot(), before);
    assert_eq!(w.balances(&w.dai_holder), (ONE, 0, HUNDRED_DAI));
    assert_eq!(w.dai.balance_of(&w.vault.address()), 0);
}

#[test]
fn e2e_exercise_more_than_held_fails() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.dai
        .transfer(w.dai_holder, w.usdc_holder, 2 * ONE)
        .unwrap();
    w.dai
        .approve(w.usdc_holder, w.vault.address(), 2 * ONE)
        .unwrap();

    let err = w.vault.exchange(w.usdc_holder, 2).unwrap_err();
    assert!(matches!(err, StrikevaultError::InsufficientBalance { .. }));
    assert_eq!(w.vault.underlying_balance(), 0);
    assert_eq!(w.dai.balance_of(&w.usdc_holder), 2 * ONE);
}

#[test]
fn e2e_withdraw_before_expiry_fails() {
    let w = World::new();
    let err = w.vault.withdraw(w.usdc_holder).unwrap_err();
    assert!(matches!(
        err,
        StrikevaultError::PreconditionFailed {
            operation: "withdraw",
            state: SeriesState::NotExpired
        }
    ));
    assert!(!w.vault.has_expired());
}

#[test]
fn e2e_transfer_never_moves_locked_records() {
    let w = World::new();
    w.mint(w.usdc_holder, 3);
    w.vault.approve(w.usdc_holder, w.dai_holder, ONE);
    w.vault
        .transfer_from(w.dai_holder, w.usdc_holder, w.other_holder, ONE)
        .unwrap();
    w.vault.transfer(w.usdc_holder, w.dai_holder, ONE).unwrap();

    assert_eq!(w.vault.locked_of(&w.usdc_holder), 3 * RATIO);
    assert_eq!(w.vault.locked_of(&w.other_holder), 0);
    assert_eq!(w.vault.locked_of(&w.dai_holder), 0);
    assert_eq!(w.vault.allowance(&w.usdc_holder, &w.dai_holder), 0);
    w.assert_conserved();
}

// =====================================================================
// After expiration
// =====================================================================

#[test]
fn e2e_no_mint_burn_or_exchange_after_expiration() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.usdc
        .approve(w.usdc_holder, w.vault.address(), RATIO)
        .unwrap();
    w.expire();

    for (operation, result) in [
        ("mint", w.vault.mint(w.usdc_holder, 1)),
        ("burn", w.vault.burn(w.usdc_holder, 1)),
        ("exchange", w.vault.exchange(w.usdc_holder, 1)),
    ] {
        match result {
            Err(StrikevaultError::PreconditionFailed { operation: op, state }) => {
                assert_eq!(op, operation);
                assert_eq!(state, SeriesState::Expired);
            }
            other => panic!("{operation} after expiry returned {other:?}"),
        }
    }
    assert_eq!(w.balances(&w.usdc_holder), (ONE, 98_999_999, 0));
}

#[test]
fn e2e_transfer_allowed_after_expiration() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.expire();

    w.vault.transfer(w.usdc_holder, w.other_holder, ONE).unwrap();
    assert_eq!(w.vault.balance_of(&w.other_holder), ONE);
    w.assert_conserved();
}

#[test]
fn e2e_transfer_from_allowed_after_expiration() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.expire();

    w.vault.approve(w.usdc_holder, w.dai_holder, ONE);
    w.vault
        .transfer_from(w.dai_holder, w.usdc_holder, w.other_holder, ONE)
        .unwrap();
    assert_eq!(w.vault.balance_of(&w.other_holder), ONE);
    assert_eq!(w.vault.balance_of(&w.usdc_holder), 0);
}

#[test]
fn e2e_withdraw_with_nothing_locked() {
    let w = World::new();
    w.expire();

    let receipt = w.vault.withdraw(w.usdc_holder).unwrap();

    assert!(receipt.is_empty());
    assert_eq!(w.balances(&w.usdc_holder), (0, HUNDRED_USDC, 0));
    w.assert_conserved();
}

#[test]
fn e2e_withdraw_locked_strike_without_holding_options() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.vault.transfer(w.usdc_holder, w.other_holder, ONE).unwrap();
    w.expire();

    assert_eq!(w.balances(&w.usdc_holder), (0, 98_999_999, 0));
    w.vault.withdraw(w.usdc_holder).unwrap();
    assert_eq!(w.balances(&w.usdc_holder), (0, HUNDRED_USDC, 0));
    // Option units outlive the collateral they were minted against.
    assert_eq!(w.vault.balance_of(&w.other_holder), ONE);
    assert_eq!(w.vault.strike_balance(), 0);
    w.assert_conserved();
}

#[test]
fn e2e_withdraw_underlying_after_exercise_by_another_holder() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.vault.transfer(w.usdc_holder, w.dai_holder, ONE).unwrap();
    w.exercise(w.dai_holder, 1);
    assert_eq!(w.balances(&w.usdc_holder), (0, 98_999_999, 0));
    assert_eq!(w.balances(&w.dai_holder), (0, 1_000_001, 99 * ONE));
    w.expire();

    let receipt = w.vault.withdraw(w.usdc_holder).unwrap();

    assert_eq!(receipt.strike_out, 0);
    assert_eq!(receipt.underlying_out, ONE);
    assert_eq!(w.balances(&w.usdc_holder), (0, 98_999_999, ONE));
    assert_eq!(w.vault.underlying_balance(), 0);
    w.assert_conserved();
}

#[test]
fn e2e_withdraw_mix_of_strike_and_underlying() {
    let w = World::new();
    w.mint(w.usdc_holder, 3);
    assert_eq!(w.balances(&w.usdc_holder), (3 * ONE, 96_999_997, 0));
    assert_eq!(w.balances(&w.dai_holder), (0, 0, HUNDRED_DAI));

    w.vault.transfer(w.usdc_holder, w.dai_holder, ONE).unwrap();
    assert_eq!(w.balances(&w.usdc_holder), (2 * ONE, 96_999_997, 0));
    assert_eq!(w.balances(&w.dai_holder), (ONE, 0, HUNDRED_DAI));

    w.exercise(w.dai_holder, 1);
    assert_eq!(w.balances(&w.usdc_holder), (2 * ONE, 96_999_997, 0));
    assert_eq!(w.balances(&w.dai_holder), (0, 1_000_001, 99 * ONE));

    w.expire();
    w.vault.withdraw(w.usdc_holder).unwrap();

    assert_eq!(w.balances(&w.usdc_holder), (2 * ONE, 98_999_999, ONE));
    assert_eq!(w.vault.strike_balance(), 0);
    assert_eq!(w.vault.underlying_balance(), 0);
    assert_eq!(w.vault.total_locked(), 0);
    w.assert_conserved();
}

#[test]
fn e2e_withdraw_short_strike_custody_changes_nothing() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.expire();
    w.usdc.transfer(w.vault.address(), w.other_holder, 1).unwrap();
    let before = w.vault.snapshot();

    let err = w.vault.withdraw(w.usdc_holder).unwrap_err();
    assert!(matches!(
        err,
        StrikevaultError::InsufficientLiquidity { needed: RATIO, available }
            if available == RATIO - 1
    ));
    assert_eq!(w.vault.snapshot(), before);
    assert_eq!(w.vault.locked_of(&w.usdc_holder), RATIO);
    assert_eq!(w.balances(&w.usdc_holder), (ONE, HUNDRED_USDC - RATIO, 0));
}

#[test]
fn e2e_withdraw_short_underlying_custody_changes_nothing() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.vault.transfer(w.usdc_holder, w.dai_holder, ONE).unwrap();
    w.exercise(w.dai_holder, 1);
    w.expire();
    w.dai.transfer(w.vault.address(), w.other_holder, 1).unwrap();
    let before = w.vault.snapshot();

    let err = w.vault.withdraw(w.usdc_holder).unwrap_err();
    assert!(matches!(
        err,
        StrikevaultError::InsufficientLiquidity { needed: ONE, available }
            if available == ONE - 1
    ));
    assert_eq!(w.vault.snapshot(), before);
    assert_eq!(w.vault.underlying_balance(), ONE);
    assert_eq!(w.balances(&w.usdc_holder), (0, HUNDRED_USDC - RATIO, 0));
    assert!(matches!(
        w.vault.verify_invariants(),
        Err(StrikevaultError::InvariantViolation { .. })
    ));
}

#[test]
fn e2e_three_minters_share_pools_pro_rata() {
    let w = World::new();
    let a = w.usdc_holder;
    let b = Address::random();
    let c = Address::random();
    w.usdc.transfer(a, b, 2 * RATIO).unwrap();
    w.usdc.transfer(a, c, 4 * RATIO).unwrap();
    w.mint(a, 1);
    w.mint(b, 2);
    w.mint(c, 4);
    assert_eq!(w.vault.total_locked(), 7 * RATIO);

    // Three of C's options get exercised by the DAI holder.
    w.vault.transfer(c, w.dai_holder, 3 * ONE).unwrap();
    w.exercise(w.dai_holder, 3);
    assert_eq!(w.vault.strike_balance(), 4 * RATIO);
    assert_eq!(w.vault.underlying_balance(), 3 * ONE);
    w.expire();

    // floor(4000004 × 4/7), floor(3e18 × 4/7)
    let from_c = w.vault.withdraw(c).unwrap();
    assert_eq!(from_c.strike_out, 2_285_716);
    assert_eq!(from_c.underlying_out, 1_714_285_714_285_714_285);

    // floor(1714288 × 1/3), floor(1285714285714285715 × 1/3)
    let from_a = w.vault.withdraw(a).unwrap();
    assert_eq!(from_a.strike_out, 571_429);
    assert_eq!(from_a.underlying_out, 428_571_428_571_428_571);

    // The last minter takes what remains.
    let from_b = w.vault.withdraw(b).unwrap();
    assert_eq!(from_b.strike_out, 1_142_859);
    assert_eq!(from_b.underlying_out, 857_142_857_142_857_144);

    let receipts = [&from_a, &from_b, &from_c];
    assert_eq!(
        receipts.iter().map(|r| r.strike_out).sum::<Amount>(),
        4 * RATIO
    );
    assert_eq!(
        receipts.iter().map(|r| r.underlying_out).sum::<Amount>(),
        3 * ONE
    );
    assert_eq!(w.vault.strike_balance(), 0);
    assert_eq!(w.vault.underlying_balance(), 0);
    assert_eq!(w.vault.total_locked(), 0);
    assert_eq!(w.usdc.balance_of(&w.vault.address()), 0);
    assert_eq!(w.dai.balance_of(&w.vault.address()), 0);
    w.assert_conserved();
}

// =====================================================================
// Repeated calls and expiry policy
// =====================================================================

#[test]
fn e2e_second_withdraw_is_empty_success() {
    let w = World::new();
    w.mint(w.usdc_holder, 1);
    w.expire();

    let first = w.vault.withdraw(w.usdc_holder).unwrap();
    let second = w.vault.withdraw(w.usdc_holder).unwrap();

    assert_eq!(first.strike_out, RATIO);
    assert!(second.is_empty());
    assert!(second.sequence > first.sequence);
    assert_eq!(w.balances(&w.usdc_holder), (ONE, HUNDRED_USDC, 0));
    w.assert_conserved();
}

#[test]
fn e2e_second_force_expiration_is_an_error() {
    let w = World::new();
    let receipt = w.vault.force_expiration(w.usdc_holder).unwrap();
    assert_eq!(receipt.kind, ReceiptKind::Expired);

    let err = w.vault.force_expiration(w.usdc_holder).unwrap_err();
    assert!(matches!(err, StrikevaultError::AlreadyExpired));
    assert_eq!(w.vault.state(), SeriesState::Expired);
}

#[test]
fn e2e_only_admin_can_force_expiration() {
    let w = World::new();
    let err = w.vault.force_expiration(w.dai_holder).unwrap_err();
    assert!(matches!(
        err,
        StrikevaultError::ExpirationDenied { caller } if caller == w.dai_holder
    ));
    assert!(!w.vault.has_expired());
}

#[test]
fn e2e_series_expires_when_time_arrives() {
    let w = World::with_policy(|admin| {
        ExpirationPolicy::at(t0() + Duration::hours(1)).with_admin(admin)
    });
    w.mint(w.usdc_holder, 2);
    assert!(!w.vault.has_expired());

    w.time.advance(Duration::hours(1));

    assert!(w.vault.has_expired());
    assert_eq!(w.vault.snapshot().state, SeriesState::Expired);
    w.usdc
        .approve(w.usdc_holder, w.vault.address(), RATIO)
        .unwrap();
    assert!(matches!(
        w.vault.mint(w.usdc_holder, 1),
        Err(StrikevaultError::PreconditionFailed { .. })
    ));
    assert!(matches!(
        w.vault.force_expiration(w.usdc_holder),
        Err(StrikevaultError::AlreadyExpired)
    ));

    let receipt = w.vault.withdraw(w.usdc_holder).unwrap();
    assert_eq!(receipt.strike_out, 2 * RATIO);
    assert_eq!(w.balances(&w.usdc_holder), (2 * ONE, HUNDRED_USDC, 0));
    w.assert_conserved();
}

#[test]
fn e2e_admin_may_expire_before_the_instant() {
    let w = World::with_policy(|admin| {
        ExpirationPolicy::at(t0() + Duration::days(30)).with_admin(admin)
    });
    w.expire();
    assert!(w.vault.withdraw(w.dai_holder).unwrap().is_empty());
}

// =====================================================================
// Configuration, receipts, concurrency
// =====================================================================

#[test]
fn e2e_series_from_json_config() {
    let usdc_holder = Address::random();
    let usdc =
        Arc::new(Token::standalone("Fake USDC", "USDC", 6, HUNDRED_USDC, usdc_holder).unwrap());
    let dai = Arc::new(Token::standalone("Fake DAI", "DAI", 18, HUNDRED_DAI, usdc_holder).unwrap());
    let json = format!(
        r#"{{
            "name": "oh DAI:USDC",
            "symbol": "OH:DAI:USDC",
            "underlying_decimals": 18,
            "strike_price": "1.000001",
            "expiration": {{ "expires_at": "2026-12-31T00:00:00Z", "admin": "{usdc_holder}" }}
        }}"#
    );
    let config = SeriesConfig::from_json_str(&json).unwrap();
    let vault = CollateralVault::from_config(
        config,
        usdc,
        dai,
        Arc::new(ManualTimeSource::new(t0())),
    )
    .unwrap();

    assert_eq!(vault.series().strike_ratio, RATIO);
    assert_eq!(vault.series().expiration.admin, Some(usdc_holder));
    assert_eq!(vault.name(), "oh DAI:USDC");
    assert_eq!(vault.symbol(), "OH:DAI:USDC");
}

#[test]
fn e2e_config_with_wrong_underlying_decimals_rejected() {
    let holder = Address::random();
    let usdc = Arc::new(Token::standalone("Fake USDC", "USDC", 6, HUNDRED_USDC, holder).unwrap());
    let dai = Arc::new(Token::standalone("Fake DAI", "DAI", 18, HUNDRED_DAI, holder).unwrap());
    let config = SeriesConfig {
        name: "oh DAI:USDC".into(),
        symbol: "OH:DAI:USDC".into(),
        underlying_decimals: 6,
        strike_ratio: Some(RATIO.to_string()),
        strike_price: None,
        expiration: ExpirationPolicy::manual(holder),
    };
    let result =
        CollateralVault::from_config(config, usdc, dai, Arc::new(ManualTimeSource::new(t0())));
    assert!(matches!(result, Err(StrikevaultError::InvalidSeries { .. })));
}

#[test]
fn e2e_receipts_serialize_amounts_as_strings() {
    let w = World::new();
    let receipt = w.mint(w.usdc_holder, 1);
    let json = serde_json::to_value(&receipt).unwrap();
    assert_eq!(json["option_units"], "1000000000000000000");
    assert_eq!(json["strike_in"], "1000001");
    assert_eq!(json["kind"], "Minted");

    let back: VaultReceipt = serde_json::from_value(json).unwrap();
    assert_eq!(back, receipt);
}

#[test]
fn e2e_concurrent_mints_and_transfers_conserve() {
    let w = World::new();
    let minters: Vec<Address> = (0..8).map(|_| Address::random()).collect();
    for m in &minters {
        w.usdc.transfer(w.usdc_holder, *m, 5 * RATIO).unwrap();
        w.usdc.approve(*m, w.vault.address(), 5 * RATIO).unwrap();
    }

    std::thread::scope(|s| {
        for m in &minters {
            let w = &w;
            s.spawn(move || {
                for _ in 0..5 {
                    w.vault.mint(*m, 1).unwrap();
                    w.vault.transfer(*m, w.other_holder, ONE).unwrap();
                }
            });
        }
        s.spawn(|| {
            for _ in 0..50 {
                let snapshot = w.vault.snapshot();
                assert_eq!(
                    snapshot.strike_pool * ONE,
                    snapshot.option_supply * RATIO
                );
            }
        });
    });

    assert_eq!(w.vault.total_supply(), 40 * ONE);
    assert_eq!(w.vault.balance_of(&w.other_holder), 40 * ONE);
    assert_eq!(w.vault.total_locked(), 40 * RATIO);
    assert_eq!(w.vault.strike_balance(), 40 * RATIO);
    for m in &minters {
        assert_eq!(w.vault.locked_of(m), 5 * RATIO);
        assert_eq!(w.vault.balance_of(m), 0);
    }
    w.assert_conserved();
}
