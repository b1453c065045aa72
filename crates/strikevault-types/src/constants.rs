//! System-wide constants for the StrikeVault settlement ledger.

/// Decimal exponent of option units, independent of either asset.
pub const OPTION_DECIMALS: u8 = 18;

/// Option units per whole option (`10^OPTION_DECIMALS`).
pub const OPTION_UNIT: u128 = 1_000_000_000_000_000_000;

/// Largest decimal exponent whose power of ten still fits in a `u128`.
pub const MAX_ASSET_DECIMALS: u8 = 38;

/// Domain separator for deriving a vault's custody address.
pub const VAULT_ADDRESS_DOMAIN: &[u8] = b"strikevault:vault:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "StrikeVault";
