/// Balance holders and their lock. Requests are validated into events before the
/// balance is touched.
pub mod account;

/// Unique account number generation.
pub mod issuer;

/// Process-wide symmetric encryption of amounts and credentials.
pub mod cipher;

/// Directory of all accounts.
pub mod ledger;

/// Append-only, per-account transaction history with encrypted amounts.
pub mod audit;

/// Two-account transfers, locked in account number order.
pub mod transfer;

/// Typed requests decoded before they reach the ledger.
pub mod command;

/// Usernames, encrypted credentials and the user to account mapping.
pub mod directory;

/// Transaction processor interface, plus "in memory" implementation.
/// Coordinates deposits, withdrawals and transfers with the audit trail.
pub mod processor;

/// Layered settings: defaults, optional config file, then environment.
pub mod config;

/// `tracing` subscriber setup.
pub mod telemetry;

/// Script replay used by the binary. It lives in the library so the integration tests
/// can drive it too.
pub mod bin_utils;
