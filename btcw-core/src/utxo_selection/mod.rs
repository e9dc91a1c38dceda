//! UTXO selection module
//!
//! Decides which unspent outputs of the source address fund a transfer.
//!
//! # Module Structure
//!
//! - `types.rs` - Selection result, phases and search options
//! - `selector.rs` - The three-phase [`CoinSelector`](selector::CoinSelector)
//! - `strategies/` - Fallback searches used by phase 3
//!   - `branch_and_bound.rs` - Deterministic minimal-input search (default)
//!   - `randomized.rs` - Bounded random shuffles with an explicit seed
//!
//! # Security Considerations
//!
//! The selector only reads the outputs it is given. It does not track
//! reservations, so two builds running at once against the same address can
//! pick the same outputs; callers must serialize transfers per address.

pub mod selector;
pub mod strategies;
pub mod types;

pub use selector::CoinSelector;
pub use types::{SearchKind, SelectionOptions, SelectionPhase, SelectionResult};
