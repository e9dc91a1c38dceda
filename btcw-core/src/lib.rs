//! btcw core library
//!
//! Single-signature transaction assembly for UTXO chains: given the unspent
//! outputs of a source address, a destination, an amount and a fee rate, it
//! selects the outputs to spend, computes fee and change, and produces a
//! signed transaction ready for broadcast.
//!
//! # Modules
//!
//! - `types`: Unspent outputs, constants and the secret string wrapper
//! - `fee`: Fee rates and transaction size models
//! - `utxo_selection`: Three-phase coin selection and its fallback searches
//! - `assembler`: Unsigned transaction construction and change handling
//! - `signer`: P2PKH and P2WPKH signing and verification
//! - `transfer`: The end-to-end orchestrator
//! - `source`: Traits for the unspent output source, fee rate source and broadcaster
//! - `memory`: In-memory implementations of those traits
//! - `address`: Address to script resolution
//! - `keys`: Private key loading and address derivation
//! - `cancel`: Deadlines and cancellation
//! - `config`: Configuration management
//! - `logging`: Logging setup and sanitization helpers
//! - `error`: The crate error type
//!
//! # Security Considerations
//!
//! - Private keys are only borrowed by the signer and never logged
//! - Every failure is a typed error; nothing on a library path panics

/// Crate error type
pub mod error;

/// Core domain types
pub mod types;

/// Fee rates and size models
pub mod fee;

/// Address to script resolution
pub mod address;

/// Deadlines and cancellation
pub mod cancel;

/// UTXO selection algorithms
pub mod utxo_selection;

/// Unsigned transaction assembly
pub mod assembler;

/// Transaction signing
pub mod signer;

/// Private key helpers
pub mod keys;

/// External collaborator traits
pub mod source;

/// In-memory collaborators
pub mod memory;

/// End-to-end transfers
pub mod transfer;

/// Configuration management
pub mod config;

/// Logging setup
pub mod logging;

pub use address::{AddressCodec, BitcoinAddressCodec};
pub use assembler::{ChangePolicy, PreviousOutput, TransactionAssembler, UnsignedTransaction};
pub use cancel::Cancellation;
pub use config::Config;
pub use error::{TransferError, TransferResult};
pub use fee::{FeeModel, FeeModelKind, FeeRate, LegacyFeeModel, SegwitFeeModel};
pub use signer::{SignedTransaction, Signer};
pub use source::{Broadcaster, FeeRateSource, UnspentOutputSource};
pub use transfer::{TransferReceipt, TransferRequest, TransferService};
pub use types::{SensitiveString, UnspentOutput};
pub use utxo_selection::{
    CoinSelector, SearchKind, SelectionOptions, SelectionPhase, SelectionResult,
};
