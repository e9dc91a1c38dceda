//! Transfer orchestration
//!
//! [`TransferService`] runs one transfer end to end:
//!
//! fetch unspent outputs -> fetch fee rate -> select -> assemble -> sign ->
//! verify -> broadcast
//!
//! Each step runs on the calling thread. The caller's [`Cancellation`] is
//! checked between steps and passed to every collaborator. A failure at any
//! step returns a typed error and leaves nothing behind except the read
//! calls already made.
//!
//! The service keeps no state between calls. Two transfers from the same
//! address running at the same time can pick the same outputs; serialize them
//! per address.

use crate::address::AddressCodec;
use crate::assembler::{ChangePolicy, TransactionAssembler};
use crate::cancel::Cancellation;
use crate::config::Config;
use crate::error::{TransferError, TransferResult};
use crate::fee::{FeeModel, LegacyFeeModel};
use crate::logging::{log_params, log_transfer, sanitize_for_logging, LogLevel};
use crate::signer::{SignedTransaction, Signer};
use crate::source::{Broadcaster, FeeRateSource, UnspentOutputSource};
use crate::utxo_selection::{CoinSelector, SelectionOptions};
use bitcoin::{Amount, PrivateKey, Txid};
use log::{info, warn};
use std::sync::Arc;

/// A payment from one address to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub from_address: String,
    pub to_address: String,
    pub amount: Amount,
}

impl TransferRequest {
    pub fn new(
        from_address: impl Into<String>,
        to_address: impl Into<String>,
        amount: Amount,
    ) -> Self {
        Self {
            from_address: from_address.into(),
            to_address: to_address.into(),
            amount,
        }
    }
}

/// Outcome of a broadcast transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Transaction id as reported by the broadcaster
    pub txid: Txid,
    pub signed: SignedTransaction,
}

/// Wires the pipeline stages to their collaborators
pub struct TransferService {
    utxo_source: Arc<dyn UnspentOutputSource>,
    fee_source: Arc<dyn FeeRateSource>,
    broadcaster: Arc<dyn Broadcaster>,
    codec: Arc<dyn AddressCodec>,
    fee_model: Arc<dyn FeeModel>,
    selection: SelectionOptions,
    change_policy: ChangePolicy,
    verify_before_broadcast: bool,
    signer: Signer,
}

impl TransferService {
    /// Service with the legacy fee model, branch and bound search, zero
    /// change omitted, and verification before broadcast
    pub fn new(
        utxo_source: Arc<dyn UnspentOutputSource>,
        fee_source: Arc<dyn FeeRateSource>,
        broadcaster: Arc<dyn Broadcaster>,
        codec: Arc<dyn AddressCodec>,
    ) -> Self {
        Self {
            utxo_source,
            fee_source,
            broadcaster,
            codec,
            fee_model: Arc::new(LegacyFeeModel),
            selection: SelectionOptions::default(),
            change_policy: ChangePolicy::default(),
            verify_before_broadcast: true,
            signer: Signer::new(),
        }
    }

    /// Service configured from a [`Config`]
    ///
    /// Fails with `TransferError::Config` when the configuration does not validate.
    pub fn from_config(
        config: &Config,
        utxo_source: Arc<dyn UnspentOutputSource>,
        fee_source: Arc<dyn FeeRateSource>,
        broadcaster: Arc<dyn Broadcaster>,
        codec: Arc<dyn AddressCodec>,
    ) -> TransferResult<Self> {
        config
            .validate()
            .map_err(|e| TransferError::config("invalid configuration", e))?;
        Ok(Self::new(utxo_source, fee_source, broadcaster, codec)
            .with_fee_model(config.fees.model.build())
            .with_selection_options(config.selection_options())
            .with_change_policy(config.change_policy())
            .with_verification(config.transfer.verify_before_broadcast))
    }

    pub fn with_fee_model(mut self, fee_model: Arc<dyn FeeModel>) -> Self {
        self.fee_model = fee_model;
        self
    }

    pub fn with_selection_options(mut self, selection: SelectionOptions) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_change_policy(mut self, change_policy: ChangePolicy) -> Self {
        self.change_policy = change_policy;
        self
    }

    pub fn with_verification(mut self, verify_before_broadcast: bool) -> Self {
        self.verify_before_broadcast = verify_before_broadcast;
        self
    }

    /// Build and sign a transfer without broadcasting it
    ///
    /// # Arguments
    /// * `request` - Source, destination and amount
    /// * `key` - Key controlling the source address
    /// * `cancel` - Deadline and cancel flag for the whole build
    ///
    /// # Returns
    /// * The signed transaction, ready for [`Broadcaster::submit`]
    pub fn build_transfer(
        &self,
        request: &TransferRequest,
        key: &PrivateKey,
        cancel: &Cancellation,
    ) -> TransferResult<SignedTransaction> {
        cancel.check()?;

        if request.amount == Amount::ZERO {
            return Err(TransferError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }

        // Resolve both addresses and the key before touching the network
        self.codec.script_for(&request.to_address)?;
        let source_script = self.codec.script_for(&request.from_address)?;
        self.signer.check_key(key, &source_script)?;

        log_transfer(
            LogLevel::Info,
            "building transfer",
            Some(log_params(vec![
                ("from", sanitize_for_logging(&request.from_address)),
                ("to", sanitize_for_logging(&request.to_address)),
                ("amount_sats", request.amount.to_sat().to_string()),
            ])),
        );

        let utxos = self.utxo_source.fetch(&request.from_address, cancel)?;
        cancel.check()?;

        let fee_rate = self.fee_source.current_fee_rate(cancel)?;
        cancel.check()?;
        info!("Fetched {} unspent outputs, fee rate {}", utxos.len(), fee_rate);

        let selector = CoinSelector::with_options(self.fee_model.clone(), self.selection);
        let selection = selector.select(&utxos, request.amount, fee_rate)?;

        let assembler = TransactionAssembler::new(self.fee_model.clone(), self.codec.clone())
            .with_change_policy(self.change_policy);
        let unsigned = assembler.assemble(
            &selection,
            &request.from_address,
            &request.to_address,
            request.amount,
            fee_rate,
        )?;
        cancel.check()?;

        let signed = self.signer.sign(&unsigned, key)?;
        if self.verify_before_broadcast {
            self.signer.verify(&signed)?;
        }

        log_transfer(
            LogLevel::Info,
            "transfer signed",
            Some(log_params(vec![
                ("txid", sanitize_for_logging(&signed.txid().to_string())),
                ("inputs", signed.tx.input.len().to_string()),
                ("fee_sats", signed.fee.to_string()),
                ("change_sats", signed.change.to_string()),
            ])),
        );
        Ok(signed)
    }

    /// Build, sign and broadcast a transfer
    pub fn transfer(
        &self,
        request: &TransferRequest,
        key: &PrivateKey,
        cancel: &Cancellation,
    ) -> TransferResult<TransferReceipt> {
        let signed = self.build_transfer(request, key, cancel)?;
        cancel.check()?;

        let txid = self.broadcaster.submit(&signed.to_bytes(), cancel)?;
        if txid != signed.txid() {
            warn!(
                "Broadcaster reported txid {} for transaction {}",
                sanitize_for_logging(&txid.to_string()),
                sanitize_for_logging(&signed.txid().to_string())
            );
        }

        log_transfer(
            LogLevel::Info,
            "transfer broadcast",
            Some(log_params(vec![("txid", sanitize_for_logging(&txid.to_string()))])),
        );
        Ok(TransferReceipt { txid, signed })
    }
}
