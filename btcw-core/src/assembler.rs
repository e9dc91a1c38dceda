//! Unsigned transaction assembly
//!
//! Turns a [`SelectionResult`] into a transaction skeleton: one input per
//! selected output, a payment output, and a change output back to the source
//! address. The result keeps the previous output of every input, so the
//! signer commits to the exact script and amount being spent.
//!
//! Accounting always balances: `inputs == payment + change + fee`.

use crate::address::AddressCodec;
use crate::error::{TransferError, TransferResult};
use crate::fee::{FeeModel, FeeRate};
use crate::types::{total_sats, STANDARD_OUTPUT_COUNT};
use crate::utxo_selection::SelectionResult;
use bitcoin::absolute::LockTime;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};
use log::{debug, info};
use std::sync::Arc;

/// Transaction version used for every assembled transaction
pub const TX_VERSION: i32 = 2;

/// What to do with the leftover after payment and fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangePolicy {
    /// Emit a change output unless the change is exactly zero
    #[default]
    OmitZero,
    /// Give change below the limit to the fee instead of creating an output
    FoldDust(u64),
}

/// The output an input spends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousOutput {
    pub outpoint: OutPoint,
    pub amount: Amount,
    pub script_pubkey: ScriptBuf,
}

/// A transaction with every input unsigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub tx: Transaction,
    /// Previous output of each input, in input order
    pub prevouts: Vec<PreviousOutput>,
    pub amount: Amount,
    pub fee: u64,
    pub change: u64,
}

impl UnsignedTransaction {
    /// Sum of the previous outputs being spent
    pub fn input_total(&self) -> u64 {
        self.prevouts
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.amount.to_sat()))
    }

    /// Sum of the outputs created
    pub fn output_total(&self) -> u64 {
        self.tx
            .output
            .iter()
            .fold(0u64, |acc, o| acc.saturating_add(o.value))
    }

    pub fn has_change_output(&self) -> bool {
        self.tx.output.len() > 1
    }
}

/// Builds unsigned transactions from selections
pub struct TransactionAssembler {
    fee_model: Arc<dyn FeeModel>,
    codec: Arc<dyn AddressCodec>,
    change_policy: ChangePolicy,
}

impl TransactionAssembler {
    pub fn new(fee_model: Arc<dyn FeeModel>, codec: Arc<dyn AddressCodec>) -> Self {
        Self {
            fee_model,
            codec,
            change_policy: ChangePolicy::default(),
        }
    }

    pub fn with_change_policy(mut self, change_policy: ChangePolicy) -> Self {
        self.change_policy = change_policy;
        self
    }

    pub fn change_policy(&self) -> ChangePolicy {
        self.change_policy
    }

    /// Build the unsigned transaction for a selection
    ///
    /// # Arguments
    /// * `selection` - Outputs to spend, all locked to `from_address`
    /// * `from_address` - Source address, receives the change
    /// * `to_address` - Destination of the payment
    /// * `amount` - Payment amount
    /// * `fee_rate` - Fee rate the selection was made with
    ///
    /// # Returns
    /// * The transaction skeleton, or `InsufficientFunds` when the selection
    ///   cannot pay amount plus fee
    pub fn assemble(
        &self,
        selection: &SelectionResult,
        from_address: &str,
        to_address: &str,
        amount: Amount,
        fee_rate: FeeRate,
    ) -> TransferResult<UnsignedTransaction> {
        if amount == Amount::ZERO {
            return Err(TransferError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }

        let payment_script = self.codec.script_for(to_address)?;
        let change_script = self.codec.script_for(from_address)?;

        let input_count = selection.chosen.len();
        let mut fee = self
            .fee_model
            .estimated_fee(fee_rate, input_count, STANDARD_OUTPUT_COUNT);
        let total = total_sats(&selection.chosen);
        let needed = amount.to_sat().saturating_add(fee);

        if input_count == 0 || total < needed {
            return Err(TransferError::InsufficientFunds {
                needed,
                available: total,
            });
        }

        let mut change = total - needed;
        let emit_change = match self.change_policy {
            ChangePolicy::OmitZero => change > 0,
            ChangePolicy::FoldDust(limit) => {
                if change < limit {
                    debug!("Folding {} sats of dust change into the fee", change);
                    fee += change;
                    change = 0;
                }
                change > 0
            }
        };

        let input: Vec<TxIn> = selection
            .chosen
            .iter()
            .map(|utxo| TxIn {
                previous_output: utxo.outpoint,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            })
            .collect();

        let mut output = vec![TxOut {
            value: amount.to_sat(),
            script_pubkey: payment_script,
        }];
        if emit_change {
            output.push(TxOut {
                value: change,
                script_pubkey: change_script.clone(),
            });
        }

        let prevouts = selection
            .chosen
            .iter()
            .map(|utxo| PreviousOutput {
                outpoint: utxo.outpoint,
                amount: utxo.amount,
                script_pubkey: change_script.clone(),
            })
            .collect();

        info!(
            "Assembled transaction: {} inputs, {} outputs, fee {} sats, change {} sats",
            input_count,
            output.len(),
            fee,
            change
        );

        Ok(UnsignedTransaction {
            tx: Transaction {
                version: TX_VERSION,
                lock_time: LockTime::ZERO,
                input,
                output,
            },
            prevouts,
            amount,
            fee,
            change,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::BitcoinAddressCodec;
    use crate::fee::LegacyFeeModel;
    use crate::types::UnspentOutput;
    use crate::utxo_selection::SelectionPhase;
    use bitcoin::hashes::Hash;
    use bitcoin::{Network, Txid};

    const FROM: &str = "1PMycacnJaSqwwJqjawXBErnLsZ7RkXUAs";
    const TO: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

    fn assembler() -> TransactionAssembler {
        TransactionAssembler::new(
            Arc::new(LegacyFeeModel),
            Arc::new(BitcoinAddressCodec::new(Network::Bitcoin)),
        )
    }

    fn selection(amounts: &[u64]) -> SelectionResult {
        let chosen = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| UnspentOutput::new(Txid::all_zeros(), i as u32, *a))
            .collect();
        SelectionResult::new(chosen, 0, SelectionPhase::Search)
    }

    #[test]
    fn test_balances_with_change() {
        let rate = FeeRate::from_sat_per_kvb(7_722);
        let unsigned = assembler()
            .assemble(&selection(&[33_000]), FROM, TO, Amount::from_sat(17_891), rate)
            .unwrap();

        assert_eq!(unsigned.fee, 2_000);
        assert_eq!(unsigned.change, 13_109);
        assert_eq!(unsigned.tx.output.len(), 2);
        assert_eq!(unsigned.input_total(), unsigned.output_total() + unsigned.fee);
        assert_eq!(unsigned.tx.version, TX_VERSION);
    }

    #[test]
    fn test_zero_change_omitted() {
        let unsigned = assembler()
            .assemble(
                &selection(&[12_000]),
                FROM,
                TO,
                Amount::from_sat(10_000),
                FeeRate::from_sat_per_kvb(7_722),
            )
            .unwrap();
        assert_eq!(unsigned.change, 0);
        assert!(!unsigned.has_change_output());
    }

    #[test]
    fn test_dust_folded_into_fee() {
        let unsigned = assembler()
            .with_change_policy(ChangePolicy::FoldDust(546))
            .assemble(&selection(&[10_300]), FROM, TO, Amount::from_sat(10_000), FeeRate::ZERO)
            .unwrap();
        assert_eq!(unsigned.fee, 300);
        assert_eq!(unsigned.change, 0);
        assert_eq!(unsigned.tx.output.len(), 1);
        assert_eq!(unsigned.input_total(), unsigned.output_total() + unsigned.fee);
    }

    #[test]
    fn test_short_selection_is_insufficient() {
        let err = assembler()
            .assemble(
                &selection(&[10_500]),
                FROM,
                TO,
                Amount::from_sat(10_000),
                FeeRate::from_sat_per_kvb(7_722),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TransferError::InsufficientFunds {
                needed: 12_000,
                available: 10_500
            }
        ));
    }

    #[test]
    fn test_bad_destination() {
        let err = assembler()
            .assemble(&selection(&[50_000]), FROM, "bogus", Amount::from_sat(10_000), FeeRate::ZERO)
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidAddress(_)));
    }
}
