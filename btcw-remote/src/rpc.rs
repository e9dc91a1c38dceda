//! Node JSON-RPC client
//!
//! Fee rates come from `estimatesmartfee`, broadcasts go through
//! `sendrawtransaction`. Requests use JSON-RPC 1.0 framing:
//!
//! ```json
//! {"jsonrpc": "1.0", "id": "1", "method": "estimatesmartfee", "params": [1000]}
//! ```

use crate::error::RemoteError;
use crate::http::{self, DEFAULT_TIMEOUT};
use btcw_core::cancel::Cancellation;
use btcw_core::fee::FeeRate;
use btcw_core::logging::{log_network, log_params, sanitize_for_logging, LogLevel};
use btcw_core::source::{Broadcaster, FeeRateSource};
use btcw_core::TransferResult;
use bitcoin::Txid;
use log::debug;
use reqwest::blocking::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;

/// Confirmation target for fee estimation, in blocks
pub const DEFAULT_CONF_TARGET: u32 = 1000;

/// Default `maxfeerate` for broadcasts, in BTC/kvB
pub const DEFAULT_MAX_FEE_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// JSON-RPC response envelope
#[derive(Deserialize, Debug, Clone)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// `estimatesmartfee` result
#[derive(Deserialize, Debug, Clone)]
pub struct SmartFeeEstimate {
    /// BTC/kvB; absent when the node has no estimate
    pub feerate: Option<serde_json::Number>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub blocks: u32,
}

impl<T> RpcResponse<T> {
    /// The result, or the node's error as `RemoteError::Rpc`
    pub fn into_result(self) -> Result<T, RemoteError> {
        if let Some(error) = self.error.filter(|e| !e.is_null()) {
            return Err(RemoteError::Rpc(rpc_error_message(&error)));
        }
        self.result.ok_or_else(|| {
            RemoteError::Malformed("response has neither result nor error".to_string())
        })
    }
}

/// Decode an `estimatesmartfee` response body into a fee rate
pub fn parse_fee_estimate(body: &str) -> Result<FeeRate, RemoteError> {
    let response: RpcResponse<SmartFeeEstimate> = serde_json::from_str(body)?;
    let estimate = response.into_result()?;

    let feerate = estimate.feerate.ok_or_else(|| {
        let reason = if estimate.errors.is_empty() {
            "no fee estimate available".to_string()
        } else {
            estimate.errors.join("; ")
        };
        RemoteError::Rpc(reason)
    })?;

    let btc_per_kvb = decimal_from_number(&feerate)?;
    FeeRate::from_btc_per_kvb(btc_per_kvb)
        .ok_or_else(|| RemoteError::Malformed(format!("fee rate {} out of range", btc_per_kvb)))
}

/// Decode a `sendrawtransaction` response body into the txid
pub fn parse_broadcast_response(body: &str) -> Result<Txid, RemoteError> {
    let response: RpcResponse<String> = serde_json::from_str(body)?;
    let txid = response.into_result()?;
    let hex = txid.trim().trim_start_matches("0x");
    Txid::from_str(hex).map_err(|e| RemoteError::Malformed(format!("txid {}: {}", txid, e)))
}

// Bitcoin Core answers failed calls with a non-2xx status and the error in
// the body
fn rpc_failure(err: RemoteError) -> RemoteError {
    match err {
        RemoteError::Status { status, body } => {
            match serde_json::from_str::<RpcResponse<Value>>(&body) {
                Ok(response) => match response.into_result() {
                    Err(rpc @ RemoteError::Rpc(_)) => rpc,
                    _ => RemoteError::Status { status, body },
                },
                Err(_) => RemoteError::Status { status, body },
            }
        }
        other => other,
    }
}

fn rpc_error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(fields) => {
            let message = fields.get("message").and_then(Value::as_str);
            let code = fields.get("code").and_then(Value::as_i64);
            match (message, code) {
                (Some(message), Some(code)) => format!("{} (code {})", message, code),
                (Some(message), None) => message.to_string(),
                _ => error.to_string(),
            }
        }
        other => other.to_string(),
    }
}

fn decimal_from_number(number: &serde_json::Number) -> Result<Decimal, RemoteError> {
    let text = number.to_string();
    let parsed = if text.contains(['e', 'E']) {
        Decimal::from_scientific(&text)
    } else {
        Decimal::from_str(&text)
    };
    parsed.map_err(|e| RemoteError::Malformed(format!("fee rate {}: {}", text, e)))
}

/// Blocking client for a node's JSON-RPC endpoint
#[derive(Debug, Clone)]
pub struct NodeRpcClient {
    url: String,
    client: Client,
    timeout: Duration,
    conf_target: u32,
    max_fee_rate: Decimal,
}

impl NodeRpcClient {
    pub fn new(url: &str) -> Result<Self, RemoteError> {
        Ok(Self {
            url: url.to_string(),
            client: http::build_client()?,
            timeout: DEFAULT_TIMEOUT,
            conf_target: DEFAULT_CONF_TARGET,
            max_fee_rate: DEFAULT_MAX_FEE_RATE,
        })
    }

    /// Upper bound for each request; the caller's deadline can shorten it
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_conf_target(mut self, conf_target: u32) -> Self {
        self.conf_target = conf_target;
        self
    }

    pub fn with_max_fee_rate(mut self, max_fee_rate: Decimal) -> Self {
        self.max_fee_rate = max_fee_rate;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn conf_target(&self) -> u32 {
        self.conf_target
    }

    pub fn max_fee_rate(&self) -> Decimal {
        self.max_fee_rate
    }

    /// JSON body of an `estimatesmartfee` call
    pub fn fee_estimate_request(&self) -> Value {
        request_body("estimatesmartfee", json!([self.conf_target]))
    }

    /// JSON body of a `sendrawtransaction` call
    pub fn broadcast_request(&self, tx_hex: &str) -> Value {
        let max_fee_rate = self
            .max_fee_rate
            .to_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(self.max_fee_rate.to_string()));
        request_body("sendrawtransaction", json!([tx_hex, max_fee_rate]))
    }

    fn call(&self, body: &Value, cancel: &Cancellation) -> Result<String, RemoteError> {
        let request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body.to_string());
        http::send(request, cancel, self.timeout).map_err(rpc_failure)
    }
}

fn request_body(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "1.0",
        "id": "1",
        "method": method,
        "params": params,
    })
}

impl FeeRateSource for NodeRpcClient {
    fn current_fee_rate(&self, cancel: &Cancellation) -> TransferResult<FeeRate> {
        cancel.check()?;
        debug!("Requesting fee estimate for {} blocks", self.conf_target);

        let result = self
            .call(&self.fee_estimate_request(), cancel)
            .and_then(|body| parse_fee_estimate(&body));
        let rate = http::settle(result, cancel, |e| e.into_source_unavailable("fee estimation"))?;

        log_network(
            LogLevel::Debug,
            "fee estimate received",
            Some(log_params(vec![
                ("conf_target", self.conf_target.to_string()),
                ("fee_rate", rate.to_string()),
            ])),
        );
        Ok(rate)
    }
}

impl Broadcaster for NodeRpcClient {
    fn submit(&self, tx_bytes: &[u8], cancel: &Cancellation) -> TransferResult<Txid> {
        cancel.check()?;
        let tx_hex = hex::encode(tx_bytes);
        debug!("Broadcasting {} byte transaction", tx_bytes.len());

        let result = self
            .call(&self.broadcast_request(&tx_hex), cancel)
            .and_then(|body| parse_broadcast_response(&body));
        let txid = http::settle(result, cancel, RemoteError::into_broadcast_rejected)?;

        log_network(
            LogLevel::Info,
            "transaction broadcast",
            Some(log_params(vec![("txid", sanitize_for_logging(&txid.to_string()))])),
        );
        Ok(txid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_max_fee_rate() {
        assert_eq!(DEFAULT_MAX_FEE_RATE.to_string(), "0.10");
    }

    #[test]
    fn test_fee_estimate_request_shape() {
        let client = NodeRpcClient::new("http://127.0.0.1:18332").unwrap();
        let body = client.fee_estimate_request();
        assert_eq!(body["jsonrpc"], "1.0");
        assert_eq!(body["method"], "estimatesmartfee");
        assert_eq!(body["params"], json!([1000]));
    }

    #[test]
    fn test_broadcast_request_shape() {
        let client = NodeRpcClient::new("http://127.0.0.1:18332").unwrap();
        let body = client.broadcast_request("0200");
        assert_eq!(body["method"], "sendrawtransaction");
        assert_eq!(body["params"][0], "0200");
        assert_eq!(body["params"][1].as_f64(), Some(0.1));
    }

    #[test]
    fn test_status_body_with_rpc_error() {
        let err = rpc_failure(RemoteError::Status {
            status: 500,
            body: r#"{"result":null,"error":{"code":-26,"message":"dust"},"id":"1"}"#.to_string(),
        });
        assert!(matches!(err, RemoteError::Rpc(reason) if reason == "dust (code -26)"));
    }

    #[test]
    fn test_status_body_without_json() {
        let err = rpc_failure(RemoteError::Status {
            status: 401,
            body: "Unauthorized".to_string(),
        });
        assert!(matches!(err, RemoteError::Status { status: 401, .. }));
    }
}
