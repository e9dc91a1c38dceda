//! Shared blocking HTTP plumbing

use crate::error::RemoteError;
use btcw_core::cancel::Cancellation;
use btcw_core::{TransferError, TransferResult};
use reqwest::blocking::{Client, RequestBuilder};
use std::time::Duration;

/// Default upper bound for a single request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("btcw/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client() -> Result<Client, RemoteError> {
    Ok(Client::builder().user_agent(USER_AGENT).build()?)
}

/// Send `request` and return the body of a 2xx response
///
/// The request may take at most `cap`, less when the caller's deadline is
/// closer.
pub(crate) fn send(
    request: RequestBuilder,
    cancel: &Cancellation,
    cap: Duration,
) -> Result<String, RemoteError> {
    let response = request.timeout(cancel.io_timeout(cap)).send()?;
    let status = response.status();
    let body = response.text()?;

    if !status.is_success() {
        return Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Map a remote failure, preferring the caller's cancellation when that is
/// what cut the request short
pub(crate) fn settle<T>(
    result: Result<T, RemoteError>,
    cancel: &Cancellation,
    map: impl FnOnce(RemoteError) -> TransferError,
) -> TransferResult<T> {
    result.map_err(|err| match cancel.check() {
        Err(stopped) => stopped,
        Ok(()) => map(err),
    })
}

/// Trim a trailing slash so paths can be appended with `/`
pub(crate) fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
