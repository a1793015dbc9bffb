//! Mapping of HTTP-level failures onto [`TransportFault`].
//!
//! `reqwest` reports refusals and TLS failures as generic connect errors, so
//! the source chain is walked and each link is downcast to tell them apart.
//! Error text is never inspected; it carries the URL.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use manager::TransportFault;
use reqwest::StatusCode;

use crate::jsonrpc::RpcError;

/// Longest response body excerpt carried in an `http_status` fault.
const BODY_EXCERPT_LEN: usize = 200;

/// Maps a `reqwest` error. `deadline` is the configured timeout reported when
/// the error is a timeout.
pub(crate) fn from_reqwest(err: &reqwest::Error, deadline: Duration) -> TransportFault {
    let message = error_chain(err);

    if err.is_timeout() {
        return TransportFault::DeadlineExceeded { deadline };
    }
    if is_connection_refused(err) {
        return TransportFault::ConnectionRefused { message };
    }
    if tls_error(err).is_some() {
        return TransportFault::Tls { message };
    }
    if err.is_connect() {
        return TransportFault::other("connect", message);
    }
    if err.is_decode() {
        return TransportFault::other("decode", message);
    }
    TransportFault::other("request", message)
}

/// Maps a non-success HTTP status. `501 Not Implemented` means the manager
/// does not support the request yet and is treated as a negotiation failure.
pub(crate) fn from_status(status: StatusCode, body: &str) -> TransportFault {
    if status == StatusCode::NOT_IMPLEMENTED {
        return TransportFault::CapabilityNegotiation {
            message: status.to_string(),
        };
    }
    let excerpt: String = body.chars().take(BODY_EXCERPT_LEN).collect();
    if excerpt.is_empty() {
        TransportFault::other("http_status", status.to_string())
    } else {
        TransportFault::other("http_status", format!("{status}: {excerpt}"))
    }
}

/// Maps a JSON-RPC error object returned by the manager.
pub(crate) fn from_rpc_error(error: &RpcError) -> TransportFault {
    TransportFault::other("rpc_error", error.message.clone())
}

fn is_connection_refused(err: &reqwest::Error) -> bool {
    sources(err).any(|current| {
        current
            .downcast_ref::<io::Error>()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::ConnectionRefused)
    })
}

/// Finds a `rustls` error in the chain, either directly or wrapped in an
/// `io::Error` (`io::Error::source` skips its wrapped error, so it is
/// unwrapped explicitly).
fn tls_error(err: &reqwest::Error) -> Option<&rustls::Error> {
    sources(err).find_map(|current| {
        current.downcast_ref::<rustls::Error>().or_else(|| {
            current
                .downcast_ref::<io::Error>()
                .and_then(io::Error::get_ref)
                .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        })
    })
}

/// Iterates over the causes of `err`, outermost first.
fn sources<'a>(err: &'a reqwest::Error) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(err.source(), |&current| current.source())
}

/// Renders an error and all of its sources as `outer: inner: innermost`.
fn error_chain(err: &dyn StdError) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(current) = source {
        let text = current.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = current.source();
    }
    rendered
}
