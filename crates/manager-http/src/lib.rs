//! Job manager transport adapter.
//!
//! Implements the [`manager::Transport`] trait as JSON-RPC 2.0 over HTTPS,
//! posting to `https://{address}:17445`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request framing, TLS settings, and the mapping of HTTP
//! failures onto [`manager::TransportFault`] live here. The [`manager`] crate
//! sees only [`manager::Transport`].
//!
//! ## Fault Mapping
//!
//! | HTTP-level failure | Fault |
//! |--------------------|-------|
//! | timeout | `DeadlineExceeded` |
//! | TCP connection refused | `ConnectionRefused` |
//! | TLS / certificate / handshake error | `Tls` |
//! | `501 Not Implemented` | `CapabilityNegotiation` |
//! | other non-2xx status | `Other { category: "http_status" }` |
//! | JSON-RPC error object | `Other { category: "rpc_error" }` |
//! | undecodable body | `Other { category: "decode" }` |
//! | any other connect / request error | `Other { category: "connect" \| "request" }` |

mod faults;
pub mod jsonrpc;
mod transport;

use manager::{Connection, Endpoint, ManagerAddress, ManagerClient, ManagerError, Secret};

pub use transport::{HttpTransport, HttpTransportConfig, HttpTransportError};

/// Builds a [`ManagerClient`] for the manager at `address`.
///
/// No network I/O happens here; the first request opens the connection.
///
/// # Errors
///
/// [`ManagerError::Configuration`] if `address` or `secret` is empty or the
/// HTTP client cannot be built.
pub fn connect(
    address: &str,
    secret: &str,
    config: &HttpTransportConfig,
) -> Result<ManagerClient<HttpTransport>, ManagerError> {
    let address = ManagerAddress::new(address)
        .ok_or_else(|| ManagerError::configuration("manager address must not be empty"))?;
    let secret = Secret::new(secret)
        .ok_or_else(|| ManagerError::configuration("manager secret must not be empty"))?;

    let endpoint = Endpoint::new(address);
    let transport = HttpTransport::for_endpoint(&endpoint, config)?;
    Ok(ManagerClient::new(Connection::new(endpoint, secret, transport)))
}
