//! The endpoint, secret, and transport that together address one job manager.

use crate::{ManagerAddress, Secret};

/// Port the job manager listens on.
pub const MANAGER_PORT: u16 = 17445;

/// Network location of a job manager: its address plus [`MANAGER_PORT`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    address: ManagerAddress,
}

impl Endpoint {
    /// Creates the endpoint for the manager at `address`.
    pub fn new(address: ManagerAddress) -> Self {
        Self { address }
    }

    /// Returns the address the endpoint was built from.
    pub fn address(&self) -> &ManagerAddress {
        &self.address
    }

    /// Returns the port, which is always [`MANAGER_PORT`].
    pub fn port(&self) -> u16 {
        MANAGER_PORT
    }

    /// Returns `https://{address}:17445`, bracketing bare IPv6 literals.
    pub fn url(&self) -> String {
        let host = self.address.as_str();
        if host.contains(':') && !host.starts_with('[') {
            format!("https://[{host}]:{MANAGER_PORT}")
        } else {
            format!("https://{host}:{MANAGER_PORT}")
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url())
    }
}

// ---------------------------------------------------------------------------

/// A handle on one job manager.
///
/// Binds exactly one [`Endpoint`] to the [`Secret`] it accepts and the
/// transport used to reach it. Nothing in it changes after construction, and
/// building it performs no network I/O. Callers working concurrently should
/// each hold their own connection.
pub struct Connection<T> {
    endpoint: Endpoint,
    secret: Secret,
    transport: T,
}

impl<T> Connection<T> {
    /// Creates a connection. `transport` must already be bound to `endpoint`.
    pub fn new(endpoint: Endpoint, secret: Secret, transport: T) -> Self {
        Self {
            endpoint,
            secret,
            transport,
        }
    }

    /// Returns the endpoint this connection talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn secret(&self) -> &Secret {
        &self.secret
    }
}

impl<T> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint.url())
            .field("secret", &self.secret)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(address: &str) -> Endpoint {
        Endpoint::new(ManagerAddress::new(address).unwrap())
    }

    #[test]
    fn test_url_uses_fixed_port() {
        assert_eq!(endpoint("10.0.0.5").url(), "https://10.0.0.5:17445");
        assert_eq!(endpoint("head-node.local").url(), "https://head-node.local:17445");
        assert_eq!(endpoint("10.0.0.5").port(), MANAGER_PORT);
    }

    #[test]
    fn test_url_brackets_ipv6_literals() {
        assert_eq!(endpoint("fe80::1").url(), "https://[fe80::1]:17445");
        assert_eq!(endpoint("[fe80::1]").url(), "https://[fe80::1]:17445");
    }

    #[test]
    fn test_debug_does_not_reveal_secret() {
        let connection = Connection::new(
            endpoint("10.0.0.5"),
            Secret::new("s3cr3t-token").unwrap(),
            (),
        );

        let rendered = format!("{connection:?}");

        assert!(rendered.contains("https://10.0.0.5:17445"));
        assert!(!rendered.contains("s3cr3t-token"));
    }
}
