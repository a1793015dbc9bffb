//! Fault and error types for calls to the job manager.
//!
//! [`TransportFault`] is what a [`crate::Transport`] reports when a single
//! attempt fails. [`classify`] sorts a fault into a [`FaultClass`], which is
//! all the dispatcher needs to decide whether to try again.
//!
//! [`ManagerError`] is what callers see: the faults that were not retried, the
//! application-level failures reported inside a successful response, and
//! configuration problems found before any call is made.

use std::time::Duration;

use thiserror::Error;

use crate::Procedure;

// ---------------------------------------------------------------------------
// Fault classification
// ---------------------------------------------------------------------------

/// Retry category of a [`TransportFault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultClass {
    /// Nothing is listening at the endpoint; the manager is probably not up yet.
    ConnectionRefused,
    /// Seen routinely while the manager is under load. Always retried.
    Transient,
    /// Anything else. Retried only when the caller asked for it.
    Other,
}

/// Maps a fault to its retry category.
///
/// TLS failures, capability-negotiation failures, and deadline overruns are
/// transient. Refusals are kept apart so callers that expect a cold-starting
/// manager can tolerate them without tolerating arbitrary failures.
pub fn classify(fault: &TransportFault) -> FaultClass {
    match fault {
        TransportFault::ConnectionRefused { .. } => FaultClass::ConnectionRefused,
        TransportFault::Tls { .. }
        | TransportFault::CapabilityNegotiation { .. }
        | TransportFault::DeadlineExceeded { .. } => FaultClass::Transient,
        TransportFault::Other { .. } => FaultClass::Other,
    }
}

// ---------------------------------------------------------------------------
// Transport faults
// ---------------------------------------------------------------------------

/// Failure of a single attempt to invoke a remote procedure.
///
/// Transports must map their native errors onto these variants; everything
/// without a dedicated variant goes into [`TransportFault::Other`] with a short
/// category naming where it came from (e.g. `"http_status"`, `"decode"`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportFault {
    /// The peer actively refused the connection.
    #[error("connection refused: {message}")]
    ConnectionRefused {
        /// Transport-level detail.
        message: String,
    },

    /// The TLS handshake or certificate exchange failed.
    #[error("TLS handshake failed: {message}")]
    Tls {
        /// Transport-level detail.
        message: String,
    },

    /// The peer does not (yet) support something the request needs.
    #[error("capability negotiation failed: {message}")]
    CapabilityNegotiation {
        /// Transport-level detail.
        message: String,
    },

    /// The attempt ran past its deadline.
    #[error("deadline of {deadline:?} exceeded")]
    DeadlineExceeded {
        /// The deadline that was exceeded.
        deadline: Duration,
    },

    /// Any other failure.
    #[error("{category}: {message}")]
    Other {
        /// Short machine-readable origin of the fault.
        category: String,
        /// Transport-level detail.
        message: String,
    },
}

impl TransportFault {
    /// Shorthand for [`TransportFault::Other`].
    pub fn other(category: impl Into<String>, message: impl Into<String>) -> Self {
        TransportFault::Other {
            category: category.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable name of the fault's kind.
    pub fn category(&self) -> &str {
        match self {
            TransportFault::ConnectionRefused { .. } => "connection_refused",
            TransportFault::Tls { .. } => "tls",
            TransportFault::CapabilityNegotiation { .. } => "capability_negotiation",
            TransportFault::DeadlineExceeded { .. } => "deadline_exceeded",
            TransportFault::Other { category, .. } => category,
        }
    }

    /// The fault's detail without the category prefix.
    pub fn message(&self) -> String {
        match self {
            TransportFault::ConnectionRefused { message }
            | TransportFault::Tls { message }
            | TransportFault::CapabilityNegotiation { message }
            | TransportFault::Other { message, .. } => message.clone(),
            TransportFault::DeadlineExceeded { deadline } => {
                format!("no response within {deadline:?}")
            }
        }
    }

    /// Retry category, as decided by [`classify`].
    pub fn class(&self) -> FaultClass {
        classify(self)
    }
}

// ---------------------------------------------------------------------------
// Caller-facing errors
// ---------------------------------------------------------------------------

/// Errors returned by [`crate::ManagerClient`] and [`crate::CallDispatcher`].
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The connection was refused and the call was not set to retry.
    #[error("Connection was refused while calling {procedure}. Is the job manager running?")]
    ConnectionRefused {
        /// Procedure being called.
        procedure: Procedure,
    },

    /// A fault outside the known categories, with retries disabled.
    #[error("Unexpected {category} error while calling {procedure}: {message}")]
    Unexpected {
        /// Procedure being called.
        procedure: Procedure,
        /// Category of the original fault.
        category: String,
        /// Message of the original fault.
        message: String,
    },

    /// The job manager answered, but the answer carries the `Error:` marker.
    ///
    /// Holds the full response text. Never retried.
    #[error("{message}")]
    RemoteJob {
        /// Full text returned by the job manager.
        message: String,
    },

    /// A bounded [`crate::RetryPolicy`] ran out of attempts.
    #[error("Gave up calling {procedure} after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Procedure being called.
        procedure: Procedure,
        /// Attempts made, the first one included.
        attempts: u32,
        /// Fault from the final attempt.
        last: TransportFault,
    },

    /// The client could not be set up (bad address, missing secret, transport
    /// initialisation failure).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },
}

impl ManagerError {
    /// Shorthand for [`ManagerError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        ManagerError::Configuration {
            message: message.into(),
        }
    }
}
