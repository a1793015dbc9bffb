//! Client core for the cloud job manager.
//!
//! The job manager runs HPC-style batch jobs and platform scaling operations
//! and keeps their inputs and outputs in a pluggable data store. This crate
//! wraps each of its nine remote procedures with a deadline, classifies
//! failures into retryable and fatal categories, and detects application-level
//! errors hidden inside otherwise successful responses.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no network I/O.
//! It calls the job manager through the [`Transport`] trait; the
//! `manager-http` crate supplies the JSON-RPC implementation.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Wire identifiers (`ManagerAddress`, `FileId`, `Secret`, `Procedure`, ...) |
//! | [`types`] | Payloads and call settings (`JobData`, `CallResult`, `CallOptions`, `RetryPolicy`, ...) |
//! | [`errors`] | `TransportFault`, the fault classifier, and `ManagerError` |
//! | [`transport`] | The `Transport` port |
//! | [`dispatcher`] | `CallDispatcher`: deadline and retry loop |
//! | [`connection`] | `Endpoint` and `Connection` |
//! | [`client`] | `ManagerClient`: the nine bindings |

pub mod client;
pub mod connection;
pub mod dispatcher;
pub mod errors;
pub mod identifiers;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use client::ManagerClient;
pub use connection::{Connection, Endpoint, MANAGER_PORT};
pub use dispatcher::CallDispatcher;
pub use errors::{classify, FaultClass, ManagerError, TransportFault};
pub use identifiers::{FileId, ManagerAddress, ProfilingKey, Procedure, Secret};
pub use transport::Transport;
pub use types::{
    CallOptions, CallResult, JobData, ProfilingInfo, RemoteReply, RetryPolicy, ERROR_MARKER,
    UNBOUNDED_DEADLINE,
};
