//! The port through which the core reaches the job manager.
//!
//! The core never opens a socket. It hands a [`Procedure`] and its positional
//! arguments to a [`Transport`] and gets back either a decoded [`CallResult`]
//! or a [`TransportFault`]. The `manager-http` crate supplies the production
//! implementation; tests supply scripted fakes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{CallResult, Procedure, TransportFault};

/// Performs exactly one remote invocation per call to [`Transport::invoke`].
///
/// Implementations must not retry on their own; retrying is the dispatcher's
/// job and depends on the [`crate::FaultClass`] of the returned fault.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Invokes `procedure` with `params`, the last of which is the secret.
    async fn invoke(
        &self,
        procedure: Procedure,
        params: &[Value],
    ) -> Result<CallResult, TransportFault>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn invoke(
        &self,
        procedure: Procedure,
        params: &[Value],
    ) -> Result<CallResult, TransportFault> {
        (**self).invoke(procedure, params).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn invoke(
        &self,
        procedure: Procedure,
        params: &[Value],
    ) -> Result<CallResult, TransportFault> {
        (**self).invoke(procedure, params).await
    }
}
