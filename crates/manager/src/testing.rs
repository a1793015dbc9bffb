//! Scripted transport used by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::{CallResult, Procedure, Transport, TransportFault};

/// Replays a fixed sequence of outcomes, one per invocation, and records the
/// requests it receives.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<CallResult, TransportFault>>>,
    requests: Mutex<Vec<(Procedure, Vec<Value>)>>,
    attempts: AtomicU32,
}

impl ScriptedTransport {
    pub(crate) fn new(
        script: impl IntoIterator<Item = Result<CallResult, TransportFault>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Fails with `fault` `failures` times, then returns `result`.
    pub(crate) fn failing_then(failures: u32, fault: TransportFault, result: CallResult) -> Self {
        let mut script: Vec<_> = (0..failures).map(|_| Err(fault.clone())).collect();
        script.push(Ok(result));
        Self::new(script)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<(Procedure, Vec<Value>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn invoke(
        &self,
        procedure: Procedure,
        params: &[Value],
    ) -> Result<CallResult, TransportFault> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((procedure, params.to_vec()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportFault::other("script", "no scripted outcome left")))
    }
}

/// A refusal as a transport would report it.
pub(crate) fn refused() -> TransportFault {
    TransportFault::ConnectionRefused {
        message: "Connection refused (os error 111)".into(),
    }
}
