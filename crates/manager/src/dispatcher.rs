//! Deadline enforcement and the retry loop shared by every remote call.
//!
//! [`CallDispatcher::execute`] runs one attempt under the caller's deadline,
//! classifies any fault with [`crate::classify`], and either tries again or
//! turns the fault into a [`ManagerError`]:
//!
//! | Fault class | `retry_on_failure = true` | `retry_on_failure = false` |
//! |-------------|---------------------------|----------------------------|
//! | Transient | retry | retry |
//! | ConnectionRefused | retry | [`ManagerError::ConnectionRefused`] |
//! | Other | retry | [`ManagerError::Unexpected`] |
//!
//! How often it retries is governed by the dispatcher's [`RetryPolicy`]. The
//! default policy never gives up and never waits between attempts.

use std::future::Future;

use tracing::{debug, error, warn};

use crate::{
    classify, CallOptions, FaultClass, ManagerError, Procedure, RetryPolicy, TransportFault,
};

/// Runs remote calls under a deadline and retries them according to their
/// fault class.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallDispatcher {
    policy: RetryPolicy,
}

impl CallDispatcher {
    /// Creates a dispatcher with the given retry policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Returns the retry policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs `operation` until it succeeds or fails with a fault that is not
    /// retried.
    ///
    /// `operation` must perform exactly one remote invocation each time it is
    /// called. `procedure` is used for logging and error context only.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::ConnectionRefused`] / [`ManagerError::Unexpected`]
    ///   when `options.retry_on_failure` is `false` and the fault is of that
    ///   class. Exactly one attempt is made in that case.
    /// - [`ManagerError::RetriesExhausted`] when the policy's attempt limit is
    ///   reached on a fault that would otherwise have been retried.
    pub async fn execute<F, Fut, T>(
        &self,
        procedure: Procedure,
        options: CallOptions,
        mut operation: F,
    ) -> Result<T, ManagerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportFault>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);

            let fault = match tokio::time::timeout(options.deadline, operation()).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        debug!(%procedure, attempts = attempt, "remote call succeeded after retrying");
                    }
                    return Ok(value);
                }
                Ok(Err(fault)) => fault,
                Err(_elapsed) => TransportFault::DeadlineExceeded {
                    deadline: options.deadline,
                },
            };

            let class = classify(&fault);
            if !should_retry(class, options.retry_on_failure) {
                error!(%procedure, attempt, ?class, %fault, "remote call failed");
                return Err(into_terminal_error(procedure, fault));
            }

            if !self.policy.allows_retry_after(attempt) {
                error!(%procedure, attempts = attempt, ?class, %fault, "remote call retries exhausted");
                return Err(ManagerError::RetriesExhausted {
                    procedure,
                    attempts: attempt,
                    last: fault,
                });
            }

            warn!(%procedure, attempt, ?class, %fault, "remote call failed; retrying");
            if !self.policy.backoff.is_zero() {
                tokio::time::sleep(self.policy.backoff).await;
            }
        }
    }
}

fn should_retry(class: FaultClass, retry_on_failure: bool) -> bool {
    match class {
        FaultClass::Transient => true,
        FaultClass::ConnectionRefused | FaultClass::Other => retry_on_failure,
    }
}

fn into_terminal_error(procedure: Procedure, fault: TransportFault) -> ManagerError {
    match fault {
        TransportFault::ConnectionRefused { .. } => ManagerError::ConnectionRefused { procedure },
        other => ManagerError::Unexpected {
            procedure,
            category: other.category().to_owned(),
            message: other.message(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::time::Duration;

    use super::*;
    use crate::testing::{refused, ScriptedTransport};
    use crate::{CallResult, Transport};

    const PROCEDURE: Procedure = Procedure::GetOutput;
    const NO_PARAMS: &[serde_json::Value] = &[];

    async fn run(
        dispatcher: CallDispatcher,
        transport: &ScriptedTransport,
        options: CallOptions,
    ) -> Result<CallResult, ManagerError> {
        dispatcher
            .execute(PROCEDURE, options, || transport.invoke(PROCEDURE, NO_PARAMS))
            .await
    }

    fn no_retry() -> CallOptions {
        CallOptions::default()
    }

    fn with_retry() -> CallOptions {
        CallOptions::default().with_retry_on_failure(true)
    }

    fn transient_faults() -> Vec<TransportFault> {
        vec![
            TransportFault::Tls {
                message: "handshake failure".into(),
            },
            TransportFault::CapabilityNegotiation {
                message: "501 Not Implemented".into(),
            },
            TransportFault::DeadlineExceeded {
                deadline: Duration::from_secs(5),
            },
        ]
    }

    #[tokio::test]
    async fn test_success_is_returned_unchanged() {
        let transport = ScriptedTransport::new([Ok(CallResult::from("done"))]);

        let result = run(CallDispatcher::default(), &transport, no_retry()).await;

        assert_eq!(result.unwrap(), CallResult::from("done"));
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn test_refused_without_retry_makes_one_attempt() {
        let transport = ScriptedTransport::failing_then(1, refused(), "late".into());

        let result = run(CallDispatcher::default(), &transport, no_retry()).await;

        assert!(matches!(
            result,
            Err(ManagerError::ConnectionRefused { procedure: PROCEDURE })
        ));
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn test_refused_with_retry_keeps_trying_until_success() {
        for succeed_on in [1, 2, 5] {
            let transport =
                ScriptedTransport::failing_then(succeed_on - 1, refused(), "up".into());

            let result = run(CallDispatcher::default(), &transport, with_retry()).await;

            assert_eq!(result.unwrap(), CallResult::from("up"));
            assert_eq!(transport.attempts(), succeed_on);
        }
    }

    #[tokio::test]
    async fn test_transient_faults_are_retried_even_without_retry_flag() {
        for options in [no_retry(), with_retry()] {
            for fault in transient_faults() {
                let transport = ScriptedTransport::failing_then(1, fault.clone(), "ok".into());

                let result = run(CallDispatcher::default(), &transport, options).await;

                assert_eq!(result.unwrap(), CallResult::from("ok"), "{fault}");
                assert_eq!(transport.attempts(), 2);
            }
        }
    }

    #[tokio::test]
    async fn test_other_fault_without_retry_is_unexpected() {
        let transport = ScriptedTransport::new([Err(TransportFault::other(
            "http_status",
            "500 Internal Server Error",
        ))]);

        let result = run(CallDispatcher::default(), &transport, no_retry()).await;

        match result {
            Err(ManagerError::Unexpected {
                procedure,
                category,
                message,
            }) => {
                assert_eq!(procedure, PROCEDURE);
                assert_eq!(category, "http_status");
                assert_eq!(message, "500 Internal Server Error");
            }
            other => panic!("expected Unexpected, got {other:?}"),
        }
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn test_other_fault_with_retry_is_retried() {
        let transport = ScriptedTransport::failing_then(
            3,
            TransportFault::other("decode", "truncated body"),
            "recovered".into(),
        );

        let result = run(CallDispatcher::default(), &transport, with_retry()).await;

        assert_eq!(result.unwrap(), CallResult::from("recovered"));
        assert_eq!(transport.attempts(), 4);
    }

    #[tokio::test]
    async fn test_slow_attempt_counts_as_deadline_exceeded_and_is_retried() {
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let options = no_retry().with_deadline(Duration::from_millis(20));

        let result = CallDispatcher::default()
            .execute(PROCEDURE, options, || {
                let attempt = attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                    Ok::<_, TransportFault>(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bounded_policy_stops_after_max_attempts() {
        let policy = RetryPolicy::bounded(NonZeroU32::new(4).unwrap());
        let transport = ScriptedTransport::new((0..10).map(|_| Err(refused())));

        let result = run(CallDispatcher::new(policy), &transport, with_retry()).await;

        match result {
            Err(ManagerError::RetriesExhausted { attempts, last, .. }) => {
                assert_eq!(attempts, 4);
                assert_eq!(last, refused());
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(transport.attempts(), 4);
    }

    #[tokio::test]
    async fn test_bounded_policy_also_limits_transient_faults() {
        let policy = RetryPolicy::bounded(NonZeroU32::new(2).unwrap());
        let tls = TransportFault::Tls {
            message: "bad record mac".into(),
        };
        let transport = ScriptedTransport::failing_then(5, tls, "never".into());

        let result = run(CallDispatcher::new(policy), &transport, no_retry()).await;

        assert!(matches!(
            result,
            Err(ManagerError::RetriesExhausted { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_backoff_is_applied_between_attempts() {
        let backoff = Duration::from_millis(30);
        let policy = RetryPolicy::unbounded().with_backoff(backoff);
        let transport = ScriptedTransport::failing_then(2, refused(), "ok".into());

        let started = tokio::time::Instant::now();
        let result = run(CallDispatcher::new(policy), &transport, with_retry()).await;

        assert!(result.is_ok());
        assert!(started.elapsed() >= backoff * 2);
    }
}
