//! Value types exchanged with the job manager and the knobs that govern a call.
//!
//! [`JobData`] and [`CallResult`] are the request and response payloads; the
//! client passes them through without interpreting them. [`RemoteReply`] is the
//! tagged view of a result once the `Error:` marker has been checked.
//! [`CallOptions`] and [`RetryPolicy`] are explicit, caller-supplied settings
//! for the deadline and the retry loop.

use std::num::NonZeroU32;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Request payload
// ---------------------------------------------------------------------------

/// Opaque key/value payload describing a job, its inputs, or an ACL target.
///
/// Built and validated by the submitting front end. This crate forwards it
/// unchanged as one positional argument of the remote call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobData(Map<String, Value>);

impl JobData {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Adds or replaces a field, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Adds or replaces a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts the payload into a JSON value for the wire.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for JobData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for JobData {
    type Error = Value;

    /// Accepts JSON objects only; any other value is handed back unchanged.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Response payload
// ---------------------------------------------------------------------------

/// Historical measurements returned by `get_profiling_info`.
///
/// Both series are ordered oldest first, as recorded by the job manager.
/// Replies carrying any other key do not decode as `ProfilingInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilingInfo {
    /// Observed run times.
    pub performance: Vec<f64>,
    /// Observed costs.
    pub cost: Vec<f64>,
}

/// Raw result of a remote call.
///
/// Variants are tried in declaration order when decoding; anything that does
/// not fit one of the documented shapes is kept as [`CallResult::Raw`] so no
/// response is ever discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallResult {
    /// Boolean answer (file existence).
    Flag(bool),
    /// Textual status, content, or ACL.
    Text(String),
    /// Engine names.
    Engines(Vec<String>),
    /// Performance and cost series.
    Profiling(ProfilingInfo),
    /// Any other JSON shape.
    Raw(Value),
}

impl CallResult {
    /// Returns the text if this is a textual result.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CallResult::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the boolean if this is a flag.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            CallResult::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns the engine names if this is a list of strings.
    pub fn as_engines(&self) -> Option<&[String]> {
        match self {
            CallResult::Engines(engines) => Some(engines),
            _ => None,
        }
    }

    /// Returns the profiling series if this is a profiling mapping.
    pub fn as_profiling(&self) -> Option<&ProfilingInfo> {
        match self {
            CallResult::Profiling(info) => Some(info),
            _ => None,
        }
    }

    /// Returns `true` if this is text carrying the [`ERROR_MARKER`].
    pub fn has_error_marker(&self) -> bool {
        self.as_text().is_some_and(|text| text.contains(ERROR_MARKER))
    }
}

impl From<&str> for CallResult {
    fn from(text: &str) -> Self {
        CallResult::Text(text.to_owned())
    }
}

impl From<String> for CallResult {
    fn from(text: String) -> Self {
        CallResult::Text(text)
    }
}

impl From<bool> for CallResult {
    fn from(flag: bool) -> Self {
        CallResult::Flag(flag)
    }
}

impl From<Vec<String>> for CallResult {
    fn from(engines: Vec<String>) -> Self {
        CallResult::Engines(engines)
    }
}

impl From<ProfilingInfo> for CallResult {
    fn from(info: ProfilingInfo) -> Self {
        CallResult::Profiling(info)
    }
}

// ---------------------------------------------------------------------------
// Application-level errors
// ---------------------------------------------------------------------------

/// Substring the job manager places in a textual result to report a failure.
///
/// Matched anywhere in the text, not only at the start, because that is how
/// the job manager's existing responses have always been recognised.
pub const ERROR_MARKER: &str = "Error:";

/// A result after checking for an application-level error.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteReply {
    /// The call succeeded; the result is unchanged.
    Ok(CallResult),
    /// The job manager reported a failure. Holds the full response text.
    ApplicationError(String),
}

impl RemoteReply {
    /// Tags `result` as an application error if it is text containing
    /// [`ERROR_MARKER`].
    pub fn inspect(result: CallResult) -> Self {
        match result {
            CallResult::Text(text) if text.contains(ERROR_MARKER) => {
                RemoteReply::ApplicationError(text)
            }
            other => RemoteReply::Ok(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Call settings
// ---------------------------------------------------------------------------

/// Deadline that is, for practical purposes, no deadline at all.
///
/// Large uploads and long-running compilations can hold a call open for a
/// long time; bindings use this unless the caller configures otherwise.
pub const UNBOUNDED_DEADLINE: Duration = Duration::from_secs(100_000);

/// Per-call settings passed to [`crate::CallDispatcher::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOptions {
    /// Longest a single attempt may run before it counts as a
    /// deadline-exceeded fault.
    pub deadline: Duration,

    /// Whether connection refusals and unclassified faults are retried.
    ///
    /// TLS, capability-negotiation, and deadline faults are retried either way.
    pub retry_on_failure: bool,
}

impl CallOptions {
    /// Returns a copy with a different per-attempt deadline.
    #[must_use]
    pub fn with_deadline(self, deadline: Duration) -> Self {
        Self { deadline, ..self }
    }

    /// Returns a copy with `retry_on_failure` set.
    #[must_use]
    pub fn with_retry_on_failure(self, retry_on_failure: bool) -> Self {
        Self {
            retry_on_failure,
            ..self
        }
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            deadline: UNBOUNDED_DEADLINE,
            retry_on_failure: false,
        }
    }
}

// ---------------------------------------------------------------------------

/// How many times, and how far apart, the dispatcher retries a failed call.
///
/// The default is unbounded with no delay, which is how the job manager client
/// has always behaved. Bounding it makes the loop testable and lets operator
/// tools give up on a manager that never comes up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts allowed, the first one included. `None` means unbounded.
    pub max_attempts: Option<NonZeroU32>,

    /// Pause between attempts. Zero retries immediately.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Unbounded attempts, no delay.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// At most `max_attempts` attempts, no delay.
    pub fn bounded(max_attempts: NonZeroU32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff: Duration::ZERO,
        }
    }

    /// Returns a copy that waits `backoff` between attempts.
    #[must_use]
    pub fn with_backoff(self, backoff: Duration) -> Self {
        Self { backoff, ..self }
    }

    /// Returns `true` if another attempt may follow attempt number `attempt`
    /// (1-based).
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt < max.get(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_call_result_decodes_each_documented_shape() {
        let cases = [
            (json!(true), CallResult::Flag(true)),
            (json!("job-42"), CallResult::from("job-42")),
            (
                json!(["hadoop", "mpi"]),
                CallResult::Engines(vec!["hadoop".into(), "mpi".into()]),
            ),
            (
                json!({"performance": [1.5, 2.0], "cost": [0.1]}),
                CallResult::Profiling(ProfilingInfo {
                    performance: vec![1.5, 2.0],
                    cost: vec![0.1],
                }),
            ),
        ];

        for (wire, expected) in cases {
            let decoded: CallResult = serde_json::from_value(wire).unwrap();
            assert_eq!(decoded, expected);
        }
    }

    #[test]
    fn test_unrecognised_shapes_are_kept_raw() {
        let decoded: CallResult = serde_json::from_value(json!({"status": 3})).unwrap();
        assert_eq!(decoded, CallResult::Raw(json!({"status": 3})));

        let decoded: CallResult = serde_json::from_value(Value::Null).unwrap();
        assert_eq!(decoded, CallResult::Raw(Value::Null));
    }

    #[test]
    fn test_profiling_reply_with_extra_keys_is_kept_raw() {
        let wire = json!({"performance": [1.0], "cost": [2.0], "unit": "usd"});

        let decoded: CallResult = serde_json::from_value(wire.clone()).unwrap();

        assert_eq!(decoded, CallResult::Raw(wire.clone()));
        assert_eq!(serde_json::to_value(&decoded).unwrap(), wire);
    }

    #[test]
    fn test_marker_is_matched_anywhere_in_text() {
        let reply = RemoteReply::inspect("job failed. Error: bad secret".into());
        assert_eq!(
            reply,
            RemoteReply::ApplicationError("job failed. Error: bad secret".to_owned())
        );
    }

    #[test]
    fn test_marker_match_is_case_sensitive() {
        let reply = RemoteReply::inspect("error: lowercase is not the marker".into());
        assert!(matches!(reply, RemoteReply::Ok(_)));
    }

    #[test]
    fn test_non_text_results_are_never_application_errors() {
        let engines = CallResult::Engines(vec!["Error: not text".into()]);
        assert_eq!(RemoteReply::inspect(engines.clone()), RemoteReply::Ok(engines));
    }

    #[test]
    fn test_job_data_rejects_non_objects() {
        assert!(JobData::try_from(json!([1, 2])).is_err());

        let data = JobData::try_from(json!({"engine": "mapreduce"})).unwrap();
        assert_eq!(data.get("engine"), Some(&json!("mapreduce")));
    }

    #[test]
    fn test_default_call_options_are_unbounded_without_retry() {
        let options = CallOptions::default();
        assert_eq!(options.deadline, UNBOUNDED_DEADLINE);
        assert!(!options.retry_on_failure);
    }

    #[test]
    fn test_retry_policy_limits() {
        assert!(RetryPolicy::unbounded().allows_retry_after(u32::MAX - 1));

        let policy = RetryPolicy::bounded(NonZeroU32::new(3).unwrap());
        assert!(policy.allows_retry_after(1));
        assert!(policy.allows_retry_after(2));
        assert!(!policy.allows_retry_after(3));
    }
}
