//! JSON-RPC 2.0 envelopes exchanged with the job manager.
//!
//! - Request: `{"jsonrpc": "2.0", "method": "...", "params": [...], "id": "..."}`
//! - Response: `{"jsonrpc": "2.0", "result": ..., "error": ..., "id": "..."}`
//!
//! Parameters are always positional; the secret is the last element.

use manager::Procedure;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// JSON-RPC protocol version sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// Outgoing request envelope.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    /// Always [`JSONRPC_VERSION`].
    pub jsonrpc: &'static str,
    /// Wire name of the procedure.
    pub method: &'static str,
    /// Positional arguments, secret last.
    pub params: &'a [Value],
    /// Fresh UUID per request, used to correlate logs.
    pub id: String,
}

impl<'a> RpcRequest<'a> {
    /// Builds a request for `procedure` with a new random id.
    pub fn new(procedure: Procedure, params: &'a [Value]) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: procedure.wire_name(),
            params,
            id: Uuid::new_v4().to_string(),
        }
    }
}

/// Incoming response envelope.
///
/// A JSON `null` result and a missing result both decode as `None`.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    /// Result on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error object on failure.
    #[serde(default)]
    pub error: Option<RpcError>,
    /// Echo of the request id.
    #[serde(default)]
    pub id: Value,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Short description.
    pub message: String,
    /// Optional extra detail.
    #[serde(default)]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_serialises_positional_params() {
        let params = [json!({"engine": "mpi"}), json!("secret")];
        let request = RpcRequest::new(Procedure::StartJob, &params);

        let wire = serde_json::to_value(&request).unwrap();

        assert_eq!(wire["jsonrpc"], "2.0");
        assert_eq!(wire["method"], "start_job");
        assert_eq!(wire["params"], json!([{"engine": "mpi"}, "secret"]));
        assert!(Uuid::parse_str(wire["id"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_each_request_gets_a_fresh_id() {
        let params = [json!("secret")];
        let a = RpcRequest::new(Procedure::GetAcl, &params);
        let b = RpcRequest::new(Procedure::GetAcl, &params);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_response_with_error_object() {
        let response: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32601, "message": "Method not found"},
            "id": "1"
        }))
        .unwrap();

        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "Method not found");
    }
}
