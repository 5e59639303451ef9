//! Line-delimited JSON-RPC envelopes.

use mgit_mcp_core::codes::{INTERNAL_ERROR, INVALID_REQUEST, JSONRPC_VERSION};
use rmcp::ErrorData as McpError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One inbound request or notification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    /// Protocol tag; anything but `"2.0"` is rejected
    #[serde(default)]
    pub jsonrpc: Value,
    /// Correlation id, echoed back; `null` for notifications
    #[serde(default)]
    pub id: Value,
    /// Method name
    pub method: String,
    /// Parameters, open shape
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    /// Whether the protocol tag is the accepted one.
    pub fn has_supported_version(&self) -> bool {
        self.jsonrpc.as_str() == Some(JSONRPC_VERSION)
    }

    /// Parameters, or an empty object when absent or `null`.
    pub fn params_or_empty(&self) -> Value {
        match &self.params {
            Some(Value::Null) | None => Value::Object(Default::default()),
            Some(params) => params.clone(),
        }
    }
}

/// Error object carried by a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// JSON-RPC error code
    pub code: i32,
    /// Human-readable message
    pub message: String,
}

impl ErrorObject {
    /// Build an error object.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<McpError> for ErrorObject {
    fn from(err: McpError) -> Self {
        Self {
            code: err.code.0,
            message: err.message.into_owned(),
        }
    }
}

/// Exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome {
    /// Successful result, possibly `null`
    #[serde(rename = "result")]
    Result(Value),
    /// Failure
    #[serde(rename = "error")]
    Error(ErrorObject),
}

/// One outbound response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// Correlation id of the request
    pub id: Value,
    /// Result or error
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    /// Successful response.
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            outcome: Outcome::Result(result),
        }
    }

    /// Error response.
    pub fn error(id: Value, error: ErrorObject) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            outcome: Outcome::Error(error),
        }
    }
}

/// Why an inbound line could not be turned into a [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    /// Not valid JSON
    Parse(String),
    /// Valid JSON that is not a request object
    Shape {
        /// Id recovered from the object, if any
        id: Value,
        /// What was wrong
        reason: String,
    },
}

impl EnvelopeError {
    /// Response sent back for this failure.
    pub fn to_response(&self) -> Response {
        match self {
            EnvelopeError::Parse(reason) => Response::error(
                Value::Null,
                ErrorObject::new(INTERNAL_ERROR, format!("Internal error: {reason}")),
            ),
            EnvelopeError::Shape { id, reason } => Response::error(
                id.clone(),
                ErrorObject::new(INVALID_REQUEST, format!("Invalid Request: {reason}")),
            ),
        }
    }
}

/// Parse one inbound line.
pub fn parse_line(line: &str) -> Result<Request, EnvelopeError> {
    let value: Value =
        serde_json::from_str(line).map_err(|e| EnvelopeError::Parse(e.to_string()))?;

    let id = match &value {
        Value::Object(obj) => obj.get("id").cloned().unwrap_or(Value::Null),
        _ => {
            return Err(EnvelopeError::Shape {
                id: Value::Null,
                reason: "expected a JSON object".to_string(),
            })
        }
    };

    serde_json::from_value(value).map_err(|e| EnvelopeError::Shape {
        id,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_parse_request() {
        let request =
            parse_line(r#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#).unwrap();
        assert!(request.has_supported_version());
        assert_eq!(request.id, json!(1));
        assert_eq!(request.method, "ping");
    }

    #[test]
    fn test_parse_notification_without_id_or_params() {
        let request = parse_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .unwrap();
        assert!(request.id.is_null());
        assert_eq!(request.params_or_empty(), json!({}));
    }

    #[test]
    fn test_wrong_version_still_parses() {
        let request = parse_line(r#"{"jsonrpc":"1.0","id":"a","method":"ping"}"#).unwrap();
        assert!(!request.has_supported_version());

        let missing = parse_line(r#"{"id":"a","method":"ping"}"#).unwrap();
        assert!(!missing.has_supported_version());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_line("{not json").unwrap_err();
        let response = serde_json::to_value(err.to_response()).unwrap();
        assert_eq!(response["id"], Value::Null);
        assert_eq!(response["error"]["code"], INTERNAL_ERROR);
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Internal error: "));
    }

    #[test]
    fn test_missing_method_is_shape_error_with_id() {
        let err = parse_line(r#"{"jsonrpc":"2.0","id":9}"#).unwrap_err();
        let response = err.to_response();
        assert_eq!(response.id, json!(9));
        match response.outcome {
            Outcome::Error(e) => assert_eq!(e.code, INVALID_REQUEST),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_object_is_shape_error() {
        assert!(matches!(
            parse_line("[1,2,3]"),
            Err(EnvelopeError::Shape { .. })
        ));
    }

    #[test]
    fn test_response_has_exactly_one_outcome() {
        let ok = serde_json::to_value(Response::result(json!(1), Value::Null)).unwrap();
        assert_eq!(ok, json!({"jsonrpc": "2.0", "id": 1, "result": null}));

        let err = serde_json::to_value(Response::error(
            json!(2),
            ErrorObject::new(-32601, "Unknown method: nope"),
        ))
        .unwrap();
        assert_eq!(
            err,
            json!({"jsonrpc": "2.0", "id": 2, "error": {"code": -32601, "message": "Unknown method: nope"}})
        );
    }

    #[test]
    fn test_error_object_from_mcp_error() {
        let err = McpError::new(ErrorCode(-32603), "MGit push failed: boom".to_string(), None);
        let object = ErrorObject::from(err);
        assert_eq!(object, ErrorObject::new(-32603, "MGit push failed: boom"));
    }
}
