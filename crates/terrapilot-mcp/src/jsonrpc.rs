//! JSON-RPC 2.0 message types and the tolerant message parser.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::ErrorCode;

/// The only protocol tag accepted on the wire.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier; echoed verbatim in the matching response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        RequestId::Number(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        RequestId::String(value.to_string())
    }
}

/// A request, or a notification when `id` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Wire error object.
///
/// `code` is any integer a peer may send; errors built here always carry one
/// of the fixed [`ErrorCode`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// The fixed code this error carries, if it is one of them.
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(ErrorCode::MethodNotFound, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

/// A response carrying exactly one of `result` or `error`.
///
/// Build through [`Response::success`] or [`Response::failure`]; `id` is
/// serialized as `null` when the request id could not be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<RequestId>, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Any message that can arrive on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Message::Request(request) => serde_json::to_string(request),
            Message::Response(response) => serde_json::to_string(response),
        }
    }
}

/// A message that could not be turned into a [`Message`], together with the
/// id to report the failure under (null when unrecoverable).
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub id: Option<RequestId>,
    pub error: RpcError,
}

impl Rejected {
    fn new(id: Option<RequestId>, error: RpcError) -> Self {
        Self { id, error }
    }

    pub fn into_response(self) -> Response {
        Response::failure(self.id, self.error)
    }
}

/// Parse one raw message.
///
/// Malformed JSON is a parse error. JSON that is not an object, lacks the
/// `"2.0"` tag, or carries neither a `method` nor a `result`/`error` is an
/// invalid request. Invalid-tag failures are reported with a null id.
pub fn parse_message(raw: &str) -> Result<Message, Rejected> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| Rejected::new(None, RpcError::parse_error(format!("Parse error: {e}"))))?;

    let Value::Object(object) = value else {
        return Err(Rejected::new(
            None,
            RpcError::invalid_request("Invalid Request: expected a JSON object"),
        ));
    };

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(Rejected::new(
            None,
            RpcError::invalid_request("Invalid Request: jsonrpc must be \"2.0\""),
        ));
    }

    let id = match object.get("id") {
        None | Some(Value::Null) => None,
        Some(raw_id) => Some(serde_json::from_value::<RequestId>(raw_id.clone()).map_err(|_| {
            Rejected::new(
                None,
                RpcError::invalid_request("Invalid Request: id must be an integer or a string"),
            )
        })?),
    };

    if let Some(method) = object.get("method") {
        if !method.is_string() {
            return Err(Rejected::new(
                id,
                RpcError::invalid_request("Invalid Request: method must be a string"),
            ));
        }
        return serde_json::from_value::<Request>(Value::Object(object))
            .map(Message::Request)
            .map_err(|e| Rejected::new(id, RpcError::invalid_request(format!("Invalid Request: {e}"))));
    }

    if object.contains_key("result") || object.contains_key("error") {
        let response = serde_json::from_value::<Response>(Value::Object(object.clone()))
            .unwrap_or_else(|_| loose_response(id, &object));
        return Ok(Message::Response(response));
    }

    Err(Rejected::new(
        id,
        RpcError::invalid_request("Invalid Request: missing method"),
    ))
}

/// A response whose members do not match the wire shape is still a
/// response; keep what can be recovered.
fn loose_response(id: Option<RequestId>, object: &serde_json::Map<String, Value>) -> Response {
    let error = object.get("error").filter(|raw| !raw.is_null()).map(|raw| {
        serde_json::from_value::<RpcError>(raw.clone())
            .unwrap_or_else(|_| RpcError::internal("Malformed error object").with_data(raw.clone()))
    });
    Response {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        result: object.get("result").cloned(),
        error,
    }
}
