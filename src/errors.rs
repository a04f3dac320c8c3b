use serde_json::Value;
use thiserror::Error;

/// Protocol-level failures. Every variant ends up as an error envelope; none
/// of them is ever surfaced to the HTTP layer as a fault.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RpcError {
    #[error("parse error: {message}")]
    Parse { message: String },
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
    #[error("method not found: {method}")]
    MethodNotFound { method: String },
    #[error("invalid params: {message}")]
    InvalidParams { message: String },
    #[error("keyword arguments are not supported by protocol version {version}")]
    Keyword { version: String },
    #[error("authentication required: {message}")]
    AuthenticationRequired { message: String },
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },
    #[error("server error: {message}")]
    Server {
        message: String,
        trace: Option<String>,
    },
}

/// The `error` member of an error envelope, before version-specific
/// placement of the trace.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorObject {
    pub code: i64,
    pub name: &'static str,
    pub message: String,
    pub trace: Option<String>,
}

impl RpcError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>, trace: Option<String>) -> Self {
        Self::Server {
            message: message.into(),
            trace,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Parse { .. } => -32700,
            Self::InvalidRequest { .. } => -32600,
            Self::MethodNotFound { .. } => -32601,
            Self::InvalidParams { .. } | Self::Keyword { .. } => -32602,
            Self::AuthenticationRequired { .. }
            | Self::AuthenticationFailed { .. }
            | Self::Server { .. } => 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "ParseError",
            Self::InvalidRequest { .. } => "InvalidRequest",
            Self::MethodNotFound { .. } => "MethodNotFound",
            Self::InvalidParams { .. } => "InvalidParams",
            Self::Keyword { .. } => "KeywordError",
            Self::AuthenticationRequired { .. } => "AuthenticationRequired",
            Self::AuthenticationFailed { .. } => "AuthenticationFailed",
            Self::Server { .. } => "ServerError",
        }
    }

    pub fn to_error_object(&self) -> ErrorObject {
        let (message, trace) = match self {
            Self::Parse { message }
            | Self::InvalidRequest { message }
            | Self::InvalidParams { message }
            | Self::AuthenticationRequired { message }
            | Self::AuthenticationFailed { message } => (message.clone(), None),
            Self::MethodNotFound { method } => (format!("Method not found: {method}"), None),
            Self::Keyword { .. } => (
                "Keyword arguments require protocol version 1.1 or later".to_string(),
                None,
            ),
            Self::Server { message, trace } => (message.clone(), trace.clone()),
        };

        ErrorObject {
            code: self.code(),
            name: self.name(),
            message,
            trace,
        }
    }
}

/// What a handler may fail with: a deliberate protocol error, passed through
/// as is, or anything else, which is wrapped into a `ServerError`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn into_rpc_error(self) -> RpcError {
        match self {
            Self::Rpc(err) => err,
            Self::Failed(err) => RpcError::server(err.to_string(), Some(format!("{err:?}"))),
        }
    }
}

pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "handler panicked".to_string()
}

pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_names_follow_the_taxonomy() {
        let cases = [
            (RpcError::parse("x"), -32700, "ParseError"),
            (RpcError::invalid_request("x"), -32600, "InvalidRequest"),
            (RpcError::method_not_found("M.m"), -32601, "MethodNotFound"),
            (RpcError::invalid_params("x"), -32602, "InvalidParams"),
            (
                RpcError::Keyword {
                    version: "1.0".to_string(),
                },
                -32602,
                "KeywordError",
            ),
            (
                RpcError::AuthenticationRequired {
                    message: "x".to_string(),
                },
                0,
                "AuthenticationRequired",
            ),
            (
                RpcError::AuthenticationFailed {
                    message: "x".to_string(),
                },
                0,
                "AuthenticationFailed",
            ),
            (RpcError::server("x", None), 0, "ServerError"),
        ];

        for (err, code, name) in cases {
            let object = err.to_error_object();
            assert_eq!(object.code, code, "{name}");
            assert_eq!(object.name, name);
        }
    }

    #[test]
    fn handler_failures_become_server_errors_with_chain_as_trace() {
        let err = anyhow::anyhow!("solver exploded").context("runfba failed");
        let rpc = HandlerError::from(err).into_rpc_error();

        let RpcError::Server { message, trace } = rpc else {
            panic!("expected server error");
        };
        assert_eq!(message, "runfba failed");
        let trace = trace.expect("trace present");
        assert!(trace.contains("solver exploded"));
    }

    #[test]
    fn protocol_errors_raised_by_handlers_pass_through() {
        let rpc = HandlerError::from(RpcError::invalid_params("bad ids")).into_rpc_error();
        assert_eq!(rpc, RpcError::invalid_params("bad ids"));
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "handler panicked");
    }
}
