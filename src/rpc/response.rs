//! Response envelopes and their wire encoding
//!
//! Envelopes echo the caller's `id` and protocol marker. Error detail is
//! placed where each protocol generation expects it: `error.error` for
//! `version`-style requests, `error.data` for `jsonrpc`-style ones.

use serde::{
    ser::{SerializeMap, Serializer},
    Serialize,
};
use serde_json::Value;

use crate::{
    errors::{ErrorObject, RpcError},
    rpc::request::ProtocolVersion,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(Value),
    Error(ErrorObject),
}

/// Exactly one of `result`/`error` is ever present.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub outcome: Outcome,
    pub id: Option<Value>,
    pub version: ProtocolVersion,
}

impl ResponseEnvelope {
    pub fn success(result: Value, id: Option<Value>, version: ProtocolVersion) -> Self {
        Self {
            outcome: Outcome::Result(result),
            id,
            version,
        }
    }

    pub fn failure(error: &RpcError, id: Option<Value>, version: ProtocolVersion) -> Self {
        Self {
            outcome: Outcome::Error(error.to_error_object()),
            id,
            version,
        }
    }
}

struct PlacedError<'a> {
    error: &'a ErrorObject,
    trace_field: &'static str,
}

impl Serialize for PlacedError<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("code", &self.error.code)?;
        map.serialize_entry("name", self.error.name)?;
        map.serialize_entry("message", &self.error.message)?;
        if let Some(trace) = &self.error.trace {
            map.serialize_entry(self.trace_field, trace)?;
        }
        map.end()
    }
}

impl Serialize for ResponseEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match &self.outcome {
            Outcome::Result(value) => map.serialize_entry("result", &[value])?,
            Outcome::Error(error) => {
                let trace_field = match self.version {
                    ProtocolVersion::Version(_) => "error",
                    ProtocolVersion::JsonRpc(_) => "data",
                };
                map.serialize_entry("error", &PlacedError { error, trace_field })?;
            }
        }
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        match &self.version {
            ProtocolVersion::Version(version) => map.serialize_entry("version", version)?,
            ProtocolVersion::JsonRpc(marker) => map.serialize_entry("jsonrpc", marker)?,
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Single(ResponseEnvelope),
    Batch(Vec<ResponseEnvelope>),
}

impl Serialize for ResponseBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Single(envelope) => envelope.serialize(serializer),
            Self::Batch(envelopes) => envelopes.serialize(serializer),
        }
    }
}

pub fn encode(body: &ResponseBody) -> Vec<u8> {
    serde_json::to_vec(body).expect("response envelopes always serialize")
}

/// Helper for backends that build typed results: converts them into the
/// `Value` a `ModelBackend` returns. Set types come out as ordered lists,
/// and types with a custom `Serialize` use that representation.
pub fn encode_result<T: Serialize + ?Sized>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|err| {
        RpcError::server(
            "result could not be encoded",
            Some(format!("result encoding failed: {err}")),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use serde_json::json;

    use super::*;

    fn text(body: &ResponseBody) -> String {
        String::from_utf8(encode(body)).expect("utf8")
    }

    #[test]
    fn success_wraps_result_and_echoes_correlation() {
        let body = ResponseBody::Single(ResponseEnvelope::success(
            json!({"id": "m1"}),
            Some(json!(1)),
            ProtocolVersion::Version(json!("1.1")),
        ));
        assert_eq!(
            text(&body),
            r#"{"result":[{"id":"m1"}],"id":1,"version":"1.1"}"#
        );
    }

    #[test]
    fn version_requests_carry_trace_in_error_error() {
        let err = RpcError::server("boom", Some("Traceback: boom".to_string()));
        let body = ResponseBody::Single(ResponseEnvelope::failure(
            &err,
            Some(json!("abc")),
            ProtocolVersion::Version(json!("1.1")),
        ));
        assert_eq!(
            text(&body),
            r#"{"error":{"code":0,"name":"ServerError","message":"boom","error":"Traceback: boom"},"id":"abc","version":"1.1"}"#
        );
    }

    #[test]
    fn jsonrpc_requests_carry_trace_in_error_data() {
        let err = RpcError::server("boom", Some("trace".to_string()));
        let body = ResponseBody::Single(ResponseEnvelope::failure(
            &err,
            Some(json!(9)),
            ProtocolVersion::JsonRpc(json!(2.0)),
        ));
        let value: Value = serde_json::from_slice(&encode(&body)).expect("json");
        assert_eq!(value["error"]["data"], "trace");
        assert!(value["error"].get("error").is_none());
        assert_eq!(value["jsonrpc"], json!(2.0));
        assert!(value.get("version").is_none());
    }

    #[test]
    fn errors_without_id_omit_it() {
        let body = ResponseBody::Single(ResponseEnvelope::failure(
            &RpcError::parse("EOF while parsing"),
            None,
            ProtocolVersion::Version(json!("1.1")),
        ));
        assert_eq!(
            text(&body),
            r#"{"error":{"code":-32700,"name":"ParseError","message":"EOF while parsing"},"version":"1.1"}"#
        );
    }

    #[test]
    fn batches_encode_as_lists_in_order() {
        let version = ProtocolVersion::Version(json!("1.1"));
        let body = ResponseBody::Batch(vec![
            ResponseEnvelope::success(json!(1), Some(json!("a")), version.clone()),
            ResponseEnvelope::failure(&RpcError::method_not_found("x.y"), Some(json!("b")), version),
        ]);
        let value: Value = serde_json::from_slice(&encode(&body)).expect("json");
        assert_eq!(value[0]["id"], "a");
        assert_eq!(value[1]["error"]["name"], "MethodNotFound");
    }

    #[test]
    fn sets_encode_as_ordered_lists() {
        let reactions: BTreeSet<&str> = ["rxn00002", "rxn00001"].into_iter().collect();
        assert_eq!(
            encode_result(&reactions).expect("encodes"),
            json!(["rxn00001", "rxn00002"])
        );
    }

    struct Compound {
        id: &'static str,
        formula: &'static str,
    }

    impl Serialize for Compound {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&format!("{}:{}", self.id, self.formula))
        }
    }

    #[test]
    fn custom_representations_are_used() {
        let compound = Compound {
            id: "cpd00027",
            formula: "C6H12O6",
        };
        assert_eq!(
            encode_result(&compound).expect("encodes"),
            json!("cpd00027:C6H12O6")
        );
    }

    #[test]
    fn non_string_map_keys_fail_as_server_errors() {
        let mut weird = HashMap::new();
        weird.insert(vec![1_u8], 1_u8);
        let err = encode_result(&weird).expect_err("list keys are not representable");
        assert_eq!(err.name(), "ServerError");
    }
}
