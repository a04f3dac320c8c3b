//! Request parsing and default filling
//!
//! Decodes a raw body into one or more request records. Only the structural
//! shape is checked here; method resolution and argument validation belong
//! to the dispatcher.

use serde_json::{Map, Value};

use crate::errors::RpcError;

/// Protocol version marker as the client spelled it, echoed back verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolVersion {
    /// A `version` field, usually a string such as `"1.1"`.
    Version(Value),
    /// A `jsonrpc` field, usually numeric.
    JsonRpc(Value),
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::Version(Value::String("1.0".to_string()))
    }
}

impl ProtocolVersion {
    /// Named parameters are accepted from version 1.1 onwards, whichever
    /// field carries the marker.
    pub fn supports_named_params(&self) -> bool {
        self.numeric().is_some_and(|version| version >= 1.1)
    }

    fn marker(&self) -> &Value {
        match self {
            Self::Version(marker) | Self::JsonRpc(marker) => marker,
        }
    }

    pub fn numeric(&self) -> Option<f64> {
        match self.marker() {
            Value::Number(number) => number.as_f64(),
            Value::String(version) => version.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self.marker() {
            Value::String(version) => version.clone(),
            other => other.to_string(),
        }
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        match (object.get("version"), object.get("jsonrpc")) {
            (Some(version), _) if !version.is_null() => Self::Version(version.clone()),
            (_, Some(marker)) if !marker.is_null() => Self::JsonRpc(marker.clone()),
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub method: String,
    pub params: Params,
    /// `None` marks a notification.
    pub id: Option<Value>,
    pub version: ProtocolVersion,
}

impl RequestRecord {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A batch entry (or single object) that could not be turned into a record.
/// Keeps whatever correlation data was readable so the error can be echoed.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub id: Option<Value>,
    pub version: ProtocolVersion,
    pub error: RpcError,
}

pub type ParsedEntry = Result<RequestRecord, RejectedRecord>;

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    Single(ParsedEntry),
    Batch(Vec<ParsedEntry>),
}

pub fn parse(raw: &[u8]) -> Result<ParsedPayload, RpcError> {
    let payload: Value =
        serde_json::from_slice(raw).map_err(|err| RpcError::parse(err.to_string()))?;
    parse_value(payload)
}

pub fn parse_value(payload: Value) -> Result<ParsedPayload, RpcError> {
    match payload {
        Value::Object(object) if !object.is_empty() => {
            Ok(ParsedPayload::Single(fill_record(Value::Object(object))))
        }
        Value::Array(items) if !items.is_empty() => Ok(ParsedPayload::Batch(
            items.into_iter().map(fill_record).collect(),
        )),
        _ => Err(RpcError::invalid_request(
            "request must be a non-empty object or a non-empty list of objects",
        )),
    }
}

fn fill_record(value: Value) -> ParsedEntry {
    let Value::Object(mut object) = value else {
        return Err(RejectedRecord {
            id: None,
            version: ProtocolVersion::default(),
            error: RpcError::invalid_request("batch entries must be objects"),
        });
    };

    let version = ProtocolVersion::from_object(&object);
    let id = object.remove("id").filter(|id| !id.is_null());
    let reject = |id: Option<Value>, message: &str| RejectedRecord {
        id,
        version: version.clone(),
        error: RpcError::invalid_request(message),
    };

    let method = match object.remove("method") {
        Some(Value::String(method)) => method,
        Some(_) => return Err(reject(id, "method must be a string")),
        None => return Err(reject(id, "method is required")),
    };

    let params = match object.remove("params") {
        None | Some(Value::Null) => Params::None,
        Some(Value::Array(items)) => Params::Positional(items),
        Some(Value::Object(map)) => Params::Named(map),
        Some(_) => return Err(reject(id, "params must be a list or an object")),
    };

    Ok(RequestRecord {
        method,
        params,
        id,
        version,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn single(raw: &str) -> ParsedEntry {
        match parse(raw.as_bytes()).expect("parses") {
            ParsedPayload::Single(entry) => entry,
            ParsedPayload::Batch(_) => panic!("expected single request"),
        }
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse(br#"{"method":"fbaModelServices.get_models","params":[{"#)
            .expect_err("truncated body");
        assert_eq!(err.code(), -32700);
    }

    #[test]
    fn single_object_is_default_filled() {
        let record = single(r#"{"method":"fbaModelServices.get_models"}"#).expect("valid");
        assert_eq!(record.method, "fbaModelServices.get_models");
        assert_eq!(record.params, Params::None);
        assert!(record.is_notification());
        assert_eq!(record.version, ProtocolVersion::default());
    }

    #[test]
    fn single_object_keeps_fields() {
        let record = single(
            r#"{"method":"fbaModelServices.get_models","params":[{"ids":["m1"]}],"id":1,"version":"1.1"}"#,
        )
        .expect("valid");
        assert_eq!(record.id, Some(json!(1)));
        assert_eq!(record.params, Params::Positional(vec![json!({"ids": ["m1"]})]));
        assert_eq!(record.version, ProtocolVersion::Version(json!("1.1")));
    }

    #[test]
    fn null_id_is_a_notification() {
        let record = single(r#"{"method":"a.b","id":null}"#).expect("valid");
        assert!(record.is_notification());
    }

    #[test]
    fn jsonrpc_marker_is_kept_verbatim() {
        let record = single(r#"{"method":"a.b","jsonrpc":2.0,"id":"x"}"#).expect("valid");
        assert_eq!(record.version, ProtocolVersion::JsonRpc(json!(2.0)));
    }

    #[test]
    fn non_string_version_is_kept_verbatim_and_null_means_absent() {
        let record = single(r#"{"method":"a.b","version":1.1,"id":1}"#).expect("valid");
        assert_eq!(record.version, ProtocolVersion::Version(json!(1.1)));
        assert!(record.version.supports_named_params());

        let record = single(r#"{"method":"a.b","version":null,"id":1}"#).expect("valid");
        assert_eq!(record.version, ProtocolVersion::default());
    }

    #[test]
    fn empty_containers_and_scalars_are_invalid_requests() {
        for raw in ["{}", "[]", "42", "\"text\"", "null"] {
            let err = parse(raw.as_bytes()).expect_err(raw);
            assert_eq!(err.name(), "InvalidRequest", "{raw}");
        }
    }

    #[test]
    fn batch_entries_are_filled_independently() {
        let parsed = parse(br#"[{"method":"a.b","id":1},7,{"id":3}]"#).expect("parses");
        let ParsedPayload::Batch(entries) = parsed else {
            panic!("expected batch");
        };

        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_ok());
        assert_eq!(entries[1].as_ref().expect_err("scalar").id, None);
        let rejected = entries[2].as_ref().expect_err("missing method");
        assert_eq!(rejected.id, Some(json!(3)));
        assert_eq!(rejected.error.name(), "InvalidRequest");
    }

    #[test]
    fn scalar_params_are_rejected() {
        let rejected = single(r#"{"method":"a.b","params":"nope","id":2}"#).expect_err("bad");
        assert_eq!(rejected.id, Some(json!(2)));
    }

    #[test]
    fn named_params_support_derives_from_either_marker() {
        let version = |value: Value| ProtocolVersion::from_object(value.as_object().expect("object"));

        assert!(version(json!({"version": "1.1"})).supports_named_params());
        assert!(!version(json!({"version": "1.0"})).supports_named_params());
        assert!(!version(json!({})).supports_named_params());
        assert!(version(json!({"version": 1.1})).supports_named_params());
        assert!(version(json!({"version": null, "jsonrpc": 2.0})).supports_named_params());
        assert!(version(json!({"jsonrpc": 2.0})).supports_named_params());
        assert!(version(json!({"jsonrpc": "2.0"})).supports_named_params());
        assert!(version(json!({"jsonrpc": 1.1})).supports_named_params());
        assert!(!version(json!({"jsonrpc": 1.0})).supports_named_params());
        assert!(!version(json!({"jsonrpc": "one"})).supports_named_params());
    }
}
