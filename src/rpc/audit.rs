//! Redaction of call parameters before they reach the logs

use serde_json::Value;

use crate::rpc::request::Params;

pub fn redact_audit_params(params: &Params) -> Value {
    match params {
        Params::Positional(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        Params::Named(map) => redact_audit_value(&Value::Object(map.clone())),
        Params::None => Value::Null,
    }
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

/// Workspace calls historically carry the caller's token under `auth`.
pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "auth" | "authorization" | "bearer" | "credential" | "credentials" | "api_key" | "apikey"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn redacts_sensitive_fields_in_positional_params() {
        let params = Params::Positional(vec![json!({
            "model": "iJO1366",
            "workspace": "kbasetest:home",
            "auth": "un=kbasetest|sig=abc",
            "nested": {
                "refresh_token": "should-not-appear",
                "media": "Carbon-D-Glucose"
            }
        })]);

        let redacted = redact_audit_params(&params);

        assert_eq!(redacted[0]["model"], json!("iJO1366"));
        assert_eq!(redacted[0]["auth"], json!("[REDACTED]"));
        assert_eq!(redacted[0]["nested"]["refresh_token"], json!("[REDACTED]"));
        assert_eq!(redacted[0]["nested"]["media"], json!("Carbon-D-Glucose"));
    }

    #[test]
    fn absent_params_log_as_null() {
        assert_eq!(redact_audit_params(&Params::None), Value::Null);
    }

    #[test]
    fn authoring_fields_are_not_mistaken_for_credentials() {
        assert!(!is_sensitive_key("author"));
        assert!(is_sensitive_key("Auth"));
        assert!(is_sensitive_key("workspace_token"));
    }
}
