//! Method registry
//!
//! Maps `Module.method` names to handlers together with their declared
//! signature and auth policy. Populated once at start-up and read-only
//! afterwards, so it is shared between requests without locking.

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    auth::AuthPolicy,
    errors::{value_kind, HandlerError, RpcError},
    rpc::{context::CallContext, request::Params},
};

/// A remote operation. Arguments arrive already resolved into positional
/// order and checked against the entry's [`Signature`].
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn call(&self, ctx: &CallContext, args: Vec<Value>) -> Result<Value, HandlerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Object,
    List,
    String,
    Number,
    Boolean,
    Any,
}

impl ParamKind {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::List => value.is_array(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Any => true,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Object => "object",
            Self::List => "list",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Explicit arity descriptor. Required parameters must precede optional
/// ones; `variadic` lifts the upper bound for positional calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<ParamSpec>,
    pub variadic: bool,
    pub named: bool,
}

impl Signature {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self {
            params,
            variadic: false,
            named: true,
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn positional_only(mut self) -> Self {
        self.named = false;
        self
    }

    pub fn min_args(&self) -> usize {
        self.params.iter().filter(|param| param.required).count()
    }

    pub fn max_args(&self) -> Option<usize> {
        (!self.variadic).then_some(self.params.len())
    }

    /// Resolves request params into positional arguments, enforcing arity,
    /// keyword names and declared kinds.
    pub fn bind(&self, params: Params) -> Result<Vec<Value>, RpcError> {
        let args = match params {
            Params::None => Vec::new(),
            Params::Positional(args) => {
                if args.len() < self.min_args() {
                    return Err(RpcError::invalid_params(format!(
                        "not enough arguments: expected at least {}, got {}",
                        self.min_args(),
                        args.len()
                    )));
                }
                if let Some(max) = self.max_args().filter(|max| args.len() > *max) {
                    return Err(RpcError::invalid_params(format!(
                        "too many arguments: expected at most {max}, got {}",
                        args.len()
                    )));
                }
                args
            }
            Params::Named(map) => self.bind_named(map)?,
        };

        if args.len() < self.min_args() {
            return Err(RpcError::invalid_params(format!(
                "not enough arguments: expected at least {}, got {}",
                self.min_args(),
                args.len()
            )));
        }

        for (position, (spec, value)) in self.params.iter().zip(args.iter()).enumerate() {
            if !spec.kind.accepts(value) {
                return Err(RpcError::invalid_params(format!(
                    "argument {} ({}) must be of type {}, got {}",
                    position + 1,
                    spec.name,
                    spec.kind,
                    value_kind(value)
                )));
            }
        }

        Ok(args)
    }

    fn bind_named(&self, mut map: Map<String, Value>) -> Result<Vec<Value>, RpcError> {
        if !self.named {
            return Err(RpcError::invalid_params(
                "this method only accepts positional arguments",
            ));
        }

        let mut args = Vec::with_capacity(self.params.len());
        let mut skipped: Option<&str> = None;
        for spec in &self.params {
            match (map.remove(spec.name), skipped) {
                (Some(_), Some(missing)) => {
                    return Err(RpcError::invalid_params(format!(
                        "argument {} needs the preceding optional argument {missing}",
                        spec.name
                    )))
                }
                (Some(value), None) => args.push(value),
                (None, _) if spec.required => {
                    return Err(RpcError::invalid_params(format!(
                        "missing required argument: {}",
                        spec.name
                    )))
                }
                (None, _) => skipped = skipped.or(Some(spec.name)),
            }
        }

        if let Some(unknown) = map.keys().next() {
            return Err(RpcError::invalid_params(format!(
                "unexpected keyword argument: {unknown}"
            )));
        }

        Ok(args)
    }
}

#[derive(Clone)]
pub struct MethodEntry {
    pub name: String,
    pub handler: Arc<dyn RpcHandler>,
    pub signature: Signature,
    pub auth: AuthPolicy,
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl MethodEntry {
    /// `(module, method)` halves of the qualified name.
    pub fn split_name(&self) -> (&str, &str) {
        self.name.split_once('.').unwrap_or(("", self.name.as_str()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("method {0} is already registered")]
    Duplicate(String),
    #[error("method name {0} must have the form Module.method")]
    InvalidName(String),
}

#[derive(Debug, Default)]
pub struct MethodRegistry {
    entries: HashMap<String, MethodEntry>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn RpcHandler>,
        signature: Signature,
        auth: AuthPolicy,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if !is_qualified_name(&name) {
            return Err(RegistryError::InvalidName(name));
        }
        if self.entries.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        self.entries.insert(
            name.clone(),
            MethodEntry {
                name,
                handler,
                signature,
                auth,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&MethodEntry, RpcError> {
        self.entries
            .get(name)
            .ok_or_else(|| RpcError::method_not_found(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_qualified_name(name: &str) -> bool {
    let Some((module, method)) = name.split_once('.') else {
        return false;
    };
    !module.trim().is_empty() && !method.trim().is_empty() && !method.contains('.')
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Echo;

    #[async_trait]
    impl RpcHandler for Echo {
        async fn call(&self, _ctx: &CallContext, args: Vec<Value>) -> Result<Value, HandlerError> {
            Ok(Value::Array(args))
        }
    }

    fn two_args() -> Signature {
        Signature::new(vec![
            ParamSpec::required("input", ParamKind::Object),
            ParamSpec::optional("verbose", ParamKind::Boolean),
        ])
    }

    #[test]
    fn register_rejects_duplicates_and_bad_names() {
        let mut registry = MethodRegistry::new();
        registry
            .register("svc.echo", Arc::new(Echo), two_args(), AuthPolicy::None)
            .expect("first registration");

        assert_eq!(
            registry.register("svc.echo", Arc::new(Echo), two_args(), AuthPolicy::None),
            Err(RegistryError::Duplicate("svc.echo".to_string()))
        );
        assert_eq!(
            registry.register("echo", Arc::new(Echo), two_args(), AuthPolicy::None),
            Err(RegistryError::InvalidName("echo".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_of_unknown_method_is_method_not_found() {
        let registry = MethodRegistry::new();
        let err = registry.lookup("svc.missing").expect_err("not registered");
        assert_eq!(err.code(), -32601);
    }

    #[test]
    fn positional_arity_is_enforced() {
        let signature = two_args();
        assert_eq!(signature.min_args(), 1);
        assert_eq!(signature.max_args(), Some(2));

        let err = signature.bind(Params::Positional(vec![])).expect_err("too few");
        assert_eq!(err.name(), "InvalidParams");

        let err = signature
            .bind(Params::Positional(vec![json!({}), json!(true), json!(1)]))
            .expect_err("too many");
        assert_eq!(err.name(), "InvalidParams");

        let args = signature
            .bind(Params::Positional(vec![json!({"a": 1})]))
            .expect("within bounds");
        assert_eq!(args, vec![json!({"a": 1})]);
    }

    #[test]
    fn variadic_signatures_have_no_upper_bound() {
        let signature =
            Signature::new(vec![ParamSpec::required("first", ParamKind::Any)]).variadic();
        let args = signature
            .bind(Params::Positional(vec![json!(1), json!(2), json!(3)]))
            .expect("variadic");
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn missing_params_fail_when_arguments_are_required() {
        let err = two_args().bind(Params::None).expect_err("input required");
        assert_eq!(err.name(), "InvalidParams");

        let empty = Signature::new(vec![]);
        assert_eq!(empty.bind(Params::None).expect("no args"), Vec::<Value>::new());
    }

    #[test]
    fn named_params_map_onto_declared_names() {
        let mut map = Map::new();
        map.insert("input".to_string(), json!({"ids": ["m1"]}));
        let args = two_args().bind(Params::Named(map)).expect("named");
        assert_eq!(args, vec![json!({"ids": ["m1"]})]);

        let mut map = Map::new();
        map.insert("input".to_string(), json!({}));
        map.insert("bogus".to_string(), json!(1));
        let err = two_args().bind(Params::Named(map)).expect_err("unknown kw");
        assert!(err.to_string().contains("bogus"));

        let err = two_args()
            .bind(Params::Named(Map::new()))
            .expect_err("missing kw");
        assert!(err.to_string().contains("input"));
    }

    #[test]
    fn skipped_optional_keyword_is_reported_as_the_cause() {
        let signature = Signature::new(vec![
            ParamSpec::required("input", ParamKind::Object),
            ParamSpec::optional("verbose", ParamKind::Boolean),
            ParamSpec::optional("workspace", ParamKind::String),
        ]);

        let mut map = Map::new();
        map.insert("input".to_string(), json!({}));
        map.insert("workspace".to_string(), json!("ws"));
        let err = signature.bind(Params::Named(map)).expect_err("gap before workspace");
        assert_eq!(err.name(), "InvalidParams");
        let message = err.to_string();
        assert!(message.contains("workspace"));
        assert!(message.contains("verbose"));
        assert!(!message.contains("unexpected keyword"));

        let mut map = Map::new();
        map.insert("input".to_string(), json!({}));
        map.insert("verbose".to_string(), json!(true));
        map.insert("workspace".to_string(), json!("ws"));
        let args = signature.bind(Params::Named(map)).expect("no gap");
        assert_eq!(args, vec![json!({}), json!(true), json!("ws")]);
    }

    #[test]
    fn declared_kinds_are_checked() {
        let err = two_args()
            .bind(Params::Positional(vec![json!("not an object")]))
            .expect_err("wrong kind");
        assert!(err.to_string().contains("must be of type object"));
    }

    #[test]
    fn positional_only_signatures_refuse_keywords() {
        let signature = two_args().positional_only();
        let mut map = Map::new();
        map.insert("input".to_string(), json!({}));
        assert!(signature.bind(Params::Named(map)).is_err());
    }
}
