//! JSON-RPC service shell
//!
//! Parsing, method registry, authentication-aware dispatch and envelope
//! encoding for `Module.method` style calls over the 1.0/1.1 and numeric
//! `jsonrpc` protocol generations.

pub mod audit;
pub mod context;
pub mod dispatcher;
pub mod registry;
pub mod request;
pub mod response;
