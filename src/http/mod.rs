//! HTTP transport for the RPC service
//!
//! A single catch-all handler; routing by method name happens inside the
//! dispatcher, not in the URL.

pub mod handlers;
