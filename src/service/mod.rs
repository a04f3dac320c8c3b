//! The metabolic model service exposed over the RPC shell
//!
//! Declares the method catalogue and the seam to the external model engine.

pub mod backend;
pub mod catalog;
