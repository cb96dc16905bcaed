//! Retry module
//!
//! Adapter-level retries for transient upstream failures. The router itself
//! never retries; adapters opt in per call.

pub mod policy;

pub use policy::*;
