//! Traits Module
//!
//! Seams between the gateway core and the upstream providers.

pub mod provider;

pub use provider::ProviderAdapter;
