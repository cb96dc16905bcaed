//! Utility modules
//!
//! HTTP and streaming helpers shared by the provider adapters.

pub mod http;
pub mod streaming;

pub use http::{build_client, join_url, read_json, send_checked};
pub use streaming::{LineConverter, SseEventConverter, StreamFactory};
