//! Default Configuration Values
//!
//! This module centralizes the default values used throughout the gateway.
//! Configuration files only need to mention what differs from these.

use std::time::Duration;

/// HTTP server defaults
pub mod server {
    /// Default listen address for the gateway
    pub const LISTEN: &str = "0.0.0.0:8000";
}

/// HTTP client default configurations
pub mod http {
    use super::*;

    /// Default connection timeout for establishing upstream connections
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default User-Agent string for upstream requests
    pub const USER_AGENT: &str = concat!("omegatron/", env!("CARGO_PKG_VERSION"));

    /// Default maximum number of idle connections per upstream host
    pub const MAX_IDLE_PER_HOST: usize = 10;

    /// Default keep-alive timeout for pooled upstream connections
    pub const KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum number of body characters kept in upstream error messages
    pub const ERROR_BODY_SAMPLE: usize = 200;

    /// Longest line accepted from a newline-delimited upstream body
    pub const MAX_LINE_LENGTH: usize = 1024 * 1024;
}

/// Router timeouts
pub mod timeouts {
    use super::*;

    /// Bound on a single dispatch (and on collecting a full answer).
    ///
    /// Covers reasoning models that think for a minute or more before the
    /// first visible token.
    pub const REQUEST: Duration = Duration::from_secs(120);

    /// Bound on the gap between two chunks of a streamed answer.
    pub const STREAM_IDLE: Duration = Duration::from_secs(60);
}

/// Simulated streaming for upstreams that only answer in one piece
pub mod streaming {
    use super::*;

    /// Words carried by each synthesized increment
    pub const SIMULATED_CHUNK_WORDS: usize = 3;

    /// Pause between synthesized increments
    pub const SIMULATED_CHUNK_DELAY: Duration = Duration::from_millis(50);
}

/// Adapter-level retry defaults
pub mod retry {
    use super::*;

    /// Attempts per upstream call, the first one included
    pub const MAX_ATTEMPTS: u32 = 2;

    /// Delay before the first retry
    pub const INITIAL_DELAY: Duration = Duration::from_millis(250);

    /// Ceiling for a single retry delay
    pub const MAX_DELAY: Duration = Duration::from_secs(5);
}
