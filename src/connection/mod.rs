//! Connection resilience layer.
//!
//! Wraps the unreliable platform session with disconnect detection,
//! stability judgment and an exponential-backoff reconnect scheduler.

pub mod resilient;

pub use resilient::{ConnectionEvent, ResilientConnection};
