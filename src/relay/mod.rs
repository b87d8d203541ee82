//! Overlay relay: channels, filtering and routing of live events.
//!
//! ## Module structure
//!
//! - `channels`: communication channel structures
//! - `filter`: regex/threshold event filtering
//! - `router`: live + connection events -> serialized overlay feed

pub mod channels;
pub mod filter;
pub mod router;

pub use channels::ChannelBundle;
pub use filter::EventFilter;
pub use router::spawn_router;
