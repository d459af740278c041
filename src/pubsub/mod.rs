/// Pub/Sub Core
///
/// Ties the gossipsub router, the peer muxer, and the transport together
/// into the single task that owns all mutable overlay state.
pub mod core;

pub use core::{OverlaySnapshot, PubSub, PubSubHandle, PROTOCOL_ID};
