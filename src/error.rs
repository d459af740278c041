/// Error Handling
///
/// Error kinds follow the policy of keeping everything locally recoverable
/// recovered silently: the user-visible surface is limited to queue closure
/// and boolean registration returns. The variants here exist for the
/// internal paths that do propagate (decode failures, protocol mismatch)
/// and for construction-time failures.
use thiserror::Error;

use crate::types::TopicId;

/// A malformed control or RPC frame.
///
/// Dropped by the caller; the connection survives. Never propagated past
/// the ingress path that detects it.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("truncated frame: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid topic id: {0}")]
    InvalidTopic(String),

    #[error("unknown control message variant")]
    UnknownControlVariant,
}

/// Errors surfaced by the router and pub/sub core.
///
/// `PeerGone` and `InvalidNotifee` from the design's error taxonomy are
/// deliberately absent here: the former is handled by silent overlay
/// cleanup, the latter by a `bool` return from registration.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("malformed frame from peer: {0}")]
    Decode(#[from] DecodeError),

    #[error("peer negotiated unsupported protocol {0:?}")]
    ProtocolMismatch(String),

    #[error("not subscribed to topic {0}")]
    NotSubscribed(TopicId),
}

pub type Result<T> = std::result::Result<T, RouterError>;
