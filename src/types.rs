/// Core Type Aliases
///
/// Type definitions shared across the pub/sub core, the gossipsub router,
/// and the notifee bus.
use std::fmt;

/// Libp2p peer identifier.
///
/// Opaque, equality-comparable, stable for the lifetime of a connection.
/// Produced by the external identity layer; this crate never constructs one
/// itself outside of tests.
pub type PeerId = libp2p_identity::PeerId;

/// UTF-8 topic identifier.
///
/// Arbitrary and application-chosen; this crate attaches no structure to it
/// beyond equality and hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TopicId(pub String);

impl TopicId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TopicId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for TopicId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message sequence number, chosen by the publishing peer.
///
/// Opaque bytes: the router never interprets the sequence number, only
/// compares it for equality as half of a `MessageId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Seqno(pub Vec<u8>);

impl Seqno {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }
}

impl From<u64> for Seqno {
    fn from(value: u64) -> Self {
        Self(value.to_be_bytes().to_vec())
    }
}

/// Globally unique message identifier: the `(origin, seqno)` pair.
///
/// Two messages published by the same peer with the same sequence number
/// are considered the same message for de-duplication purposes, per
/// the data model: message signing/validation beyond this is out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId {
    pub origin: PeerId,
    pub seqno: Seqno,
}

impl MessageId {
    pub fn new(origin: PeerId, seqno: Seqno) -> Self {
        Self { origin, seqno }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, hex_preview(&self.seqno.0))
    }
}

fn hex_preview(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Unix timestamp in seconds since epoch, as a float to match the
/// sub-second heartbeat resolution used for fanout expiry calculations.
pub type Timestamp = f64;

/// Current wall-clock time as a [`Timestamp`].
pub fn now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs_f64()
}
