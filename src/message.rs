/// Gossipsub Message & Wire Envelope
///
/// Message representation and the RPC envelope frames are exchanged in.
/// `MessageId` is the `(origin, seqno)` pair rather than a content hash:
/// signing and content-addressed ids are out of scope.
use crate::types::{PeerId, Seqno, TopicId};

/// An immutable pub/sub message, once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Peer that authored the message.
    pub from: PeerId,

    /// Sequence number chosen by `from`; half of the message's identity.
    pub seqno: Seqno,

    /// Topics this message is published to. A message may fan out to more
    /// than one topic's subscribers.
    pub topic_ids: Vec<TopicId>,

    /// Application payload. Opaque to the router.
    pub data: Vec<u8>,

    /// Optional signature. Never verified by this crate: message signing
    /// is out of scope beyond carrying the bytes on the wire.
    pub signature: Option<Vec<u8>>,
}

impl Message {
    pub fn new(from: PeerId, seqno: impl Into<Seqno>, topic_ids: Vec<TopicId>, data: Vec<u8>) -> Self {
        Self {
            from,
            seqno: seqno.into(),
            topic_ids,
            data,
            signature: None,
        }
    }

    /// This message's globally unique identifier.
    pub fn id(&self) -> crate::types::MessageId {
        crate::types::MessageId::new(self.from, self.seqno.clone())
    }

    pub fn is_for_topic(&self, topic: &TopicId) -> bool {
        self.topic_ids.contains(topic)
    }
}

/// A topic subscription announcement: `(topic, subscribe-flag)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub topic_id: TopicId,
    pub subscribe: bool,
}

/// A framed record exchanged between peers.
///
/// Contains zero or more of each field; an empty packet is
/// never sent (callers should skip emission rather than send one).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcPacket {
    pub subscriptions: Vec<Subscription>,
    pub publish: Vec<Message>,
    pub control: crate::gossipsub::control::ControlMessage,
}

impl RpcPacket {
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty() && self.publish.is_empty() && self.control.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libp2p_identity::PeerId as Libp2pPeerId;

    fn peer() -> PeerId {
        Libp2pPeerId::random()
    }

    #[test]
    fn message_id_depends_on_origin_and_seqno() {
        let a = Message::new(peer(), 1u64, vec![TopicId::from("t")], b"x".to_vec());
        let b = Message::new(a.from, 1u64, vec![TopicId::from("t")], b"different".to_vec());
        // Same origin and seqno -> same id, regardless of payload.
        assert_eq!(a.id(), b.id());

        let c = Message::new(a.from, 2u64, vec![TopicId::from("t")], b"x".to_vec());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn empty_packet_is_empty() {
        assert!(RpcPacket::default().is_empty());
    }
}
