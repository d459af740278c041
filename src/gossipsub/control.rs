/// Gossipsub Control Messages
///
/// GRAFT/PRUNE/IHAVE/IWANT, the four control frames that negotiate mesh
/// membership and drive the lazy-pull side of the protocol.
///
/// ## References
///
/// - Gossipsub v1.0: <https://github.com/libp2p/specs/blob/master/pubsub/gossipsub/gossipsub-v1.0.md>
use crate::types::{MessageId, TopicId};

/// Request to join the sender's mesh for a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graft {
    pub topic_id: TopicId,
}

/// Notification that the sender has removed the recipient from its mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prune {
    pub topic_id: TopicId,
}

/// Advertisement of message ids recently seen for a topic.
///
/// A non-mesh peer receiving this replies with `IWant` for any ids it
/// hasn't seen yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IHave {
    pub topic_id: TopicId,
    pub message_ids: Vec<MessageId>,
}

/// Request for the full messages behind a set of ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IWant {
    pub message_ids: Vec<MessageId>,
}

/// Aggregated control frame: zero or more of each control kind, batched
/// into a single `RpcPacket`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlMessage {
    pub grafts: Vec<Graft>,
    pub prunes: Vec<Prune>,
    pub ihaves: Vec<IHave>,
    pub iwants: Vec<IWant>,
}

impl ControlMessage {
    pub fn is_empty(&self) -> bool {
        self.grafts.is_empty()
            && self.prunes.is_empty()
            && self.ihaves.is_empty()
            && self.iwants.is_empty()
    }
}
