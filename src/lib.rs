/// meshsub
///
/// A GossipSub v1.0.0 mesh-maintenance router and connection-lifecycle
/// notifee bus. The [`gossipsub`] module owns the overlay (mesh, fanout,
/// message cache, heartbeat); [`pubsub`] drives it as a single actor task
/// over a pluggable [`transport::Transport`]; [`notifee`] is the
/// independent connection/stream lifecycle observer bus; [`node`] wires
/// the two together into one addressable peer.
pub mod error;
pub mod gossipsub;
pub mod message;
pub mod muxer;
pub mod node;
pub mod notifee;
pub mod pubsub;
pub mod transport;
pub mod types;

pub use error::{DecodeError, Result, RouterError};
pub use gossipsub::{GossipsubParameters, GossipsubRouter};
pub use message::{Message, RpcPacket, Subscription};
pub use muxer::{PeerMuxer, PeerProtocol};
pub use node::Node;
pub use notifee::{ChannelNotifee, Notifee, NotifeeBus, NotifeeEvent};
pub use pubsub::{OverlaySnapshot, PubSub, PubSubHandle};
pub use transport::{InMemoryTransport, Transport};
pub use types::{MessageId, PeerId, Seqno, Timestamp, TopicId};
