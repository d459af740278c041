/// Node
///
/// Wires a [`Transport`], the [`PubSub`] actor, and the [`NotifeeBus`]
/// together into a single addressable peer. This is the crate's outermost
/// façade — application code talks to a `Node`, not to the router or
/// muxer directly.
use std::sync::Arc;

use multiaddr::Multiaddr;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::gossipsub::GossipsubParameters;
use crate::muxer::PeerProtocol;
use crate::notifee::NotifeeBus;
use crate::pubsub::{PubSub, PubSubHandle, PROTOCOL_ID};
use crate::transport::Transport;
use crate::types::PeerId;

const FLOODSUB_PROTOCOL_ID: &str = "/floodsub/1.0.0";

pub struct Node {
    id: PeerId,
    pubsub: PubSubHandle,
    notifees: Arc<NotifeeBus>,
    transport: Arc<dyn Transport>,
}

impl Node {
    /// Build a node over `transport`, spawning its pubsub actor and
    /// wiring the transport's gossipsub stream handler to it.
    pub fn new(id: PeerId, params: GossipsubParameters, transport: Arc<dyn Transport>) -> Self {
        let pubsub = PubSub::spawn(id, params, Arc::clone(&transport));
        let notifees = Arc::new(NotifeeBus::new());

        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.set_stream_handler(PROTOCOL_ID, tx);
        let inbound_sink = pubsub.clone();
        tokio::spawn(async move {
            while let Some((from, packet)) = rx.recv().await {
                inbound_sink.inbound_rpc(from, packet);
            }
        });

        Self { id, pubsub, notifees, transport }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn pubsub(&self) -> &PubSubHandle {
        &self.pubsub
    }

    pub fn notifees(&self) -> &Arc<NotifeeBus> {
        &self.notifees
    }

    pub async fn listen(&self, addr: Multiaddr) -> Result<()> {
        self.transport.listen(addr.clone()).await?;
        self.notifees.listen(&addr).await;
        Ok(())
    }

    pub async fn listen_close(&self, addr: Multiaddr) -> Result<()> {
        self.notifees.listen_close(&addr).await;
        Ok(())
    }

    /// Dial a peer and report it connected. Protocol negotiation is
    /// reported separately via [`Node::negotiated`] once it completes —
    /// `connected` always precedes it, per the notifee ordering guarantee.
    pub async fn dial(&self, peer: PeerId, addrs: &[Multiaddr]) -> Result<()> {
        self.transport.dial(peer, addrs).await?;
        self.connected(peer).await;
        Ok(())
    }

    pub async fn connected(&self, peer: PeerId) {
        self.pubsub.peer_connected(peer);
        self.notifees.connected(&peer).await;
    }

    pub async fn negotiated(&self, peer: PeerId, protocol: PeerProtocol) {
        self.pubsub.peer_negotiated(peer, protocol);
        let protocol_id = match protocol {
            PeerProtocol::Gossipsub => PROTOCOL_ID,
            PeerProtocol::Floodsub => FLOODSUB_PROTOCOL_ID,
        };
        self.notifees.opened_stream(&peer, protocol_id).await;
    }

    pub async fn closed_stream(&self, peer: PeerId, protocol_id: &str) {
        self.notifees.closed_stream(&peer, protocol_id).await;
    }

    pub async fn disconnected(&self, peer: PeerId) {
        self.pubsub.peer_disconnected(peer);
        self.notifees.disconnected(&peer).await;
    }
}
