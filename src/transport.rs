/// Transport Collaborator
///
/// The network transport is an external collaborator this crate drives
/// but doesn't implement: dialing, listening, and opening per-protocol
/// streams are someone else's job (in production, a libp2p `Swarm`). This
/// module defines the narrow interface this crate needs from it, plus an
/// in-memory fake used by tests and the integration scenarios.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use multiaddr::Multiaddr;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::message::RpcPacket;
use crate::types::PeerId;

/// What this crate needs from a transport: dial/listen control, and a
/// byte-oriented stream abstraction per negotiated protocol.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dial(&self, peer: PeerId, addrs: &[Multiaddr]) -> Result<()>;
    async fn listen(&self, addr: Multiaddr) -> Result<()>;
    async fn open_stream(&self, peer: PeerId, protocol: &str, packet: RpcPacket) -> Result<()>;
    fn set_stream_handler(&self, protocol: &str, handler: mpsc::UnboundedSender<(PeerId, RpcPacket)>);
    fn add_addrs(&self, peer: PeerId, addrs: Vec<Multiaddr>);
    fn get_id(&self) -> PeerId;
    fn get_addrs(&self, peer: &PeerId) -> Vec<Multiaddr>;
}

/// In-memory transport used by tests and by the multi-node integration
/// scenarios: peers are wired together by registering each other's
/// sender directly rather than going over a socket.
pub struct InMemoryTransport {
    id: PeerId,
    addrs: Mutex<HashMap<PeerId, Vec<Multiaddr>>>,
    peers: Mutex<HashMap<PeerId, mpsc::UnboundedSender<(PeerId, String, RpcPacket)>>>,
    handlers: Mutex<HashMap<String, mpsc::UnboundedSender<(PeerId, RpcPacket)>>>,
}

impl InMemoryTransport {
    pub fn new(id: PeerId) -> Arc<Self> {
        Arc::new(Self {
            id,
            addrs: Mutex::new(HashMap::new()),
            peers: Mutex::new(HashMap::new()),
            handlers: Mutex::new(HashMap::new()),
        })
    }

    /// Wire two fakes together bidirectionally so `open_stream` calls on
    /// either side reach the other's handler, mirroring a dialed
    /// connection without touching real sockets.
    pub fn link(a: &Arc<Self>, b: &Arc<Self>) {
        let (tx_to_b, mut rx_at_b) = mpsc::unbounded_channel();
        let (tx_to_a, mut rx_at_a) = mpsc::unbounded_channel();
        a.peers.lock().insert(b.id, tx_to_b);
        b.peers.lock().insert(a.id, tx_to_a);

        let b_handlers = Arc::clone(b);
        tokio::spawn(async move {
            while let Some((from, protocol, packet)) = rx_at_b.recv().await {
                b_handlers.dispatch(from, &protocol, packet);
            }
        });
        let a_handlers = Arc::clone(a);
        tokio::spawn(async move {
            while let Some((from, protocol, packet)) = rx_at_a.recv().await {
                a_handlers.dispatch(from, &protocol, packet);
            }
        });
    }

    fn dispatch(&self, from: PeerId, protocol: &str, packet: RpcPacket) {
        if let Some(handler) = self.handlers.lock().get(protocol) {
            let _ = handler.send((from, packet));
        }
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn dial(&self, _peer: PeerId, _addrs: &[Multiaddr]) -> Result<()> {
        Ok(())
    }

    async fn listen(&self, _addr: Multiaddr) -> Result<()> {
        Ok(())
    }

    async fn open_stream(&self, peer: PeerId, protocol: &str, packet: RpcPacket) -> Result<()> {
        if let Some(sender) = self.peers.lock().get(&peer) {
            let _ = sender.send((self.id, protocol.to_owned(), packet));
        }
        Ok(())
    }

    fn set_stream_handler(&self, protocol: &str, handler: mpsc::UnboundedSender<(PeerId, RpcPacket)>) {
        self.handlers.lock().insert(protocol.to_owned(), handler);
    }

    fn add_addrs(&self, peer: PeerId, addrs: Vec<Multiaddr>) {
        self.addrs.lock().entry(peer).or_default().extend(addrs);
    }

    fn get_id(&self) -> PeerId {
        self.id
    }

    fn get_addrs(&self, peer: &PeerId) -> Vec<Multiaddr> {
        self.addrs.lock().get(peer).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libp2p_identity::PeerId as Libp2pPeerId;

    #[tokio::test]
    async fn linked_transports_deliver_to_the_registered_handler() {
        let a = InMemoryTransport::new(Libp2pPeerId::random());
        let b = InMemoryTransport::new(Libp2pPeerId::random());
        InMemoryTransport::link(&a, &b);

        let (tx, mut rx) = mpsc::unbounded_channel();
        b.set_stream_handler("/meshsub/1.0.0", tx);

        let packet = RpcPacket::default();
        a.open_stream(b.get_id(), "/meshsub/1.0.0", packet.clone()).await.unwrap();

        let (from, received) = rx.recv().await.unwrap();
        assert_eq!(from, a.get_id());
        assert_eq!(received, packet);
    }

    #[test]
    fn add_addrs_accumulates() {
        let a = InMemoryTransport::new(Libp2pPeerId::random());
        let peer = Libp2pPeerId::random();
        let addr: Multiaddr = "/ip4/127.0.0.1/tcp/4001".parse().unwrap();
        a.add_addrs(peer, vec![addr.clone()]);
        assert_eq!(a.get_addrs(&peer), vec![addr]);
    }
}
