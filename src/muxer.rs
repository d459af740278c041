/// Peer Protocol Muxer
///
/// Tracks which wire protocol each connected peer has negotiated
/// (gossipsub vs. the older floodsub) and holds outbound frames for
/// peers that are connected but haven't finished negotiating yet.
///
/// Grounded in this crate's `NetworkBehaviour` composition pattern,
/// generalized away from a concrete `libp2p::Swarm`: the muxer is the
/// seam between "a peer is connected" and "we know how to talk to it".
use std::collections::HashMap;

use crate::message::RpcPacket;
use crate::types::PeerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerProtocol {
    Gossipsub,
    Floodsub,
}

/// Protocol negotiation state for connected peers.
///
/// Outbound frames addressed to a peer that hasn't finished negotiating
/// are queued rather than dropped, and flushed in order once negotiation
/// completes.
#[derive(Debug, Default)]
pub struct PeerMuxer {
    negotiated: HashMap<PeerId, PeerProtocol>,
    pending: HashMap<PeerId, Vec<RpcPacket>>,
}

impl PeerMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly connected peer as pending negotiation.
    pub fn peer_connected(&mut self, peer: PeerId) {
        self.pending.entry(peer).or_default();
    }

    /// Record the negotiated protocol, returning any frames queued while
    /// negotiation was in flight, oldest first.
    pub fn peer_negotiated(&mut self, peer: PeerId, protocol: PeerProtocol) -> Vec<RpcPacket> {
        self.negotiated.insert(peer, protocol);
        self.pending.remove(&peer).unwrap_or_default()
    }

    pub fn peer_disconnected(&mut self, peer: &PeerId) {
        self.negotiated.remove(peer);
        self.pending.remove(peer);
    }

    pub fn protocol_of(&self, peer: &PeerId) -> Option<PeerProtocol> {
        self.negotiated.get(peer).copied()
    }

    pub fn is_negotiated(&self, peer: &PeerId) -> bool {
        self.negotiated.contains_key(peer)
    }

    pub fn negotiated_peers(&self) -> impl Iterator<Item = &PeerId> {
        self.negotiated.keys()
    }

    /// Route an outbound frame: `Ok(packet)` if the peer is ready to
    /// receive it now, `Err(())` if it was queued for later delivery.
    pub fn route(&mut self, peer: PeerId, packet: RpcPacket) -> Result<RpcPacket, ()> {
        if self.negotiated.contains_key(&peer) {
            Ok(packet)
        } else {
            self.pending.entry(peer).or_default().push(packet);
            Err(())
        }
    }
}
