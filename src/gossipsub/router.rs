/// GossipSub Router
///
/// The mesh-maintenance control loop: GRAFT/PRUNE negotiation, IHAVE/IWANT
/// gossip, and the heartbeat that keeps each subscribed topic's mesh
/// between `D_low` and `D_high` peers.
///
/// ## Design
///
/// Every method here is a pure state transition: it mutates the router's
/// own overlay tables and returns the outbound frames the caller should
/// send. No I/O happens inside this type. The actor in [`crate::node`]
/// owns the single task that drives this router (confined to a single
/// task per router) and is the only thing that
/// actually writes to peer streams, which keeps this module deterministic
/// and trivially unit-testable the same way `mesh.rs`/`mcache.rs` are.
///
/// ## References
///
/// - Gossipsub v1.0: <https://github.com/libp2p/specs/blob/master/pubsub/gossipsub/gossipsub-v1.0.md>
use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, trace, warn};

use super::config::GossipsubParameters;
use super::control::{ControlMessage, Graft, IHave, IWant, Prune};
use super::mcache::{MessageCache, SeenCache};
use super::mesh::MeshState;
use crate::message::{Message, RpcPacket};
use crate::types::{now, PeerId, Timestamp, TopicId};

/// Per-(topic, peer) membership state. Derived from overlay state on demand rather than stored
/// explicitly — `mesh`/`fanout`/`peer_topics` are the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerTopicState {
    Unknown,
    PeerSubscribed,
    Mesh,
    Fanout,
}

/// An outbound frame the caller (the node's transport glue) must send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterOutput {
    pub peer: PeerId,
    pub packet: RpcPacket,
}

impl RouterOutput {
    fn control(peer: PeerId, control: ControlMessage) -> Self {
        Self {
            peer,
            packet: RpcPacket {
                control,
                ..Default::default()
            },
        }
    }

    fn publish(peer: PeerId, message: Message) -> Self {
        Self {
            peer,
            packet: RpcPacket {
                publish: vec![message],
                ..Default::default()
            },
        }
    }
}

/// Back-off applied to a peer that was PRUNEd from a topic, so the
/// heartbeat doesn't immediately re-graft it. The GossipSub v1.0 reference
/// protocol calls for such a back-off without pinning an exact duration,
/// so this crate uses a flat constant — see `DESIGN.md`.
const PRUNE_BACKOFF_SECS: f64 = 10.0;

pub struct GossipsubRouter {
    params: GossipsubParameters,
    mesh: MeshState,
    peers_gossipsub: HashSet<PeerId>,
    peers_floodsub: HashSet<PeerId>,
    peer_topics: HashMap<PeerId, HashSet<TopicId>>,
    mcache: MessageCache,
    seen: SeenCache,
    backoff: HashMap<(TopicId, PeerId), Timestamp>,
    rng: StdRng,
}

impl GossipsubRouter {
    pub fn new(params: GossipsubParameters) -> Self {
        Self::with_rng(params, StdRng::from_entropy())
    }

    /// Construct with an explicit RNG, so tests can make peer sampling
    /// deterministic without touching the production constructor.
    pub fn with_rng(params: GossipsubParameters, rng: StdRng) -> Self {
        let mcache = MessageCache::new(params.gossip_window, params.history_length);
        let seen = SeenCache::new(params.history_length);
        Self {
            params,
            mesh: MeshState::new(),
            peers_gossipsub: HashSet::new(),
            peers_floodsub: HashSet::new(),
            peer_topics: HashMap::new(),
            mcache,
            seen,
            backoff: HashMap::new(),
            rng,
        }
    }

    pub fn params(&self) -> &GossipsubParameters {
        &self.params
    }

    pub fn is_subscribed(&self, topic: &TopicId) -> bool {
        self.mesh.is_subscribed(topic)
    }

    pub fn mesh_peers(&self, topic: &TopicId) -> HashSet<PeerId> {
        self.mesh.mesh_peers(topic)
    }

    pub fn fanout_peers(&self, topic: &TopicId) -> HashSet<PeerId> {
        self.mesh.fanout_peers(topic)
    }

    pub fn has_fanout(&self, topic: &TopicId) -> bool {
        self.mesh.has_fanout(topic)
    }

    pub fn peer_state(&self, topic: &TopicId, peer: &PeerId) -> PeerTopicState {
        if self.mesh.mesh_peers(topic).contains(peer) {
            PeerTopicState::Mesh
        } else if self.mesh.fanout_peers(topic).contains(peer) {
            PeerTopicState::Fanout
        } else if self.peer_topics.get(peer).is_some_and(|t| t.contains(topic)) {
            PeerTopicState::PeerSubscribed
        } else {
            PeerTopicState::Unknown
        }
    }

    // ---------------------------------------------------------------
    // Peer & protocol bookkeeping
    // ---------------------------------------------------------------

    pub fn note_peer_gossipsub(&mut self, peer: PeerId) {
        self.peers_gossipsub.insert(peer);
    }

    pub fn note_peer_floodsub(&mut self, peer: PeerId) {
        self.peers_floodsub.insert(peer);
    }

    /// SUBSCRIBE/UNSUBSCRIBE from a peer's RPC: `UNKNOWN -> PEER_SUBSCRIBED`
    /// (or the reverse).
    pub fn note_subscription(&mut self, peer: PeerId, topic: TopicId, subscribed: bool) {
        let topics = self.peer_topics.entry(peer).or_default();
        if subscribed {
            topics.insert(topic);
        } else {
            topics.remove(&topic);
            // any state -> UNKNOWN on inbound UNSUBSCRIBE
            self.mesh.remove_from_mesh(&topic, &peer);
            self.mesh.remove_peer_from_fanout(&topic, &peer);
        }
    }

    fn peers_declaring(&self, topic: &TopicId) -> HashSet<PeerId> {
        self.peer_topics
            .iter()
            .filter(|(_, topics)| topics.contains(topic))
            .map(|(peer, _)| *peer)
            .collect()
    }

    /// Peer I/O errors or disconnects remove a peer from every overlay
    /// structure; the heartbeat re-fills on the next tick.
    pub fn remove_peer(&mut self, peer: &PeerId) {
        self.mesh.remove_peer_everywhere(peer);
        self.peers_gossipsub.remove(peer);
        self.peers_floodsub.remove(peer);
        self.peer_topics.remove(peer);
        self.backoff.retain(|(_, p), _| p != peer);
    }

    // ---------------------------------------------------------------
    // Subscribe / unsubscribe
    // ---------------------------------------------------------------

    /// `join(topic)`: promote fanout peers, fill the mesh to `D`, GRAFT
    /// every newly added peer.
    pub fn join(&mut self, topic: TopicId) -> Vec<RouterOutput> {
        let mut outputs = Vec::new();
        let d = self.params.d;

        // `mesh.subscribe` only promotes fanout peers (and only returns a
        // non-empty set) on a genuinely fresh subscribe; re-joining a topic
        // we're already subscribed to is a no-op there, so the pruning pass
        // below must be skipped too, or it would mistake the existing mesh
        // for stale non-promoted peers and clear it out.
        if !self.mesh.is_subscribed(&topic) {
            let promoted = self.mesh.subscribe(topic.clone());
            let gossipsub_promoted: HashSet<_> = promoted
                .into_iter()
                .filter(|p| self.peers_gossipsub.contains(p))
                .take(d)
                .collect();
            // Drop non-gossipsub (or over-D) promoted peers back out of the mesh.
            for peer in self.mesh.mesh_peers(&topic) {
                if !gossipsub_promoted.contains(&peer) {
                    self.mesh.remove_from_mesh(&topic, &peer);
                }
            }
            for peer in &gossipsub_promoted {
                outputs.push(RouterOutput::control(
                    *peer,
                    ControlMessage {
                        grafts: vec![Graft { topic_id: topic.clone() }],
                        ..Default::default()
                    },
                ));
            }
        }

        let current = self.mesh.mesh_len(&topic);
        if current < d {
            let candidates = self.graft_candidates(&topic, d - current);
            for peer in candidates {
                self.mesh.add_to_mesh(&topic, peer);
                outputs.push(RouterOutput::control(
                    peer,
                    ControlMessage {
                        grafts: vec![Graft { topic_id: topic.clone() }],
                        ..Default::default()
                    },
                ));
            }
        }

        outputs
    }

    /// `leave(topic)`: PRUNE every mesh member, drop the mesh entry.
    /// Re-leaving an absent topic is a no-op.
    pub fn leave(&mut self, topic: TopicId) -> Vec<RouterOutput> {
        let peers = self.mesh.unsubscribe(&topic);
        peers
            .into_iter()
            .map(|peer| {
                RouterOutput::control(
                    peer,
                    ControlMessage {
                        prunes: vec![Prune { topic_id: topic.clone() }],
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    /// Candidates eligible for GRAFT: gossipsub peers declaring `topic`,
    /// not already in the mesh, not under PRUNE back-off.
    fn graft_candidates(&mut self, topic: &TopicId, want: usize) -> Vec<PeerId> {
        let mesh_peers = self.mesh.mesh_peers(topic);
        let t = now();
        let mut candidates: Vec<_> = self
            .peers_declaring(topic)
            .into_iter()
            .filter(|p| self.peers_gossipsub.contains(p))
            .filter(|p| !mesh_peers.contains(p))
            .filter(|p| {
                self.backoff
                    .get(&(topic.clone(), *p))
                    .is_none_or(|until| t >= *until)
            })
            .collect();
        candidates.shuffle(&mut self.rng);
        candidates.truncate(want);
        candidates
    }

    // ---------------------------------------------------------------
    // Publish forwarding
    // ---------------------------------------------------------------

    /// Forward a (locally or remotely originated) message to mesh peers if
    /// subscribed, else to fanout peers (establishing fanout if absent).
    /// The message is never forwarded back to its origin.
    pub fn forward_publish(&mut self, message: &Message) -> Vec<RouterOutput> {
        let mut outputs = Vec::new();
        for topic in &message.topic_ids {
            let targets = if self.mesh.is_subscribed(topic) {
                self.mesh.mesh_peers(topic)
            } else {
                let declaring = self.peers_declaring(topic);
                let eligible: HashSet<_> = declaring
                    .intersection(&self.peers_gossipsub)
                    .copied()
                    .collect();
                self.mesh.touch_fanout(topic, &eligible, self.params.d, now(), &mut self.rng)
            };

            for peer in targets {
                if peer == message.from {
                    continue;
                }
                outputs.push(RouterOutput::publish(peer, message.clone()));
            }

            // floodsub peers declaring this topic always get a forward.
            for peer in self.peers_declaring(topic).intersection(&self.peers_floodsub) {
                if *peer != message.from {
                    outputs.push(RouterOutput::publish(*peer, message.clone()));
                }
            }
        }
        outputs
    }

    /// Record a message as seen/cached under every topic it was published
    /// to. Call before `forward_publish` so IWANT replies and IHAVE gossip
    /// can find it. Returns `false` if the message had already been seen
    /// (caller should drop it rather than forward or re-cache it).
    pub fn record_message(&mut self, message: &Message) -> bool {
        if !self.seen.insert(message.id()) {
            return false;
        }
        for topic in &message.topic_ids {
            self.mcache.put(topic.clone(), message.clone());
        }
        true
    }

    pub fn has_seen(&self, id: &crate::types::MessageId) -> bool {
        self.seen.contains(id)
    }

    // ---------------------------------------------------------------
    // Control handling
    // ---------------------------------------------------------------

    pub fn handle_control(&mut self, from: PeerId, control: ControlMessage) -> Vec<RouterOutput> {
        let mut outputs = Vec::new();

        for graft in control.grafts {
            outputs.extend(self.handle_graft(from, graft));
        }
        for prune in control.prunes {
            self.handle_prune(from, prune);
        }
        for ihave in control.ihaves {
            outputs.extend(self.handle_ihave(from, ihave));
        }
        for iwant in control.iwants {
            outputs.extend(self.handle_iwant(from, iwant));
        }

        outputs
    }

    /// GRAFT from `from`: accept (add to mesh) if locally subscribed to
    /// the topic, else reject with PRUNE. Duplicate GRAFTs are idempotent.
    fn handle_graft(&mut self, from: PeerId, graft: Graft) -> Vec<RouterOutput> {
        let topic = graft.topic_id;
        if self.mesh.is_subscribed(&topic) {
            if !self.peers_gossipsub.contains(&from) {
                warn!(peer = %from, topic = %topic, "GRAFT from non-gossipsub peer, ignoring");
                return Vec::new();
            }
            self.mesh.add_to_mesh(&topic, from);
            Vec::new()
        } else {
            vec![RouterOutput::control(
                from,
                ControlMessage {
                    prunes: vec![Prune { topic_id: topic }],
                    ..Default::default()
                },
            )]
        }
    }

    /// PRUNE from `from`: remove from mesh, apply back-off against
    /// immediate re-grafting. Idempotent.
    fn handle_prune(&mut self, from: PeerId, prune: Prune) {
        self.mesh.remove_from_mesh(&prune.topic_id, &from);
        self.backoff.insert((prune.topic_id, from), now() + PRUNE_BACKOFF_SECS);
    }

    /// IHAVE from `from`: reply IWANT for ids we haven't seen.
    fn handle_ihave(&mut self, from: PeerId, ihave: IHave) -> Vec<RouterOutput> {
        let unseen: Vec<_> = ihave
            .message_ids
            .into_iter()
            .filter(|id| !self.seen.contains(id))
            .collect();

        if unseen.is_empty() {
            return Vec::new();
        }

        vec![RouterOutput::control(
            from,
            ControlMessage {
                iwants: vec![IWant { message_ids: unseen }],
                ..Default::default()
            },
        )]
    }

    /// IWANT from `from`: send back every message we have cached.
    fn handle_iwant(&mut self, from: PeerId, iwant: IWant) -> Vec<RouterOutput> {
        iwant
            .message_ids
            .iter()
            .filter_map(|id| self.mcache.get(id).cloned())
            .map(|message| RouterOutput::publish(from, message))
            .collect()
    }

    // ---------------------------------------------------------------
    // Heartbeat
    // ---------------------------------------------------------------

    /// One heartbeat tick: mesh maintenance, fanout maintenance, gossip
    /// emission, then shift the message cache.
    pub fn heartbeat(&mut self) -> Vec<RouterOutput> {
        let now = now();
        let mut outputs = Vec::new();

        outputs.extend(self.heartbeat_mesh());
        outputs.extend(self.heartbeat_fanout(now));
        outputs.extend(self.heartbeat_gossip());

        self.mcache.shift();
        self.seen.shift();
        self.backoff.retain(|_, until| *until > now);

        outputs
    }

    fn heartbeat_mesh(&mut self) -> Vec<RouterOutput> {
        let mut outputs = Vec::new();
        let topics: Vec<_> = self.mesh.subscribed_topics().cloned().collect();

        for topic in topics {
            let size = self.mesh.mesh_len(&topic);
            if size < self.params.d_low {
                let additions = self.graft_candidates(&topic, self.params.d - size);
                for peer in additions {
                    self.mesh.add_to_mesh(&topic, peer);
                    outputs.push(RouterOutput::control(
                        peer,
                        ControlMessage {
                            grafts: vec![Graft { topic_id: topic.clone() }],
                            ..Default::default()
                        },
                    ));
                }
            } else if size > self.params.d_high {
                let mut peers: Vec<_> = self.mesh.mesh_peers(&topic).into_iter().collect();
                peers.shuffle(&mut self.rng);
                let keep = self.params.d.min(peers.len());
                for peer in peers.split_off(keep) {
                    self.mesh.remove_from_mesh(&topic, &peer);
                    self.backoff.insert((topic.clone(), peer), now() + PRUNE_BACKOFF_SECS);
                    outputs.push(RouterOutput::control(
                        peer,
                        ControlMessage {
                            prunes: vec![Prune { topic_id: topic.clone() }],
                            ..Default::default()
                        },
                    ));
                }
            }
        }
        outputs
    }

    fn heartbeat_fanout(&mut self, now: Timestamp) -> Vec<RouterOutput> {
        let ttl = self.params.fanout_ttl_secs as f64;
        let expired = self.mesh.expire_fanouts(now, ttl);
        for topic in &expired {
            debug!(topic = %topic, "fanout expired");
        }

        let topics: Vec<_> = self.mesh.fanout_topics().cloned().collect();
        for topic in topics {
            let declaring = self.peers_declaring(&topic);
            let eligible: HashSet<_> = declaring.intersection(&self.peers_gossipsub).copied().collect();
            self.mesh.prune_fanout(&topic, &eligible);
        }
        Vec::new()
    }

    fn heartbeat_gossip(&mut self) -> Vec<RouterOutput> {
        let mut outputs = Vec::new();
        let mut topics: HashSet<TopicId> = self.mesh.subscribed_topics().cloned().collect();
        topics.extend(self.mesh.fanout_topics().cloned());

        for topic in topics {
            let window = self.mcache.window(&topic);
            if window.is_empty() {
                continue;
            }

            let mesh_peers = self.mesh.mesh_peers(&topic);
            let fanout_peers = self.mesh.fanout_peers(&topic);
            let mut candidates: Vec<_> = self
                .peers_declaring(&topic)
                .intersection(&self.peers_gossipsub)
                .filter(|p| !mesh_peers.contains(*p) && !fanout_peers.contains(*p))
                .copied()
                .collect();

            if candidates.is_empty() {
                continue;
            }

            let n = self.params.gossip_peer_count(candidates.len());
            candidates.shuffle(&mut self.rng);
            candidates.truncate(n);

            for peer in candidates {
                trace!(peer = %peer, topic = %topic, "gossip IHAVE");
                outputs.push(RouterOutput::control(
                    peer,
                    ControlMessage {
                        ihaves: vec![IHave {
                            topic_id: topic.clone(),
                            message_ids: window.clone(),
                        }],
                        ..Default::default()
                    },
                ));
            }
        }
        outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libp2p_identity::PeerId;
    use rand::SeedableRng;

    fn router(params: GossipsubParameters) -> GossipsubRouter {
        GossipsubRouter::with_rng(params, StdRng::seed_from_u64(42))
    }

    fn params(d: usize, d_low: usize, d_high: usize) -> GossipsubParameters {
        GossipsubParameters {
            d,
            d_low,
            d_high,
            d_lazy: d,
            ..Default::default()
        }
    }

    #[test]
    fn join_promotes_fanout_and_fills_to_d() {
        let mut r = router(params(2, 1, 4));
        let topic: TopicId = "t".into();

        let peers: Vec<_> = (0..3).map(|_| PeerId::random()).collect();
        for p in &peers {
            r.note_peer_gossipsub(*p);
            r.note_subscription(*p, topic.clone(), true);
        }

        // Publish before subscribing builds fanout.
        let msg = Message::new(peers[0], 1u64, vec![topic.clone()], b"x".to_vec());
        r.record_message(&msg);
        r.forward_publish(&msg);
        assert!(r.has_fanout(&topic));

        let outputs = r.join(topic.clone());
        assert!(!r.has_fanout(&topic));
        assert_eq!(r.mesh_peers(&topic).len(), 2);
        assert!(outputs.iter().all(|o| !o.packet.control.grafts.is_empty()));
    }

    #[test]
    fn inbound_unsubscribe_drops_peer_from_fanout_immediately() {
        let mut r = router(params(2, 1, 4));
        let topic: TopicId = "t".into();
        let peer = PeerId::random();
        r.note_peer_gossipsub(peer);
        r.note_subscription(peer, topic.clone(), true);

        let msg = Message::new(peer, 1u64, vec![topic.clone()], b"x".to_vec());
        r.record_message(&msg);
        r.forward_publish(&msg);
        assert!(r.fanout_peers(&topic).contains(&peer));

        r.note_subscription(peer, topic.clone(), false);
        assert!(!r.fanout_peers(&topic).contains(&peer));
    }

    #[test]
    fn leave_prunes_all_mesh_peers_and_is_idempotent() {
        let mut r = router(params(2, 1, 4));
        let topic: TopicId = "t".into();
        let peer = PeerId::random();
        r.note_peer_gossipsub(peer);
        r.note_subscription(peer, topic.clone(), true);
        r.join(topic.clone());
        r.mesh.add_to_mesh(&topic, peer);

        let outputs = r.leave(topic.clone());
        assert_eq!(outputs.len(), 1);
        assert!(!r.is_subscribed(&topic));
        assert!(r.leave(topic).is_empty());
    }

    #[test]
    fn graft_rejected_when_not_subscribed() {
        let mut r = router(params(2, 1, 4));
        let topic: TopicId = "test_handle_graft".into();
        let bob = PeerId::random();
        r.note_peer_gossipsub(bob);

        let outputs = r.handle_control(
            bob,
            ControlMessage {
                grafts: vec![Graft { topic_id: topic.clone() }],
                ..Default::default()
            },
        );

        assert!(!r.mesh_peers(&topic).contains(&bob));
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].peer, bob);
        assert_eq!(outputs[0].packet.control.prunes.len(), 1);
    }

    #[test]
    fn graft_accepted_when_subscribed() {
        let mut r = router(params(2, 1, 4));
        let topic: TopicId = "t".into();
        r.note_subscription(PeerId::random(), topic.clone(), true); // no-op helper call
        r.mesh.subscribe(topic.clone());
        let alice = PeerId::random();
        r.note_peer_gossipsub(alice);

        let outputs = r.handle_control(
            alice,
            ControlMessage {
                grafts: vec![Graft { topic_id: topic.clone() }],
                ..Default::default()
            },
        );

        assert!(outputs.is_empty());
        assert!(r.mesh_peers(&topic).contains(&alice));
    }

    #[test]
    fn prune_removes_peer_from_mesh_only_on_receiving_side() {
        let mut r = router(params(2, 1, 4));
        let topic: TopicId = "test_handle_prune".into();
        r.mesh.subscribe(topic.clone());
        let bob = PeerId::random();
        r.note_peer_gossipsub(bob);
        r.mesh.add_to_mesh(&topic, bob);

        r.handle_control(
            bob,
            ControlMessage {
                prunes: vec![Prune { topic_id: topic.clone() }],
                ..Default::default()
            },
        );

        assert!(!r.mesh_peers(&topic).contains(&bob));
    }

    #[test]
    fn ihave_triggers_iwant_for_unseen_ids_only() {
        let mut r = router(params(2, 1, 4));
        let topic: TopicId = "t".into();
        let peer = PeerId::random();
        let seen_id = crate::types::MessageId::new(PeerId::random(), 1u64.into());
        let unseen_id = crate::types::MessageId::new(PeerId::random(), 2u64.into());
        r.seen.insert(seen_id.clone());

        let outputs = r.handle_control(
            peer,
            ControlMessage {
                ihaves: vec![IHave {
                    topic_id: topic,
                    message_ids: vec![seen_id, unseen_id.clone()],
                }],
                ..Default::default()
            },
        );

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].packet.control.iwants[0].message_ids, vec![unseen_id]);
    }

    #[test]
    fn iwant_replies_with_cached_messages() {
        let mut r = router(params(2, 1, 4));
        let topic: TopicId = "t".into();
        let origin = PeerId::random();
        let msg = Message::new(origin, 1u64, vec![topic.clone()], b"payload".to_vec());
        r.record_message(&msg);

        let requester = PeerId::random();
        let outputs = r.handle_control(
            requester,
            ControlMessage {
                iwants: vec![IWant { message_ids: vec![msg.id()] }],
                ..Default::default()
            },
        );

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].peer, requester);
        assert_eq!(outputs[0].packet.publish, vec![msg]);
    }

    #[test]
    fn heartbeat_grafts_below_d_low_and_prunes_above_d_high() {
        let mut r = router(params(3, 2, 4));
        let topic: TopicId = "t".into();
        r.mesh.subscribe(topic.clone());

        let declaring: Vec<_> = (0..6)
            .map(|_| {
                let p = PeerId::random();
                r.note_peer_gossipsub(p);
                r.note_subscription(p, topic.clone(), true);
                p
            })
            .collect();

        // Below D_low: one peer in mesh, should graft up to D=3.
        r.mesh.add_to_mesh(&topic, declaring[0]);
        r.heartbeat();
        assert!(r.mesh_peers(&topic).len() >= 2);

        // Above D_high: cram all 6 in, should prune down to D=3.
        for p in &declaring {
            r.mesh.add_to_mesh(&topic, *p);
        }
        r.heartbeat();
        assert!(r.mesh_peers(&topic).len() <= 4);
    }

    #[test]
    fn forward_publish_never_echoes_to_origin() {
        let mut r = router(params(3, 2, 4));
        let topic: TopicId = "t".into();
        r.mesh.subscribe(topic.clone());
        let origin = PeerId::random();
        let other = PeerId::random();
        r.note_peer_gossipsub(origin);
        r.note_peer_gossipsub(other);
        r.mesh.add_to_mesh(&topic, origin);
        r.mesh.add_to_mesh(&topic, other);

        let msg = Message::new(origin, 1u64, vec![topic], b"x".to_vec());
        let outputs = r.forward_publish(&msg);

        assert!(outputs.iter().all(|o| o.peer != origin));
        assert!(outputs.iter().any(|o| o.peer == other));
    }

    #[test]
    fn disconnect_clears_peer_from_every_overlay_table() {
        let mut r = router(params(3, 2, 4));
        let topic: TopicId = "t".into();
        r.mesh.subscribe(topic.clone());
        let peer = PeerId::random();
        r.note_peer_gossipsub(peer);
        r.mesh.add_to_mesh(&topic, peer);

        r.remove_peer(&peer);

        assert!(!r.mesh_peers(&topic).contains(&peer));
        assert_eq!(r.peer_state(&topic, &peer), PeerTopicState::Unknown);
    }
}
