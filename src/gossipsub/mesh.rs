/// Gossipsub Mesh State
///
/// Manages the mesh topology for gossipsub topics.
///
/// ## Overview
///
/// Each subscribed topic maintains a **mesh**: a set of peers for full
/// message exchange. The mesh is the core data structure enabling
/// gossipsub's eager push protocol.
///
/// - **Mesh peers**: Exchange full messages immediately (eager push)
/// - **Non-mesh peers**: Receive IHAVE advertisements, request via IWANT (lazy pull)
///
/// ## Mesh vs Fanout
///
/// | Type   | Description                                                |
/// |--------|-----------------------------------------------------------|
/// | Mesh   | Peers for topics we subscribe to                           |
/// | Fanout | Temporary peers for topics we publish to but don't         |
/// |        | subscribe to. Expires after fanout_ttl.                     |
///
/// ## References
///
/// - Gossipsub v1.0: <https://github.com/libp2p/specs/blob/master/pubsub/gossipsub/gossipsub-v1.0.md>
use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::{PeerId, Timestamp, TopicId};

/// Fanout state for a publish-only topic.
///
/// Unlike mesh peers, fanout peers only receive our published messages; we
/// don't receive theirs since we're not subscribed.
#[derive(Debug, Clone, Default)]
pub struct FanoutEntry {
    pub peers: HashSet<PeerId>,
    /// Timestamp of the last publish to this topic; drives TTL expiry.
    pub last_published: Timestamp,
}

impl FanoutEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stale(&self, current_time: Timestamp, ttl_seconds: f64) -> bool {
        current_time - self.last_published > ttl_seconds
    }
}

/// Mesh state for a single topic: the peers we exchange full messages with.
#[derive(Debug, Clone, Default)]
pub struct TopicMesh {
    pub peers: HashSet<PeerId>,
}

impl TopicMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the peer was newly added.
    pub fn add_peer(&mut self, peer: PeerId) -> bool {
        self.peers.insert(peer)
    }

    /// Returns `true` if the peer was present and removed.
    pub fn remove_peer(&mut self, peer: &PeerId) -> bool {
        self.peers.remove(peer)
    }
}

/// Complete mesh/fanout state for all topics this router knows about.
///
/// Owned exclusively by the router task; overlay reads/writes between
/// suspension points are atomic because nothing else ever touches this
/// struct concurrently.
#[derive(Debug, Clone, Default)]
pub struct MeshState {
    meshes: HashMap<TopicId, TopicMesh>,
    fanouts: HashMap<TopicId, FanoutEntry>,
    subscriptions: HashSet<TopicId>,
}

impl MeshState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic, initializing its mesh.
    ///
    /// If fanout peers already exist for this topic they are promoted
    /// whole; the caller (router) is responsible for capping at `D` and
    /// emitting GRAFT — this method just records state.
    ///
    /// Returns the promoted fanout peers, if any.
    pub fn subscribe(&mut self, topic: TopicId) -> HashSet<PeerId> {
        if self.subscriptions.contains(&topic) {
            return HashSet::new();
        }
        self.subscriptions.insert(topic.clone());

        let promoted = self
            .fanouts
            .remove(&topic)
            .map(|fanout| fanout.peers)
            .unwrap_or_default();

        let mesh = self.meshes.entry(topic).or_default();
        mesh.peers.extend(promoted.iter().copied());
        promoted
    }

    /// Unsubscribe from a topic. Re-leaving an absent topic is a no-op.
    ///
    /// Returns the peers that were in the mesh (the caller PRUNEs them).
    pub fn unsubscribe(&mut self, topic: &TopicId) -> HashSet<PeerId> {
        self.subscriptions.remove(topic);
        self.meshes
            .remove(topic)
            .map(|mesh| mesh.peers)
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, topic: &TopicId) -> bool {
        self.subscriptions.contains(topic)
    }

    pub fn mesh_peers(&self, topic: &TopicId) -> HashSet<PeerId> {
        self.meshes.get(topic).map(|m| m.peers.clone()).unwrap_or_default()
    }

    pub fn mesh_len(&self, topic: &TopicId) -> usize {
        self.meshes.get(topic).map(|m| m.peers.len()).unwrap_or(0)
    }

    pub fn fanout_peers(&self, topic: &TopicId) -> HashSet<PeerId> {
        self.fanouts.get(topic).map(|f| f.peers.clone()).unwrap_or_default()
    }

    pub fn has_fanout(&self, topic: &TopicId) -> bool {
        self.fanouts.contains_key(topic)
    }

    /// Add a peer to a topic's mesh. A peer never appears in both `mesh`
    /// and `fanout` for the same topic: adding to mesh drops it from fanout.
    pub fn add_to_mesh(&mut self, topic: &TopicId, peer: PeerId) -> bool {
        if let Some(fanout) = self.fanouts.get_mut(topic) {
            fanout.peers.remove(&peer);
        }
        self.meshes.entry(topic.clone()).or_default().add_peer(peer)
    }

    pub fn remove_from_mesh(&mut self, topic: &TopicId, peer: &PeerId) -> bool {
        self.meshes.get_mut(topic).map(|m| m.remove_peer(peer)).unwrap_or(false)
    }

    /// Drop a single peer from a topic's fanout entry, e.g. on an inbound
    /// UNSUBSCRIBE so it doesn't linger until the next heartbeat's prune.
    pub fn remove_peer_from_fanout(&mut self, topic: &TopicId, peer: &PeerId) -> bool {
        self.fanouts.get_mut(topic).map(|f| f.peers.remove(peer)).unwrap_or(false)
    }

    /// Fill the fanout for a topic we publish to without subscribing,
    /// topping up to `d` random peers from `available` that aren't
    /// already present, and stamping `last_published`.
    pub fn touch_fanout(
        &mut self,
        topic: &TopicId,
        available: &HashSet<PeerId>,
        d: usize,
        now: Timestamp,
        rng: &mut impl Rng,
    ) -> HashSet<PeerId> {
        let entry = self.fanouts.entry(topic.clone()).or_default();
        entry.last_published = now;

        if entry.peers.len() < d {
            let candidates: Vec<_> = available.difference(&entry.peers).copied().collect();
            let needed = d - entry.peers.len();
            let picked = candidates.choose_multiple(rng, needed.min(candidates.len()));
            entry.peers.extend(picked);
        }
        entry.peers.clone()
    }

    /// Drop fanout entries whose last publish exceeds `ttl_seconds`.
    ///
    /// Returns the dropped topic ids.
    pub fn expire_fanouts(&mut self, now: Timestamp, ttl_seconds: f64) -> Vec<TopicId> {
        let stale: Vec<_> = self
            .fanouts
            .iter()
            .filter(|(_, entry)| entry.is_stale(now, ttl_seconds))
            .map(|(topic, _)| topic.clone())
            .collect();

        for topic in &stale {
            self.fanouts.remove(topic);
        }
        stale
    }

    /// Drop fanout peers that no longer declare the topic.
    ///
    /// Deliberately does *not* top the entry back up with peers who only
    /// just started declaring the topic: those peers never received the
    /// messages already in the fanout's history, so silently enrolling
    /// them here would drop messages instead of replaying them. A peer
    /// that declares the topic only earns fanout membership the next
    /// time we actually publish (see `touch_fanout`) — until then it's
    /// a gossip/IWANT candidate, which is the path that can hand it the
    /// cached backlog.
    pub fn prune_fanout(&mut self, topic: &TopicId, available: &HashSet<PeerId>) {
        if let Some(entry) = self.fanouts.get_mut(topic) {
            entry.peers.retain(|p| available.contains(p));
        }
    }

    pub fn subscribed_topics(&self) -> impl Iterator<Item = &TopicId> {
        self.subscriptions.iter()
    }

    pub fn fanout_topics(&self) -> impl Iterator<Item = &TopicId> {
        self.fanouts.keys()
    }

    /// Remove a peer from every mesh and fanout entry it appears in, e.g.
    /// after disconnect. Mirrors the "any state -> UNKNOWN on disconnect"
    /// transition of the per-(topic, peer) state machine.
    pub fn remove_peer_everywhere(&mut self, peer: &PeerId) {
        for mesh in self.meshes.values_mut() {
            mesh.peers.remove(peer);
        }
        for fanout in self.fanouts.values_mut() {
            fanout.peers.remove(peer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libp2p_identity::PeerId;

    #[test]
    fn subscribe_and_unsubscribe_round_trips() {
        let mut mesh = MeshState::new();
        let topic: TopicId = "topic1".into();

        mesh.subscribe(topic.clone());
        assert!(mesh.is_subscribed(&topic));

        let pruned = mesh.unsubscribe(&topic);
        assert!(!mesh.is_subscribed(&topic));
        assert!(pruned.is_empty());
    }

    #[test]
    fn double_unsubscribe_is_idempotent() {
        let mut mesh = MeshState::new();
        let topic: TopicId = "topic1".into();
        mesh.subscribe(topic.clone());
        mesh.unsubscribe(&topic);
        assert!(mesh.unsubscribe(&topic).is_empty());
    }

    #[test]
    fn add_remove_mesh_peers() {
        let mut mesh = MeshState::new();
        let topic: TopicId = "topic1".into();
        mesh.subscribe(topic.clone());

        let p1 = PeerId::random();
        let p2 = PeerId::random();
        assert!(mesh.add_to_mesh(&topic, p1));
        assert!(mesh.add_to_mesh(&topic, p2));
        assert!(!mesh.add_to_mesh(&topic, p1));

        let peers = mesh.mesh_peers(&topic);
        assert!(peers.contains(&p1));
        assert!(peers.contains(&p2));

        assert!(mesh.remove_from_mesh(&topic, &p1));
        assert!(!mesh.remove_from_mesh(&topic, &p1));
        assert!(!mesh.mesh_peers(&topic).contains(&p1));
    }

    #[test]
    fn subscribe_promotes_fanout_peers() {
        let mut mesh = MeshState::new();
        let topic: TopicId = "topic1".into();
        let mut rng = rand::thread_rng();
        let available: HashSet<_> = (0..3).map(|_| PeerId::random()).collect();

        mesh.touch_fanout(&topic, &available, 3, 0.0, &mut rng);
        assert!(mesh.has_fanout(&topic));

        let promoted = mesh.subscribe(topic.clone());
        assert!(!mesh.has_fanout(&topic));
        assert_eq!(promoted.len(), 3);
        assert_eq!(mesh.mesh_peers(&topic), promoted);
    }

    #[test]
    fn peer_never_in_both_mesh_and_fanout() {
        let mut mesh = MeshState::new();
        let topic: TopicId = "topic1".into();
        let peer = PeerId::random();
        let mut rng = rand::thread_rng();

        let available: HashSet<_> = [peer].into_iter().collect();
        mesh.touch_fanout(&topic, &available, 1, 0.0, &mut rng);
        assert!(mesh.fanout_peers(&topic).contains(&peer));

        mesh.add_to_mesh(&topic, peer);
        assert!(!mesh.fanout_peers(&topic).contains(&peer));
        assert!(mesh.mesh_peers(&topic).contains(&peer));
    }

    #[test]
    fn fanout_expires_after_ttl() {
        let mut mesh = MeshState::new();
        let topic: TopicId = "topic1".into();
        let mut rng = rand::thread_rng();
        mesh.touch_fanout(&topic, &HashSet::new(), 1, 1000.0, &mut rng);

        assert!(mesh.expire_fanouts(1030.0, 60.0).is_empty());
        assert_eq!(mesh.expire_fanouts(1070.0, 60.0), vec![topic.clone()]);
        assert!(!mesh.has_fanout(&topic));
    }

    #[test]
    fn remove_peer_everywhere_clears_mesh_and_fanout() {
        let mut mesh = MeshState::new();
        let topic: TopicId = "topic1".into();
        let peer = PeerId::random();
        mesh.subscribe(topic.clone());
        mesh.add_to_mesh(&topic, peer);

        mesh.remove_peer_everywhere(&peer);
        assert!(!mesh.mesh_peers(&topic).contains(&peer));
    }
}
