/// Pub/Sub Core Actor
///
/// Owns the [`GossipsubRouter`], the [`PeerMuxer`], and the local
/// subscriber queues, all confined to the single task `run` drives — the
/// actor-model concurrency this crate uses so overlay mutations are never
/// interleaved across an `.await` point. Grounded in this crate's
/// `NetworkService` event loop: a `tokio::select!` over an inbound
/// command channel and a heartbeat timer, `tracing` at every externally
/// visible transition, `anyhow`-free internals (errors here are either
/// infallible or logged and dropped, since there's no caller left to
/// propagate them to once the actor is running).
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::gossipsub::{GossipsubParameters, GossipsubRouter, RouterOutput};
use crate::message::{Message, RpcPacket, Subscription};
use crate::muxer::{PeerMuxer, PeerProtocol};
use crate::transport::Transport;
use crate::types::{PeerId, TopicId};

pub const PROTOCOL_ID: &str = "/meshsub/1.0.0";

enum Command {
    Subscribe {
        topic: TopicId,
        reply: oneshot::Sender<mpsc::UnboundedReceiver<Message>>,
    },
    Unsubscribe {
        topic: TopicId,
    },
    Publish {
        topic: TopicId,
        data: Vec<u8>,
    },
    InboundRpc {
        from: PeerId,
        packet: RpcPacket,
    },
    PeerConnected {
        peer: PeerId,
    },
    PeerNegotiated {
        peer: PeerId,
        protocol: PeerProtocol,
    },
    PeerDisconnected {
        peer: PeerId,
    },
    Inspect {
        topic: TopicId,
        reply: oneshot::Sender<OverlaySnapshot>,
    },
}

/// A point-in-time read of one topic's overlay state, for introspection
/// (tests, diagnostics) without exposing the router itself across the
/// actor boundary.
#[derive(Debug, Clone, Default)]
pub struct OverlaySnapshot {
    pub subscribed: bool,
    pub mesh_peers: std::collections::HashSet<PeerId>,
    pub fanout_peers: std::collections::HashSet<PeerId>,
    pub has_fanout: bool,
}

/// Cloneable client handle to a running [`PubSub`] actor.
#[derive(Clone)]
pub struct PubSubHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl PubSubHandle {
    /// Subscribe to a topic, returning a queue of messages delivered to it.
    /// Re-subscribing replaces the previous queue.
    pub async fn subscribe(&self, topic: TopicId) -> mpsc::UnboundedReceiver<Message> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Subscribe { topic, reply });
        rx.await.expect("pubsub actor dropped the reply channel")
    }

    pub fn unsubscribe(&self, topic: TopicId) {
        let _ = self.tx.send(Command::Unsubscribe { topic });
    }

    pub fn publish(&self, topic: TopicId, data: Vec<u8>) {
        let _ = self.tx.send(Command::Publish { topic, data });
    }

    pub fn inbound_rpc(&self, from: PeerId, packet: RpcPacket) {
        let _ = self.tx.send(Command::InboundRpc { from, packet });
    }

    pub fn peer_connected(&self, peer: PeerId) {
        let _ = self.tx.send(Command::PeerConnected { peer });
    }

    pub fn peer_negotiated(&self, peer: PeerId, protocol: PeerProtocol) {
        let _ = self.tx.send(Command::PeerNegotiated { peer, protocol });
    }

    pub fn peer_disconnected(&self, peer: PeerId) {
        let _ = self.tx.send(Command::PeerDisconnected { peer });
    }

    /// Read a topic's current overlay state. Test/diagnostic use only —
    /// application logic should never need to peek inside the router.
    pub async fn overlay(&self, topic: TopicId) -> OverlaySnapshot {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Inspect { topic, reply });
        rx.await.unwrap_or_default()
    }
}

/// The actor task itself. Construct with [`PubSub::spawn`], which returns
/// a [`PubSubHandle`] and takes ownership of driving the task.
pub struct PubSub {
    local_peer: PeerId,
    router: GossipsubRouter,
    muxer: PeerMuxer,
    transport: Arc<dyn Transport>,
    local_subs: HashMap<TopicId, mpsc::UnboundedSender<Message>>,
    next_seqno: u64,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl PubSub {
    /// Spawn the actor task and return a handle to it.
    pub fn spawn(local_peer: PeerId, params: GossipsubParameters, transport: Arc<dyn Transport>) -> PubSubHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Self {
            local_peer,
            router: GossipsubRouter::new(params),
            muxer: PeerMuxer::new(),
            transport,
            local_subs: HashMap::new(),
            next_seqno: 0,
            rx,
        };
        tokio::spawn(actor.run());
        PubSubHandle { tx }
    }

    async fn run(mut self) {
        let mut heartbeat = tokio::time::interval(self.router.params().heartbeat_interval());
        loop {
            tokio::select! {
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }
                _ = heartbeat.tick() => {
                    let outputs = self.router.heartbeat();
                    self.dispatch(outputs).await;
                }
            }
        }
        info!(peer = %self.local_peer, "pubsub actor shutting down");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Subscribe { topic, reply } => self.subscribe(topic, reply).await,
            Command::Unsubscribe { topic } => self.unsubscribe(topic).await,
            Command::Publish { topic, data } => self.publish(topic, data).await,
            Command::InboundRpc { from, packet } => self.inbound_rpc(from, packet).await,
            Command::PeerConnected { peer } => self.muxer.peer_connected(peer),
            Command::PeerNegotiated { peer, protocol } => self.peer_negotiated(peer, protocol).await,
            Command::PeerDisconnected { peer } => {
                self.router.remove_peer(&peer);
                self.muxer.peer_disconnected(&peer);
            }
            Command::Inspect { topic, reply } => {
                let snapshot = OverlaySnapshot {
                    subscribed: self.router.is_subscribed(&topic),
                    mesh_peers: self.router.mesh_peers(&topic),
                    fanout_peers: self.router.fanout_peers(&topic),
                    has_fanout: self.router.has_fanout(&topic),
                };
                let _ = reply.send(snapshot);
            }
        }
    }

    async fn subscribe(&mut self, topic: TopicId, reply: oneshot::Sender<mpsc::UnboundedReceiver<Message>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.local_subs.insert(topic.clone(), tx);
        let outputs = self.router.join(topic.clone());
        self.broadcast_subscription(topic, true);
        self.dispatch(outputs).await;
        let _ = reply.send(rx);
    }

    async fn unsubscribe(&mut self, topic: TopicId) {
        self.local_subs.remove(&topic);
        let outputs = self.router.leave(topic.clone());
        self.broadcast_subscription(topic, false);
        self.dispatch(outputs).await;
    }

    /// Announce a local (un)subscription to every connected gossipsub
    /// peer, independent of mesh membership — peers that don't end up in
    /// our mesh still need to know we're a candidate for fanout.
    fn broadcast_subscription(&mut self, topic: TopicId, subscribe: bool) {
        let packet = RpcPacket {
            subscriptions: vec![Subscription { topic_id: topic, subscribe }],
            ..Default::default()
        };
        let peers: Vec<_> = self.muxer.negotiated_peers().copied().collect();
        for peer in peers {
            self.queue_or_send(peer, packet.clone());
        }
    }

    async fn publish(&mut self, topic: TopicId, data: Vec<u8>) {
        self.next_seqno += 1;
        let message = Message::new(self.local_peer, self.next_seqno, vec![topic], data);
        if !self.router.record_message(&message) {
            return;
        }
        self.deliver_local(&message);
        let outputs = self.router.forward_publish(&message);
        self.dispatch(outputs).await;
    }

    async fn inbound_rpc(&mut self, from: PeerId, packet: RpcPacket) {
        for sub in packet.subscriptions {
            self.router.note_subscription(from, sub.topic_id, sub.subscribe);
        }

        for message in packet.publish {
            if !self.router.record_message(&message) {
                continue;
            }
            self.deliver_local(&message);
            let outputs = self.router.forward_publish(&message);
            self.dispatch(outputs).await;
        }

        let outputs = self.router.handle_control(from, packet.control);
        self.dispatch(outputs).await;
    }

    async fn peer_negotiated(&mut self, peer: PeerId, protocol: PeerProtocol) {
        match protocol {
            PeerProtocol::Gossipsub => self.router.note_peer_gossipsub(peer),
            PeerProtocol::Floodsub => self.router.note_peer_floodsub(peer),
        }
        debug!(peer = %peer, protocol = ?protocol, "peer negotiated");
        let flushed = self.muxer.peer_negotiated(peer, protocol);
        for packet in flushed {
            self.send_now(peer, packet).await;
        }
        self.announce_subscriptions_to(peer).await;
    }

    /// Tell a newly negotiated peer about every topic we're already
    /// subscribed to, so a peer that negotiates after we subscribed still
    /// learns we're a candidate for its mesh/fanout — subscribing itself
    /// only reaches peers already negotiated at that point.
    async fn announce_subscriptions_to(&self, peer: PeerId) {
        if self.local_subs.is_empty() {
            return;
        }
        let packet = RpcPacket {
            subscriptions: self
                .local_subs
                .keys()
                .map(|topic| Subscription { topic_id: topic.clone(), subscribe: true })
                .collect(),
            ..Default::default()
        };
        self.send_now(peer, packet).await;
    }

    fn deliver_local(&self, message: &Message) {
        for topic in &message.topic_ids {
            if let Some(tx) = self.local_subs.get(topic) {
                if tx.send(message.clone()).is_err() {
                    warn!(topic = %topic, "local subscriber queue closed, dropping message");
                }
            }
        }
    }

    async fn dispatch(&mut self, outputs: Vec<RouterOutput>) {
        for output in outputs {
            self.queue_or_send(output.peer, output.packet);
        }
    }

    fn queue_or_send(&mut self, peer: PeerId, packet: RpcPacket) {
        match self.muxer.route(peer, packet) {
            Ok(packet) => {
                let transport = Arc::clone(&self.transport);
                tokio::spawn(async move {
                    if let Err(err) = transport.open_stream(peer, PROTOCOL_ID, packet).await {
                        warn!(peer = %peer, error = %err, "failed to deliver pubsub frame");
                    }
                });
            }
            Err(()) => trace_queued(peer),
        }
    }

    async fn send_now(&self, peer: PeerId, packet: RpcPacket) {
        if let Err(err) = self.transport.open_stream(peer, PROTOCOL_ID, packet).await {
            warn!(peer = %peer, error = %err, "failed to deliver flushed pubsub frame");
        }
    }
}

fn trace_queued(peer: PeerId) {
    tracing::trace!(peer = %peer, "frame queued pending protocol negotiation");
}
