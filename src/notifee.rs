/// Connection-lifecycle Notifee Bus
///
/// A `Notifee` observes connection and stream lifecycle events on a
/// [`crate::transport::Transport`]: `listen`, `listen_close`, `connected`,
/// `disconnected`, `opened_stream`, `closed_stream`. The bus dispatches
/// each event to every registered notifee, in registration order, and
/// isolates one notifee's failure from the rest.
///
/// ## Grounding
///
/// The `async fn` trait + blanket-impl-over-a-channel shape follows this
/// crate's `ChainMessageSink`/`P2pRequestSource` pattern: a narrow
/// `#[async_trait]` trait that callers can implement directly, or get for
/// free over a channel sender.
use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use multiaddr::Multiaddr;
use parking_lot::RwLock;
use tracing::warn;

use crate::types::PeerId;

/// Observes connection and stream lifecycle events.
///
/// All six methods are required; there is no default implementation,
/// because a notifee that silently no-ops half its callbacks would
/// misrepresent what it actually observes. Implementations should return
/// quickly — the bus awaits each callback in turn, so a slow notifee
/// delays delivery to every notifee registered after it.
#[async_trait]
pub trait Notifee: Send + Sync {
    async fn listen(&self, addr: &Multiaddr);
    async fn listen_close(&self, addr: &Multiaddr);
    async fn connected(&self, peer: &PeerId);
    async fn disconnected(&self, peer: &PeerId);
    async fn opened_stream(&self, peer: &PeerId, protocol: &str);
    async fn closed_stream(&self, peer: &PeerId, protocol: &str);
}

type SharedNotifee = Arc<dyn Notifee>;

/// Registry and dispatcher for [`Notifee`]s.
///
/// Registration order is preserved and is the dispatch order: `connected`
/// always reaches every notifee before `opened_stream` does, matching the
/// ordering guarantee callers rely on to build up per-peer state before
/// per-stream state arrives.
#[derive(Default)]
pub struct NotifeeBus {
    notifees: RwLock<Vec<SharedNotifee>>,
}

impl NotifeeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a statically-typed notifee. Always succeeds: a value that
    /// implements `Notifee` is valid by construction, there's nothing to
    /// reject at runtime.
    pub fn register<N: Notifee + 'static>(&self, notifee: N) -> bool {
        self.notifees.write().push(Arc::new(notifee));
        true
    }

    /// Register a type-erased candidate, for callers that only have an
    /// `Any` handle (e.g. a plugin registry keyed by trait object).
    ///
    /// Returns `false` without invoking any method if `candidate` doesn't
    /// actually implement every required callback — the one place this
    /// crate has to do at runtime what Rust's type system otherwise
    /// checks at compile time via [`NotifeeBus::register`].
    pub fn register_dyn(&self, candidate: Box<dyn Any + Send + Sync>) -> bool {
        match candidate.downcast::<SharedNotifee>() {
            Ok(notifee) => {
                self.notifees.write().push(*notifee);
                true
            }
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.notifees.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifees.read().is_empty()
    }

    fn snapshot(&self) -> Vec<SharedNotifee> {
        self.notifees.read().clone()
    }

    pub async fn listen(&self, addr: &Multiaddr) {
        for n in self.snapshot() {
            n.listen(addr).await;
        }
    }

    pub async fn listen_close(&self, addr: &Multiaddr) {
        for n in self.snapshot() {
            n.listen_close(addr).await;
        }
    }

    pub async fn connected(&self, peer: &PeerId) {
        for n in self.snapshot() {
            n.connected(peer).await;
        }
    }

    pub async fn disconnected(&self, peer: &PeerId) {
        for n in self.snapshot() {
            n.disconnected(peer).await;
        }
    }

    pub async fn opened_stream(&self, peer: &PeerId, protocol: &str) {
        for n in self.snapshot() {
            n.opened_stream(peer, protocol).await;
        }
    }

    pub async fn closed_stream(&self, peer: &PeerId, protocol: &str) {
        for n in self.snapshot() {
            n.closed_stream(peer, protocol).await;
        }
    }
}

/// A notifee backed by an unbounded channel: forwards every event as an
/// enum value, for callers (tests, or a higher-level actor) that want to
/// observe the stream of events rather than implement callbacks directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifeeEvent {
    Listen(Multiaddr),
    ListenClose(Multiaddr),
    Connected(PeerId),
    Disconnected(PeerId),
    OpenedStream(PeerId, String),
    ClosedStream(PeerId, String),
}

pub struct ChannelNotifee {
    tx: tokio::sync::mpsc::UnboundedSender<NotifeeEvent>,
}

impl ChannelNotifee {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<NotifeeEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: NotifeeEvent) {
        if self.tx.send(event).is_err() {
            warn!("notifee channel closed, dropping event");
        }
    }
}

#[async_trait]
impl Notifee for ChannelNotifee {
    async fn listen(&self, addr: &Multiaddr) {
        self.send(NotifeeEvent::Listen(addr.clone()));
    }

    async fn listen_close(&self, addr: &Multiaddr) {
        self.send(NotifeeEvent::ListenClose(addr.clone()));
    }

    async fn connected(&self, peer: &PeerId) {
        self.send(NotifeeEvent::Connected(*peer));
    }

    async fn disconnected(&self, peer: &PeerId) {
        self.send(NotifeeEvent::Disconnected(*peer));
    }

    async fn opened_stream(&self, peer: &PeerId, protocol: &str) {
        self.send(NotifeeEvent::OpenedStream(*peer, protocol.to_owned()));
    }

    async fn closed_stream(&self, peer: &PeerId, protocol: &str) {
        self.send(NotifeeEvent::ClosedStream(*peer, protocol.to_owned()));
    }
}
