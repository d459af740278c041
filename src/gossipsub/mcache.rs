/// Gossipsub Message Cache
///
/// Caches recent messages for gossip dissemination and IWANT responses.
///
/// ## Sliding Window Design
///
/// The cache is organized as a sliding window of heartbeat "shifts":
///
/// ```text
/// +----------+----------+----------+----------+
/// | Shift 0  | Shift 1  | Shift 2  | Shift 3  | ...
/// | (newest) |          |          | (oldest) |
/// +----------+----------+----------+----------+
///      ^
///      |
/// New messages go here
/// ```
///
/// Each heartbeat, the oldest shift is evicted and a new empty shift is
/// prepended. Only the first `gossip_window` shifts are advertised via
/// IHAVE; older messages remain retrievable via IWANT until they age past
/// `history_length` shifts.
///
/// ## References
///
/// - Gossipsub v1.0: <https://github.com/libp2p/specs/blob/master/pubsub/gossipsub/gossipsub-v1.0.md>
use std::collections::{HashMap, HashSet, VecDeque};

use crate::message::Message;
use crate::types::{MessageId, TopicId};

/// A single entry in the message cache.
#[derive(Debug, Clone)]
struct CacheEntry {
    message: Message,
    topic: TopicId,
}

/// Sliding window cache for gossipsub messages.
#[derive(Debug, Clone)]
pub struct MessageCache {
    /// Number of recent shifts advertised via IHAVE. Must be <= `history_length`.
    gossip_window: usize,

    /// Total shifts retained; once a shift falls off the back it becomes
    /// permanently unretrievable.
    history_length: usize,

    /// Shift 0 is newest.
    shifts: VecDeque<HashSet<MessageId>>,

    by_id: HashMap<MessageId, CacheEntry>,
}

impl MessageCache {
    /// `history_length` must be at least `gossip_window`.
    pub fn new(gossip_window: usize, history_length: usize) -> Self {
        assert!(
            history_length >= gossip_window,
            "history_length ({history_length}) must be >= gossip_window ({gossip_window})"
        );

        let mut shifts = VecDeque::with_capacity(history_length.max(1));
        shifts.push_back(HashSet::new());

        Self {
            gossip_window,
            history_length,
            shifts,
            by_id: HashMap::new(),
        }
    }

    /// Insert into the current (newest) shift. Duplicates are ignored.
    ///
    /// Returns `true` if this was a new message.
    pub fn put(&mut self, topic: TopicId, message: Message) -> bool {
        let id = message.id();
        if self.by_id.contains_key(&id) {
            return false;
        }

        if let Some(newest) = self.shifts.front_mut() {
            newest.insert(id.clone());
        }
        self.by_id.insert(id, CacheEntry { message, topic });
        true
    }

    /// O(1) lookup across all retained shifts.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.by_id.get(id).map(|entry| &entry.message)
    }

    pub fn has(&self, id: &MessageId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Message ids from the newest `gossip_window` shifts belonging to `topic`.
    pub fn window(&self, topic: &TopicId) -> Vec<MessageId> {
        let mut ids = Vec::new();
        for shift in self.shifts.iter().take(self.gossip_window) {
            for id in shift {
                if let Some(entry) = self.by_id.get(id) {
                    if &entry.topic == topic {
                        ids.push(id.clone());
                    }
                }
            }
        }
        ids
    }

    /// Append a new empty shift, dropping the oldest once over capacity.
    ///
    /// Returns the number of messages evicted with the dropped shift.
    pub fn shift(&mut self) -> usize {
        let mut evicted = 0;
        if self.shifts.len() >= self.history_length {
            if let Some(oldest) = self.shifts.pop_back() {
                for id in oldest {
                    if self.by_id.remove(&id).is_some() {
                        evicted += 1;
                    }
                }
            }
        }
        self.shifts.push_front(HashSet::new());
        evicted
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Membership index sharing the message cache's shift horizon.
///
/// A message id ages out of `seen` exactly when the shift it was recorded
/// in is evicted — the two structures share one horizon by construction,
/// so callers drive both from the same heartbeat tick.
#[derive(Debug, Clone)]
pub struct SeenCache {
    shifts: VecDeque<HashSet<MessageId>>,
    history_length: usize,
    seen: HashSet<MessageId>,
}

impl SeenCache {
    pub fn new(history_length: usize) -> Self {
        let mut shifts = VecDeque::with_capacity(history_length.max(1));
        shifts.push_back(HashSet::new());
        Self {
            shifts,
            history_length,
            seen: HashSet::new(),
        }
    }

    /// Mark `id` as seen. Returns `true` if it was newly seen.
    pub fn insert(&mut self, id: MessageId) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        if let Some(newest) = self.shifts.front_mut() {
            newest.insert(id);
        }
        true
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    /// Age the horizon forward by one heartbeat shift.
    pub fn shift(&mut self) {
        if self.shifts.len() >= self.history_length {
            if let Some(oldest) = self.shifts.pop_back() {
                for id in oldest {
                    self.seen.remove(&id);
                }
            }
        }
        self.shifts.push_front(HashSet::new());
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}
