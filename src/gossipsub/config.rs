/// Gossipsub Parameters
///
/// Configuration parameters controlling mesh behavior, timing, and caching.
///
/// ## Parameter Categories
///
/// **Mesh Degree (D parameters):**
///
/// ```text
/// D_low <= D <= D_high
///
/// D       Target mesh size
/// D_low   Minimum before grafting new peers
/// D_high  Maximum before pruning excess peers
/// D_lazy  Peers to gossip IHAVE messages to
/// ```
///
/// **Timing:**
///
/// ```text
/// heartbeat_interval   Mesh maintenance frequency
/// fanout_ttl           How long to keep fanout peers
/// ```
///
/// **Caching:**
///
/// ```text
/// gossip_window    Shifts advertised via IHAVE
/// history_length   Total shifts kept for IWANT replies
/// ```
///
/// ## References
///
/// - Gossipsub v1.0: <https://github.com/libp2p/specs/blob/master/pubsub/gossipsub/gossipsub-v1.0.md>
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Core gossipsub configuration.
///
/// Defaults follow the values the GossipSub v1.0 spec recommends for a
/// general-purpose deployment (D=6, D_low=4, D_high=12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipsubParameters {
    /// Target number of mesh peers per topic.
    #[serde(default = "default_d")]
    pub d: usize,

    /// Minimum mesh peers before grafting.
    #[serde(default = "default_d_low")]
    pub d_low: usize,

    /// Maximum mesh peers before pruning.
    #[serde(default = "default_d_high")]
    pub d_high: usize,

    /// Minimum number of peers sent IHAVE gossip each heartbeat, as a
    /// floor under `gossip_factor * |eligible peers|`.
    #[serde(default = "default_d_lazy")]
    pub d_lazy: usize,

    /// Fraction (in `[0, 1]`) of eligible non-mesh peers gossiped to.
    #[serde(default = "default_gossip_factor")]
    pub gossip_factor: f64,

    /// Interval between heartbeat ticks, in seconds.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: f64,

    /// Time-to-live for fanout entries, in seconds.
    #[serde(default = "default_fanout_ttl_secs")]
    pub fanout_ttl_secs: u64,

    /// Total shifts retained in the message cache.
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    /// Shifts included in IHAVE gossip. Must be `<= history_length`.
    #[serde(default = "default_gossip_window")]
    pub gossip_window: usize,
}

fn default_d() -> usize {
    6
}

fn default_d_low() -> usize {
    4
}

fn default_d_high() -> usize {
    12
}

fn default_d_lazy() -> usize {
    6
}

fn default_gossip_factor() -> f64 {
    0.25
}

fn default_heartbeat_interval_secs() -> f64 {
    1.0
}

fn default_fanout_ttl_secs() -> u64 {
    60
}

fn default_history_length() -> usize {
    5
}

fn default_gossip_window() -> usize {
    3
}

impl Default for GossipsubParameters {
    fn default() -> Self {
        Self {
            d: default_d(),
            d_low: default_d_low(),
            d_high: default_d_high(),
            d_lazy: default_d_lazy(),
            gossip_factor: default_gossip_factor(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            fanout_ttl_secs: default_fanout_ttl_secs(),
            history_length: default_history_length(),
            gossip_window: default_gossip_window(),
        }
    }
}

impl GossipsubParameters {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs_f64(self.heartbeat_interval_secs)
    }

    pub fn fanout_ttl(&self) -> Duration {
        Duration::from_secs(self.fanout_ttl_secs)
    }

    /// Number of peers to gossip IHAVE to out of `eligible`, per the
    /// `max(gossip_factor * |eligible|, d_lazy)` rule
    /// (bounded by what's actually available).
    pub fn gossip_peer_count(&self, eligible: usize) -> usize {
        let scaled = (self.gossip_factor * eligible as f64).ceil() as usize;
        scaled.max(self.d_lazy).min(eligible)
    }
}
