/// GossipSub v1.0.0
///
/// Mesh-maintenance pub/sub: [`config`] holds the tunable parameters,
/// [`mesh`] and [`mcache`] hold the router's overlay and cache state,
/// [`control`] defines the GRAFT/PRUNE/IHAVE/IWANT frames, and [`router`]
/// ties them together into the actual heartbeat-driven control loop.
pub mod config;
pub mod control;
pub mod mcache;
pub mod mesh;
pub mod router;

pub use config::GossipsubParameters;
pub use control::{ControlMessage, Graft, IHave, IWant, Prune};
pub use mcache::{MessageCache, SeenCache};
pub use mesh::{FanoutEntry, MeshState, TopicMesh};
pub use router::{GossipsubRouter, PeerTopicState, RouterOutput};
