use std::sync::Arc;

use libp2p_identity::PeerId;
use meshsub::{GossipsubParameters, InMemoryTransport, Node, PeerProtocol};

/// Route this crate's `tracing` output through the test harness so a
/// failing assertion comes with router/mesh logs instead of silence.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Build `n` nodes, fully connected pairwise over in-memory transports,
/// with gossipsub already negotiated on every link.
pub async fn make_mesh(n: usize, params: GossipsubParameters) -> Vec<Node> {
    let ids: Vec<PeerId> = (0..n).map(|_| PeerId::random()).collect();
    let transports: Vec<_> = ids.iter().map(|id| InMemoryTransport::new(*id)).collect();

    for i in 0..n {
        for j in (i + 1)..n {
            InMemoryTransport::link(&transports[i], &transports[j]);
        }
    }

    let nodes: Vec<Node> = ids
        .iter()
        .zip(transports.iter())
        .map(|(id, t)| Node::new(*id, params.clone(), Arc::clone(t)))
        .collect();

    for i in 0..n {
        for j in (i + 1)..n {
            nodes[i].connected(ids[j]).await;
            nodes[j].connected(ids[i]).await;
            nodes[i].negotiated(ids[j], PeerProtocol::Gossipsub).await;
            nodes[j].negotiated(ids[i], PeerProtocol::Gossipsub).await;
        }
    }

    nodes
}
