//! A message published to a fanout topic before a peer connects is
//! still delivered to it once connected, via IHAVE/IWANT replay out of
//! the message cache (not via fanout membership, which never included
//! the late-arriving peer).

use std::sync::Arc;
use std::time::Duration;

use libp2p_identity::PeerId;
use meshsub::{GossipsubParameters, InMemoryTransport, Node, PeerProtocol};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn late_subscriber_receives_pre_connection_publish_via_gossip_replay() {
    let params = GossipsubParameters {
        heartbeat_interval_secs: 0.5,
        ..Default::default()
    };

    let node1_id = PeerId::random();
    let node2_id = PeerId::random();
    let node1_transport = InMemoryTransport::new(node1_id);
    let node2_transport = InMemoryTransport::new(node2_id);

    let node1 = Node::new(node1_id, params.clone(), Arc::clone(&node1_transport));
    let node2 = Node::new(node2_id, params, Arc::clone(&node2_transport));

    // Publish before node2 subscribes and before the two are connected.
    node1.pubsub().publish("foo".into(), b"stale but wanted".to_vec());
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut node2_queue = node2.pubsub().subscribe("foo".into()).await;

    // Now connect and negotiate.
    InMemoryTransport::link(&node1_transport, &node2_transport);
    node1.connected(node2_id).await;
    node2.connected(node1_id).await;
    node1.negotiated(node2_id, PeerProtocol::Gossipsub).await;
    node2.negotiated(node1_id, PeerProtocol::Gossipsub).await;

    // >= 1 heartbeat, plus headroom for the IHAVE -> IWANT -> publish round trip.
    let received = tokio::time::timeout(Duration::from_secs(3), node2_queue.recv())
        .await
        .expect("message should arrive within a couple of heartbeats")
        .expect("subscriber queue should stay open");

    assert_eq!(received.data, b"stale but wanted");

    let node1_snapshot = node1.pubsub().overlay("foo".into()).await;
    assert!(
        !node1_snapshot.fanout_peers.contains(&node2_id),
        "node2 should never have been silently enrolled as a fanout peer"
    );
}
