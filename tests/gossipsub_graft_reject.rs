//! GRAFT is only accepted by a node actually subscribed to the topic;
//! otherwise the requester is sent back a PRUNE.

mod common;

use std::time::Duration;

use meshsub::GossipsubParameters;

#[tokio::test]
async fn graft_to_a_subscribed_node_is_accepted_but_not_vice_versa() {
    common::init_tracing();
    let params = GossipsubParameters::default();
    let nodes = common::make_mesh(2, params).await;
    let topic: meshsub::TopicId = "test_handle_graft".into();

    let alice = &nodes[0];
    let bob = &nodes[1];

    // Only Alice subscribes.
    let _alice_queue = alice.pubsub().subscribe(topic.clone()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Bob GRAFTs Alice for the topic: Alice is subscribed, so Bob joins
    // Alice's mesh. We drive this as an inbound RPC, mirroring what the
    // muxer would hand to the router when Bob's frame arrives.
    alice.pubsub().inbound_rpc(
        bob.id(),
        meshsub::RpcPacket {
            control: meshsub::gossipsub::ControlMessage {
                grafts: vec![meshsub::gossipsub::Graft { topic_id: topic.clone() }],
                ..Default::default()
            },
            ..Default::default()
        },
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    let alice_snapshot = alice.pubsub().overlay(topic.clone()).await;
    assert!(alice_snapshot.mesh_peers.contains(&bob.id()), "Bob should have joined Alice's mesh");

    // Alice GRAFTs Bob: Bob isn't subscribed, so he must reject with PRUNE
    // rather than add Alice to a mesh that doesn't exist for him.
    bob.pubsub().inbound_rpc(
        alice.id(),
        meshsub::RpcPacket {
            control: meshsub::gossipsub::ControlMessage {
                grafts: vec![meshsub::gossipsub::Graft { topic_id: topic.clone() }],
                ..Default::default()
            },
            ..Default::default()
        },
    );

    let result = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let bob_snapshot = bob.pubsub().overlay(topic.clone()).await;
            if !bob_snapshot.subscribed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "Bob should never become subscribed just from receiving a GRAFT");

    let bob_snapshot = bob.pubsub().overlay(topic.clone()).await;
    assert!(bob_snapshot.mesh_peers.is_empty(), "Bob must not add Alice to a mesh for a topic he isn't subscribed to");
}
