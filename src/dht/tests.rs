use super::*;
use crate::announce::AnnounceQueue;
use crate::bencode::decode;
use super::message::{find_node_query, find_node_reply, get_peers_reply, pong_reply};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

#[test]
fn test_node_id_generate() {
    let id1 = NodeId::generate();
    let id2 = NodeId::generate();
    assert_ne!(id1.0, id2.0);
}

#[test]
fn test_node_id_neighbor_shares_prefix() {
    let target = [0x5a; 20];
    let id = NodeId::neighbor(&target);
    assert_eq!(&id.0[..15], &target[..15]);
}

#[test]
fn test_node_id_from_bytes_invalid() {
    assert!(NodeId::from_bytes(&[1u8; 10]).is_err());
    assert!(NodeId::from_bytes(&[1u8; 21]).is_err());
}

#[test]
fn test_node_compact_roundtrip() {
    let id = NodeId([7u8; 20]);
    let addr: SocketAddr = "10.0.0.1:6881".parse().unwrap();
    let node = Node::new(id, addr);

    let compact = node.to_compact().unwrap();
    let parsed = Node::from_compact(&compact).unwrap();

    assert_eq!(parsed, node);
}

#[test]
fn test_node_from_compact_rejects_bad_input() {
    assert!(Node::from_compact(&[0u8; 25]).is_none());
    assert!(Node::from_compact(&[0u8; 27]).is_none());

    // Port zero is unusable.
    let mut compact = [1u8; 26];
    compact[24] = 0;
    compact[25] = 0;
    assert!(Node::from_compact(&compact).is_none());
}

fn announce_packet(token: &[u8], port: Option<i64>, implied_port: Option<i64>) -> Vec<u8> {
    let mut packet = Vec::new();
    packet.extend_from_slice(b"d1:ad2:id20:AAAAAAAAAAAAAAAAAAAA9:info_hash20:BBBBBBBBBBBBBBBBBBBB");
    if let Some(v) = implied_port {
        packet.extend_from_slice(format!("12:implied_porti{}e", v).as_bytes());
    }
    if let Some(p) = port {
        packet.extend_from_slice(format!("4:porti{}e", p).as_bytes());
    }
    packet.extend_from_slice(b"5:token");
    packet.extend_from_slice(format!("{}:", token.len()).as_bytes());
    packet.extend_from_slice(token);
    packet.extend_from_slice(b"e1:q13:announce_peer1:t2:aa1:y1:qe");
    packet
}

#[test]
fn test_parse_ping_query() {
    let raw = b"d1:ad2:id20:abcdefghij0123456789e1:q4:ping1:t2:aa1:y1:qe";
    match KrpcPacket::parse(raw).unwrap() {
        KrpcPacket::Query {
            transaction_id,
            sender_id,
            query: KrpcQuery::Ping,
        } => {
            assert_eq!(transaction_id, Bytes::from_static(b"aa"));
            assert_eq!(sender_id.as_bytes(), b"abcdefghij0123456789");
        }
        other => panic!("unexpected parse: {:?}", other),
    }
}

#[test]
fn test_parse_get_peers_query() {
    let raw = b"d1:ad2:id20:abcdefghij01234567899:info_hash20:mnopqrstuvwxyz123456e1:q9:get_peers1:t2:aa1:y1:qe";
    match KrpcPacket::parse(raw).unwrap() {
        KrpcPacket::Query {
            query: KrpcQuery::GetPeers { info_hash },
            ..
        } => assert_eq!(&info_hash, b"mnopqrstuvwxyz123456"),
        other => panic!("unexpected parse: {:?}", other),
    }
}

#[test]
fn test_parse_announce_peer_query() {
    let raw = announce_packet(b"tokendata", Some(6881), None);
    match KrpcPacket::parse(&raw).unwrap() {
        KrpcPacket::Query {
            query:
                KrpcQuery::AnnouncePeer {
                    info_hash,
                    port,
                    implied_port,
                },
            ..
        } => {
            assert_eq!(&info_hash, b"BBBBBBBBBBBBBBBBBBBB");
            assert_eq!(port, Some(6881));
            assert!(!implied_port);
        }
        other => panic!("unexpected parse: {:?}", other),
    }
}

#[test]
fn test_parse_announce_peer_implied_port() {
    let raw = announce_packet(b"tokendata", Some(6881), Some(1));
    match KrpcPacket::parse(&raw).unwrap() {
        KrpcPacket::Query {
            query: KrpcQuery::AnnouncePeer { implied_port, .. },
            ..
        } => assert!(implied_port),
        other => panic!("unexpected parse: {:?}", other),
    }
}

#[test]
fn test_parse_announce_peer_implied_without_port() {
    // Common in the wild: implied_port set, port key absent entirely.
    let raw = announce_packet(b"tokendata", None, Some(1));
    match KrpcPacket::parse(&raw).unwrap() {
        KrpcPacket::Query {
            query:
                KrpcQuery::AnnouncePeer {
                    port, implied_port, ..
                },
            ..
        } => {
            assert_eq!(port, None);
            assert!(implied_port);
        }
        other => panic!("unexpected parse: {:?}", other),
    }
}

#[test]
fn test_parse_announce_peer_port_zero() {
    let raw = announce_packet(b"tokendata", Some(0), None);
    match KrpcPacket::parse(&raw).unwrap() {
        KrpcPacket::Query {
            query: KrpcQuery::AnnouncePeer { port, .. },
            ..
        } => assert_eq!(port, None),
        other => panic!("unexpected parse: {:?}", other),
    }
}

#[test]
fn test_parse_announce_peer_requires_token() {
    let raw =
        b"d1:ad2:id20:AAAAAAAAAAAAAAAAAAAA9:info_hash20:BBBBBBBBBBBBBBBBBBBB4:porti6881ee1:q13:announce_peer1:t2:aa1:y1:qe";
    assert!(KrpcPacket::parse(raw).is_err());
}

#[test]
fn test_parse_rejects_unknown_query() {
    let raw = b"d1:ad2:id20:abcdefghij0123456789e1:q4:vote1:t2:aa1:y1:qe";
    assert!(KrpcPacket::parse(raw).is_err());
}

#[test]
fn test_parse_rejects_error_messages() {
    let raw = b"d1:eli201e23:A Generic Error Ocurrede1:t2:aa1:y1:ee";
    assert!(KrpcPacket::parse(raw).is_err());
}

#[test]
fn test_parse_rejects_garbage() {
    assert!(KrpcPacket::parse(b"").is_err());
    assert!(KrpcPacket::parse(b"hello").is_err());
    assert!(KrpcPacket::parse(b"i42e").is_err());
}

#[test]
fn test_parse_response_nodes() {
    let node = Node::new(NodeId([9u8; 20]), "1.2.3.4:6881".parse().unwrap());
    let compact = node.to_compact().unwrap();

    let mut raw = Vec::new();
    raw.extend_from_slice(b"d1:rd2:id20:abcdefghij01234567895:nodes26:");
    raw.extend_from_slice(&compact);
    raw.extend_from_slice(b"e1:t2:aa1:y1:re");

    match KrpcPacket::parse(&raw).unwrap() {
        KrpcPacket::Response { nodes } => {
            assert_eq!(nodes, vec![node]);
        }
        other => panic!("unexpected parse: {:?}", other),
    }
}

#[test]
fn test_find_node_query_roundtrip() {
    let id = NodeId([1u8; 20]);
    let target = NodeId([2u8; 20]);
    let raw = find_node_query(b"xy", &id, &target);

    match KrpcPacket::parse(&raw).unwrap() {
        KrpcPacket::Query {
            transaction_id,
            sender_id,
            query: KrpcQuery::FindNode { target: parsed },
        } => {
            assert_eq!(transaction_id, Bytes::from_static(b"xy"));
            assert_eq!(sender_id, id);
            assert_eq!(parsed, target);
        }
        other => panic!("unexpected parse: {:?}", other),
    }
}

#[test]
fn test_reply_encodings() {
    let tid = Bytes::from_static(b"aa");
    let id = NodeId([3u8; 20]);

    let pong = decode(&pong_reply(&tid, &id)).unwrap();
    assert_eq!(pong.get(b"y").and_then(|v| v.as_str()), Some("r"));
    assert_eq!(
        pong.get(b"r").and_then(|r| r.get(b"id")).and_then(|v| v.as_bytes()),
        Some(&Bytes::copy_from_slice(&[3u8; 20]))
    );

    let fnr = decode(&find_node_reply(&tid, &id)).unwrap();
    assert_eq!(
        fnr.get(b"r").and_then(|r| r.get(b"nodes")).and_then(|v| v.as_bytes()),
        Some(&Bytes::from_static(b""))
    );

    let gpr = decode(&get_peers_reply(&tid, &id, b"12345678")).unwrap();
    assert_eq!(
        gpr.get(b"r").and_then(|r| r.get(b"token")).and_then(|v| v.as_bytes()),
        Some(&Bytes::from_static(b"12345678"))
    );
}

async fn spawn_sniffer(peek: bool) -> (Arc<AnnounceQueue>, SocketAddr, tokio::task::JoinHandle<()>) {
    let queue = Arc::new(AnnounceQueue::new(64));
    let sniffer = DhtSniffer::bind(
        "127.0.0.1:0".parse().unwrap(),
        Arc::clone(&queue),
        16,
        peek,
    )
    .await
    .unwrap();

    let addr: SocketAddr = format!("127.0.0.1:{}", sniffer.port()).parse().unwrap();
    let handle = tokio::spawn(async move {
        let _ = sniffer.run().await;
    });

    (queue, addr, handle)
}

async fn recv_reply(socket: &UdpSocket) -> crate::bencode::Value {
    let mut buf = [0u8; 1024];
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
        .await
        .expect("no reply before timeout")
        .expect("recv failed");
    decode(&buf[..n]).expect("reply is not bencode")
}

#[tokio::test]
async fn test_get_peers_reply_carries_neighbor_id_and_token() {
    let (_queue, addr, handle) = spawn_sniffer(false).await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let raw = b"d1:ad2:id20:abcdefghij01234567899:info_hash20:mnopqrstuvwxyz123456e1:q9:get_peers1:t2:aa1:y1:qe";
    socket.send_to(raw, addr).await.unwrap();

    let reply = recv_reply(&socket).await;
    assert_eq!(reply.get(b"y").and_then(|v| v.as_str()), Some("r"));

    let r = reply.get(b"r").unwrap();
    let id = r.get(b"id").and_then(|v| v.as_bytes()).unwrap();
    assert_eq!(&id[..15], &b"mnopqrstuvwxyz123456"[..15]);
    assert_eq!(r.get(b"token").and_then(|v| v.as_bytes()).map(|t| t.len()), Some(8));

    handle.abort();
}

#[tokio::test]
async fn test_announce_peer_publishes_announcement() {
    let (queue, addr, handle) = spawn_sniffer(false).await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    socket
        .send_to(&announce_packet(b"12345678", Some(6881), None), addr)
        .await
        .unwrap();
    recv_reply(&socket).await;

    let announcement = queue.pop().expect("announcement not published");
    assert_eq!(announcement.info_hash.as_bytes(), b"BBBBBBBBBBBBBBBBBBBB");
    assert_eq!(announcement.peer.port(), 6881);
    assert_eq!(announcement.info_hash.to_hex().len(), 40);

    handle.abort();
}

#[tokio::test]
async fn test_announce_peer_implied_port_uses_source_port() {
    let (queue, addr, handle) = spawn_sniffer(false).await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let source_port = socket.local_addr().unwrap().port();

    // No port key at all; implied_port alone must carry the announce.
    socket
        .send_to(&announce_packet(b"12345678", None, Some(1)), addr)
        .await
        .unwrap();
    recv_reply(&socket).await;

    let announcement = queue.pop().expect("announcement not published");
    assert_eq!(announcement.peer.port(), source_port);

    // Same with an explicit port 0, which implied_port overrides.
    socket
        .send_to(&announce_packet(b"12345678", Some(0), Some(1)), addr)
        .await
        .unwrap();
    recv_reply(&socket).await;

    let announcement = queue.pop().expect("announcement not published");
    assert_eq!(announcement.peer.port(), source_port);

    handle.abort();
}

#[tokio::test]
async fn test_announce_peer_unusable_port_is_not_published() {
    let (queue, addr, handle) = spawn_sniffer(false).await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // Port 0 without implied_port: nothing to dial, but the query still
    // deserves a reply.
    socket
        .send_to(&announce_packet(b"12345678", Some(0), None), addr)
        .await
        .unwrap();
    let reply = recv_reply(&socket).await;
    assert_eq!(reply.get(b"y").and_then(|v| v.as_str()), Some("r"));
    assert!(queue.pop().is_none());

    handle.abort();
}

#[tokio::test]
async fn test_unknown_query_gets_no_reply() {
    let (queue, addr, handle) = spawn_sniffer(false).await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let raw = b"d1:ad2:id20:abcdefghij0123456789e1:q4:vote1:t2:aa1:y1:qe";
    socket.send_to(raw, addr).await.unwrap();
    socket.send_to(b"not even bencode", addr).await.unwrap();

    let mut buf = [0u8; 1024];
    let reply = tokio::time::timeout(Duration::from_millis(300), socket.recv_from(&mut buf)).await;
    assert!(reply.is_err(), "malformed queries must be dropped silently");
    assert!(queue.pop().is_none());

    handle.abort();
}

#[tokio::test]
async fn test_get_peers_peek_policy() {
    let (queue, addr, handle) = spawn_sniffer(true).await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let raw = b"d1:ad2:id20:abcdefghij01234567899:info_hash20:mnopqrstuvwxyz123456e1:q9:get_peers1:t2:aa1:y1:qe";
    socket.send_to(raw, addr).await.unwrap();
    recv_reply(&socket).await;

    let announcement = queue.pop().expect("peeked announcement not published");
    assert_eq!(announcement.info_hash.as_bytes(), b"mnopqrstuvwxyz123456");
    assert_eq!(announcement.peer.port(), socket.local_addr().unwrap().port());

    handle.abort();
}
