use bytes::Bytes;
use std::collections::BTreeMap;

use super::error::DhtError;
use super::node::{Node, NodeId};
use crate::bencode::{decode, encode, Value};

/// A query from a remote node that the sniffer answers.
#[derive(Debug, Clone)]
pub enum KrpcQuery {
    Ping,
    FindNode {
        target: NodeId,
    },
    GetPeers {
        info_hash: [u8; 20],
    },
    AnnouncePeer {
        info_hash: [u8; 20],
        /// Announced TCP port; absent or zero when the sender relies on
        /// `implied_port`.
        port: Option<u16>,
        implied_port: bool,
    },
}

/// A decoded KRPC packet, reduced to what the sniffer acts on.
///
/// Incoming queries carry everything needed to reply and to harvest an
/// announce. Of responses, only the compact `nodes` payload matters:
/// they are replies to our own `find_node` queries, and the nodes inside
/// are the next batch of addresses to befriend. Anything else (unknown
/// queries, KRPC errors, responses without nodes) fails to parse and is
/// dropped by the caller.
#[derive(Debug, Clone)]
pub enum KrpcPacket {
    Query {
        transaction_id: Bytes,
        sender_id: NodeId,
        query: KrpcQuery,
    },
    Response {
        nodes: Vec<Node>,
    },
}

impl KrpcPacket {
    pub fn parse(data: &[u8]) -> Result<Self, DhtError> {
        let value = decode(data)?;
        let dict = value.as_dict().ok_or(DhtError::Malformed("not a dict"))?;

        let msg_type = dict
            .get(b"y".as_slice())
            .and_then(|v| v.as_str())
            .ok_or(DhtError::Malformed("missing y"))?;

        match msg_type {
            "q" => Self::parse_query(dict),
            "r" => Self::parse_response(dict),
            _ => Err(DhtError::Malformed("unhandled message type")),
        }
    }

    fn parse_query(dict: &BTreeMap<Bytes, Value>) -> Result<Self, DhtError> {
        let transaction_id = dict
            .get(b"t".as_slice())
            .and_then(|v| v.as_bytes())
            .cloned()
            .ok_or(DhtError::Malformed("missing transaction id"))?;

        let query_name = dict
            .get(b"q".as_slice())
            .and_then(|v| v.as_str())
            .ok_or(DhtError::Malformed("missing query name"))?;

        let args = dict
            .get(b"a".as_slice())
            .and_then(|v| v.as_dict())
            .ok_or(DhtError::Malformed("missing query args"))?;

        let sender_id = args
            .get(b"id".as_slice())
            .and_then(|v| v.as_bytes())
            .and_then(|b| NodeId::from_bytes(b).ok())
            .ok_or(DhtError::Malformed("missing sender id"))?;

        let query = match query_name {
            "ping" => KrpcQuery::Ping,
            "find_node" => {
                let target = args
                    .get(b"target".as_slice())
                    .and_then(|v| v.as_bytes())
                    .and_then(|b| NodeId::from_bytes(b).ok())
                    .ok_or(DhtError::Malformed("missing target"))?;
                KrpcQuery::FindNode { target }
            }
            "get_peers" => KrpcQuery::GetPeers {
                info_hash: parse_info_hash(args)?,
            },
            "announce_peer" => {
                let info_hash = parse_info_hash(args)?;

                // Not required here: with implied_port set, peers send
                // port 0 or omit the key entirely, and the UDP source
                // port is used instead.
                let port = args
                    .get(b"port".as_slice())
                    .and_then(|v| v.as_integer())
                    .and_then(|p| u16::try_from(p).ok())
                    .filter(|p| *p != 0);

                // The token only has to be present; any value we might
                // have handed out earlier is accepted.
                args.get(b"token".as_slice())
                    .and_then(|v| v.as_bytes())
                    .ok_or(DhtError::Malformed("missing token"))?;

                let implied_port = args
                    .get(b"implied_port".as_slice())
                    .and_then(|v| v.as_integer())
                    .map(|v| v == 1)
                    .unwrap_or(false);

                KrpcQuery::AnnouncePeer {
                    info_hash,
                    port,
                    implied_port,
                }
            }
            _ => return Err(DhtError::Malformed("unknown query")),
        };

        Ok(KrpcPacket::Query {
            transaction_id,
            sender_id,
            query,
        })
    }

    fn parse_response(dict: &BTreeMap<Bytes, Value>) -> Result<Self, DhtError> {
        let resp = dict
            .get(b"r".as_slice())
            .and_then(|v| v.as_dict())
            .ok_or(DhtError::Malformed("missing response dict"))?;

        let nodes = resp
            .get(b"nodes".as_slice())
            .and_then(|v| v.as_bytes())
            .map(|data| {
                data.chunks_exact(26)
                    .filter_map(Node::from_compact)
                    .collect::<Vec<_>>()
            })
            .ok_or(DhtError::Malformed("response without nodes"))?;

        Ok(KrpcPacket::Response { nodes })
    }
}

/// Encodes a `find_node` query signed with `id`.
pub fn find_node_query(transaction_id: &[u8], id: &NodeId, target: &NodeId) -> Vec<u8> {
    let mut args = BTreeMap::new();
    args.insert(Bytes::from_static(b"id"), bytes_value(id.as_bytes()));
    args.insert(Bytes::from_static(b"target"), bytes_value(target.as_bytes()));

    let mut dict = BTreeMap::new();
    dict.insert(
        Bytes::from_static(b"t"),
        Value::Bytes(Bytes::copy_from_slice(transaction_id)),
    );
    dict.insert(Bytes::from_static(b"y"), Value::string("q"));
    dict.insert(Bytes::from_static(b"q"), Value::string("find_node"));
    dict.insert(Bytes::from_static(b"a"), Value::Dict(args));

    encode(&Value::Dict(dict))
}

/// Encodes the bare `{id}` reply used for `ping` and `announce_peer`.
pub fn pong_reply(transaction_id: &Bytes, id: &NodeId) -> Vec<u8> {
    encode_reply(transaction_id, reply_args(id))
}

/// Encodes a `find_node` reply with an empty `nodes` payload.
///
/// Answering at all keeps this node in remote routing tables; being
/// useful is not the point.
pub fn find_node_reply(transaction_id: &Bytes, id: &NodeId) -> Vec<u8> {
    let mut args = reply_args(id);
    args.insert(Bytes::from_static(b"nodes"), bytes_value(b""));
    encode_reply(transaction_id, args)
}

/// Encodes a `get_peers` reply carrying a fabricated token and no peers.
pub fn get_peers_reply(transaction_id: &Bytes, id: &NodeId, token: &[u8]) -> Vec<u8> {
    let mut args = reply_args(id);
    args.insert(Bytes::from_static(b"nodes"), bytes_value(b""));
    args.insert(Bytes::from_static(b"token"), bytes_value(token));
    encode_reply(transaction_id, args)
}

fn reply_args(id: &NodeId) -> BTreeMap<Bytes, Value> {
    let mut args = BTreeMap::new();
    args.insert(Bytes::from_static(b"id"), bytes_value(id.as_bytes()));
    args
}

fn encode_reply(transaction_id: &Bytes, args: BTreeMap<Bytes, Value>) -> Vec<u8> {
    let mut dict = BTreeMap::new();
    dict.insert(Bytes::from_static(b"t"), Value::Bytes(transaction_id.clone()));
    dict.insert(Bytes::from_static(b"y"), Value::string("r"));
    dict.insert(Bytes::from_static(b"r"), Value::Dict(args));
    encode(&Value::Dict(dict))
}

fn bytes_value(data: &[u8]) -> Value {
    Value::Bytes(Bytes::copy_from_slice(data))
}

fn parse_info_hash(args: &BTreeMap<Bytes, Value>) -> Result<[u8; 20], DhtError> {
    args.get(b"info_hash".as_slice())
        .and_then(|v| v.as_bytes())
        .filter(|b| b.len() == 20)
        .map(|b| {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(b);
            hash
        })
        .ok_or(DhtError::Malformed("missing info_hash"))
}
