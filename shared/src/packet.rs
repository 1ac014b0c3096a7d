//! # Replication Packets
//!
//! The byte-serializable unit handed to the transport layer. The core only
//! guarantees *when* an entity is dirty; the payload layout is whatever the
//! concrete entity kind wrote into it, keyed by the network id so the remote
//! side can route it to the exact instance.

use serde::{Deserialize, Serialize};

use crate::id::NetworkId;

/// A serialized entity state update, keyed by network id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Routes the packet to one entity instance across the wire
    pub network_id: NetworkId,

    /// Serialized attribute set of the entity kind that produced this
    pub payload: Vec<u8>,
}

impl Packet {
    /// Create a packet from an already serialized payload
    pub fn new(network_id: NetworkId, payload: Vec<u8>) -> Self {
        Self {
            network_id,
            payload,
        }
    }
}
