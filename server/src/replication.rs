//! # Replication Flush
//!
//! The pass that moves dirty entity state toward the transport layer. It
//! never holds a global lock: candidates are coarse-filtered on the
//! lock-free changed flag, then each entity is acquired individually,
//! re-validated under its lock, serialized, and cleared.

use log::debug;

use refnet_shared::{Factory, Packet};

/// Collect packets from every entity changed since the last flush and
/// clear their changed flags. The packets are keyed by network id; the
/// transport layer decides where the bytes go.
pub fn flush_changed(factory: &Factory) -> Vec<Packet> {
    let mut packets = Vec::new();

    for ref_id in factory.reference_ids() {
        // Coarse check-then-lock: skip clean entities without acquiring.
        if factory.is_changed(ref_id) != Some(true) {
            continue;
        }
        let Some(mut entity) = factory.acquire(ref_id) else {
            continue;
        };
        // Re-validate under the lock; the flag may have been cleared
        // between the coarse check and the acquisition.
        if !entity.get_changed() {
            continue;
        }
        packets.push(entity.entity().to_packet());
        entity.set_changed(false);
    }

    if !packets.is_empty() {
        debug!("replication flush collected {} packet(s)", packets.len());
    }
    packets
}
