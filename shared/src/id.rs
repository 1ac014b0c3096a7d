//! # Identifier Space
//!
//! Pure identifier types shared across the client and server hosts. A
//! reference carries two local identifiers (its own reference id and the id
//! of the template it follows) plus a process-wide-unique network id used to
//! route messages to this exact instance across the wire.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;

/// Locally unique identifier of a reference, stable for its lifetime
pub type ReferenceId = u32;

/// Identifier of the template/class of behavior a reference follows
pub type BaseId = u32;

/// Process-wide-unique transport identifier, never reused
pub type NetworkId = u64;

/// Reserved "no reference" sentinel; never assigned to a live entity
pub const NULL_REFERENCE: ReferenceId = 0;

/// Reference ids at or above this bound are runtime-created (transient);
/// ids below it come from static data and survive across sessions.
pub const TRANSIENT_REFERENCE_BASE: ReferenceId = 0xFF00_0000;

/// Determines if a reference id is persistent
pub fn is_persistent(ref_id: ReferenceId) -> bool {
    ref_id < TRANSIENT_REFERENCE_BASE
}

// Network id allocator. Seeded with a random component so ids from
// different processes in the same session do not collide, then strictly
// increasing so an id is never handed out twice within a process.
static NETWORK_ID_COUNTER: Lazy<AtomicU64> = Lazy::new(|| {
    let random = (rand::random::<u32>() as u64) << 32;
    AtomicU64::new(random | 1)
});

/// Allocate a fresh network id
pub fn next_network_id() -> NetworkId {
    NETWORK_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}
