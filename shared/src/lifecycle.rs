//! # Host Authority and Slot Lifecycle
//!
//! Shared enums describing which side of the session a factory serves and
//! the registry-visible lifecycle stages of an entity slot.

use serde::{Deserialize, Serialize};

/// Which host a factory serves; decides host-specific behavior at slot
/// creation time (deferred task queues exist only on remote hosts, the
/// re-base re-initialization hook fires only on the authoritative one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authority {
    /// The simulation owner; runs re-initialization hooks and the
    /// replication flush
    Authoritative,

    /// A non-authoritative mirror; carries per-entity deferred task queues
    /// for moving work onto the engine thread
    Remote,
}

/// The current state of an entity slot in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotState {
    /// Slot is registered and addressable
    Active,

    /// Destruction was requested while scoped handles were still
    /// outstanding; storage survives until the last handle is released
    PendingDestroy,

    /// Slot has been unregistered
    Destroyed,
}
