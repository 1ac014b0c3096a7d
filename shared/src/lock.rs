//! # Lock Handle
//!
//! A [`Lockable`] is a non-owning proof of "the lock currently held on
//! entity X". Every mutator returns one so a multi-step mutation started by
//! one call can be continued by the caller without re-acquiring. The token
//! never releases anything; release belongs exclusively to the scoped-access
//! wrapper handed out by the factory.
//!
//! Token identity is the entity's network id, which is process-wide unique
//! and never reused, so comparing two tokens soundly answers "do these refer
//! to the same held lock". An operation that expects a single entity's lock
//! must reject a token minted by a different entity; that mismatch is a
//! programming error and panics.

use crate::id::NetworkId;

/// Comparable proof of the lock currently held on some entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lockable {
    network_id: NetworkId,
}

impl Lockable {
    pub(crate) fn new(network_id: NetworkId) -> Self {
        Self { network_id }
    }

    /// The network id of the entity whose lock this token refers to
    pub fn network_id(&self) -> NetworkId {
        self.network_id
    }
}
