//! # Factory Errors
//!
//! The registry's externally visible failure surface. All entity-level
//! operations are synchronous and local; the only recoverable conditions are
//! lookups that found nothing usable. Precondition violations (re-entrant
//! acquisition, cross-entity lock handles) are programming errors and panic
//! instead of returning one of these.

use thiserror::Error;

use crate::id::ReferenceId;

/// Recoverable registry failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// No entity is registered under the requested reference id
    #[error("no reference with id {0:#010x}")]
    NotFound(ReferenceId),

    /// The entity exists but is not of the requested kind
    #[error("reference {0:#010x} is not of the requested kind")]
    KindMismatch(ReferenceId),

    /// An entity is already registered under this reference id
    #[error("reference id {0:#010x} already registered")]
    DuplicateReference(ReferenceId),

    /// Reference id 0 is the reserved null sentinel
    #[error("reference id 0 is reserved")]
    NullReference,
}
