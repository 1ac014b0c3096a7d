//! # SharedModule
//!
//! The reference object model and its locking/ownership core, shared by the
//! client (non-authoritative) and server (authoritative) host crates. This
//! crate contains the identifier space, the attribute cell, the per-entity
//! lock discipline, the entity base type, the scoped-access wrapper handed
//! out by the factory, and the deferred task queue used to move work from
//! worker threads onto the entity-owning thread.

// Export module structure
pub mod id;
pub mod value;
pub mod lock;
pub mod param;
pub mod packet;
pub mod lifecycle;
pub mod tasks;
pub mod reference;
pub mod object;
pub mod error;
pub mod factory;

// Re-export commonly used items for convenience
pub use id::{BaseId, NetworkId, ReferenceId, NULL_REFERENCE};
pub use value::Value;
pub use lock::Lockable;
pub use param::RawParameter;
pub use packet::Packet;
pub use lifecycle::{Authority, SlotState};
pub use tasks::{Task, TaskQueue};
pub use reference::{Entity, EntityCast, Reference};
pub use object::Object;
pub use error::FactoryError;
pub use factory::{Factory, FactoryObject, ReferenceFunctor};
