//! # Server World
//!
//! Owns the authoritative factory and exposes the world-level operations
//! the game loop and script bindings call: spawn, destroy, re-base (with
//! the re-initialization hook) and broadcast scans over the registered
//! entities.

use log::info;

use refnet_shared::object::KIND_OBJECT;
use refnet_shared::{
    BaseId, Factory, FactoryError, FactoryObject, Object, Packet, Reference, ReferenceFunctor,
    ReferenceId,
};
use refnet_shared::{Authority, NetworkId};

/// The authoritative entity registry for one running world
pub struct World {
    factory: Factory,
}

impl World {
    /// Create an empty authoritative world
    pub fn new() -> Self {
        Self {
            factory: Factory::new(Authority::Authoritative),
        }
    }

    /// The world's factory
    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    /// Spawn a world object following the given template
    pub fn spawn_object(&self, base_id: BaseId) -> ReferenceId {
        let ref_id = self.factory.create(base_id, KIND_OBJECT, |reference| {
            Box::new(Object::new(reference))
        });
        info!("spawned object {:#010x} (base {:#010x})", ref_id, base_id);
        ref_id
    }

    /// Remove an entity from the world; storage outlives any handle still
    /// held elsewhere
    pub fn remove(&self, ref_id: ReferenceId) -> bool {
        self.factory.destroy(ref_id)
    }

    /// Swap an entity's template and run its re-initialization hook.
    /// Returns the previous base id.
    pub fn rebase(&self, ref_id: ReferenceId, base_id: BaseId) -> Result<BaseId, FactoryError> {
        self.factory.rebase(ref_id, base_id)
    }

    /// Serialize every entity matching the functor, acquiring each
    /// individually; used for state-for-newcomer broadcasts.
    pub fn broadcast(&self, functor: &dyn ReferenceFunctor) -> Vec<Packet> {
        let mut packets = Vec::new();
        self.factory
            .for_each(functor, |entity| packets.push(entity.entity().to_packet()));
        packets
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Selects world objects, optionally skipping one originator
pub struct ObjectFunctor {
    skip: NetworkId,
}

impl ObjectFunctor {
    /// Match every world object
    pub fn all() -> Self {
        Self { skip: 0 }
    }

    /// Match every world object except the originator
    pub fn except(skip: NetworkId) -> Self {
        Self { skip }
    }
}

impl ReferenceFunctor for ObjectFunctor {
    fn flags(&self) -> u32 {
        KIND_OBJECT
    }

    fn exclude(&self) -> NetworkId {
        self.skip
    }

    fn filter(&self, _entity: &FactoryObject<Reference>) -> bool {
        true
    }
}
