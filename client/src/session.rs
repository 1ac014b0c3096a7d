//! # Client Session
//!
//! Owns the remote-authority factory for one connection. Entry points on
//! the network side take the transport's network id and route it to the
//! local reference; entry points on the engine side run on the owning
//! thread and pump the deferred task queues.

use log::{debug, warn};

use refnet_shared::object::KIND_OBJECT;
use refnet_shared::{Authority, BaseId, Factory, NetworkId, Object, ReferenceId, Task};

/// Client-side registry and update routing for one session
pub struct Session {
    factory: Factory,
}

impl Session {
    /// Create a session with an empty remote-authority factory
    pub fn new() -> Self {
        Self {
            factory: Factory::new(Authority::Remote),
        }
    }

    /// The session's factory
    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    /// Mirror a world object announced by the server
    pub fn spawn_object(&self, base_id: BaseId) -> ReferenceId {
        self.factory.create(base_id, KIND_OBJECT, |reference| {
            Box::new(Object::new(reference))
        })
    }

    /// The server replaced a temporary id with the authoritative one
    pub fn remap(&self, temp: ReferenceId, assigned: ReferenceId) -> bool {
        match self.factory.remap_reference(temp, assigned) {
            Ok(()) => true,
            Err(err) => {
                warn!("id remap {:#010x} -> {:#010x} failed: {}", temp, assigned, err);
                false
            }
        }
    }

    /// Apply a re-base received from the wire; called from the network
    /// thread. Returns false if the network id routes nowhere.
    pub fn apply_base_update(&self, network_id: NetworkId, base_id: BaseId) -> bool {
        let Some(ref_id) = self.factory.reference_of(network_id) else {
            debug!("base update for unknown network id {:#x} dropped", network_id);
            return false;
        };
        match self.factory.rebase(ref_id, base_id) {
            Ok(_) => true,
            Err(err) => {
                warn!("base update for {:#010x} failed: {}", ref_id, err);
                false
            }
        }
    }

    /// Apply a movement update received from the wire; called from the
    /// network thread. Mutates the object under its lock, then defers the
    /// engine-side presentation update onto the owning thread.
    pub fn apply_position_update(
        &self,
        network_id: NetworkId,
        position: [f64; 3],
        engine_update: Task,
    ) -> bool {
        let Some(ref_id) = self.factory.reference_of(network_id) else {
            debug!(
                "position update for unknown network id {:#x} dropped",
                network_id
            );
            return false;
        };
        let Ok(mut object) = self.factory.acquire_as::<Object>(ref_id) else {
            warn!("position update for {:#010x}: not a world object", ref_id);
            return false;
        };
        object.set_position(position);
        object.enqueue(engine_update)
    }

    /// Defer arbitrary work onto the owning thread for one entity
    pub fn queue_engine_task(&self, ref_id: ReferenceId, task: Task) -> bool {
        self.factory.enqueue(ref_id, task)
    }

    /// Run every entity's pending deferred tasks; must be called from the
    /// owning (engine) thread. Each entity is acquired individually and
    /// briefly. Returns the number of tasks executed; tasks enqueued while
    /// pumping run on the next pump.
    pub fn pump(&self) -> usize {
        let mut executed = 0;
        for ref_id in self.factory.reference_ids() {
            // The entity may have been destroyed since the snapshot.
            if let Some(entity) = self.factory.acquire(ref_id) {
                executed += entity.drain();
            }
        }
        executed
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
