//! # Entity Base Type
//!
//! [`Reference`] is the base every in-simulation entity kind rides on. It
//! owns the identifier pair (reference id, base id), the replication dirty
//! flag, and the immutable network id. The identifiers and the dirty flag are
//! atomically tracked so they can be read without the entity lock for coarse
//! check-then-lock filtering; any result that drives a mutation must be
//! re-validated under the lock.
//!
//! Mutators require the entity lock, which is enforced structurally: a
//! `&mut Reference` is only reachable through the scoped-access wrapper the
//! factory hands out. Every mutator returns a [`Lockable`] token so chained
//! mutations can verify they still run under the same hold.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::id::{self, BaseId, NetworkId, ReferenceId};
use crate::lock::Lockable;
use crate::packet::Packet;
use crate::param::RawParameter;
use crate::value::Value;

/// Atomically tracked identifier state, shared between the entity and its
/// registry slot so the factory can answer coarse queries without the lock.
#[derive(Debug)]
pub(crate) struct RefState {
    ref_id: AtomicU32,
    base_id: AtomicU32,
    changed: AtomicBool,
}

impl RefState {
    pub(crate) fn new(ref_id: ReferenceId, base_id: BaseId) -> Self {
        Self {
            ref_id: AtomicU32::new(ref_id),
            base_id: AtomicU32::new(base_id),
            changed: AtomicBool::new(false),
        }
    }

    pub(crate) fn reference(&self) -> ReferenceId {
        self.ref_id.load(Ordering::SeqCst)
    }

    pub(crate) fn base(&self) -> BaseId {
        self.base_id.load(Ordering::SeqCst)
    }

    pub(crate) fn changed(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }
}

/// The base class for all in-game entity kinds
///
/// Data specific to a reference are a reference id, a base id and a network
/// id. Created exclusively by the factory, mutated only by holders of a
/// scoped-access handle, destroyed exclusively by the factory.
#[derive(Debug)]
pub struct Reference {
    network_id: NetworkId,
    state: Arc<RefState>,
}

impl Reference {
    pub(crate) fn from_parts(network_id: NetworkId, state: Arc<RefState>) -> Self {
        Self { network_id, state }
    }

    /// The process-wide-unique transport identifier; immutable, never reused
    pub fn network_id(&self) -> NetworkId {
        self.network_id
    }

    /// Retrieves the reference id; lock-free
    pub fn get_reference(&self) -> ReferenceId {
        self.state.reference()
    }

    /// Retrieves the base id; lock-free
    pub fn get_base(&self) -> BaseId {
        self.state.base()
    }

    /// Retrieves the changed state; lock-free
    pub fn get_changed(&self) -> bool {
        self.state.changed()
    }

    /// Determines if the reference id is persistent
    pub fn is_persistent(&self) -> bool {
        id::is_persistent(self.get_reference())
    }

    /// Sets the reference id and marks the entity changed.
    ///
    /// Identifier reuse policy is the factory's responsibility; this only
    /// stores the value. Use [`Factory::remap_reference`] to change the id
    /// an entity is registered under.
    ///
    /// [`Factory::remap_reference`]: crate::factory::Factory::remap_reference
    pub fn set_reference(&mut self, ref_id: ReferenceId) -> Lockable {
        self.state.ref_id.store(ref_id, Ordering::SeqCst);
        self.set_changed(true)
    }

    /// Sets the base id and marks the entity changed.
    ///
    /// On an authoritative host, re-basing through
    /// [`Factory::rebase`](crate::factory::Factory::rebase) additionally
    /// runs the entity kind's [`Entity::on_rebase`] hook.
    pub fn set_base(&mut self, base_id: BaseId) -> Lockable {
        self.state.base_id.store(base_id, Ordering::SeqCst);
        self.set_changed(true)
    }

    /// Sets the changed state; the replication pass clears it after a
    /// successful flush, mutators set it.
    pub fn set_changed(&mut self, changed: bool) -> Lockable {
        self.state.changed.store(changed, Ordering::SeqCst);
        self.hold_token()
    }

    /// Writes an attribute cell of the owning entity kind and marks the
    /// entity changed, as one observable step under the current hold.
    pub fn set_attribute<T>(&mut self, dest: &mut Value<T>, value: T) -> Lockable {
        dest.set(value);
        self.set_changed(true)
    }

    /// The token identifying the hold under which this call chain mutates
    pub fn hold_token(&self) -> Lockable {
        Lockable::new(self.network_id)
    }

    /// Verifies a chained mutation still runs under this entity's hold.
    ///
    /// # Panics
    ///
    /// Panics if the token was minted by a different entity; accepting a
    /// cross-entity lock handle is a programming error, never silently
    /// tolerated.
    pub fn assert_same_hold(&self, token: Lockable) {
        if token != self.hold_token() {
            panic!(
                "lock handle for entity {:#x} used on entity {:#x}",
                token.network_id(),
                self.network_id
            );
        }
    }

    /// Returns a constant parameter carrying the reference id, for passing
    /// to the external native-call bridge
    pub fn get_reference_param(&self) -> RawParameter {
        RawParameter::from(self.get_reference())
    }

    /// Returns a constant parameter carrying the base id, for passing to
    /// the external native-call bridge
    pub fn get_base_param(&self) -> RawParameter {
        RawParameter::from(self.get_base())
    }
}

/// The polymorphic contract every concrete entity kind implements.
///
/// Dispatch is an interface table rather than inheritance depth: new entity
/// kinds are added without touching the base type. Every kind serializes its
/// own attribute set; the base type has no knowledge of subtype fields.
pub trait Entity: Any + Send {
    /// The embedded base reference
    fn base(&self) -> &Reference;

    /// The embedded base reference, mutable
    fn base_mut(&mut self) -> &mut Reference;

    /// Serialize this entity's attribute set for network transfer
    fn to_packet(&self) -> Packet;

    /// Re-initialization hook run after a re-base, on authoritative hosts
    /// only. The default does nothing.
    fn on_rebase(&mut self, _old_base: BaseId) {}

    /// Upcast for concrete-kind downcasting
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for concrete-kind downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Downcast seam used by the scoped-access wrapper to present a stored
/// entity as a concrete kind, or as the bare [`Reference`] base.
pub trait EntityCast: 'static {
    /// Borrow `entity` as `Self`, if it is of that kind
    fn cast(entity: &dyn Entity) -> Option<&Self>;

    /// Mutably borrow `entity` as `Self`, if it is of that kind
    fn cast_mut(entity: &mut dyn Entity) -> Option<&mut Self>;
}

// Every entity kind exposes its base, so this cast never fails.
impl EntityCast for Reference {
    fn cast(entity: &dyn Entity) -> Option<&Self> {
        Some(entity.base())
    }

    fn cast_mut(entity: &mut dyn Entity) -> Option<&mut Self> {
        Some(entity.base_mut())
    }
}
