//! # Factory
//!
//! The factory owns the canonical identifier-to-entity mapping and is the
//! only component allowed to create or destroy entities. Callers never own
//! an entity directly; they hold a [`FactoryObject`], a scoped handle that
//! proves exclusive hold of the entity's lock and releases it exactly once
//! when dropped.
//!
//! Lock ordering is strict: the registry table lock is always released
//! before blocking on an entity lock, and no operation ever holds two entity
//! locks at once. Bulk scans acquire each candidate entity individually and
//! briefly instead of serializing unrelated entities behind a global lock.
//!
//! A factory is an explicit, constructible object with a documented
//! lifecycle; tests build isolated factories instead of sharing a static.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use log::{debug, info, warn};
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};

use crate::error::FactoryError;
use crate::id::{
    next_network_id, BaseId, NetworkId, ReferenceId, NULL_REFERENCE, TRANSIENT_REFERENCE_BASE,
};
use crate::lifecycle::{Authority, SlotState};
use crate::lock::Lockable;
use crate::reference::{Entity, EntityCast, RefState, Reference};
use crate::tasks::{Task, TaskQueue};

/// Kind mask matching every entity kind
pub const KIND_ALL: u32 = !0;

type EntityBox = Box<dyn Entity>;
type EntityGuard = ArcMutexGuard<RawMutex, EntityBox>;

/// One registered entity: its lock, its lock-free identifier mirror, and
/// the bookkeeping the factory needs to destroy it safely.
struct Slot {
    network_id: NetworkId,
    kind_flags: u32,
    state: Arc<RefState>,
    body: Arc<Mutex<EntityBox>>,
    /// Thread currently holding the entity lock; re-entrant acquisition
    /// from that thread fails fast instead of deadlocking.
    holder: Mutex<Option<ThreadId>>,
    /// Live scoped handles for this slot
    handles: AtomicUsize,
    lifecycle: Mutex<SlotState>,
    /// Deferred task queue; only present on non-authoritative hosts
    tasks: Option<TaskQueue>,
}

#[derive(Default)]
struct Tables {
    by_reference: HashMap<ReferenceId, Arc<Slot>>,
    by_network: HashMap<NetworkId, ReferenceId>,
}

/// The registry of reference entities for one host
pub struct Factory {
    authority: Authority,
    tables: RwLock<Tables>,
    next_transient: AtomicU32,
}

impl Factory {
    /// Create an empty factory serving the given host authority
    pub fn new(authority: Authority) -> Self {
        info!("initializing reference factory ({:?})", authority);
        Self {
            authority,
            tables: RwLock::new(Tables::default()),
            next_transient: AtomicU32::new(TRANSIENT_REFERENCE_BASE),
        }
    }

    /// The host authority this factory serves
    pub fn authority(&self) -> Authority {
        self.authority
    }

    /// Create an entity under a freshly allocated transient reference id.
    ///
    /// `build` is the external constructor seam: it receives the base
    /// [`Reference`] (identifiers assigned, changed flag clear) and embeds
    /// it in whatever concrete kind the caller's catalog maps `base_id` to.
    /// `kind_flags` is the kind mask bulk scans coarse-filter on.
    pub fn create<F>(&self, base_id: BaseId, kind_flags: u32, build: F) -> ReferenceId
    where
        F: FnOnce(Reference) -> EntityBox,
    {
        let ref_id = self.next_transient.fetch_add(1, Ordering::SeqCst);
        self.install(ref_id, base_id, kind_flags, build)
            .expect("transient reference ids are never reused");
        ref_id
    }

    /// Register an entity under a known persistent reference id.
    ///
    /// Fails on the reserved null id and on ids already registered; exactly
    /// one entity exists per reference id at any time.
    pub fn insert<F>(
        &self,
        ref_id: ReferenceId,
        base_id: BaseId,
        kind_flags: u32,
        build: F,
    ) -> Result<ReferenceId, FactoryError>
    where
        F: FnOnce(Reference) -> EntityBox,
    {
        if ref_id == NULL_REFERENCE {
            return Err(FactoryError::NullReference);
        }
        self.install(ref_id, base_id, kind_flags, build)?;
        Ok(ref_id)
    }

    fn install<F>(
        &self,
        ref_id: ReferenceId,
        base_id: BaseId,
        kind_flags: u32,
        build: F,
    ) -> Result<(), FactoryError>
    where
        F: FnOnce(Reference) -> EntityBox,
    {
        let state = Arc::new(RefState::new(ref_id, base_id));
        let network_id = next_network_id();

        // Entity construction happens outside the table lock.
        let entity = build(Reference::from_parts(network_id, Arc::clone(&state)));
        let slot = Arc::new(Slot {
            network_id,
            kind_flags,
            state,
            body: Arc::new(Mutex::new(entity)),
            holder: Mutex::new(None),
            handles: AtomicUsize::new(0),
            lifecycle: Mutex::new(SlotState::Active),
            tasks: match self.authority {
                Authority::Remote => Some(TaskQueue::new()),
                Authority::Authoritative => None,
            },
        });

        let mut tables = self.tables.write();
        if tables.by_reference.contains_key(&ref_id) {
            return Err(FactoryError::DuplicateReference(ref_id));
        }
        tables.by_network.insert(network_id, ref_id);
        tables.by_reference.insert(ref_id, slot);
        drop(tables);

        debug!(
            "created reference {:#010x} (base {:#010x}, network id {:#x})",
            ref_id, base_id, network_id
        );
        Ok(())
    }

    fn slot(&self, ref_id: ReferenceId) -> Option<Arc<Slot>> {
        self.tables.read().by_reference.get(&ref_id).cloned()
    }

    /// Acquire the entity's lock and return a scoped handle on its base.
    ///
    /// Blocks until the current holder releases. A missing id is an absent
    /// result; the caller decides whether that is expected.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds this entity's lock;
    /// re-entrant acquisition from the same call chain is a logic error,
    /// not a condition to block on.
    pub fn acquire(&self, ref_id: ReferenceId) -> Option<FactoryObject<Reference>> {
        let slot = self.slot(ref_id)?;
        let guard = lock_slot(&slot);
        Some(FactoryObject::new(slot, guard))
    }

    /// Acquire the entity's lock and return a scoped handle on the concrete
    /// kind `T`, releasing immediately if the entity is of another kind.
    pub fn acquire_as<T: EntityCast>(
        &self,
        ref_id: ReferenceId,
    ) -> Result<FactoryObject<T>, FactoryError> {
        let slot = self.slot(ref_id).ok_or(FactoryError::NotFound(ref_id))?;
        let guard = lock_slot(&slot);
        if T::cast(&**guard).is_none() {
            // Release bookkeeping before the guard unlocks the body.
            clear_holder(&slot);
            drop(guard);
            return Err(FactoryError::KindMismatch(ref_id));
        }
        Ok(FactoryObject::new(slot, guard))
    }

    /// Unregister an entity.
    ///
    /// If scoped handles are outstanding the underlying storage survives,
    /// still validly dereferenceable, until the last handle is released;
    /// the slot reports [`SlotState::PendingDestroy`] in the interim. The
    /// network id is never reused either way. Returns whether the id was
    /// registered.
    pub fn destroy(&self, ref_id: ReferenceId) -> bool {
        let slot = {
            let mut tables = self.tables.write();
            let Some(slot) = tables.by_reference.remove(&ref_id) else {
                return false;
            };
            tables.by_network.remove(&slot.network_id);
            slot
        };

        let mut lifecycle = slot.lifecycle.lock();
        if slot.handles.load(Ordering::SeqCst) > 0 {
            *lifecycle = SlotState::PendingDestroy;
            debug!(
                "destroy of reference {:#010x} deferred until outstanding handles release",
                ref_id
            );
        } else {
            *lifecycle = SlotState::Destroyed;
            debug!("destroyed reference {:#010x}", ref_id);
        }
        true
    }

    /// Re-key an entity from `old` to `new`, e.g. when a temporary id is
    /// replaced by the authoritative one. Stores the new id through
    /// [`Reference::set_reference`] under the entity's lock.
    ///
    /// The calling thread must not already hold the entity's lock.
    pub fn remap_reference(
        &self,
        old: ReferenceId,
        new: ReferenceId,
    ) -> Result<(), FactoryError> {
        if new == NULL_REFERENCE {
            return Err(FactoryError::NullReference);
        }

        let slot = {
            let mut tables = self.tables.write();
            if tables.by_reference.contains_key(&new) {
                return Err(FactoryError::DuplicateReference(new));
            }
            let Some(slot) = tables.by_reference.remove(&old) else {
                return Err(FactoryError::NotFound(old));
            };
            tables.by_network.insert(slot.network_id, new);
            tables.by_reference.insert(new, Arc::clone(&slot));
            slot
        };

        // The table is re-keyed before the entity observes the new id;
        // lock-free readers must re-validate under the lock as usual.
        let guard = lock_slot(&slot);
        let mut entity: FactoryObject<Reference> = FactoryObject::new(slot, guard);
        entity.set_reference(new);
        drop(entity);

        debug!("remapped reference {:#010x} to {:#010x}", old, new);
        Ok(())
    }

    /// Store a new base id and, on the authoritative host, run the entity
    /// kind's re-initialization hook. Returns the previous base id.
    pub fn rebase(&self, ref_id: ReferenceId, base_id: BaseId) -> Result<BaseId, FactoryError> {
        let mut entity = self
            .acquire(ref_id)
            .ok_or(FactoryError::NotFound(ref_id))?;
        let old = entity.get_base();
        entity.set_base(base_id);
        if self.authority == Authority::Authoritative {
            entity.entity_mut().on_rebase(old);
        }
        Ok(old)
    }

    /// Append a deferred task for the entity without touching its main
    /// lock. Returns false if the id is unknown or this host is
    /// authoritative (no queues exist there).
    pub fn enqueue(&self, ref_id: ReferenceId, task: Task) -> bool {
        let Some(slot) = self.slot(ref_id) else {
            return false;
        };
        match &slot.tasks {
            Some(queue) => {
                queue.enqueue(task);
                true
            }
            None => {
                warn!(
                    "task for reference {:#010x} dropped: authoritative hosts carry no queues",
                    ref_id
                );
                false
            }
        }
    }

    /// Visit every entity matching the functor, acquiring each entity's
    /// lock individually and briefly. Kind flags and the exclusion id are
    /// checked lock-free before acquiring; `filter` runs under the lock.
    pub fn for_each<A>(&self, functor: &dyn ReferenceFunctor, mut action: A)
    where
        A: FnMut(&mut FactoryObject<Reference>),
    {
        let candidates: Vec<Arc<Slot>> = {
            let tables = self.tables.read();
            tables
                .by_reference
                .values()
                .filter(|slot| slot.kind_flags & functor.flags() != 0)
                .filter(|slot| slot.network_id != functor.exclude())
                .cloned()
                .collect()
        };

        for slot in candidates {
            // The slot may have been unregistered since the snapshot.
            if *slot.lifecycle.lock() != SlotState::Active {
                continue;
            }
            let guard = lock_slot(&slot);
            let mut entity = FactoryObject::new(slot, guard);
            if functor.filter(&entity) {
                action(&mut entity);
            }
        }
    }

    /// Snapshot of the currently registered reference ids
    pub fn reference_ids(&self) -> Vec<ReferenceId> {
        self.tables.read().by_reference.keys().copied().collect()
    }

    /// Number of registered entities
    pub fn len(&self) -> usize {
        self.tables.read().by_reference.len()
    }

    /// Whether no entities are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock-free read of an entity's base id, for coarse filtering
    pub fn base_of(&self, ref_id: ReferenceId) -> Option<BaseId> {
        self.slot(ref_id).map(|slot| slot.state.base())
    }

    /// Lock-free read of an entity's changed flag, for coarse filtering
    pub fn is_changed(&self, ref_id: ReferenceId) -> Option<bool> {
        self.slot(ref_id).map(|slot| slot.state.changed())
    }

    /// Route a network id to the local reference id it is registered under
    pub fn reference_of(&self, network_id: NetworkId) -> Option<ReferenceId> {
        self.tables.read().by_network.get(&network_id).copied()
    }

    /// Live scoped handles for an entity; 0 for unknown ids
    pub fn outstanding(&self, ref_id: ReferenceId) -> usize {
        self.slot(ref_id)
            .map(|slot| slot.handles.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

impl Drop for Factory {
    fn drop(&mut self) {
        let remaining = self.len();
        if remaining > 0 {
            debug!("factory dropped with {} references still registered", remaining);
        }
    }
}

/// Block until the slot's entity lock is held by the calling thread.
///
/// Panics on re-entrant acquisition from the thread already holding it.
fn lock_slot(slot: &Arc<Slot>) -> EntityGuard {
    let current = thread::current().id();
    if *slot.holder.lock() == Some(current) {
        panic!(
            "re-entrant acquisition of reference {:#010x}",
            slot.state.reference()
        );
    }
    let guard = slot.body.lock_arc();
    *slot.holder.lock() = Some(current);
    slot.handles.fetch_add(1, Ordering::SeqCst);
    guard
}

/// Release-side bookkeeping shared by [`FactoryObject::drop`] and the
/// internal paths that hold a bare guard.
fn clear_holder(slot: &Arc<Slot>) {
    let mut lifecycle = slot.lifecycle.lock();
    let left = slot.handles.fetch_sub(1, Ordering::SeqCst) - 1;
    if left == 0 && *lifecycle == SlotState::PendingDestroy {
        *lifecycle = SlotState::Destroyed;
        debug!(
            "reference {:#010x} reclaimed after last handle released",
            slot.state.reference()
        );
    }
    drop(lifecycle);
    *slot.holder.lock() = None;
}

/// A scoped-access handle: non-owning proof of exclusive hold on one
/// entity's lock, granted only by the factory.
///
/// The lock is released exactly once, when the handle is dropped, on every
/// exit path. The handle cannot be cloned; moving it transfers the release
/// obligation. Dereferencing stays valid even if the factory unregisters
/// the entity while the handle is alive; the storage is reclaimed after the
/// last handle releases.
pub struct FactoryObject<T: EntityCast> {
    slot: Arc<Slot>,
    guard: EntityGuard,
    _kind: PhantomData<fn() -> T>,
}

impl<T: EntityCast> FactoryObject<T> {
    fn new(slot: Arc<Slot>, guard: EntityGuard) -> Self {
        Self {
            slot,
            guard,
            _kind: PhantomData,
        }
    }

    /// The network id of the held entity
    pub fn network_id(&self) -> NetworkId {
        self.slot.network_id
    }

    /// The token naming the hold this handle currently proves
    pub fn token(&self) -> Lockable {
        self.guard.base().hold_token()
    }

    /// The held entity's base
    pub fn base(&self) -> &Reference {
        self.guard.base()
    }

    /// The held entity's base, mutable
    pub fn base_mut(&mut self) -> &mut Reference {
        self.guard.base_mut()
    }

    /// The held entity behind its polymorphic interface
    pub fn entity(&self) -> &dyn Entity {
        &**self.guard
    }

    /// The held entity behind its polymorphic interface, mutable
    pub fn entity_mut(&mut self) -> &mut dyn Entity {
        &mut **self.guard
    }

    /// Registry lifecycle state of the held entity's slot
    pub fn state(&self) -> SlotState {
        *self.slot.lifecycle.lock()
    }

    /// Append a deferred task for this entity; see [`Factory::enqueue`]
    pub fn enqueue(&self, task: Task) -> bool {
        match &self.slot.tasks {
            Some(queue) => {
                queue.enqueue(task);
                true
            }
            None => false,
        }
    }

    /// Run this entity's pending deferred tasks in enqueue order; the
    /// caller holds the entity, which makes it the owning thread for the
    /// duration. Tasks enqueued while draining run on the next drain. A
    /// task that re-acquires this same entity is a logic error and panics.
    pub fn drain(&self) -> usize {
        match &self.slot.tasks {
            Some(queue) => queue.drain(),
            None => 0,
        }
    }
}

impl<T: EntityCast> Deref for FactoryObject<T> {
    type Target = T;

    fn deref(&self) -> &T {
        T::cast(&**self.guard).expect("entity kind verified at acquisition")
    }
}

impl<T: EntityCast> DerefMut for FactoryObject<T> {
    fn deref_mut(&mut self) -> &mut T {
        T::cast_mut(&mut **self.guard).expect("entity kind verified at acquisition")
    }
}

impl<T: EntityCast> Drop for FactoryObject<T> {
    fn drop(&mut self) {
        // Bookkeeping first, while the body lock is still held; the guard
        // field releases the lock afterwards.
        clear_holder(&self.slot);
    }
}

/// Polymorphic filter used by [`Factory::for_each`] to select entities for
/// bulk operations such as broadcasts.
pub trait ReferenceFunctor {
    /// Kind mask checked lock-free before an entity is acquired
    fn flags(&self) -> u32 {
        KIND_ALL
    }

    /// Network id to skip, e.g. the originator of a broadcast; 0 skips
    /// nothing
    fn exclude(&self) -> NetworkId {
        0
    }

    /// Fine filter, evaluated while the entity's lock is held
    fn filter(&self, entity: &FactoryObject<Reference>) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Object, KIND_OBJECT};

    fn object_factory(authority: Authority) -> Factory {
        Factory::new(authority)
    }

    fn spawn(factory: &Factory, base_id: BaseId) -> ReferenceId {
        factory.create(base_id, KIND_OBJECT, |reference| {
            Box::new(Object::new(reference))
        })
    }

    #[test]
    fn create_acquire_mutate_destroy() {
        let factory = object_factory(Authority::Authoritative);
        let id = spawn(&factory, 42);

        {
            let mut entity = factory.acquire(id).unwrap();
            assert_eq!(entity.get_base(), 42);
            entity.set_base(99);
            assert_eq!(entity.get_base(), 99);
            assert!(entity.get_changed());
        }

        assert!(factory.destroy(id));
        assert!(factory.acquire(id).is_none());
    }

    #[test]
    fn transient_ids_are_unique_and_in_range() {
        let factory = object_factory(Authority::Authoritative);
        let first = spawn(&factory, 1);
        let second = spawn(&factory, 1);
        assert_ne!(first, second);
        assert!(first >= TRANSIENT_REFERENCE_BASE);
        assert_ne!(first, NULL_REFERENCE);
    }

    #[test]
    fn insert_rejects_null_and_duplicate_ids() {
        let factory = object_factory(Authority::Authoritative);
        let build = |reference: Reference| Box::new(Object::new(reference)) as EntityBox;

        assert_eq!(
            factory.insert(NULL_REFERENCE, 1, KIND_OBJECT, build),
            Err(FactoryError::NullReference)
        );

        assert_eq!(factory.insert(0x1234, 1, KIND_OBJECT, build), Ok(0x1234));
        assert_eq!(
            factory.insert(0x1234, 2, KIND_OBJECT, build),
            Err(FactoryError::DuplicateReference(0x1234))
        );
    }

    #[test]
    fn lookup_miss_is_an_absent_result() {
        let factory = object_factory(Authority::Authoritative);
        assert!(factory.acquire(0xDEAD).is_none());
        assert_eq!(
            factory.acquire_as::<Object>(0xDEAD).err(),
            Some(FactoryError::NotFound(0xDEAD))
        );
        assert_eq!(factory.base_of(0xDEAD), None);
    }

    #[test]
    fn acquire_as_concrete_kind() {
        let factory = object_factory(Authority::Authoritative);
        let id = spawn(&factory, 7);

        let mut object = factory.acquire_as::<Object>(id).unwrap();
        let token = object.set_position([1.0, 2.0, 3.0]);
        assert_eq!(token, object.token());
        assert!(object.get_changed());
    }

    #[test]
    fn lock_free_queries_without_acquiring() {
        let factory = object_factory(Authority::Authoritative);
        let id = spawn(&factory, 42);

        assert_eq!(factory.base_of(id), Some(42));
        assert_eq!(factory.is_changed(id), Some(false));

        let network_id = {
            let mut entity = factory.acquire(id).unwrap();
            entity.set_base(43);
            entity.network_id()
        };

        assert_eq!(factory.base_of(id), Some(43));
        assert_eq!(factory.is_changed(id), Some(true));
        assert_eq!(factory.reference_of(network_id), Some(id));
    }

    #[test]
    fn destroy_with_live_handle_defers_reclamation() {
        let factory = object_factory(Authority::Authoritative);
        let id = spawn(&factory, 42);

        let entity = factory.acquire(id).unwrap();
        assert_eq!(factory.outstanding(id), 1);

        assert!(factory.destroy(id));
        // Unregistered, but the handle still dereferences validly.
        assert!(factory.acquire(id).is_none());
        assert_eq!(entity.get_base(), 42);
        assert_eq!(entity.state(), SlotState::PendingDestroy);

        drop(entity);
    }

    #[test]
    #[should_panic(expected = "re-entrant acquisition")]
    fn reentrant_acquisition_fails_fast() {
        let factory = object_factory(Authority::Authoritative);
        let id = spawn(&factory, 1);

        let _held = factory.acquire(id).unwrap();
        let _second = factory.acquire(id);
    }

    #[test]
    fn remap_reference_rekeys_and_marks_changed() {
        let factory = object_factory(Authority::Remote);
        let temp = spawn(&factory, 5);

        factory.remap_reference(temp, 0x00BEEF).unwrap();
        assert!(factory.acquire(temp).is_none());

        let entity = factory.acquire(0x00BEEF).unwrap();
        assert_eq!(entity.get_reference(), 0x00BEEF);
        assert!(entity.get_changed());
        drop(entity);

        assert_eq!(
            factory.remap_reference(0x00BEEF, NULL_REFERENCE),
            Err(FactoryError::NullReference)
        );
        assert_eq!(
            factory.remap_reference(0xAAAA, 0xBBBB),
            Err(FactoryError::NotFound(0xAAAA))
        );
    }

    #[test]
    fn rebase_runs_hook_only_on_authoritative_host() {
        let server = object_factory(Authority::Authoritative);
        let id = spawn(&server, 10);
        {
            let mut object = server.acquire_as::<Object>(id).unwrap();
            object.set_position([4.0, 5.0, 6.0]);
        }
        assert_eq!(server.rebase(id, 20), Ok(10));
        {
            let object = server.acquire_as::<Object>(id).unwrap();
            // The hook re-initialized the attributes.
            assert_eq!(object.position(), [0.0, 0.0, 0.0]);
            assert_eq!(object.get_base(), 20);
        }

        let client = object_factory(Authority::Remote);
        let id = spawn(&client, 10);
        {
            let mut object = client.acquire_as::<Object>(id).unwrap();
            object.set_position([4.0, 5.0, 6.0]);
        }
        assert_eq!(client.rebase(id, 20), Ok(10));
        let object = client.acquire_as::<Object>(id).unwrap();
        assert_eq!(object.position(), [4.0, 5.0, 6.0]);
    }

    #[test]
    fn enqueue_only_exists_on_remote_hosts() {
        let server = object_factory(Authority::Authoritative);
        let id = spawn(&server, 1);
        assert!(!server.enqueue(id, Box::new(|| {})));

        let client = object_factory(Authority::Remote);
        let id = spawn(&client, 1);
        assert!(client.enqueue(id, Box::new(|| {})));
        let entity = client.acquire(id).unwrap();
        assert_eq!(entity.drain(), 1);
    }

    struct Marker {
        reference: Reference,
    }

    impl Entity for Marker {
        fn base(&self) -> &Reference {
            &self.reference
        }

        fn base_mut(&mut self) -> &mut Reference {
            &mut self.reference
        }

        fn to_packet(&self) -> crate::packet::Packet {
            crate::packet::Packet::new(self.reference.network_id(), Vec::new())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    impl EntityCast for Marker {
        fn cast(entity: &dyn Entity) -> Option<&Self> {
            entity.as_any().downcast_ref()
        }

        fn cast_mut(entity: &mut dyn Entity) -> Option<&mut Self> {
            entity.as_any_mut().downcast_mut()
        }
    }

    #[test]
    fn acquire_as_rejects_wrong_kind_and_releases() {
        let factory = object_factory(Authority::Authoritative);
        let id = factory.create(1, KIND_ALL, |reference| Box::new(Marker { reference }));

        assert_eq!(
            factory.acquire_as::<Object>(id).err(),
            Some(FactoryError::KindMismatch(id))
        );

        // The failed downcast released the lock; acquisition still works.
        assert_eq!(factory.outstanding(id), 0);
        let marker = factory.acquire_as::<Marker>(id).unwrap();
        assert_eq!(marker.base().get_base(), 1);
    }

    struct ChangedFunctor {
        skip: NetworkId,
    }

    impl ReferenceFunctor for ChangedFunctor {
        fn exclude(&self) -> NetworkId {
            self.skip
        }

        fn filter(&self, entity: &FactoryObject<Reference>) -> bool {
            entity.get_changed()
        }
    }

    #[test]
    fn for_each_filters_and_excludes() {
        let factory = object_factory(Authority::Authoritative);
        let dirty = spawn(&factory, 1);
        let clean = spawn(&factory, 2);
        let skipped = spawn(&factory, 3);

        let skip_network_id = factory.acquire(skipped).unwrap().network_id();
        factory.acquire(dirty).unwrap().set_base(11);
        factory.acquire(skipped).unwrap().set_base(33);

        let mut visited = Vec::new();
        factory.for_each(
            &ChangedFunctor {
                skip: skip_network_id,
            },
            |entity| visited.push(entity.get_reference()),
        );

        assert_eq!(visited, vec![dirty]);
        assert!(!visited.contains(&clean));
    }
}
