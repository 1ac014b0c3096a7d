//! Cross-thread properties of the factory and the per-entity lock
//! discipline: single-holder mutual exclusion, happens-after ordering of
//! mutations separated by release/acquire, destruction deferral while
//! handles are outstanding, and task queue ordering under contention.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use refnet_shared::object::KIND_OBJECT;
use refnet_shared::{Authority, Factory, Object, Reference, ReferenceId, SlotState};

fn spawn_object(factory: &Factory, base_id: u32) -> ReferenceId {
    factory.create(base_id, KIND_OBJECT, |reference| {
        Box::new(Object::new(reference))
    })
}

#[test]
fn one_holder_at_a_time_and_no_lost_updates() {
    let factory = Arc::new(Factory::new(Authority::Authoritative));
    let id = spawn_object(&factory, 1);
    let inside = Arc::new(AtomicUsize::new(0));

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let factory = Arc::clone(&factory);
            let inside = Arc::clone(&inside);
            thread::spawn(move || {
                for _ in 0..50 {
                    let mut object = factory.acquire_as::<Object>(id).unwrap();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0, "double grant");

                    // Read-modify-write through the held entity; any
                    // overlap between holders would lose increments.
                    let next = object.cell() + 1;
                    object.set_cell(next);

                    assert_eq!(inside.fetch_sub(1, Ordering::SeqCst), 1);
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    let object = factory.acquire_as::<Object>(id).unwrap();
    assert_eq!(object.cell(), 200);
}

#[test]
fn second_acquirer_observes_completed_mutations() {
    let factory = Arc::new(Factory::new(Authority::Authoritative));
    let id = spawn_object(&factory, 1);
    let barrier = Arc::new(Barrier::new(2));

    // Each thread writes a self-consistent snapshot and checks that
    // whatever it reads under the lock is never a torn mix of two
    // snapshots: mutations are linearized by the entity's lock.
    let threads: Vec<_> = (1..=2u32)
        .map(|snapshot| {
            let factory = Arc::clone(&factory);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..100 {
                    let mut object = factory.acquire_as::<Object>(id).unwrap();
                    let seen_cell = object.cell();
                    let seen_pos = object.position();
                    assert_eq!(seen_pos[0], seen_cell as f64, "torn snapshot");

                    let value = snapshot * 10;
                    object.set_position([value as f64, 0.0, 0.0]);
                    object.set_cell(value);
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }
}

#[test]
fn acquire_blocks_until_holder_releases() {
    let factory = Arc::new(Factory::new(Authority::Authoritative));
    let id = spawn_object(&factory, 1);
    let (holding_tx, holding_rx) = mpsc::channel();

    let holder = {
        let factory = Arc::clone(&factory);
        thread::spawn(move || {
            let mut object = factory.acquire_as::<Object>(id).unwrap();
            object.set_position([0.5, 0.0, 0.0]);
            holding_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(50));
            object.set_position([1.0, 2.0, 3.0]);
            object.set_cell(9);
        })
    };

    holding_rx.recv().unwrap();
    // Blocks here until the holder finished every mutation.
    let object = factory.acquire_as::<Object>(id).unwrap();
    assert_eq!(object.position(), [1.0, 2.0, 3.0]);
    assert_eq!(object.cell(), 9);

    holder.join().unwrap();
}

#[test]
fn destroy_defers_reclamation_until_handles_release() {
    let factory = Arc::new(Factory::new(Authority::Authoritative));
    let id = spawn_object(&factory, 42);
    let (held_tx, held_rx) = mpsc::channel();
    let (destroyed_tx, destroyed_rx) = mpsc::channel::<()>();

    let holder = {
        let factory = Arc::clone(&factory);
        thread::spawn(move || {
            let object = factory.acquire_as::<Object>(id).unwrap();
            held_tx.send(()).unwrap();
            destroyed_rx.recv().unwrap();

            // destroy() already returned on the other thread; the handle
            // still dereferences validly.
            assert_eq!(object.base().get_base(), 42);
            assert_eq!(object.state(), SlotState::PendingDestroy);
        })
    };

    held_rx.recv().unwrap();
    assert!(factory.destroy(id));
    assert!(factory.acquire(id).is_none());
    destroyed_tx.send(()).unwrap();
    holder.join().unwrap();

    assert_eq!(factory.outstanding(id), 0);
    assert!(factory.acquire(id).is_none());
}

#[test]
fn tasks_run_in_enqueue_order_across_threads() {
    let factory = Arc::new(Factory::new(Authority::Remote));
    let id = spawn_object(&factory, 1);
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    // Enqueue T1, T2, T3 from three different threads, sequenced so the
    // enqueue order is deterministic.
    let mut previous: Option<thread::JoinHandle<()>> = None;
    for n in 1..=3 {
        let factory = Arc::clone(&factory);
        let order = Arc::clone(&order);
        let wait_for = previous.take();
        previous = Some(thread::spawn(move || {
            if let Some(handle) = wait_for {
                handle.join().unwrap();
            }
            assert!(factory.enqueue(id, Box::new(move || order.lock().push(n))));
        }));
    }
    previous.unwrap().join().unwrap();

    let object = factory.acquire(id).unwrap();
    assert_eq!(object.drain(), 3);
    assert_eq!(*order.lock(), vec![1, 2, 3]);
}

#[test]
fn tasks_enqueue_while_entity_is_held_elsewhere() {
    let factory = Arc::new(Factory::new(Authority::Remote));
    let id = spawn_object(&factory, 1);
    let (held_tx, held_rx) = mpsc::channel();
    let (queued_tx, queued_rx) = mpsc::channel::<()>();

    let holder = {
        let factory = Arc::clone(&factory);
        thread::spawn(move || {
            let mut object = factory.acquire_as::<Object>(id).unwrap();
            held_tx.send(()).unwrap();
            // The enqueue below must complete while this hold is alive.
            queued_rx.recv().unwrap();
            object.set_cell(1);
        })
    };

    held_rx.recv().unwrap();
    let ran = Arc::new(AtomicUsize::new(0));
    let ran_clone = Arc::clone(&ran);
    assert!(factory.enqueue(
        id,
        Box::new(move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        })
    ));
    queued_tx.send(()).unwrap();
    holder.join().unwrap();

    let object = factory.acquire(id).unwrap();
    assert_eq!(object.drain(), 1);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn full_lifecycle_scenario() {
    let factory = Factory::new(Authority::Authoritative);
    let id = spawn_object(&factory, 42);

    {
        let mut entity: refnet_shared::FactoryObject<Reference> = factory.acquire(id).unwrap();
        entity.set_base(99);
        assert_eq!(entity.get_base(), 99);
        assert!(entity.get_changed());
    }

    assert!(factory.destroy(id));
    assert!(factory.acquire(id).is_none());
}
