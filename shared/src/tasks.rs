//! # Deferred Task Queue
//!
//! Worker and network threads must never directly mutate engine-side state
//! that is only safe to touch from the entity-owning thread. The task queue
//! is the sole crossing point: any thread appends a closure, the owning
//! thread drains and executes them in enqueue order.
//!
//! The queue carries its own lock, independent of the entity's main lock, so
//! a task can be enqueued even while another thread holds the entity for
//! mutation.

use std::collections::VecDeque;
use std::mem;

use parking_lot::Mutex;

/// A zero-argument unit of work executed on the entity-owning thread
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// FIFO queue of deferred tasks for one entity
#[derive(Default)]
pub struct TaskQueue {
    pending: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a task; callable from any thread
    pub fn enqueue(&self, task: Task) {
        self.pending.lock().push_back(task);
    }

    /// Number of tasks currently waiting
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether no tasks are waiting
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Execute every pending task in enqueue order, on the owning thread.
    ///
    /// The batch is detached from the queue before anything runs, so a task
    /// that enqueues further tasks schedules them for the *next* drain.
    /// Returns the number of tasks executed.
    pub fn drain(&self) -> usize {
        let batch = mem::take(&mut *self.pending.lock());
        let count = batch.len();
        for task in batch {
            task();
        }
        count
    }
}
