//! # Attribute Cell
//!
//! The building block every mutable attribute of an entity uses: a single
//! value with an internal dirty flag. The cell carries no locking of its own;
//! locking stays at the entity granularity so that one mutation can update
//! several attributes as a single observable step without any lock-ordering
//! hazard. Callers reach a cell only through a scoped-access handle, which is
//! what guarantees the owning entity's lock is held.

/// A single-value holder with change tracking
#[derive(Debug, Clone, Default)]
pub struct Value<T> {
    value: T,
    dirty: bool,
}

impl<T> Value<T> {
    /// Create a new cell holding `value`, initially clean
    pub fn new(value: T) -> Self {
        Self {
            value,
            dirty: false,
        }
    }

    /// Get the current value
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replace the value and mark the cell dirty
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.dirty = true;
    }

    /// Whether the value has changed since the last [`Value::clear_dirty`]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, typically after a replication flush
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl<T: Copy> Value<T> {
    /// Get the current value by copy
    pub fn copied(&self) -> T {
        self.value
    }
}
