//! # Object Entity Kind
//!
//! The world-object kind both hosts instantiate: a reference with spatial
//! attributes. It demonstrates the contract every concrete kind follows:
//! embed the [`Reference`] base, keep all mutable state in [`Value`] cells
//! written through [`Reference::set_attribute`], serialize the full
//! attribute set in [`Entity::to_packet`], and re-initialize in
//! [`Entity::on_rebase`] when the authoritative host swaps the template.
//!
//! The catalog mapping base ids to entity kinds lives outside this crate;
//! nothing here is special-cased by the factory.

use std::any::Any;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::lock::Lockable;
use crate::packet::Packet;
use crate::reference::{Entity, EntityCast, Reference};
use crate::value::Value;

/// Kind flag for world objects, used by bulk-scan coarse filtering
pub const KIND_OBJECT: u32 = 0x1;

/// A positioned in-world entity
pub struct Object {
    reference: Reference,
    position: Value<[f64; 3]>,
    angle: Value<[f64; 3]>,
    cell: Value<u32>,
    name: Value<String>,
}

/// Wire layout of an object's attribute set
#[derive(Debug, Serialize, Deserialize)]
struct ObjectPayload {
    reference_id: u32,
    base_id: u32,
    position: [f64; 3],
    angle: [f64; 3],
    cell: u32,
    name: String,
}

impl Object {
    /// Wrap a factory-assigned base reference in a fresh object
    pub fn new(reference: Reference) -> Self {
        Self {
            reference,
            position: Value::new([0.0; 3]),
            angle: Value::new([0.0; 3]),
            cell: Value::new(0),
            name: Value::new(String::new()),
        }
    }

    /// Current world position
    pub fn position(&self) -> [f64; 3] {
        self.position.copied()
    }

    /// Current orientation angles
    pub fn angle(&self) -> [f64; 3] {
        self.angle.copied()
    }

    /// Current world cell
    pub fn cell(&self) -> u32 {
        self.cell.copied()
    }

    /// Current display name
    pub fn name(&self) -> &str {
        self.name.get()
    }

    /// Move the object; marks the entity changed as one observable step
    pub fn set_position(&mut self, position: [f64; 3]) -> Lockable {
        self.reference.set_attribute(&mut self.position, position)
    }

    /// Rotate the object
    pub fn set_angle(&mut self, angle: [f64; 3]) -> Lockable {
        self.reference.set_attribute(&mut self.angle, angle)
    }

    /// Place the object into a world cell
    pub fn set_cell(&mut self, cell: u32) -> Lockable {
        self.reference.set_attribute(&mut self.cell, cell)
    }

    /// Rename the object
    pub fn set_name(&mut self, name: String) -> Lockable {
        self.reference.set_attribute(&mut self.name, name)
    }

    /// Move and re-cell in one chained mutation under a single hold; the
    /// token minted by the first step must belong to this entity.
    pub fn warp(&mut self, position: [f64; 3], cell: u32) -> Lockable {
        let token = self.set_position(position);
        self.reference.assert_same_hold(token);
        self.set_cell(cell)
    }
}

impl Entity for Object {
    fn base(&self) -> &Reference {
        &self.reference
    }

    fn base_mut(&mut self) -> &mut Reference {
        &mut self.reference
    }

    fn to_packet(&self) -> Packet {
        let payload = ObjectPayload {
            reference_id: self.reference.get_reference(),
            base_id: self.reference.get_base(),
            position: self.position(),
            angle: self.angle(),
            cell: self.cell(),
            name: self.name().to_string(),
        };
        let bytes = serde_json::to_vec(&payload)
            .expect("object payload serializes to JSON");
        Packet::new(self.reference.network_id(), bytes)
    }

    fn on_rebase(&mut self, _old_base: u32) {
        // A new template invalidates the spatial state; start over.
        self.position.set([0.0; 3]);
        self.angle.set([0.0; 3]);
        self.cell.set(0);
        self.name.set(String::new());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl EntityCast for Object {
    fn cast(entity: &dyn Entity) -> Option<&Self> {
        entity.as_any().downcast_ref()
    }

    fn cast_mut(entity: &mut dyn Entity) -> Option<&mut Self> {
        entity.as_any_mut().downcast_mut()
    }
}

// An object is addressed through its base most of the time; expose it the
// way the scoped wrapper exposes the entity.
impl Deref for Object {
    type Target = Reference;

    fn deref(&self) -> &Reference {
        &self.reference
    }
}

impl DerefMut for Object {
    fn deref_mut(&mut self) -> &mut Reference {
        &mut self.reference
    }
}
