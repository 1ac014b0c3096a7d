//! # ServerModule
//!
//! The authoritative host layer. The world owns the authoritative factory:
//! spawning, destruction, template re-basing with its re-initialization
//! hook, and broadcast scans. The replication module runs the flush pass
//! that turns dirty entities into transport packets and clears their
//! changed flags.

pub mod replication;
pub mod world;

pub use replication::flush_changed;
pub use world::World;
