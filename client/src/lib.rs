//! # ClientModule
//!
//! The non-authoritative host layer. Network receive threads route incoming
//! state into entity mutations through scoped factory handles, and anything
//! that must touch engine-side presentation state is deferred onto the
//! owning thread through the per-entity task queues, drained by
//! [`Session::pump`] from the engine's run loop.

pub mod session;

pub use session::Session;
