//! Domain layer: records, identifiers and the realtime vocabulary.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, state machines, errors)
//! - `entity` - Synchronized records and the `EntityRecord` seam
//! - `realtime` - Wire frames and payload views

pub mod entity;
pub mod foundation;
pub mod realtime;
