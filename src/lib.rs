//! Visa Sync - realtime synchronization layer for the visa management platform
//!
//! Keeps client, task, commission and notification views consistent with
//! the server: a reconnecting realtime transport feeds a synchronization
//! controller per entity kind, which updates local state and invalidates a
//! TTL cache shared with REST reads.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
