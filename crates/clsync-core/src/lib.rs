//! clsync Core - Domain logic and ports
//!
//! This crate contains the engine-independent building blocks:
//! - Domain newtypes (`RelPath`, `ContentHash`) with validation
//! - Port definitions (blob store, progress stream)
//! - Engine and store configuration
//! - An in-memory blob store for tests and embedders

pub mod config;
pub mod domain;
pub mod memory;
pub mod ports;
