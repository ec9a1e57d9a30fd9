//! clipdeck-core - Directory-to-vMix list synchronization engine
//!
//! Watches local media folders, tracks operator selection state
//! (including multi-select pending batches), and drives named lists on a
//! vMix-style production engine over its HTTP control API.

pub mod config;
pub mod listing;
pub mod remote;
pub mod section;
pub mod selection;
pub mod services;
