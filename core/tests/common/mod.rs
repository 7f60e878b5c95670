//! Shared fixtures for the integration tests
//!
//! - memory_inventory: an inventory service kept in memory, with call counters
//! - fake_host: scripted mount table and disk list
//! - http_stub: a tiny HTTP server answering canned responses
#![allow(dead_code)]

pub mod fake_host;
pub mod http_stub;
pub mod memory_inventory;
