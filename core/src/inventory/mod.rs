// Inventory service access
//
// The `Inventory` trait is the call contract the reconciler relies on. The
// HTTP implementation lives in `client.rs`.

pub mod client;

pub use client::InventoryClient;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Feature name to feature value, as stored by the service
pub type Features = BTreeMap<String, serde_json::Value>;

/// A physical asset as the inventory service describes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub code: String,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub location: Vec<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InventoryError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("validation rejected (HTTP {status}): {message}")]
    Validation { status: u16, message: String },

    #[error("item {0} not found")]
    NotFound(String),

    #[error("unexpected response (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Protocol(String),
}

impl InventoryError {
    pub fn is_validation(&self) -> bool {
        matches!(self, InventoryError::Validation { .. })
    }
}

/// Operations consumed from the inventory service
#[cfg_attr(test, mockall::automock)]
pub trait Inventory {
    /// Codes of every item whose `sn` feature equals `serial`
    fn find_by_serial(&self, serial: &str) -> Result<Vec<String>, InventoryError>;

    fn get_item(&self, code: &str) -> Result<InventoryItem, InventoryError>;

    /// Create an item under `location`, returning its new code
    fn create_item(&self, features: &Features, location: &str) -> Result<String, InventoryError>;

    fn update_features(&self, code: &str, features: &Features) -> Result<(), InventoryError>;

    fn delete_item(&self, code: &str) -> Result<(), InventoryError>;
}
