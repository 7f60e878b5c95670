/// In-memory inventory service
///
/// Implements `Inventory` for `&MemoryInventory` so a test can hand the
/// orchestrator a borrow and inspect the state once the run is over.
use bulkwipe::inventory::{Features, Inventory, InventoryError, InventoryItem};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// How often each operation was called
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calls {
    pub find: usize,
    pub get: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

#[derive(Default)]
struct State {
    items: BTreeMap<String, InventoryItem>,
    next_code: u32,
    calls: Calls,
}

#[derive(Default)]
pub struct MemoryInventory {
    state: Mutex<State>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-existing item
    pub fn with_item(self, code: &str, features: Features) -> Self {
        self.state.lock().unwrap().items.insert(
            code.to_string(),
            InventoryItem {
                code: code.to_string(),
                features,
                location: vec!["Warehouse".to_string()],
            },
        );
        self
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn item(&self, code: &str) -> Option<InventoryItem> {
        self.state.lock().unwrap().items.get(code).cloned()
    }

    pub fn codes(&self) -> Vec<String> {
        self.state.lock().unwrap().items.keys().cloned().collect()
    }
}

impl Inventory for &MemoryInventory {
    fn find_by_serial(&self, serial: &str) -> Result<Vec<String>, InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.find += 1;
        Ok(state
            .items
            .values()
            .filter(|item| item.features.get("sn") == Some(&Value::from(serial)))
            .map(|item| item.code.clone())
            .collect())
    }

    fn get_item(&self, code: &str) -> Result<InventoryItem, InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.get += 1;
        state
            .items
            .get(code)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(code.to_string()))
    }

    fn create_item(&self, features: &Features, location: &str) -> Result<String, InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.create += 1;
        state.next_code += 1;
        let code = format!("D{}", state.next_code);
        state.items.insert(
            code.clone(),
            InventoryItem {
                code: code.clone(),
                features: features.clone(),
                location: vec![location.to_string()],
            },
        );
        Ok(code)
    }

    fn update_features(&self, code: &str, features: &Features) -> Result<(), InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.update += 1;
        let item = state
            .items
            .get_mut(code)
            .ok_or_else(|| InventoryError::NotFound(code.to_string()))?;
        item.features
            .extend(features.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn delete_item(&self, code: &str) -> Result<(), InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.delete += 1;
        state
            .items
            .remove(code)
            .map(|_| ())
            .ok_or_else(|| InventoryError::NotFound(code.to_string()))
    }
}
