use super::{Features, Inventory, InventoryError, InventoryItem};
use crate::config::InventorySettings;
use serde_json::json;
use std::time::Duration;

/// Blocking HTTP client for the inventory service's v2 API
pub struct InventoryClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl InventoryClient {
    /// Build a client and check that the service accepts our token
    pub fn connect(settings: &InventorySettings) -> Result<Self, InventoryError> {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build();

        let client = Self {
            agent,
            base_url: settings.url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        };

        client
            .request("GET", "/v2/session")
            .call()
            .map_err(|e| match map_error(e) {
                InventoryError::Connection(msg) => InventoryError::Connection(msg),
                other => InventoryError::Connection(other.to_string()),
            })?;

        tracing::debug!(url = %client.base_url, "Inventory session established");
        Ok(client)
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        self.agent
            .request(method, &format!("{}{}", self.base_url, path))
            .set("Authorization", &format!("Token {}", self.token))
            .set("Accept", "application/json")
    }
}

impl Inventory for InventoryClient {
    fn find_by_serial(&self, serial: &str) -> Result<Vec<String>, InventoryError> {
        let path = format!("/v2/features/sn/{}", path_segment(serial));
        match self.request("GET", &path).call() {
            Ok(response) => response
                .into_json::<Vec<String>>()
                .map_err(|e| InventoryError::Protocol(e.to_string())),
            Err(ureq::Error::Status(404, _)) => Ok(Vec::new()),
            Err(e) => Err(map_error(e)),
        }
    }

    fn get_item(&self, code: &str) -> Result<InventoryItem, InventoryError> {
        let path = format!("/v2/items/{}", path_segment(code));
        match self.request("GET", &path).call() {
            Ok(response) => response
                .into_json::<InventoryItem>()
                .map_err(|e| InventoryError::Protocol(e.to_string())),
            Err(ureq::Error::Status(404, _)) => Err(InventoryError::NotFound(code.to_string())),
            Err(e) => Err(map_error(e)),
        }
    }

    fn create_item(&self, features: &Features, location: &str) -> Result<String, InventoryError> {
        let body = json!({
            "features": features,
            "parent": location,
        });

        let response = self
            .request("POST", "/v2/items")
            .send_json(body)
            .map_err(map_error)?;

        let value: serde_json::Value = response
            .into_json()
            .map_err(|e| InventoryError::Protocol(e.to_string()))?;

        // The service answers with the bare code; some deployments wrap it
        match value {
            serde_json::Value::String(code) => Ok(code),
            other => other["code"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| InventoryError::Protocol(format!("no code in {}", other))),
        }
    }

    fn update_features(&self, code: &str, features: &Features) -> Result<(), InventoryError> {
        let path = format!("/v2/items/{}/features", path_segment(code));
        self.request("PATCH", &path)
            .send_json(features)
            .map_err(map_error)?;
        Ok(())
    }

    fn delete_item(&self, code: &str) -> Result<(), InventoryError> {
        let path = format!("/v2/items/{}", path_segment(code));
        match self.request("DELETE", &path).call() {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(404, _)) => Err(InventoryError::NotFound(code.to_string())),
            Err(e) => Err(map_error(e)),
        }
    }
}

fn map_error(err: ureq::Error) -> InventoryError {
    match err {
        ureq::Error::Status(status, response) => {
            let message = response_message(response);
            match status {
                400 | 422 => InventoryError::Validation { status, message },
                _ => InventoryError::Status { status, message },
            }
        }
        ureq::Error::Transport(transport) => InventoryError::Connection(transport.to_string()),
    }
}

/// Error text from a failed response, preferring the JSON `message` field
fn response_message(response: ureq::Response) -> String {
    let body = response.into_string().unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["message"].as_str().map(str::to_string))
        .unwrap_or(body)
}

/// Percent-encode a value for use as one URL path segment
pub(crate) fn path_segment(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
