//! Resource handlers and the message handlers (launch configurations) under them.

use serde::{Deserialize, Serialize};
use url::Url;

use super::placement::Placement;
use super::tool_proxy::ProductFamily;
use super::validation::ValidationErrors;

/// Message type used for navigation and ordinary tool launches
pub const BASIC_LAUNCH_REQUEST: &str = "basic-lti-launch-request";

/// Groups message handlers under a resource type for one tool proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandler {
    pub id: i64,
    pub tool_proxy_id: i64,
    pub resource_type_code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ResourceHandler {
    pub fn new(id: i64, tool_proxy_id: i64, resource_type_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            tool_proxy_id,
            resource_type_code: resource_type_code.into(),
            name: name.into(),
            description: None,
        }
    }
}

/// A persisted launch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandler {
    pub id: i64,
    pub message_type: String,
    pub launch_path: String,
    pub resource_handler_id: i64,

    /// Copied from the resource handler when the handler is stored
    pub tool_proxy_id: i64,

    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Launch parameters, a JSON array as declared by the tool
    #[serde(default = "empty_parameters")]
    pub parameters: serde_json::Value,
}

fn empty_parameters() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

impl MessageHandler {
    /// True if `resource_url` points at the same scheme, host and port as the
    /// launch path, and its path equals or extends the launch path at a
    /// segment boundary.
    pub fn valid_resource_url(&self, resource_url: &str) -> bool {
        let (Ok(launch), Ok(candidate)) = (Url::parse(&self.launch_path), Url::parse(resource_url)) else {
            return false;
        };

        if launch.scheme() != candidate.scheme()
            || launch.host_str() != candidate.host_str()
            || launch.port_or_known_default() != candidate.port_or_known_default()
        {
            return false;
        }

        let prefix = launch.path().trim_end_matches('/');
        match candidate.path().strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// A message handler as submitted for installation, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMessageHandler {
    pub id: i64,
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub launch_path: String,
    #[serde(default)]
    pub resource_handler_id: Option<i64>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
    #[serde(default)]
    pub placements: Vec<Placement>,
}

impl NewMessageHandler {
    pub fn new(id: i64, message_type: &str, launch_path: &str, resource_handler_id: i64) -> Self {
        Self {
            id,
            message_type: message_type.to_string(),
            launch_path: launch_path.to_string(),
            resource_handler_id: Some(resource_handler_id),
            ..Self::default()
        }
    }

    pub fn with_placements(mut self, placements: &[Placement]) -> Self {
        self.placements = placements.to_vec();
        self
    }

    /// Check the required fields. Does not look up the resource handler.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();

        if self.message_type.trim().is_empty() {
            errors.add("message_type", "can't be blank");
        }

        if self.launch_path.trim().is_empty() {
            errors.add("launch_path", "can't be blank");
        } else if Url::parse(&self.launch_path).map(|u| u.cannot_be_a_base()).unwrap_or(true) {
            errors.add("launch_path", "is not an absolute URL");
        }

        if self.resource_handler_id.is_none() {
            errors.add("resource_handler", "can't be blank");
        }

        if self.parameters.as_ref().is_some_and(|p| !p.is_array()) {
            errors.add("parameters", "must be a list");
        }

        errors
    }

    /// Produce the stored record once validation passed and the owning
    /// resource handler is known.
    pub fn into_handler(self, resource_handler: &ResourceHandler) -> MessageHandler {
        MessageHandler {
            id: self.id,
            message_type: self.message_type,
            launch_path: self.launch_path,
            resource_handler_id: resource_handler.id,
            tool_proxy_id: resource_handler.tool_proxy_id,
            capabilities: self.capabilities,
            parameters: self.parameters.unwrap_or_else(empty_parameters),
        }
    }
}

/// The identity a message handler can be looked up by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceCodes {
    pub vendor_code: String,
    pub product_code: String,
    pub resource_type_code: String,
}

impl ResourceCodes {
    pub fn new(family: &ProductFamily, resource_handler: &ResourceHandler) -> Self {
        Self {
            vendor_code: family.vendor_code.clone(),
            product_code: family.product_code.clone(),
            resource_type_code: resource_handler.resource_type_code.clone(),
        }
    }
}
