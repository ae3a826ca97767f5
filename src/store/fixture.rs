//! YAML fixtures describing a set of installed tools.
//!
//! A fixture is what an installation run produces: the context tree, tool
//! proxies with their bindings and handlers, and optionally message history.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use super::traits::ToolWriter;
use crate::domain::{
    Account, Course, Message, NewMessageHandler, ProductFamily, ResourceHandler, ToolProxy, ToolProxyBinding,
};
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub accounts: Vec<Account>,
    pub courses: Vec<Course>,
    pub product_families: Vec<ProductFamily>,
    pub tool_proxies: Vec<ToolProxy>,
    pub bindings: Vec<ToolProxyBinding>,
    pub resource_handlers: Vec<ResourceHandler>,
    pub message_handlers: Vec<NewMessageHandler>,
    pub messages: Vec<Message>,
}

/// Counts of records written by [`Fixture::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub accounts: usize,
    pub courses: usize,
    pub tool_proxies: usize,
    pub bindings: usize,
    pub resource_handlers: usize,
    pub message_handlers: usize,
    pub messages: usize,
}

impl Fixture {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let fixture = Self::from_yaml(&content)?;
        info!("Loaded fixture from: {}", path.display());
        Ok(fixture)
    }

    /// Write every record through `writer`. Parents go first so message
    /// handlers can find their resource handlers. Stops at the first invalid
    /// message handler.
    pub fn apply<W: ToolWriter>(&self, writer: &mut W) -> Result<ImportSummary> {
        for account in &self.accounts {
            writer.insert_account(account)?;
        }
        for course in &self.courses {
            writer.insert_course(course)?;
        }
        for family in &self.product_families {
            writer.insert_product_family(family)?;
        }
        for proxy in &self.tool_proxies {
            writer.insert_tool_proxy(proxy)?;
        }
        for binding in &self.bindings {
            writer.insert_binding(binding)?;
        }
        for resource_handler in &self.resource_handlers {
            writer.insert_resource_handler(resource_handler)?;
        }
        for handler in &self.message_handlers {
            writer.insert_message_handler(handler.clone())?;
        }
        for message in &self.messages {
            writer.insert_message(message)?;
        }

        let summary = ImportSummary {
            accounts: self.accounts.len(),
            courses: self.courses.len(),
            tool_proxies: self.tool_proxies.len(),
            bindings: self.bindings.len(),
            resource_handlers: self.resource_handlers.len(),
            message_handlers: self.message_handlers.len(),
            messages: self.messages.len(),
        };
        info!("Imported fixture: {:?}", summary);
        Ok(summary)
    }
}
