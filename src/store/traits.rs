//! Store trait definitions and query types.

use chrono::{DateTime, Utc};

use crate::domain::{
    Account, ContextRef, Course, Message, MessageHandler, NewMessageHandler, Placement, ProductFamily,
    ResourceHandler, ToolProxy, ToolProxyBinding,
};
use crate::error::{Error, Result};

/// Read access to installed tools and the context tree.
///
/// Every list method returns records in ascending id order.
pub trait ToolStore: Send + Sync {
    fn account(&self, id: i64) -> Result<Option<Account>>;

    fn course(&self, id: i64) -> Result<Option<Course>>;

    fn product_family(&self, id: i64) -> Result<Option<ProductFamily>>;

    fn tool_proxy(&self, id: i64) -> Result<Option<ToolProxy>>;

    /// Active tool proxies whose product family carries both codes.
    fn active_tool_proxies(&self, vendor_code: &str, product_code: &str) -> Result<Vec<ToolProxy>>;

    /// Bindings (enabled or not) recorded exactly at `context`.
    fn bindings_at(&self, context: ContextRef) -> Result<Vec<ToolProxyBinding>>;

    fn resource_handler(&self, id: i64) -> Result<Option<ResourceHandler>>;

    fn resource_handlers(&self, tool_proxy_id: i64, resource_type_code: &str) -> Result<Vec<ResourceHandler>>;

    fn message_handler(&self, id: i64) -> Result<Option<MessageHandler>>;

    fn message_handlers(&self, resource_handler_id: i64, message_type: &str) -> Result<Vec<MessageHandler>>;

    fn message_handlers_for_proxy(&self, tool_proxy_id: i64) -> Result<Vec<MessageHandler>>;

    fn placements(&self, message_handler_id: i64) -> Result<Vec<Placement>>;
}

/// Filter and window for a message history lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub user_id: i64,
    /// Restrict to one root account; None means every account
    pub root_account_id: Option<i64>,
    /// Inclusive lower bound on created_at
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound on created_at
    pub end_time: Option<DateTime<Utc>>,
    pub offset: usize,
    /// None returns everything after `offset`
    pub limit: Option<usize>,
}

impl MessageQuery {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Check the filter part of the query (the window is applied separately).
    pub fn matches(&self, message: &Message) -> bool {
        message.user_id == self.user_id
            && self.root_account_id.is_none_or(|id| message.root_account_id == id)
            && self.start_time.is_none_or(|start| message.created_at >= start)
            && self.end_time.is_none_or(|end| message.created_at <= end)
    }
}

/// Read access to message history.
pub trait MessageStore: Send + Sync {
    /// Matching messages, newest first (created_at desc, then id desc).
    fn messages(&self, query: &MessageQuery) -> Result<Vec<Message>>;

    /// Number of matching messages, ignoring offset and limit.
    fn count_messages(&self, query: &MessageQuery) -> Result<usize>;
}

/// Write access used by the installation workflow and fixture imports.
///
/// Inserting a record with an existing id replaces it.
pub trait ToolWriter: ToolStore {
    fn insert_account(&mut self, account: &Account) -> Result<()>;

    fn insert_course(&mut self, course: &Course) -> Result<()>;

    fn insert_product_family(&mut self, family: &ProductFamily) -> Result<()>;

    fn insert_tool_proxy(&mut self, proxy: &ToolProxy) -> Result<()>;

    fn insert_binding(&mut self, binding: &ToolProxyBinding) -> Result<()>;

    fn insert_resource_handler(&mut self, resource_handler: &ResourceHandler) -> Result<()>;

    fn insert_message(&mut self, message: &Message) -> Result<()>;

    /// Persist an already validated handler together with its placements.
    fn store_message_handler(&mut self, handler: &MessageHandler, placements: &[Placement]) -> Result<()>;

    /// Validate and persist a message handler.
    ///
    /// Returns `Error::Validation` with field-level errors when a required
    /// field is missing or the resource handler does not exist.
    fn insert_message_handler(&mut self, new: NewMessageHandler) -> Result<MessageHandler> {
        let mut errors = new.validate();

        let resource_handler = match new.resource_handler_id {
            Some(id) => {
                let found = self.resource_handler(id)?;
                if found.is_none() {
                    errors.add("resource_handler", "must exist");
                }
                found
            }
            None => None,
        };

        let resource_handler = match resource_handler {
            Some(rh) if errors.is_empty() => rh,
            _ => return Err(Error::Validation(errors)),
        };

        let placements = new.placements.clone();
        let handler = new.into_handler(&resource_handler);
        self.store_message_handler(&handler, &placements)?;
        Ok(handler)
    }
}
