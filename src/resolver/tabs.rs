//! Navigation tabs contributed by message handlers bound at a context.

use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use super::ToolResolver;
use crate::domain::{ContextRef, Placement};
use crate::error::Result;
use crate::store::ToolStore;

/// A UI tab descriptor for one message handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tab {
    /// `lti/message_handler_<id>`
    pub id: String,
    pub css_class: String,
    /// Name of the owning resource handler
    pub label: String,
    /// Route name of the launch endpoint for the context type
    pub href: String,
    pub external: bool,
    /// Launch arguments passed through to the route
    pub args: BTreeMap<String, Value>,
}

impl<S: ToolStore> ToolResolver<'_, S> {
    /// One tab per handler bound exactly at `context` that carries at least
    /// one of `placements`. Tabs come back in ascending handler id order.
    ///
    /// `extra_args` are copied into every tab's args; the handler id, context
    /// id and link fragment are set on top of them.
    pub fn list_ui_tabs(
        &self,
        context: ContextRef,
        placements: &[Placement],
        extra_args: &BTreeMap<String, Value>,
    ) -> Result<Vec<Tab>> {
        if placements.is_empty() {
            return Ok(Vec::new());
        }

        let mut decided = HashSet::new();
        let mut bound = Vec::new();
        for binding in self.store.bindings_at(context)? {
            if decided.insert(binding.tool_proxy_id) && binding.enabled {
                bound.push(binding.tool_proxy_id);
            }
        }

        let mut tabs = BTreeMap::new();
        for proxy_id in bound {
            match self.store.tool_proxy(proxy_id)? {
                Some(proxy) if proxy.is_active() => {}
                _ => {
                    debug!("Skipping tool proxy {} for tabs: missing or inactive", proxy_id);
                    continue;
                }
            }

            for handler in self.store.message_handlers_for_proxy(proxy_id)? {
                if !self.tabs.message_types.iter().any(|t| *t == handler.message_type) {
                    continue;
                }

                let attached = self.store.placements(handler.id)?;
                let Some(placement) = placements.iter().copied().find(|p| attached.contains(p)) else {
                    continue;
                };

                let Some(resource_handler) = self.store.resource_handler(handler.resource_handler_id)? else {
                    warn!(
                        "Message handler {} references missing resource handler {}",
                        handler.id, handler.resource_handler_id
                    );
                    continue;
                };

                let mut args = extra_args.clone();
                args.insert("message_handler_id".to_string(), Value::from(handler.id));
                args.insert(
                    "resource_link_fragment".to_string(),
                    Value::from(self.tabs.link_fragment(placement)),
                );
                args.insert(format!("{}_id", context.context_type()), Value::from(context.id()));

                tabs.insert(
                    handler.id,
                    Tab {
                        id: format!("lti/message_handler_{}", handler.id),
                        css_class: format!("message_handler_{}", handler.id),
                        label: resource_handler.name,
                        href: format!("{}_basic_lti_launch_request_path", context.context_type()),
                        external: true,
                        args,
                    },
                );
            }
        }

        Ok(tabs.into_values().collect())
    }
}
