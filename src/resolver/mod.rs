//! Tool resolution: find the message handler a context should launch.
//!
//! Lookups walk the containment chain nearest context first and stop at the
//! first level that yields a handler, so a tool bound at a sub-account or
//! course shadows the same tool bound further up.

mod chain;
mod tabs;

use std::collections::HashSet;

use log::{debug, warn};

use crate::config::{Config, TabsConfig};
use crate::domain::{BASIC_LAUNCH_REQUEST, ContextRef, MessageHandler, ResourceCodes};
use crate::error::{Error, Result};
use crate::store::ToolStore;

pub use chain::context_chain;
pub use tabs::Tab;

/// Read-only resolver over a [`ToolStore`].
#[derive(Debug)]
pub struct ToolResolver<'a, S: ToolStore> {
    store: &'a S,
    launch_message_type: String,
    tabs: TabsConfig,
}

impl<'a, S: ToolStore> ToolResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            launch_message_type: BASIC_LAUNCH_REQUEST.to_string(),
            tabs: TabsConfig::default(),
        }
    }

    pub fn from_config(store: &'a S, config: &Config) -> Self {
        Self {
            store,
            launch_message_type: config.resolver.launch_message_type.clone(),
            tabs: config.tabs.clone(),
        }
    }

    /// Find the launchable handler for `(vendor_code, product_code,
    /// resource_type_code)` reachable from `context`.
    ///
    /// Returns `Ok(None)` when nothing in the chain matches.
    pub fn find_handler(
        &self,
        vendor_code: &str,
        product_code: &str,
        resource_type_code: &str,
        context: ContextRef,
    ) -> Result<Option<MessageHandler>> {
        self.find_handler_for_message_type(
            vendor_code,
            product_code,
            resource_type_code,
            context,
            &self.launch_message_type,
        )
    }

    /// Same as [`find_handler`](Self::find_handler) with an explicit message type.
    pub fn find_handler_for_message_type(
        &self,
        vendor_code: &str,
        product_code: &str,
        resource_type_code: &str,
        context: ContextRef,
        message_type: &str,
    ) -> Result<Option<MessageHandler>> {
        let candidates: HashSet<i64> = self
            .store
            .active_tool_proxies(vendor_code, product_code)?
            .into_iter()
            .map(|p| p.id)
            .collect();
        if candidates.is_empty() {
            debug!("No active tool proxy for {}/{}", vendor_code, product_code);
            return Ok(None);
        }

        // The nearest binding of a proxy decides whether it is enabled;
        // bindings further up the chain no longer count.
        let mut decided = HashSet::new();

        for level in context_chain(self.store, context)? {
            let mut reachable = Vec::new();
            for binding in self.store.bindings_at(level)? {
                if !candidates.contains(&binding.tool_proxy_id) || !decided.insert(binding.tool_proxy_id) {
                    continue;
                }
                if binding.enabled {
                    reachable.push(binding.tool_proxy_id);
                } else {
                    debug!("Tool proxy {} disabled at {}", binding.tool_proxy_id, level);
                }
            }
            reachable.sort_unstable();

            if reachable.len() > 1 {
                warn!(
                    "Tool proxies {:?} for {}/{} are all bound at {}, using the first match",
                    reachable, vendor_code, product_code, level
                );
            }

            for proxy_id in reachable {
                if let Some(handler) = self.first_handler(proxy_id, resource_type_code, message_type)? {
                    debug!(
                        "Resolved {}/{}/{} from {} to message handler {} at {}",
                        vendor_code, product_code, resource_type_code, context, handler.id, level
                    );
                    return Ok(Some(handler));
                }
            }
        }

        debug!(
            "No message handler for {}/{}/{} reachable from {}",
            vendor_code, product_code, resource_type_code, context
        );
        Ok(None)
    }

    fn first_handler(
        &self,
        tool_proxy_id: i64,
        resource_type_code: &str,
        message_type: &str,
    ) -> Result<Option<MessageHandler>> {
        for resource_handler in self.store.resource_handlers(tool_proxy_id, resource_type_code)? {
            let handlers = self.store.message_handlers(resource_handler.id, message_type)?;
            if let Some(handler) = handlers.into_iter().next() {
                return Ok(Some(handler));
            }
        }
        Ok(None)
    }

    /// The identity `handler` can be resolved by. None if its resource
    /// handler, tool proxy or product family is gone.
    pub fn resource_codes(&self, handler: &MessageHandler) -> Result<Option<ResourceCodes>> {
        let Some(resource_handler) = self.store.resource_handler(handler.resource_handler_id)? else {
            return Ok(None);
        };
        let Some(proxy) = self.store.tool_proxy(resource_handler.tool_proxy_id)? else {
            return Ok(None);
        };
        let Some(family) = self.store.product_family(proxy.product_family_id)? else {
            return Ok(None);
        };
        Ok(Some(ResourceCodes::new(&family, &resource_handler)))
    }

    /// Check `resource_url` against the launch path of a stored handler.
    pub fn valid_resource_url(&self, message_handler_id: i64, resource_url: &str) -> Result<bool> {
        let handler = self
            .store
            .message_handler(message_handler_id)?
            .ok_or_else(|| Error::NotFound(format!("message handler {}", message_handler_id)))?;
        Ok(handler.valid_resource_url(resource_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Account, Course, NewMessageHandler, ProductFamily, ResourceHandler, ToolProxy, ToolProxyBinding,
        ToolProxyState,
    };
    use crate::store::{MemoryStore, ToolWriter};

    /// Root(1) <- College(2) <- Department(3); course 10 under root 1.
    fn tree() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_account(&Account::new(1, "Root")).unwrap();
        store.insert_account(&Account::new(2, "College").with_parent(1)).unwrap();
        store.insert_account(&Account::new(3, "Department").with_parent(2)).unwrap();
        store.insert_course(&Course::new(10, "Biology", 1)).unwrap();
        store.insert_product_family(&ProductFamily::new(1, "acme", "quizzer")).unwrap();
        store
    }

    /// Install a quizzer proxy bound at `bound_at` with one quiz handler.
    fn install(store: &mut MemoryStore, id: i64, bound_at: ContextRef, message_type: &str) {
        store
            .insert_tool_proxy(&ToolProxy::new(id, format!("Quizzer {}", id), 1, bound_at))
            .unwrap();
        store
            .insert_binding(&ToolProxyBinding::enabled(id, id, bound_at))
            .unwrap();
        store
            .insert_resource_handler(&ResourceHandler::new(id, id, "quiz", format!("Quizzes {}", id)))
            .unwrap();
        store
            .insert_message_handler(NewMessageHandler::new(
                id,
                message_type,
                &format!("https://acme.example.com/{}/launch", id),
                id,
            ))
            .unwrap();
    }

    fn resolve(store: &MemoryStore, context: ContextRef) -> Option<i64> {
        ToolResolver::new(store)
            .find_handler("acme", "quizzer", "quiz", context)
            .unwrap()
            .map(|h| h.id)
    }

    #[test]
    fn test_not_found_without_binding() {
        let mut store = tree();
        store
            .insert_tool_proxy(&ToolProxy::new(1, "Unbound", 1, ContextRef::Account(1)))
            .unwrap();
        assert_eq!(resolve(&store, ContextRef::Account(3)), None);
        assert_eq!(resolve(&store, ContextRef::Course(10)), None);
    }

    #[test]
    fn test_finds_binding_on_ancestor() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), BASIC_LAUNCH_REQUEST);
        assert_eq!(resolve(&store, ContextRef::Account(3)), Some(1));
        assert_eq!(resolve(&store, ContextRef::Course(10)), Some(1));
    }

    #[test]
    fn test_nearest_binding_wins() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), BASIC_LAUNCH_REQUEST);
        install(&mut store, 2, ContextRef::Account(2), BASIC_LAUNCH_REQUEST);

        assert_eq!(resolve(&store, ContextRef::Account(3)), Some(2));
        assert_eq!(resolve(&store, ContextRef::Account(2)), Some(2));
        assert_eq!(resolve(&store, ContextRef::Account(1)), Some(1));
    }

    #[test]
    fn test_binding_below_context_is_invisible() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(3), BASIC_LAUNCH_REQUEST);
        assert_eq!(resolve(&store, ContextRef::Account(2)), None);
    }

    #[test]
    fn test_course_binding_shadows_root_account() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), BASIC_LAUNCH_REQUEST);
        install(&mut store, 2, ContextRef::Course(10), BASIC_LAUNCH_REQUEST);
        assert_eq!(resolve(&store, ContextRef::Course(10)), Some(2));
    }

    #[test]
    fn test_message_type_mismatch_keeps_scanning() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), BASIC_LAUNCH_REQUEST);
        install(&mut store, 2, ContextRef::Account(2), "ContentItemSelectionRequest");
        assert_eq!(resolve(&store, ContextRef::Account(3)), Some(1));
    }

    #[test]
    fn test_message_type_mismatch_tries_next_resource_handler() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), "ContentItemSelectionRequest");
        store
            .insert_resource_handler(&ResourceHandler::new(2, 1, "quiz", "Quizzes (launch)"))
            .unwrap();
        store
            .insert_message_handler(NewMessageHandler::new(
                2,
                BASIC_LAUNCH_REQUEST,
                "https://acme.example.com/1/launch",
                2,
            ))
            .unwrap();

        let found = ToolResolver::new(&store)
            .find_handler("acme", "quizzer", "quiz", ContextRef::Account(3))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 2);
        assert_eq!(found.resource_handler_id, 2);
    }

    #[test]
    fn test_explicit_message_type() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), BASIC_LAUNCH_REQUEST);
        install(&mut store, 2, ContextRef::Account(2), "ContentItemSelectionRequest");

        let found = ToolResolver::new(&store)
            .find_handler_for_message_type(
                "acme",
                "quizzer",
                "quiz",
                ContextRef::Account(3),
                "ContentItemSelectionRequest",
            )
            .unwrap();
        assert_eq!(found.map(|h| h.id), Some(2));
    }

    #[test]
    fn test_resource_type_must_match() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), BASIC_LAUNCH_REQUEST);
        let found = ToolResolver::new(&store)
            .find_handler("acme", "quizzer", "essay", ContextRef::Account(1))
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_inactive_proxy_is_skipped() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), BASIC_LAUNCH_REQUEST);
        install(&mut store, 2, ContextRef::Account(2), BASIC_LAUNCH_REQUEST);

        let mut proxy = store.tool_proxy(2).unwrap().unwrap();
        proxy.workflow_state = ToolProxyState::Disabled;
        store.insert_tool_proxy(&proxy).unwrap();

        assert_eq!(resolve(&store, ContextRef::Account(3)), Some(1));
    }

    #[test]
    fn test_disabled_binding_shadows_ancestor_binding_of_same_proxy() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), BASIC_LAUNCH_REQUEST);
        store
            .insert_binding(&ToolProxyBinding::disabled(50, 1, ContextRef::Account(2)))
            .unwrap();

        assert_eq!(resolve(&store, ContextRef::Account(3)), None);
        assert_eq!(resolve(&store, ContextRef::Account(1)), Some(1));
    }

    #[test]
    fn test_same_level_ambiguity_takes_lowest_proxy_id() {
        let mut store = tree();
        install(&mut store, 7, ContextRef::Account(2), BASIC_LAUNCH_REQUEST);
        install(&mut store, 4, ContextRef::Account(2), BASIC_LAUNCH_REQUEST);
        assert_eq!(resolve(&store, ContextRef::Account(3)), Some(4));
    }

    #[test]
    fn test_detached_context_is_not_found() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), BASIC_LAUNCH_REQUEST);
        assert_eq!(resolve(&store, ContextRef::Course(404)), None);
    }

    #[test]
    fn test_repeated_lookups_are_identical() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), BASIC_LAUNCH_REQUEST);
        install(&mut store, 2, ContextRef::Account(2), BASIC_LAUNCH_REQUEST);

        let resolver = ToolResolver::new(&store);
        let first = resolver.find_handler("acme", "quizzer", "quiz", ContextRef::Account(3)).unwrap();
        let second = resolver.find_handler("acme", "quizzer", "quiz", ContextRef::Account(3)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resource_codes() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), BASIC_LAUNCH_REQUEST);
        let handler = store.message_handler(1).unwrap().unwrap();

        let codes = ToolResolver::new(&store).resource_codes(&handler).unwrap().unwrap();
        assert_eq!(codes.vendor_code, "acme");
        assert_eq!(codes.product_code, "quizzer");
        assert_eq!(codes.resource_type_code, "quiz");
    }

    #[test]
    fn test_valid_resource_url_for_stored_handler() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), BASIC_LAUNCH_REQUEST);
        let resolver = ToolResolver::new(&store);

        assert!(resolver.valid_resource_url(1, "https://acme.example.com/1/launch/extra").unwrap());
        assert!(!resolver.valid_resource_url(1, "http://other-host/1/launch").unwrap());
        assert!(matches!(
            resolver.valid_resource_url(9, "https://acme.example.com/1/launch"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_configured_launch_message_type() {
        let mut store = tree();
        install(&mut store, 1, ContextRef::Account(1), "custom-launch");

        let mut config = Config::default();
        config.resolver.launch_message_type = "custom-launch".to_string();
        let found = ToolResolver::from_config(&store, &config)
            .find_handler("acme", "quizzer", "quiz", ContextRef::Account(1))
            .unwrap();
        assert_eq!(found.map(|h| h.id), Some(1));
    }
}
