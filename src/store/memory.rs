//! In-memory store, used for tests and for resolving against a fixture
//! without touching disk.

use std::collections::{BTreeMap, BTreeSet};

use super::traits::{MessageQuery, MessageStore, ToolStore, ToolWriter};
use crate::domain::{
    Account, ContextRef, Course, Message, MessageHandler, Placement, ProductFamily, ResourceHandler, ToolProxy,
    ToolProxyBinding,
};
use crate::error::Result;

/// Every collection is keyed by id so iteration is in ascending id order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: BTreeMap<i64, Account>,
    courses: BTreeMap<i64, Course>,
    product_families: BTreeMap<i64, ProductFamily>,
    tool_proxies: BTreeMap<i64, ToolProxy>,
    bindings: BTreeMap<i64, ToolProxyBinding>,
    resource_handlers: BTreeMap<i64, ResourceHandler>,
    message_handlers: BTreeMap<i64, MessageHandler>,
    placements: BTreeMap<i64, BTreeSet<Placement>>,
    messages: BTreeMap<i64, Message>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching_messages(&self, query: &MessageQuery) -> Vec<&Message> {
        let mut found: Vec<&Message> = self.messages.values().filter(|m| query.matches(m)).collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        found
    }
}

impl ToolStore for MemoryStore {
    fn account(&self, id: i64) -> Result<Option<Account>> {
        Ok(self.accounts.get(&id).cloned())
    }

    fn course(&self, id: i64) -> Result<Option<Course>> {
        Ok(self.courses.get(&id).cloned())
    }

    fn product_family(&self, id: i64) -> Result<Option<ProductFamily>> {
        Ok(self.product_families.get(&id).cloned())
    }

    fn tool_proxy(&self, id: i64) -> Result<Option<ToolProxy>> {
        Ok(self.tool_proxies.get(&id).cloned())
    }

    fn active_tool_proxies(&self, vendor_code: &str, product_code: &str) -> Result<Vec<ToolProxy>> {
        Ok(self
            .tool_proxies
            .values()
            .filter(|p| p.is_active())
            .filter(|p| {
                self.product_families
                    .get(&p.product_family_id)
                    .is_some_and(|f| f.matches(vendor_code, product_code))
            })
            .cloned()
            .collect())
    }

    fn bindings_at(&self, context: ContextRef) -> Result<Vec<ToolProxyBinding>> {
        Ok(self.bindings.values().filter(|b| b.context == context).cloned().collect())
    }

    fn resource_handler(&self, id: i64) -> Result<Option<ResourceHandler>> {
        Ok(self.resource_handlers.get(&id).cloned())
    }

    fn resource_handlers(&self, tool_proxy_id: i64, resource_type_code: &str) -> Result<Vec<ResourceHandler>> {
        Ok(self
            .resource_handlers
            .values()
            .filter(|rh| rh.tool_proxy_id == tool_proxy_id && rh.resource_type_code == resource_type_code)
            .cloned()
            .collect())
    }

    fn message_handler(&self, id: i64) -> Result<Option<MessageHandler>> {
        Ok(self.message_handlers.get(&id).cloned())
    }

    fn message_handlers(&self, resource_handler_id: i64, message_type: &str) -> Result<Vec<MessageHandler>> {
        Ok(self
            .message_handlers
            .values()
            .filter(|mh| mh.resource_handler_id == resource_handler_id && mh.message_type == message_type)
            .cloned()
            .collect())
    }

    fn message_handlers_for_proxy(&self, tool_proxy_id: i64) -> Result<Vec<MessageHandler>> {
        Ok(self
            .message_handlers
            .values()
            .filter(|mh| mh.tool_proxy_id == tool_proxy_id)
            .cloned()
            .collect())
    }

    fn placements(&self, message_handler_id: i64) -> Result<Vec<Placement>> {
        Ok(self
            .placements
            .get(&message_handler_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }
}

impl MessageStore for MemoryStore {
    fn messages(&self, query: &MessageQuery) -> Result<Vec<Message>> {
        let found = self.matching_messages(query).into_iter().skip(query.offset);
        Ok(match query.limit {
            Some(limit) => found.take(limit).cloned().collect(),
            None => found.cloned().collect(),
        })
    }

    fn count_messages(&self, query: &MessageQuery) -> Result<usize> {
        Ok(self.matching_messages(query).len())
    }
}

impl ToolWriter for MemoryStore {
    fn insert_account(&mut self, account: &Account) -> Result<()> {
        self.accounts.insert(account.id, account.clone());
        Ok(())
    }

    fn insert_course(&mut self, course: &Course) -> Result<()> {
        self.courses.insert(course.id, course.clone());
        Ok(())
    }

    fn insert_product_family(&mut self, family: &ProductFamily) -> Result<()> {
        self.product_families.insert(family.id, family.clone());
        Ok(())
    }

    fn insert_tool_proxy(&mut self, proxy: &ToolProxy) -> Result<()> {
        self.tool_proxies.insert(proxy.id, proxy.clone());
        Ok(())
    }

    fn insert_binding(&mut self, binding: &ToolProxyBinding) -> Result<()> {
        self.bindings.insert(binding.id, binding.clone());
        Ok(())
    }

    fn insert_resource_handler(&mut self, resource_handler: &ResourceHandler) -> Result<()> {
        self.resource_handlers.insert(resource_handler.id, resource_handler.clone());
        Ok(())
    }

    fn insert_message(&mut self, message: &Message) -> Result<()> {
        self.messages.insert(message.id, message.clone());
        Ok(())
    }

    fn store_message_handler(&mut self, handler: &MessageHandler, placements: &[Placement]) -> Result<()> {
        self.message_handlers.insert(handler.id, handler.clone());
        self.placements.insert(handler.id, placements.iter().copied().collect());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BASIC_LAUNCH_REQUEST, NewMessageHandler, ToolProxyState};
    use crate::error::Error;
    use chrono::{TimeZone, Utc};

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_account(&Account::new(1, "Root")).unwrap();
        store.insert_product_family(&ProductFamily::new(1, "acme", "quizzer")).unwrap();
        store.insert_product_family(&ProductFamily::new(2, "acme", "grader")).unwrap();
        store
            .insert_tool_proxy(&ToolProxy::new(1, "Quizzer", 1, ContextRef::Account(1)))
            .unwrap();
        store
            .insert_tool_proxy(&ToolProxy::new(2, "Grader", 2, ContextRef::Account(1)))
            .unwrap();
        store
            .insert_resource_handler(&ResourceHandler::new(1, 1, "quiz", "Quizzes"))
            .unwrap();
        store
    }

    #[test]
    fn test_active_tool_proxies_filters_identity_and_state() {
        let mut store = seeded();
        let found = store.active_tool_proxies("acme", "quizzer").unwrap();
        assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1]);

        let mut deleted = store.tool_proxy(1).unwrap().unwrap();
        deleted.workflow_state = ToolProxyState::Deleted;
        store.insert_tool_proxy(&deleted).unwrap();
        assert!(store.active_tool_proxies("acme", "quizzer").unwrap().is_empty());
    }

    #[test]
    fn test_bindings_at_exact_context_only() {
        let mut store = seeded();
        store
            .insert_binding(&ToolProxyBinding::enabled(1, 1, ContextRef::Account(1)))
            .unwrap();
        store
            .insert_binding(&ToolProxyBinding::enabled(2, 1, ContextRef::Course(1)))
            .unwrap();

        let at_account = store.bindings_at(ContextRef::Account(1)).unwrap();
        assert_eq!(at_account.len(), 1);
        assert_eq!(at_account[0].id, 1);
        assert!(store.bindings_at(ContextRef::Account(2)).unwrap().is_empty());
    }

    #[test]
    fn test_insert_message_handler_records_placements() {
        let mut store = seeded();
        let new = NewMessageHandler::new(5, BASIC_LAUNCH_REQUEST, "https://acme.example.com/quiz", 1)
            .with_placements(&[Placement::CourseNavigation, Placement::AccountNavigation]);
        let handler = store.insert_message_handler(new).unwrap();

        assert_eq!(handler.tool_proxy_id, 1);
        assert_eq!(store.message_handler(5).unwrap(), Some(handler));
        assert_eq!(
            store.placements(5).unwrap(),
            vec![Placement::AccountNavigation, Placement::CourseNavigation]
        );
        assert_eq!(store.message_handlers(1, BASIC_LAUNCH_REQUEST).unwrap().len(), 1);
        assert!(store.message_handlers(1, "ContentItemSelectionRequest").unwrap().is_empty());
    }

    #[test]
    fn test_insert_message_handler_rejects_missing_resource_handler() {
        let mut store = seeded();
        let new = NewMessageHandler::new(5, BASIC_LAUNCH_REQUEST, "https://acme.example.com/quiz", 99);
        let err = store.insert_message_handler(new).unwrap_err();

        match err {
            Error::Validation(errors) => assert_eq!(errors.on("resource_handler"), ["must exist"]),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(store.message_handler(5).unwrap().is_none());
    }

    #[test]
    fn test_insert_message_handler_rejects_blank_fields() {
        let mut store = seeded();
        let new = NewMessageHandler {
            id: 6,
            resource_handler_id: Some(1),
            ..NewMessageHandler::default()
        };
        let err = store.insert_message_handler(new).unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["launch_path", "message_type"]);
    }

    #[test]
    fn test_messages_newest_first_with_window() {
        let mut store = MemoryStore::new();
        for (id, day) in [(1, 1), (2, 3), (3, 2), (4, 3)] {
            let created = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
            store.insert_message(&Message::new(id, 7, 1, created)).unwrap();
        }

        let all = store.messages(&MessageQuery::for_user(7)).unwrap();
        assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![4, 2, 3, 1]);

        let window = MessageQuery {
            offset: 1,
            limit: Some(2),
            ..MessageQuery::for_user(7)
        };
        let page = store.messages(&window).unwrap();
        assert_eq!(page.iter().map(|m| m.id).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(store.count_messages(&window).unwrap(), 4);
    }
}
