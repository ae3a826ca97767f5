//! SQLite-backed store.
//!
//! Each entity gets its own table with the columns the lookups filter on
//! indexed. List queries order by id so results match the in-memory store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::de::DeserializeOwned;

use super::traits::{MessageQuery, MessageStore, ToolStore, ToolWriter};
use crate::domain::{
    Account, AccountSettings, ContextRef, Course, Message, MessageHandler, Placement, ProductFamily,
    ResourceHandler, ToolProxy, ToolProxyBinding,
};
use crate::error::{Error, Result};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        parent_account_id INTEGER,
        admins_can_view_notifications INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS courses (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        root_account_id INTEGER NOT NULL,
        account_id INTEGER
    );

    CREATE TABLE IF NOT EXISTS product_families (
        id INTEGER PRIMARY KEY,
        vendor_code TEXT NOT NULL,
        product_code TEXT NOT NULL,
        vendor_name TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_product_families_codes ON product_families(vendor_code, product_code);

    CREATE TABLE IF NOT EXISTS tool_proxies (
        id INTEGER PRIMARY KEY,
        guid TEXT NOT NULL,
        name TEXT NOT NULL,
        product_family_id INTEGER NOT NULL,
        context_type TEXT NOT NULL,
        context_id INTEGER NOT NULL,
        workflow_state TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_tool_proxies_family ON tool_proxies(product_family_id, workflow_state);

    CREATE TABLE IF NOT EXISTS tool_proxy_bindings (
        id INTEGER PRIMARY KEY,
        tool_proxy_id INTEGER NOT NULL,
        context_type TEXT NOT NULL,
        context_id INTEGER NOT NULL,
        enabled INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_bindings_context ON tool_proxy_bindings(context_type, context_id);

    CREATE TABLE IF NOT EXISTS resource_handlers (
        id INTEGER PRIMARY KEY,
        tool_proxy_id INTEGER NOT NULL,
        resource_type_code TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_resource_handlers_proxy ON resource_handlers(tool_proxy_id, resource_type_code);

    CREATE TABLE IF NOT EXISTS message_handlers (
        id INTEGER PRIMARY KEY,
        resource_handler_id INTEGER NOT NULL,
        tool_proxy_id INTEGER NOT NULL,
        message_type TEXT NOT NULL,
        launch_path TEXT NOT NULL,
        capabilities TEXT NOT NULL,
        parameters TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_message_handlers_rh ON message_handlers(resource_handler_id, message_type);
    CREATE INDEX IF NOT EXISTS idx_message_handlers_proxy ON message_handlers(tool_proxy_id);

    CREATE TABLE IF NOT EXISTS placements (
        message_handler_id INTEGER NOT NULL,
        placement TEXT NOT NULL,
        PRIMARY KEY (message_handler_id, placement)
    );

    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL,
        root_account_id INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        sent_at INTEGER,
        workflow_state TEXT NOT NULL,
        from_address TEXT,
        from_name TEXT,
        to_address TEXT,
        reply_to TEXT,
        subject TEXT,
        body TEXT,
        html_body TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_messages_user ON messages(user_id, created_at);
"#;

const MESSAGE_COLUMNS: &str = "id, user_id, root_account_id, created_at, sent_at, workflow_state, \
     from_address, from_name, to_address, reply_to, subject, body, html_body";

/// SQLite store. The connection sits behind a `Mutex` because
/// `rusqlite::Connection` is not `Sync`.
pub struct SqliteStore {
    path: Option<PathBuf>,
    db: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").field("path", &self.path).finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path)?;
        log::debug!("Opened SQLite store at {}", path.display());
        Self::init(db, Some(path.to_path_buf()))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(db: Connection, path: Option<PathBuf>) -> Result<Self> {
        db.execute_batch(SCHEMA)?;
        Ok(Self {
            path,
            db: Mutex::new(db),
        })
    }

    /// Database file, None for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|e| Error::Storage(e.to_string()))
    }

    fn query_list<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Vec<T>>
    where
        P: rusqlite::Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let db = self.conn()?;
        let mut stmt = db.prepare(sql)?;
        let rows = stmt.query_map(params, map)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn query_one<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Option<T>>
    where
        P: rusqlite::Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let db = self.conn()?;
        Ok(db.query_row(sql, params, map).optional()?)
    }
}

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn context_at(row: &Row<'_>, type_idx: usize, id_idx: usize) -> rusqlite::Result<ContextRef> {
    let context_type: String = row.get(type_idx)?;
    let context_id: i64 = row.get(id_idx)?;
    ContextRef::from_parts(&context_type, context_id).map_err(|e| conversion_error(type_idx, e))
}

fn json_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn parsed_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(ms) => DateTime::from_timestamp_millis(ms)
            .map(Some)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms)),
        None => Ok(None),
    }
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_account_id: row.get(2)?,
        settings: AccountSettings {
            admins_can_view_notifications: row.get(3)?,
        },
    })
}

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        root_account_id: row.get(2)?,
        account_id: row.get(3)?,
    })
}

fn family_from_row(row: &Row<'_>) -> rusqlite::Result<ProductFamily> {
    Ok(ProductFamily {
        id: row.get(0)?,
        vendor_code: row.get(1)?,
        product_code: row.get(2)?,
        vendor_name: row.get(3)?,
    })
}

fn tool_proxy_from_row(row: &Row<'_>) -> rusqlite::Result<ToolProxy> {
    Ok(ToolProxy {
        id: row.get(0)?,
        guid: row.get(1)?,
        name: row.get(2)?,
        product_family_id: row.get(3)?,
        context: context_at(row, 4, 5)?,
        workflow_state: parsed_at(row, 6)?,
    })
}

fn binding_from_row(row: &Row<'_>) -> rusqlite::Result<ToolProxyBinding> {
    Ok(ToolProxyBinding {
        id: row.get(0)?,
        tool_proxy_id: row.get(1)?,
        context: context_at(row, 2, 3)?,
        enabled: row.get(4)?,
    })
}

fn resource_handler_from_row(row: &Row<'_>) -> rusqlite::Result<ResourceHandler> {
    Ok(ResourceHandler {
        id: row.get(0)?,
        tool_proxy_id: row.get(1)?,
        resource_type_code: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
    })
}

fn message_handler_from_row(row: &Row<'_>) -> rusqlite::Result<MessageHandler> {
    Ok(MessageHandler {
        id: row.get(0)?,
        resource_handler_id: row.get(1)?,
        tool_proxy_id: row.get(2)?,
        message_type: row.get(3)?,
        launch_path: row.get(4)?,
        capabilities: json_at(row, 5)?,
        parameters: json_at(row, 6)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let created_ms: i64 = row.get(3)?;
    Ok(Message {
        id: row.get(0)?,
        user_id: row.get(1)?,
        root_account_id: row.get(2)?,
        created_at: DateTime::from_timestamp_millis(created_ms)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(3, created_ms))?,
        sent_at: timestamp_at(row, 4)?,
        workflow_state: parsed_at(row, 5)?,
        from: row.get(6)?,
        from_name: row.get(7)?,
        to: row.get(8)?,
        reply_to: row.get(9)?,
        subject: row.get(10)?,
        body: row.get(11)?,
        html_body: row.get(12)?,
    })
}

const MESSAGE_HANDLER_COLUMNS: &str =
    "id, resource_handler_id, tool_proxy_id, message_type, launch_path, capabilities, parameters";

/// WHERE clause and bound values shared by `messages` and `count_messages`.
fn message_filter(query: &MessageQuery) -> (String, Vec<i64>) {
    let mut clause = String::from("user_id = ?");
    let mut values = vec![query.user_id];

    if let Some(root) = query.root_account_id {
        clause.push_str(" AND root_account_id = ?");
        values.push(root);
    }
    if let Some(start) = query.start_time {
        clause.push_str(" AND created_at >= ?");
        values.push(start.timestamp_millis());
    }
    if let Some(end) = query.end_time {
        clause.push_str(" AND created_at <= ?");
        values.push(end.timestamp_millis());
    }

    (clause, values)
}

impl ToolStore for SqliteStore {
    fn account(&self, id: i64) -> Result<Option<Account>> {
        self.query_one(
            "SELECT id, name, parent_account_id, admins_can_view_notifications FROM accounts WHERE id = ?1",
            [id],
            account_from_row,
        )
    }

    fn course(&self, id: i64) -> Result<Option<Course>> {
        self.query_one(
            "SELECT id, name, root_account_id, account_id FROM courses WHERE id = ?1",
            [id],
            course_from_row,
        )
    }

    fn product_family(&self, id: i64) -> Result<Option<ProductFamily>> {
        self.query_one(
            "SELECT id, vendor_code, product_code, vendor_name FROM product_families WHERE id = ?1",
            [id],
            family_from_row,
        )
    }

    fn tool_proxy(&self, id: i64) -> Result<Option<ToolProxy>> {
        self.query_one(
            "SELECT id, guid, name, product_family_id, context_type, context_id, workflow_state
             FROM tool_proxies WHERE id = ?1",
            [id],
            tool_proxy_from_row,
        )
    }

    fn active_tool_proxies(&self, vendor_code: &str, product_code: &str) -> Result<Vec<ToolProxy>> {
        self.query_list(
            "SELECT tp.id, tp.guid, tp.name, tp.product_family_id, tp.context_type, tp.context_id, tp.workflow_state
             FROM tool_proxies tp
             JOIN product_families pf ON pf.id = tp.product_family_id
             WHERE pf.vendor_code = ?1 AND pf.product_code = ?2 AND tp.workflow_state = 'active'
             ORDER BY tp.id",
            params![vendor_code, product_code],
            tool_proxy_from_row,
        )
    }

    fn bindings_at(&self, context: ContextRef) -> Result<Vec<ToolProxyBinding>> {
        self.query_list(
            "SELECT id, tool_proxy_id, context_type, context_id, enabled
             FROM tool_proxy_bindings WHERE context_type = ?1 AND context_id = ?2 ORDER BY id",
            params![context.context_type(), context.id()],
            binding_from_row,
        )
    }

    fn resource_handler(&self, id: i64) -> Result<Option<ResourceHandler>> {
        self.query_one(
            "SELECT id, tool_proxy_id, resource_type_code, name, description FROM resource_handlers WHERE id = ?1",
            [id],
            resource_handler_from_row,
        )
    }

    fn resource_handlers(&self, tool_proxy_id: i64, resource_type_code: &str) -> Result<Vec<ResourceHandler>> {
        self.query_list(
            "SELECT id, tool_proxy_id, resource_type_code, name, description
             FROM resource_handlers WHERE tool_proxy_id = ?1 AND resource_type_code = ?2 ORDER BY id",
            params![tool_proxy_id, resource_type_code],
            resource_handler_from_row,
        )
    }

    fn message_handler(&self, id: i64) -> Result<Option<MessageHandler>> {
        self.query_one(
            &format!("SELECT {} FROM message_handlers WHERE id = ?1", MESSAGE_HANDLER_COLUMNS),
            [id],
            message_handler_from_row,
        )
    }

    fn message_handlers(&self, resource_handler_id: i64, message_type: &str) -> Result<Vec<MessageHandler>> {
        self.query_list(
            &format!(
                "SELECT {} FROM message_handlers WHERE resource_handler_id = ?1 AND message_type = ?2 ORDER BY id",
                MESSAGE_HANDLER_COLUMNS
            ),
            params![resource_handler_id, message_type],
            message_handler_from_row,
        )
    }

    fn message_handlers_for_proxy(&self, tool_proxy_id: i64) -> Result<Vec<MessageHandler>> {
        self.query_list(
            &format!(
                "SELECT {} FROM message_handlers WHERE tool_proxy_id = ?1 ORDER BY id",
                MESSAGE_HANDLER_COLUMNS
            ),
            [tool_proxy_id],
            message_handler_from_row,
        )
    }

    fn placements(&self, message_handler_id: i64) -> Result<Vec<Placement>> {
        let mut placements = self.query_list(
            "SELECT placement FROM placements WHERE message_handler_id = ?1",
            [message_handler_id],
            |row| parsed_at::<Placement>(row, 0),
        )?;
        placements.sort();
        Ok(placements)
    }
}

impl MessageStore for SqliteStore {
    fn messages(&self, query: &MessageQuery) -> Result<Vec<Message>> {
        let (clause, mut values) = message_filter(query);
        let mut sql = format!(
            "SELECT {} FROM messages WHERE {} ORDER BY created_at DESC, id DESC",
            MESSAGE_COLUMNS, clause
        );
        // SQLite needs a LIMIT before OFFSET; -1 means unbounded
        sql.push_str(" LIMIT ? OFFSET ?");
        values.push(query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX)));
        // Offsets past i64::MAX cannot match any row
        values.push(i64::try_from(query.offset).unwrap_or(i64::MAX));

        self.query_list(&sql, rusqlite::params_from_iter(values), message_from_row)
    }

    fn count_messages(&self, query: &MessageQuery) -> Result<usize> {
        let (clause, values) = message_filter(query);
        let db = self.conn()?;
        let count: i64 = db.query_row(
            &format!("SELECT COUNT(*) FROM messages WHERE {}", clause),
            rusqlite::params_from_iter(values),
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl ToolWriter for SqliteStore {
    fn insert_account(&mut self, account: &Account) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO accounts (id, name, parent_account_id, admins_can_view_notifications)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                account.id,
                account.name,
                account.parent_account_id,
                account.settings.admins_can_view_notifications
            ],
        )?;
        Ok(())
    }

    fn insert_course(&mut self, course: &Course) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO courses (id, name, root_account_id, account_id) VALUES (?1, ?2, ?3, ?4)",
            params![course.id, course.name, course.root_account_id, course.account_id],
        )?;
        Ok(())
    }

    fn insert_product_family(&mut self, family: &ProductFamily) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO product_families (id, vendor_code, product_code, vendor_name)
             VALUES (?1, ?2, ?3, ?4)",
            params![family.id, family.vendor_code, family.product_code, family.vendor_name],
        )?;
        Ok(())
    }

    fn insert_tool_proxy(&mut self, proxy: &ToolProxy) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO tool_proxies
             (id, guid, name, product_family_id, context_type, context_id, workflow_state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                proxy.id,
                proxy.guid,
                proxy.name,
                proxy.product_family_id,
                proxy.context.context_type(),
                proxy.context.id(),
                proxy.workflow_state.as_str(),
            ],
        )?;
        Ok(())
    }

    fn insert_binding(&mut self, binding: &ToolProxyBinding) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO tool_proxy_bindings (id, tool_proxy_id, context_type, context_id, enabled)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                binding.id,
                binding.tool_proxy_id,
                binding.context.context_type(),
                binding.context.id(),
                binding.enabled,
            ],
        )?;
        Ok(())
    }

    fn insert_resource_handler(&mut self, resource_handler: &ResourceHandler) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO resource_handlers (id, tool_proxy_id, resource_type_code, name, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                resource_handler.id,
                resource_handler.tool_proxy_id,
                resource_handler.resource_type_code,
                resource_handler.name,
                resource_handler.description,
            ],
        )?;
        Ok(())
    }

    fn insert_message(&mut self, message: &Message) -> Result<()> {
        self.conn()?.execute(
            &format!(
                "INSERT OR REPLACE INTO messages ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                MESSAGE_COLUMNS
            ),
            params![
                message.id,
                message.user_id,
                message.root_account_id,
                message.created_at.timestamp_millis(),
                message.sent_at.map(|t| t.timestamp_millis()),
                message.workflow_state.as_str(),
                message.from,
                message.from_name,
                message.to,
                message.reply_to,
                message.subject,
                message.body,
                message.html_body,
            ],
        )?;
        Ok(())
    }

    fn store_message_handler(&mut self, handler: &MessageHandler, placements: &[Placement]) -> Result<()> {
        let capabilities = serde_json::to_string(&handler.capabilities)?;
        let parameters = serde_json::to_string(&handler.parameters)?;

        let mut db = self.conn()?;
        let tx = db.transaction()?;
        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO message_handlers ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                MESSAGE_HANDLER_COLUMNS
            ),
            params![
                handler.id,
                handler.resource_handler_id,
                handler.tool_proxy_id,
                handler.message_type,
                handler.launch_path,
                capabilities,
                parameters,
            ],
        )?;
        tx.execute("DELETE FROM placements WHERE message_handler_id = ?1", [handler.id])?;
        for placement in placements {
            tx.execute(
                "INSERT OR IGNORE INTO placements (message_handler_id, placement) VALUES (?1, ?2)",
                params![handler.id, placement.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BASIC_LAUNCH_REQUEST, MessageState, NewMessageHandler, ToolProxyState};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn seeded(store: &mut SqliteStore) {
        let mut root = Account::new(1, "Root");
        root.settings.admins_can_view_notifications = true;
        store.insert_account(&root).unwrap();
        store.insert_account(&Account::new(2, "Sub").with_parent(1)).unwrap();
        store.insert_course(&Course::new(10, "Biology", 1)).unwrap();
        store.insert_product_family(&ProductFamily::new(1, "acme", "quizzer")).unwrap();
        store
            .insert_tool_proxy(&ToolProxy::new(1, "Quizzer", 1, ContextRef::Account(1)))
            .unwrap();
        store
            .insert_binding(&ToolProxyBinding::enabled(1, 1, ContextRef::Account(2)))
            .unwrap();
        store
            .insert_resource_handler(&ResourceHandler::new(1, 1, "quiz", "Quizzes"))
            .unwrap();
    }

    #[test]
    fn test_open_creates_database_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("lti.db");
        let store = SqliteStore::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn test_accounts_and_courses_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seeded(&mut store);

        let root = store.account(1).unwrap().unwrap();
        assert!(root.is_root());
        assert!(root.settings.admins_can_view_notifications);
        assert_eq!(store.account(2).unwrap().unwrap().parent_account_id, Some(1));
        assert_eq!(store.course(10).unwrap().unwrap().root_account_id, 1);
        assert!(store.account(99).unwrap().is_none());
    }

    #[test]
    fn test_active_tool_proxies_joins_family() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seeded(&mut store);

        let found = store.active_tool_proxies("acme", "quizzer").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].context, ContextRef::Account(1));
        assert!(store.active_tool_proxies("acme", "grader").unwrap().is_empty());

        let mut disabled = found[0].clone();
        disabled.workflow_state = ToolProxyState::Disabled;
        store.insert_tool_proxy(&disabled).unwrap();
        assert!(store.active_tool_proxies("acme", "quizzer").unwrap().is_empty());
        assert_eq!(
            store.tool_proxy(1).unwrap().unwrap().workflow_state,
            ToolProxyState::Disabled
        );
    }

    #[test]
    fn test_bindings_at_context() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seeded(&mut store);

        let bindings = store.bindings_at(ContextRef::Account(2)).unwrap();
        assert_eq!(bindings, vec![ToolProxyBinding::enabled(1, 1, ContextRef::Account(2))]);
        assert!(store.bindings_at(ContextRef::Course(2)).unwrap().is_empty());
    }

    #[test]
    fn test_message_handler_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seeded(&mut store);

        let mut new = NewMessageHandler::new(3, BASIC_LAUNCH_REQUEST, "https://acme.example.com/quiz", 1)
            .with_placements(&[Placement::AccountNavigation]);
        new.capabilities = vec!["Canvas.placements.accountNavigation".to_string()];
        new.parameters = Some(serde_json::json!([{"name": "course_id", "variable": "Canvas.course.id"}]));
        let handler = store.insert_message_handler(new).unwrap();

        assert_eq!(store.message_handler(3).unwrap(), Some(handler.clone()));
        assert_eq!(store.message_handlers(1, BASIC_LAUNCH_REQUEST).unwrap(), vec![handler.clone()]);
        assert_eq!(store.message_handlers_for_proxy(1).unwrap(), vec![handler]);
        assert_eq!(store.placements(3).unwrap(), vec![Placement::AccountNavigation]);
    }

    #[test]
    fn test_reinstall_replaces_placements() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seeded(&mut store);

        let first = NewMessageHandler::new(3, BASIC_LAUNCH_REQUEST, "https://acme.example.com/quiz", 1)
            .with_placements(&[Placement::AccountNavigation, Placement::CourseNavigation]);
        store.insert_message_handler(first).unwrap();

        let second = NewMessageHandler::new(3, BASIC_LAUNCH_REQUEST, "https://acme.example.com/v2/quiz", 1)
            .with_placements(&[Placement::LinkSelection]);
        store.insert_message_handler(second).unwrap();

        assert_eq!(store.placements(3).unwrap(), vec![Placement::LinkSelection]);
        assert_eq!(
            store.message_handler(3).unwrap().unwrap().launch_path,
            "https://acme.example.com/v2/quiz"
        );
    }

    #[test]
    fn test_messages_filter_order_and_window() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        for (id, day, root) in [(1, 1, 1), (2, 2, 1), (3, 3, 2), (4, 4, 1)] {
            let created = Utc.with_ymd_and_hms(2024, 2, day, 8, 0, 0).unwrap();
            let mut message = Message::new(id, 5, root, created);
            message.workflow_state = MessageState::Sent;
            message.subject = Some(format!("Message {}", id));
            store.insert_message(&message).unwrap();
        }
        store
            .insert_message(&Message::new(9, 6, 1, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()))
            .unwrap();

        let all = store.messages(&MessageQuery::for_user(5)).unwrap();
        assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![4, 3, 2, 1]);
        assert_eq!(all[0].workflow_state, MessageState::Sent);
        assert_eq!(all[0].subject.as_deref(), Some("Message 4"));

        let scoped = MessageQuery {
            root_account_id: Some(1),
            start_time: Some(Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap()),
            ..MessageQuery::for_user(5)
        };
        let found = store.messages(&scoped).unwrap();
        assert_eq!(found.iter().map(|m| m.id).collect::<Vec<_>>(), vec![4, 2]);
        assert_eq!(store.count_messages(&scoped).unwrap(), 2);

        let window = MessageQuery {
            offset: 1,
            limit: Some(2),
            ..MessageQuery::for_user(5)
        };
        let page = store.messages(&window).unwrap();
        assert_eq!(page.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3, 2]);
        assert_eq!(store.count_messages(&window).unwrap(), 4);
    }

    #[test]
    fn test_data_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lti.db");

        {
            let mut store = SqliteStore::open(&path).unwrap();
            seeded(&mut store);
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.resource_handlers(1, "quiz").unwrap().len(), 1);
        assert!(store.resource_handlers(1, "essay").unwrap().is_empty());
    }
}
