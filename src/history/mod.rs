//! Message history listing for a user.
//!
//! Transport-agnostic version of the endpoint: the caller hands over raw
//! query parameters, gets back a page of serialized messages or
//! `Error::Forbidden`.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::HistoryConfig;
use crate::domain::MessageJson;
use crate::error::{Error, Result};
use crate::store::{MessageQuery, MessageStore, ToolStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Site admin only: read any user's messages
    ReadMessages,
    /// Account admin: read messages if the account allows it
    ViewNotifications,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadMessages => "read_messages",
            Permission::ViewNotifications => "view_notifications",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "read_messages" => Ok(Permission::ReadMessages),
            "view_notifications" => Ok(Permission::ViewNotifications),
            other => Err(Error::InvalidInput(format!("unknown permission: {}", other))),
        }
    }
}

/// Who is asking, and what they hold where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester {
    pub user_id: i64,
    /// Permissions granted on the site admin account
    pub site_admin_grants: BTreeSet<Permission>,
    /// Permissions granted on the domain root account
    pub account_grants: BTreeSet<Permission>,
}

impl Requester {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn site_admin(mut self) -> Self {
        self.site_admin_grants.insert(Permission::ReadMessages);
        self
    }

    pub fn granted(mut self, permission: Permission) -> Self {
        self.account_grants.insert(permission);
        self
    }
}

/// Raw request parameters. Anything unparseable is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryRequest {
    pub user_id: i64,
    pub domain_root_account_id: i64,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl HistoryRequest {
    pub fn new(user_id: i64, domain_root_account_id: i64) -> Self {
        Self {
            user_id,
            domain_root_account_id,
            ..Self::default()
        }
    }
}

/// How [`MessageHistory::authorize`] let the requester in. Decides the scope
/// of [`MessageHistory::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// `read_messages` on site admin: messages from every root account
    SiteAdmin,
    /// `view_notifications` on the domain root account: only its messages
    RootAccount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub next_page: Option<usize>,
    pub prev_page: Option<usize>,
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date (midnight UTC).
pub fn parse_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.and_hms_opt(0, 0, 0).map(|t| t.and_utc()),
        Err(_) => {
            debug!("Ignoring malformed time bound: {}", raw);
            None
        }
    }
}

fn parse_positive(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok()).filter(|n| *n > 0)
}

pub struct MessageHistory<'a, S: ToolStore + MessageStore> {
    store: &'a S,
    config: HistoryConfig,
}

impl<'a, S: ToolStore + MessageStore> MessageHistory<'a, S> {
    pub fn new(store: &'a S, config: HistoryConfig) -> Self {
        Self { store, config }
    }

    /// Site admins with `read_messages` always get in. Otherwise the requester
    /// needs `view_notifications` on the domain root account and the account
    /// must allow admins to view notifications.
    pub fn authorize(&self, requester: &Requester, domain_root_account_id: i64) -> Result<Access> {
        if requester.site_admin_grants.contains(&Permission::ReadMessages) {
            return Ok(Access::SiteAdmin);
        }

        let account = self
            .store
            .account(domain_root_account_id)?
            .ok_or_else(|| Error::NotFound(format!("account {}", domain_root_account_id)))?;

        if !requester.account_grants.contains(&Permission::ViewNotifications) {
            return Err(Error::Forbidden(format!(
                "user {} lacks view_notifications on account {}",
                requester.user_id, account.id
            )));
        }
        if !account.settings.admins_can_view_notifications {
            return Err(Error::Forbidden(format!(
                "account {} does not allow admins to view notifications",
                account.id
            )));
        }
        Ok(Access::RootAccount)
    }

    /// List the target user's messages, newest first.
    pub fn list(&self, requester: &Requester, request: &HistoryRequest) -> Result<Page<MessageJson>> {
        let access = self.authorize(requester, request.domain_root_account_id)?;

        let per_page = parse_positive(request.per_page.as_deref())
            .unwrap_or(self.config.default_per_page)
            .min(self.config.max_per_page);
        let page = parse_positive(request.page.as_deref()).unwrap_or(1);

        let filter = MessageQuery {
            user_id: request.user_id,
            root_account_id: match access {
                Access::SiteAdmin => None,
                Access::RootAccount => Some(request.domain_root_account_id),
            },
            start_time: parse_time(request.start_time.as_deref()),
            end_time: parse_time(request.end_time.as_deref()),
            offset: (page - 1).saturating_mul(per_page),
            limit: Some(per_page),
        };

        let total = self.store.count_messages(&filter)?;
        let messages = self.store.messages(&filter)?;
        info!(
            "User {} listed {} of {} messages for user {} (page {})",
            requester.user_id,
            messages.len(),
            total,
            request.user_id,
            page
        );

        let next_page = if filter.offset.saturating_add(messages.len()) < total {
            page.checked_add(1)
        } else {
            None
        };
        Ok(Page {
            items: messages.into_iter().map(MessageJson::from).collect(),
            page,
            per_page,
            total,
            next_page,
            prev_page: (page > 1).then(|| page - 1),
        })
    }
}
