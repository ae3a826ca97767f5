//! Contexts: the account tree and the courses hanging off it.
//!
//! A course always has exactly one root account. An account may have a parent
//! account, terminating at a root account with no parent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reference to a context a tool can be installed or bound in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ContextRef {
    Account(i64),
    Course(i64),
}

impl ContextRef {
    /// The context type as stored and used in route names
    pub fn context_type(&self) -> &'static str {
        match self {
            ContextRef::Account(_) => "account",
            ContextRef::Course(_) => "course",
        }
    }

    /// The durable id of the referenced record
    pub fn id(&self) -> i64 {
        match self {
            ContextRef::Account(id) | ContextRef::Course(id) => *id,
        }
    }

    /// Rebuild a reference from its stored `(context_type, context_id)` pair.
    pub fn from_parts(context_type: &str, id: i64) -> Result<Self> {
        match context_type {
            "account" => Ok(ContextRef::Account(id)),
            "course" => Ok(ContextRef::Course(id)),
            other => Err(Error::InvalidInput(format!("unknown context type: {}", other))),
        }
    }
}

impl fmt::Display for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.context_type(), self.id())
    }
}

impl FromStr for ContextRef {
    type Err = Error;

    /// Parses `account:<id>` or `course:<id>`.
    fn from_str(s: &str) -> Result<Self> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("expected <type>:<id>, got {}", s)))?;
        let id: i64 = id
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("invalid context id: {}", id)))?;
        Self::from_parts(kind.trim(), id)
    }
}

/// Per-account settings consulted by the message history endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    /// Lets account admins with `view_notifications` read user messages
    pub admins_can_view_notifications: bool,
}

/// A node in the account tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,

    /// None for a root account
    #[serde(default)]
    pub parent_account_id: Option<i64>,

    #[serde(default)]
    pub settings: AccountSettings,
}

impl Account {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_account_id: None,
            settings: AccountSettings::default(),
        }
    }

    /// Attach this account below `parent_id`
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_account_id = Some(parent_id);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_account_id.is_none()
    }

    pub fn context(&self) -> ContextRef {
        ContextRef::Account(self.id)
    }
}

/// A course. Tool resolution from a course only ever considers the course
/// itself and its root account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub root_account_id: i64,

    /// Sub-account the course lives in, if any
    #[serde(default)]
    pub account_id: Option<i64>,
}

impl Course {
    pub fn new(id: i64, name: impl Into<String>, root_account_id: i64) -> Self {
        Self {
            id,
            name: name.into(),
            root_account_id,
            account_id: None,
        }
    }

    pub fn context(&self) -> ContextRef {
        ContextRef::Course(self.id)
    }
}
