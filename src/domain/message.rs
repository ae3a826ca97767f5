//! Message history records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Delivery state of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    #[default]
    Created,
    Staged,
    Sending,
    Sent,
    Bounced,
    Dashboard,
    Cancelled,
    Closed,
}

impl MessageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageState::Created => "created",
            MessageState::Staged => "staged",
            MessageState::Sending => "sending",
            MessageState::Sent => "sent",
            MessageState::Bounced => "bounced",
            MessageState::Dashboard => "dashboard",
            MessageState::Cancelled => "cancelled",
            MessageState::Closed => "closed",
        }
    }
}

impl fmt::Display for MessageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(MessageState::Created),
            "staged" => Ok(MessageState::Staged),
            "sending" => Ok(MessageState::Sending),
            "sent" => Ok(MessageState::Sent),
            "bounced" => Ok(MessageState::Bounced),
            "dashboard" => Ok(MessageState::Dashboard),
            "cancelled" => Ok(MessageState::Cancelled),
            "closed" => Ok(MessageState::Closed),
            other => Err(Error::InvalidInput(format!("unknown message state: {}", other))),
        }
    }
}

/// A notification sent (or queued) to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub user_id: i64,
    pub root_account_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub workflow_state: MessageState,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_body: Option<String>,
}

impl Message {
    pub fn new(id: i64, user_id: i64, root_account_id: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            root_account_id,
            created_at,
            sent_at: None,
            workflow_state: MessageState::Created,
            from: None,
            from_name: None,
            to: None,
            reply_to: None,
            subject: None,
            body: None,
            html_body: None,
        }
    }
}

/// The serialized shape returned by the history listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageJson {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub workflow_state: MessageState,
    pub from: Option<String>,
    pub from_name: Option<String>,
    pub to: Option<String>,
    pub reply_to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub html_body: Option<String>,
}

impl From<Message> for MessageJson {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            created_at: m.created_at,
            sent_at: m.sent_at,
            workflow_state: m.workflow_state,
            from: m.from,
            from_name: m.from_name,
            to: m.to,
            reply_to: m.reply_to,
            subject: m.subject,
            body: m.body,
            html_body: m.html_body,
        }
    }
}
