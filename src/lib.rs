//! lti-resolver - locate installed LTI message handlers
//!
//! Given a vendor code, product code and resource type, finds the message
//! handler a course or account should launch by walking up the context tree
//! (course -> root account, or account -> parents -> root) and taking the
//! nearest binding. Also projects navigation tabs for handler placements and
//! serves a user's message history behind an authorization check.

pub mod config;
pub mod domain;
pub mod error;
pub mod history;
pub mod resolver;
pub mod store;

pub use error::{Error, Result};
pub use resolver::{Tab, ToolResolver};
