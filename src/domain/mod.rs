//! Domain types for lti-resolver
//!
//! - Context: the account tree and courses
//! - ToolProxy: installed tools, their product families and bindings
//! - Handler: resource handlers and message handlers (launch configurations)
//! - Placement: UI surfaces a handler attaches to
//! - Message: message history records

pub mod context;
pub mod handler;
pub mod message;
pub mod placement;
pub mod tool_proxy;
pub mod validation;

pub use context::{Account, AccountSettings, ContextRef, Course};
pub use handler::{BASIC_LAUNCH_REQUEST, MessageHandler, NewMessageHandler, ResourceCodes, ResourceHandler};
pub use message::{Message, MessageJson, MessageState};
pub use placement::Placement;
pub use tool_proxy::{ProductFamily, ToolProxy, ToolProxyBinding, ToolProxyState};
pub use validation::ValidationErrors;
