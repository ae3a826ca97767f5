//! Tool proxies, their product families, and the bindings that enable them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::context::ContextRef;
use crate::error::Error;

/// Vendor/product identity shared by every install of the same tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFamily {
    pub id: i64,
    pub vendor_code: String,
    pub product_code: String,
    #[serde(default)]
    pub vendor_name: Option<String>,
}

impl ProductFamily {
    pub fn new(id: i64, vendor_code: impl Into<String>, product_code: impl Into<String>) -> Self {
        Self {
            id,
            vendor_code: vendor_code.into(),
            product_code: product_code.into(),
            vendor_name: None,
        }
    }

    pub fn matches(&self, vendor_code: &str, product_code: &str) -> bool {
        self.vendor_code == vendor_code && self.product_code == product_code
    }
}

/// Lifecycle state of an installed tool proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolProxyState {
    #[default]
    Active,
    Disabled,
    Deleted,
}

impl ToolProxyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolProxyState::Active => "active",
            ToolProxyState::Disabled => "disabled",
            ToolProxyState::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ToolProxyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolProxyState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ToolProxyState::Active),
            "disabled" => Ok(ToolProxyState::Disabled),
            "deleted" => Ok(ToolProxyState::Deleted),
            other => Err(Error::InvalidInput(format!("unknown tool proxy state: {}", other))),
        }
    }
}

/// An installed external tool.
///
/// A proxy is installed in exactly one context. Installation alone does not
/// make it reachable; a [`ToolProxyBinding`] enables it at a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProxy {
    pub id: i64,
    pub guid: String,
    pub name: String,
    pub product_family_id: i64,

    /// Where the proxy was installed
    pub context: ContextRef,

    #[serde(default)]
    pub workflow_state: ToolProxyState,
}

impl ToolProxy {
    pub fn new(id: i64, name: impl Into<String>, product_family_id: i64, context: ContextRef) -> Self {
        Self {
            id,
            guid: format!("tool-proxy-{}", id),
            name: name.into(),
            product_family_id,
            context,
            workflow_state: ToolProxyState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.workflow_state == ToolProxyState::Active
    }
}

/// Records that a tool proxy is enabled (or explicitly disabled) at a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProxyBinding {
    pub id: i64,
    pub tool_proxy_id: i64,
    pub context: ContextRef,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ToolProxyBinding {
    pub fn enabled(id: i64, tool_proxy_id: i64, context: ContextRef) -> Self {
        Self {
            id,
            tool_proxy_id,
            context,
            enabled: true,
        }
    }

    pub fn disabled(id: i64, tool_proxy_id: i64, context: ContextRef) -> Self {
        Self {
            enabled: false,
            ..Self::enabled(id, tool_proxy_id, context)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_family_matches_both_codes() {
        let family = ProductFamily::new(1, "acme", "quizzer");
        assert!(family.matches("acme", "quizzer"));
        assert!(!family.matches("acme", "grader"));
        assert!(!family.matches("other", "quizzer"));
    }

    #[test]
    fn test_tool_proxy_state_round_trips_as_str() {
        for state in [ToolProxyState::Active, ToolProxyState::Disabled, ToolProxyState::Deleted] {
            assert_eq!(state.as_str().parse::<ToolProxyState>().unwrap(), state);
        }
        assert!("retired".parse::<ToolProxyState>().is_err());
    }

    #[test]
    fn test_new_tool_proxy_is_active() {
        let proxy = ToolProxy::new(5, "Quizzer", 1, ContextRef::Account(1));
        assert!(proxy.is_active());
        assert_eq!(proxy.guid, "tool-proxy-5");
    }

    #[test]
    fn test_binding_enabled_defaults_true_when_omitted() {
        let yaml = "id: 1\ntool_proxy_id: 2\ncontext: { type: course, id: 3 }\n";
        let binding: ToolProxyBinding = serde_yaml::from_str(yaml).unwrap();
        assert!(binding.enabled);
        assert_eq!(binding.context, ContextRef::Course(3));
    }

    #[test]
    fn test_disabled_binding() {
        let binding = ToolProxyBinding::disabled(9, 2, ContextRef::Account(4));
        assert!(!binding.enabled);
        assert_eq!(binding.tool_proxy_id, 2);
    }
}
