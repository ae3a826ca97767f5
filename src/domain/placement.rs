//! UI surfaces a message handler can be attached to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    AccountNavigation,
    CourseNavigation,
    AssignmentSelection,
    LinkSelection,
    ResourceSelection,
    SimilarityDetection,
}

impl Placement {
    pub const ALL: [Placement; 6] = [
        Placement::AccountNavigation,
        Placement::CourseNavigation,
        Placement::AssignmentSelection,
        Placement::LinkSelection,
        Placement::ResourceSelection,
        Placement::SimilarityDetection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::AccountNavigation => "account_navigation",
            Placement::CourseNavigation => "course_navigation",
            Placement::AssignmentSelection => "assignment_selection",
            Placement::LinkSelection => "link_selection",
            Placement::ResourceSelection => "resource_selection",
            Placement::SimilarityDetection => "similarity_detection",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Placement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Placement::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown placement: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_placement() {
        for placement in Placement::ALL {
            assert_eq!(placement.as_str().parse::<Placement>().unwrap(), placement);
        }
    }

    #[test]
    fn test_parse_unknown_placement() {
        let err = "global_navigation".parse::<Placement>().unwrap_err();
        assert!(err.to_string().contains("global_navigation"));
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&Placement::AccountNavigation).unwrap();
        assert_eq!(json, "\"account_navigation\"");
    }
}
