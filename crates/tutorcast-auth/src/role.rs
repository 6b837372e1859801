//! User roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Author,
    Learner,
    Guest,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Author => "author",
            UserRole::Learner => "learner",
            UserRole::Guest => "guest",
        }
    }

    /// Authors record, replace and delete sections
    pub fn can_author(&self) -> bool {
        matches!(self, UserRole::Author)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseUserRoleError(String);

impl fmt::Display for ParseUserRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for ParseUserRoleError {}

impl FromStr for UserRole {
    type Err = ParseUserRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "author" => Ok(UserRole::Author),
            "learner" => Ok(UserRole::Learner),
            "guest" => Ok(UserRole::Guest),
            _ => Err(ParseUserRoleError(s.to_string())),
        }
    }
}
