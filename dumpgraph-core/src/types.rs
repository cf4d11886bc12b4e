//! Core domain types for dumpgraph
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Corpus** | The full set of archived dump files under the configured root |
//! | **ContentType** | A named category of extractable statistic (messages, reactions, ...) |
//! | **Guild** | The server scope a statistic is measured in |
//! | **Member** | A user within a guild; identity is resolved upstream |
//! | **Base / overlay series** | The primary plotted series vs. comparison series on the same chart |

use serde::{Deserialize, Serialize};

/// A category of extractable statistic.
///
/// Closed set: every variant maps to exactly one registered scanner, and
/// unknown identifiers are rejected during request validation before any
/// I/O happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Messages authored by the member
    Messages,
    /// Reactions added by the member
    Reactions,
    /// Attachments uploaded by the member
    Attachments,
    /// Mentions of other members
    Mentions,
}

impl ContentType {
    /// All supported content types, in display order.
    pub const ALL: [ContentType; 4] = [
        ContentType::Messages,
        ContentType::Reactions,
        ContentType::Attachments,
        ContentType::Mentions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Messages => "messages",
            ContentType::Reactions => "reactions",
            ContentType::Attachments => "attachments",
            ContentType::Mentions => "mentions",
        }
    }

    /// Human-friendly label used in chart legends and titles.
    pub fn label(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "messages" => Ok(ContentType::Messages),
            "reactions" => Ok(ContentType::Reactions),
            "attachments" => Ok(ContentType::Attachments),
            "mentions" => Ok(ContentType::Mentions),
            _ => Err(format!("unknown content type: {}", s)),
        }
    }
}

/// The guild scope a request runs in.
///
/// Identity resolution (IDs, names) happens upstream in the hosting shell;
/// the pipeline only consumes the resolved values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: u64,
    pub name: String,
}

/// A guild member whose statistics are requested or compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: u64,
    /// Display name used for chart legends
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_content_type_round_trip() {
        for ct in ContentType::ALL {
            assert_eq!(ContentType::from_str(ct.as_str()), Ok(ct));
        }
    }

    #[test]
    fn test_unknown_content_type_rejected() {
        assert!(ContentType::from_str("stickers").is_err());
        assert!(ContentType::from_str("").is_err());
        // Case-sensitive, matching the registry identifiers exactly.
        assert!(ContentType::from_str("Messages").is_err());
    }

    #[test]
    fn test_all_is_exhaustive_and_unique() {
        let mut labels: Vec<&str> = ContentType::ALL.iter().map(|c| c.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), ContentType::ALL.len());
    }
}
