//! The closed set of entity types the remote search service understands.
//!
//! Every searchable record belongs to exactly one of these kinds. The set is
//! closed on purpose: an unknown kind in configuration or on the wire is a
//! contract violation and is rejected, never silently accepted.
//!
//! Capability predicates live here so the rest of the pipeline asks the type
//! once instead of re-checking set membership at every call site:
//!
//! | Predicate | Types | Meaning |
//! |-----------|-------|---------|
//! | [`supports_sort`](EntityType::supports_sort) | listItem, externalItem | server-side sort allowed |
//! | [`is_lookup`](EntityType::is_lookup) | bookmark, acronym | curated-list lookup; no paging, no field projection |
//! | [`is_sharepoint`](EntityType::is_sharepoint) | drive, driveItem, list, listItem, site | thumbnail-eligible group |

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One searchable resource kind.
///
/// Wire names are camelCase as the service expects; the Teams message kind
/// serializes as the provider's `chatMessage` entity name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Message,
    Event,
    Drive,
    DriveItem,
    ExternalItem,
    List,
    ListItem,
    Site,
    Person,
    #[serde(rename = "chatMessage", alias = "teamsMessage")]
    TeamsMessage,
    Bookmark,
    Acronym,
}

impl EntityType {
    /// All twelve kinds, in declaration order.
    pub const ALL: [EntityType; 12] = [
        EntityType::Message,
        EntityType::Event,
        EntityType::Drive,
        EntityType::DriveItem,
        EntityType::ExternalItem,
        EntityType::List,
        EntityType::ListItem,
        EntityType::Site,
        EntityType::Person,
        EntityType::TeamsMessage,
        EntityType::Bookmark,
        EntityType::Acronym,
    ];

    /// The name used on the wire for this kind.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EntityType::Message => "message",
            EntityType::Event => "event",
            EntityType::Drive => "drive",
            EntityType::DriveItem => "driveItem",
            EntityType::ExternalItem => "externalItem",
            EntityType::List => "list",
            EntityType::ListItem => "listItem",
            EntityType::Site => "site",
            EntityType::Person => "person",
            EntityType::TeamsMessage => "chatMessage",
            EntityType::Bookmark => "bookmark",
            EntityType::Acronym => "acronym",
        }
    }

    /// Whether the service accepts `sortProperties` for this kind.
    pub fn supports_sort(&self) -> bool {
        matches!(self, EntityType::ListItem | EntityType::ExternalItem)
    }

    /// Curated-list lookup kinds. These answer from an admin-maintained list
    /// rather than a full-text index: paging is unsupported and the reply has
    /// a fixed shape, so field projection is meaningless.
    pub fn is_lookup(&self) -> bool {
        matches!(self, EntityType::Bookmark | EntityType::Acronym)
    }

    /// SharePoint-backed kinds, the only group eligible for computed
    /// thumbnail URLs.
    pub fn is_sharepoint(&self) -> bool {
        matches!(
            self,
            EntityType::Drive
                | EntityType::DriveItem
                | EntityType::List
                | EntityType::ListItem
                | EntityType::Site
        )
    }

    /// Classify a hit from its resource type discriminator
    /// (e.g. `#microsoft.graph.driveItem`).
    ///
    /// The provider labels curated answers with `search.bookmark` /
    /// `search.acronym`; both aliases normalize to the plain enumeration
    /// values. Returns `None` for an unrecognized or absent discriminator;
    /// classification is then indeterminate and type-specific enrichment is
    /// skipped for that hit.
    pub fn from_odata_type(discriminator: &str) -> Option<EntityType> {
        let name = discriminator
            .trim_start_matches('#')
            .trim_start_matches("microsoft.graph.");
        match name {
            "search.bookmark" => Some(EntityType::Bookmark),
            "search.acronym" => Some(EntityType::Acronym),
            other => other.parse().ok(),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for EntityType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        for entity in EntityType::ALL {
            if entity.wire_name() == s {
                return Ok(entity);
            }
        }
        // Accept the abstract alias used by configuration layers.
        if s == "teamsMessage" {
            return Ok(EntityType::TeamsMessage);
        }
        bail!("Unknown entity type: '{}'", s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_roundtrip() {
        for entity in EntityType::ALL {
            let parsed: EntityType = entity.wire_name().parse().unwrap();
            assert_eq!(parsed, entity);
        }
    }

    #[test]
    fn test_unknown_rejected() {
        assert!("qna".parse::<EntityType>().is_err());
        assert!("".parse::<EntityType>().is_err());
        assert!(serde_json::from_str::<EntityType>("\"folder\"").is_err());
    }

    #[test]
    fn test_teams_message_aliases() {
        assert_eq!(
            "teamsMessage".parse::<EntityType>().unwrap(),
            EntityType::TeamsMessage
        );
        assert_eq!(
            serde_json::to_string(&EntityType::TeamsMessage).unwrap(),
            "\"chatMessage\""
        );
    }

    #[test]
    fn test_capability_groups() {
        assert!(EntityType::ListItem.supports_sort());
        assert!(EntityType::ExternalItem.supports_sort());
        assert!(!EntityType::DriveItem.supports_sort());

        assert!(EntityType::Bookmark.is_lookup());
        assert!(EntityType::Acronym.is_lookup());
        assert!(!EntityType::Message.is_lookup());

        assert!(EntityType::Site.is_sharepoint());
        assert!(!EntityType::ExternalItem.is_sharepoint());
        assert!(!EntityType::Person.is_sharepoint());
    }

    #[test]
    fn test_odata_classification() {
        assert_eq!(
            EntityType::from_odata_type("#microsoft.graph.driveItem"),
            Some(EntityType::DriveItem)
        );
        assert_eq!(
            EntityType::from_odata_type("#microsoft.graph.search.bookmark"),
            Some(EntityType::Bookmark)
        );
        assert_eq!(
            EntityType::from_odata_type("#microsoft.graph.search.acronym"),
            Some(EntityType::Acronym)
        );
        assert_eq!(EntityType::from_odata_type("#microsoft.graph.unknownThing"), None);
    }
}
