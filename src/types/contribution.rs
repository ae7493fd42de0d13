//! Contribution log entry types
//!
//! A contribution log entry is an immutable record of one create/update/delete
//! action on a sentence, a translation link, or a sentence license.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of object a contribution touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionType {
    /// Sentence text, language or script
    Sentence,
    /// Translation link between two sentences
    Link,
    /// Sentence license (privileged readers only)
    License,
}

impl ContributionType {
    pub const ALL: [ContributionType; 3] = [
        ContributionType::Sentence,
        ContributionType::Link,
        ContributionType::License,
    ];

    /// Column value stored in the `type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionType::Sentence => "sentence",
            ContributionType::Link => "link",
            ContributionType::License => "license",
        }
    }
}

impl std::fmt::Display for ContributionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContributionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sentence" => Ok(ContributionType::Sentence),
            "link" => Ok(ContributionType::Link),
            "license" => Ok(ContributionType::License),
            other => Err(format!("unknown contribution type '{}'", other)),
        }
    }
}

/// What happened to the object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionAction {
    Insert,
    Update,
    Delete,
}

impl ContributionAction {
    /// Column value stored in the `action` column
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionAction::Insert => "insert",
            ContributionAction::Update => "update",
            ContributionAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ContributionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContributionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(ContributionAction::Insert),
            "update" => Ok(ContributionAction::Update),
            "delete" => Ok(ContributionAction::Delete),
            other => Err(format!("unknown contribution action '{}'", other)),
        }
    }
}

/// Links are only ever added or removed, never updated in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkAction {
    Insert,
    Delete,
}

impl From<LinkAction> for ContributionAction {
    fn from(action: LinkAction) -> Self {
        match action {
            LinkAction::Insert => ContributionAction::Insert,
            LinkAction::Delete => ContributionAction::Delete,
        }
    }
}

/// Snapshot of a sentence at the moment it was inserted, edited or deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceSnapshot {
    pub sentence_id: i64,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    pub text: String,
}

/// One immutable row of the contribution log
///
/// Every field except `sentence_lang` is write-once. `sentence_lang` is a
/// denormalized copy of the sentence's current language, refreshed in bulk
/// by language propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionLogEntry {
    pub id: i64,
    pub sentence_id: i64,
    /// Present only on link entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_id: Option<i64>,
    pub sentence_lang: Option<String>,
    pub script: Option<String>,
    /// Content snapshot at the time of the action
    pub text: Option<String>,
    /// `None` for anonymous or since-deleted users
    pub user_id: Option<i64>,
    pub datetime: DateTime<Utc>,
    pub ip: Option<String>,
    #[serde(rename = "type")]
    pub kind: ContributionType,
    pub action: ContributionAction,
}

/// Per-IP usage for one user, used for multi-account review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpUsage {
    pub ip: Option<String>,
    pub count: u64,
}

/// Who may see which entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// License entries are hidden
    #[default]
    Public,
    /// Moderators and admins see everything
    Privileged,
}

impl Visibility {
    pub fn can_see(&self, kind: ContributionType) -> bool {
        match self {
            Visibility::Privileged => true,
            Visibility::Public => kind != ContributionType::License,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_round_trips_through_column_value() {
        for kind in ContributionType::ALL {
            assert_eq!(kind.as_str().parse::<ContributionType>().unwrap(), kind);
        }
        assert!("translation".parse::<ContributionType>().is_err());
    }

    #[test]
    fn test_link_action_never_maps_to_update() {
        assert_eq!(ContributionAction::from(LinkAction::Insert), ContributionAction::Insert);
        assert_eq!(ContributionAction::from(LinkAction::Delete), ContributionAction::Delete);
    }

    #[test]
    fn test_public_visibility_hides_licenses() {
        assert!(Visibility::Public.can_see(ContributionType::Sentence));
        assert!(Visibility::Public.can_see(ContributionType::Link));
        assert!(!Visibility::Public.can_see(ContributionType::License));
        assert!(Visibility::Privileged.can_see(ContributionType::License));
    }

    #[test]
    fn test_entry_serializes_type_field() {
        let entry = ContributionLogEntry {
            id: 1,
            sentence_id: 10,
            translation_id: None,
            sentence_lang: Some("fra".to_string()),
            script: None,
            text: Some("Bonjour".to_string()),
            user_id: Some(7),
            datetime: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            ip: Some("127.0.0.1".to_string()),
            kind: ContributionType::Sentence,
            action: ContributionAction::Insert,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "sentence");
        assert_eq!(json["action"], "insert");
        assert!(json.get("translation_id").is_none());
    }
}
