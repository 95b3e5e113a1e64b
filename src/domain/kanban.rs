//! Kanban board domain types.
//!
//! Columns are per-owner configuration. Five default columns map one to one
//! onto the canonical [`EmailStatus`] values and cannot be deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{system_labels, ColumnId, Email, EmailId, EmailStatus, OwnerId};

/// A column on an owner's Kanban board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanColumn {
    pub id: ColumnId,
    pub owner_id: OwnerId,
    /// Internal key, e.g. `inbox` or `custom_waiting`.
    pub key: String,
    /// Display name.
    pub label: String,
    /// Position on the board, ascending.
    pub order: i64,
    /// Provider label this column mirrors, if any.
    pub external_label: Option<String>,
    /// Hex color for display.
    pub color: Option<String>,
    /// Default columns are seeded once and cannot be deleted.
    pub is_default: bool,
}

impl KanbanColumn {
    /// Builds the five default columns for an owner.
    pub fn defaults(owner_id: &OwnerId) -> Vec<KanbanColumn> {
        let specs: [(EmailStatus, &str, Option<&str>); 5] = [
            (EmailStatus::Inbox, "Inbox", Some(system_labels::INBOX)),
            (EmailStatus::Todo, "To Do", Some(system_labels::STARRED)),
            (
                EmailStatus::InProgress,
                "In Progress",
                Some(system_labels::IMPORTANT),
            ),
            (EmailStatus::Done, "Done", None),
            (EmailStatus::Snoozed, "Snoozed", None),
        ];

        specs
            .iter()
            .enumerate()
            .map(|(order, (status, label, external))| KanbanColumn {
                id: ColumnId::generate(),
                owner_id: owner_id.clone(),
                key: status.as_str().to_string(),
                label: (*label).to_string(),
                order: order as i64,
                external_label: external.map(str::to_string),
                color: None,
                is_default: true,
            })
            .collect()
    }
}

/// Generates the key for a user-created column from its label.
///
/// Lowercases, turns spaces into underscores, keeps only `[a-z0-9_]`, and
/// prefixes `custom_`.
pub fn custom_column_key(label: &str) -> String {
    let slug: String = label
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    format!("custom_{}", slug)
}

/// Maps a configured column label onto its board key.
///
/// Common spellings of the canonical statuses map to their status token;
/// anything else becomes a lowercase slug.
pub fn canonical_column_key(label: &str) -> String {
    let norm = label.trim().to_lowercase();
    match norm.as_str() {
        "inbox" => EmailStatus::Inbox.as_str().to_string(),
        "to do" | "todo" => EmailStatus::Todo.as_str().to_string(),
        "in progress" | "in_progress" => EmailStatus::InProgress.as_str().to_string(),
        "done" => EmailStatus::Done.as_str().to_string(),
        "snoozed" => EmailStatus::Snoozed.as_str().to_string(),
        _ => norm.replace(' ', "_"),
    }
}

/// Ordered column metadata for rendering a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub key: String,
    pub label: String,
}

/// A card on the Kanban board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: EmailId,
    /// Sender display name, or address when no name is known.
    pub sender: String,
    pub subject: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snoozed_until: Option<DateTime<Utc>>,
}

impl From<&Email> for Card {
    fn from(email: &Email) -> Self {
        Self {
            id: email.id.clone(),
            sender: email.from.display_name().to_string(),
            subject: email.subject.clone(),
            summary: email.summary.clone().unwrap_or_default(),
            snoozed_until: email.deferred_until,
        }
    }
}

/// Fields to change on an existing column. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPatch {
    pub label: Option<String>,
    pub external_label: Option<String>,
    pub color: Option<String>,
    pub order: Option<i64>,
}

impl ColumnPatch {
    /// Returns true if no field would change.
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.external_label.is_none()
            && self.color.is_none()
            && self.order.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Address;

    #[test]
    fn defaults_cover_every_status_once() {
        let owner = OwnerId::from("u1");
        let columns = KanbanColumn::defaults(&owner);

        assert_eq!(columns.len(), EmailStatus::all().len());
        for status in EmailStatus::all() {
            let matching = columns
                .iter()
                .filter(|c| c.key == status.as_str())
                .count();
            assert_eq!(matching, 1, "status {}", status);
        }
        assert!(columns.iter().all(|c| c.is_default));
        assert_eq!(columns[1].label, "To Do");
        assert_eq!(columns[1].external_label.as_deref(), Some("STARRED"));
        assert_eq!(columns[3].external_label, None);
    }

    #[test]
    fn custom_key_slugifies_label() {
        assert_eq!(custom_column_key("Waiting On"), "custom_waiting_on");
        assert_eq!(custom_column_key("Q3 Taxes!"), "custom_q3_taxes");
        assert_eq!(custom_column_key("Café"), "custom_caf");
    }

    #[test]
    fn canonical_key_maps_known_labels() {
        assert_eq!(canonical_column_key("To Do"), "todo");
        assert_eq!(canonical_column_key(" In Progress "), "in_progress");
        assert_eq!(canonical_column_key("Snoozed"), "snoozed");
        assert_eq!(canonical_column_key("Needs Review"), "needs_review");
    }

    #[test]
    fn card_uses_sender_name_then_address() {
        let email = Email::new("m1", "u1", Utc::now())
            .with_from(Address::with_name("a@example.com", "Alice"))
            .with_subject("Hi");
        assert_eq!(Card::from(&email).sender, "Alice");

        let email = email.with_from(Address::new("a@example.com"));
        let card = Card::from(&email);
        assert_eq!(card.sender, "a@example.com");
        assert_eq!(card.summary, "");
        assert!(card.snoozed_until.is_none());
    }

    #[test]
    fn empty_patch_detection() {
        assert!(ColumnPatch::default().is_empty());
        let patch = ColumnPatch {
            order: Some(2),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
