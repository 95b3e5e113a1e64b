//! Email domain types.
//!
//! An email is the unit of work for both search and the Kanban workflow.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{system_labels, EmailId, OwnerId};

/// Workflow status of an email on the Kanban board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    /// Untriaged; the default for newly ingested mail.
    #[default]
    Inbox,
    Todo,
    InProgress,
    /// Terminal in the UX sense only.
    Done,
    /// Deferred until `deferred_until`.
    Snoozed,
}

impl EmailStatus {
    /// Returns all statuses in board order.
    pub fn all() -> &'static [EmailStatus] {
        &[
            EmailStatus::Inbox,
            EmailStatus::Todo,
            EmailStatus::InProgress,
            EmailStatus::Done,
            EmailStatus::Snoozed,
        ]
    }

    /// Returns the canonical wire token for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Inbox => "inbox",
            EmailStatus::Todo => "todo",
            EmailStatus::InProgress => "in_progress",
            EmailStatus::Done => "done",
            EmailStatus::Snoozed => "snoozed",
        }
    }

    /// Parses a stored status leniently: empty or unknown values count as inbox.
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status token is not one of the five canonical values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for EmailStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbox" => Ok(EmailStatus::Inbox),
            "todo" => Ok(EmailStatus::Todo),
            "in_progress" => Ok(EmailStatus::InProgress),
            "done" => Ok(EmailStatus::Done),
            "snoozed" => Ok(EmailStatus::Snoozed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// An individual email as cached locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    /// Provider-assigned identifier; primary key.
    pub id: EmailId,
    /// Partition key.
    pub owner_id: OwnerId,
    pub subject: String,
    /// Plain text body.
    pub body_text: String,
    /// Short preview, or a contextual snippet for search hits.
    pub preview: String,
    /// Sender address.
    pub from: Address,
    pub received_at: DateTime<Utc>,
    /// Kanban workflow status.
    pub status: EmailStatus,
    /// Set only while `status` is `Snoozed`.
    pub deferred_until: Option<DateTime<Utc>>,
    /// Locally generated summary.
    pub summary: Option<String>,
    /// Semantic embedding, absent until generated.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub embedding: Option<Vec<f32>>,
    /// Provider labels applied to this email.
    pub labels: Vec<String>,
}

impl Email {
    /// Creates an inbox email with empty content fields.
    pub fn new(
        id: impl Into<EmailId>,
        owner_id: impl Into<OwnerId>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            subject: String::new(),
            body_text: String::new(),
            preview: String::new(),
            from: Address::new(""),
            received_at,
            status: EmailStatus::Inbox,
            deferred_until: None,
            summary: None,
            embedding: None,
            labels: Vec::new(),
        }
    }

    /// Sets the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain text body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body_text = body.into();
        self
    }

    /// Sets the sender.
    pub fn with_from(mut self, from: Address) -> Self {
        self.from = from;
        self
    }

    /// Sets the labels.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the email carries the trash label.
    pub fn is_trashed(&self) -> bool {
        self.labels.iter().any(|l| l == system_labels::TRASH)
    }

    /// Text used to compute the semantic embedding.
    ///
    /// Subject and body joined by a space, falling back to the preview when blank.
    pub fn embedding_text(&self) -> String {
        let text = format!("{} {}", self.subject, self.body_text);
        if text.trim().is_empty() {
            self.preview.clone()
        } else {
            text
        }
    }
}

/// An email address with optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Email address.
    pub email: String,
    /// Display name (e.g., "John Doe").
    pub name: Option<String>,
}

impl Address {
    /// Creates a new address with just an email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Creates a new address with email and display name.
    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }

    /// Returns the display name if present and non-empty, otherwise the address.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }

    /// Parses a header value like `"Name" <email@example.com>`.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if let (Some(start), Some(end)) = (value.find('<'), value.rfind('>')) {
            if start < end {
                let email = value[start + 1..end].trim().to_string();
                let name = value[..start].trim().trim_matches('"').trim().to_string();
                return Self {
                    email,
                    name: if name.is_empty() { None } else { Some(name) },
                };
            }
        }
        Self::new(value)
    }
}
