//! Provider label names the engine relies on.

/// Well-known system label names.
pub mod system_labels {
    /// Inbox label.
    pub const INBOX: &str = "INBOX";

    /// Starred label.
    pub const STARRED: &str = "STARRED";

    /// Unread label.
    pub const UNREAD: &str = "UNREAD";

    /// Important label.
    pub const IMPORTANT: &str = "IMPORTANT";

    /// Trash label. Trashed records are excluded from every search and board view.
    pub const TRASH: &str = "TRASH";
}
