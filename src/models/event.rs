// src/models/event.rs

//! Activity event model.
//!
//! Everything the monitor observes is an [`ActivityEvent`]: either a wiki
//! change from the `recentchanges` list or a discussion post from the
//! `DiscussionPost` controller. Fields shared by every event live in the
//! [`EventEnvelope`]; variant payloads hang off [`ChangeKind`] and
//! [`PostKind`].

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{Community, PostAuthor, ThreadHandle};

/// Fields shared by every activity event.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    /// Name of the acting user
    pub actor: String,

    /// Page or post title (absent for replies and untitled posts)
    pub title: Option<String>,

    /// Edit comment or raw post content
    pub summary: Option<String>,

    /// Instant the event happened
    pub timestamp: DateTime<Utc>,

    /// Source-assigned identity, unique within the event's source kind
    pub id: u64,

    /// Community the event belongs to
    pub community: Arc<Community>,
}

/// A change on the wiki side of a community.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub envelope: EventEnvelope,
    /// ID of the affected page
    pub page_id: u64,
    /// Revision created by this change (0 for log-only entries)
    pub new_revision_id: u64,
    /// Revision this change replaced (0 when there is none)
    pub old_revision_id: u64,
    /// Tags the backend attached to the change
    pub tags: Vec<String>,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// URL of the diff view for this change.
    pub fn diff_url(&self) -> String {
        format!(
            "https://{}/wiki/Special:Diff/{}",
            self.envelope.community.base_url, self.new_revision_id
        )
    }
}

/// What kind of change a [`ChangeEvent`] describes.
#[derive(Debug, Clone)]
pub enum ChangeKind {
    /// An existing page was edited
    Edit { old_len: u64, new_len: u64 },
    /// A page was created
    Created { len: u64 },
    /// An administrative log entry
    Log(LogEntry),
    /// A change type this crate does not recognize
    Unknown,
}

/// An administrative log entry attached to a recent change.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub log_id: u64,
    /// Action the backend reported, `None` when unrecognized
    pub action: Option<LogAction>,
    pub detail: LogDetail,
}

/// Log action names the backend reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAction {
    Upload,
    Move,
    Delete,
    Protect,
    Block,
    Overwrite,
    Revert,
    Modify,
}

impl LogAction {
    /// Parse the wire name of a log action.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upload" => Some(Self::Upload),
            "move" => Some(Self::Move),
            "delete" => Some(Self::Delete),
            "protect" => Some(Self::Protect),
            "block" => Some(Self::Block),
            "overwrite" => Some(Self::Overwrite),
            "revert" => Some(Self::Revert),
            "modify" => Some(Self::Modify),
            _ => None,
        }
    }
}

/// Log categories carrying structured parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Upload,
    Move,
    Delete,
    Protect,
    Block,
}

impl LogKind {
    /// Parse the wire name of a log category.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upload" => Some(Self::Upload),
            "move" => Some(Self::Move),
            "delete" => Some(Self::Delete),
            "protect" => Some(Self::Protect),
            "block" => Some(Self::Block),
            _ => None,
        }
    }
}

/// Category-specific log parameters.
#[derive(Debug, Clone)]
pub enum LogDetail {
    /// A file upload; `img_sha1` identifies the uploaded content
    Upload { img_sha1: String },
    /// A page move to `target_title`
    Move { target_title: String },
    /// A page deletion
    Delete,
    /// A protection change, one entry per restricted operation
    Protect { details: Vec<ProtectionDetail> },
    /// A user block
    Block {
        duration: String,
        expiry: String,
        flags: Vec<String>,
    },
}

/// One restricted operation within a protect log entry.
#[derive(Debug, Clone)]
pub struct ProtectionDetail {
    /// Operation being restricted, `None` when unrecognized
    pub kind: Option<LogKind>,
    /// Required user level, e.g. `sysop`
    pub level: String,
    /// When the protection expires
    pub expiry: String,
}

/// A discussion post: forum, message wall, or article comments.
#[derive(Debug, Clone)]
pub struct PostEvent {
    pub envelope: EventEnvelope,
    /// Author as reported by the discussion API
    pub author: PostAuthor,
    /// Discussion site the post belongs to
    pub site_id: u64,
    /// Latest revision of the post body
    pub latest_revision_id: u64,
    /// Position within the containing thread (1 is the thread starter)
    pub position: u32,
    pub upvote_count: u32,
    /// Lazily resolved containing thread
    pub thread: ThreadHandle,
    pub kind: PostKind,
}

/// Where a post lives and what extra payload it carries.
#[derive(Debug, Clone)]
pub enum PostKind {
    /// A plain forum post starting a thread
    Forum,
    /// A post on a user's message wall
    Wall {
        wall_id: u64,
        wall_owner_id: u64,
        wall_name: String,
    },
    /// A comment below an article
    ArticleComment {
        page_id: u64,
        funnel: Option<String>,
    },
    /// A reply within an existing thread
    Reply,
    /// A forum poll
    Poll {
        poll_id: u64,
        total_votes: u32,
        choices: Vec<PollChoice>,
    },
}

/// One answer of a poll.
#[derive(Debug, Clone)]
pub struct PollChoice {
    pub id: u64,
    pub text: Option<String>,
    pub votes: u32,
    pub image_url: Option<String>,
    pub position: u32,
}

/// Any event the activity monitor can observe.
#[derive(Debug, Clone)]
pub enum ActivityEvent {
    Change(ChangeEvent),
    Post(PostEvent),
}

impl ActivityEvent {
    /// Shared envelope of the event.
    pub fn envelope(&self) -> &EventEnvelope {
        match self {
            Self::Change(change) => &change.envelope,
            Self::Post(post) => &post.envelope,
        }
    }

    /// Instant the event happened.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.envelope().timestamp
    }

    /// Name of the acting user.
    pub fn actor(&self) -> &str {
        &self.envelope().actor
    }

    /// Source-assigned identity of the event.
    pub fn id(&self) -> u64 {
        self.envelope().id
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::SiteInfo;

    fn sample_change() -> ChangeEvent {
        let community =
            Arc::new(Community::new("avatar.fandom.com/de", SiteInfo::default()).unwrap());
        ChangeEvent {
            envelope: EventEnvelope {
                actor: "Aang".to_string(),
                title: Some("Appa".to_string()),
                summary: Some("fixed a typo".to_string()),
                timestamp: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
                id: 42,
                community,
            },
            page_id: 7,
            new_revision_id: 1234,
            old_revision_id: 1200,
            tags: vec!["mobile edit".to_string()],
            kind: ChangeKind::Edit {
                old_len: 100,
                new_len: 120,
            },
        }
    }

    #[test]
    fn test_diff_url_uses_community_base() {
        let change = sample_change();
        assert_eq!(
            change.diff_url(),
            "https://avatar.fandom.com/de/wiki/Special:Diff/1234"
        );
    }

    #[test]
    fn test_envelope_accessors() {
        let event = ActivityEvent::Change(sample_change());
        assert_eq!(event.actor(), "Aang");
        assert_eq!(event.id(), 42);
        assert_eq!(event.timestamp().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_log_action_parses_known_names() {
        assert_eq!(LogAction::parse("upload"), Some(LogAction::Upload));
        assert_eq!(LogAction::parse("revert"), Some(LogAction::Revert));
        assert_eq!(LogAction::parse("bananas"), None);
    }

    #[test]
    fn test_log_kind_is_narrower_than_action() {
        assert_eq!(LogKind::parse("block"), Some(LogKind::Block));
        assert_eq!(LogKind::parse("overwrite"), None);
    }
}
