// src/models/mod.rs

//! Domain models for the Fandom client.

mod community;
mod config;
mod event;
mod thread;
mod user;

pub use community::{Community, SiteInfo};
pub use config::{ClientConfig, Config, MonitorConfig};
pub use event::{
    ActivityEvent, ChangeEvent, ChangeKind, EventEnvelope, LogAction, LogDetail, LogEntry,
    LogKind, PollChoice, PostEvent, PostKind, ProtectionDetail,
};
pub use thread::{DiscussionThread, ThreadHandle, ThreadPost};
pub use user::{PostAuthor, UserRef};
