// src/services/mod.rs

//! Service layer for the Fandom endpoints.
//!
//! - `activity`: HTTP adapters for recent changes, discussion posts, threads
//! - `parse`: JSON payload parsing shared by the adapters

mod activity;
pub(crate) mod parse;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChangeEvent, Community, DiscussionThread, PostEvent, UserRef};

pub use activity::{ActivityService, ChangeQuery};

/// The event feeds an activity monitor polls.
///
/// [`ActivityService`] is the HTTP implementation; tests substitute
/// in-memory sources.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// The community this source reads from.
    fn community(&self) -> &Arc<Community>;

    /// Recent wiki changes matching the query, oldest first.
    async fn recent_changes(&self, query: &ChangeQuery) -> Result<Vec<ChangeEvent>>;

    /// Recent forum posts, oldest first.
    async fn forum_posts(&self, author: Option<&UserRef>, limit: u32) -> Result<Vec<PostEvent>>;

    /// Recent message-wall posts, oldest first.
    async fn wall_posts(&self, author: Option<&UserRef>, limit: u32) -> Result<Vec<PostEvent>>;

    /// Recent article comments, oldest first.
    async fn article_comments(
        &self,
        author: Option<&UserRef>,
        limit: u32,
    ) -> Result<Vec<PostEvent>>;

    /// Fetch a full thread by its ID.
    async fn fetch_thread(&self, thread_id: u64) -> Result<DiscussionThread>;
}
