// src/services/activity.rs

//! HTTP adapters over the Fandom activity endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use url::Url;

use crate::error::{FandomError, Result};
use crate::models::{ChangeEvent, Community, DiscussionThread, PostEvent, UserRef};
use crate::monitor::merge::merge_ascending;
use crate::services::{parse, ActivitySource};
use crate::utils;

const RC_PROPS: &str = "title|ids|sizes|flags|user|timestamp|comment|tags|loginfo";

/// Filters for a recent-changes fetch.
#[derive(Debug, Clone, Default)]
pub struct ChangeQuery {
    /// Only changes made by this user
    pub author: Option<UserRef>,
    /// Only changes on this page title
    pub page: Option<String>,
    /// Nothing older than this instant is returned
    pub stop_at: Option<DateTime<Utc>>,
    /// Maximum number of changes; 0 lets the remote pick its default
    pub limit: u32,
}

/// Reads one community's activity feeds over HTTP.
pub struct ActivityService {
    community: Arc<Community>,
    client: reqwest::Client,
}

impl ActivityService {
    /// Create a service for one community sharing the given HTTP client.
    pub fn new(community: Arc<Community>, client: reqwest::Client) -> Self {
        Self { community, client }
    }

    async fn get(&self, url: Url) -> Result<Value> {
        utils::http::get_json(&self.client, url).await
    }

    /// Recent wiki changes matching the query, oldest first.
    pub async fn recent_changes(&self, query: &ChangeQuery) -> Result<Vec<ChangeEvent>> {
        let limit = query.limit.to_string();
        let stop_at = query
            .stop_at
            .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Secs, true));
        let mut params: Vec<(&str, &str)> = vec![
            ("action", "query"),
            ("list", "recentchanges"),
            ("rcprop", RC_PROPS),
        ];
        if let Some(author) = &query.author {
            params.push(("rcuser", &author.name));
        }
        if let Some(page) = &query.page {
            params.push(("rctitle", page));
        }
        if let Some(stop_at) = &stop_at {
            params.push(("rcend", stop_at));
        }
        if query.limit > 0 {
            params.push(("rclimit", &limit));
        }
        let url = utils::api_url(&self.community.base_url, &params)?;
        let payload = self.get(url).await?;
        parse::change_batch(&self.community, &payload)
    }

    /// Recent forum posts, oldest first.
    ///
    /// The listing does not say whether a post is a poll or a reply, so each
    /// post is fetched individually for classification. Posts that fail to
    /// fetch are skipped.
    pub async fn forum_posts(
        &self,
        author: Option<&UserRef>,
        limit: u32,
    ) -> Result<Vec<PostEvent>> {
        let payload = self.post_feed("FORUM", author, limit).await?;
        let ids = parse::post_ids(&payload)?;
        let mut events = Vec::with_capacity(ids.len());
        for id in ids {
            match self.post_by_id(id).await {
                Ok(event) => events.push(event),
                Err(e) => log::warn!("Skipping forum post {id}: {e}"),
            }
        }
        events.reverse();
        Ok(events)
    }

    /// Recent message-wall posts, oldest first.
    pub async fn wall_posts(
        &self,
        author: Option<&UserRef>,
        limit: u32,
    ) -> Result<Vec<PostEvent>> {
        let payload = self.post_feed("WALL", author, limit).await?;
        parse::wall_post_batch(&self.community, &payload)
    }

    /// Recent article comments, oldest first.
    pub async fn article_comments(
        &self,
        author: Option<&UserRef>,
        limit: u32,
    ) -> Result<Vec<PostEvent>> {
        let payload = self.post_feed("ARTICLE_COMMENT", author, limit).await?;
        parse::comment_batch(&self.community, &payload)
    }

    /// All three post feeds fetched concurrently and merged, oldest first.
    pub async fn recent_posts(
        &self,
        author: Option<&UserRef>,
        forum_limit: u32,
        wall_limit: u32,
        comment_limit: u32,
    ) -> Result<Vec<PostEvent>> {
        let (forum, wall, comments) = tokio::join!(
            self.forum_posts(author, forum_limit),
            self.wall_posts(author, wall_limit),
            self.article_comments(author, comment_limit),
        );
        Ok(merge_ascending(vec![forum?, wall?, comments?], |post| {
            post.envelope.timestamp
        }))
    }

    /// Fetch one post by ID, classified as poll, reply, or plain post.
    pub async fn post_by_id(&self, post_id: u64) -> Result<PostEvent> {
        let id = post_id.to_string();
        let url = utils::wikia_url(
            &self.community.base_url,
            "DiscussionPost",
            "getPost",
            &[("postId", &id)],
        )?;
        let payload = self.get(url).await?;
        parse::single_post(&self.community, &payload)
    }

    /// Fetch a full thread by its ID.
    pub async fn thread(&self, thread_id: u64) -> Result<DiscussionThread> {
        let id = thread_id.to_string();
        let url = utils::wikia_url(
            &self.community.base_url,
            "DiscussionThread",
            "getThread",
            &[("threadId", &id), ("viewableOnly", "true"), ("limit", "100")],
        )?;
        let payload = self.get(url).await?;
        parse::thread(&payload)
    }

    /// Fetch the thread containing the given post.
    pub async fn thread_by_post(&self, post_id: u64) -> Result<DiscussionThread> {
        let id = post_id.to_string();
        let url = utils::wikia_url(
            &self.community.base_url,
            "DiscussionPermalink",
            "getThreadByPostId",
            &[("postId", &id), ("viewableOnly", "true"), ("limit", "100")],
        )?;
        let payload = self.get(url).await?;
        parse::thread(&payload)
    }

    /// Resolve a registered user by name.
    pub async fn user_by_name(&self, name: &str) -> Result<UserRef> {
        let url = utils::api_url(
            &self.community.base_url,
            &[("action", "query"), ("list", "users"), ("ususers", name)],
        )?;
        let payload = self.get(url).await?;
        parse::user(&payload, name)
    }

    async fn post_feed(
        &self,
        container: &str,
        author: Option<&UserRef>,
        limit: u32,
    ) -> Result<Value> {
        if limit == 0 || limit > 100 {
            return Err(FandomError::validation(format!(
                "post limit must be between 1 and 100, got {limit}"
            )));
        }
        let limit = limit.to_string();
        let author_id = author.map(|user| user.id.to_string());
        let mut params: Vec<(&str, &str)> =
            vec![("containerType", container), ("limit", &limit)];
        if let Some(author_id) = &author_id {
            params.push(("userId", author_id));
        }
        let url = utils::wikia_url(
            &self.community.base_url,
            "DiscussionPost",
            "getPosts",
            &params,
        )?;
        self.get(url).await
    }
}

#[async_trait]
impl ActivitySource for ActivityService {
    fn community(&self) -> &Arc<Community> {
        &self.community
    }

    async fn recent_changes(&self, query: &ChangeQuery) -> Result<Vec<ChangeEvent>> {
        self.recent_changes(query).await
    }

    async fn forum_posts(&self, author: Option<&UserRef>, limit: u32) -> Result<Vec<PostEvent>> {
        self.forum_posts(author, limit).await
    }

    async fn wall_posts(&self, author: Option<&UserRef>, limit: u32) -> Result<Vec<PostEvent>> {
        self.wall_posts(author, limit).await
    }

    async fn article_comments(
        &self,
        author: Option<&UserRef>,
        limit: u32,
    ) -> Result<Vec<PostEvent>> {
        self.article_comments(author, limit).await
    }

    async fn fetch_thread(&self, thread_id: u64) -> Result<DiscussionThread> {
        self.thread(thread_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClientConfig, SiteInfo};

    fn make_service() -> ActivityService {
        let community =
            Arc::new(Community::new("test.fandom.com", SiteInfo::default()).unwrap());
        let client = utils::http::create_client(&ClientConfig::default()).unwrap();
        ActivityService::new(community, client)
    }

    #[test]
    fn change_query_default_is_unfiltered() {
        let query = ChangeQuery::default();
        assert!(query.author.is_none());
        assert!(query.page.is_none());
        assert!(query.stop_at.is_none());
        assert_eq!(query.limit, 0);
    }

    #[tokio::test]
    async fn post_feeds_reject_out_of_range_limits() {
        let service = make_service();
        assert!(service.forum_posts(None, 0).await.is_err());
        assert!(service.wall_posts(None, 101).await.is_err());
        assert!(service.article_comments(None, 0).await.is_err());
    }
}
