// src/models/thread.rs

//! Discussion threads and the lazy handle posts carry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::models::PostAuthor;
use crate::services::ActivitySource;

/// A discussion thread with its posts in position order.
#[derive(Debug, Clone)]
pub struct DiscussionThread {
    pub id: u64,
    /// Title of the opening post, absent for untitled threads
    pub title: Option<String>,
    pub author: PostAuthor,
    pub created_at: DateTime<Utc>,
    /// Containing forum, wall, or article container
    pub forum_id: u64,
    pub forum_name: String,
    pub funnel: Option<String>,
    pub trending_score: f64,
    pub upvote_count: u32,
    /// Posts the thread reports, opening post first
    pub posts: Vec<ThreadPost>,
}

impl DiscussionThread {
    /// Post at the given thread position, if the thread carries it.
    pub fn post_at(&self, position: u32) -> Option<&ThreadPost> {
        self.posts.iter().find(|post| post.position == position)
    }
}

/// One post inside a thread.
#[derive(Debug, Clone)]
pub struct ThreadPost {
    pub id: u64,
    pub author: PostAuthor,
    pub created_at: DateTime<Utc>,
    pub position: u32,
    pub upvote_count: u32,
    pub title: Option<String>,
    /// Raw post content, when the API exposes it
    pub content: Option<String>,
}

/// Lazily resolved reference to the thread containing a post.
///
/// Post events carry only the thread ID; the full thread is fetched on first
/// access and cached. Clones share the cache, so once any clone resolved the
/// thread every clone returns the same `Arc` without refetching.
#[derive(Debug, Clone)]
pub struct ThreadHandle {
    thread_id: u64,
    cell: Arc<OnceCell<Arc<DiscussionThread>>>,
}

impl ThreadHandle {
    /// Create an unresolved handle.
    pub fn new(thread_id: u64) -> Self {
        Self {
            thread_id,
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// ID of the referenced thread.
    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    /// Thread data, if some caller already resolved it.
    pub fn cached(&self) -> Option<Arc<DiscussionThread>> {
        self.cell.get().cloned()
    }

    /// Resolve the thread, fetching it through `source` on first access.
    ///
    /// A failed fetch leaves the handle unresolved, so a later call retries.
    pub async fn resolve(&self, source: &dyn ActivitySource) -> Result<Arc<DiscussionThread>> {
        self.cell
            .get_or_try_init(|| async {
                source.fetch_thread(self.thread_id).await.map(Arc::new)
            })
            .await
            .map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::models::{ChangeEvent, Community, PostEvent, SiteInfo, UserRef};
    use crate::services::ChangeQuery;

    fn sample_author() -> PostAuthor {
        PostAuthor {
            id: 11,
            name: "Katara".to_string(),
            avatar_url: None,
        }
    }

    fn sample_thread(id: u64) -> DiscussionThread {
        DiscussionThread {
            id,
            title: Some("Ideas".to_string()),
            author: sample_author(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
            forum_id: 5,
            forum_name: "General".to_string(),
            funnel: None,
            trending_score: 0.0,
            upvote_count: 2,
            posts: vec![
                ThreadPost {
                    id: 100,
                    author: sample_author(),
                    created_at: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
                    position: 1,
                    upvote_count: 2,
                    title: Some("Ideas".to_string()),
                    content: Some("first".to_string()),
                },
                ThreadPost {
                    id: 101,
                    author: sample_author(),
                    created_at: Utc.timestamp_opt(1_700_000_100, 0).single().unwrap(),
                    position: 2,
                    upvote_count: 0,
                    title: None,
                    content: Some("second".to_string()),
                },
            ],
        }
    }

    struct CountingSource {
        community: Arc<Community>,
        fetches: AtomicU32,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                community: Arc::new(
                    Community::new("test.fandom.com", SiteInfo::default()).unwrap(),
                ),
                fetches: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ActivitySource for CountingSource {
        fn community(&self) -> &Arc<Community> {
            &self.community
        }

        async fn recent_changes(&self, _query: &ChangeQuery) -> Result<Vec<ChangeEvent>> {
            Ok(Vec::new())
        }

        async fn forum_posts(
            &self,
            _author: Option<&UserRef>,
            _limit: u32,
        ) -> Result<Vec<PostEvent>> {
            Ok(Vec::new())
        }

        async fn wall_posts(
            &self,
            _author: Option<&UserRef>,
            _limit: u32,
        ) -> Result<Vec<PostEvent>> {
            Ok(Vec::new())
        }

        async fn article_comments(
            &self,
            _author: Option<&UserRef>,
            _limit: u32,
        ) -> Result<Vec<PostEvent>> {
            Ok(Vec::new())
        }

        async fn fetch_thread(&self, thread_id: u64) -> Result<DiscussionThread> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(sample_thread(thread_id))
        }
    }

    #[test]
    fn test_post_at_finds_position() {
        let thread = sample_thread(9);
        assert_eq!(thread.post_at(2).unwrap().id, 101);
        assert!(thread.post_at(3).is_none());
    }

    #[tokio::test]
    async fn test_resolve_fetches_once_and_shares_cache() {
        let source = CountingSource::new();
        let handle = ThreadHandle::new(9);
        let clone = handle.clone();

        assert!(handle.cached().is_none());

        let first = handle.resolve(&source).await.unwrap();
        let second = clone.resolve(&source).await.unwrap();

        assert_eq!(first.id, 9);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(clone.cached().unwrap().id, 9);
    }
}
