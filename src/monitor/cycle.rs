// src/monitor/cycle.rs

//! One poll cycle: fetch every feed, merge, and apply the watermark.

use chrono::{DateTime, Utc};

use crate::error::FandomError;
use crate::models::{ActivityEvent, MonitorConfig};
use crate::monitor::merge::{filter_seen, merge_ascending};
use crate::services::{ActivitySource, ChangeQuery};

/// Result of one poll cycle.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    /// Events newer than the watermark, oldest first
    pub events: Vec<ActivityEvent>,
    /// Feeds that failed this cycle
    pub errors: Vec<FandomError>,
}

impl CycleOutcome {
    /// Whether every feed reported successfully.
    pub fn clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Fetch all feeds once and merge everything not yet covered by `watermark`.
///
/// The four feeds are polled concurrently. A failed feed contributes an
/// empty batch and its error; events from the surviving feeds still flow,
/// and the caller keeps the watermark in place so the failed feed's events
/// are retried next cycle.
pub async fn run_cycle(
    source: &dyn ActivitySource,
    config: &MonitorConfig,
    watermark: Option<DateTime<Utc>>,
) -> CycleOutcome {
    let query = ChangeQuery {
        stop_at: watermark,
        limit: config.change_limit,
        ..ChangeQuery::default()
    };
    let (changes, forum, wall, comments) = tokio::join!(
        source.recent_changes(&query),
        source.forum_posts(None, config.post_limit),
        source.wall_posts(None, config.post_limit),
        source.article_comments(None, config.post_limit),
    );

    let mut outcome = CycleOutcome::default();
    let changes = unwrap_batch(changes, "recent changes", &mut outcome.errors);
    let forum = unwrap_batch(forum, "forum posts", &mut outcome.errors);
    let wall = unwrap_batch(wall, "wall posts", &mut outcome.errors);
    let comments = unwrap_batch(comments, "article comments", &mut outcome.errors);

    let mut batches: Vec<Vec<ActivityEvent>> = Vec::with_capacity(4);
    batches.push(changes.into_iter().map(ActivityEvent::Change).collect());
    batches.push(forum.into_iter().map(ActivityEvent::Post).collect());
    batches.push(wall.into_iter().map(ActivityEvent::Post).collect());
    batches.push(comments.into_iter().map(ActivityEvent::Post).collect());

    let merged = merge_ascending(batches, ActivityEvent::timestamp);
    outcome.events = filter_seen(merged, watermark, ActivityEvent::timestamp);
    outcome
}

fn unwrap_batch<T>(
    result: crate::error::Result<Vec<T>>,
    feed: &str,
    errors: &mut Vec<FandomError>,
) -> Vec<T> {
    match result {
        Ok(batch) => batch,
        Err(e) => {
            log::warn!("Feed {feed} failed this cycle: {e}");
            errors.push(e);
            Vec::new()
        }
    }
}
