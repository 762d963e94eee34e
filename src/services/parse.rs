// src/services/parse.rs

//! JSON payload parsing for the Fandom endpoints.
//!
//! Batch parsers are lenient per record: a malformed array element is logged
//! and skipped so one broken record never drops a whole batch. A payload
//! missing its top-level structure fails the batch as a whole. The remote
//! reports batches newest first; parsers hand them back oldest first.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::{FandomError, Result};
use crate::models::{
    ChangeEvent, ChangeKind, Community, DiscussionThread, EventEnvelope, LogAction, LogDetail,
    LogEntry, LogKind, PollChoice, PostAuthor, PostEvent, PostKind, ProtectionDetail, SiteInfo,
    ThreadHandle, ThreadPost, UserRef,
};

fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    value
        .get(key)
        .ok_or_else(|| FandomError::record(key, "missing field"))
}

fn str_field<'a>(value: &'a Value, key: &str) -> Result<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| FandomError::record(key, "expected a string"))
}

fn u64_field(value: &Value, key: &str) -> Result<u64> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| FandomError::record(key, "expected an unsigned integer"))
}

fn u32_field(value: &Value, key: &str) -> Result<u32> {
    let raw = u64_field(value, key)?;
    u32::try_from(raw).map_err(|_| FandomError::record(key, "value out of range"))
}

/// Discussion endpoints encode numeric IDs as strings.
fn id_field(value: &Value, key: &str) -> Result<u64> {
    let raw = str_field(value, key)?;
    raw.parse()
        .map_err(|_| FandomError::record(key, format!("invalid numeric string {raw:?}")))
}

fn opt_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Wiki endpoints report instants as ISO 8601 strings.
fn timestamp_field(value: &Value, key: &str) -> Result<DateTime<Utc>> {
    let raw = str_field(value, key)?;
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| FandomError::record(key, e))
}

/// Discussion endpoints report instants as `{ "epochSecond": n }` objects.
fn epoch_field(value: &Value, key: &str) -> Result<DateTime<Utc>> {
    let secs = field(value, key)?
        .get("epochSecond")
        .and_then(Value::as_i64)
        .ok_or_else(|| FandomError::record(key, "missing epochSecond"))?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| FandomError::record(key, "epoch seconds out of range"))
}

/// Parse a siteinfo payload.
pub(crate) fn site_info(payload: &Value) -> Result<SiteInfo> {
    let general = payload
        .get("query")
        .and_then(|q| q.get("general"))
        .ok_or_else(|| FandomError::record("siteinfo", "missing query.general object"))?;
    Ok(SiteInfo {
        site_name: str_field(general, "sitename")?.to_string(),
        server_name: str_field(general, "servername")?.to_string(),
        language: opt_str(general, "lang").unwrap_or_else(default_language),
        logo_url: opt_str(general, "logo"),
        main_page: opt_str(general, "mainpage"),
        time_zone: opt_str(general, "timezone"),
        generator: opt_str(general, "generator"),
    })
}

fn default_language() -> String {
    "en".to_string()
}

/// Parse a `list=users` payload into a user reference.
pub(crate) fn user(payload: &Value, name: &str) -> Result<UserRef> {
    let users = payload
        .get("query")
        .and_then(|q| q.get("users"))
        .and_then(Value::as_array)
        .ok_or_else(|| FandomError::record("users", "missing query.users array"))?;
    // A nonexistent user still yields one entry, flagged and without an ID.
    let entry = users
        .first()
        .ok_or_else(|| FandomError::not_found(format!("user {name:?}")))?;
    let id = entry
        .get("userid")
        .and_then(Value::as_u64)
        .ok_or_else(|| FandomError::not_found(format!("user {name:?}")))?;
    let reported = entry.get("name").and_then(Value::as_str).unwrap_or(name);
    Ok(UserRef {
        id,
        name: reported.to_string(),
    })
}

/// Parse a `list=recentchanges` payload into ascending change events.
pub(crate) fn change_batch(community: &Arc<Community>, payload: &Value) -> Result<Vec<ChangeEvent>> {
    let rows = payload
        .get("query")
        .and_then(|q| q.get("recentchanges"))
        .and_then(Value::as_array)
        .ok_or_else(|| FandomError::record("recentchanges", "missing query.recentchanges array"))?;
    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        match change_event(community, row) {
            Ok(event) => events.push(event),
            Err(e) => log::warn!("Skipping malformed recent change: {e}"),
        }
    }
    events.reverse();
    Ok(events)
}

fn change_event(community: &Arc<Community>, row: &Value) -> Result<ChangeEvent> {
    let envelope = EventEnvelope {
        actor: opt_str(row, "user").unwrap_or_default(),
        title: opt_str(row, "title"),
        summary: opt_str(row, "comment"),
        timestamp: timestamp_field(row, "timestamp")?,
        id: u64_field(row, "rcid")?,
        community: Arc::clone(community),
    };
    let kind = match str_field(row, "type")? {
        "edit" => ChangeKind::Edit {
            old_len: u64_field(row, "oldlen")?,
            new_len: u64_field(row, "newlen")?,
        },
        "new" => ChangeKind::Created {
            len: u64_field(row, "newlen")?,
        },
        "log" => log_entry(row)?,
        _ => ChangeKind::Unknown,
    };
    Ok(ChangeEvent {
        envelope,
        page_id: row.get("pageid").and_then(Value::as_u64).unwrap_or_default(),
        new_revision_id: row.get("revid").and_then(Value::as_u64).unwrap_or_default(),
        old_revision_id: row
            .get("old_revid")
            .and_then(Value::as_u64)
            .unwrap_or_default(),
        tags: string_array(row.get("tags")),
        kind,
    })
}

fn log_entry(row: &Value) -> Result<ChangeKind> {
    let log_type = match row.get("logtype").and_then(Value::as_str) {
        Some(log_type) => log_type,
        None => return Ok(ChangeKind::Unknown),
    };
    let detail = match log_type {
        "upload" => LogDetail::Upload {
            img_sha1: str_field(field(row, "logparams")?, "img_sha1")?.to_string(),
        },
        "move" => LogDetail::Move {
            target_title: str_field(field(row, "logparams")?, "target_title")?.to_string(),
        },
        "delete" => LogDetail::Delete,
        "protect" => LogDetail::Protect {
            details: protection_details(field(row, "logparams")?),
        },
        "block" => {
            let params = field(row, "logparams")?;
            LogDetail::Block {
                duration: str_field(params, "duration")?.to_string(),
                expiry: opt_str(params, "expiry").unwrap_or_else(|| "NEVER".to_string()),
                flags: string_array(params.get("flags")),
            }
        }
        _ => return Ok(ChangeKind::Unknown),
    };
    Ok(ChangeKind::Log(LogEntry {
        log_id: u64_field(row, "logid")?,
        action: row
            .get("logaction")
            .and_then(Value::as_str)
            .and_then(LogAction::parse),
        detail,
    }))
}

fn protection_details(params: &Value) -> Vec<ProtectionDetail> {
    params
        .get("details")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(ProtectionDetail {
                        kind: item.get("type").and_then(Value::as_str).and_then(LogKind::parse),
                        level: item.get("level").and_then(Value::as_str)?.to_string(),
                        expiry: item.get("expiry").and_then(Value::as_str)?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn embedded_posts(payload: &Value) -> Result<&Vec<Value>> {
    payload
        .get("_embedded")
        .and_then(|e| e.get("doc:posts"))
        .and_then(Value::as_array)
        .ok_or_else(|| FandomError::record("doc:posts", "missing _embedded posts array"))
}

/// IDs of the posts in a `getPosts` payload, newest first as reported.
pub(crate) fn post_ids(payload: &Value) -> Result<Vec<u64>> {
    let rows = embedded_posts(payload)?;
    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        match id_field(row, "id") {
            Ok(id) => ids.push(id),
            Err(e) => log::warn!("Skipping post with unusable ID: {e}"),
        }
    }
    Ok(ids)
}

/// Fields shared by every post record.
struct PostCore {
    envelope: EventEnvelope,
    author: PostAuthor,
    site_id: u64,
    latest_revision_id: u64,
    position: u32,
    upvote_count: u32,
    thread: ThreadHandle,
}

impl PostCore {
    fn into_event(self, kind: PostKind) -> PostEvent {
        PostEvent {
            envelope: self.envelope,
            author: self.author,
            site_id: self.site_id,
            latest_revision_id: self.latest_revision_id,
            position: self.position,
            upvote_count: self.upvote_count,
            thread: self.thread,
            kind,
        }
    }
}

fn post_core(community: &Arc<Community>, row: &Value) -> Result<PostCore> {
    let author = post_author(field(row, "createdBy")?)?;
    let envelope = EventEnvelope {
        actor: author.name.clone(),
        title: opt_str(row, "title"),
        summary: opt_str(row, "rawContent"),
        timestamp: epoch_field(row, "creationDate")?,
        id: id_field(row, "id")?,
        community: Arc::clone(community),
    };
    Ok(PostCore {
        envelope,
        author,
        site_id: id_field(row, "siteId")?,
        latest_revision_id: id_field(row, "latestRevisionId")?,
        position: u32_field(row, "position")?,
        upvote_count: u32_field(row, "upvoteCount")?,
        thread: ThreadHandle::new(id_field(row, "threadId")?),
    })
}

fn post_author(value: &Value) -> Result<PostAuthor> {
    Ok(PostAuthor {
        id: id_field(value, "id")?,
        name: str_field(value, "name")?.to_string(),
        avatar_url: opt_str(value, "avatarUrl"),
    })
}

/// Parse a wall `getPosts` payload into ascending post events.
///
/// Wall posts join against the `wallOwners` sidecar; a post whose wall has
/// no owner entry is skipped.
pub(crate) fn wall_post_batch(
    community: &Arc<Community>,
    payload: &Value,
) -> Result<Vec<PostEvent>> {
    let embedded = payload
        .get("_embedded")
        .ok_or_else(|| FandomError::record("wall posts", "missing _embedded object"))?;
    let owners: HashMap<u64, u64> = embedded
        .get("wallOwners")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let wall = row
                        .get("wallContainerId")
                        .and_then(Value::as_str)?
                        .parse()
                        .ok()?;
                    let owner = row.get("userId").and_then(Value::as_str)?.parse().ok()?;
                    Some((wall, owner))
                })
                .collect()
        })
        .unwrap_or_default();
    let rows = embedded
        .get("doc:posts")
        .and_then(Value::as_array)
        .ok_or_else(|| FandomError::record("doc:posts", "missing _embedded posts array"))?;
    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        match wall_post(community, row, &owners) {
            Ok(event) => events.push(event),
            Err(e) => log::warn!("Skipping malformed wall post: {e}"),
        }
    }
    events.reverse();
    Ok(events)
}

fn wall_post(
    community: &Arc<Community>,
    row: &Value,
    owners: &HashMap<u64, u64>,
) -> Result<PostEvent> {
    let core = post_core(community, row)?;
    let wall_id = id_field(row, "forumId")?;
    let wall_owner_id = owners
        .get(&wall_id)
        .copied()
        .ok_or_else(|| FandomError::record("wallOwners", format!("no owner for wall {wall_id}")))?;
    let wall_name = str_field(row, "forumName")?.to_string();
    Ok(core.into_event(PostKind::Wall {
        wall_id,
        wall_owner_id,
        wall_name,
    }))
}

/// Parse an article-comment `getPosts` payload into ascending post events.
pub(crate) fn comment_batch(
    community: &Arc<Community>,
    payload: &Value,
) -> Result<Vec<PostEvent>> {
    let rows = embedded_posts(payload)?;
    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        match comment_post(community, row) {
            Ok(event) => events.push(event),
            Err(e) => log::warn!("Skipping malformed article comment: {e}"),
        }
    }
    events.reverse();
    Ok(events)
}

fn comment_post(community: &Arc<Community>, row: &Value) -> Result<PostEvent> {
    let core = post_core(community, row)?;
    let page_id = id_field(row, "forumId")?;
    let funnel = opt_str(row, "funnel");
    Ok(core.into_event(PostKind::ArticleComment { page_id, funnel }))
}

/// Parse a single `getPost` payload, classifying poll, reply, or plain post.
pub(crate) fn single_post(community: &Arc<Community>, payload: &Value) -> Result<PostEvent> {
    let core = post_core(community, payload)?;
    if let Some(poll) = payload.get("poll") {
        let choices = poll
            .get("answers")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().filter_map(poll_choice).collect())
            .unwrap_or_default();
        return Ok(core.into_event(PostKind::Poll {
            poll_id: u64_field(poll, "id")?,
            total_votes: u32_field(poll, "totalVotes")?,
            choices,
        }));
    }
    if core.position > 1 {
        return Ok(core.into_event(PostKind::Reply));
    }
    Ok(core.into_event(PostKind::Forum))
}

fn poll_choice(row: &Value) -> Option<PollChoice> {
    Some(PollChoice {
        id: row.get("id").and_then(Value::as_u64)?,
        text: opt_str(row, "text"),
        votes: u32::try_from(row.get("votes").and_then(Value::as_u64)?).ok()?,
        image_url: opt_str(row, "image"),
        position: u32::try_from(row.get("position").and_then(Value::as_u64)?).ok()?,
    })
}

/// Parse a `getThread` or `getThreadByPostId` payload.
pub(crate) fn thread(payload: &Value) -> Result<DiscussionThread> {
    let author = post_author(field(payload, "createdBy")?)?;
    let mut posts = Vec::new();
    if let Some(embedded) = payload.get("_embedded") {
        // The opening post rides in its own one-element array.
        if let Some(first) = embedded
            .get("firstPost")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
        {
            match thread_post(first) {
                Ok(post) => posts.push(post),
                Err(e) => log::warn!("Skipping malformed thread post: {e}"),
            }
        }
        if let Some(rows) = embedded.get("doc:posts").and_then(Value::as_array) {
            for row in rows {
                match thread_post(row) {
                    Ok(post) => posts.push(post),
                    Err(e) => log::warn!("Skipping malformed thread post: {e}"),
                }
            }
        }
    }
    posts.sort_by_key(|post| post.position);
    Ok(DiscussionThread {
        id: id_field(payload, "id")?,
        title: opt_str(payload, "title"),
        author,
        created_at: epoch_field(payload, "creationDate")?,
        forum_id: id_field(payload, "forumId")?,
        forum_name: str_field(payload, "forumName")?.to_string(),
        funnel: opt_str(payload, "funnel"),
        trending_score: payload
            .get("trendingScore")
            .and_then(Value::as_f64)
            .unwrap_or_default(),
        upvote_count: u32_field(payload, "upvoteCount")?,
        posts,
    })
}

fn thread_post(row: &Value) -> Result<ThreadPost> {
    Ok(ThreadPost {
        id: id_field(row, "id")?,
        author: post_author(field(row, "createdBy")?)?,
        created_at: epoch_field(row, "creationDate")?,
        position: u32_field(row, "position")?,
        upvote_count: u32_field(row, "upvoteCount")?,
        title: opt_str(row, "title"),
        content: opt_str(row, "rawContent"),
    })
}
