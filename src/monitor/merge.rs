// src/monitor/merge.rs

//! Timestamp ordering for merged event batches.

use chrono::{DateTime, Duration, Utc};

/// Merge already-ascending batches into one ascending sequence.
///
/// Each event is inserted before the first element with a strictly greater
/// timestamp, or appended when none exists. Equal timestamps keep their
/// arrival order, so batches listed earlier sort first among ties.
pub fn merge_ascending<T>(
    batches: Vec<Vec<T>>,
    timestamp: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut merged: Vec<T> = Vec::new();
    for batch in batches {
        for event in batch {
            let at = merged
                .iter()
                .position(|existing| timestamp(existing) > timestamp(&event))
                .unwrap_or(merged.len());
            merged.insert(at, event);
        }
    }
    merged
}

/// Drop events already covered by the watermark.
///
/// Strictly older events are dropped. An event sharing the watermark
/// instant is kept: with second-granular timestamps that trades occasional
/// redelivery for never losing a same-second event.
pub fn filter_seen<T>(
    events: Vec<T>,
    watermark: Option<DateTime<Utc>>,
    timestamp: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    match watermark {
        Some(mark) => events
            .into_iter()
            .filter(|event| timestamp(event) >= mark)
            .collect(),
        None => events,
    }
}

/// Watermark after delivering `events`: the last timestamp plus one second.
///
/// `None` when nothing was delivered; the watermark must not move then.
pub fn advance<T>(
    events: &[T],
    timestamp: impl Fn(&T) -> DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    events
        .last()
        .map(|event| timestamp(event) + Duration::seconds(1))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        at: DateTime<Utc>,
        tag: &'static str,
    }

    fn item(secs: i64, tag: &'static str) -> Item {
        Item {
            at: Utc.timestamp_opt(secs, 0).single().unwrap(),
            tag,
        }
    }

    fn tags(items: &[Item]) -> Vec<&'static str> {
        items.iter().map(|i| i.tag).collect()
    }

    #[test]
    fn test_merge_interleaves_batches_ascending() {
        let merged = merge_ascending(
            vec![
                vec![item(1, "c1"), item(3, "c2")],
                vec![item(2, "p1"), item(4, "p2")],
            ],
            |i| i.at,
        );
        assert_eq!(tags(&merged), vec!["c1", "p1", "c2", "p2"]);
    }

    #[test]
    fn test_merge_appends_events_newer_than_every_earlier_batch() {
        // The appended element must not be lost when nothing is greater.
        let merged = merge_ascending(
            vec![vec![item(1, "c1")], vec![item(5, "p1"), item(6, "p2")]],
            |i| i.at,
        );
        assert_eq!(tags(&merged), vec!["c1", "p1", "p2"]);
    }

    #[test]
    fn test_merge_into_empty_first_batch() {
        let merged = merge_ascending(vec![vec![], vec![item(2, "p1")]], |i| i.at);
        assert_eq!(tags(&merged), vec!["p1"]);
    }

    #[test]
    fn test_merge_keeps_arrival_order_for_equal_timestamps() {
        let merged = merge_ascending(
            vec![
                vec![item(7, "c1"), item(7, "c2")],
                vec![item(7, "p1")],
            ],
            |i| i.at,
        );
        assert_eq!(tags(&merged), vec!["c1", "c2", "p1"]);
    }

    #[test]
    fn test_filter_without_watermark_keeps_everything() {
        let events = vec![item(1, "a"), item(2, "b")];
        let kept = filter_seen(events.clone(), None, |i| i.at);
        assert_eq!(kept, events);
    }

    #[test]
    fn test_filter_drops_strictly_older_events() {
        let mark = Utc.timestamp_opt(2, 0).single().unwrap();
        let kept = filter_seen(
            vec![item(1, "old"), item(2, "edge"), item(3, "new")],
            Some(mark),
            |i| i.at,
        );
        assert_eq!(tags(&kept), vec!["edge", "new"]);
    }

    #[test]
    fn test_filter_keeps_later_events_after_an_old_one() {
        // An old change must not shadow newer events behind it.
        let mark = Utc.timestamp_opt(5, 0).single().unwrap();
        let kept = filter_seen(
            vec![item(1, "stale"), item(6, "keep1"), item(7, "keep2")],
            Some(mark),
            |i| i.at,
        );
        assert_eq!(tags(&kept), vec!["keep1", "keep2"]);
    }

    #[test]
    fn test_advance_is_last_timestamp_plus_one_second() {
        let events = vec![item(1, "a"), item(9, "b")];
        let next = advance(&events, |i| i.at).unwrap();
        assert_eq!(next, Utc.timestamp_opt(10, 0).single().unwrap());
    }

    #[test]
    fn test_advance_on_empty_is_none() {
        let events: Vec<Item> = Vec::new();
        assert_eq!(advance(&events, |i| i.at), None);
    }

    #[test]
    fn test_refilter_after_advance_drops_the_same_batch() {
        let events = vec![item(1, "a"), item(2, "b")];
        let next = advance(&events, |i| i.at);
        let redelivered = filter_seen(events, next, |i| i.at);
        assert!(redelivered.is_empty());
    }
}
