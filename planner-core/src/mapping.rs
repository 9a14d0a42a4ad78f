//! Turning an authoritative list-today response into local items.

use crate::models::{TaskId, TaskItem, TaskStatus, TimeSlot};
use crate::protocol::RemoteTaskRecord;

/// Maps remote records in order. Records without an id get a placeholder
/// `Pending(position + 1)` token so they can still be shown, offset past any
/// placeholder the records already carry as a non-positive id.
pub fn map_remote_records(records: &[RemoteTaskRecord]) -> Vec<TaskItem> {
    let offset = records
        .iter()
        .filter_map(|record| record.id.map(TaskId::from_raw))
        .filter_map(|id| match id {
            TaskId::Pending(token) => Some(token),
            TaskId::Confirmed(_) => None,
        })
        .max()
        .unwrap_or(0);

    records
        .iter()
        .enumerate()
        .map(|(idx, record)| map_remote_record(offset + idx as u64 + 1, record))
        .collect()
}

fn map_remote_record(placeholder: u64, record: &RemoteTaskRecord) -> TaskItem {
    let id = match record.id {
        Some(id) => TaskId::from_raw(id),
        None => TaskId::Pending(placeholder),
    };

    let done = record
        .status
        .as_deref()
        .and_then(|s| s.parse::<TaskStatus>().ok())
        .is_some_and(|s| s.is_done());

    let time_slot = match (record.start_time.as_deref(), record.end_time.as_deref()) {
        (Some(start), Some(end)) => {
            let slot = TimeSlot::parse(start, end);
            if slot.is_none() {
                tracing::debug!(
                    "Ignoring unparseable time slot {:?}..{:?} on remote task {}",
                    start,
                    end,
                    id
                );
            }
            slot
        }
        _ => None,
    };

    TaskItem {
        id,
        title: record.title.clone().unwrap_or_default(),
        done,
        time_slot,
        completed_at: None,
    }
}

/// An empty authoritative list does not override a non-empty local entry
/// for the same date.
///
/// This cannot tell a day the user emptied remotely from a transient empty
/// response; both keep showing the cached entry.
pub fn prefer_cached(mapped: Vec<TaskItem>, cached: &[TaskItem]) -> Vec<TaskItem> {
    if mapped.is_empty() && !cached.is_empty() {
        cached.to_vec()
    } else {
        mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn record(id: Option<i64>, title: &str, status: Option<&str>) -> RemoteTaskRecord {
        RemoteTaskRecord {
            id,
            title: Some(title.to_string()),
            status: status.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_ids_become_positional_placeholders() {
        let items = map_remote_records(&[
            record(Some(10), "Vocabulary 50 words", None),
            record(None, "History textbook", None),
            record(None, "Math wrong-answer notes", None),
        ]);

        assert_eq!(items[0].id, TaskId::Confirmed(10));
        assert_eq!(items[1].id, TaskId::Pending(2));
        assert_eq!(items[2].id, TaskId::Pending(3));
    }

    #[test]
    fn test_positional_placeholders_skip_wire_placeholders() {
        let items = map_remote_records(&[
            record(Some(-2), "Draft from another device", None),
            record(None, "History textbook", None),
            record(Some(0), "Zero id", None),
        ]);

        assert_eq!(items[0].id, TaskId::Pending(2));
        assert_eq!(items[1].id, TaskId::Pending(4));
        assert_eq!(items[2].id, TaskId::Pending(0));

        let ids: std::collections::HashSet<TaskId> = items.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_only_completed_status_means_done() {
        let items = map_remote_records(&[
            record(Some(1), "a", Some("COMPLETED")),
            record(Some(2), "b", Some("NOT_COMPLETED")),
            record(Some(3), "c", Some("IN_PROGRESS")),
            record(Some(4), "d", None),
        ]);
        let done: Vec<bool> = items.iter().map(|t| t.done).collect();
        assert_eq!(done, vec![true, false, false, false]);
    }

    #[test]
    fn test_time_slot_needs_both_endpoints() {
        let mut both = record(Some(1), "a", None);
        both.start_time = Some("2026-02-02T14:00:00".to_string());
        both.end_time = Some("2026-02-02T15:30:00".to_string());

        let mut start_only = record(Some(2), "b", None);
        start_only.start_time = Some("14:00".to_string());

        let items = map_remote_records(&[both, start_only]);
        let slot = items[0].time_slot.expect("slot mapped");
        assert_eq!(slot.start_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(slot.end_time, NaiveTime::from_hms_opt(15, 30, 0).unwrap());
        assert_eq!(items[1].time_slot, None);
    }

    #[test]
    fn test_prefer_cached_only_when_authoritative_is_empty() {
        let cached = vec![TaskItem::new(TaskId::Pending(1), "local work")];
        let remote = vec![TaskItem::new(TaskId::Confirmed(9), "server work")];

        assert_eq!(prefer_cached(Vec::new(), &cached), cached);
        assert_eq!(prefer_cached(remote.clone(), &cached), remote);
        assert!(prefer_cached(Vec::new(), &[]).is_empty());
    }
}
