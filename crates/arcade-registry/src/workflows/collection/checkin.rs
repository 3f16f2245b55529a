use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ApprovalStatus, CheckInRecord, CheckInRequest, Item, ItemId};
use super::intake::{clean_text, IntakeGuard};
use super::lifecycle::{RuleError, TransitionError};

/// Record physical receipt of an approved machine.
///
/// Re-running the check-in replaces the previous verification record wholesale.
pub fn check_in(
    item: &mut Item,
    request: CheckInRequest,
    staff: &str,
    now: DateTime<Utc>,
) -> Result<(), RuleError> {
    IntakeGuard.check_check_in(&request)?;

    let status = item.approval_status();
    if status != ApprovalStatus::Approved {
        return Err(TransitionError {
            entity: "check-in",
            from: item.status_label(),
            to: "checked in",
        }
        .into());
    }

    item.zone = Some(request.zone.trim().to_string());
    item.check_in = Some(CheckInRecord {
        has_key: request.has_key,
        working_condition: request.working_condition,
        notes: clean_text(request.notes),
        checked_in_at: now,
        checked_in_by: staff.to_string(),
    });
    item.updated_at = now;
    Ok(())
}

/// Case-insensitive match on machine name, owner name, or owner email.
pub fn matches_query(item: &Item, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [&item.name, &item.owner.name, &item.owner.email]
        .iter()
        .any(|haystack| haystack.to_lowercase().contains(&needle))
}

/// Row shown on the staff check-in desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInQueueEntry {
    pub item_id: ItemId,
    pub name: String,
    pub owner_name: String,
    pub status: &'static str,
    pub zone: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl From<&Item> for CheckInQueueEntry {
    fn from(item: &Item) -> Self {
        Self {
            item_id: item.id.clone(),
            name: item.name.clone(),
            owner_name: item.owner.name.clone(),
            status: item.status_label(),
            zone: item.zone.clone(),
            checked_in_at: item.check_in.as_ref().map(|record| record.checked_in_at),
        }
    }
}

/// Approved machines, awaiting ones first, each group alphabetical by name.
pub fn check_in_queue<'a>(items: impl IntoIterator<Item = &'a Item>) -> Vec<CheckInQueueEntry> {
    let mut approved: Vec<&Item> = items
        .into_iter()
        .filter(|item| item.approval_status() == ApprovalStatus::Approved)
        .collect();
    approved.sort_by(|left, right| {
        left.checked_in()
            .cmp(&right.checked_in())
            .then_with(|| left.name.to_lowercase().cmp(&right.name.to_lowercase()))
    });
    approved.into_iter().map(CheckInQueueEntry::from).collect()
}
