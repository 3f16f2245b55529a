use std::cmp::Reverse;

use chrono::{DateTime, Utc};

use super::domain::{ItemId, MaintenanceTicket, TicketId};

pub fn new_ticket(
    id: TicketId,
    item_id: ItemId,
    description: &str,
    now: DateTime<Utc>,
) -> MaintenanceTicket {
    MaintenanceTicket {
        id,
        item_id,
        description: description.trim().to_string(),
        resolved: false,
        resolved_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Mark resolved. Returns `false` when the ticket was already resolved and nothing changed.
pub fn resolve(ticket: &mut MaintenanceTicket, now: DateTime<Utc>) -> bool {
    if ticket.resolved {
        return false;
    }
    ticket.resolved = true;
    ticket.resolved_at = Some(now);
    ticket.updated_at = now;
    true
}

/// Reopen and clear the resolution timestamp. Returns `false` when already open.
pub fn reopen(ticket: &mut MaintenanceTicket, now: DateTime<Utc>) -> bool {
    if !ticket.resolved {
        return false;
    }
    ticket.resolved = false;
    ticket.resolved_at = None;
    ticket.updated_at = now;
    true
}

/// Open tickets first, then resolved; newest-created first within each group.
pub fn order_for_display(tickets: &mut [MaintenanceTicket]) {
    tickets.sort_by_key(|ticket| (ticket.resolved, Reverse(ticket.created_at)));
}

pub fn open_count(tickets: &[MaintenanceTicket]) -> usize {
    tickets.iter().filter(|ticket| !ticket.resolved).count()
}
