use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Inquiry, InquiryId, Item, ItemId, MaintenanceTicket, TicketId};

/// Storage abstraction for the three record kinds so the service can be exercised in isolation.
///
/// Implementations hold no business rules. `update_item` is the one compare-and-swap: it must
/// refuse the write when the stored version differs from `expected_version`, and otherwise
/// persist the item with the version incremented.
pub trait RecordStore: Send + Sync {
    fn insert_item(&self, item: Item) -> Result<Item, RepositoryError>;
    fn update_item(&self, item: Item, expected_version: u64) -> Result<Item, RepositoryError>;
    fn fetch_item(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError>;
    fn list_items(&self) -> Result<Vec<Item>, RepositoryError>;
    fn delete_item(&self, id: &ItemId) -> Result<bool, RepositoryError>;

    fn insert_ticket(&self, ticket: MaintenanceTicket) -> Result<MaintenanceTicket, RepositoryError>;
    fn update_ticket(&self, ticket: MaintenanceTicket) -> Result<(), RepositoryError>;
    fn fetch_ticket(&self, id: &TicketId) -> Result<Option<MaintenanceTicket>, RepositoryError>;
    fn tickets_for_item(&self, item_id: &ItemId) -> Result<Vec<MaintenanceTicket>, RepositoryError>;
    fn delete_ticket(&self, id: &TicketId) -> Result<bool, RepositoryError>;
    fn delete_tickets_for_item(&self, item_id: &ItemId) -> Result<usize, RepositoryError>;

    fn insert_inquiry(&self, inquiry: Inquiry) -> Result<Inquiry, RepositoryError>;
    fn update_inquiry(&self, inquiry: Inquiry) -> Result<(), RepositoryError>;
    fn fetch_inquiry(&self, id: &InquiryId) -> Result<Option<Inquiry>, RepositoryError>;
    fn inquiries_for_item(&self, item_id: &ItemId) -> Result<Vec<Inquiry>, RepositoryError>;
    fn delete_inquiries_for_item(&self, item_id: &ItemId) -> Result<usize, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record '{0}' already exists")]
    Conflict(String),
    #[error("record '{id}' is at version {found}, expected {expected}")]
    StaleVersion { id: String, expected: u64, found: u64 },
    #[error("record '{0}' not found")]
    NotFound(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    Submission,
    Inquiry,
}

/// Payload handed to the staff notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event: NotificationEvent,
    pub item_id: ItemId,
    pub details: BTreeMap<String, String>,
}

/// Outbound staff notifications (e-mail or chat adapters). Delivery is best effort.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Object storage holding machine photos; the registry only keeps the returned URLs.
pub trait ImageStore: Send + Sync {
    fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String, ImageStoreError>;
    fn delete(&self, url: &str) -> Result<(), ImageStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ImageStoreError {
    #[error("unsupported content type '{0}'")]
    UnsupportedContentType(String),
    #[error("image '{0}' not found")]
    NotFound(String),
    #[error("object storage unavailable: {0}")]
    Unavailable(String),
}
