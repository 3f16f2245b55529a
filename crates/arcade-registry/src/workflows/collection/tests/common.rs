use std::sync::{Arc, Mutex};

use axum::response::Response;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::workflows::collection::domain::{
    BuyerContact, CategoryKind, Inquiry, InquiryId, InquiryIntent, InquiryRequest, Item,
    ItemDraft, ItemId, MaintenanceTicket, OwnerContact, TicketId,
};
use crate::workflows::collection::memory::{InMemoryImageStore, InMemoryRecordStore};
use crate::workflows::collection::repository::{
    Notification, NotificationError, Notifier, RecordStore, RepositoryError,
};
use crate::workflows::collection::{collection_router, Actor, AllowListPolicy, CollectionService};

pub(super) const STAFF: &str = "staff1@arcade.test";
pub(super) const OWNER: &str = "pat@x.com";

pub(super) fn staff() -> Actor {
    Actor::identified(STAFF)
}

pub(super) fn owner() -> Actor {
    Actor::identified(OWNER)
}

pub(super) fn stranger() -> Actor {
    Actor::identified("lee@y.com")
}

pub(super) fn draft(name: &str) -> ItemDraft {
    ItemDraft {
        name: name.to_string(),
        category: Some(CategoryKind::Arcade),
        owner: OwnerContact {
            name: "Pat".to_string(),
            email: OWNER.to_string(),
            ..OwnerContact::default()
        },
        ..ItemDraft::default()
    }
}

pub(super) fn buyer() -> BuyerContact {
    BuyerContact {
        name: "Lee".to_string(),
        email: "lee@y.com".to_string(),
        phone: None,
    }
}

pub(super) fn purchase_request() -> InquiryRequest {
    InquiryRequest {
        buyer: buyer(),
        intent: InquiryIntent::Purchase,
        amount: None,
        message: None,
    }
}

pub(super) fn offer_request(amount: i64) -> InquiryRequest {
    InquiryRequest {
        buyer: buyer(),
        intent: InquiryIntent::Offer,
        amount: Some(Decimal::new(amount, 0)),
        message: Some("Would you take this?".to_string()),
    }
}

pub(super) type MemoryService<S = InMemoryRecordStore, N = RecordingNotifier> =
    CollectionService<S, N, InMemoryImageStore>;

pub(super) struct Harness<S = InMemoryRecordStore, N = RecordingNotifier> {
    pub(super) service: MemoryService<S, N>,
    pub(super) store: Arc<S>,
    pub(super) notifier: Arc<N>,
    pub(super) images: Arc<InMemoryImageStore>,
}

pub(super) fn harness_with<S, N>(store: S, notifier: N) -> Harness<S, N>
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
{
    let store = Arc::new(store);
    let notifier = Arc::new(notifier);
    let images = Arc::new(InMemoryImageStore::default());
    let service = CollectionService::new(
        store.clone(),
        notifier.clone(),
        images.clone(),
        Arc::new(AllowListPolicy::new([STAFF])),
    );
    Harness {
        service,
        store,
        notifier,
        images,
    }
}

pub(super) fn harness() -> Harness {
    harness_with(InMemoryRecordStore::default(), RecordingNotifier::default())
}

/// Submit a machine and approve it as staff.
pub(super) fn approved_item<S, N>(harness: &Harness<S, N>, name: &str) -> Item
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
{
    let item = harness.service.submit(draft(name)).expect("submission accepted");
    harness
        .service
        .approve(&staff(), &item.id)
        .expect("approval succeeds")
}

#[derive(Default, Clone)]
pub(super) struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct OfflineNotifier;

impl Notifier for OfflineNotifier {
    fn notify(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

/// Delegates to an in-memory store but fails the child-record cascade steps.
#[derive(Default)]
pub(super) struct BrittleCascadeStore {
    pub(super) inner: InMemoryRecordStore,
}

impl RecordStore for BrittleCascadeStore {
    fn insert_item(&self, item: Item) -> Result<Item, RepositoryError> {
        self.inner.insert_item(item)
    }

    fn update_item(&self, item: Item, expected_version: u64) -> Result<Item, RepositoryError> {
        self.inner.update_item(item, expected_version)
    }

    fn fetch_item(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        self.inner.fetch_item(id)
    }

    fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        self.inner.list_items()
    }

    fn delete_item(&self, id: &ItemId) -> Result<bool, RepositoryError> {
        self.inner.delete_item(id)
    }

    fn insert_ticket(&self, ticket: MaintenanceTicket) -> Result<MaintenanceTicket, RepositoryError> {
        self.inner.insert_ticket(ticket)
    }

    fn update_ticket(&self, ticket: MaintenanceTicket) -> Result<(), RepositoryError> {
        self.inner.update_ticket(ticket)
    }

    fn fetch_ticket(&self, id: &TicketId) -> Result<Option<MaintenanceTicket>, RepositoryError> {
        self.inner.fetch_ticket(id)
    }

    fn tickets_for_item(&self, item_id: &ItemId) -> Result<Vec<MaintenanceTicket>, RepositoryError> {
        self.inner.tickets_for_item(item_id)
    }

    fn delete_ticket(&self, id: &TicketId) -> Result<bool, RepositoryError> {
        self.inner.delete_ticket(id)
    }

    fn delete_tickets_for_item(&self, _item_id: &ItemId) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("ticket table locked".to_string()))
    }

    fn insert_inquiry(&self, inquiry: Inquiry) -> Result<Inquiry, RepositoryError> {
        self.inner.insert_inquiry(inquiry)
    }

    fn update_inquiry(&self, inquiry: Inquiry) -> Result<(), RepositoryError> {
        self.inner.update_inquiry(inquiry)
    }

    fn fetch_inquiry(&self, id: &InquiryId) -> Result<Option<Inquiry>, RepositoryError> {
        self.inner.fetch_inquiry(id)
    }

    fn inquiries_for_item(&self, item_id: &ItemId) -> Result<Vec<Inquiry>, RepositoryError> {
        self.inner.inquiries_for_item(item_id)
    }

    fn delete_inquiries_for_item(&self, item_id: &ItemId) -> Result<usize, RepositoryError> {
        self.inner.delete_inquiries_for_item(item_id)
    }
}

pub(super) struct UnavailableStore;

impl RecordStore for UnavailableStore {
    fn insert_item(&self, _item: Item) -> Result<Item, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_item(&self, _item: Item, _expected_version: u64) -> Result<Item, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_item(&self, _id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_item(&self, _id: &ItemId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_ticket(&self, _ticket: MaintenanceTicket) -> Result<MaintenanceTicket, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_ticket(&self, _ticket: MaintenanceTicket) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_ticket(&self, _id: &TicketId) -> Result<Option<MaintenanceTicket>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn tickets_for_item(&self, _item_id: &ItemId) -> Result<Vec<MaintenanceTicket>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_ticket(&self, _id: &TicketId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_tickets_for_item(&self, _item_id: &ItemId) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_inquiry(&self, _inquiry: Inquiry) -> Result<Inquiry, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_inquiry(&self, _inquiry: Inquiry) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_inquiry(&self, _id: &InquiryId) -> Result<Option<Inquiry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn inquiries_for_item(&self, _item_id: &ItemId) -> Result<Vec<Inquiry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_inquiries_for_item(&self, _item_id: &ItemId) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_for(harness: Harness) -> (axum::Router, Arc<InMemoryRecordStore>) {
    let store = harness.store.clone();
    (collection_router(Arc::new(harness.service)), store)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
