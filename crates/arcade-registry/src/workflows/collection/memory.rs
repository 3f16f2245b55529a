//! Process-local implementations of the storage seams, used by the demo host and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{Inquiry, InquiryId, Item, ItemId, MaintenanceTicket, TicketId};
use super::repository::{ImageStore, ImageStoreError, RecordStore, RepositoryError};

#[derive(Debug, Default)]
struct Tables {
    items: HashMap<ItemId, Item>,
    tickets: HashMap<TicketId, MaintenanceTicket>,
    inquiries: HashMap<InquiryId, Inquiry>,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRecordStore {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("record store lock poisoned".to_string()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert_item(&self, mut item: Item) -> Result<Item, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.items.contains_key(&item.id) {
            return Err(RepositoryError::Conflict(item.id.0));
        }
        item.version = 1;
        tables.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    fn update_item(&self, mut item: Item, expected_version: u64) -> Result<Item, RepositoryError> {
        let mut tables = self.tables()?;
        let stored = tables
            .items
            .get(&item.id)
            .ok_or_else(|| RepositoryError::NotFound(item.id.0.clone()))?;
        if stored.version != expected_version {
            return Err(RepositoryError::StaleVersion {
                id: item.id.0.clone(),
                expected: expected_version,
                found: stored.version,
            });
        }
        item.version = expected_version + 1;
        tables.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    fn fetch_item(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        Ok(self.tables()?.items.get(id).cloned())
    }

    fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        let mut items: Vec<Item> = self.tables()?.items.values().cloned().collect();
        items.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(items)
    }

    fn delete_item(&self, id: &ItemId) -> Result<bool, RepositoryError> {
        Ok(self.tables()?.items.remove(id).is_some())
    }

    fn insert_ticket(&self, ticket: MaintenanceTicket) -> Result<MaintenanceTicket, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.tickets.contains_key(&ticket.id) {
            return Err(RepositoryError::Conflict(ticket.id.0));
        }
        tables.tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(ticket)
    }

    fn update_ticket(&self, ticket: MaintenanceTicket) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.tickets.contains_key(&ticket.id) {
            return Err(RepositoryError::NotFound(ticket.id.0));
        }
        tables.tickets.insert(ticket.id.clone(), ticket);
        Ok(())
    }

    fn fetch_ticket(&self, id: &TicketId) -> Result<Option<MaintenanceTicket>, RepositoryError> {
        Ok(self.tables()?.tickets.get(id).cloned())
    }

    fn tickets_for_item(&self, item_id: &ItemId) -> Result<Vec<MaintenanceTicket>, RepositoryError> {
        Ok(self
            .tables()?
            .tickets
            .values()
            .filter(|ticket| &ticket.item_id == item_id)
            .cloned()
            .collect())
    }

    fn delete_ticket(&self, id: &TicketId) -> Result<bool, RepositoryError> {
        Ok(self.tables()?.tickets.remove(id).is_some())
    }

    fn delete_tickets_for_item(&self, item_id: &ItemId) -> Result<usize, RepositoryError> {
        let mut tables = self.tables()?;
        let before = tables.tickets.len();
        tables.tickets.retain(|_, ticket| &ticket.item_id != item_id);
        Ok(before - tables.tickets.len())
    }

    fn insert_inquiry(&self, inquiry: Inquiry) -> Result<Inquiry, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.inquiries.contains_key(&inquiry.id) {
            return Err(RepositoryError::Conflict(inquiry.id.0));
        }
        tables.inquiries.insert(inquiry.id.clone(), inquiry.clone());
        Ok(inquiry)
    }

    fn update_inquiry(&self, inquiry: Inquiry) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.inquiries.contains_key(&inquiry.id) {
            return Err(RepositoryError::NotFound(inquiry.id.0));
        }
        tables.inquiries.insert(inquiry.id.clone(), inquiry);
        Ok(())
    }

    fn fetch_inquiry(&self, id: &InquiryId) -> Result<Option<Inquiry>, RepositoryError> {
        Ok(self.tables()?.inquiries.get(id).cloned())
    }

    fn inquiries_for_item(&self, item_id: &ItemId) -> Result<Vec<Inquiry>, RepositoryError> {
        Ok(self
            .tables()?
            .inquiries
            .values()
            .filter(|inquiry| &inquiry.item_id == item_id)
            .cloned()
            .collect())
    }

    fn delete_inquiries_for_item(&self, item_id: &ItemId) -> Result<usize, RepositoryError> {
        let mut tables = self.tables()?;
        let before = tables.inquiries.len();
        tables.inquiries.retain(|_, inquiry| &inquiry.item_id != item_id);
        Ok(before - tables.inquiries.len())
    }
}

const ACCEPTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Keeps uploaded photos in memory under `memory://` URLs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryImageStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryImageStore {
    pub fn contains(&self, url: &str) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(url))
            .unwrap_or(false)
    }

    fn objects(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>, ImageStoreError> {
        self.objects
            .lock()
            .map_err(|_| ImageStoreError::Unavailable("image store lock poisoned".to_string()))
    }
}

impl ImageStore for InMemoryImageStore {
    fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String, ImageStoreError> {
        if !ACCEPTED_IMAGE_TYPES.contains(&content_type) {
            return Err(ImageStoreError::UnsupportedContentType(content_type.to_string()));
        }
        let extension = content_type.trim_start_matches("image/");
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!("memory://images/{id:06}.{extension}");
        self.objects()?.insert(url.clone(), bytes.to_vec());
        Ok(url)
    }

    fn delete(&self, url: &str) -> Result<(), ImageStoreError> {
        match self.objects()?.remove(url) {
            Some(_) => Ok(()),
            None => Err(ImageStoreError::NotFound(url.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::collection::domain::{CategoryKind, ItemDraft, OwnerContact};
    use crate::workflows::collection::lifecycle::{item_from_draft, Origin};
    use chrono::Utc;

    fn item(id: &str) -> Item {
        item_from_draft(
            ItemId(id.to_string()),
            ItemDraft {
                name: "Robotron".to_string(),
                category: Some(CategoryKind::Arcade),
                owner: OwnerContact {
                    name: "Pat".to_string(),
                    email: "pat@x.com".to_string(),
                    ..OwnerContact::default()
                },
                ..ItemDraft::default()
            },
            Origin::StaffEntry,
            Utc::now(),
        )
    }

    #[test]
    fn update_rejects_stale_versions() {
        let store = InMemoryRecordStore::default();
        let stored = store.insert_item(item("item-a")).expect("inserts");
        assert_eq!(stored.version, 1);

        let updated = store.update_item(stored.clone(), 1).expect("first write");
        assert_eq!(updated.version, 2);

        match store.update_item(stored, 1) {
            Err(RepositoryError::StaleVersion { expected, found, .. }) => {
                assert_eq!((expected, found), (1, 2));
            }
            other => panic!("expected stale version, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_insert_conflicts() {
        let store = InMemoryRecordStore::default();
        store.insert_item(item("item-b")).expect("inserts");
        assert!(matches!(
            store.insert_item(item("item-b")),
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[test]
    fn image_store_round_trip() {
        let images = InMemoryImageStore::default();
        let url = images.upload(b"jpeg", "image/jpeg").expect("uploads");
        assert!(url.ends_with(".jpeg"));
        assert!(images.contains(&url));
        images.delete(&url).expect("deletes");
        assert!(!images.contains(&url));
        assert!(matches!(
            images.upload(b"%PDF", "application/pdf"),
            Err(ImageStoreError::UnsupportedContentType(_))
        ));
    }
}
