use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::access::{actor_is_staff, viewer_role, Actor, StaffPolicy};
use super::checkin::{self, CheckInQueueEntry};
use super::domain::{
    CheckInRequest, Inquiry, InquiryId, InquiryRequest, InquiryStatus, Item, ItemDraft, ItemId,
    ItemPatch, MaintenanceTicket, SaleConfig, TicketId,
};
use super::intake::{IntakeGuard, ValidationError};
use super::lifecycle::{self, Origin, RuleError, TransitionError};
use super::maintenance;
use super::negotiation::{self, ListingMode};
use super::repository::{
    ImageStore, ImageStoreError, Notification, NotificationEvent, Notifier, RecordStore,
    RepositoryError,
};
use super::visibility::{project, MarketplaceEntry, ProjectedItem, Related, ViewerRole};

static ITEM_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static TICKET_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static INQUIRY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_item_id() -> ItemId {
    let id = ITEM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ItemId(format!("item-{id:06}"))
}

fn next_ticket_id() -> TicketId {
    let id = TICKET_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TicketId(format!("ticket-{id:06}"))
}

fn next_inquiry_id() -> InquiryId {
    let id = INQUIRY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InquiryId(format!("inquiry-{id:06}"))
}

/// Caller-facing failure kinds for every engine operation.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
    #[error("{action} requires staff access")]
    Authorization { action: &'static str },
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("item '{id}' changed since version {expected} (now {found})")]
    Conflict { id: String, expected: u64, found: u64 },
    #[error("record store failure: {0}")]
    StoreFailure(String),
    #[error("image storage failure: {0}")]
    ImageStore(#[from] ImageStoreError),
}

impl From<RuleError> for RegistryError {
    fn from(value: RuleError) -> Self {
        match value {
            RuleError::Validation(error) => Self::Validation(error),
            RuleError::Transition(error) => Self::InvalidTransition(error),
        }
    }
}

impl From<RepositoryError> for RegistryError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::StaleVersion {
                id,
                expected,
                found,
            } => Self::Conflict {
                id,
                expected,
                found,
            },
            RepositoryError::NotFound(id) => Self::NotFound {
                entity: "record",
                id,
            },
            RepositoryError::Conflict(id) => {
                Self::StoreFailure(format!("record '{id}' already exists"))
            }
            RepositoryError::Unavailable(reason) => Self::StoreFailure(reason),
        }
    }
}

/// One cascade step of an item deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStep {
    MaintenanceTickets,
    Inquiries,
    Images,
}

/// A cascade step that failed without blocking the deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeWarning {
    pub step: CascadeStep,
    pub detail: String,
}

/// Outcome of a best-effort cascading delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub item_id: ItemId,
    pub tickets_removed: usize,
    pub inquiries_removed: usize,
    pub images_removed: usize,
    pub warnings: Vec<CascadeWarning>,
}

impl DeletionReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Service composing the record store, intake guard, staff policy, and collaborators.
pub struct CollectionService<S, N, I> {
    store: Arc<S>,
    notifier: Arc<N>,
    images: Arc<I>,
    policy: Arc<dyn StaffPolicy>,
    guard: IntakeGuard,
}

impl<S, N, I> CollectionService<S, N, I>
where
    S: RecordStore + 'static,
    N: Notifier + 'static,
    I: ImageStore + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, images: Arc<I>, policy: Arc<dyn StaffPolicy>) -> Self {
        Self {
            store,
            notifier,
            images,
            policy,
            guard: IntakeGuard,
        }
    }

    fn require_staff(&self, actor: &Actor, action: &'static str) -> Result<String, RegistryError> {
        match actor.identity() {
            Some(identity) if self.policy.is_staff(identity) => Ok(identity.to_string()),
            _ => {
                debug!(action, identity = ?actor.identity(), "staff-only operation refused");
                Err(RegistryError::Authorization { action })
            }
        }
    }

    fn load_item(&self, id: &ItemId) -> Result<Item, RegistryError> {
        self.store
            .fetch_item(id)?
            .ok_or_else(|| RegistryError::NotFound {
                entity: "item",
                id: id.0.clone(),
            })
    }

    fn load_ticket(&self, id: &TicketId) -> Result<MaintenanceTicket, RegistryError> {
        self.store
            .fetch_ticket(id)?
            .ok_or_else(|| RegistryError::NotFound {
                entity: "maintenance ticket",
                id: id.0.clone(),
            })
    }

    fn load_inquiry(&self, id: &InquiryId) -> Result<Inquiry, RegistryError> {
        self.store
            .fetch_inquiry(id)?
            .ok_or_else(|| RegistryError::NotFound {
                entity: "inquiry",
                id: id.0.clone(),
            })
    }

    fn check_version(item: &Item, expected: Option<u64>) -> Result<(), RegistryError> {
        match expected {
            Some(expected) if expected != item.version => Err(RegistryError::Conflict {
                id: item.id.0.clone(),
                expected,
                found: item.version,
            }),
            _ => Ok(()),
        }
    }

    /// Persist a mutated item against the version it was read at.
    fn commit(&self, item: Item, read_version: u64) -> Result<Item, RegistryError> {
        Ok(self.store.update_item(item, read_version)?)
    }

    fn dispatch(&self, notification: Notification) {
        let event = notification.event;
        let item_id = notification.item_id.0.clone();
        if let Err(error) = self.notifier.notify(notification) {
            warn!(?event, %item_id, %error, "staff notification failed");
        }
    }

    /// Public submission; lands in `pending` approval.
    pub fn submit(&self, draft: ItemDraft) -> Result<Item, RegistryError> {
        let now = Utc::now();
        self.guard.check_draft(&draft, now)?;
        let item = lifecycle::item_from_draft(next_item_id(), draft, Origin::PublicSubmission, now);
        let stored = self.store.insert_item(item)?;
        info!(item_id = %stored.id.0, name = %stored.name, "machine submitted for approval");

        let mut details = BTreeMap::new();
        details.insert("name".to_string(), stored.name.clone());
        details.insert("category".to_string(), stored.category_label());
        details.insert("owner_name".to_string(), stored.owner.name.clone());
        details.insert("owner_email".to_string(), stored.owner.email.clone());
        self.dispatch(Notification {
            event: NotificationEvent::Submission,
            item_id: stored.id.clone(),
            details,
        });

        Ok(stored)
    }

    /// Staff direct-add; approved immediately by the system approver.
    pub fn add_item(&self, actor: &Actor, draft: ItemDraft) -> Result<Item, RegistryError> {
        self.require_staff(actor, "add item")?;
        let now = Utc::now();
        self.guard.check_draft(&draft, now)?;
        let item = lifecycle::item_from_draft(next_item_id(), draft, Origin::StaffEntry, now);
        let stored = self.store.insert_item(item)?;
        info!(item_id = %stored.id.0, name = %stored.name, "machine added by staff");
        Ok(stored)
    }

    pub fn approve(&self, actor: &Actor, item_id: &ItemId) -> Result<Item, RegistryError> {
        let approver = self.require_staff(actor, "approve")?;
        let mut item = self.load_item(item_id)?;
        let version = item.version;
        lifecycle::approve(&mut item, &approver, Utc::now())?;
        let stored = self.commit(item, version)?;
        info!(item_id = %stored.id.0, %approver, "machine approved");
        Ok(stored)
    }

    pub fn reject(&self, actor: &Actor, item_id: &ItemId, reason: &str) -> Result<Item, RegistryError> {
        let staff = self.require_staff(actor, "reject")?;
        let mut item = self.load_item(item_id)?;
        let version = item.version;
        lifecycle::reject(&mut item, reason, Utc::now())?;
        let stored = self.commit(item, version)?;
        info!(item_id = %stored.id.0, %staff, "machine rejected");
        Ok(stored)
    }

    pub fn edit(&self, actor: &Actor, item_id: &ItemId, patch: ItemPatch) -> Result<Item, RegistryError> {
        self.require_staff(actor, "edit")?;
        let now = Utc::now();
        let mut item = self.load_item(item_id)?;
        self.guard.check_patch(&item, &patch, now)?;
        Self::check_version(&item, patch.expected_version)?;
        let version = item.version;
        lifecycle::apply_patch(&mut item, patch, now)?;
        Ok(self.commit(item, version)?)
    }

    pub fn set_sale_config(
        &self,
        actor: &Actor,
        item_id: &ItemId,
        config: SaleConfig,
        expected_version: Option<u64>,
    ) -> Result<Item, RegistryError> {
        self.require_staff(actor, "configure sale")?;
        self.guard.check_sale_config(&config)?;
        let mut item = self.load_item(item_id)?;
        Self::check_version(&item, expected_version)?;
        let version = item.version;
        let requested_flag = config.for_sale;
        lifecycle::apply_sale_listing(&mut item, config.into(), Utc::now());
        if item.sale.for_sale != requested_flag {
            debug!(item_id = %item.id.0, "asking price forced machine onto the marketplace");
        }
        Ok(self.commit(item, version)?)
    }

    pub fn check_in(
        &self,
        actor: &Actor,
        item_id: &ItemId,
        request: CheckInRequest,
    ) -> Result<Item, RegistryError> {
        let staff = self.require_staff(actor, "check in")?;
        let mut item = self.load_item(item_id)?;
        let version = item.version;
        checkin::check_in(&mut item, request, &staff, Utc::now())?;
        let stored = self.commit(item, version)?;
        info!(item_id = %stored.id.0, zone = ?stored.zone, %staff, "machine checked in");
        Ok(stored)
    }

    /// Best-effort cascading delete. Child-step failures become warnings on the report; only
    /// a failure to remove the item itself is returned as an error.
    pub fn delete_item(&self, actor: &Actor, item_id: &ItemId) -> Result<DeletionReport, RegistryError> {
        self.require_staff(actor, "delete")?;
        let item = self.load_item(item_id)?;
        let mut report = DeletionReport {
            item_id: item.id.clone(),
            tickets_removed: 0,
            inquiries_removed: 0,
            images_removed: 0,
            warnings: Vec::new(),
        };

        match self.store.delete_tickets_for_item(item_id) {
            Ok(removed) => report.tickets_removed = removed,
            Err(error) => {
                warn!(item_id = %item_id.0, %error, "failed to delete maintenance tickets");
                report.warnings.push(CascadeWarning {
                    step: CascadeStep::MaintenanceTickets,
                    detail: error.to_string(),
                });
            }
        }

        match self.store.delete_inquiries_for_item(item_id) {
            Ok(removed) => report.inquiries_removed = removed,
            Err(error) => {
                warn!(item_id = %item_id.0, %error, "failed to delete inquiries");
                report.warnings.push(CascadeWarning {
                    step: CascadeStep::Inquiries,
                    detail: error.to_string(),
                });
            }
        }

        for url in &item.images {
            match self.images.delete(url) {
                Ok(()) => report.images_removed += 1,
                Err(ImageStoreError::NotFound(_)) => {}
                Err(error) => {
                    warn!(item_id = %item_id.0, %url, %error, "failed to delete image");
                    report.warnings.push(CascadeWarning {
                        step: CascadeStep::Images,
                        detail: error.to_string(),
                    });
                }
            }
        }

        self.store.delete_item(item_id)?;
        info!(
            item_id = %item_id.0,
            tickets = report.tickets_removed,
            inquiries = report.inquiries_removed,
            warnings = report.warnings.len(),
            "machine deleted"
        );
        Ok(report)
    }

    pub fn attach_image(
        &self,
        actor: &Actor,
        item_id: &ItemId,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<Item, RegistryError> {
        self.require_staff(actor, "attach image")?;
        let mut item = self.load_item(item_id)?;
        let version = item.version;
        let url = self.images.upload(bytes, content_type)?;
        item.images.push(url.clone());
        item.updated_at = Utc::now();
        match self.commit(item, version) {
            Ok(stored) => Ok(stored),
            Err(error) => {
                if let Err(cleanup) = self.images.delete(&url) {
                    warn!(%url, %cleanup, "orphaned image after failed attach");
                }
                Err(error)
            }
        }
    }

    pub fn remove_image(&self, actor: &Actor, item_id: &ItemId, url: &str) -> Result<Item, RegistryError> {
        self.require_staff(actor, "remove image")?;
        let mut item = self.load_item(item_id)?;
        let version = item.version;
        let Some(position) = item.images.iter().position(|existing| existing == url) else {
            return Err(RegistryError::NotFound {
                entity: "image",
                id: url.to_string(),
            });
        };
        item.images.remove(position);
        item.updated_at = Utc::now();
        let stored = self.commit(item, version)?;
        if let Err(error) = self.images.delete(url) {
            warn!(%url, %error, "image detached but not removed from storage");
        }
        Ok(stored)
    }

    /// Raw record for staff tooling.
    pub fn get(&self, actor: &Actor, item_id: &ItemId) -> Result<Item, RegistryError> {
        self.require_staff(actor, "read raw record")?;
        self.load_item(item_id)
    }

    /// Role-appropriate view. Unapproved machines are hidden from the public but remain visible
    /// to staff and to the owning party.
    pub fn view_item(&self, actor: &Actor, item_id: &ItemId) -> Result<ProjectedItem, RegistryError> {
        let item = self.load_item(item_id)?;
        self.project_for(actor, &item)?.ok_or_else(|| RegistryError::NotFound {
            entity: "item",
            id: item_id.0.clone(),
        })
    }

    fn project_for(&self, actor: &Actor, item: &Item) -> Result<Option<ProjectedItem>, RegistryError> {
        let role = viewer_role(self.policy.as_ref(), actor, item);
        match role {
            ViewerRole::Staff => {
                let tickets = self.store.tickets_for_item(&item.id)?;
                let inquiries = self.store.inquiries_for_item(&item.id)?;
                Ok(Some(project(
                    item,
                    role,
                    Related {
                        tickets: &tickets,
                        inquiries: &inquiries,
                    },
                )))
            }
            ViewerRole::Owner => Ok(Some(project(item, role, Related::default()))),
            ViewerRole::Anonymous => {
                Ok(item.is_public().then(|| project(item, role, Related::default())))
            }
        }
    }

    /// Every machine sharing `slug`; slugs are cosmetic and may collide.
    pub fn find_by_slug(&self, actor: &Actor, slug: &str) -> Result<Vec<ProjectedItem>, RegistryError> {
        let slug = slug.trim().to_lowercase();
        let mut views = Vec::new();
        for item in self.store.list_items()?.iter().filter(|item| item.slug == slug) {
            if let Some(view) = self.project_for(actor, item)? {
                views.push(view);
            }
        }
        Ok(views)
    }

    pub fn marketplace(&self, mode: ListingMode) -> Result<Vec<MarketplaceEntry>, RegistryError> {
        let invite_offers = mode == ListingMode::BrowseAll;
        let mut entries: Vec<MarketplaceEntry> = self
            .store
            .list_items()?
            .iter()
            .filter(|item| negotiation::is_listed(item, mode))
            .map(|item| MarketplaceEntry::new(item, invite_offers))
            .collect();
        entries.sort_by(|left, right| left.item.name.to_lowercase().cmp(&right.item.name.to_lowercase()));
        Ok(entries)
    }

    pub fn check_in_queue(&self, actor: &Actor) -> Result<Vec<CheckInQueueEntry>, RegistryError> {
        self.require_staff(actor, "view check-in queue")?;
        let items = self.store.list_items()?;
        Ok(checkin::check_in_queue(&items))
    }

    /// Staff lookup by machine name, owner name, or owner e-mail across every approval state.
    pub fn search(&self, actor: &Actor, query: &str) -> Result<Vec<CheckInQueueEntry>, RegistryError> {
        self.require_staff(actor, "search")?;
        Ok(self
            .store
            .list_items()?
            .iter()
            .filter(|item| checkin::matches_query(item, query))
            .map(CheckInQueueEntry::from)
            .collect())
    }

    /// Public buyer inquiry. Sibling inquiries on the same machine are left untouched.
    pub fn create_inquiry(&self, item_id: &ItemId, request: InquiryRequest) -> Result<Inquiry, RegistryError> {
        let item = self.load_item(item_id)?;
        if !item.is_public() {
            return Err(RegistryError::NotFound {
                entity: "item",
                id: item_id.0.clone(),
            });
        }
        let intent = request.intent;
        let inquiry = negotiation::new_inquiry(next_inquiry_id(), &item, request, Utc::now())?;
        let stored = self.store.insert_inquiry(inquiry)?;
        info!(item_id = %item.id.0, inquiry_id = %stored.id.0, ?intent, "inquiry received");

        let mut details = BTreeMap::new();
        details.insert("item_name".to_string(), item.name.clone());
        details.insert("inquiry_id".to_string(), stored.id.0.clone());
        details.insert("buyer_name".to_string(), stored.buyer.name.clone());
        details.insert("buyer_email".to_string(), stored.buyer.email.clone());
        if let Some(amount) = stored.amount {
            details.insert("amount".to_string(), format!("{amount:.2}"));
        }
        self.dispatch(Notification {
            event: NotificationEvent::Inquiry,
            item_id: item.id.clone(),
            details,
        });

        Ok(stored)
    }

    pub fn advance_inquiry(
        &self,
        actor: &Actor,
        inquiry_id: &InquiryId,
        next: InquiryStatus,
    ) -> Result<Inquiry, RegistryError> {
        let staff = self.require_staff(actor, "respond to inquiry")?;
        let mut inquiry = self.load_inquiry(inquiry_id)?;
        let previous = inquiry.status;
        negotiation::advance(&mut inquiry, next)?;
        self.store.update_inquiry(inquiry.clone())?;
        info!(
            inquiry_id = %inquiry.id.0,
            from = previous.label(),
            to = next.label(),
            %staff,
            "inquiry advanced"
        );
        Ok(inquiry)
    }

    /// Newest first.
    pub fn inquiries_for(&self, actor: &Actor, item_id: &ItemId) -> Result<Vec<Inquiry>, RegistryError> {
        self.require_staff(actor, "list inquiries")?;
        self.load_item(item_id)?;
        let mut inquiries = self.store.inquiries_for_item(item_id)?;
        inquiries.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(inquiries)
    }

    pub fn open_ticket(
        &self,
        actor: &Actor,
        item_id: &ItemId,
        description: &str,
    ) -> Result<MaintenanceTicket, RegistryError> {
        self.require_staff(actor, "open maintenance ticket")?;
        self.guard.check_ticket(description)?;
        self.load_item(item_id)?;
        let ticket = maintenance::new_ticket(next_ticket_id(), item_id.clone(), description, Utc::now());
        let stored = self.store.insert_ticket(ticket)?;
        info!(item_id = %item_id.0, ticket_id = %stored.id.0, "maintenance ticket opened");
        Ok(stored)
    }

    pub fn resolve_ticket(&self, actor: &Actor, ticket_id: &TicketId) -> Result<MaintenanceTicket, RegistryError> {
        self.require_staff(actor, "resolve maintenance ticket")?;
        let mut ticket = self.load_ticket(ticket_id)?;
        if maintenance::resolve(&mut ticket, Utc::now()) {
            self.store.update_ticket(ticket.clone())?;
        }
        Ok(ticket)
    }

    pub fn reopen_ticket(&self, actor: &Actor, ticket_id: &TicketId) -> Result<MaintenanceTicket, RegistryError> {
        self.require_staff(actor, "reopen maintenance ticket")?;
        let mut ticket = self.load_ticket(ticket_id)?;
        if maintenance::reopen(&mut ticket, Utc::now()) {
            self.store.update_ticket(ticket.clone())?;
        }
        Ok(ticket)
    }

    pub fn delete_ticket(&self, actor: &Actor, ticket_id: &TicketId) -> Result<(), RegistryError> {
        self.require_staff(actor, "delete maintenance ticket")?;
        if self.store.delete_ticket(ticket_id)? {
            Ok(())
        } else {
            Err(RegistryError::NotFound {
                entity: "maintenance ticket",
                id: ticket_id.0.clone(),
            })
        }
    }

    /// Open tickets first, newest first within each group.
    pub fn tickets_for(&self, actor: &Actor, item_id: &ItemId) -> Result<Vec<MaintenanceTicket>, RegistryError> {
        self.require_staff(actor, "list maintenance tickets")?;
        self.load_item(item_id)?;
        let mut tickets = self.store.tickets_for_item(item_id)?;
        maintenance::order_for_display(&mut tickets);
        Ok(tickets)
    }

    pub fn is_staff(&self, actor: &Actor) -> bool {
        actor_is_staff(self.policy.as_ref(), actor)
    }
}
