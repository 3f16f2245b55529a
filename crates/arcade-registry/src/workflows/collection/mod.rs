//! Loaned-machine collection: intake, approval, check-in, maintenance, and the buyer marketplace.
//!
//! Rules live in small pure modules (`intake`, `lifecycle`, `checkin`, `negotiation`,
//! `maintenance`, `visibility`) that operate on plain records. `CollectionService` composes
//! them with the storage, notification, and image seams declared in `repository`, and
//! `router` exposes the service over HTTP.

pub mod access;
pub mod checkin;
pub mod domain;
pub mod intake;
pub mod lifecycle;
pub mod maintenance;
pub mod memory;
pub mod negotiation;
pub mod repository;
pub mod router;
pub mod service;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use access::{Actor, AllowListPolicy, StaffPolicy};
pub use checkin::CheckInQueueEntry;
pub use domain::{
    Approval, ApprovalStatus, BuyerContact, CategoryKind, CheckInRecord, CheckInRequest,
    ConditionStatus, Inquiry, InquiryId, InquiryIntent, InquiryRequest, InquiryStatus, Item,
    ItemDraft, ItemId, ItemPatch, MaintenanceTicket, OwnerContact, SaleConfig, SaleListing,
    ServicePreference, TicketId,
};
pub use intake::{FieldViolation, IntakeGuard, ValidationError};
pub use lifecycle::{RuleError, TransitionError, SYSTEM_APPROVER};
pub use memory::{InMemoryImageStore, InMemoryRecordStore};
pub use negotiation::ListingMode;
pub use repository::{
    ImageStore, ImageStoreError, Notification, NotificationError, NotificationEvent, Notifier,
    RecordStore, RepositoryError,
};
pub use router::{collection_router, IDENTITY_HEADER};
pub use service::{CascadeStep, CascadeWarning, CollectionService, DeletionReport, RegistryError};
pub use visibility::{MarketplaceEntry, ProjectedItem, ViewerRole};
