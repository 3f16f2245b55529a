//! Approval gate, sale-flag derivation, and staff edits for machine records.
//!
//! Everything here operates on an in-memory `Item`; persistence and authorization happen in
//! the service so that a rejected transition never reaches the store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::domain::{
    slugify, Approval, ApprovalStatus, CategoryKind, Item, ItemDraft, ItemId, ItemPatch,
    OwnerContact, SaleListing,
};
use super::intake::{clean_text, ValidationError};

/// Approver recorded for machines entered directly by staff.
pub const SYSTEM_APPROVER: &str = "system";

/// Requested status change that the current state does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} cannot move from '{from}' to '{to}'")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

/// Failure raised by a pure lifecycle rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// How a machine entered the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    PublicSubmission,
    StaffEntry,
}

/// A positive asking price always lists the machine, whatever flag was requested.
pub fn enforce_sale_invariant(listing: &mut SaleListing) {
    if listing.asking_price.is_some_and(|price| price > Decimal::ZERO) {
        listing.for_sale = true;
    }
}

fn normalize_listing(mut listing: SaleListing) -> SaleListing {
    listing.condition_notes = clean_text(listing.condition_notes);
    listing.notes = clean_text(listing.notes);
    listing.missing_parts = listing
        .missing_parts
        .into_iter()
        .map(|part| part.trim().to_string())
        .collect();
    enforce_sale_invariant(&mut listing);
    listing
}

fn normalize_owner(owner: OwnerContact) -> OwnerContact {
    OwnerContact {
        name: owner.name.trim().to_string(),
        email: owner.email.trim().to_string(),
        phone: clean_text(owner.phone),
        address: clean_text(owner.address),
        notes: clean_text(owner.notes),
        display_publicly: owner.display_publicly,
    }
}

/// Build the stored record for a validated draft.
pub fn item_from_draft(id: ItemId, draft: ItemDraft, origin: Origin, now: DateTime<Utc>) -> Item {
    let approval = match origin {
        Origin::PublicSubmission => Approval::Pending,
        Origin::StaffEntry => Approval::Approved {
            approved_by: SYSTEM_APPROVER.to_string(),
            approved_at: now,
        },
    };

    let name = draft.name.trim().to_string();
    let owner = normalize_owner(draft.owner);

    let mut service = draft.service;
    service.notes = clean_text(service.notes);

    Item {
        id,
        slug: slugify(&name),
        name,
        category: draft.category.unwrap_or(CategoryKind::Other),
        category_other: clean_text(draft.category_other),
        manufacture_year: draft.manufacture_year,
        condition: draft.condition,
        condition_notes: clean_text(draft.condition_notes),
        images: draft
            .images
            .into_iter()
            .map(|url| url.trim().to_string())
            .collect(),
        zone: None,
        approval,
        check_in: None,
        sale: normalize_listing(draft.sale),
        owner,
        service,
        created_at: now,
        updated_at: now,
        submitted_at: match origin {
            Origin::PublicSubmission => Some(now),
            Origin::StaffEntry => None,
        },
        version: 0,
    }
}

fn require_pending(item: &Item, to: ApprovalStatus) -> Result<(), TransitionError> {
    let from = item.approval_status();
    if from == ApprovalStatus::Pending {
        Ok(())
    } else {
        Err(TransitionError {
            entity: "approval",
            from: from.label(),
            to: to.label(),
        })
    }
}

pub fn approve(item: &mut Item, approver: &str, now: DateTime<Utc>) -> Result<(), TransitionError> {
    require_pending(item, ApprovalStatus::Approved)?;
    item.approval = Approval::Approved {
        approved_by: approver.to_string(),
        approved_at: now,
    };
    item.updated_at = now;
    Ok(())
}

/// Rejection is terminal; a blank reason is refused only after the transition itself is legal.
pub fn reject(item: &mut Item, reason: &str, now: DateTime<Utc>) -> Result<(), RuleError> {
    require_pending(item, ApprovalStatus::Rejected)?;
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::single("reason", "is required when rejecting").into());
    }
    item.approval = Approval::Rejected {
        reason: reason.to_string(),
        rejected_at: now,
    };
    item.updated_at = now;
    Ok(())
}

/// Replace the sale block, re-deriving the listed flag from the price.
pub fn apply_sale_listing(item: &mut Item, listing: SaleListing, now: DateTime<Utc>) {
    item.sale = normalize_listing(listing);
    item.updated_at = now;
}

/// Apply a validated staff patch. The approval gate is never touched here.
pub fn apply_patch(item: &mut Item, patch: ItemPatch, now: DateTime<Utc>) -> Result<(), TransitionError> {
    if (patch.check_in_notes.is_some() || patch.revert_check_in) && !item.checked_in() {
        return Err(TransitionError {
            entity: "check-in",
            from: "not checked in",
            to: "edited",
        });
    }

    if let Some(name) = patch.name {
        item.name = name.trim().to_string();
        item.slug = slugify(&item.name);
    }
    if let Some(category) = patch.category {
        item.category = category;
        item.category_other = clean_text(patch.category_other);
    } else if patch.category_other.is_some() {
        item.category_other = clean_text(patch.category_other);
    }
    if let Some(year) = patch.manufacture_year {
        item.manufacture_year = Some(year);
    }
    if let Some(condition) = patch.condition {
        item.condition = condition;
    }
    if patch.condition_notes.is_some() {
        item.condition_notes = clean_text(patch.condition_notes);
    }
    if let Some(images) = patch.images {
        item.images = images.into_iter().map(|url| url.trim().to_string()).collect();
    }
    if let Some(zone) = patch.zone {
        item.zone = Some(zone.trim().to_string());
    }
    if patch.revert_check_in {
        item.check_in = None;
    } else if let (Some(notes), Some(record)) = (patch.check_in_notes, item.check_in.as_mut()) {
        record.notes = clean_text(Some(notes));
    }
    if let Some(sale) = patch.sale {
        item.sale = normalize_listing(sale.into());
    }
    if let Some(owner) = patch.owner {
        item.owner = normalize_owner(owner);
    }
    if let Some(mut service) = patch.service {
        service.notes = clean_text(service.notes);
        item.service = service;
    }

    item.updated_at = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::collection::domain::SaleConfig;

    fn draft() -> ItemDraft {
        ItemDraft {
            name: "Galaga".to_string(),
            category: Some(CategoryKind::Arcade),
            owner: OwnerContact {
                name: "Pat".to_string(),
                email: "pat@x.com".to_string(),
                ..OwnerContact::default()
            },
            ..ItemDraft::default()
        }
    }

    fn pending_item() -> Item {
        item_from_draft(
            ItemId("item-test".to_string()),
            draft(),
            Origin::PublicSubmission,
            Utc::now(),
        )
    }

    #[test]
    fn submissions_start_pending_and_unlisted() {
        let item = pending_item();
        assert_eq!(item.approval_status(), ApprovalStatus::Pending);
        assert!(!item.checked_in());
        assert!(!item.sale.for_sale);
        assert!(item.submitted_at.is_some());
        assert_eq!(item.slug, "galaga");
    }

    #[test]
    fn staff_entries_are_approved_by_system() {
        let item = item_from_draft(
            ItemId("item-staff".to_string()),
            draft(),
            Origin::StaffEntry,
            Utc::now(),
        );
        match item.approval {
            Approval::Approved { approved_by, .. } => assert_eq!(approved_by, SYSTEM_APPROVER),
            other => panic!("expected approval, got {other:?}"),
        }
        assert!(item.submitted_at.is_none());
    }

    #[test]
    fn submitted_price_forces_listing() {
        let mut submission = draft();
        submission.sale.asking_price = Some(Decimal::new(750, 0));
        submission.sale.for_sale = false;
        let item = item_from_draft(
            ItemId("item-priced".to_string()),
            submission,
            Origin::PublicSubmission,
            Utc::now(),
        );
        assert!(item.sale.for_sale);
    }

    #[test]
    fn approve_only_from_pending() {
        let mut item = pending_item();
        approve(&mut item, "staff1", Utc::now()).expect("pending item approves");
        assert_eq!(item.approval_status(), ApprovalStatus::Approved);

        let error = approve(&mut item, "staff2", Utc::now()).expect_err("already approved");
        assert_eq!(error.from, "approved");
        assert!(matches!(
            reject(&mut item, "late", Utc::now()),
            Err(RuleError::Transition(_))
        ));
    }

    #[test]
    fn reject_requires_reason_and_is_terminal() {
        let mut item = pending_item();
        assert!(matches!(
            reject(&mut item, "  ", Utc::now()),
            Err(RuleError::Validation(_))
        ));
        assert_eq!(item.approval_status(), ApprovalStatus::Pending);

        reject(&mut item, "Not a coin-op machine", Utc::now()).expect("rejects");
        assert_eq!(item.approval.rejection_reason(), Some("Not a coin-op machine"));
        assert!(approve(&mut item, "staff1", Utc::now()).is_err());
    }

    #[test]
    fn patch_reapplies_price_invariant_without_touching_approval() {
        let mut item = pending_item();
        let patch = ItemPatch {
            name: Some("Galaga '88".to_string()),
            sale: Some(SaleConfig {
                asking_price: Some(Decimal::new(500, 0)),
                for_sale: false,
                ..SaleConfig::default()
            }),
            ..ItemPatch::default()
        };
        apply_patch(&mut item, patch, Utc::now()).expect("patch applies");
        assert!(item.sale.for_sale);
        assert_eq!(item.slug, "galaga--88");
        assert_eq!(item.approval_status(), ApprovalStatus::Pending);
    }

    #[test]
    fn clearing_price_keeps_requested_flag() {
        let mut item = pending_item();
        apply_sale_listing(
            &mut item,
            SaleListing {
                for_sale: true,
                asking_price: None,
                ..SaleListing::default()
            },
            Utc::now(),
        );
        assert!(item.sale.for_sale);
        assert!(item.sale.asking_price.is_none());
    }

    #[test]
    fn check_in_notes_need_a_check_in() {
        let mut item = pending_item();
        let patch = ItemPatch {
            check_in_notes: Some("left side panel scratched".to_string()),
            ..ItemPatch::default()
        };
        assert!(apply_patch(&mut item, patch, Utc::now()).is_err());
    }
}
