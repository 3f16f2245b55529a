//! Read-time projection of a machine record for a given audience.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{
    Approval, ApprovalStatus, CategoryKind, CheckInRecord, ConditionStatus, Inquiry, Item, ItemId,
    MaintenanceTicket, OwnerContact, ServicePreference,
};
use super::maintenance;
use super::negotiation::price_label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    Anonymous,
    Owner,
    Staff,
}

/// Child records the staff view may include.
#[derive(Debug, Clone, Copy, Default)]
pub struct Related<'a> {
    pub tickets: &'a [MaintenanceTicket],
    pub inquiries: &'a [Inquiry],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleBlock {
    pub asking_price: Option<Decimal>,
    pub price_label: String,
    pub accept_offers: bool,
    pub condition_notes: Option<String>,
    pub missing_parts: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactBlock {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Submission echo for the owning party and staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerBlock {
    pub contact: OwnerContact,
    pub service: ServicePreference,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Staff-only administrative metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminBlock {
    pub status: &'static str,
    pub approval: Approval,
    pub check_in: Option<CheckInRecord>,
    pub for_sale_flag: bool,
    pub open_tickets: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

/// Which buttons the rendering layer should offer this viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ItemActions {
    pub purchase: bool,
    pub make_offer: bool,
    pub approve: bool,
    pub reject: bool,
    pub check_in: bool,
    pub edit: bool,
    pub delete: bool,
    pub open_ticket: bool,
    pub respond_to_inquiries: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedItem {
    pub id: ItemId,
    pub name: String,
    pub slug: String,
    pub category: CategoryKind,
    pub category_label: String,
    pub manufacture_year: Option<u16>,
    pub condition: ConditionStatus,
    pub condition_label: &'static str,
    pub condition_notes: Option<String>,
    pub images: Vec<String>,
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale: Option<SaleBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<Vec<MaintenanceTicket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inquiries: Option<Vec<Inquiry>>,
    pub actions: ItemActions,
}

fn sale_block(item: &Item) -> SaleBlock {
    SaleBlock {
        asking_price: item.sale.asking_price,
        price_label: price_label(&item.sale),
        accept_offers: item.sale.accept_offers,
        condition_notes: item.sale.condition_notes.clone(),
        missing_parts: item.sale.missing_parts.clone(),
        notes: item.sale.notes.clone(),
    }
}

fn public_actions(item: &Item) -> ItemActions {
    let for_sale = item.sale.for_sale;
    let priced = item.sale.asking_price.is_some_and(|price| price > Decimal::ZERO);
    ItemActions {
        purchase: for_sale && priced,
        make_offer: for_sale && (item.sale.accept_offers || !priced),
        ..ItemActions::default()
    }
}

fn staff_actions(item: &Item) -> ItemActions {
    let status = item.approval_status();
    ItemActions {
        approve: status == ApprovalStatus::Pending,
        reject: status == ApprovalStatus::Pending,
        check_in: status == ApprovalStatus::Approved,
        edit: true,
        delete: true,
        open_ticket: true,
        respond_to_inquiries: true,
        ..public_actions(item)
    }
}

/// Project `item` for `role`. Never mutates; `related` is ignored for non-staff viewers.
pub fn project(item: &Item, role: ViewerRole, related: Related<'_>) -> ProjectedItem {
    let staff = role == ViewerRole::Staff;
    let owner_view = matches!(role, ViewerRole::Owner | ViewerRole::Staff);

    let sale = (staff || item.sale.for_sale).then(|| sale_block(item));
    let contact = (staff || item.owner.display_publicly).then(|| ContactBlock {
        name: item.owner.name.clone(),
        email: item.owner.email.clone(),
        phone: item.owner.phone.clone(),
    });
    let owner = owner_view.then(|| OwnerBlock {
        contact: item.owner.clone(),
        service: item.service.clone(),
        submitted_at: item.submitted_at,
    });

    let (admin, maintenance, inquiries, actions) = if staff {
        let mut tickets = related.tickets.to_vec();
        maintenance::order_for_display(&mut tickets);
        let mut inquiries = related.inquiries.to_vec();
        inquiries.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        let admin = AdminBlock {
            status: item.status_label(),
            approval: item.approval.clone(),
            check_in: item.check_in.clone(),
            for_sale_flag: item.sale.for_sale,
            open_tickets: maintenance::open_count(&tickets),
            created_at: item.created_at,
            updated_at: item.updated_at,
            version: item.version,
        };
        (Some(admin), Some(tickets), Some(inquiries), staff_actions(item))
    } else {
        (None, None, None, public_actions(item))
    };

    ProjectedItem {
        id: item.id.clone(),
        name: item.name.clone(),
        slug: item.slug.clone(),
        category: item.category,
        category_label: item.category_label(),
        manufacture_year: item.manufacture_year,
        condition: item.condition,
        condition_label: item.condition.label(),
        condition_notes: item.condition_notes.clone(),
        images: item.images.clone(),
        zone: item.zone.clone(),
        sale,
        contact,
        owner,
        admin,
        maintenance,
        inquiries,
        actions,
    }
}

/// Public marketplace card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketplaceEntry {
    pub item: ProjectedItem,
    pub price_label: String,
}

impl MarketplaceEntry {
    /// Browse-all entries invite offers on any approved machine.
    pub fn new(item: &Item, invite_offers: bool) -> Self {
        let mut projected = project(item, ViewerRole::Anonymous, Related::default());
        if invite_offers {
            projected.actions.make_offer = true;
        }
        Self {
            price_label: price_label(&item.sale),
            item: projected,
        }
    }
}
