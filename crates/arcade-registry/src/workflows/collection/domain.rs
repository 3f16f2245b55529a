use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for machines tracked by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub String);

/// Identifier wrapper for maintenance tickets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketId(pub String);

/// Identifier wrapper for buyer inquiries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InquiryId(pub String);

/// Fixed machine categories offered on the submission form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Arcade,
    Pinball,
    Console,
    Jukebox,
    Redemption,
    Other,
}

impl CategoryKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Arcade => "Arcade",
            Self::Pinball => "Pinball",
            Self::Console => "Console",
            Self::Jukebox => "Jukebox",
            Self::Redemption => "Redemption",
            Self::Other => "Other",
        }
    }
}

/// Physical condition reported for a machine, independent of any administrative state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionStatus {
    #[default]
    Operational,
    InRepair,
    AwaitingParts,
}

impl ConditionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Operational => "Operational",
            Self::InRepair => "In Repair",
            Self::AwaitingParts => "Awaiting Parts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Administrative gate with the metadata each state carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Approval {
    Pending,
    Approved {
        approved_by: String,
        approved_at: DateTime<Utc>,
    },
    Rejected {
        reason: String,
        rejected_at: DateTime<Utc>,
    },
}

impl Approval {
    pub const fn status(&self) -> ApprovalStatus {
        match self {
            Self::Pending => ApprovalStatus::Pending,
            Self::Approved { .. } => ApprovalStatus::Approved,
            Self::Rejected { .. } => ApprovalStatus::Rejected,
        }
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            Self::Rejected { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }
}

/// Verification captured when staff physically receive a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRecord {
    pub has_key: bool,
    pub working_condition: bool,
    pub notes: Option<String>,
    pub checked_in_at: DateTime<Utc>,
    pub checked_in_by: String,
}

/// Sale configuration; an absent asking price means "make offer".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleListing {
    pub for_sale: bool,
    pub asking_price: Option<Decimal>,
    pub accept_offers: bool,
    pub condition_notes: Option<String>,
    pub missing_parts: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnerContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub display_publicly: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicePreference {
    pub allow_others_to_service: bool,
    pub notes: Option<String>,
}

/// The machine record shared by every subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub slug: String,
    pub category: CategoryKind,
    pub category_other: Option<String>,
    pub manufacture_year: Option<u16>,
    pub condition: ConditionStatus,
    pub condition_notes: Option<String>,
    pub images: Vec<String>,
    pub zone: Option<String>,
    pub approval: Approval,
    pub check_in: Option<CheckInRecord>,
    pub sale: SaleListing,
    pub owner: OwnerContact,
    pub service: ServicePreference,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl Item {
    pub const fn approval_status(&self) -> ApprovalStatus {
        self.approval.status()
    }

    pub const fn checked_in(&self) -> bool {
        self.check_in.is_some()
    }

    /// Only approved machines reach anonymous callers, whatever their sale flags say.
    pub fn is_public(&self) -> bool {
        self.approval_status() == ApprovalStatus::Approved
    }

    /// Display label combining the approval gate and check-in state.
    pub fn status_label(&self) -> &'static str {
        match (self.approval_status(), self.checked_in()) {
            (ApprovalStatus::Pending, _) => "pending approval",
            (ApprovalStatus::Rejected, _) => "rejected",
            (ApprovalStatus::Approved, false) => "awaiting check-in",
            (ApprovalStatus::Approved, true) => "checked in",
        }
    }

    pub fn category_label(&self) -> String {
        match (&self.category, &self.category_other) {
            (CategoryKind::Other, Some(other)) => other.clone(),
            (kind, _) => kind.label().to_string(),
        }
    }
}

/// Lower-cases the display name and replaces every non-ASCII-alphanumeric character with a hyphen.
///
/// Slugs are cosmetic; two machines with the same name share a slug.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// A reported problem with a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceTicket {
    pub id: TicketId,
    pub item_id: ItemId,
    pub description: String,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    Pending,
    Responded,
    Accepted,
    Declined,
}

impl InquiryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Responded => "responded",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Declined)
    }
}

/// Why the buyer reached out; only shapes the amount and message at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryIntent {
    Purchase,
    Offer,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuyerContact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A buyer's recorded interest in a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: InquiryId,
    pub item_id: ItemId,
    pub buyer: BuyerContact,
    pub amount: Option<Decimal>,
    pub message: String,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
}

/// Publicly submitted or staff-entered description of a machine before validation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDraft {
    pub name: String,
    pub category: Option<CategoryKind>,
    pub category_other: Option<String>,
    pub manufacture_year: Option<u16>,
    pub condition: ConditionStatus,
    pub condition_notes: Option<String>,
    pub images: Vec<String>,
    pub owner: OwnerContact,
    pub service: ServicePreference,
    pub sale: SaleListing,
}

/// Field-level updates applied by staff; `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub category: Option<CategoryKind>,
    pub category_other: Option<String>,
    pub manufacture_year: Option<u16>,
    pub condition: Option<ConditionStatus>,
    pub condition_notes: Option<String>,
    pub images: Option<Vec<String>>,
    pub zone: Option<String>,
    pub check_in_notes: Option<String>,
    pub revert_check_in: bool,
    pub sale: Option<SaleConfig>,
    pub owner: Option<OwnerContact>,
    pub service: Option<ServicePreference>,
    pub expected_version: Option<u64>,
}

/// Requested sale configuration; the stored listing may differ once invariants apply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleConfig {
    pub asking_price: Option<Decimal>,
    pub for_sale: bool,
    pub accept_offers: bool,
    pub condition_notes: Option<String>,
    pub missing_parts: Vec<String>,
    pub notes: Option<String>,
}

impl From<SaleConfig> for SaleListing {
    fn from(config: SaleConfig) -> Self {
        Self {
            for_sale: config.for_sale,
            asking_price: config.asking_price,
            accept_offers: config.accept_offers,
            condition_notes: config.condition_notes,
            missing_parts: config.missing_parts,
            notes: config.notes,
        }
    }
}

/// Staff verification captured at the venue.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckInRequest {
    pub has_key: bool,
    pub working_condition: bool,
    pub zone: String,
    pub notes: Option<String>,
}

/// Buyer-submitted inquiry before the engine fills in derived fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryRequest {
    pub buyer: BuyerContact,
    pub intent: InquiryIntent,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_replaces_each_non_alphanumeric() {
        assert_eq!(slugify("Galaga"), "galaga");
        assert_eq!(slugify("Ms. Pac-Man"), "ms--pac-man");
        assert_eq!(slugify("  Attack from Mars "), "attack-from-mars");
        assert_eq!(slugify("Pokémon Pinball"), "pok-mon-pinball");
    }

    #[test]
    fn approval_exposes_reason_only_when_rejected() {
        let rejected = Approval::Rejected {
            reason: "duplicate".to_string(),
            rejected_at: Utc::now(),
        };
        assert_eq!(rejected.status(), ApprovalStatus::Rejected);
        assert_eq!(rejected.rejection_reason(), Some("duplicate"));
        assert_eq!(Approval::Pending.rejection_reason(), None);
    }

    #[test]
    fn inquiry_terminal_states() {
        assert!(InquiryStatus::Accepted.is_terminal());
        assert!(InquiryStatus::Declined.is_terminal());
        assert!(!InquiryStatus::Responded.is_terminal());
    }
}
