use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{
    Inquiry, InquiryId, InquiryIntent, InquiryRequest, InquiryStatus, Item,
    SaleListing,
};
use super::intake::{clean_text, IntakeGuard, ValidationError};
use super::lifecycle::{RuleError, TransitionError};

/// Which machines the public marketplace surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingMode {
    /// Only machines flagged for sale.
    #[default]
    ForSale,
    /// Every approved machine, inviting offers regardless of sale flags.
    BrowseAll,
}

/// Marketplace selection over approved machines. A positive price always implies `for_sale`,
/// so the flag alone decides in `ForSale` mode.
pub fn is_listed(item: &Item, mode: ListingMode) -> bool {
    item.is_public()
        && match mode {
            ListingMode::ForSale => item.sale.for_sale,
            ListingMode::BrowseAll => true,
        }
}

pub fn price_label(listing: &SaleListing) -> String {
    match listing.asking_price {
        Some(price) if price > Decimal::ZERO => format!("${price:.2}"),
        _ => "Make offer".to_string(),
    }
}

/// Resolve the stored amount for a new inquiry.
///
/// Purchases always carry the current asking price; offers keep whatever the buyer typed.
pub fn inquiry_amount(
    item: &Item,
    intent: InquiryIntent,
    requested: Option<Decimal>,
) -> Result<Option<Decimal>, ValidationError> {
    match intent {
        InquiryIntent::Purchase => match item.sale.asking_price {
            Some(price) if price > Decimal::ZERO => Ok(Some(price)),
            _ => Err(ValidationError::single(
                "intent",
                "purchase requires an asking price; make an offer instead",
            )),
        },
        InquiryIntent::Offer => Ok(requested),
    }
}

fn default_message(item: &Item, intent: InquiryIntent, amount: Option<Decimal>) -> String {
    match (intent, amount) {
        (InquiryIntent::Purchase, Some(price)) => {
            format!("I'd like to purchase {} at the asking price of ${price:.2}.", item.name)
        }
        (InquiryIntent::Offer, Some(offer)) => {
            format!("I'd like to offer ${offer:.2} for {}.", item.name)
        }
        _ => format!("I'm interested in {}.", item.name),
    }
}

/// Build a pending inquiry from a buyer request.
pub fn new_inquiry(
    id: InquiryId,
    item: &Item,
    request: InquiryRequest,
    now: DateTime<Utc>,
) -> Result<Inquiry, RuleError> {
    let amount = match request.intent {
        InquiryIntent::Purchase => None,
        InquiryIntent::Offer => request.amount,
    };
    IntakeGuard.check_buyer(&request.buyer, amount)?;
    let amount = inquiry_amount(item, request.intent, amount)?;

    let message = clean_text(request.message)
        .unwrap_or_else(|| default_message(item, request.intent, amount));

    let mut buyer = request.buyer;
    buyer.name = buyer.name.trim().to_string();
    buyer.email = buyer.email.trim().to_string();
    buyer.phone = clean_text(buyer.phone);

    Ok(Inquiry {
        id,
        item_id: item.id.clone(),
        buyer,
        amount,
        message,
        status: InquiryStatus::Pending,
        created_at: now,
    })
}

pub const fn can_advance(from: InquiryStatus, to: InquiryStatus) -> bool {
    matches!(
        (from, to),
        (InquiryStatus::Pending, InquiryStatus::Responded)
            | (
                InquiryStatus::Pending | InquiryStatus::Responded,
                InquiryStatus::Accepted | InquiryStatus::Declined
            )
    )
}

pub fn advance(inquiry: &mut Inquiry, next: InquiryStatus) -> Result<(), TransitionError> {
    if !can_advance(inquiry.status, next) {
        return Err(TransitionError {
            entity: "inquiry",
            from: inquiry.status.label(),
            to: next.label(),
        });
    }
    inquiry.status = next;
    Ok(())
}
