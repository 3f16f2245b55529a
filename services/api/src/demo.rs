use crate::infra::{build_service, RegistryService};
use arcade_registry::config::RegistryConfig;
use arcade_registry::error::AppError;
use arcade_registry::workflows::collection::{
    Actor, BuyerContact, CategoryKind, CheckInRequest, InquiryIntent, InquiryRequest,
    InquiryStatus, ItemDraft, ListingMode, OwnerContact, RegistryError, SaleConfig,
};
use clap::Args;
use rust_decimal::Decimal;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Staff identity used for review, check-in, and negotiation steps
    #[arg(long, default_value = "demo-staff@arcade.test")]
    pub(crate) staff: String,
    /// Machine name to submit
    #[arg(long, default_value = "Galaga")]
    pub(crate) name: String,
    /// Asking price in whole dollars
    #[arg(long, default_value_t = 500)]
    pub(crate) asking_price: u32,
    /// Leave the machine in place instead of deleting it at the end
    #[arg(long)]
    pub(crate) keep_item: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        staff,
        name,
        asking_price,
        keep_item,
    } = args;

    let config = RegistryConfig {
        staff_emails: vec![staff.clone()],
        notify_email: None,
    };
    let service = build_service(&config);
    let staff = Actor::identified(staff);

    println!("Arcade registry demo");
    let item = service.submit(ItemDraft {
        name,
        category: Some(CategoryKind::Arcade),
        owner: OwnerContact {
            name: "Pat".to_string(),
            email: "pat@x.com".to_string(),
            ..OwnerContact::default()
        },
        ..ItemDraft::default()
    })?;
    println!("- Submitted {} ({}) -> {}", item.name, item.id.0, item.status_label());

    let item = service.approve(&staff, &item.id)?;
    println!("- Approved -> {}", item.status_label());

    let item = service.check_in(
        &staff,
        &item.id,
        CheckInRequest {
            has_key: true,
            working_condition: true,
            zone: "Zone 4".to_string(),
            notes: None,
        },
    )?;
    if let Some(record) = &item.check_in {
        println!(
            "- Checked in to {} at {} by {}",
            item.zone.as_deref().unwrap_or("unassigned"),
            record.checked_in_at.format("%Y-%m-%d %H:%M UTC"),
            record.checked_in_by
        );
    }

    let item = service.set_sale_config(
        &staff,
        &item.id,
        SaleConfig {
            asking_price: Some(Decimal::from(asking_price)),
            for_sale: false,
            ..SaleConfig::default()
        },
        Some(item.version),
    )?;
    println!(
        "- Priced at ${asking_price}; listed for sale: {}",
        item.sale.for_sale
    );
    for entry in service.marketplace(ListingMode::ForSale)? {
        println!("  marketplace: {} | {}", entry.item.name, entry.price_label);
    }

    let inquiry = service.create_inquiry(
        &item.id,
        InquiryRequest {
            buyer: BuyerContact {
                name: "Lee".to_string(),
                email: "lee@y.com".to_string(),
                phone: None,
            },
            intent: InquiryIntent::Purchase,
            amount: None,
            message: None,
        },
    )?;
    println!(
        "- Purchase inquiry {} for {} -> {}",
        inquiry.id.0,
        inquiry
            .amount
            .map(|amount| format!("${amount:.2}"))
            .unwrap_or_else(|| "no amount".to_string()),
        inquiry.status.label()
    );

    let inquiry = service.advance_inquiry(&staff, &inquiry.id, InquiryStatus::Accepted)?;
    println!("  staff accepted -> {}", inquiry.status.label());
    match service.advance_inquiry(&staff, &inquiry.id, InquiryStatus::Pending) {
        Err(RegistryError::InvalidTransition(err)) => println!("  reopening refused: {err}"),
        Err(err) => return Err(err.into()),
        Ok(_) => println!("  unexpected: inquiry reopened"),
    }

    let ticket = service.open_ticket(&staff, &item.id, "Coin door stuck")?;
    println!("- Opened maintenance ticket {}: {}", ticket.id.0, ticket.description);

    if keep_item {
        print_queue(&service, &staff)?;
        return Ok(());
    }

    let report = service.delete_item(&staff, &item.id)?;
    println!(
        "- Deleted {} with {} ticket(s), {} inquiry(ies), {} warning(s)",
        report.item_id.0,
        report.tickets_removed,
        report.inquiries_removed,
        report.warnings.len()
    );
    print_queue(&service, &staff)
}

fn print_queue(service: &RegistryService, staff: &Actor) -> Result<(), AppError> {
    let queue = service.check_in_queue(staff)?;
    println!("Check-in desk: {} machine(s)", queue.len());
    for entry in queue {
        println!(
            "  - {} ({}) {}",
            entry.name,
            entry.owner_name,
            entry.status
        );
    }
    Ok(())
}
