use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{
    BuyerContact, CategoryKind, CheckInRequest, Item, ItemDraft, ItemPatch, OwnerContact,
    SaleConfig,
};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

const EARLIEST_MANUFACTURE_YEAR: u16 = 1900;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// Every field that failed validation, in form order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation {
                field,
                message: message.into(),
            }],
        }
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|violation| violation.field).collect()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.violations.iter().any(|violation| violation.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid input: ")?;
        for (index, violation) in self.violations.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} {}", violation.field, violation.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Accumulates violations so callers see every failing field at once.
#[derive(Debug, Default)]
struct Violations(Vec<FieldViolation>);

impl Violations {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldViolation {
            field,
            message: message.into(),
        });
    }

    fn require_text(&mut self, field: &'static str, value: &str) {
        if is_blank(value) {
            self.push(field, "is required");
        }
    }

    fn require_email(&mut self, field: &'static str, value: &str) {
        if is_blank(value) {
            self.push(field, "is required");
        } else if !is_valid_email(value) {
            self.push(field, "must be a valid email address");
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations: self.0 })
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value.trim())
}

/// Normalizes optional free text so whitespace-only input is stored as absent.
pub(crate) fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Guard that every inbound form passes through before touching the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    pub fn check_draft(&self, draft: &ItemDraft, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let mut violations = Violations::default();

        violations.require_text("name", &draft.name);
        match draft.category {
            None => violations.push("category", "is required"),
            Some(CategoryKind::Other) => {
                if draft.category_other.as_deref().map_or(true, is_blank) {
                    violations.push("category_other", "must describe the category when 'other' is chosen");
                }
            }
            Some(_) => {}
        }
        self.check_year(&mut violations, draft.manufacture_year, now);
        self.check_images(&mut violations, &draft.images);
        self.check_owner(&mut violations, &draft.owner);
        self.check_price(&mut violations, draft.sale.asking_price);

        violations.finish()
    }

    /// Checks a patch against the machine it will be merged into.
    pub fn check_patch(
        &self,
        current: &Item,
        patch: &ItemPatch,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let mut violations = Violations::default();

        if let Some(name) = &patch.name {
            violations.require_text("name", name);
        }
        let category = patch.category.unwrap_or(current.category);
        let category_other = if patch.category.is_some() || patch.category_other.is_some() {
            patch.category_other.as_deref()
        } else {
            current.category_other.as_deref()
        };
        if category == CategoryKind::Other && category_other.map_or(true, is_blank) {
            violations.push("category_other", "must describe the category when 'other' is chosen");
        }
        self.check_year(&mut violations, patch.manufacture_year, now);
        if let Some(images) = &patch.images {
            self.check_images(&mut violations, images);
        }
        if let Some(zone) = &patch.zone {
            violations.require_text("zone", zone);
        }
        if let Some(owner) = &patch.owner {
            self.check_owner(&mut violations, owner);
        }
        if let Some(sale) = &patch.sale {
            self.check_price(&mut violations, sale.asking_price);
        }

        violations.finish()
    }

    pub fn check_sale_config(&self, config: &SaleConfig) -> Result<(), ValidationError> {
        let mut violations = Violations::default();
        self.check_price(&mut violations, config.asking_price);
        if config.missing_parts.iter().any(|part| is_blank(part)) {
            violations.push("sale.missing_parts", "entries must not be blank");
        }
        violations.finish()
    }

    pub fn check_check_in(&self, request: &CheckInRequest) -> Result<(), ValidationError> {
        let mut violations = Violations::default();
        violations.require_text("zone", &request.zone);
        violations.finish()
    }

    pub fn check_buyer(
        &self,
        buyer: &BuyerContact,
        amount: Option<Decimal>,
    ) -> Result<(), ValidationError> {
        let mut violations = Violations::default();
        violations.require_text("buyer.name", &buyer.name);
        violations.require_email("buyer.email", &buyer.email);
        if matches!(amount, Some(value) if value <= Decimal::ZERO) {
            violations.push("amount", "must be greater than zero");
        }
        violations.finish()
    }

    pub fn check_ticket(&self, description: &str) -> Result<(), ValidationError> {
        let mut violations = Violations::default();
        violations.require_text("description", description);
        violations.finish()
    }

    fn check_owner(&self, violations: &mut Violations, owner: &OwnerContact) {
        violations.require_text("owner.name", &owner.name);
        violations.require_email("owner.email", &owner.email);
    }

    fn check_price(&self, violations: &mut Violations, price: Option<Decimal>) {
        if matches!(price, Some(value) if value <= Decimal::ZERO) {
            violations.push("sale.asking_price", "must be greater than zero when set");
        }
    }

    fn check_year(&self, violations: &mut Violations, year: Option<u16>, now: DateTime<Utc>) {
        let Some(year) = year else {
            return;
        };
        let latest = u16::try_from(now.year() + 1).unwrap_or(u16::MAX);
        if !(EARLIEST_MANUFACTURE_YEAR..=latest).contains(&year) {
            violations.push(
                "manufacture_year",
                format!("must fall between {EARLIEST_MANUFACTURE_YEAR} and {latest}"),
            );
        }
    }

    fn check_images(&self, violations: &mut Violations, images: &[String]) {
        if images.iter().any(|url| is_blank(url)) {
            violations.push("images", "entries must not be blank");
        }
    }
}
