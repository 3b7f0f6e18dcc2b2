use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejections raised when an item is added to an estimate.
///
/// These are the only user-facing validation errors in the core; everything
/// downstream of item creation resolves numeric edge cases to fallbacks
/// instead of failing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("item name must not be empty")]
    EmptyName,

    #[error("quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("labour journey must be greater than zero")]
    NonPositiveJourney,

    #[error("labour crew size must be greater than zero")]
    NonPositiveCrew,
}

/// How a product is packaged for purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackagingKind {
    /// Sold one unit at a time; purchase quantity is the demand, rounded up.
    Unitary,
    /// Sold in packages of `units_per_package`.
    Multiple,
    /// Sold by covered area; one purchase unit covers `coverage_*` of area.
    Coverage,
}

/// The unit a product demand quantity is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageUnit {
    /// Roofing squares (100 ft²).
    Sqs,
    Ft2,
    M2,
}

impl CoverageUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqs => "SQS",
            Self::Ft2 => "FT2",
            Self::M2 => "M2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SQS" => Some(Self::Sqs),
            "FT2" => Some(Self::Ft2),
            "M2" => Some(Self::M2),
            _ => None,
        }
    }
}

/// How a labour engagement is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyType {
    Days,
    Hours,
    /// Fixed-price engagement; crew size does not multiply the total.
    Contract,
}

/// Packaging and demand metadata carried only by product items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFields {
    /// Weak reference to an external catalog entry; never dereferenced here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_id: Option<String>,

    pub unit_type: PackagingKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units_per_package: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_sqs: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_ft2: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_m2: Option<Decimal>,

    /// Demand quantity in the unit the job actually needs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty_required: Option<Decimal>,

    /// Which coverage/packaging unit `qty_required` is expressed in.
    pub unit_required: CoverageUnit,
}

/// Crew and duration metadata carried only by labour items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabourFields {
    #[serde(rename = "labour_journey_type")]
    pub journey_type: JourneyType,

    /// Day count, hour count, or contract-unit count depending on the type.
    #[serde(rename = "labour_journey")]
    pub journey: Decimal,

    /// Worker count; ignored for contract engagements.
    #[serde(rename = "labour_men")]
    pub men: Decimal,
}

/// Per-type payload of a line item.
///
/// Serializes with an `item_type` tag flattened into the item record, so a
/// persisted item carries every applicable field at the top level and omits
/// the rest, matching the wire payload consumed by the persistence gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "snake_case")]
pub enum ItemKind {
    Product(ProductFields),
    Labour(LabourFields),
    Subcontractor,
    Shop,
    Miscellaneous,
}

impl ItemKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Product(_) => "product",
            Self::Labour(_) => "labour",
            Self::Subcontractor => "subcontractor",
            Self::Shop => "shop",
            Self::Miscellaneous => "miscellaneous",
        }
    }
}

fn default_true() -> bool {
    true
}

/// One purchasable or billable entry of an estimate.
///
/// `quantity` is the authoritative multiplier for the cascade, except for
/// non-contract labour where the effective multiplier is
/// `journey × men`, computed on demand rather than mirrored into `quantity`.
/// For product items `quantity` is derived from `qty_required`, never edited
/// directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Stable within a session; absent until first persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Name of the owning section (the grouping key, never the label).
    pub section: String,

    #[serde(default)]
    pub unit: String,

    pub quantity: Decimal,
    pub unit_price: Decimal,

    /// When present, supersedes the estimate-wide markup for this item only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup_override: Option<Decimal>,

    /// Controls PST applicability only, never GST or profit.
    #[serde(default = "default_true")]
    pub taxable: bool,

    #[serde(flatten)]
    pub kind: ItemKind,
}

impl LineItem {
    /// The multiplier the pricing cascade applies to `unit_price`.
    pub fn effective_quantity(&self) -> Decimal {
        match &self.kind {
            ItemKind::Labour(l) => match l.journey_type {
                JourneyType::Contract => l.journey,
                JourneyType::Days | JourneyType::Hours => l.journey * l.men,
            },
            _ => self.quantity,
        }
    }

    /// Checks an item at the point of creation.
    ///
    /// Product items may enter with a zero `quantity` because derivation
    /// fills it in from `qty_required`; every other type requires the
    /// hand-entered multiplier to be positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        match &self.kind {
            ItemKind::Product(_) => Ok(()),
            ItemKind::Labour(l) => {
                if l.journey <= Decimal::ZERO {
                    return Err(ValidationError::NonPositiveJourney);
                }
                if l.journey_type != JourneyType::Contract && l.men <= Decimal::ZERO {
                    return Err(ValidationError::NonPositiveCrew);
                }
                Ok(())
            }
            ItemKind::Subcontractor | ItemKind::Shop | ItemKind::Miscellaneous => {
                if self.quantity <= Decimal::ZERO {
                    return Err(ValidationError::NonPositiveQuantity);
                }
                Ok(())
            }
        }
    }
}
