use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::pricing::{EstimateTotals, price_estimate};
use crate::calculations::quantity::derive_purchase_quantity;

use super::line_item::{CoverageUnit, ItemKind, LineItem, ValidationError};
use super::rates::Rates;
use super::section::SectionRegistry;

/// Wire shape exchanged with the persistence gateway.
///
/// Item serialization includes every applicable field of its variant and
/// omits the rest; reloading a payload reproduces section order, item
/// fields, and rates identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatePayload {
    pub project_id: String,
    pub markup: Decimal,
    pub pst_rate: Decimal,
    pub gst_rate: Decimal,
    pub profit_rate: Decimal,
    pub section_order: Vec<String>,
    pub items: Vec<LineItem>,
}

/// The top-level priced proposal for one project.
///
/// Owns the rates, the canonical section order, and the item list. Every
/// mutation goes through an explicit method that leaves derived fields
/// consistent; there is no merge strategy for two sessions editing the same
/// estimate, so an estimate belongs to exactly one editing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    /// Absent until the first save assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub project_id: String,
    pub rates: Rates,
    pub sections: SectionRegistry,
    pub items: Vec<LineItem>,
}

impl Estimate {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            id: None,
            project_id: project_id.into(),
            rates: Rates::default(),
            sections: SectionRegistry::new(),
            items: Vec::new(),
        }
    }

    /// Whether there is anything worth persisting yet.
    pub fn has_content(&self) -> bool {
        !self.items.is_empty() || self.id.is_some()
    }

    /// Validates and inserts an item, deriving the purchase quantity for
    /// products and registering its section if new.
    ///
    /// Returns the index of the inserted item.
    pub fn add_item(&mut self, mut item: LineItem) -> Result<usize, ValidationError> {
        item.validate()?;
        if let ItemKind::Product(product) = &item.kind {
            item.quantity = derive_purchase_quantity(product, item.quantity);
        }
        self.items.push(item);
        self.sections.sync_new_sections(&self.items);
        Ok(self.items.len() - 1)
    }

    pub fn remove_item(&mut self, index: usize) -> Option<LineItem> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Removes a section and every item grouped under it, atomically from
    /// the caller's perspective: an unknown section name changes nothing.
    ///
    /// Returns how many items were deleted.
    pub fn remove_section(&mut self, name: &str) -> usize {
        if !self.sections.remove(name) {
            return 0;
        }
        let before = self.items.len();
        self.items.retain(|item| item.section != name);
        let removed = before - self.items.len();
        tracing::debug!(section = name, removed, "removed section and its items");
        removed
    }

    pub fn set_rates(&mut self, rates: Rates) {
        self.rates = rates;
    }

    pub fn set_unit_price(&mut self, index: usize, unit_price: Decimal) {
        if let Some(item) = self.items.get_mut(index) {
            item.unit_price = unit_price;
        }
    }

    pub fn set_markup_override(&mut self, index: usize, markup: Option<Decimal>) {
        if let Some(item) = self.items.get_mut(index) {
            item.markup_override = markup;
        }
    }

    pub fn set_taxable(&mut self, index: usize, taxable: bool) {
        if let Some(item) = self.items.get_mut(index) {
            item.taxable = taxable;
        }
    }

    /// Updates a product item's demand and re-derives its purchase quantity.
    /// No-op for non-product items.
    pub fn set_product_demand(
        &mut self,
        index: usize,
        qty_required: Option<Decimal>,
        unit_required: CoverageUnit,
    ) {
        if let Some(item) = self.items.get_mut(index)
            && let ItemKind::Product(product) = &mut item.kind
        {
            product.qty_required = qty_required;
            product.unit_required = unit_required;
        }
        self.recompute_derived(index);
    }

    /// Re-runs quantity derivation for one item.
    ///
    /// The single explicit step that follows any mutation of demand or
    /// packaging metadata, however the mutation was triggered.
    pub fn recompute_derived(&mut self, index: usize) {
        if let Some(item) = self.items.get_mut(index)
            && let ItemKind::Product(product) = &item.kind
        {
            item.quantity = derive_purchase_quantity(product, item.quantity);
        }
    }

    /// Runs the pricing cascade over the current state.
    pub fn totals(&self) -> EstimateTotals {
        price_estimate(&self.items, &self.sections, &self.rates)
    }

    pub fn to_payload(&self) -> EstimatePayload {
        EstimatePayload {
            project_id: self.project_id.clone(),
            markup: self.rates.markup_percent,
            pst_rate: self.rates.pst_percent,
            gst_rate: self.rates.gst_percent,
            profit_rate: self.rates.profit_percent,
            section_order: self.sections.order(),
            items: self.items.clone(),
        }
    }

    /// Rebuilds an estimate from a persisted payload.
    ///
    /// Sections referenced by items but missing from the stored order are
    /// appended, never reordered ahead of existing entries.
    pub fn from_payload(id: Option<i64>, payload: EstimatePayload) -> Self {
        let mut sections = SectionRegistry::from_order(payload.section_order);
        sections.sync_new_sections(&payload.items);
        Self {
            id,
            project_id: payload.project_id,
            rates: Rates::new(
                payload.markup,
                payload.pst_rate,
                payload.gst_rate,
                payload.profit_rate,
            ),
            sections,
            items: payload.items,
        }
    }
}
