//! The pricing cascade: line items and rates folded into estimate totals.
//!
//! Every stage feeds the next and the order is load-bearing; PST applies
//! before profit and GST applies after, so reordering stages changes the
//! grand total.
//!
//! # Cascade stages
//!
//! | Stage | Value |
//! |-------|-------|
//! | 1  | Item total (labour uses journey/crew, everything else quantity × price) |
//! | 2  | Effective markup (per-item override, else estimate markup) |
//! | 3  | Item total with markup |
//! | 4  | Section subtotals, in registry order |
//! | 5  | Direct-costs total (Σ stage 3) and markup delta vs. raw Σ stage 1 |
//! | 6  | Taxable total (Σ stage 3 over taxable items) |
//! | 7  | PST = taxable total × pst% |
//! | 8  | Subtotal = direct costs + PST |
//! | 9  | Profit = subtotal × profit% |
//! | 10 | Pre-tax final = subtotal + profit |
//! | 11 | GST = pre-tax final × gst% |
//! | 12 | Grand total = pre-tax final + GST |
//!
//! The cascade has no error path: missing numbers count as zero, and a
//! zero-quantity or zero-price item contributes nothing while remaining
//! present in its section listing. Values keep full precision throughout;
//! rounding happens only at the presentation boundary
//! ([`crate::calculations::common::round_display`]).
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use estimate_core::calculations::pricing::price_estimate;
//! use estimate_core::models::{ItemKind, LineItem, Rates, SectionRegistry};
//!
//! let sections = SectionRegistry::from_order(["Shop"]);
//! let items = vec![LineItem {
//!     id: None,
//!     name: "Underlayment".to_string(),
//!     description: String::new(),
//!     section: "Shop".to_string(),
//!     unit: "roll".to_string(),
//!     quantity: dec!(3),
//!     unit_price: dec!(10),
//!     markup_override: None,
//!     taxable: true,
//!     kind: ItemKind::Shop,
//! }];
//! let rates = Rates::new(dec!(5), dec!(7), dec!(5), dec!(0));
//!
//! let totals = price_estimate(&items, &sections, &rates);
//!
//! assert_eq!(totals.grand_total, dec!(35.39025));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{ItemKind, JourneyType, LineItem, Rates, SectionRegistry};

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Marked-up subtotal of one section, in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSubtotal {
    pub name: String,
    /// Display label at calculation time; renames do not affect grouping.
    pub label: String,
    pub subtotal: Decimal,
}

/// Fully reconciled output of the cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateTotals {
    /// One entry per section, registry order, plus trailing entries for any
    /// item section missing from the registry.
    pub section_subtotals: Vec<SectionSubtotal>,

    /// Σ item totals before markup; retained only to derive `markup_delta`.
    pub raw_cost_total: Decimal,

    /// Σ item totals with markup; equal to the sum of section subtotals.
    pub direct_cost_total: Decimal,

    /// `direct_cost_total − raw_cost_total`. Negative when overrides
    /// discount below cost; accepted as-is.
    pub markup_delta: Decimal,

    /// Σ marked-up totals over items where `taxable` is true.
    pub taxable_total: Decimal,

    pub pst: Decimal,

    /// Direct costs plus PST.
    pub subtotal: Decimal,

    pub profit: Decimal,

    /// Subtotal plus profit; the base GST applies to.
    pub pre_tax_total: Decimal,

    pub gst: Decimal,

    pub grand_total: Decimal,
}

/// Calculator over a fixed section order.
///
/// Stateless apart from the borrowed registry; calling [`Self::calculate`]
/// twice on the same inputs yields identical totals.
#[derive(Debug, Clone)]
pub struct PricingCascade<'a> {
    sections: &'a SectionRegistry,
}

impl<'a> PricingCascade<'a> {
    pub fn new(sections: &'a SectionRegistry) -> Self {
        Self { sections }
    }

    /// Runs the twelve cascade stages over `items`.
    pub fn calculate(&self, items: &[LineItem], rates: &Rates) -> EstimateTotals {
        let section_subtotals = self.section_subtotals(items, rates);

        let raw_cost_total: Decimal = items.iter().map(Self::item_total).sum();
        let direct_cost_total: Decimal = items
            .iter()
            .map(|it| Self::item_total_with_markup(it, rates))
            .sum();
        let markup_delta = direct_cost_total - raw_cost_total;

        let taxable_total: Decimal = items
            .iter()
            .filter(|it| it.taxable)
            .map(|it| Self::item_total_with_markup(it, rates))
            .sum();

        let pst = taxable_total * rates.pst_percent / ONE_HUNDRED;
        let subtotal = direct_cost_total + pst;
        let profit = subtotal * rates.profit_percent / ONE_HUNDRED;
        let pre_tax_total = subtotal + profit;
        let gst = pre_tax_total * rates.gst_percent / ONE_HUNDRED;
        let grand_total = pre_tax_total + gst;

        EstimateTotals {
            section_subtotals,
            raw_cost_total,
            direct_cost_total,
            markup_delta,
            taxable_total,
            pst,
            subtotal,
            profit,
            pre_tax_total,
            gst,
            grand_total,
        }
    }

    /// Stage 1: cost of one item before markup.
    ///
    /// Contract labour is journey × price regardless of crew size; daily and
    /// hourly labour multiply by the crew as well. Everything else is the
    /// authoritative `quantity` × price.
    fn item_total(item: &LineItem) -> Decimal {
        match &item.kind {
            ItemKind::Labour(l) => match l.journey_type {
                JourneyType::Contract => l.journey * item.unit_price,
                JourneyType::Days | JourneyType::Hours => l.journey * l.men * item.unit_price,
            },
            _ => item.quantity * item.unit_price,
        }
    }

    /// Stage 2: the markup percentage in force for one item.
    fn effective_markup(item: &LineItem, rates: &Rates) -> Decimal {
        item.markup_override.unwrap_or(rates.markup_percent)
    }

    /// Stage 3: item total with its effective markup applied.
    fn item_total_with_markup(item: &LineItem, rates: &Rates) -> Decimal {
        Self::item_total(item) * (Decimal::ONE + Self::effective_markup(item, rates) / ONE_HUNDRED)
    }

    /// Stage 4: marked-up subtotal per section, in registry order.
    ///
    /// Items referencing a section the registry does not know are grouped
    /// into trailing buckets in first-appearance order; section sync makes
    /// this unreachable in normal operation, but the cascade must not drop
    /// money if it happens.
    fn section_subtotals(&self, items: &[LineItem], rates: &Rates) -> Vec<SectionSubtotal> {
        let mut subtotals: Vec<SectionSubtotal> = self
            .sections
            .iter()
            .map(|section| SectionSubtotal {
                name: section.name.clone(),
                label: section.label().to_string(),
                subtotal: items
                    .iter()
                    .filter(|it| it.section == section.name)
                    .map(|it| Self::item_total_with_markup(it, rates))
                    .sum(),
            })
            .collect();

        for item in items {
            if self.sections.contains(&item.section) {
                continue;
            }
            let value = Self::item_total_with_markup(item, rates);
            match subtotals.iter_mut().find(|s| s.name == item.section) {
                Some(bucket) => bucket.subtotal += value,
                None => subtotals.push(SectionSubtotal {
                    name: item.section.clone(),
                    label: item.section.clone(),
                    subtotal: value,
                }),
            }
        }

        subtotals
    }
}

/// Convenience entry point: run the cascade over an item list.
pub fn price_estimate(
    items: &[LineItem],
    sections: &SectionRegistry,
    rates: &Rates,
) -> EstimateTotals {
    PricingCascade::new(sections).calculate(items, rates)
}
