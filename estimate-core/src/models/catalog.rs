use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::gateway::GatewayError;

use super::line_item::{
    CoverageUnit, ItemKind, LineItem, PackagingKind, ProductFields,
};

/// One record from the external product catalog.
///
/// The engine only consumes this shape to seed a new product item; it does
/// not own, cache, or write catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub price: Decimal,
    pub unit_type: PackagingKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units_per_package: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_sqs: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_ft2: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_m2: Option<Decimal>,
}

impl CatalogEntry {
    /// Builds a product line item from this catalog record.
    ///
    /// The purchase quantity starts at zero and is filled in by derivation
    /// when the item is added to an estimate with a demand quantity set.
    pub fn into_line_item(
        self,
        section: impl Into<String>,
        qty_required: Option<Decimal>,
        unit_required: CoverageUnit,
    ) -> LineItem {
        LineItem {
            id: None,
            name: self.name,
            description: String::new(),
            section: section.into(),
            unit: self.unit,
            quantity: Decimal::ZERO,
            unit_price: self.price,
            markup_override: None,
            taxable: true,
            kind: ItemKind::Product(ProductFields {
                material_id: Some(self.id),
                unit_type: self.unit_type,
                units_per_package: self.units_per_package,
                coverage_sqs: self.coverage_sqs,
                coverage_ft2: self.coverage_ft2,
                coverage_m2: self.coverage_m2,
                qty_required,
                unit_required,
            }),
        }
    }
}

/// Read-only product search the engine consumes at item-creation time.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, GatewayError>;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use crate::models::Estimate;

    use super::*;

    fn entry() -> CatalogEntry {
        CatalogEntry {
            id: "mat-88".to_string(),
            name: "Laminate shingles".to_string(),
            unit: "bundle".to_string(),
            price: dec!(45.99),
            unit_type: PackagingKind::Coverage,
            units_per_package: None,
            coverage_sqs: Some(dec!(0.333)),
            coverage_ft2: Some(dec!(33.3)),
            coverage_m2: None,
        }
    }

    #[test]
    fn into_line_item_carries_packaging_and_price() {
        let item = entry().into_line_item("Roof System", Some(dec!(25)), CoverageUnit::Sqs);

        assert_eq!(item.unit_price, dec!(45.99));
        assert_eq!(item.section, "Roof System");
        match &item.kind {
            ItemKind::Product(p) => {
                assert_eq!(p.material_id.as_deref(), Some("mat-88"));
                assert_eq!(p.coverage_sqs, Some(dec!(0.333)));
                assert_eq!(p.qty_required, Some(dec!(25)));
            }
            other => panic!("expected product, got {other:?}"),
        }
    }

    #[test]
    fn catalog_item_derives_quantity_when_added() {
        let mut estimate = Estimate::new("proj-1");
        let item = entry().into_line_item("Roof System", Some(dec!(25)), CoverageUnit::Sqs);

        let index = estimate.add_item(item).unwrap();

        // ceil(25 / 0.333) = 76 bundles
        assert_eq!(estimate.items[index].quantity, dec!(76));
    }
}
