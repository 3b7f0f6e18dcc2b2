//! Purchase-quantity derivation for product items.
//!
//! Converts the demand quantity a job needs into the number of purchasable
//! units that must be bought, using the product's packaging metadata.
//! Missing or unusable metadata is never an error: the current quantity is
//! kept unchanged so an incomplete catalog record cannot wipe out a value
//! the user already has.

use rust_decimal::Decimal;

use crate::calculations::common::ceil_units;
use crate::models::{CoverageUnit, PackagingKind, ProductFields};

/// Derives the purchase quantity for a product from its demand quantity.
///
/// `current` is the item's present `quantity`, returned unchanged whenever
/// derivation has nothing to work with: no demand, a non-positive demand,
/// or packaging metadata that is absent or non-positive for the selected
/// mode. Results are always rounded up to whole units.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use estimate_core::calculations::quantity::derive_purchase_quantity;
/// use estimate_core::models::{CoverageUnit, PackagingKind, ProductFields};
///
/// let shingles = ProductFields {
///     material_id: None,
///     unit_type: PackagingKind::Coverage,
///     units_per_package: None,
///     coverage_sqs: Some(dec!(33.3)),
///     coverage_ft2: None,
///     coverage_m2: None,
///     qty_required: Some(dec!(250)),
///     unit_required: CoverageUnit::Sqs,
/// };
///
/// assert_eq!(derive_purchase_quantity(&shingles, dec!(0)), dec!(8));
/// ```
pub fn derive_purchase_quantity(product: &ProductFields, current: Decimal) -> Decimal {
    let Some(required) = product.qty_required.filter(|q| *q > Decimal::ZERO) else {
        return current;
    };

    match product.unit_type {
        PackagingKind::Unitary => ceil_units(required),
        PackagingKind::Multiple => match product.units_per_package.filter(|u| *u > Decimal::ZERO) {
            Some(per_package) => ceil_units(required / per_package),
            None => current,
        },
        PackagingKind::Coverage => {
            let coverage = match product.unit_required {
                CoverageUnit::Sqs => product.coverage_sqs,
                CoverageUnit::Ft2 => product.coverage_ft2,
                CoverageUnit::M2 => product.coverage_m2,
            };
            match coverage.filter(|c| *c > Decimal::ZERO) {
                Some(per_unit) => ceil_units(required / per_unit),
                None => current,
            }
        }
    }
}
