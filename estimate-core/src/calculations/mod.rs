//! Pure calculation layer: quantity derivation and the pricing cascade.

pub mod common;
pub mod pricing;
pub mod quantity;

pub use pricing::{EstimateTotals, PricingCascade, SectionSubtotal, price_estimate};
pub use quantity::derive_purchase_quantity;
