mod catalog;
mod estimate;
mod line_item;
mod rates;
mod section;

pub use catalog::{CatalogEntry, CatalogSource};
pub use estimate::{Estimate, EstimatePayload};
pub use line_item::{
    CoverageUnit, ItemKind, JourneyType, LabourFields, LineItem, PackagingKind, ProductFields,
    ValidationError,
};
pub use rates::Rates;
pub use section::{Section, SectionRegistry};
