use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Percentage configuration owned by an estimate.
///
/// All values are whole-number percentages (`7` means 7%), non-negative by
/// convention but not enforced here; the cascade accepts whatever the input
/// boundary lets through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rates {
    /// Markup applied to items without a per-item override.
    pub markup_percent: Decimal,
    pub pst_percent: Decimal,
    pub gst_percent: Decimal,
    pub profit_percent: Decimal,
}

impl Rates {
    pub fn new(
        markup_percent: Decimal,
        pst_percent: Decimal,
        gst_percent: Decimal,
        profit_percent: Decimal,
    ) -> Self {
        Self {
            markup_percent,
            pst_percent,
            gst_percent,
            profit_percent,
        }
    }
}
