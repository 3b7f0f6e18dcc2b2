use estimate_core::GatewayError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::{Row, TypeInfo, ValueRef};

/// Reads a rate column as a Decimal, accepting both INTEGER and REAL
/// SQLite storage classes. NULL reads as zero.
pub fn get_decimal(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Decimal, GatewayError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| GatewayError::Database(format!("column '{}' not found: {}", column, e)))?;

    let type_name = value_ref.type_info().name().to_string();

    match type_name.as_str() {
        "INTEGER" => {
            let val: i64 = row.try_get(column).map_err(|e| {
                GatewayError::Database(format!("failed to get INTEGER from '{}': {}", column, e))
            })?;
            Ok(Decimal::from(val))
        }
        "REAL" => {
            let val: f64 = row.try_get(column).map_err(|e| {
                GatewayError::Database(format!("failed to get REAL from '{}': {}", column, e))
            })?;
            Decimal::try_from(val).map_err(|e| {
                GatewayError::Database(format!("failed to convert {} to Decimal: {}", val, e))
            })
        }
        "NULL" => Ok(Decimal::ZERO),
        other => Err(GatewayError::Database(format!(
            "unexpected type '{}' for column '{}'",
            other, column
        ))),
    }
}

/// Converts a Decimal rate to f64 for SQLite storage.
pub fn decimal_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}
