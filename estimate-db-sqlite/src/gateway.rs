use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use estimate_core::{EstimateGateway, EstimatePayload, GatewayError, LineItem};
use sqlx::{Row, sqlite::SqlitePool};
use tracing::debug;

use crate::decimal::{decimal_to_f64, get_decimal};

/// SQLite-backed persistence gateway.
///
/// Rates live in REAL columns; the section order and item list are stored
/// as JSON text so every variant field of a line item survives unchanged.
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> GatewayError {
    GatewayError::Database(e.to_string())
}

fn ser_err(e: serde_json::Error) -> GatewayError {
    GatewayError::Serialization(e.to_string())
}

fn row_to_payload(row: &sqlx::sqlite::SqliteRow) -> Result<EstimatePayload, GatewayError> {
    let section_order: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("section_order").map_err(db_err)?)
            .map_err(ser_err)?;
    let items: Vec<LineItem> =
        serde_json::from_str(&row.try_get::<String, _>("items").map_err(db_err)?)
            .map_err(ser_err)?;

    Ok(EstimatePayload {
        project_id: row.try_get("project_id").map_err(db_err)?,
        markup: get_decimal(row, "markup")?,
        pst_rate: get_decimal(row, "pst_rate")?,
        gst_rate: get_decimal(row, "gst_rate")?,
        profit_rate: get_decimal(row, "profit_rate")?,
        section_order,
        items,
    })
}

#[async_trait]
impl EstimateGateway for SqliteGateway {
    async fn create(&self, payload: &EstimatePayload) -> Result<i64, GatewayError> {
        let section_order = serde_json::to_string(&payload.section_order).map_err(ser_err)?;
        let items = serde_json::to_string(&payload.items).map_err(ser_err)?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO estimates
                (project_id, markup, pst_rate, gst_rate, profit_rate,
                 section_order, items, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&payload.project_id)
        .bind(decimal_to_f64(payload.markup))
        .bind(decimal_to_f64(payload.pst_rate))
        .bind(decimal_to_f64(payload.gst_rate))
        .bind(decimal_to_f64(payload.profit_rate))
        .bind(&section_order)
        .bind(&items)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = result.last_insert_rowid();
        debug!(id, project_id = %payload.project_id, "estimate row created");
        Ok(id)
    }

    async fn update(&self, id: i64, payload: &EstimatePayload) -> Result<(), GatewayError> {
        let section_order = serde_json::to_string(&payload.section_order).map_err(ser_err)?;
        let items = serde_json::to_string(&payload.items).map_err(ser_err)?;

        let result = sqlx::query(
            "UPDATE estimates
             SET project_id = ?, markup = ?, pst_rate = ?, gst_rate = ?,
                 profit_rate = ?, section_order = ?, items = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&payload.project_id)
        .bind(decimal_to_f64(payload.markup))
        .bind(decimal_to_f64(payload.pst_rate))
        .bind(decimal_to_f64(payload.gst_rate))
        .bind(decimal_to_f64(payload.profit_rate))
        .bind(&section_order)
        .bind(&items)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound);
        }
        Ok(())
    }

    async fn read(&self, id: i64) -> Result<EstimatePayload, GatewayError> {
        let row = sqlx::query(
            "SELECT project_id, markup, pst_rate, gst_rate, profit_rate,
                    section_order, items
             FROM estimates WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(GatewayError::NotFound)?;

        row_to_payload(&row)
    }

    async fn list_by_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<(i64, EstimatePayload)>, GatewayError> {
        let rows = sqlx::query(
            "SELECT id, project_id, markup, pst_rate, gst_rate, profit_rate,
                    section_order, items
             FROM estimates WHERE project_id = ? ORDER BY id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id").map_err(db_err)?;
                Ok((id, row_to_payload(row)?))
            })
            .collect()
    }
}
