//! Loading an estimate into an editing session.

use estimate_core::{Estimate, EstimateGateway, GatewayError};

/// Loads a persisted estimate by id.
///
/// Sections referenced by items but missing from the stored order are
/// appended during rebuild, so a load is always self-consistent.
pub async fn load(gateway: &dyn EstimateGateway, id: i64) -> Result<Estimate, GatewayError> {
    let payload = gateway.read(id).await?;
    Ok(Estimate::from_payload(Some(id), payload))
}

/// Recovers an existing estimate when only a project reference is known.
///
/// Returns the oldest estimate for the project, matching the
/// create-once-then-update lifecycle, or `None` when the project has no
/// estimate yet.
pub async fn recover_for_project(
    gateway: &dyn EstimateGateway,
    project_id: &str,
) -> Result<Option<Estimate>, GatewayError> {
    let estimates = gateway.list_by_project(project_id).await?;
    Ok(estimates
        .into_iter()
        .next()
        .map(|(id, payload)| Estimate::from_payload(Some(id), payload)))
}
