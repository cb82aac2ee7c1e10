//! Contribution API endpoints

use api_types::contribution::{
    ContributeNew, ContributionRecorded, ContributionView, RefundResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    ServerError,
    server::{Account, ServerState},
};

/// Handle requests for pledging to a campaign
pub async fn contribute(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContributeNew>,
) -> Result<Json<ContributionRecorded>, ServerError> {
    let event = state
        .ledger
        .contribute(id, &account.0, payload.amount_minor, Utc::now())
        .await?;

    tracing::info!(
        campaign_id = %event.campaign_id,
        contributor = %event.contributor,
        amount_minor = event.amount.minor(),
        raised_minor = event.raised.minor(),
        "contribution recorded"
    );
    Ok(Json(ContributionRecorded {
        campaign_id: event.campaign_id,
        contributor: event.contributor,
        amount_minor: event.amount.minor(),
        raised_minor: event.raised.minor(),
    }))
}

/// Handle requests for reading one contributor's pledged amount
pub async fn get(
    Extension(_account): Extension<Account>,
    State(state): State<ServerState>,
    Path((id, contributor)): Path<(Uuid, String)>,
) -> Result<Json<ContributionView>, ServerError> {
    let amount = state.ledger.contribution(id, &contributor).await?;

    Ok(Json(ContributionView {
        amount_minor: amount.minor(),
    }))
}

/// Handle requests for refunding the caller's pledge of a failed campaign
pub async fn refund(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RefundResponse>, ServerError> {
    let amount = state.ledger.refund(id, &account.0, Utc::now()).await?;

    tracing::info!(campaign_id = %id, contributor = %account.0, amount_minor = amount.minor(), "refund issued");
    Ok(Json(RefundResponse {
        amount_minor: amount.minor(),
    }))
}
