//! Campaign API endpoints

use api_types::campaign::{
    CampaignCreated, CampaignDetail, CampaignList, CampaignListResponse, CampaignNew,
    CampaignStatus as ApiStatus, CampaignSummaryView, FinalizeResponse, WithdrawResponse,
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

fn map_status(status: engine::CampaignStatus) -> ApiStatus {
    match status {
        engine::CampaignStatus::Active => ApiStatus::Active,
        engine::CampaignStatus::Succeeded => ApiStatus::Succeeded,
        engine::CampaignStatus::Failed => ApiStatus::Failed,
        engine::CampaignStatus::Closed => ApiStatus::Closed,
    }
}

fn map_summary(summary: engine::CampaignSummary) -> CampaignSummaryView {
    CampaignSummaryView {
        id: summary.id,
        owner: summary.owner,
        name: summary.name,
        created_at: summary.created_at,
    }
}

/// Handle requests for creating a new campaign
pub async fn create(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Json(payload): Json<CampaignNew>,
) -> Result<Json<CampaignCreated>, ServerError> {
    let id = state
        .ledger
        .create_campaign(
            &account.0,
            &payload.name,
            &payload.description,
            payload.goal_minor,
            payload.duration_days,
            Utc::now(),
        )
        .await?;
    let campaign = state.ledger.campaign(id).await?;

    tracing::info!(campaign_id = %id, owner = %account.0, "campaign created");
    Ok(Json(CampaignCreated {
        id,
        deadline: campaign.deadline,
    }))
}

/// Handle requests for listing campaigns per owner or per contributor
pub async fn list(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    payload: Option<Json<CampaignList>>,
) -> Result<Json<CampaignListResponse>, ServerError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();

    let summaries = match (payload.owner, payload.contributor) {
        (Some(owner), None) => state.ledger.user_campaigns(&owner).await,
        (None, Some(contributor)) => state.ledger.contributor_campaigns(&contributor).await,
        (None, None) => state.ledger.user_campaigns(&account.0).await,
        (Some(_), Some(_)) => {
            return Err(ServerError::Generic(
                "provide only one of owner or contributor".to_string(),
            ));
        }
    };

    Ok(Json(CampaignListResponse {
        campaigns: summaries.into_iter().map(map_summary).collect(),
    }))
}

/// Handle requests for a single campaign's full detail
pub async fn detail(
    Extension(_account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CampaignDetail>, ServerError> {
    let campaign = state.ledger.campaign(id).await?;

    let outstanding_contributors = campaign.outstanding_contributors() as u64;
    Ok(Json(CampaignDetail {
        id: campaign.id,
        owner: campaign.owner,
        name: campaign.name,
        description: campaign.description,
        goal_minor: campaign.goal.minor(),
        created_at: campaign.created_at,
        deadline: campaign.deadline,
        raised_minor: campaign.raised.minor(),
        status: map_status(campaign.status),
        withdrawn: campaign.withdrawn,
        outstanding_contributors,
    }))
}

/// Handle requests for finalizing a campaign after its deadline
pub async fn finalize(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FinalizeResponse>, ServerError> {
    let status = state.ledger.finalize(id, Utc::now()).await?;

    tracing::info!(campaign_id = %id, caller = %account.0, status = status.as_str(), "campaign finalized");
    Ok(Json(FinalizeResponse {
        status: map_status(status),
    }))
}

/// Handle requests for withdrawing the raised funds of a succeeded campaign
pub async fn withdraw(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WithdrawResponse>, ServerError> {
    let amount = state.ledger.withdraw(id, &account.0, Utc::now()).await?;

    tracing::info!(campaign_id = %id, owner = %account.0, amount_minor = amount.minor(), "funds withdrawn");
    Ok(Json(WithdrawResponse {
        amount_minor: amount.minor(),
    }))
}
