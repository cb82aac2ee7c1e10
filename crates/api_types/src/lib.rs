use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod campaign {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CampaignStatus {
        Active,
        Succeeded,
        Failed,
        Closed,
    }

    /// Request body for creating a new campaign.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignNew {
        pub name: String,
        pub description: String,
        /// Funding goal in minor units. Must be > 0.
        pub goal_minor: u64,
        /// Days until the deadline. Must be > 0.
        pub duration_days: u32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignCreated {
        pub id: Uuid,
        pub deadline: DateTime<Utc>,
    }

    /// Selects whose campaigns to list.
    ///
    /// At most one of `owner`/`contributor`; with neither, the caller's own
    /// campaigns are listed.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CampaignList {
        pub owner: Option<String>,
        pub contributor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignSummaryView {
        pub id: Uuid,
        pub owner: String,
        pub name: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignListResponse {
        pub campaigns: Vec<CampaignSummaryView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignDetail {
        pub id: Uuid,
        pub owner: String,
        pub name: String,
        pub description: String,
        pub goal_minor: u64,
        pub created_at: DateTime<Utc>,
        pub deadline: DateTime<Utc>,
        pub raised_minor: u64,
        pub status: CampaignStatus,
        pub withdrawn: bool,
        /// Contributors whose ledger entry has not been refunded.
        pub outstanding_contributors: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FinalizeResponse {
        pub status: CampaignStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WithdrawResponse {
        pub amount_minor: u64,
    }
}

pub mod contribution {
    use super::*;

    /// Request body for pledging to a campaign.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributeNew {
        /// Pledge in minor units. Must be > 0.
        pub amount_minor: u64,
    }

    /// The contribution event: echoes the pledge and the new raised total.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionRecorded {
        pub campaign_id: Uuid,
        pub contributor: String,
        pub amount_minor: u64,
        pub raised_minor: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionView {
        pub amount_minor: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RefundResponse {
        pub amount_minor: u64,
    }
}

pub mod movement {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MovementKind {
        Pledge,
        Withdrawal,
        Refund,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MovementList {
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementView {
        pub id: Uuid,
        pub kind: MovementKind,
        pub account: String,
        pub amount_minor: u64,
        /// Raised total right after this movement.
        pub raised_after_minor: u64,
        pub occurred_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementListResponse {
        pub movements: Vec<MovementView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }
}
