use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::LedgerError;

use serde::Serialize;
pub use server::{run, run_with_listener, spawn_with_listener};

mod campaigns;
mod contributions;
mod movements;
mod server;

pub mod types {
    pub mod campaign {
        pub use api_types::campaign::{
            CampaignCreated, CampaignDetail, CampaignList, CampaignListResponse, CampaignNew,
            CampaignStatus, CampaignSummaryView, FinalizeResponse, WithdrawResponse,
        };
    }

    pub mod contribution {
        pub use api_types::contribution::{
            ContributeNew, ContributionRecorded, ContributionView, RefundResponse,
        };
    }

    pub mod movement {
        pub use api_types::movement::{
            MovementKind, MovementList, MovementListResponse, MovementView,
        };
    }
}

pub enum ServerError {
    Ledger(LedgerError),
    Generic(String),
}

//TODO: Find a better solution
#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_ledger_error(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::NotOwner(_) => StatusCode::FORBIDDEN,
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::InvalidGoal
        | LedgerError::InvalidDuration
        | LedgerError::ZeroAmount
        | LedgerError::InvalidCursor => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::CampaignNotActive(_)
        | LedgerError::DeadlinePassed(_)
        | LedgerError::DeadlineNotReached(_)
        | LedgerError::AlreadyFinalized(_)
        | LedgerError::NotSucceeded(_)
        | LedgerError::NotFailed(_)
        | LedgerError::AlreadyWithdrawn(_)
        | LedgerError::NothingToRefund(_) => StatusCode::CONFLICT,
        LedgerError::Overflow
        | LedgerError::Underflow
        | LedgerError::InvalidRecord(_)
        | LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_ledger_error(err: LedgerError) -> String {
    match err {
        LedgerError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        LedgerError::InvalidRecord(detail) => {
            tracing::error!("corrupted ledger record: {detail}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Ledger(err) => {
                (status_for_ledger_error(&err), message_for_ledger_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<LedgerError> for ServerError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_not_owner_maps_to_403() {
        let res = ServerError::from(LedgerError::NotOwner("mallory".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn ledger_not_found_maps_to_404() {
        let res = ServerError::from(LedgerError::NotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn ledger_validation_maps_to_422() {
        let res = ServerError::from(LedgerError::ZeroAmount).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn ledger_state_conflict_maps_to_409() {
        let res =
            ServerError::from(LedgerError::AlreadyFinalized("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn ledger_arithmetic_maps_to_500() {
        let res = ServerError::from(LedgerError::Overflow).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
