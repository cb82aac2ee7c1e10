//! Movement log API endpoints

use api_types::movement::{
    MovementKind as ApiKind, MovementList, MovementListResponse, MovementView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{Account, ServerState},
};

fn map_kind(kind: engine::MovementKind) -> ApiKind {
    match kind {
        engine::MovementKind::Pledge => ApiKind::Pledge,
        engine::MovementKind::Withdrawal => ApiKind::Withdrawal,
        engine::MovementKind::Refund => ApiKind::Refund,
    }
}

/// Handle requests for listing a campaign's funds movements
pub async fn list(
    Extension(_account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<MovementList>>,
) -> Result<Json<MovementListResponse>, ServerError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    let limit = payload.limit.unwrap_or(50);

    let (movements, next_cursor) = state
        .ledger
        .movements(id, limit, payload.cursor.as_deref())
        .await?;

    let movements = movements
        .into_iter()
        .map(|movement| MovementView {
            id: movement.id,
            kind: map_kind(movement.kind),
            account: movement.account,
            amount_minor: movement.amount.minor(),
            raised_after_minor: movement.raised_after.minor(),
            occurred_at: movement.occurred_at,
        })
        .collect();

    Ok(Json(MovementListResponse {
        movements,
        next_cursor,
    }))
}
