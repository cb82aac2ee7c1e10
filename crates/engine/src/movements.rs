//! Funds-movement audit log.
//!
//! A `Movement` is one observable change of a campaign's escrow: a pledge,
//! the owner's withdrawal, or a contributor refund. Rows are append-only and
//! never loaded back into the in-memory state; listings read them straight
//! from the database, newest first.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Amount, LedgerError, ResultLedger};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Pledge,
    Withdrawal,
    Refund,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pledge => "pledge",
            Self::Withdrawal => "withdrawal",
            Self::Refund => "refund",
        }
    }
}

impl TryFrom<&str> for MovementKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pledge" => Ok(Self::Pledge),
            "withdrawal" => Ok(Self::Withdrawal),
            "refund" => Ok(Self::Refund),
            other => Err(LedgerError::InvalidRecord(format!(
                "invalid movement kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub kind: MovementKind,
    /// The contributor for pledges and refunds, the owner for withdrawals.
    pub account: String,
    pub amount: Amount,
    /// Raised total right after this movement was applied.
    pub raised_after: Amount,
    pub occurred_at: DateTime<Utc>,
}

impl Movement {
    pub fn new(
        campaign_id: Uuid,
        kind: MovementKind,
        account: &str,
        amount: Amount,
        raised_after: Amount,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            kind,
            account: account.to_string(),
            amount,
            raised_after,
            occurred_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub campaign_id: String,
    pub kind: String,
    pub account: String,
    pub amount_minor: i64,
    pub raised_after_minor: i64,
    pub occurred_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::campaign::Entity",
        from = "Column::CampaignId",
        to = "super::campaign::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Campaigns,
}

impl Related<super::campaign::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaigns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Movement> for ActiveModel {
    fn from(movement: &Movement) -> Self {
        Self {
            id: ActiveValue::Set(movement.id.to_string()),
            campaign_id: ActiveValue::Set(movement.campaign_id.to_string()),
            kind: ActiveValue::Set(movement.kind.as_str().to_string()),
            account: ActiveValue::Set(movement.account.clone()),
            amount_minor: ActiveValue::Set(movement.amount.stored()),
            raised_after_minor: ActiveValue::Set(movement.raised_after.stored()),
            occurred_at: ActiveValue::Set(movement.occurred_at),
        }
    }
}

impl TryFrom<Model> for Movement {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::InvalidRecord(format!("invalid movement id: {}", model.id)))?,
            campaign_id: Uuid::parse_str(&model.campaign_id).map_err(|_| {
                LedgerError::InvalidRecord(format!("invalid campaign id: {}", model.campaign_id))
            })?,
            kind: MovementKind::try_from(model.kind.as_str())?,
            account: model.account,
            amount: Amount::from_stored(model.amount_minor)
                .ok_or_else(|| LedgerError::InvalidRecord("negative movement amount".to_string()))?,
            raised_after: Amount::from_stored(model.raised_after_minor)
                .ok_or_else(|| LedgerError::InvalidRecord("negative raised total".to_string()))?,
            occurred_at: model.occurred_at,
        })
    }
}

/// Opaque pagination cursor for movement listings (newest → older).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct MovementsCursor {
    pub occurred_at: DateTime<Utc>,
    pub movement_id: String,
}

impl MovementsCursor {
    pub fn encode(&self) -> ResultLedger<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| LedgerError::InvalidCursor)?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn decode(input: &str) -> ResultLedger<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| LedgerError::InvalidCursor)?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| LedgerError::InvalidCursor)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn cursor_roundtrip() {
        let cursor = MovementsCursor {
            occurred_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            movement_id: Uuid::new_v4().to_string(),
        };
        let decoded = MovementsCursor::decode(&cursor.encode().unwrap()).unwrap();
        assert_eq!(decoded.occurred_at, cursor.occurred_at);
        assert_eq!(decoded.movement_id, cursor.movement_id);
    }

    #[test]
    fn cursor_rejects_garbage() {
        assert!(MovementsCursor::decode("not a cursor").is_err());
    }
}
