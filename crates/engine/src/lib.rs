//! The campaign ledger engine.
//!
//! [`Ledger`] is the factory and registry for campaigns: it is the only way a
//! [`Campaign`] comes into existence, it indexes campaigns by owner and by
//! contributor, and it exposes the read-only query surface consumed by the
//! dashboard.
//!
//! Campaign state lives in memory and is the source of truth. Every mutation
//! is first persisted inside a database transaction; the in-memory copy is
//! updated only after the commit, so a failed write leaves no trace. Each
//! campaign sits behind its own async mutex: operations on one campaign
//! serialize, operations on distinct campaigns run in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub use amount::Amount;
pub use campaign::{Campaign, CampaignStatus, ContributionEvent};
pub use error::LedgerError;
pub use movements::{Movement, MovementKind};

mod amount;
mod campaign;
mod contributions;
mod error;
mod movements;

type ResultLedger<T> = Result<T, LedgerError>;

/// Campaign summary returned by the per-owner and per-contributor listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignSummary {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Factory, registry, and query surface for campaigns.
///
/// Lock order, where more than one is taken: `campaigns`, then `by_owner`,
/// then `by_contributor`.
#[derive(Debug)]
pub struct Ledger {
    campaigns: RwLock<HashMap<Uuid, Arc<Mutex<Campaign>>>>,
    by_owner: RwLock<HashMap<String, Vec<Uuid>>>,
    by_contributor: RwLock<HashMap<String, Vec<Uuid>>>,
    database: DatabaseConnection,
}

impl Ledger {
    /// Return a builder for `Ledger`. Help to build the struct.
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }

    async fn cell(&self, campaign_id: Uuid) -> ResultLedger<Arc<Mutex<Campaign>>> {
        self.campaigns
            .read()
            .await
            .get(&campaign_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(campaign_id.to_string()))
    }

    /// Creates and registers a new campaign, returning its id.
    ///
    /// This is the sole construction path for a campaign: the new id is
    /// appended to the owner's list and the campaign starts `Active` with
    /// nothing raised.
    pub async fn create_campaign(
        &self,
        owner: &str,
        name: &str,
        description: &str,
        goal_minor: u64,
        duration_days: u32,
        now: DateTime<Utc>,
    ) -> ResultLedger<Uuid> {
        let goal = Amount::from_minor(goal_minor).ok_or(LedgerError::Overflow)?;
        let campaign = Campaign::new(owner, name, description, goal, duration_days, now)?;
        let campaign_id = campaign.id;

        campaign::ActiveModel::from(&campaign)
            .insert(&self.database)
            .await?;

        let mut campaigns = self.campaigns.write().await;
        let mut by_owner = self.by_owner.write().await;
        by_owner
            .entry(owner.to_string())
            .or_default()
            .push(campaign_id);
        campaigns.insert(campaign_id, Arc::new(Mutex::new(campaign)));

        Ok(campaign_id)
    }

    /// Adds a pledge to an active campaign.
    ///
    /// Returns the contribution event carrying the new raised total; the
    /// same event is appended to the movement log.
    pub async fn contribute(
        &self,
        campaign_id: Uuid,
        contributor: &str,
        amount_minor: u64,
        now: DateTime<Utc>,
    ) -> ResultLedger<ContributionEvent> {
        let amount = Amount::from_minor(amount_minor).ok_or(LedgerError::Overflow)?;
        let cell = self.cell(campaign_id).await?;
        let mut campaign = cell.lock().await;

        let first_pledge = !campaign.contributions.contains_key(contributor);
        let mut preview = campaign.clone();
        let event = preview.contribute(contributor, amount, now)?;
        let entry = preview.contributions[contributor];
        let movement = Movement::new(
            campaign_id,
            MovementKind::Pledge,
            contributor,
            amount,
            event.raised,
            now,
        );

        let db_tx = self.database.begin().await?;
        if first_pledge {
            contributions::ActiveModel {
                campaign_id: ActiveValue::Set(campaign_id.to_string()),
                contributor: ActiveValue::Set(contributor.to_string()),
                amount_minor: ActiveValue::Set(entry.stored()),
                first_pledged_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;
        } else {
            contributions::ActiveModel {
                campaign_id: ActiveValue::Set(campaign_id.to_string()),
                contributor: ActiveValue::Set(contributor.to_string()),
                amount_minor: ActiveValue::Set(entry.stored()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
        }
        campaign::ActiveModel {
            id: ActiveValue::Set(campaign_id.to_string()),
            raised_minor: ActiveValue::Set(preview.raised.stored()),
            ..Default::default()
        }
        .update(&db_tx)
        .await?;
        movements::ActiveModel::from(&movement).insert(&db_tx).await?;
        db_tx.commit().await?;

        *campaign = preview;
        drop(campaign);

        if first_pledge {
            let mut by_contributor = self.by_contributor.write().await;
            by_contributor
                .entry(contributor.to_string())
                .or_default()
                .push(campaign_id);
        }

        Ok(event)
    }

    /// Decides a campaign's outcome once its deadline has passed.
    ///
    /// Callable by anyone; the outcome is a pure function of `raised` versus
    /// the goal. A second call is rejected with `AlreadyFinalized`.
    pub async fn finalize(
        &self,
        campaign_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultLedger<CampaignStatus> {
        let cell = self.cell(campaign_id).await?;
        let mut campaign = cell.lock().await;

        let mut preview = campaign.clone();
        let status = preview.finalize(now)?;

        campaign::ActiveModel {
            id: ActiveValue::Set(campaign_id.to_string()),
            status: ActiveValue::Set(status.as_str().to_string()),
            ..Default::default()
        }
        .update(&self.database)
        .await?;

        *campaign = preview;
        Ok(status)
    }

    /// Releases the raised funds of a succeeded campaign to its owner.
    pub async fn withdraw(
        &self,
        campaign_id: Uuid,
        caller: &str,
        now: DateTime<Utc>,
    ) -> ResultLedger<Amount> {
        let cell = self.cell(campaign_id).await?;
        let mut campaign = cell.lock().await;

        let mut preview = campaign.clone();
        let amount = preview.withdraw(caller)?;
        let movement = Movement::new(
            campaign_id,
            MovementKind::Withdrawal,
            caller,
            amount,
            preview.raised,
            now,
        );

        let db_tx = self.database.begin().await?;
        campaign::ActiveModel {
            id: ActiveValue::Set(campaign_id.to_string()),
            status: ActiveValue::Set(preview.status.as_str().to_string()),
            withdrawn: ActiveValue::Set(true),
            ..Default::default()
        }
        .update(&db_tx)
        .await?;
        movements::ActiveModel::from(&movement).insert(&db_tx).await?;
        db_tx.commit().await?;

        *campaign = preview;
        Ok(amount)
    }

    /// Pays back one contributor of a failed campaign.
    ///
    /// The ledger entry is zeroed (and stays zeroed as the refund record);
    /// `raised` drops by the same amount.
    pub async fn refund(
        &self,
        campaign_id: Uuid,
        contributor: &str,
        now: DateTime<Utc>,
    ) -> ResultLedger<Amount> {
        let cell = self.cell(campaign_id).await?;
        let mut campaign = cell.lock().await;

        let mut preview = campaign.clone();
        let amount = preview.refund(contributor)?;
        let movement = Movement::new(
            campaign_id,
            MovementKind::Refund,
            contributor,
            amount,
            preview.raised,
            now,
        );

        let db_tx = self.database.begin().await?;
        contributions::ActiveModel {
            campaign_id: ActiveValue::Set(campaign_id.to_string()),
            contributor: ActiveValue::Set(contributor.to_string()),
            amount_minor: ActiveValue::Set(0),
            ..Default::default()
        }
        .update(&db_tx)
        .await?;
        campaign::ActiveModel {
            id: ActiveValue::Set(campaign_id.to_string()),
            raised_minor: ActiveValue::Set(preview.raised.stored()),
            status: ActiveValue::Set(preview.status.as_str().to_string()),
            ..Default::default()
        }
        .update(&db_tx)
        .await?;
        movements::ActiveModel::from(&movement).insert(&db_tx).await?;
        db_tx.commit().await?;

        *campaign = preview;
        Ok(amount)
    }

    /// Lists an owner's campaigns in creation order.
    ///
    /// Owners without campaigns get an empty list, not an error.
    pub async fn user_campaigns(&self, owner: &str) -> Vec<CampaignSummary> {
        let ids = self
            .by_owner
            .read()
            .await
            .get(owner)
            .cloned()
            .unwrap_or_default();
        self.summaries(&ids).await
    }

    /// Lists the campaigns an account has pledged to, in first-pledge order.
    pub async fn contributor_campaigns(&self, contributor: &str) -> Vec<CampaignSummary> {
        let ids = self
            .by_contributor
            .read()
            .await
            .get(contributor)
            .cloned()
            .unwrap_or_default();
        self.summaries(&ids).await
    }

    async fn summaries(&self, ids: &[Uuid]) -> Vec<CampaignSummary> {
        let campaigns = self.campaigns.read().await;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(cell) = campaigns.get(id) {
                let campaign = cell.lock().await;
                out.push(CampaignSummary {
                    id: campaign.id,
                    owner: campaign.owner.clone(),
                    name: campaign.name.clone(),
                    created_at: campaign.created_at,
                });
            }
        }
        out
    }

    /// Returns a point-in-time copy of a campaign.
    pub async fn campaign(&self, campaign_id: Uuid) -> ResultLedger<Campaign> {
        let cell = self.cell(campaign_id).await?;
        let campaign = cell.lock().await;
        Ok(campaign.clone())
    }

    /// Returns the amount pledged by a contributor (zero if none).
    pub async fn contribution(
        &self,
        campaign_id: Uuid,
        contributor: &str,
    ) -> ResultLedger<Amount> {
        let cell = self.cell(campaign_id).await?;
        let campaign = cell.lock().await;
        Ok(campaign
            .contributions
            .get(contributor)
            .copied()
            .unwrap_or(Amount::ZERO))
    }

    /// Lists a campaign's funds movements, newest first.
    ///
    /// Returns up to `limit` movements and an opaque cursor for the next
    /// (older) page when more exist.
    pub async fn movements(
        &self,
        campaign_id: Uuid,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultLedger<(Vec<Movement>, Option<String>)> {
        // Existence check so unknown ids report NotFound, not an empty page.
        self.cell(campaign_id).await?;

        let mut query = movements::Entity::find()
            .filter(movements::Column::CampaignId.eq(campaign_id.to_string()))
            .order_by_desc(movements::Column::OccurredAt)
            .order_by_desc(movements::Column::Id)
            .limit(limit + 1);

        if let Some(cursor) = cursor {
            let cursor = movements::MovementsCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(movements::Column::OccurredAt.lt(cursor.occurred_at))
                    .add(
                        Condition::all()
                            .add(movements::Column::OccurredAt.eq(cursor.occurred_at))
                            .add(movements::Column::Id.lt(cursor.movement_id)),
                    ),
            );
        }

        let rows = query.all(&self.database).await?;
        let has_more = rows.len() as u64 > limit;
        let mut movements = Vec::with_capacity(rows.len());
        for model in rows.into_iter().take(limit as usize) {
            movements.push(Movement::try_from(model)?);
        }

        let next_cursor = if has_more {
            movements
                .last()
                .map(|movement| {
                    movements::MovementsCursor {
                        occurred_at: movement.occurred_at,
                        movement_id: movement.id.to_string(),
                    }
                    .encode()
                })
                .transpose()?
        } else {
            None
        };

        Ok((movements, next_cursor))
    }
}

/// The builder for `Ledger`.
#[derive(Default)]
pub struct LedgerBuilder {
    database: DatabaseConnection,
}

impl LedgerBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> LedgerBuilder {
        self.database = db;
        self
    }

    /// Construct `Ledger`, reloading every campaign from the database.
    pub async fn build(self) -> ResultLedger<Ledger> {
        let campaign_models = campaign::Entity::find()
            .order_by_asc(campaign::Column::CreatedAt)
            .all(&self.database)
            .await?;
        let contribution_models = contributions::Entity::find()
            .order_by_asc(contributions::Column::FirstPledgedAt)
            .all(&self.database)
            .await?;

        // The contributor index is rebuilt from the globally ordered rows so
        // first-pledge order survives a restart.
        let mut entries: HashMap<String, Vec<contributions::Model>> = HashMap::new();
        let mut by_contributor: HashMap<String, Vec<Uuid>> = HashMap::new();
        for model in contribution_models {
            let campaign_id = Uuid::parse_str(&model.campaign_id).map_err(|_| {
                LedgerError::InvalidRecord(format!("invalid campaign id: {}", model.campaign_id))
            })?;
            by_contributor
                .entry(model.contributor.clone())
                .or_default()
                .push(campaign_id);
            entries
                .entry(model.campaign_id.clone())
                .or_default()
                .push(model);
        }

        let mut campaigns = HashMap::new();
        let mut by_owner: HashMap<String, Vec<Uuid>> = HashMap::new();

        for model in campaign_models {
            let stored_id = model.id.clone();
            let mut campaign = Campaign::try_from(model)?;

            for entry in entries.remove(&stored_id).unwrap_or_default() {
                let amount = Amount::from_stored(entry.amount_minor).ok_or_else(|| {
                    LedgerError::InvalidRecord(format!(
                        "negative contribution for \"{}\"",
                        entry.contributor
                    ))
                })?;
                campaign.contributions.insert(entry.contributor, amount);
            }

            let total = campaign
                .contributions
                .values()
                .try_fold(Amount::ZERO, |sum, amount| sum.checked_add(*amount))
                .ok_or(LedgerError::Overflow)?;
            if total != campaign.raised {
                return Err(LedgerError::InvalidRecord(format!(
                    "contribution sum mismatch for campaign \"{}\"",
                    campaign.id
                )));
            }

            by_owner
                .entry(campaign.owner.clone())
                .or_default()
                .push(campaign.id);
            campaigns.insert(campaign.id, Arc::new(Mutex::new(campaign)));
        }

        Ok(Ledger {
            campaigns: RwLock::new(campaigns),
            by_owner: RwLock::new(by_owner),
            by_contributor: RwLock::new(by_contributor),
            database: self.database,
        })
    }
}
