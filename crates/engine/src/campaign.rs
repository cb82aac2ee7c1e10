//! The campaign state machine.
//!
//! A `Campaign` holds the goal, the deadline, and the contributor ledger, and
//! enforces the lifecycle guards for pledges, finalization, withdrawal, and
//! refunds. Methods here mutate only the in-memory value; persistence is the
//! [`Ledger`](crate::Ledger)'s job.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Amount, LedgerError, ResultLedger};

/// Lifecycle of a campaign.
///
/// `Active` is the only state that accepts pledges. `finalize` moves the
/// campaign to `Succeeded` or `Failed` exactly once, and `Closed` is terminal:
/// the owner withdrew, or every contributor of a failed campaign has been
/// refunded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Succeeded,
    Failed,
    Closed,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }
}

impl TryFrom<&str> for CampaignStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "closed" => Ok(Self::Closed),
            other => Err(LedgerError::InvalidRecord(format!(
                "invalid campaign status: {other}"
            ))),
        }
    }
}

/// Emitted on every successful pledge, carrying the new raised total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionEvent {
    pub campaign_id: Uuid,
    pub contributor: String,
    pub amount: Amount,
    pub raised: Amount,
}

/// One funding effort: goal, deadline, and the contributor ledger.
///
/// Invariant: the sum of `contributions` values always equals `raised`.
#[derive(Clone, Debug)]
pub struct Campaign {
    /// Stable identifier, assigned at creation and never reused.
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub description: String,
    pub goal: Amount,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub raised: Amount,
    /// Cumulative pledge per contributor. A zeroed entry of a failed
    /// campaign is the record of an issued refund.
    pub contributions: HashMap<String, Amount>,
    pub status: CampaignStatus,
    pub withdrawn: bool,
}

impl Campaign {
    pub fn new(
        owner: &str,
        name: &str,
        description: &str,
        goal: Amount,
        duration_days: u32,
        created_at: DateTime<Utc>,
    ) -> ResultLedger<Self> {
        if goal.is_zero() {
            return Err(LedgerError::InvalidGoal);
        }
        if duration_days == 0 {
            return Err(LedgerError::InvalidDuration);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            goal,
            created_at,
            deadline: created_at + chrono::Duration::days(i64::from(duration_days)),
            raised: Amount::ZERO,
            contributions: HashMap::new(),
            status: CampaignStatus::Active,
            withdrawn: false,
        })
    }

    /// Number of contributors whose ledger entry has not been refunded.
    pub fn outstanding_contributors(&self) -> usize {
        self.contributions
            .values()
            .filter(|amount| !amount.is_zero())
            .count()
    }

    /// Adds a pledge to the contributor's ledger entry.
    pub fn contribute(
        &mut self,
        contributor: &str,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> ResultLedger<ContributionEvent> {
        if self.status != CampaignStatus::Active {
            return Err(LedgerError::CampaignNotActive(self.id.to_string()));
        }
        if now >= self.deadline {
            return Err(LedgerError::DeadlinePassed(self.id.to_string()));
        }
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }

        let current = self
            .contributions
            .get(contributor)
            .copied()
            .unwrap_or(Amount::ZERO);
        let entry = current.checked_add(amount).ok_or(LedgerError::Overflow)?;
        let raised = self
            .raised
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.contributions.insert(contributor.to_string(), entry);
        self.raised = raised;

        Ok(ContributionEvent {
            campaign_id: self.id,
            contributor: contributor.to_string(),
            amount,
            raised,
        })
    }

    /// Decides the outcome once the deadline has passed.
    ///
    /// One-shot: a second call is rejected rather than silently ignored, so
    /// callers can distinguish "already done" from "just decided".
    pub fn finalize(&mut self, now: DateTime<Utc>) -> ResultLedger<CampaignStatus> {
        if self.status != CampaignStatus::Active {
            return Err(LedgerError::AlreadyFinalized(self.id.to_string()));
        }
        if now < self.deadline {
            return Err(LedgerError::DeadlineNotReached(self.id.to_string()));
        }

        self.status = if self.raised >= self.goal {
            CampaignStatus::Succeeded
        } else {
            CampaignStatus::Failed
        };
        Ok(self.status)
    }

    /// Releases the raised funds to the owner, at most once.
    ///
    /// Returns the withdrawn amount. The contributor ledger keeps its
    /// entries, so `raised` does not change here.
    pub fn withdraw(&mut self, caller: &str) -> ResultLedger<Amount> {
        if caller != self.owner {
            return Err(LedgerError::NotOwner(caller.to_string()));
        }
        if self.withdrawn {
            return Err(LedgerError::AlreadyWithdrawn(self.id.to_string()));
        }
        if self.status != CampaignStatus::Succeeded {
            return Err(LedgerError::NotSucceeded(self.id.to_string()));
        }

        self.withdrawn = true;
        self.status = CampaignStatus::Closed;
        Ok(self.raised)
    }

    /// Pays back a contributor of a failed campaign, at most once each.
    ///
    /// The entry is zeroed and `raised` decremented by the same amount, so
    /// the ledger-sum invariant stays exact. When the last outstanding
    /// contributor is refunded the campaign reaches `Closed`.
    pub fn refund(&mut self, contributor: &str) -> ResultLedger<Amount> {
        // A campaign fully refunded into `Closed` still answers refund
        // requests with NothingToRefund instead of NotFailed.
        let refundable = self.status == CampaignStatus::Failed
            || (self.status == CampaignStatus::Closed && !self.withdrawn);
        if !refundable {
            return Err(LedgerError::NotFailed(self.id.to_string()));
        }

        let entry = self
            .contributions
            .get(contributor)
            .copied()
            .unwrap_or(Amount::ZERO);
        if entry.is_zero() {
            return Err(LedgerError::NothingToRefund(contributor.to_string()));
        }

        let raised = self
            .raised
            .checked_sub(entry)
            .ok_or(LedgerError::Underflow)?;

        self.contributions
            .insert(contributor.to_string(), Amount::ZERO);
        self.raised = raised;
        if self.outstanding_contributors() == 0 {
            self.status = CampaignStatus::Closed;
        }
        Ok(entry)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner: String,
    pub name: String,
    pub description: String,
    pub goal_minor: i64,
    pub created_at: DateTimeUtc,
    pub deadline: DateTimeUtc,
    pub raised_minor: i64,
    pub status: String,
    pub withdrawn: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::contributions::Entity")]
    Contributions,
    #[sea_orm(has_many = "super::movements::Entity")]
    Movements,
}

impl Related<super::contributions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributions.def()
    }
}

impl Related<super::movements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Campaign> for ActiveModel {
    fn from(campaign: &Campaign) -> Self {
        Self {
            id: ActiveValue::Set(campaign.id.to_string()),
            owner: ActiveValue::Set(campaign.owner.clone()),
            name: ActiveValue::Set(campaign.name.clone()),
            description: ActiveValue::Set(campaign.description.clone()),
            goal_minor: ActiveValue::Set(campaign.goal.stored()),
            created_at: ActiveValue::Set(campaign.created_at),
            deadline: ActiveValue::Set(campaign.deadline),
            raised_minor: ActiveValue::Set(campaign.raised.stored()),
            status: ActiveValue::Set(campaign.status.as_str().to_string()),
            withdrawn: ActiveValue::Set(campaign.withdrawn),
        }
    }
}

impl TryFrom<Model> for Campaign {
    type Error = LedgerError;

    /// Rebuilds a campaign from its stored row, with an empty contributor
    /// ledger; entries are loaded separately.
    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::InvalidRecord(format!("invalid campaign id: {}", model.id)))?,
            owner: model.owner,
            name: model.name,
            description: model.description,
            goal: Amount::from_stored(model.goal_minor)
                .ok_or_else(|| LedgerError::InvalidRecord("negative goal".to_string()))?,
            created_at: model.created_at,
            deadline: model.deadline,
            raised: Amount::from_stored(model.raised_minor)
                .ok_or_else(|| LedgerError::InvalidRecord("negative raised total".to_string()))?,
            contributions: HashMap::new(),
            status: CampaignStatus::try_from(model.status.as_str())?,
            withdrawn: model.withdrawn,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn campaign(goal_minor: u64) -> Campaign {
        Campaign::new(
            "alice",
            "Solar roof",
            "Panels for the community hall",
            Amount::from_minor(goal_minor).unwrap(),
            1,
            t0(),
        )
        .unwrap()
    }

    fn amount(minor: u64) -> Amount {
        Amount::from_minor(minor).unwrap()
    }

    #[test]
    fn new_campaign_is_active_with_day_deadline() {
        let campaign = campaign(1000);
        assert_eq!(campaign.status, CampaignStatus::Active);
        assert_eq!(campaign.raised, Amount::ZERO);
        assert_eq!(campaign.deadline, t0() + Duration::days(1));
    }

    #[test]
    fn fail_new_campaign_zero_goal() {
        let err = Campaign::new("alice", "x", "y", Amount::ZERO, 1, t0()).unwrap_err();
        assert_eq!(err, LedgerError::InvalidGoal);
    }

    #[test]
    fn fail_new_campaign_zero_duration() {
        let err = Campaign::new("alice", "x", "y", amount(1), 0, t0()).unwrap_err();
        assert_eq!(err, LedgerError::InvalidDuration);
    }

    #[test]
    fn contribute_accumulates_per_contributor() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(400), t0()).unwrap();
        let event = campaign.contribute("bob", amount(700), t0()).unwrap();

        assert_eq!(event.raised, amount(1100));
        assert_eq!(campaign.contributions["bob"], amount(1100));
        assert_eq!(campaign.raised, amount(1100));
    }

    #[test]
    fn contribute_keeps_ledger_sum_equal_to_raised() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(400), t0()).unwrap();
        campaign.contribute("carol", amount(250), t0()).unwrap();
        campaign.contribute("bob", amount(50), t0()).unwrap();

        let sum: u64 = campaign.contributions.values().map(|a| a.minor()).sum();
        assert_eq!(sum, campaign.raised.minor());
    }

    #[test]
    fn fail_contribute_zero_amount() {
        let mut campaign = campaign(1000);
        let err = campaign.contribute("bob", Amount::ZERO, t0()).unwrap_err();
        assert_eq!(err, LedgerError::ZeroAmount);
    }

    #[test]
    fn fail_contribute_after_deadline() {
        let mut campaign = campaign(1000);
        let err = campaign
            .contribute("bob", amount(100), t0() + Duration::days(1))
            .unwrap_err();
        assert_eq!(err, LedgerError::DeadlinePassed(campaign.id.to_string()));
        assert_eq!(campaign.raised, Amount::ZERO);
    }

    #[test]
    fn contribute_overflow_leaves_state_unchanged() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(400), t0()).unwrap();
        let err = campaign
            .contribute("bob", Amount::CEILING, t0())
            .unwrap_err();

        assert_eq!(err, LedgerError::Overflow);
        assert_eq!(campaign.raised, amount(400));
        assert_eq!(campaign.contributions["bob"], amount(400));
    }

    #[test]
    fn finalize_succeeds_at_goal() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(1000), t0()).unwrap();
        let status = campaign.finalize(t0() + Duration::days(1)).unwrap();
        assert_eq!(status, CampaignStatus::Succeeded);
    }

    #[test]
    fn finalize_fails_under_goal() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(999), t0()).unwrap();
        let status = campaign.finalize(t0() + Duration::days(1)).unwrap();
        assert_eq!(status, CampaignStatus::Failed);
    }

    #[test]
    fn fail_finalize_before_deadline() {
        let mut campaign = campaign(1000);
        let err = campaign.finalize(t0()).unwrap_err();
        assert_eq!(err, LedgerError::DeadlineNotReached(campaign.id.to_string()));
    }

    #[test]
    fn fail_finalize_twice() {
        let mut campaign = campaign(1000);
        campaign.finalize(t0() + Duration::days(1)).unwrap();
        let err = campaign.finalize(t0() + Duration::days(2)).unwrap_err();
        assert_eq!(err, LedgerError::AlreadyFinalized(campaign.id.to_string()));
    }

    #[test]
    fn withdraw_closes_campaign() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(1100), t0()).unwrap();
        campaign.finalize(t0() + Duration::days(1)).unwrap();

        let paid = campaign.withdraw("alice").unwrap();
        assert_eq!(paid, amount(1100));
        assert!(campaign.withdrawn);
        assert_eq!(campaign.status, CampaignStatus::Closed);
    }

    #[test]
    fn fail_withdraw_not_owner() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(1100), t0()).unwrap();
        campaign.finalize(t0() + Duration::days(1)).unwrap();

        let err = campaign.withdraw("bob").unwrap_err();
        assert_eq!(err, LedgerError::NotOwner("bob".to_string()));
    }

    #[test]
    fn fail_withdraw_twice() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(1100), t0()).unwrap();
        campaign.finalize(t0() + Duration::days(1)).unwrap();
        campaign.withdraw("alice").unwrap();

        let err = campaign.withdraw("alice").unwrap_err();
        assert_eq!(err, LedgerError::AlreadyWithdrawn(campaign.id.to_string()));
    }

    #[test]
    fn fail_withdraw_while_active() {
        let mut campaign = campaign(1000);
        let err = campaign.withdraw("alice").unwrap_err();
        assert_eq!(err, LedgerError::NotSucceeded(campaign.id.to_string()));
    }

    #[test]
    fn refund_zeroes_entry_and_decrements_raised() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(300), t0()).unwrap();
        campaign.finalize(t0() + Duration::days(1)).unwrap();

        let paid = campaign.refund("bob").unwrap();
        assert_eq!(paid, amount(300));
        assert_eq!(campaign.raised, Amount::ZERO);
        assert_eq!(campaign.contributions["bob"], Amount::ZERO);
    }

    #[test]
    fn refund_of_last_contributor_closes_campaign() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(300), t0()).unwrap();
        campaign.contribute("carol", amount(200), t0()).unwrap();
        campaign.finalize(t0() + Duration::days(1)).unwrap();

        campaign.refund("bob").unwrap();
        assert_eq!(campaign.status, CampaignStatus::Failed);
        assert_eq!(campaign.outstanding_contributors(), 1);

        campaign.refund("carol").unwrap();
        assert_eq!(campaign.status, CampaignStatus::Closed);
        assert_eq!(campaign.outstanding_contributors(), 0);
    }

    #[test]
    fn fail_refund_twice() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(300), t0()).unwrap();
        campaign.finalize(t0() + Duration::days(1)).unwrap();
        campaign.refund("bob").unwrap();

        let err = campaign.refund("bob").unwrap_err();
        assert_eq!(err, LedgerError::NothingToRefund("bob".to_string()));
    }

    #[test]
    fn fail_refund_on_succeeded_campaign() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(1000), t0()).unwrap();
        campaign.finalize(t0() + Duration::days(1)).unwrap();

        let err = campaign.refund("bob").unwrap_err();
        assert_eq!(err, LedgerError::NotFailed(campaign.id.to_string()));
    }

    #[test]
    fn fail_refund_after_withdrawal() {
        let mut campaign = campaign(1000);
        campaign.contribute("bob", amount(1000), t0()).unwrap();
        campaign.finalize(t0() + Duration::days(1)).unwrap();
        campaign.withdraw("alice").unwrap();

        let err = campaign.refund("bob").unwrap_err();
        assert_eq!(err, LedgerError::NotFailed(campaign.id.to_string()));
    }
}
