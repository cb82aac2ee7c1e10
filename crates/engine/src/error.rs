//! The module contains the errors the ledger can throw.
//!
//! The variants fall into four groups callers treat differently: validation
//! (rejected before any state change), state conflicts (the operation is not
//! valid in the campaign's current state or time), authorization, and
//! arithmetic/storage failures. Every error leaves the ledger unchanged.

use sea_orm::DbErr;
use thiserror::Error;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("goal must be greater than zero")]
    InvalidGoal,
    #[error("duration must be at least one day")]
    InvalidDuration,
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("invalid movements cursor")]
    InvalidCursor,
    #[error("campaign \"{0}\" is not active")]
    CampaignNotActive(String),
    #[error("deadline has passed for campaign \"{0}\"")]
    DeadlinePassed(String),
    #[error("deadline not reached for campaign \"{0}\"")]
    DeadlineNotReached(String),
    #[error("campaign \"{0}\" is already finalized")]
    AlreadyFinalized(String),
    #[error("campaign \"{0}\" has not succeeded")]
    NotSucceeded(String),
    #[error("campaign \"{0}\" has not failed")]
    NotFailed(String),
    #[error("funds of campaign \"{0}\" already withdrawn")]
    AlreadyWithdrawn(String),
    #[error("nothing to refund to \"{0}\"")]
    NothingToRefund(String),
    #[error("\"{0}\" is not the campaign owner")]
    NotOwner(String),
    #[error("amount overflow")]
    Overflow,
    #[error("amount underflow")]
    Underflow,
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidGoal, Self::InvalidGoal) => true,
            (Self::InvalidDuration, Self::InvalidDuration) => true,
            (Self::ZeroAmount, Self::ZeroAmount) => true,
            (Self::InvalidCursor, Self::InvalidCursor) => true,
            (Self::CampaignNotActive(a), Self::CampaignNotActive(b)) => a == b,
            (Self::DeadlinePassed(a), Self::DeadlinePassed(b)) => a == b,
            (Self::DeadlineNotReached(a), Self::DeadlineNotReached(b)) => a == b,
            (Self::AlreadyFinalized(a), Self::AlreadyFinalized(b)) => a == b,
            (Self::NotSucceeded(a), Self::NotSucceeded(b)) => a == b,
            (Self::NotFailed(a), Self::NotFailed(b)) => a == b,
            (Self::AlreadyWithdrawn(a), Self::AlreadyWithdrawn(b)) => a == b,
            (Self::NothingToRefund(a), Self::NothingToRefund(b)) => a == b,
            (Self::NotOwner(a), Self::NotOwner(b)) => a == b,
            (Self::Overflow, Self::Overflow) => true,
            (Self::Underflow, Self::Underflow) => true,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InvalidRecord(a), Self::InvalidRecord(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
