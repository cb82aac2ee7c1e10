//! Initial schema migration - creates all tables from scratch.
//!
//! The complete schema for the campaign ledger:
//!
//! - `campaigns`: one row per campaign (goal, deadline, raised total, status)
//! - `contributions`: cumulative pledge per `(campaign, contributor)` pair
//! - `movements`: append-only audit log of pledges, withdrawals, and refunds

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Campaigns {
    Table,
    Id,
    Owner,
    Name,
    Description,
    GoalMinor,
    CreatedAt,
    Deadline,
    RaisedMinor,
    Status,
    Withdrawn,
}

#[derive(Iden)]
enum Contributions {
    Table,
    CampaignId,
    Contributor,
    AmountMinor,
    FirstPledgedAt,
}

#[derive(Iden)]
enum Movements {
    Table,
    Id,
    CampaignId,
    Kind,
    Account,
    AmountMinor,
    RaisedAfterMinor,
    OccurredAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Campaigns
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Campaigns::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Campaigns::Owner).string().not_null())
                    .col(ColumnDef::new(Campaigns::Name).string().not_null())
                    .col(ColumnDef::new(Campaigns::Description).string().not_null())
                    .col(
                        ColumnDef::new(Campaigns::GoalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Campaigns::Deadline).timestamp().not_null())
                    .col(
                        ColumnDef::new(Campaigns::RaisedMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Campaigns::Status).string().not_null())
                    .col(ColumnDef::new(Campaigns::Withdrawn).boolean().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-campaigns-owner-created_at")
                    .table(Campaigns::Table)
                    .col(Campaigns::Owner)
                    .col(Campaigns::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Contributions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Contributions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contributions::CampaignId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contributions::Contributor)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contributions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contributions::FirstPledgedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(Contributions::CampaignId)
                            .col(Contributions::Contributor),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-contributions-campaign_id")
                            .from(Contributions::Table, Contributions::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-contributions-contributor")
                    .table(Contributions::Table)
                    .col(Contributions::Contributor)
                    .col(Contributions::FirstPledgedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Movements
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Movements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Movements::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Movements::CampaignId).string().not_null())
                    .col(ColumnDef::new(Movements::Kind).string().not_null())
                    .col(ColumnDef::new(Movements::Account).string().not_null())
                    .col(
                        ColumnDef::new(Movements::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Movements::RaisedAfterMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Movements::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-movements-campaign_id")
                            .from(Movements::Table, Movements::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-movements-campaign_id-occurred_at")
                    .table(Movements::Table)
                    .col(Movements::CampaignId)
                    .col(Movements::OccurredAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Movements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contributions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await?;
        Ok(())
    }
}
