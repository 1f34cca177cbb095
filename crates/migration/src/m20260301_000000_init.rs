//! Initial schema migration - creates all tables from scratch.
//!
//! - `users`: authentication
//! - `trips`: planning containers owned by users, with a budget envelope
//! - `expenses`: per-day spend records in their own currency
//! - `trip_shares`: multi-user trip access via invitations
//! - `budget_alerts`: threshold alerts raised by the monitor

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
    PreferredCurrency,
}

#[derive(Iden)]
enum Trips {
    Table,
    Id,
    Title,
    Destination,
    StartDate,
    EndDate,
    BudgetMinor,
    Currency,
    Status,
    Visibility,
    UserId,
    Version,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    TripId,
    DayNumber,
    ExpenseDate,
    Category,
    Description,
    AmountMinor,
    Currency,
    Reimbursable,
    Reimbursed,
    Status,
}

#[derive(Iden)]
enum TripShares {
    Table,
    Id,
    TripId,
    OwnerId,
    SharedWith,
    Permission,
    Status,
    ShareToken,
    CreatedAt,
    RespondedAt,
    ExpiresAt,
    Version,
}

#[derive(Iden)]
enum BudgetAlerts {
    Table,
    Id,
    TripId,
    AlertType,
    ThresholdPct,
    CurrentAmountMinor,
    BudgetAmountMinor,
    Message,
    Status,
    TriggeredAt,
    AcknowledgedAt,
    ResolvedAt,
    Version,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::PreferredCurrency).string())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Trips
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Trips::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Trips::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Trips::Title).string().not_null())
                    .col(ColumnDef::new(Trips::Destination).string().not_null())
                    .col(ColumnDef::new(Trips::StartDate).date().not_null())
                    .col(ColumnDef::new(Trips::EndDate).date().not_null())
                    .col(ColumnDef::new(Trips::BudgetMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Trips::Currency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(ColumnDef::new(Trips::Status).string().not_null())
                    .col(ColumnDef::new(Trips::Visibility).string().not_null())
                    .col(ColumnDef::new(Trips::UserId).string().not_null())
                    .col(
                        ColumnDef::new(Trips::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-trips-user_id")
                            .from(Trips::Table, Trips::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-trips-user_id")
                    .table(Trips::Table)
                    .col(Trips::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::TripId).string().not_null())
                    .col(ColumnDef::new(Expenses::DayNumber).integer().not_null())
                    .col(ColumnDef::new(Expenses::ExpenseDate).date().not_null())
                    .col(ColumnDef::new(Expenses::Category).string().not_null())
                    .col(ColumnDef::new(Expenses::Description).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::Currency).string().not_null())
                    .col(ColumnDef::new(Expenses::Reimbursable).boolean().not_null())
                    .col(ColumnDef::new(Expenses::Reimbursed).boolean().not_null())
                    .col(ColumnDef::new(Expenses::Status).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-trip_id")
                            .from(Expenses::Table, Expenses::TripId)
                            .to(Trips::Table, Trips::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-trip_id-expense_date")
                    .table(Expenses::Table)
                    .col(Expenses::TripId)
                    .col(Expenses::ExpenseDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-trip_id-category")
                    .table(Expenses::Table)
                    .col(Expenses::TripId)
                    .col(Expenses::Category)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Trip Shares
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(TripShares::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TripShares::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TripShares::TripId).string().not_null())
                    .col(ColumnDef::new(TripShares::OwnerId).string().not_null())
                    .col(ColumnDef::new(TripShares::SharedWith).string().not_null())
                    .col(ColumnDef::new(TripShares::Permission).string().not_null())
                    .col(ColumnDef::new(TripShares::Status).string().not_null())
                    .col(ColumnDef::new(TripShares::ShareToken).string().not_null())
                    .col(
                        ColumnDef::new(TripShares::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TripShares::RespondedAt).timestamp())
                    .col(ColumnDef::new(TripShares::ExpiresAt).timestamp())
                    .col(
                        ColumnDef::new(TripShares::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-trip_shares-trip_id")
                            .from(TripShares::Table, TripShares::TripId)
                            .to(Trips::Table, Trips::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-trip_shares-shared_with")
                            .from(TripShares::Table, TripShares::SharedWith)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-trip_shares-share_token-unique")
                    .table(TripShares::Table)
                    .col(TripShares::ShareToken)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-trip_shares-trip_id-shared_with")
                    .table(TripShares::Table)
                    .col(TripShares::TripId)
                    .col(TripShares::SharedWith)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-trip_shares-shared_with")
                    .table(TripShares::Table)
                    .col(TripShares::SharedWith)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Budget Alerts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BudgetAlerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BudgetAlerts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BudgetAlerts::TripId).string().not_null())
                    .col(ColumnDef::new(BudgetAlerts::AlertType).string().not_null())
                    .col(
                        ColumnDef::new(BudgetAlerts::ThresholdPct)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetAlerts::CurrentAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetAlerts::BudgetAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BudgetAlerts::Message).string().not_null())
                    .col(ColumnDef::new(BudgetAlerts::Status).string().not_null())
                    .col(
                        ColumnDef::new(BudgetAlerts::TriggeredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BudgetAlerts::AcknowledgedAt).timestamp())
                    .col(ColumnDef::new(BudgetAlerts::ResolvedAt).timestamp())
                    .col(
                        ColumnDef::new(BudgetAlerts::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_alerts-trip_id")
                            .from(BudgetAlerts::Table, BudgetAlerts::TripId)
                            .to(Trips::Table, Trips::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budget_alerts-trip_id-status")
                    .table(BudgetAlerts::Table)
                    .col(BudgetAlerts::TripId)
                    .col(BudgetAlerts::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(BudgetAlerts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TripShares::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Trips::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
