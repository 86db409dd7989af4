//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Spartire:
//!
//! - `participants`: the parties that owe or are owed money
//! - `expenses`: shared costs with their split strategy
//! - `expense_shares`: payer/splitter amounts and raw split inputs per expense
//! - `transactions`: obligations and settlements, oriented debtor → creditor
//! - `balance_entries`: denormalized pairwise net positions per scope

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Participants {
    Table,
    Id,
    DisplayName,
    NormalizedName,
    ImageUrl,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    Description,
    AmountMinor,
    OccurredAt,
    Category,
    CreatedBy,
    GroupId,
    Strategy,
}

#[derive(Iden)]
enum ExpenseShares {
    Table,
    ExpenseId,
    ParticipantId,
    Role,
    Position,
    AmountMinor,
    RawValue,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    PayerId,
    ReceiverId,
    AmountMinor,
    CreatedAt,
    Kind,
    ExpenseId,
    GroupId,
}

#[derive(Iden)]
enum BalanceEntries {
    Table,
    OwnerId,
    CounterpartyId,
    GroupKey,
    NetMinor,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Participants
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Participants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participants::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Participants::DisplayName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Participants::NormalizedName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Participants::ImageUrl).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-participants-normalized_name-unique")
                    .table(Participants::Table)
                    .col(Participants::NormalizedName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Expenses
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
                    .col(ColumnDef::new(Expenses::Description).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::Category).string())
                    .col(ColumnDef::new(Expenses::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Expenses::GroupId).string())
                    .col(ColumnDef::new(Expenses::Strategy).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-created_by")
                            .from(Expenses::Table, Expenses::CreatedBy)
                            .to(Participants::Table, Participants::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-group_id")
                    .table(Expenses::Table)
                    .col(Expenses::GroupId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Expense shares
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExpenseShares::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ExpenseShares::ExpenseId).string().not_null())
                    .col(
                        ColumnDef::new(ExpenseShares::ParticipantId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExpenseShares::Role).string().not_null())
                    .col(ColumnDef::new(ExpenseShares::Position).integer().not_null())
                    .col(ColumnDef::new(ExpenseShares::AmountMinor).big_integer())
                    .col(ColumnDef::new(ExpenseShares::RawValue).double())
                    .primary_key(
                        Index::create()
                            .col(ExpenseShares::ExpenseId)
                            .col(ExpenseShares::ParticipantId)
                            .col(ExpenseShares::Role),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_shares-expense_id")
                            .from(ExpenseShares::Table, ExpenseShares::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_shares-participant_id")
                            .from(ExpenseShares::Table, ExpenseShares::ParticipantId)
                            .to(Participants::Table, Participants::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::PayerId).string().not_null())
                    .col(ColumnDef::new(Transactions::ReceiverId).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(ColumnDef::new(Transactions::ExpenseId).string())
                    .col(ColumnDef::new(Transactions::GroupId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-expense_id")
                            .from(Transactions::Table, Transactions::ExpenseId)
                            .to(Expenses::Table, Expenses::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-payer_id")
                            .from(Transactions::Table, Transactions::PayerId)
                            .to(Participants::Table, Participants::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-receiver_id")
                            .from(Transactions::Table, Transactions::ReceiverId)
                            .to(Participants::Table, Participants::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-expense_id")
                    .table(Transactions::Table)
                    .col(Transactions::ExpenseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-group_id")
                    .table(Transactions::Table)
                    .col(Transactions::GroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Balance entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BalanceEntries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BalanceEntries::OwnerId).string().not_null())
                    .col(
                        ColumnDef::new(BalanceEntries::CounterpartyId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BalanceEntries::GroupKey).string().not_null())
                    .col(
                        ColumnDef::new(BalanceEntries::NetMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(BalanceEntries::OwnerId)
                            .col(BalanceEntries::CounterpartyId)
                            .col(BalanceEntries::GroupKey),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-balance_entries-owner_id")
                            .from(BalanceEntries::Table, BalanceEntries::OwnerId)
                            .to(Participants::Table, Participants::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-balance_entries-counterparty_id")
                            .from(BalanceEntries::Table, BalanceEntries::CounterpartyId)
                            .to(Participants::Table, Participants::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BalanceEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseShares::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Participants::Table).to_owned())
            .await?;
        Ok(())
    }
}
