use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod participant {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantNew {
        pub display_name: String,
        pub image_url: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantView {
        pub id: Uuid,
        pub display_name: String,
        pub image_url: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantsResponse {
        pub participants: Vec<ParticipantView>,
    }
}

pub mod expense {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SplitStrategy {
        Equal,
        Percentage,
        Weight,
        Manual,
        Extra,
    }

    /// One payer with the amount they fronted. Amounts are integer minor
    /// units (cents); payer amounts must sum to the expense total.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PayerEntry {
        pub participant_id: Uuid,
        pub amount_minor: i64,
    }

    /// Raw strategy input for one participant (percentage, weight, manual
    /// amount or adjustment, depending on the strategy).
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitInputEntry {
        pub participant_id: Uuid,
        pub raw_value: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShareView {
        pub participant_id: Uuid,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub description: String,
        pub amount_minor: i64,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
        pub category: Option<String>,
        pub created_by: Uuid,
        pub group_id: Option<String>,
        pub payers: Vec<PayerEntry>,
        /// Splitter order matters: leftover cents go to earlier entries.
        pub splitters: Vec<Uuid>,
        pub strategy: SplitStrategy,
        #[serde(default)]
        pub inputs: Vec<SplitInputEntry>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub description: String,
        pub amount_minor: i64,
        pub occurred_at: DateTime<FixedOffset>,
        pub category: Option<String>,
        pub created_by: Uuid,
        pub group_id: Option<String>,
        pub strategy: SplitStrategy,
        pub payers: Vec<ShareView>,
        pub splitters: Vec<ShareView>,
        pub inputs: Vec<SplitInputEntry>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseSaved {
        pub expense: ExpenseView,
        /// `100 − Σ percentages` when the percentage strategy was given
        /// inputs not summing to 100. Informational; the expense is saved.
        pub percent_gap: Option<f64>,
    }
}

pub mod payment {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DirectPaymentNew {
        pub payer_id: Uuid,
        pub receiver_id: Uuid,
        pub amount_minor: i64,
        pub group_id: Option<String>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Expense,
        Direct,
        Settle,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub payer_id: Uuid,
        pub receiver_id: Uuid,
        pub amount_minor: i64,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub created_at: DateTime<FixedOffset>,
        pub kind: TransactionKind,
        pub expense_id: Option<Uuid>,
        pub group_id: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub participant: Option<Uuid>,
        pub group_id: Option<String>,
        #[serde(default)]
        pub direct_only: bool,
        /// If present, acts as an allow-list of kinds to return.
        pub kinds: Option<Vec<TransactionKind>>,
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantSummaryView {
        pub participant_id: Uuid,
        pub paid_minor: i64,
        pub owed_minor: i64,
        pub net_minor: i64,
    }

    /// One display group: an expense with its transactions, or a single
    /// standalone transfer (`expense: None`).
    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupedTransactionsView {
        pub expense: Option<super::expense::ExpenseView>,
        pub transactions: Vec<TransactionView>,
        pub settled: Option<bool>,
        pub summaries: Vec<ParticipantSummaryView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupedTransactionsResponse {
        pub groups: Vec<GroupedTransactionsView>,
    }
}

pub mod balance {
    use super::*;

    /// One signed balance cell: positive = the counterparty owes the owner.
    /// `group_id` is `None` for the direct scope; the views are never
    /// merged server-side.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceEntryView {
        pub counterparty_id: Uuid,
        pub group_id: Option<String>,
        pub net_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub participant_id: Uuid,
        pub entries: Vec<BalanceEntryView>,
    }

    /// Direct-scope net position of `a` versus `b` (positive: `b` owes `a`).
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PairBalanceResponse {
        pub a: Uuid,
        pub b: Uuid,
        pub net_minor: i64,
    }
}

pub mod settlement {
    use super::*;

    /// Settlement scope: exactly one of `{a, b}` (direct, outside groups)
    /// or `group_id`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettleRequest {
        pub a: Option<Uuid>,
        pub b: Option<Uuid>,
        pub group_id: Option<String>,
        /// Plan only; nothing is persisted.
        #[serde(default)]
        pub preview: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferView {
        pub payer_id: Uuid,
        pub receiver_id: Uuid,
        pub amount_minor: i64,
        pub expense_id: Option<Uuid>,
        pub group_id: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FailedTransferView {
        pub transfer: TransferView,
        pub reason: String,
    }

    /// Applied and failed transfers are both reported; a partial result is
    /// not an error, retrying re-plans from the ledger.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettleResponse {
        pub applied: Vec<super::transaction::TransactionView>,
        pub failed: Vec<FailedTransferView>,
        pub planned: Vec<TransferView>,
    }
}
