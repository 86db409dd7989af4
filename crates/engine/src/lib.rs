//! Ledger & settlement engine for shared expenses.
//!
//! The crate is built around four request-scoped computations:
//!
//! - [`split::allocate`] divides an expense total among its splitters under
//!   one of five strategies, exact to the cent.
//! - The balance ledger ([`BalanceBook`] and the `balance_entries` rows the
//!   [`Engine`] ops maintain) tracks the signed pairwise net position of
//!   every two parties, with a zero-sum symmetry invariant.
//! - [`settlement::plan`] nets outstanding obligations into the transfers
//!   that zero every involved position, one partition per expense.
//! - [`reconcile::reconcile`] folds the flat transaction log back into
//!   per-expense display groups with settled flags and participant totals.
//!
//! The [`Engine`] service object wires these to a sea-orm store; it holds no
//! ambient mutable state and is passed explicitly to its callers.

pub use error::EngineError;
pub use expenses::{Expense, ExpenseShare, SplitInput, SplitStrategy};
pub use ledger::{BalanceBook, BalanceEntry, SETTLED_TOLERANCE_MINOR, expense_settled};
pub use money::Money;
pub use ops::{Engine, EngineBuilder, NewExpense, SavedExpense, SettleScope, TransactionListFilter};
pub use participants::Participant;
pub use reconcile::{GroupedTransactions, ParticipantSummary};
pub use settlement::{FailedTransfer, SettlementReport, SettlementTransfer};
pub use split::Allocation;
pub use transactions::{Transaction, TransactionKind};

mod error;
mod expense_shares;
mod expenses;
mod ledger;
mod money;
mod ops;
mod participants;
pub mod reconcile;
pub mod settlement;
pub mod split;
mod transactions;

type ResultEngine<T> = Result<T, EngineError>;
