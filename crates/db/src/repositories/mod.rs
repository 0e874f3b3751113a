//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the
//! application. All engine writes go through these types; in particular,
//! account balances are written only by the balance module in response
//! to posted entries.

pub mod account;
pub mod audit;
pub mod balance;
pub mod ledger;
pub mod sequence;

pub use account::{AccountFilter, AccountRepository, CreateAccountInput};
pub use audit::AuditRepository;
pub use balance::ReconcileReport;
pub use ledger::{EntryFilter, EntryWithLines, LedgerRepository, UpdateEntryInput};
pub use sequence::SequenceRepository;
