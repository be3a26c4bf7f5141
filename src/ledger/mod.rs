//! Transaction fragments and their valuation

pub mod fragment;
pub mod timeline;
pub mod valuation;

pub use fragment::{load_fragments_csv, FragmentRecord, FragmentSide, TransactionFragment};
pub use timeline::TimelinePoint;
pub use valuation::{Balances, ContainerValuation, IncomeExpenseSummary, LedgerSnapshot, LedgerValuation};
