//! # Rusty-Ledger
//!
//! Point-in-time valuation for a multi-currency personal ledger.
//!
//! Currencies are user defined and priced by sparse, dated rate datums,
//! each quoting one currency in another. Rusty-Ledger turns those datums into
//! a rate for any date by interpolating between observations, walks
//! reference currencies down to a base currency, and values containers of
//! transaction fragments with exact decimal arithmetic.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rusty_ledger::prelude::*;
//! use chrono::Utc;
//!
//! # async fn run(owner: OwnerId, base: CurrencyId, fragments: Vec<TransactionFragment>) -> Result<()> {
//! let store = InMemoryRateDatumStore::new();
//! store.load_from_csv(std::fs::File::open("datums.csv")?)?;
//!
//! let config = ValuationConfig::with_base_currency(base);
//! let chain = RateChain::new(&store, owner, &config)?;
//! let snapshot = LedgerValuation::new(&chain).value_at(&fragments, Utc::now()).await?;
//!
//! println!("net worth: {:?}", snapshot.net_worth);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod rates;
pub mod series;
pub mod types;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::config::ValuationConfig;
    pub use crate::error::{LedgerError, Result};
    pub use crate::ledger::{
        FragmentSide, LedgerSnapshot, LedgerValuation, TransactionFragment,
    };
    pub use crate::rates::{
        InMemoryRateDatumStore, RateChain, RateDatum, RateDatumStore, RateSource,
    };
    pub use crate::series::{LinearInterpolator, StepInterpolator, VirtualInterpolator};
    pub use crate::types::*;
}
