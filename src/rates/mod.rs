//! Currency rate data and resolution
//!
//! # Components
//!
//! - **datum**: [`RateDatum`], one dated observation of a currency quoted in
//!   another
//! - **store**: [`RateDatumStore`] contract and [`InMemoryRateDatumStore`]
//! - **cache**: [`RateDatumCache`], per-owner memory of nearest-datum lookups
//! - **resolver**: [`NearestDatumResolver`], the two datums closest to a date
//! - **chain**: [`RateChain`], rate of any currency in the base currency
//! - **history**: [`rate_history`], evenly sampled base rates over a range

pub mod cache;
pub mod chain;
pub mod datum;
pub mod history;
pub mod resolver;
pub mod store;

pub use cache::RateDatumCache;
pub use chain::{RateChain, RateSource};
pub use datum::RateDatum;
pub use history::{rate_history, RateHistory, RateHistoryPoint};
pub use resolver::NearestDatumResolver;
pub use store::{InMemoryRateDatumStore, RateDatumStore};
