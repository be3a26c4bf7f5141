//! Keyed series and the lookups built on them
//!
//! # Components
//!
//! - **keyed**: [`KeyedSeries`], descending-key storage and the shared
//!   binary-search window
//! - **linear**: [`LinearInterpolator`], eager decimal interpolation
//! - **virtual_linear**: [`VirtualInterpolator`], interpolation whose values
//!   are resolved asynchronously, two keys at most per query
//! - **step**: [`StepInterpolator`], last-observation-held lookup for any
//!   payload type
//!
//! All three answer "value at X" from the same search; they differ only in
//! what they do with the bracketing pair.

pub mod keyed;
pub mod linear;
pub mod step;
pub mod virtual_linear;

pub use keyed::{KeyedPoint, KeyedSeries, SearchWindow};
pub use linear::LinearInterpolator;
pub use step::StepInterpolator;
pub use virtual_linear::VirtualInterpolator;
