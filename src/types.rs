//! Core types and constants

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type used throughout the library
pub type Timestamp = DateTime<Utc>;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// The user owning currencies, containers and rate datums
    OwnerId
);
uuid_id!(
    /// A user-defined currency
    CurrencyId
);
uuid_id!(
    /// A container of value (bank account, wallet, cash...)
    ContainerId
);

/// Series key for a timestamp: its epoch milliseconds as a decimal.
pub fn timestamp_key(ts: &Timestamp) -> Decimal {
    Decimal::from(ts.timestamp_millis())
}

/// Inverse of [`timestamp_key`]. Fractional milliseconds are rounded to
/// the nearest whole millisecond.
pub fn key_to_timestamp(key: Decimal) -> Option<Timestamp> {
    let millis = key
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()?;
    DateTime::from_timestamp_millis(millis)
}
