//! Transaction fragments
//!
//! A fragment moves value out of one container (`from`), into one
//! container (`to`), or both at once (an exchange). Each present side names
//! a container, a currency and an amount.

use crate::error::{LedgerError, Result};
use crate::types::{ContainerId, CurrencyId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentSide {
    pub container: ContainerId,
    pub currency: CurrencyId,
    pub amount: Decimal,
}

impl FragmentSide {
    pub fn new(container: ContainerId, currency: CurrencyId, amount: Decimal) -> Self {
        Self {
            container,
            currency,
            amount,
        }
    }
}

/// One dated movement of value. At least one side is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FragmentRecord", into = "FragmentRecord")]
pub struct TransactionFragment {
    date: Timestamp,
    from: Option<FragmentSide>,
    to: Option<FragmentSide>,
}

impl TransactionFragment {
    pub fn new(date: Timestamp, from: Option<FragmentSide>, to: Option<FragmentSide>) -> Result<Self> {
        if from.is_none() && to.is_none() {
            return Err(LedgerError::InvalidFragment(format!(
                "fragment at {} has neither a from nor a to side",
                date
            )));
        }
        Ok(Self { date, from, to })
    }

    /// Value leaving `side.container`
    pub fn outflow(date: Timestamp, side: FragmentSide) -> Self {
        Self {
            date,
            from: Some(side),
            to: None,
        }
    }

    /// Value entering `side.container`
    pub fn inflow(date: Timestamp, side: FragmentSide) -> Self {
        Self {
            date,
            from: None,
            to: Some(side),
        }
    }

    pub fn exchange(date: Timestamp, from: FragmentSide, to: FragmentSide) -> Self {
        Self {
            date,
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn date(&self) -> Timestamp {
        self.date
    }

    pub fn from_side(&self) -> Option<&FragmentSide> {
        self.from.as_ref()
    }

    pub fn to_side(&self) -> Option<&FragmentSide> {
        self.to.as_ref()
    }

    pub fn is_exchange(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }

    /// Whether either side touches `container`
    pub fn involves(&self, container: ContainerId) -> bool {
        self.from.map_or(false, |s| s.container == container)
            || self.to.map_or(false, |s| s.container == container)
    }

    /// Signed per-side deltas: the from side negative, the to side positive
    pub fn deltas(&self) -> impl Iterator<Item = (ContainerId, CurrencyId, Decimal)> + '_ {
        let outgoing = self.from.iter().map(|s| (s.container, s.currency, -s.amount));
        let incoming = self.to.iter().map(|s| (s.container, s.currency, s.amount));
        outgoing.chain(incoming)
    }
}

/// Flat wire form of a fragment, one column per side field.
///
/// A side's three fields must be all present or all absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: Timestamp,
    pub from_container: Option<ContainerId>,
    pub from_currency: Option<CurrencyId>,
    pub from_amount: Option<Decimal>,
    pub to_container: Option<ContainerId>,
    pub to_currency: Option<CurrencyId>,
    pub to_amount: Option<Decimal>,
}

fn side_from_parts(
    label: &str,
    container: Option<ContainerId>,
    currency: Option<CurrencyId>,
    amount: Option<Decimal>,
) -> Result<Option<FragmentSide>> {
    match (container, currency, amount) {
        (Some(container), Some(currency), Some(amount)) => {
            Ok(Some(FragmentSide::new(container, currency, amount)))
        }
        (None, None, None) => Ok(None),
        _ => Err(LedgerError::InvalidFragment(format!(
            "[{label}_amount, {label}_currency, {label}_container] must either be all defined, or not defined"
        ))),
    }
}

impl TryFrom<FragmentRecord> for TransactionFragment {
    type Error = LedgerError;

    fn try_from(record: FragmentRecord) -> Result<Self> {
        let from = side_from_parts(
            "from",
            record.from_container,
            record.from_currency,
            record.from_amount,
        )?;
        let to = side_from_parts("to", record.to_container, record.to_currency, record.to_amount)?;
        TransactionFragment::new(record.date, from, to)
    }
}

impl From<TransactionFragment> for FragmentRecord {
    fn from(fragment: TransactionFragment) -> Self {
        Self {
            date: fragment.date,
            from_container: fragment.from.map(|s| s.container),
            from_currency: fragment.from.map(|s| s.currency),
            from_amount: fragment.from.map(|s| s.amount),
            to_container: fragment.to.map(|s| s.container),
            to_currency: fragment.to.map(|s| s.currency),
            to_amount: fragment.to.map(|s| s.amount),
        }
    }
}

/// Read fragments from CSV with a `FragmentRecord` header
pub fn load_fragments_csv<R: Read>(reader: R) -> Result<Vec<TransactionFragment>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut fragments = Vec::new();
    for record in csv_reader.deserialize::<FragmentRecord>() {
        fragments.push(TransactionFragment::try_from(record?)?);
    }
    log::debug!("Loaded {} transaction fragments from CSV", fragments.len());
    Ok(fragments)
}
