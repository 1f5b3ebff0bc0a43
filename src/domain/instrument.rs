//! Closed registry of tradable instruments and their exchange symbols.

use crate::domain::error::VixTriggerError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instrument {
    Vix,
    Aapl,
    Tsla,
    Msft,
    Gme,
    Sp500,
    NaturalGas,
    Corn,
    Wheat,
    CrudeOil,
}

impl Instrument {
    pub const ALL: [Instrument; 10] = [
        Instrument::Vix,
        Instrument::Aapl,
        Instrument::Tsla,
        Instrument::Msft,
        Instrument::Gme,
        Instrument::Sp500,
        Instrument::NaturalGas,
        Instrument::Corn,
        Instrument::Wheat,
        Instrument::CrudeOil,
    ];

    /// Exchange symbol as quoted by the market-data provider.
    pub fn symbol(self) -> &'static str {
        match self {
            Instrument::Vix => "^VIX",
            Instrument::Aapl => "AAPL",
            Instrument::Tsla => "TSLA",
            Instrument::Msft => "MSFT",
            Instrument::Gme => "GME",
            Instrument::Sp500 => "^GSPC",
            Instrument::NaturalGas => "NG=F",
            Instrument::Corn => "ZC=F",
            Instrument::Wheat => "KE=F",
            Instrument::CrudeOil => "CL=F",
        }
    }

    /// Short name, used as the column prefix in joined feature frames (`VIX.close`).
    pub fn name(self) -> &'static str {
        match self {
            Instrument::Vix => "VIX",
            Instrument::Aapl => "AAPL",
            Instrument::Tsla => "TSLA",
            Instrument::Msft => "MSFT",
            Instrument::Gme => "GME",
            Instrument::Sp500 => "SP500",
            Instrument::NaturalGas => "Natural_Gas",
            Instrument::Corn => "Corn",
            Instrument::Wheat => "Wheat",
            Instrument::CrudeOil => "Crude_Oil",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Instrument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for Instrument {
    type Err = VixTriggerError;

    /// Accepts either the short name or the exchange symbol, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Instrument::ALL
            .into_iter()
            .find(|i| i.name().eq_ignore_ascii_case(wanted) || i.symbol().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| VixTriggerError::UnknownInstrument {
                name: wanted.to_string(),
            })
    }
}

/// Parse a comma-separated instrument list, preserving order and rejecting duplicates.
pub fn parse_instruments(input: &str) -> Result<Vec<Instrument>, VixTriggerError> {
    let mut instruments = Vec::new();
    for token in input.split(',') {
        let instrument: Instrument = token.parse()?;
        if instruments.contains(&instrument) {
            return Err(VixTriggerError::ConfigInvalid {
                section: "features".into(),
                key: "inputs".into(),
                reason: format!("duplicate instrument {instrument}"),
            });
        }
        instruments.push(instrument);
    }
    Ok(instruments)
}
