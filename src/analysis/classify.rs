use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::data::model::{ELAPSED_COLUMN, TIMESTAMP_COLUMN};

// ---------------------------------------------------------------------------
// Categories and the keyword table
// ---------------------------------------------------------------------------

/// Semantic category of a channel. Declaration order is match priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ChannelCategory {
    Altitude,
    Speed,
    Temperature,
    Pressure,
    Rate,
    Other,
}

impl ChannelCategory {
    pub const ALL: [ChannelCategory; 6] = [
        ChannelCategory::Altitude,
        ChannelCategory::Speed,
        ChannelCategory::Temperature,
        ChannelCategory::Pressure,
        ChannelCategory::Rate,
        ChannelCategory::Other,
    ];
}

impl fmt::Display for ChannelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Ordered keyword rules; the first rule with a matching keyword wins.
#[derive(Debug, Clone, Copy)]
pub struct KeywordTable {
    pub version: u32,
    pub rules: &'static [(ChannelCategory, &'static [&'static str])],
}

pub const KEYWORDS_V1: KeywordTable = KeywordTable {
    version: 1,
    rules: &[
        (ChannelCategory::Altitude, &["altitude", "alt"]),
        (ChannelCategory::Speed, &["speed", "airspeed", "cas", "tas", "mach"]),
        (ChannelCategory::Temperature, &["temperature", "temp", "tat"]),
        (ChannelCategory::Pressure, &["pressure", "press"]),
        (ChannelCategory::Rate, &["rate"]),
    ],
};

impl KeywordTable {
    /// Case-insensitive substring match against the rules in order.
    pub fn category_of(&self, name: &str) -> ChannelCategory {
        let lower = name.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(ChannelCategory::Other)
    }
}

// ---------------------------------------------------------------------------
// Classification of a whole channel list
// ---------------------------------------------------------------------------

/// Category → channel names, each list in the order given.
/// Every category is present, possibly with an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification(pub BTreeMap<ChannelCategory, Vec<String>>);

impl Classification {
    pub fn channels(&self, category: ChannelCategory) -> &[String] {
        self.0.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn category_of(&self, name: &str) -> Option<ChannelCategory> {
        self.0
            .iter()
            .find(|(_, names)| names.iter().any(|n| n == name))
            .map(|(category, _)| *category)
    }
}

/// Classify with the current keyword table.
pub fn classify<'a, I>(names: I) -> Classification
where
    I: IntoIterator<Item = &'a str>,
{
    classify_with(&KEYWORDS_V1, names)
}

pub fn classify_with<'a, I>(table: &KeywordTable, names: I) -> Classification
where
    I: IntoIterator<Item = &'a str>,
{
    let mut map: BTreeMap<ChannelCategory, Vec<String>> = ChannelCategory::ALL
        .iter()
        .map(|c| (*c, Vec::new()))
        .collect();

    for name in names {
        if name == TIMESTAMP_COLUMN || name == ELAPSED_COLUMN {
            continue;
        }
        map.entry(table.category_of(name))
            .or_default()
            .push(name.to_string());
    }
    Classification(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_priority() {
        assert_eq!(KEYWORDS_V1.category_of("TAS (kt)"), ChannelCategory::Speed);
        assert_eq!(KEYWORDS_V1.category_of("Altitude Rate (ft/min)"), ChannelCategory::Altitude);
        assert_eq!(KEYWORDS_V1.category_of("OAT (degC)"), ChannelCategory::Other);
        assert_eq!(KEYWORDS_V1.category_of("Total Air Temp"), ChannelCategory::Temperature);
        assert_eq!(KEYWORDS_V1.category_of("Hyd PRESS (psi)"), ChannelCategory::Pressure);
        assert_eq!(KEYWORDS_V1.category_of("Pitch Rate (deg/s)"), ChannelCategory::Rate);
        assert_eq!(KEYWORDS_V1.category_of("MACH"), ChannelCategory::Speed);
    }

    #[test]
    fn test_time_columns_are_excluded() {
        let c = classify([TIMESTAMP_COLUMN, "ALT (ft)", ELAPSED_COLUMN, "N1 (%)"]);
        assert_eq!(c.channels(ChannelCategory::Altitude), ["ALT (ft)"]);
        assert_eq!(c.channels(ChannelCategory::Other), ["N1 (%)"]);
        assert_eq!(c.category_of(TIMESTAMP_COLUMN), None);
        let total: usize = c.0.values().map(Vec::len).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_order_within_category_is_preserved() {
        let c = classify(["CAS (kt)", "ALT (ft)", "TAS (kt)", "Ground Speed (kt)"]);
        assert_eq!(
            c.channels(ChannelCategory::Speed),
            ["CAS (kt)", "TAS (kt)", "Ground Speed (kt)"]
        );
        assert_eq!(c.0.len(), ChannelCategory::ALL.len());
        assert!(c.channels(ChannelCategory::Pressure).is_empty());
    }
}
