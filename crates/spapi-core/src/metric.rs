use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::Value;

use crate::error::{Result, SpapiError};
use crate::path;

pub const DAMAGE_ENTRIES_PATH: &str = "$.reportData.report.table.data.entries[*][name,total]";

pub const WEAVING_FILTER: &str = "ability.type = 32 AND IN RANGE FROM type = 'applydebuff' AND ability.id = 15258 TO type = 'removedebuff' AND ability.id = 15258 GROUP BY target END";
pub const MISERY_FILTER: &str = "NOT ability.type = 1 AND IN RANGE FROM type = 'applydebuff' AND ability.id = 33200 TO type = 'removedebuff' AND ability.id = 33200 GROUP BY target END";

/// A named upstream filter expression selecting which events count toward a metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDefinition {
    pub name: &'static str,
    pub filter: String,
}

impl MetricDefinition {
    #[must_use]
    pub fn new(name: &'static str, filter: impl Into<String>) -> Self {
        Self {
            name,
            filter: filter.into(),
        }
    }
}

/// The two metrics every report is broken down by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSet {
    pub weaving: MetricDefinition,
    pub misery: MetricDefinition,
}

impl MetricSet {
    #[must_use]
    pub fn new(weaving_filter: impl Into<String>, misery_filter: impl Into<String>) -> Self {
        Self {
            weaving: MetricDefinition::new("weaving", weaving_filter),
            misery: MetricDefinition::new("misery", misery_filter),
        }
    }
}

impl Default for MetricSet {
    fn default() -> Self {
        Self::new(WEAVING_FILTER, MISERY_FILTER)
    }
}

/// Per-participant damage, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DamageDone {
    entries: Vec<(String, f64)>,
}

impl DamageDone {
    /// Insert or overwrite; an overwritten name keeps its original position.
    pub fn insert(&mut self, name: String, amount: f64) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = amount,
            None => self.entries.push((name, amount)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, amount)| *amount)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries
            .iter()
            .map(|(name, amount)| (name.as_str(), *amount))
    }
}

impl Serialize for DamageDone {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, amount) in &self.entries {
            map.serialize_entry(name, &Amount(*amount))?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageBreakdown {
    #[serde(serialize_with = "serialize_amount")]
    pub total_damage: f64,
    pub damage_done: DamageDone,
}

/// Build a breakdown from one upstream damage table.
///
/// Entries are read as `name, total` pairs. A name seen twice keeps only its
/// last amount in `damage_done`, while `total_damage` still counts both.
pub fn aggregate(table: &Value) -> Result<DamageBreakdown> {
    let flat = path::extract(DAMAGE_ENTRIES_PATH, table);
    let mut breakdown = DamageBreakdown::default();

    for pair in flat.chunks_exact(2) {
        let name = participant_name(&pair[0])?;
        let amount = pair[1].as_f64().ok_or_else(|| {
            SpapiError::MalformedResponse(format!(
                "damage total for {name} is not numeric: {}",
                pair[1]
            ))
        })?;
        breakdown.total_damage += amount;
        breakdown.damage_done.insert(name, amount);
    }
    Ok(breakdown)
}

fn participant_name(value: &Value) -> Result<String> {
    match value {
        Value::String(name) => Ok(name.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(SpapiError::MalformedResponse(format!(
            "participant name is not a scalar: {other}"
        ))),
    }
}

struct Amount(f64);

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_amount(&self.0, serializer)
    }
}

// Integral amounts go out as JSON integers so totals read `1200`, not `1200.0`.
fn serialize_amount<S: Serializer>(
    value: &f64,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}
