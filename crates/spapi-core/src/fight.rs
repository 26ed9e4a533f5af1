use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Result, SpapiError};
use crate::metric::{DamageBreakdown, aggregate};
use crate::path;

pub const FIGHT_TOTAL_TIME_PATH: &str = "$.reportData.report.table.data.totalTime";
pub const FIGHT_DOWNTIME_PATH: &str = "$.reportData.report.table.data.downtime";
pub const FIGHT_LIST_PATH: &str = "$.reportData.report.fights[*]";

/// Encounter id reserved for damage done outside any tracked fight.
pub const TRASH_ENCOUNTER_ID: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FightIdentity {
    #[serde(deserialize_with = "integer_or_numeric_string")]
    pub id: i64,
    #[serde(rename = "encounterID", deserialize_with = "integer_or_numeric_string")]
    pub encounter_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FightResult {
    pub id: i64,
    /// Active fight time in milliseconds.
    pub time: i64,
    pub weaving: DamageBreakdown,
    pub misery: DamageBreakdown,
}

pub type Report = Vec<FightResult>;

/// Combine the two metric tables of one fight into a result.
///
/// Fight time is always read from `weaving_table`.
pub fn assemble(weaving_table: &Value, misery_table: &Value, id: i64) -> Result<FightResult> {
    Ok(FightResult {
        id,
        time: active_time(weaving_table)?,
        weaving: aggregate(weaving_table)?,
        misery: aggregate(misery_table)?,
    })
}

fn active_time(table: &Value) -> Result<i64> {
    let total = path::extract(FIGHT_TOTAL_TIME_PATH, table)
        .first()
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            SpapiError::MalformedResponse("damage table is missing totalTime".to_string())
        })?;
    let downtime = path::extract(FIGHT_DOWNTIME_PATH, table)
        .first()
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    // upstream durations are whole milliseconds
    let active = (total - downtime).max(0.0).round() as i64;
    Ok(active)
}

/// Read the fight list out of a fight-listing response, in upstream order.
pub fn fight_identities(listing: &Value) -> Result<Vec<FightIdentity>> {
    path::extract(FIGHT_LIST_PATH, listing)
        .into_iter()
        .map(|fight| {
            serde_json::from_value::<FightIdentity>(fight).map_err(|err| {
                SpapiError::MalformedResponse(format!("invalid fight entry: {err}"))
            })
        })
        .collect()
}

fn integer_or_numeric_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("expected integer, got {text:?}"))),
    }
}
