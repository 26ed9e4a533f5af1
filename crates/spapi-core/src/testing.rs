//! Scripted upstream client for exercising the orchestrator without a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::client::RemoteQueryClient;
use crate::error::{Result, SpapiError};
use crate::metric::MetricSet;
use crate::query::QueryRequest;

type FailurePredicate = Box<dyn Fn(&QueryRequest) -> bool + Send + Sync>;

/// Answers every query from a fixed fight list with deterministic tables.
///
/// Fight `n` reports `n * 1000` ms with 100 ms downtime, weaving damage
/// `Anna: n * 100` and misery damage `Bors: n * 10`. The trash segment has
/// 60000 ms with 15000 ms downtime, weaving `Anna: 1000, Bors: 500` and misery
/// `Anna: 300`.
pub struct ScriptedClient {
    metrics: MetricSet,
    fights: Vec<(i64, i64)>,
    delays: HashMap<i64, Duration>,
    fail_on: Option<FailurePredicate>,
    calls: Mutex<Vec<QueryRequest>>,
}

impl ScriptedClient {
    /// `fights` holds `(fight id, encounter id)` pairs in listing order.
    #[must_use]
    pub fn new(fights: &[(i64, i64)]) -> Self {
        Self {
            metrics: MetricSet::default(),
            fights: fights.to_vec(),
            delays: HashMap::new(),
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Delay both table queries of one fight.
    #[must_use]
    pub fn with_delay(mut self, fight_id: i64, delay: Duration) -> Self {
        self.delays.insert(fight_id, delay);
        self
    }

    #[must_use]
    pub fn failing_on(
        mut self,
        predicate: impl Fn(&QueryRequest) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_on = Some(Box::new(predicate));
        self
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<QueryRequest> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn is_weaving(&self, filter: &str) -> Result<bool> {
        if filter == self.metrics.weaving.filter {
            Ok(true)
        } else if filter == self.metrics.misery.filter {
            Ok(false)
        } else {
            Err(SpapiError::UpstreamGraphql(format!("unknown filter: {filter}")))
        }
    }

    fn respond(&self, request: &QueryRequest) -> Result<Value> {
        match request {
            QueryRequest::FightListing { .. } => {
                let fights: Vec<Value> = self
                    .fights
                    .iter()
                    .map(|(id, encounter)| json!({"id": id, "encounterID": encounter}))
                    .collect();
                Ok(json!({"reportData": {"report": {"fights": fights}}}))
            }
            QueryRequest::TrashTable { filter, .. } => Ok(if self.is_weaving(filter)? {
                table(60_000, Some(15_000), &[("Anna", 1000), ("Bors", 500)])
            } else {
                table(60_000, None, &[("Anna", 300)])
            }),
            QueryRequest::FightTable {
                fight_id, filter, ..
            } => {
                if !self.fights.iter().any(|(id, _)| id == fight_id) {
                    return Err(SpapiError::UpstreamGraphql(format!(
                        "unknown fight: {fight_id}"
                    )));
                }
                Ok(if self.is_weaving(filter)? {
                    table(fight_id * 1000, Some(100), &[("Anna", fight_id * 100)])
                } else {
                    table(fight_id * 1000, None, &[("Bors", fight_id * 10)])
                })
            }
        }
    }
}

#[async_trait]
impl RemoteQueryClient for ScriptedClient {
    async fn execute(&self, request: &QueryRequest) -> Result<Value> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        let delay = match request {
            QueryRequest::FightTable { fight_id, .. } => self.delays.get(fight_id).copied(),
            _ => None,
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on.as_ref().is_some_and(|fail| fail(request)) {
            return Err(SpapiError::UpstreamStatus {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        self.respond(request)
    }
}

/// A damage table in the upstream response shape.
#[must_use]
pub fn table(total_time: i64, downtime: Option<i64>, entries: &[(&str, i64)]) -> Value {
    let entries: Vec<Value> = entries
        .iter()
        .map(|(name, total)| json!({"name": name, "total": total}))
        .collect();
    let mut data = json!({"totalTime": total_time, "entries": entries});
    if let Some(downtime) = downtime {
        data["downtime"] = json!(downtime);
    }
    json!({"reportData": {"report": {"table": {"data": data}}}})
}
