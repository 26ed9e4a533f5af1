use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::client::RemoteQueryClient;
use crate::error::{Result, SpapiError};
use crate::fight::{
    FightIdentity, FightResult, Report, TRASH_ENCOUNTER_ID, assemble, fight_identities,
};
use crate::metric::MetricSet;
use crate::query::QueryRequest;

/// Builds per-fight damage reports from the upstream service.
#[derive(Clone)]
pub struct ReportOrchestrator {
    client: Arc<dyn RemoteQueryClient>,
    metrics: Arc<MetricSet>,
}

impl std::fmt::Debug for ReportOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportOrchestrator")
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl ReportOrchestrator {
    #[must_use]
    pub fn new(client: Arc<dyn RemoteQueryClient>, metrics: MetricSet) -> Self {
        Self {
            client,
            metrics: Arc::new(metrics),
        }
    }

    /// Fetch and assemble the report: every killed fight in listing order,
    /// followed by the trash segment with id 0.
    ///
    /// Any failing upstream call fails the whole report.
    pub async fn build_report(&self, report_code: &str) -> Result<Report> {
        let report = normalize_report_code(report_code)?;

        let (trash, mut fights) =
            tokio::try_join!(self.trash_result(&report), self.fight_results(&report))?;
        fights.push(trash);

        info!(report = %report, entries = fights.len(), "report assembled");
        Ok(fights)
    }

    async fn trash_result(&self, report: &str) -> Result<FightResult> {
        let weaving = QueryRequest::TrashTable {
            report: report.to_string(),
            filter: self.metrics.weaving.filter.clone(),
        };
        let misery = QueryRequest::TrashTable {
            report: report.to_string(),
            filter: self.metrics.misery.filter.clone(),
        };
        let (weaving_table, misery_table) =
            tokio::try_join!(self.client.execute(&weaving), self.client.execute(&misery))?;
        assemble(&weaving_table, &misery_table, TRASH_ENCOUNTER_ID)
    }

    async fn fight_results(&self, report: &str) -> Result<Vec<FightResult>> {
        let listing = self
            .client
            .execute(&QueryRequest::FightListing {
                report: report.to_string(),
            })
            .await?;
        let fights = fight_identities(&listing)?;
        debug!(report = %report, fights = fights.len(), "fetching fight tables");

        fan_out(fights, |fight| {
            fight_result(
                Arc::clone(&self.client),
                Arc::clone(&self.metrics),
                report.to_string(),
                fight,
            )
        })
        .await
    }
}

async fn fight_result(
    client: Arc<dyn RemoteQueryClient>,
    metrics: Arc<MetricSet>,
    report: String,
    fight: FightIdentity,
) -> Result<FightResult> {
    let weaving = QueryRequest::FightTable {
        report: report.clone(),
        fight_id: fight.id,
        filter: metrics.weaving.filter.clone(),
    };
    let misery = QueryRequest::FightTable {
        report,
        fight_id: fight.id,
        filter: metrics.misery.filter.clone(),
    };
    let (weaving_table, misery_table) =
        tokio::try_join!(client.execute(&weaving), client.execute(&misery))?;
    assemble(&weaving_table, &misery_table, fight.encounter_id)
}

/// Run `task` for every item on its own tokio task and collect the outputs
/// in input order, independent of completion order.
///
/// The first error wins; tasks still running are aborted.
pub async fn fan_out<I, T, F, Fut>(items: I, mut task: F) -> Result<Vec<T>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut set = JoinSet::new();
    let mut slots: Vec<Option<T>> = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        let future = task(item);
        set.spawn(async move { (index, future.await) });
        slots.push(None);
    }

    while let Some(joined) = set.join_next().await {
        let (index, outcome) =
            joined.map_err(|err| SpapiError::Internal(format!("fan-out task failed: {err}")))?;
        let value = outcome?;
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(value);
        }
    }

    slots
        .into_iter()
        .collect::<Option<Vec<T>>>()
        .ok_or_else(|| SpapiError::Internal("fan-out task produced no result".to_string()))
}

fn normalize_report_code(raw: &str) -> Result<String> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(SpapiError::Validation("report code is empty".to_string()));
    }
    Ok(code.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::testing::ScriptedClient;

    use super::*;

    fn setup(client: ScriptedClient) -> (ReportOrchestrator, Arc<ScriptedClient>) {
        let client = Arc::new(client);
        let orchestrator = ReportOrchestrator::new(client.clone(), MetricSet::default());
        (orchestrator, client)
    }

    #[tokio::test]
    async fn fights_keep_listing_order_with_trash_last() {
        // the first listed fight finishes last
        let client = ScriptedClient::new(&[(2, 601), (5, 602)])
            .with_delay(2, Duration::from_millis(80));
        let (orchestrator, _) = setup(client);

        let report = orchestrator.build_report("abc123").await.expect("report");
        let ids: Vec<i64> = report.iter().map(|fight| fight.id).collect();
        assert_eq!(ids, vec![601, 602, 0]);

        assert_eq!(report[0].time, 1900);
        assert_eq!(report[0].weaving.damage_done.get("Anna"), Some(200.0));
        assert_eq!(report[0].misery.damage_done.get("Bors"), Some(20.0));
        assert_eq!(report[1].time, 4900);

        let trash = &report[2];
        assert_eq!(trash.time, 45_000);
        assert_eq!(trash.weaving.total_damage, 1500.0);
        assert_eq!(trash.misery.total_damage, 300.0);
    }

    #[tokio::test]
    async fn issues_two_plus_two_calls_per_fight() {
        let (orchestrator, client) = setup(ScriptedClient::new(&[(1, 10), (2, 20), (3, 30)]));
        orchestrator.build_report("abc123").await.expect("report");

        let calls = client.calls();
        assert_eq!(calls.len(), 3 + 2 * 3);
        let listings = calls
            .iter()
            .filter(|call| matches!(call, QueryRequest::FightListing { .. }))
            .count();
        assert_eq!(listings, 1);
        for fight_id in 1..=3 {
            let per_fight = calls
                .iter()
                .filter(|call| {
                    matches!(call, QueryRequest::FightTable { fight_id: id, .. } if *id == fight_id)
                })
                .count();
            assert_eq!(per_fight, 2);
        }
    }

    #[tokio::test]
    async fn report_without_kills_contains_only_trash() {
        let (orchestrator, _) = setup(ScriptedClient::new(&[]));
        let report = orchestrator.build_report("abc123").await.expect("report");
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].id, 0);
    }

    #[tokio::test]
    async fn single_failing_fight_call_fails_whole_report() {
        let client = ScriptedClient::new(&[(1, 10), (2, 20)]).failing_on(|request| {
            matches!(
                request,
                QueryRequest::FightTable { fight_id: 2, filter, .. } if filter.contains("33200")
            )
        });
        let (orchestrator, _) = setup(client);
        let err = orchestrator.build_report("abc123").await.expect_err("must fail");
        assert!(matches!(err, SpapiError::UpstreamStatus { status: 502, .. }));
    }

    #[tokio::test]
    async fn failing_trash_or_listing_call_fails_whole_report() {
        let trash = ScriptedClient::new(&[(1, 10)])
            .failing_on(|request| matches!(request, QueryRequest::TrashTable { .. }));
        let (orchestrator, _) = setup(trash);
        assert!(orchestrator.build_report("abc123").await.is_err());

        let listing = ScriptedClient::new(&[(1, 10)])
            .failing_on(|request| matches!(request, QueryRequest::FightListing { .. }));
        let (orchestrator, _) = setup(listing);
        assert!(orchestrator.build_report("abc123").await.is_err());
    }

    #[tokio::test]
    async fn blank_report_code_is_rejected_before_any_call() {
        let (orchestrator, client) = setup(ScriptedClient::new(&[(1, 10)]));
        let err = orchestrator.build_report("  ").await.expect_err("must fail");
        assert!(matches!(err, SpapiError::Validation(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn report_code_is_trimmed() {
        let (orchestrator, client) = setup(ScriptedClient::new(&[]));
        orchestrator.build_report(" abc123 ").await.expect("report");
        assert!(client.calls().iter().all(|call| call.report() == "abc123"));
    }

    #[tokio::test]
    async fn fan_out_preserves_input_order() {
        let values = fan_out(vec![30_u64, 1, 15], |delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, SpapiError>(delay * 2)
        })
        .await
        .expect("fan out");
        assert_eq!(values, vec![60, 2, 30]);
    }

    #[tokio::test]
    async fn fan_out_aborts_remaining_tasks_on_error() {
        let finished = Arc::new(AtomicUsize::new(0));
        let result = fan_out(0..4_u64, |index| {
            let finished = Arc::clone(&finished);
            async move {
                if index == 0 {
                    return Err(SpapiError::Internal("boom".to_string()));
                }
                tokio::time::sleep(Duration::from_secs(5)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(index)
            }
        })
        .await;

        assert!(matches!(result, Err(SpapiError::Internal(message)) if message == "boom"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fan_out_of_nothing_is_empty() {
        let values: Vec<u8> = fan_out(Vec::<u8>::new(), |value| async move {
            Ok::<_, SpapiError>(value)
        })
            .await
            .expect("fan out");
        assert!(values.is_empty());
    }
}
