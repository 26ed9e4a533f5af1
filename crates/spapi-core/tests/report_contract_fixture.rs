use std::sync::Arc;
use std::{fs, path::PathBuf};

use serde::Deserialize;
use serde_json::{Value, json};
use spapi_core::config::UpstreamConfig;
use spapi_core::fight::{assemble, fight_identities};
use spapi_core::metric::{MISERY_FILTER, WEAVING_FILTER};
use spapi_core::{GraphqlClient, MetricSet, ReportOrchestrator};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "fixture-token";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReportContractFixture {
    report_code: String,
    fight_listing: Value,
    trash: MetricTables,
    fights: std::collections::BTreeMap<String, MetricTables>,
    expected_report: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MetricTables {
    weaving: Value,
    misery: Value,
}

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("report_contract_fixture.json")
}

fn load_fixture() -> ReportContractFixture {
    let raw = fs::read_to_string(fixture_path()).expect("read report contract fixture");
    serde_json::from_str(&raw).expect("parse report contract fixture")
}

fn graphql_ok(data: &Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
}

async fn mount_fixture(server: &MockServer, fixture: &ReportContractFixture) {
    let report = fixture.report_code.as_str();

    Mock::given(method("POST"))
        .and(path("/api/v2/client"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_partial_json(json!({
            "operationName": "getFights",
            "variables": { "reportID": report }
        })))
        .respond_with(graphql_ok(&fixture.fight_listing))
        .expect(1)
        .mount(server)
        .await;

    for (filter, table) in [
        (WEAVING_FILTER, &fixture.trash.weaving),
        (MISERY_FILTER, &fixture.trash.misery),
    ] {
        Mock::given(method("POST"))
            .and(path("/api/v2/client"))
            .and(body_partial_json(json!({
                "operationName": "getTrash",
                "variables": { "reportID": report, "filter": filter }
            })))
            .respond_with(graphql_ok(table))
            .expect(1)
            .mount(server)
            .await;
    }

    for (fight_id, tables) in &fixture.fights {
        let fight_id: i64 = fight_id.parse().expect("numeric fight id");
        for (filter, table) in [
            (WEAVING_FILTER, &tables.weaving),
            (MISERY_FILTER, &tables.misery),
        ] {
            Mock::given(method("POST"))
                .and(path("/api/v2/client"))
                .and(body_partial_json(json!({
                    "operationName": "getBoss",
                    "variables": { "reportID": report, "fightID": fight_id, "filter": filter }
                })))
                .respond_with(graphql_ok(table))
                .expect(1)
                .mount(server)
                .await;
        }
    }
}

fn orchestrator_for(server: &MockServer) -> ReportOrchestrator {
    let client = GraphqlClient::new(&UpstreamConfig {
        api_url: format!("{}/api/v2/client", server.uri()),
        token: TOKEN.to_string(),
        timeout_ms: 5_000,
    })
    .expect("client");
    ReportOrchestrator::new(Arc::new(client), MetricSet::default())
}

#[test]
fn fixture_tables_assemble_to_expected_entries() {
    let fixture = load_fixture();

    let mut entries = Vec::new();
    for fight in fight_identities(&fixture.fight_listing).expect("fight listing") {
        let tables = fixture
            .fights
            .get(&fight.id.to_string())
            .expect("tables for listed fight");
        let result = assemble(&tables.weaving, &tables.misery, fight.encounter_id).expect("fight");
        entries.push(serde_json::to_value(&result).expect("serialize fight"));
    }
    let trash = assemble(&fixture.trash.weaving, &fixture.trash.misery, 0).expect("trash");
    entries.push(serde_json::to_value(&trash).expect("serialize trash"));

    assert_eq!(entries, fixture.expected_report);
}

#[test]
fn damage_done_preserves_upstream_entry_order() {
    let fixture = load_fixture();
    let trash = assemble(&fixture.trash.weaving, &fixture.trash.misery, 0).expect("trash");
    let encoded = serde_json::to_string(&trash.weaving).expect("serialize");
    assert_eq!(
        encoded,
        r#"{"totalDamage":281853.5,"damageDone":{"Velanir":153422,"Shadowpaw":8120,"Morthil":120311.5}}"#
    );
}

#[tokio::test]
async fn report_over_http_matches_contract_fixture() {
    let fixture = load_fixture();
    let server = MockServer::start().await;
    mount_fixture(&server, &fixture).await;

    let report = orchestrator_for(&server)
        .build_report(&fixture.report_code)
        .await
        .expect("build report");

    let encoded = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(encoded, Value::Array(fixture.expected_report.clone()));
}

#[tokio::test]
async fn upstream_server_error_fails_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = orchestrator_for(&server)
        .build_report("Xb7QmKc2TzDa9fRw")
        .await
        .expect_err("must fail");
    assert!(err.is_upstream(), "unexpected error: {err}");
}
