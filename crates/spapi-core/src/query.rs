use serde::Serialize;
use serde_json::{Value, json};

// Far past the end of any real report so the whole log is covered.
const REPORT_END_TIME: u64 = 999_999_999;

const FIGHT_LISTING_QUERY: &str = r"
query getFights($reportID: String!) {
    reportData {
        report(code: $reportID) {
            fights(killType: Kills) {
                id
                encounterID
            }
        }
    }
}";

const TRASH_TABLE_QUERY: &str = r"
query getTrash($reportID: String!, $filter: String!, $endTime: Float!) {
    reportData {
        report(code: $reportID) {
            table(killType: Trash, dataType: DamageDone, endTime: $endTime, filterExpression: $filter)
        }
    }
}";

const FIGHT_TABLE_QUERY: &str = r"
query getBoss($reportID: String!, $fightID: Int!, $filter: String!, $endTime: Float!) {
    reportData {
        report(code: $reportID) {
            table(fightIDs: [$fightID], dataType: DamageDone, endTime: $endTime, filterExpression: $filter)
        }
    }
}";

/// One of the three parameterized upstream queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRequest {
    FightListing {
        report: String,
    },
    TrashTable {
        report: String,
        filter: String,
    },
    FightTable {
        report: String,
        fight_id: i64,
        filter: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlBody {
    pub query: &'static str,
    pub operation_name: &'static str,
    pub variables: Value,
}

impl QueryRequest {
    #[must_use]
    pub const fn operation_name(&self) -> &'static str {
        match self {
            Self::FightListing { .. } => "getFights",
            Self::TrashTable { .. } => "getTrash",
            Self::FightTable { .. } => "getBoss",
        }
    }

    #[must_use]
    pub fn report(&self) -> &str {
        match self {
            Self::FightListing { report }
            | Self::TrashTable { report, .. }
            | Self::FightTable { report, .. } => report,
        }
    }

    #[must_use]
    pub fn to_body(&self) -> GraphqlBody {
        let (query, variables) = match self {
            Self::FightListing { report } => (FIGHT_LISTING_QUERY, json!({ "reportID": report })),
            Self::TrashTable { report, filter } => (
                TRASH_TABLE_QUERY,
                json!({
                    "reportID": report,
                    "filter": filter,
                    "endTime": REPORT_END_TIME,
                }),
            ),
            Self::FightTable {
                report,
                fight_id,
                filter,
            } => (
                FIGHT_TABLE_QUERY,
                json!({
                    "reportID": report,
                    "fightID": fight_id,
                    "filter": filter,
                    "endTime": REPORT_END_TIME,
                }),
            ),
        };
        GraphqlBody {
            query,
            operation_name: self.operation_name(),
            variables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fight_table_body_carries_all_variables() {
        let request = QueryRequest::FightTable {
            report: "aBcD1234".to_string(),
            fight_id: 17,
            filter: "ability.id = 1".to_string(),
        };
        let body = serde_json::to_value(request.to_body()).expect("serialize");

        assert_eq!(body["operationName"], "getBoss");
        assert_eq!(body["variables"]["reportID"], "aBcD1234");
        assert_eq!(body["variables"]["fightID"], 17);
        assert_eq!(body["variables"]["filter"], "ability.id = 1");
        assert_eq!(body["variables"]["endTime"], 999_999_999);
        assert!(body["query"].as_str().expect("query").contains("fightIDs: [$fightID]"));
    }

    #[test]
    fn trash_and_listing_bodies_use_their_documents() {
        let trash = QueryRequest::TrashTable {
            report: "r".to_string(),
            filter: "f".to_string(),
        };
        assert!(trash.to_body().query.contains("killType: Trash"));
        assert_eq!(trash.report(), "r");

        let listing = QueryRequest::FightListing {
            report: "r".to_string(),
        };
        let body = listing.to_body();
        assert!(body.query.contains("fights(killType: Kills)"));
        assert_eq!(body.variables, json!({"reportID": "r"}));
    }
}
