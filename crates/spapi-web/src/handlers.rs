use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use crate::WebState;
use crate::error::{invalid_link_response, report_error_response};

pub const GREETING: &str = "White shadow caster 白色阴影投射器 Improve dark damage 提高暗伤害 Mana fountain 法力喷泉 Dog staff priority 狗工作人员优先";

pub async fn index() -> &'static str {
    GREETING
}

/// Unsupported methods on known paths are treated as unknown routes.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub async fn report(
    State(state): State<WebState>,
    link: Result<Path<String>, PathRejection>,
) -> Response {
    let request_id = Uuid::new_v4();
    let Path(link) = match link {
        Ok(link) => link,
        Err(rejection) => return invalid_link_response(&rejection, request_id),
    };

    let span = info_span!("report", %request_id, report = %link);
    let outcome = state.reports.build_report(&link).instrument(span).await;
    match outcome {
        Ok(report) => {
            debug!(%request_id, entries = report.len(), "report served");
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(err) => report_error_response(&err, request_id),
    }
}
