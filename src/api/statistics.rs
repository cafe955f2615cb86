//! Statistics API endpoints.

use axum::extract::{Query, State};
use chrono::Utc;
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::stats::{self, DailyCount, Timeframe};
use crate::AppState;

/// Statistics query parameters.
#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    /// Reporting window; defaults to the eight-day week.
    #[serde(default = "default_timeframe")]
    pub timeframe: Timeframe,
}

fn default_timeframe() -> Timeframe {
    Timeframe::Week
}

/// GET /api/statistics - Per-day pass/fail counts over the selected
/// trailing window. `today` is rejected rather than returning an empty
/// series.
pub async fn get_statistics(
    State(state): State<AppState>,
    Query(params): Query<StatisticsQuery>,
) -> ApiResult<Vec<DailyCount>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let statistics = match state.repo.list_statistics().await {
        Ok(statistics) => statistics,
        Err(e) => return error(e, revision_id),
    };

    match stats::bucket_by(&statistics, params.timeframe, Utc::now()) {
        Ok(series) => success(series, revision_id),
        Err(e) => error(e, revision_id),
    }
}
