use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{Months, NaiveDate, Utc};

use crate::{
    auth::require_admin,
    error::{AppError, AppResult},
    models::{Booking, Car, DateRange},
    schemas::{parse_date, AnalyticsQuery},
    services::{
        analytics::{build_report, Report},
        periods::first_of_month,
        report_cache::ReportKey,
    },
    state::AppState,
};

/// Months covered by the dashboard when no window is given, counting the
/// current one.
const DEFAULT_WINDOW_MONTHS: u32 = 6;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/reports/analytics", axum::routing::get(analytics_report))
}

async fn analytics_report(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Arc<Report>>> {
    require_admin(&state, &headers).await?;
    let range = resolve_range(&query, Utc::now().date_naive())?;

    let key = ReportKey {
        range,
        basis: state.config.revenue_basis,
        data_version: state.store.data_version(),
    };
    if let Some(cached) = state.report_cache.get(&key).await {
        tracing::debug!(from = %range.from, to = %range.to, "Analytics report served from cache");
        return Ok(Json(cached));
    }

    let bookings = state.store.list::<Booking>().await?;
    let cars = state.store.list::<Car>().await?;
    let report = build_report(&bookings, &cars, range, key.basis);
    Ok(Json(state.report_cache.insert(key, report).await))
}

fn resolve_range(query: &AnalyticsQuery, today: NaiveDate) -> AppResult<DateRange> {
    let to = match non_empty(query.to.as_deref()) {
        Some(value) => parse_date(value)?,
        None => today,
    };
    let from = match non_empty(query.from.as_deref()) {
        Some(value) => parse_date(value)?,
        None => first_of_month(to)
            .checked_sub_months(Months::new(DEFAULT_WINDOW_MONTHS - 1))
            .unwrap_or(to),
    };
    if to < from {
        return Err(AppError::BadRequest(
            "'to' must not be before 'from'.".to_string(),
        ));
    }
    Ok(DateRange::new(from, to))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Query, State},
        http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    };
    use chrono::NaiveDate;

    use super::{analytics_report, resolve_range};
    use crate::error::AppError;
    use crate::schemas::AnalyticsQuery;
    use crate::state::AppState;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn query(from: Option<&str>, to: Option<&str>) -> AnalyticsQuery {
        AnalyticsQuery {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        }
    }

    #[test]
    fn default_window_is_six_calendar_months() {
        let range = resolve_range(&query(None, None), date("2024-06-18")).unwrap();
        assert_eq!(range.from, date("2024-01-01"));
        assert_eq!(range.to, date("2024-06-18"));

        let range = resolve_range(&query(None, Some("2024-02-10")), date("2024-06-18")).unwrap();
        assert_eq!(range.from, date("2023-09-01"));
    }

    #[test]
    fn explicit_window_is_validated() {
        let range = resolve_range(
            &query(Some("2024-03-01"), Some("2024-03-31")),
            date("2024-06-18"),
        )
        .unwrap();
        assert_eq!(range.from, date("2024-03-01"));

        assert!(matches!(
            resolve_range(&query(Some("2024-04-01"), Some("2024-03-01")), date("2024-06-18")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn report_requires_admin_session() {
        let state = AppState::for_tests();
        let result = analytics_report(
            State(state.clone()),
            Query(query(None, None)),
            HeaderMap::new(),
        )
        .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn cached_report_reused_until_data_changes() {
        let state = AppState::for_tests();
        let session = state.sessions.issue("admin@autoshop.local").await.unwrap();
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", session.access_token);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&bearer).unwrap());

        let window = || Query(query(Some("2024-01-01"), Some("2024-03-31")));
        let first = analytics_report(State(state.clone()), window(), headers.clone())
            .await
            .unwrap()
            .0;
        let second = analytics_report(State(state.clone()), window(), headers.clone())
            .await
            .unwrap()
            .0;
        assert!(std::sync::Arc::ptr_eq(&first, &second));

        state.store.seed_default_locations().await.unwrap();
        let third = analytics_report(State(state), window(), headers)
            .await
            .unwrap()
            .0;
        assert!(!std::sync::Arc::ptr_eq(&first, &third));
    }
}
