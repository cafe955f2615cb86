//! Statistics aggregator.
//!
//! Buckets the append-only pass/fail event log into per-day, per-outcome
//! count series over a trailing window. The week window is eight days
//! back, not seven.

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Statistic;

/// Reporting window selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Today,
    Week,
    Month,
    Year,
}

/// Count of one outcome on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub is_passed: bool,
    pub count: i64,
}

/// Group statistics within the timeframe's trailing window into one
/// count per day per outcome: the passed series first, then the failed
/// series, each in chronological order.
///
/// `today` is not a supported window and reports an error instead of an
/// empty series.
pub fn bucket_by(
    statistics: &[Statistic],
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> Result<Vec<DailyCount>, AppError> {
    let window_start = window_start(timeframe, now)?;

    let mut windowed: Vec<&Statistic> = statistics
        .iter()
        .filter(|s| s.action_date >= window_start)
        .collect();
    windowed.sort_by_key(|s| s.action_date);

    let mut series = daily_counts(&windowed, true);
    series.extend(daily_counts(&windowed, false));
    Ok(series)
}

fn window_start(timeframe: Timeframe, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    match timeframe {
        Timeframe::Today => Err(AppError::Validation(
            "Timeframe 'today' is not supported".to_string(),
        )),
        // Eight days, intentionally one more than a calendar week.
        Timeframe::Week => Ok(now - Duration::days(8)),
        Timeframe::Month => Ok(now
            .checked_sub_months(Months::new(1))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)),
        Timeframe::Year => Ok(now
            .checked_sub_months(Months::new(12))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)),
    }
}

fn daily_counts(statistics: &[&Statistic], is_passed: bool) -> Vec<DailyCount> {
    let mut series: Vec<DailyCount> = Vec::new();
    for statistic in statistics.iter().filter(|s| s.is_passed == is_passed) {
        let day = statistic.action_date.date_naive();
        match series.iter_mut().find(|entry| entry.date == day) {
            Some(entry) => entry.count += 1,
            None => series.push(DailyCount {
                date: day,
                is_passed,
                count: 1,
            }),
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn statistic(days_ago: i64, hour: u32, is_passed: bool, now: DateTime<Utc>) -> Statistic {
        Statistic {
            id: format!("s-{}-{}-{}", days_ago, hour, is_passed),
            question_id: "q-1".to_string(),
            is_passed,
            action_date: now - Duration::days(days_ago) + Duration::hours(hour as i64),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_today_timeframe_is_an_error() {
        let result = bucket_by(&[], Timeframe::Today, now());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_week_window_includes_eight_days_back() {
        let stats = vec![
            statistic(7, 1, true, now()),
            statistic(8, 1, true, now()),
            statistic(9, 1, true, now()),
        ];
        let series = bucket_by(&stats, Timeframe::Week, now()).unwrap();
        let total: i64 = series.iter().map(|d| d.count).sum();
        // Nine-days-ago falls outside the window, eight-days-ago does not.
        assert_eq!(total, 2);
    }

    #[test]
    fn test_same_day_events_are_counted_together() {
        let stats = vec![
            statistic(1, 1, true, now()),
            statistic(1, 5, true, now()),
            statistic(1, 9, true, now()),
            statistic(1, 3, false, now()),
        ];
        let series = bucket_by(&stats, Timeframe::Week, now()).unwrap();

        assert_eq!(series.len(), 2);
        assert!(series[0].is_passed);
        assert_eq!(series[0].count, 3);
        assert!(!series[1].is_passed);
        assert_eq!(series[1].count, 1);
        assert_eq!(series[0].date, series[1].date);
    }

    #[test]
    fn test_passed_series_comes_before_failed_series() {
        let stats = vec![
            statistic(2, 1, false, now()),
            statistic(1, 1, true, now()),
        ];
        let series = bucket_by(&stats, Timeframe::Week, now()).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series[0].is_passed);
        assert!(!series[1].is_passed);
    }

    #[test]
    fn test_each_series_is_chronological() {
        let stats = vec![
            statistic(1, 1, true, now()),
            statistic(3, 1, true, now()),
            statistic(2, 1, true, now()),
        ];
        let series = bucket_by(&stats, Timeframe::Week, now()).unwrap();
        let dates: Vec<NaiveDate> = series.iter().map(|d| d.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn test_month_and_year_windows() {
        let stats = vec![
            statistic(20, 1, true, now()),
            statistic(40, 1, true, now()),
            statistic(400, 1, true, now()),
        ];

        let month = bucket_by(&stats, Timeframe::Month, now()).unwrap();
        assert_eq!(month.iter().map(|d| d.count).sum::<i64>(), 1);

        let year = bucket_by(&stats, Timeframe::Year, now()).unwrap();
        assert_eq!(year.iter().map(|d| d.count).sum::<i64>(), 2);
    }

    #[test]
    fn test_empty_log_produces_empty_series() {
        let series = bucket_by(&[], Timeframe::Year, now()).unwrap();
        assert!(series.is_empty());
    }
}
