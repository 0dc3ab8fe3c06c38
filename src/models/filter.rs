use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const UPCOMING_BUFFER_SECONDS: i64 = 3600;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    Today,
    Upcoming,
    All,
    Custom,
}

impl Schedule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Schedule::Today => "today",
            Schedule::Upcoming => "upcoming",
            Schedule::All => "all",
            Schedule::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Result<Option<Self>, FilterError> {
        match s.trim() {
            "" => Ok(None),
            "today" => Ok(Some(Schedule::Today)),
            "upcoming" => Ok(Some(Schedule::Upcoming)),
            "all" => Ok(Some(Schedule::All)),
            "custom" => Ok(Some(Schedule::Custom)),
            other => Err(FilterError::InvalidFilter(format!(
                "unknown schedule: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterRequest {
    #[serde(rename = "start-date", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(rename = "end-date", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clear: bool,
}

impl FilterRequest {
    pub fn overlay(mut self, later: &FilterRequest) -> Self {
        if let Some(start) = non_empty(later.start_date.as_deref()) {
            self.start_date = Some(start.to_string());
        }
        if let Some(end) = non_empty(later.end_date.as_deref()) {
            self.end_date = Some(end.to_string());
        }
        if let Some(schedule) = non_empty(later.schedule.as_deref()) {
            self.schedule = Some(schedule.to_string());
        }
        self.clear |= later.clear;
        self
    }
}

// Half-open window on `created_at`: `from <= created_at < until`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatePredicate {
    pub from: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
}

impl DatePredicate {
    pub fn matches(&self, at: &NaiveDateTime) -> bool {
        self.from.map_or(true, |from| *at >= from) && self.until.map_or(true, |until| *at < until)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateRangeFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub schedule: Option<Schedule>,
}

impl DateRangeFilter {
    pub fn parse(
        raw_start: Option<&str>,
        raw_end: Option<&str>,
        raw_schedule: Option<&str>,
        clear: bool,
    ) -> Result<Self, FilterError> {
        let mut schedule = match raw_schedule {
            Some(raw) => Schedule::parse(raw)?,
            None => None,
        };

        let (start_date, end_date) = if clear {
            (None, None)
        } else {
            (parse_date(raw_start)?, parse_date(raw_end)?)
        };

        if start_date.is_some() || end_date.is_some() {
            schedule = Some(Schedule::Custom);
        } else if schedule == Some(Schedule::Custom) {
            schedule = None;
        }

        Ok(Self {
            start_date,
            end_date,
            schedule,
        })
    }

    pub fn from_request(req: &FilterRequest) -> Result<Self, FilterError> {
        Self::parse(
            req.start_date.as_deref(),
            req.end_date.as_deref(),
            req.schedule.as_deref(),
            req.clear,
        )
    }

    pub fn from_request_or_default(req: &FilterRequest) -> (Self, Option<FilterError>) {
        match Self::from_request(req) {
            Ok(filter) => (filter, None),
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed date filter");
                (Self::default(), Some(e))
            }
        }
    }

    pub fn effective_schedule(&self) -> Schedule {
        self.schedule.unwrap_or(Schedule::Upcoming)
    }

    pub fn has_date_bounds(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    pub fn to_predicate(&self) -> DatePredicate {
        self.to_predicate_at(Utc::now().naive_utc())
    }

    pub fn to_predicate_at(&self, now: NaiveDateTime) -> DatePredicate {
        if self.has_date_bounds() {
            return DatePredicate {
                from: self.start_date.map(start_of_day),
                until: self.end_date.map(|end| start_of_day(end) + Duration::days(1)),
            };
        }

        match self.effective_schedule() {
            Schedule::Today => {
                let midnight = start_of_day(now.date());
                DatePredicate {
                    from: Some(midnight),
                    until: Some(midnight + Duration::days(1)),
                }
            }
            Schedule::All => DatePredicate::default(),
            Schedule::Upcoming | Schedule::Custom => DatePredicate {
                from: Some(now - Duration::seconds(UPCOMING_BUFFER_SECONDS)),
                until: None,
            },
        }
    }

    pub fn to_request(&self) -> FilterRequest {
        FilterRequest {
            start_date: self.start_date.map(|d| d.format(DATE_FORMAT).to_string()),
            end_date: self.end_date.map(|d| d.format(DATE_FORMAT).to_string()),
            schedule: self.schedule.map(|s| s.as_str().to_string()),
            clear: false,
        }
    }

    // `2014-12-02*` when open-ended, `2014-12-02—2014-12-09` when both are set.
    pub fn current_range(&self) -> String {
        let bound = |d: Option<NaiveDate>| {
            d.map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| "*".to_string())
        };
        let separator = if self.start_date.is_some() && self.end_date.is_some() {
            "\u{2014}"
        } else {
            ""
        };
        format!("{}{separator}{}", bound(self.start_date), bound(self.end_date))
    }

    pub fn notification(&self) -> Option<String> {
        match self.effective_schedule() {
            Schedule::Custom => Some(format!(
                "Only bookings from {} are being shown.",
                self.current_range()
            )),
            Schedule::Today => Some("Only today's bookings are being shown.".to_string()),
            Schedule::Upcoming => Some("Only upcoming bookings are being shown.".to_string()),
            Schedule::All => None,
        }
    }
}

impl fmt::Display for DateRangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.effective_schedule() {
            Schedule::Custom => f.write_str(&self.current_range()),
            other => f.write_str(other.as_str()),
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, FilterError> {
    match non_empty(raw) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| FilterError::InvalidFilter(format!("malformed date: {s}"))),
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_empty_input_defaults_to_upcoming() {
        let filter = DateRangeFilter::parse(None, None, None, false).unwrap();
        assert_eq!(filter.schedule, None);
        assert_eq!(filter.effective_schedule(), Schedule::Upcoming);

        let now = dt("2025-06-16 12:00:00");
        let predicate = filter.to_predicate_at(now);
        assert_eq!(predicate.from, Some(dt("2025-06-16 11:00:00")));
        assert_eq!(predicate.until, None);
    }

    #[test]
    fn test_date_bounds_force_custom_schedule() {
        let filter =
            DateRangeFilter::parse(Some("2025-06-01"), None, Some("today"), false).unwrap();
        assert_eq!(filter.schedule, Some(Schedule::Custom));
        assert_eq!(filter.start_date, Some(date("2025-06-01")));
        assert_eq!(filter.end_date, None);
    }

    #[test]
    fn test_custom_without_dates_falls_back_to_upcoming() {
        let filter = DateRangeFilter::parse(None, None, Some("custom"), false).unwrap();
        assert_eq!(filter.schedule, None);
        assert_eq!(filter.effective_schedule(), Schedule::Upcoming);
    }

    #[test]
    fn test_clear_flag_drops_dates() {
        let filter =
            DateRangeFilter::parse(Some("2025-06-01"), Some("2025-06-30"), None, true).unwrap();
        assert_eq!(filter.start_date, None);
        assert_eq!(filter.end_date, None);
        assert_eq!(filter.effective_schedule(), Schedule::Upcoming);
    }

    #[test]
    fn test_malformed_date_is_rejected() {
        let err = DateRangeFilter::parse(Some("06/01/2025"), None, None, false).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFilter(_)));

        let err = DateRangeFilter::parse(None, None, Some("yesterday"), false).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFilter(_)));
    }

    #[test]
    fn test_malformed_request_degrades_to_default() {
        let req = FilterRequest {
            start_date: Some("not-a-date".to_string()),
            ..Default::default()
        };
        let (filter, err) = DateRangeFilter::from_request_or_default(&req);
        assert_eq!(filter, DateRangeFilter::default());
        assert!(err.is_some());
    }

    #[test]
    fn test_parse_is_idempotent_over_serialized_form() {
        let cases = [
            (Some("2025-06-01"), Some("2025-06-30"), None),
            (Some("2025-06-01"), None, None),
            (None, Some("2025-06-30"), Some("all")),
            (None, None, Some("today")),
            (None, None, Some("all")),
            (None, None, None),
        ];
        for (start, end, schedule) in cases {
            let filter = DateRangeFilter::parse(start, end, schedule, false).unwrap();
            let again = DateRangeFilter::from_request(&filter.to_request()).unwrap();
            assert_eq!(filter, again);
        }
    }

    #[test]
    fn test_end_date_is_inclusive_of_whole_day() {
        let filter =
            DateRangeFilter::parse(Some("2025-06-01"), Some("2025-06-02"), None, false).unwrap();
        let predicate = filter.to_predicate_at(dt("2025-07-01 00:00:00"));
        assert!(predicate.matches(&dt("2025-06-01 00:00:00")));
        assert!(predicate.matches(&dt("2025-06-02 23:59:59")));
        assert!(!predicate.matches(&dt("2025-06-03 00:00:00")));
        assert!(!predicate.matches(&dt("2025-05-31 23:59:59")));
    }

    #[test]
    fn test_today_window() {
        let filter = DateRangeFilter::parse(None, None, Some("today"), false).unwrap();
        let predicate = filter.to_predicate_at(dt("2025-06-16 15:30:00"));
        assert!(predicate.matches(&dt("2025-06-16 00:00:00")));
        assert!(predicate.matches(&dt("2025-06-16 08:00:00")));
        assert!(!predicate.matches(&dt("2025-06-15 23:59:59")));
        assert!(!predicate.matches(&dt("2025-06-17 00:00:00")));
    }

    #[test]
    fn test_all_has_no_bounds() {
        let filter = DateRangeFilter::parse(None, None, Some("all"), false).unwrap();
        assert_eq!(
            filter.to_predicate_at(dt("2025-06-16 15:30:00")),
            DatePredicate::default()
        );
    }

    #[test]
    fn test_body_dates_override_query_dates() {
        let query = FilterRequest {
            start_date: Some("2025-01-01".to_string()),
            end_date: Some("2025-01-31".to_string()),
            ..Default::default()
        };
        let body = FilterRequest {
            start_date: Some("2025-02-01".to_string()),
            end_date: Some(String::new()),
            ..Default::default()
        };
        let merged = query.overlay(&body);
        assert_eq!(merged.start_date.as_deref(), Some("2025-02-01"));
        assert_eq!(merged.end_date.as_deref(), Some("2025-01-31"));
    }

    #[test]
    fn test_current_range_and_notification() {
        let filter = DateRangeFilter::parse(Some("2014-12-02"), None, None, false).unwrap();
        assert_eq!(filter.current_range(), "2014-12-02*");
        assert_eq!(
            filter.notification().as_deref(),
            Some("Only bookings from 2014-12-02* are being shown.")
        );

        let until = DateRangeFilter::parse(None, Some("2025-04-03"), None, false).unwrap();
        assert_eq!(until.current_range(), "*2025-04-03");

        let both =
            DateRangeFilter::parse(Some("2025-04-01"), Some("2025-04-03"), None, false).unwrap();
        assert_eq!(both.current_range(), "2025-04-01\u{2014}2025-04-03");

        let all = DateRangeFilter::parse(None, None, Some("all"), false).unwrap();
        assert_eq!(all.notification(), None);
    }
}
