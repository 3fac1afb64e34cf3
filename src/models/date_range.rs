use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which timestamp a time filter applies to. The two dimensions are
/// mutually exclusive on the query side, never combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DateField {
    #[default]
    TransferDate,
    ReceiptDate,
}

/// Half-open interval [start, end) in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Fixed preset-to-range table. The lunar variants exist on the wire but do
/// not resolve to a range; a filter using one is treated as unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatePreset {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    Last7Days,
    ThisMonth,
    LastMonth,
    Last30Days,
    ThisYear,
    LastYear,
    LunarThisMonth,
    LunarLastMonth,
    LunarThisYear,
    LunarLastYear,
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).unwrap().and_utc()
}

fn month_start(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

fn next_month_start(year: i32, month: u32) -> NaiveDate {
    if month == 12 {
        month_start(year + 1, 1)
    } else {
        month_start(year, month + 1)
    }
}

fn prev_month_start(year: i32, month: u32) -> NaiveDate {
    if month == 1 {
        month_start(year - 1, 12)
    } else {
        month_start(year, month - 1)
    }
}

impl DatePreset {
    /// Resolves the preset against a reference instant. Weeks start Monday.
    /// Rolling presets (last 7/30 days) include the reference day.
    pub fn resolve(self, now: DateTime<Utc>) -> Option<DateRange> {
        let today = now.date_naive();
        let range = |start: NaiveDate, end: NaiveDate| DateRange {
            start: day_start(start),
            end: day_start(end),
        };

        match self {
            DatePreset::Today => Some(range(today, today + Duration::days(1))),
            DatePreset::Yesterday => Some(range(today - Duration::days(1), today)),
            DatePreset::ThisWeek => {
                let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                Some(range(monday, monday + Duration::days(7)))
            }
            DatePreset::LastWeek => {
                let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                Some(range(monday - Duration::days(7), monday))
            }
            DatePreset::Last7Days => {
                Some(range(today - Duration::days(6), today + Duration::days(1)))
            }
            DatePreset::ThisMonth => {
                let first = month_start(today.year(), today.month());
                Some(range(first, next_month_start(today.year(), today.month())))
            }
            DatePreset::LastMonth => {
                let first = month_start(today.year(), today.month());
                Some(range(prev_month_start(today.year(), today.month()), first))
            }
            DatePreset::Last30Days => {
                Some(range(today - Duration::days(29), today + Duration::days(1)))
            }
            DatePreset::ThisYear => {
                let first = month_start(today.year(), 1);
                Some(range(first, month_start(today.year() + 1, 1)))
            }
            DatePreset::LastYear => Some(range(
                month_start(today.year() - 1, 1),
                month_start(today.year(), 1),
            )),
            DatePreset::LunarThisMonth
            | DatePreset::LunarLastMonth
            | DatePreset::LunarThisYear
            | DatePreset::LunarLastYear => {
                debug!(preset = ?self, "lunar preset requested; no range computed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Wednesday 2025-11-12, mid-afternoon.
    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 12, 15, 30, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn today_covers_the_whole_day() {
        let r = DatePreset::Today.resolve(reference()).unwrap();
        assert_eq!(r.start, date(2025, 11, 12));
        assert_eq!(r.end, date(2025, 11, 13));
        assert!(r.contains(reference()));
    }

    #[test]
    fn yesterday_ends_where_today_starts() {
        let r = DatePreset::Yesterday.resolve(reference()).unwrap();
        assert_eq!(r.start, date(2025, 11, 11));
        assert_eq!(r.end, date(2025, 11, 12));
        assert!(!r.contains(reference()));
    }

    #[test]
    fn weeks_start_on_monday() {
        let this_week = DatePreset::ThisWeek.resolve(reference()).unwrap();
        assert_eq!(this_week.start, date(2025, 11, 10));
        assert_eq!(this_week.end, date(2025, 11, 17));

        let last_week = DatePreset::LastWeek.resolve(reference()).unwrap();
        assert_eq!(last_week.start, date(2025, 11, 3));
        assert_eq!(last_week.end, date(2025, 11, 10));
    }

    #[test]
    fn rolling_windows_include_today() {
        let r = DatePreset::Last7Days.resolve(reference()).unwrap();
        assert_eq!(r.start, date(2025, 11, 6));
        assert_eq!(r.end, date(2025, 11, 13));

        let r = DatePreset::Last30Days.resolve(reference()).unwrap();
        assert_eq!(r.start, date(2025, 10, 14));
        assert_eq!(r.end, date(2025, 11, 13));
    }

    #[test]
    fn month_presets_handle_year_boundaries() {
        let january = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();

        let this_month = DatePreset::ThisMonth.resolve(january).unwrap();
        assert_eq!(this_month.start, date(2026, 1, 1));
        assert_eq!(this_month.end, date(2026, 2, 1));

        let last_month = DatePreset::LastMonth.resolve(january).unwrap();
        assert_eq!(last_month.start, date(2025, 12, 1));
        assert_eq!(last_month.end, date(2026, 1, 1));
    }

    #[test]
    fn year_presets() {
        let this_year = DatePreset::ThisYear.resolve(reference()).unwrap();
        assert_eq!(this_year.start, date(2025, 1, 1));
        assert_eq!(this_year.end, date(2026, 1, 1));

        let last_year = DatePreset::LastYear.resolve(reference()).unwrap();
        assert_eq!(last_year.start, date(2024, 1, 1));
        assert_eq!(last_year.end, date(2025, 1, 1));
    }

    #[test]
    fn lunar_presets_resolve_to_nothing() {
        for preset in [
            DatePreset::LunarThisMonth,
            DatePreset::LunarLastMonth,
            DatePreset::LunarThisYear,
            DatePreset::LunarLastYear,
        ] {
            assert!(preset.resolve(reference()).is_none());
        }
    }

    #[test]
    fn presets_deserialize_from_camel_case() {
        let preset: DatePreset = serde_json::from_str("\"last7Days\"").unwrap();
        assert_eq!(preset, DatePreset::Last7Days);
        let field: DateField = serde_json::from_str("\"receiptDate\"").unwrap();
        assert_eq!(field, DateField::ReceiptDate);
    }
}
