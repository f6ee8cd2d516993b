//! Time bucketing for the report x-axis.
//!
//! A [`TimeBucketPlan`] is an ordered, contiguous list of calendar labels (one
//! per day or one per month) built once per computation. Records are assigned
//! to a bucket by formatting their timestamp with the plan's label format and
//! looking the string up, so two instants land in the same bucket exactly
//! when they print the same label.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::BucketSettings;
use crate::models::Locale;

/// Translation key of the x-axis label for day buckets.
pub const X_LABEL_DAYS: &str = "__xLabelDays";
/// Translation key of the x-axis label for month buckets.
pub const X_LABEL_MONTHS: &str = "__xLabelMonths";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Month,
}

/// Inclusive calendar range of the records a plan is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl DateRange {
    pub fn new(first: NaiveDate, last: NaiveDate) -> Self {
        if first <= last {
            Self { first, last }
        } else {
            Self {
                first: last,
                last: first,
            }
        }
    }

    /// Smallest range covering every timestamp, `None` for no timestamps.
    pub fn covering<I>(stamps: I) -> Option<Self>
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        stamps.into_iter().fold(None, |range, at| {
            let day = at.date();
            Some(match range {
                None => DateRange::new(day, day),
                Some(r) => DateRange::new(r.first.min(day), r.last.max(day)),
            })
        })
    }

    /// Union of two optional ranges.
    pub fn union(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(DateRange::new(a.first.min(b.first), a.last.max(b.last))),
            (a, None) => a,
            (None, b) => b,
        }
    }

    fn span_days(&self) -> i64 {
        self.last.signed_duration_since(self.first).num_days()
    }
}

/// Ordered label axis for one report computation.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBucketPlan {
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
    label_format: &'static str,
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl TimeBucketPlan {
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn label_format(&self) -> &'static str {
        self.label_format
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Translation key for the x-axis title.
    pub fn x_axis_label(&self) -> &'static str {
        match self.granularity {
            Granularity::Day => X_LABEL_DAYS,
            Granularity::Month => X_LABEL_MONTHS,
        }
    }

    /// Label a timestamp would carry on this axis.
    pub fn label_for(&self, at: NaiveDateTime) -> String {
        at.format(self.label_format).to_string()
    }

    /// Bucket index of a timestamp, `None` when it falls outside the axis.
    pub fn bucket_of(&self, at: NaiveDateTime) -> Option<usize> {
        self.index.get(&self.label_for(at)).copied()
    }

    /// Number of timestamps per bucket.
    pub fn count<I>(&self, stamps: I) -> Vec<u64>
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        let mut counts = vec![0u64; self.labels.len()];
        for at in stamps {
            if let Some(i) = self.bucket_of(at) {
                counts[i] += 1;
            }
        }
        counts
    }

    /// Items grouped per bucket, keeping their input order.
    pub fn group<'a, T, F>(&self, items: &'a [T], at: F) -> Vec<Vec<&'a T>>
    where
        F: Fn(&T) -> NaiveDateTime,
    {
        let mut groups: Vec<Vec<&'a T>> = vec![Vec::new(); self.labels.len()];
        for item in items {
            if let Some(i) = self.bucket_of(at(item)) {
                groups[i].push(item);
            }
        }
        groups
    }
}

/// Builds [`TimeBucketPlan`]s.
#[derive(Debug, Clone)]
pub struct TimeBucketPlanner {
    day_interval: i64,
    month_threshold_days: i64,
    locale: Locale,
}

impl TimeBucketPlanner {
    pub fn new(settings: &BucketSettings, locale: Locale) -> Self {
        Self {
            day_interval: settings.default_day_interval.max(1),
            month_threshold_days: settings.month_threshold_days,
            locale,
        }
    }

    /// Build the axis for `range` (or the trailing window when there is no
    /// data) relative to `today`.
    pub fn plan(&self, range: Option<DateRange>, today: NaiveDate) -> TimeBucketPlan {
        let window_start = today - Duration::days(self.day_interval - 1);
        let raw = range.unwrap_or(DateRange::new(window_start, today));
        let raw_span = raw.span_days();

        let (mut start, mut end) = (raw.first, raw.last);
        if raw_span < self.day_interval - 1 {
            if raw.first >= window_start && raw.last <= today {
                start = window_start;
                end = today;
            } else {
                // Widen one day at a time, start first: 04-13 becomes 04-10..04-16.
                let mut step = 0;
                while end.signed_duration_since(start).num_days() < self.day_interval - 1 {
                    if step % 2 == 0 {
                        start -= Duration::days(1);
                    } else {
                        end += Duration::days(1);
                    }
                    step += 1;
                }
            }
        }

        let granularity = if raw_span > self.month_threshold_days {
            Granularity::Month
        } else {
            Granularity::Day
        };

        let label_format = match (granularity, self.locale) {
            (Granularity::Month, _) => "%b/%Y",
            (Granularity::Day, Locale::Fr) => "%d/%m",
            (Granularity::Day, Locale::En) => "%m/%d",
        };

        let labels = match granularity {
            Granularity::Day => day_labels(start, end, label_format),
            Granularity::Month => month_labels(start, end, label_format),
        };
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();

        TimeBucketPlan {
            start,
            end,
            granularity,
            label_format,
            labels,
            index,
        }
    }
}

fn day_labels(start: NaiveDate, end: NaiveDate, format: &str) -> Vec<String> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| day.format(format).to_string())
        .collect()
}

fn month_labels(start: NaiveDate, end: NaiveDate, format: &str) -> Vec<String> {
    let last = first_of_month(end);
    let mut cursor = first_of_month(start);
    let mut labels = Vec::new();
    while cursor <= last {
        labels.push(cursor.format(format).to_string());
        cursor = first_of_month(cursor + Duration::days(32));
    }
    labels
}

fn first_of_month(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.day0()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn planner(locale: Locale) -> TimeBucketPlanner {
        TimeBucketPlanner::new(&BucketSettings::default(), locale)
    }

    #[test]
    fn test_no_data_uses_trailing_window() {
        let today = date(2024, 3, 10);
        let plan = planner(Locale::En).plan(None, today);
        assert_eq!(plan.start(), date(2024, 3, 4));
        assert_eq!(plan.end(), today);
        assert_eq!(plan.len(), 7);
        assert_eq!(plan.labels()[0], "03/04");
        assert_eq!(plan.labels()[6], "03/10");
        assert_eq!(plan.x_axis_label(), X_LABEL_DAYS);
    }

    #[test]
    fn test_single_old_day_is_padded_around_it() {
        let day = date(2020, 4, 13);
        let plan = planner(Locale::En).plan(Some(DateRange::new(day, day)), date(2024, 1, 1));
        assert_eq!(plan.start(), date(2020, 4, 10));
        assert_eq!(plan.end(), date(2020, 4, 16));
        assert_eq!(plan.len(), 7);
    }

    #[test]
    fn test_recent_range_snaps_to_window() {
        let today = date(2024, 3, 10);
        let range = DateRange::new(date(2024, 3, 8), date(2024, 3, 9));
        let plan = planner(Locale::En).plan(Some(range), today);
        assert_eq!(plan.start(), date(2024, 3, 4));
        assert_eq!(plan.end(), today);
    }

    #[test]
    fn test_french_locale_swaps_day_and_month() {
        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 20));
        let plan = planner(Locale::Fr).plan(Some(range), date(2024, 6, 1));
        assert_eq!(plan.labels()[0], "01/03");
        assert_eq!(plan.labels().last().unwrap(), "20/03");
    }

    #[test]
    fn test_month_labels() {
        let range = DateRange::new(date(2023, 11, 30), date(2024, 2, 2));
        let plan = planner(Locale::Fr).plan(Some(range), date(2024, 6, 1));
        assert_eq!(plan.granularity(), Granularity::Month);
        assert_eq!(plan.labels(), &["Nov/2023", "Dec/2023", "Jan/2024", "Feb/2024"]);
        assert_eq!(plan.x_axis_label(), X_LABEL_MONTHS);
    }

    #[test]
    fn test_exactly_forty_days_stays_daily() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 2, 10));
        let plan = planner(Locale::En).plan(Some(range), date(2024, 6, 1));
        assert_eq!(plan.granularity(), Granularity::Day);
        assert_eq!(plan.len(), 41);
    }

    #[test]
    fn test_count_and_group_by_label() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 7));
        let plan = planner(Locale::En).plan(Some(range), date(2024, 6, 1));
        let stamps = vec![
            date(2024, 1, 1).and_hms_opt(9, 0, 0).unwrap(),
            date(2024, 1, 1).and_hms_opt(23, 59, 0).unwrap(),
            date(2024, 1, 3).and_hms_opt(0, 0, 0).unwrap(),
            date(2023, 1, 3).and_hms_opt(0, 0, 0).unwrap(),
        ];
        // Day labels carry no year, so 2023-01-03 shares the 01/03 bucket.
        let counts = plan.count(stamps.iter().copied());
        assert_eq!(counts, vec![2, 0, 2, 0, 0, 0, 0]);

        let groups = plan.group(&stamps, |s| *s);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[2].len(), 2);
    }

    #[test]
    fn test_date_range_covering() {
        let stamps = vec![
            date(2024, 1, 5).and_hms_opt(1, 0, 0).unwrap(),
            date(2024, 1, 2).and_hms_opt(1, 0, 0).unwrap(),
        ];
        let range = DateRange::covering(stamps).unwrap();
        assert_eq!(range.first, date(2024, 1, 2));
        assert_eq!(range.last, date(2024, 1, 5));
        assert!(DateRange::covering(Vec::new()).is_none());
    }

    fn base() -> NaiveDate {
        date(2015, 1, 1)
    }

    proptest! {
        #[test]
        fn prop_short_spans_have_at_least_seven_labels(
            start_offset in 0i64..3000,
            span in 0i64..6,
            today_offset in 0i64..4000,
        ) {
            let first = base() + Duration::days(start_offset);
            let last = first + Duration::days(span);
            let today = base() + Duration::days(today_offset);
            let plan = planner(Locale::En).plan(Some(DateRange::new(first, last)), today);

            prop_assert_eq!(plan.granularity(), Granularity::Day);
            prop_assert!(plan.len() >= 7);
            prop_assert!(plan.start() <= first && plan.end() >= last);
        }

        #[test]
        fn prop_day_labels_are_contiguous(
            start_offset in 0i64..3000,
            span in 0i64..=40,
        ) {
            let first = base() + Duration::days(start_offset);
            let last = first + Duration::days(span);
            let plan = planner(Locale::En).plan(Some(DateRange::new(first, last)), date(2030, 1, 1));

            for (i, label) in plan.labels().iter().enumerate() {
                let expected = (plan.start() + Duration::days(i as i64)).format("%m/%d").to_string();
                prop_assert_eq!(label, &expected);
            }
            prop_assert_eq!(plan.start() + Duration::days(plan.len() as i64 - 1), plan.end());
        }

        #[test]
        fn prop_long_spans_are_monthly_and_unique(
            start_offset in 0i64..3000,
            span in 41i64..1500,
        ) {
            let first = base() + Duration::days(start_offset);
            let last = first + Duration::days(span);
            let plan = planner(Locale::En).plan(Some(DateRange::new(first, last)), date(2030, 1, 1));

            prop_assert_eq!(plan.granularity(), Granularity::Month);
            let unique: HashSet<&String> = plan.labels().iter().collect();
            prop_assert_eq!(unique.len(), plan.len());

            let months = (last.year() - first.year()) * 12 + last.month() as i32 - first.month() as i32 + 1;
            prop_assert_eq!(plan.len() as i32, months);
        }
    }
}
