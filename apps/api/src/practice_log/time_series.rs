//! Bucketing of dated practice durations into day/month/year time series.
//!
//! Input arrives newest first (the order the store returns it). The pass walks
//! it oldest first, opening a new bucket whenever the calendar key of an entry
//! differs from the last open bucket. Keys compare as integers.

use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    ByDay,
    ByMonth,
    ByYear,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("query parameter is required ?group=[by_day, by_month, by_year], got '{0}'")]
pub struct UnknownGranularity(pub String);

impl FromStr for Granularity {
    type Err = UnknownGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by_day" => Ok(Granularity::ByDay),
            "by_month" => Ok(Granularity::ByMonth),
            "by_year" => Ok(Granularity::ByYear),
            other => Err(UnknownGranularity(other.to_string())),
        }
    }
}

impl Granularity {
    fn bucket_key(self, date: NaiveDate) -> BucketKey {
        match self {
            Granularity::ByDay => BucketKey {
                year: date.year(),
                month: Some(date.month()),
                day: Some(date.day()),
            },
            Granularity::ByMonth => BucketKey {
                year: date.year(),
                month: Some(date.month()),
                day: None,
            },
            Granularity::ByYear => BucketKey {
                year: date.year(),
                month: None,
                day: None,
            },
        }
    }

    fn label(self, date: NaiveDate) -> String {
        match self {
            Granularity::ByDay => date.format("%Y %B %d").to_string(),
            Granularity::ByMonth => date.format("%Y %B").to_string(),
            Granularity::ByYear => date.format("%Y").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BucketKey {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesMode {
    pub granularity: Granularity,
    /// Running total through each bucket, displayed in hours. Otherwise the
    /// bucket's own total in minutes.
    pub cumulative: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatedDuration {
    pub date: DateTime<Utc>,
    pub duration: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesDataPoint {
    pub key: String,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    pub minutes: i64,
    pub value: f64,
}

struct Bucket {
    key: BucketKey,
    first_date: NaiveDate,
    minutes: i64,
}

pub fn build_time_series(entries_desc: &[DatedDuration], mode: SeriesMode) -> Vec<TimeSeriesDataPoint> {
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut running: i64 = 0;

    for entry in entries_desc.iter().rev() {
        let date = entry.date.date_naive();
        let key = mode.granularity.bucket_key(date);
        let duration = i64::from(entry.duration);
        running += duration;

        match buckets.last_mut() {
            Some(last) if last.key == key => {
                if mode.cumulative {
                    last.minutes = running;
                } else {
                    last.minutes += duration;
                }
            }
            _ => buckets.push(Bucket {
                key,
                first_date: date,
                minutes: if mode.cumulative { running } else { duration },
            }),
        }
    }

    buckets
        .into_iter()
        .map(|bucket| TimeSeriesDataPoint {
            key: mode.granularity.label(bucket.first_date),
            year: bucket.key.year,
            month: bucket.key.month,
            day: bucket.key.day,
            minutes: bucket.minutes,
            value: if mode.cumulative {
                bucket.minutes as f64 / 60.0
            } else {
                bucket.minutes as f64
            },
        })
        .collect()
}
