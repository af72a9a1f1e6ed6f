use chrono::{
    DateTime,
    Datelike,
    Days,
    Duration,
    Months,
    NaiveDate,
    NaiveTime,
    Timelike,
    Utc,
};
use indexmap::IndexMap;
use serde::{
    Deserialize,
    Serialize,
};

use super::run::RunStatus;

/// Reporting horizon used to bucket and aggregate run data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
}

impl Window {
    pub fn as_str(&self) -> &'static str {
        match self {
            Window::Last24Hours => "24h",
            Window::Last7Days => "7d",
            Window::Last30Days => "30d",
            Window::Last90Days => "90d",
        }
    }

    /// Bucket boundaries for this window, ending at `at`. Every bucket of
    /// the window is produced whether or not any run falls into it.
    pub fn bucket_spans(&self, at: DateTime<Utc>, hour_bucket_width: u32) -> Vec<BucketSpan> {
        match self {
            Window::Last24Hours => hour_spans(at, hour_bucket_width),
            Window::Last7Days => day_spans(at.date_naive()),
            Window::Last30Days => week_spans(at.date_naive()),
            Window::Last90Days => month_spans(at.date_naive()),
        }
    }
}

impl std::str::FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(Window::Last24Hours),
            "7d" => Ok(Window::Last7Days),
            "30d" => Ok(Window::Last30Days),
            "90d" => Ok(Window::Last90Days),
            _ => Err(format!("Unknown window: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpan {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BucketSpan {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Hour-aligned buckets covering the 24 hours up to and including the hour
/// of `at`. The reference dashboard uses a width of 4, i.e. six buckets.
/// Buckets are anchored to the window end so the most recent hours always
/// land in the final bucket; when the width does not divide 24, the oldest
/// bucket is truncated at the window edge.
fn hour_spans(at: DateTime<Utc>, width: u32) -> Vec<BucketSpan> {
    let width = width.clamp(1, 24) as i64;
    let end = day_start(at.date_naive()) + Duration::hours(at.hour() as i64 + 1);
    let window_start = end - Duration::hours(24);
    let count = (24 + width - 1) / width;

    (0..count)
        .map(|i| {
            let bucket_end = end - Duration::hours((count - 1 - i) * width);
            let start = (bucket_end - Duration::hours(width)).max(window_start);
            BucketSpan {
                label: start.format("%H:00").to_string(),
                start,
                end: bucket_end,
            }
        })
        .collect()
}

/// One bucket per calendar day for the last 7 days, labelled by weekday.
fn day_spans(today: NaiveDate) -> Vec<BucketSpan> {
    (0..7)
        .map(|i| {
            let date = today - Days::new(6 - i);
            let start = day_start(date);
            BucketSpan {
                label: date.format("%a").to_string(),
                start,
                end: start + Duration::days(1),
            }
        })
        .collect()
}

/// One bucket per ISO week overlapping the last 30 days.
fn week_spans(today: NaiveDate) -> Vec<BucketSpan> {
    let window_start = today - Days::new(29);
    let mut monday = window_start - Days::new(window_start.weekday().num_days_from_monday() as u64);

    let mut spans = Vec::new();
    while monday <= today {
        let start = day_start(monday);
        spans.push(BucketSpan {
            label: format!("W{:02}", monday.iso_week().week()),
            start,
            end: start + Duration::days(7),
        });
        monday = monday + Days::new(7);
    }
    spans
}

/// One bucket per calendar month overlapping the last 90 days.
fn month_spans(today: NaiveDate) -> Vec<BucketSpan> {
    let window_start = today - Days::new(89);
    let mut first = window_start - Days::new(window_start.day0() as u64);

    let mut spans = Vec::new();
    while first <= today {
        let next = first + Months::new(1);
        spans.push(BucketSpan {
            label: first.format("%b").to_string(),
            start: day_start(first),
            end: day_start(next),
        });
        first = next;
    }
    spans
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketMetrics {
    pub run_count: usize,
    pub avg_duration_seconds: f64,
    pub total_records: i64,
    pub success_rate_percent: f64,
}

impl BucketMetrics {
    /// Empty buckets report a 100% success rate (vacuous success): with no
    /// runs in the interval there is nothing that failed. Downstream KPI
    /// displays rely on this exact value.
    pub fn empty() -> Self {
        Self {
            run_count: 0,
            avg_duration_seconds: 0.0,
            total_records: 0,
            success_rate_percent: 100.0,
        }
    }
}

/// Windowed per-bucket statistics, computed on demand and never cached.
/// Bucket order follows the window's chronology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub window: Window,
    pub buckets: IndexMap<String, BucketMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallKpis {
    pub success_rate_percent: f64,
    pub avg_duration_seconds: f64,
    pub avg_records_per_run: f64,
    pub error_rate_percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDistribution {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusDistribution {
    pub fn record(&mut self, status: RunStatus) {
        match status {
            RunStatus::Queued => self.queued += 1,
            RunStatus::Running => self.running += 1,
            RunStatus::Completed => self.completed += 1,
            RunStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.queued + self.running + self.completed + self.failed
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
